use std::{env, fs, io};

use comms::{Clock, Key, ModelId, Val, specs::node::NodeSpec};
use log::{debug, info, warn};
use node::{Engine, EngineErr, WorkerInfo};
use rand::{Rng, SeedableRng, rngs::StdRng};

const LEARNING_RATE: Val = 0.1;
const NOISE: Val = 0.01;

fn read_spec() -> io::Result<NodeSpec> {
    let mut spec = match env::var("PS_CONFIG") {
        Ok(path) => {
            let json = fs::read_to_string(&path)?;
            info!("read node spec from {path}");
            serde_json::from_str(&json).map_err(io::Error::other)?
        }
        Err(_) => {
            warn!("PS_CONFIG not set, using the default node spec");
            NodeSpec::default()
        }
    };

    if env::var("PS_RECOVER").is_ok_and(|v| v == "1") {
        spec.recover = true;
    }

    Ok(spec)
}

/// Pulls every key towards its own index, one noisy gradient step per round.
fn train(
    info: WorkerInfo,
    model_id: ModelId,
    key_space: Key,
    rounds: Clock,
    seed: u64,
) -> Result<Vec<Val>, EngineErr> {
    let table = info.table(model_id)?;
    let keys: Vec<Key> = (0..key_space).collect();
    let mut rng = StdRng::seed_from_u64(seed + info.index() as u64);

    // The first round only creates the keys, a recovered table already has them.
    let mut start = info.start_clock();
    if start == 0 {
        table.add(&keys, &vec![0.0; keys.len()])?;
        table.clock()?;
        start = 1;
    }

    for round in start..rounds {
        let vals = table.get(&keys)?;

        let deltas: Vec<Val> = keys
            .iter()
            .zip(&vals)
            .map(|(&key, val)| {
                LEARNING_RATE * (key as Val - val) + rng.random_range(-NOISE..NOISE)
            })
            .collect();

        table.add(&keys, &deltas)?;
        table.clock()?;

        debug!(worker_id = info.worker_id(), round = round; "round done");
    }

    let vals = table.get(&keys)?;
    Ok(vals)
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let spec = read_spec()?;
    let key_space = spec.key_space;
    let rounds = spec.rounds;
    let seed = spec.seed.unwrap_or_default();
    let Some(model_id) = spec.tables.first().map(|table| table.model_id) else {
        return Err(io::Error::other("the node spec declares no tables"));
    };

    let engine = Engine::start(spec)?;
    engine.init_tables().await?;

    let outputs = engine
        .run(move |info| train(info, model_id, key_space, rounds, seed))
        .await?;

    for (index, output) in outputs.into_iter().enumerate() {
        let vals = output?;
        info!(worker = index; "final values {vals:?}");
    }

    engine.stop().await?;
    Ok(())
}
