use std::{collections::HashMap, sync::Arc, time::Duration};

use comms::{
    Clock, EndpointId, Key, Mailbox, Message, Reply, Request, ShardId, Transport, Val,
    msg::Body,
};
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle};
use worker::{
    CallbackRunner, ClientConfig, ClientErr, KVClientTable, RangePartitionManager, ReplyRouter,
};

const HELPER: EndpointId = 50;
const WORKER: EndpointId = 100;
const MODEL: u32 = 0;

/// What a fake shard saw before exiting.
#[derive(Debug, Default)]
struct ShardLog {
    store: HashMap<Key, Val>,
    clocks: Clock,
    received: usize,
}

/// A shard answering right away, except for the first `drop_first` requests
/// which are silently lost.
async fn fake_shard(
    mailbox: Arc<Mailbox>,
    mut rx: UnboundedReceiver<Message>,
    drop_first: usize,
) -> ShardLog {
    let mut log = ShardLog::default();
    let mut last_add = HashMap::new();

    while let Some(msg) = rx.recv().await {
        let Body::Request(req) = &msg.body else {
            continue;
        };

        if matches!(req, Request::Exit) {
            break;
        }

        log.received += 1;
        if log.received <= drop_first {
            continue;
        }

        let reply = match req {
            Request::Add { keys, vals } => {
                if last_add.insert(msg.meta.sender, msg.meta.timestamp) != Some(msg.meta.timestamp)
                {
                    for (k, v) in keys.iter().zip(vals) {
                        *log.store.entry(*k).or_default() += v;
                    }
                }
                Reply::AddAck
            }
            Request::Get { keys } => {
                let missing: Vec<_> = keys
                    .iter()
                    .copied()
                    .filter(|k| !log.store.contains_key(k))
                    .collect();

                if missing.is_empty() {
                    let vals = keys.iter().map(|k| log.store[k]).collect();
                    Reply::Values {
                        keys: keys.clone(),
                        vals,
                    }
                } else {
                    Reply::MissingKeys(missing)
                }
            }
            Request::Clock => {
                log.clocks += 1;
                continue;
            }
            _ => continue,
        };

        mailbox.send(msg.reply(reply)).unwrap();
    }

    log
}

struct Cluster {
    mailbox: Arc<Mailbox>,
    shards: Vec<(ShardId, JoinHandle<ShardLog>)>,
    table: Option<KVClientTable>,
}

impl Cluster {
    /// Two shards owning `[0, 5)` and `[5, 10)`.
    fn start(drops: [usize; 2], config: ClientConfig) -> Self {
        let mailbox = Arc::new(Mailbox::new());
        let callbacks = Arc::new(CallbackRunner::new(config.tick()));

        let helper_rx = mailbox.open(HELPER);
        mailbox.route(WORKER, HELPER).unwrap();
        tokio::spawn(ReplyRouter::new(HELPER, callbacks.clone()).run(helper_rx));

        let shards = [1, 2]
            .into_iter()
            .zip(drops)
            .map(|(id, drop_first)| {
                let rx = mailbox.open(id);
                (id, tokio::spawn(fake_shard(mailbox.clone(), rx, drop_first)))
            })
            .collect();

        let partition = RangePartitionManager::new(vec![1, 2], vec![0..5, 5..10]).unwrap();
        let table = KVClientTable::new(
            WORKER,
            MODEL,
            Arc::new(partition),
            mailbox.clone(),
            callbacks,
            config,
        );

        Self {
            mailbox,
            shards,
            table: Some(table),
        }
    }

    /// Runs `f` with the table on a blocking thread.
    async fn with_table<T, F>(&mut self, f: F) -> T
    where
        T: Send + 'static,
        F: FnOnce(&KVClientTable) -> T + Send + 'static,
    {
        let table = self.table.take().unwrap();
        let (table, out) = tokio::task::spawn_blocking(move || {
            let out = f(&table);
            (table, out)
        })
        .await
        .unwrap();

        self.table = Some(table);
        out
    }

    async fn stop(self) -> Vec<ShardLog> {
        let mut logs = Vec::new();
        for (id, handle) in self.shards {
            let exit = Message::request(comms::Meta::new(HELPER, id, MODEL), Request::Exit);
            self.mailbox.send(exit).unwrap();
            logs.push(handle.await.unwrap());
        }

        logs
    }
}

fn fast_config(max_retries: usize) -> ClientConfig {
    ClientConfig::new(Duration::from_millis(40), Duration::from_millis(5), max_retries)
}

#[tokio::test(flavor = "multi_thread")]
async fn get_returns_values_in_input_order() {
    let mut cluster = Cluster::start([0, 0], fast_config(3));

    let vals = cluster
        .with_table(|table| {
            table.add(&[5, 1, 7], &[0.5, 1.0, 2.0]).unwrap();
            table.add(&[7], &[1.0]).unwrap();
            table.get(&[7, 5, 1])
        })
        .await
        .unwrap();

    assert_eq!(vals, [3.0, 0.5, 1.0]);
    cluster.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn lost_requests_are_resent_and_applied_once() {
    let mut cluster = Cluster::start([0, 1], fast_config(3));

    cluster
        .with_table(|table| table.add(&[2, 8], &[1.0, 1.0]))
        .await
        .unwrap();

    let logs = cluster.stop().await;
    assert_eq!(logs[0].received, 1);
    assert_eq!(logs[1].received, 2);
    assert_eq!(logs[1].store[&8], 1.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unanswered_shard_exhausts_its_retries() {
    let mut cluster = Cluster::start([0, usize::MAX], fast_config(2));

    let err = cluster
        .with_table(|table| table.get(&[1, 6]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientErr::ShardUnreachable {
            shard: 2,
            attempts: 3
        }
    ));

    let logs = cluster.stop().await;
    assert_eq!(logs[1].received, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn never_added_keys_are_reported() {
    let mut cluster = Cluster::start([0, 0], fast_config(3));

    let err = cluster
        .with_table(|table| {
            table.add(&[3], &[1.0]).unwrap();
            table.get(&[9, 3, 4])
        })
        .await
        .unwrap_err();

    match err {
        ClientErr::MissingKeys(keys) => assert_eq!(keys, [4, 9]),
        other => panic!("expected missing keys, got {other}"),
    }
    cluster.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn clock_reaches_every_shard_and_empty_calls_send_nothing() {
    let mut cluster = Cluster::start([0, 0], fast_config(3));

    cluster
        .with_table(|table| {
            assert!(table.add(&[], &[]).is_ok());
            assert!(table.get(&[]).unwrap().is_empty());
            table.clock().unwrap();
            table.clock().unwrap();
        })
        .await;

    let logs = cluster.stop().await;
    for log in logs {
        assert_eq!(log.clocks, 2);
        assert_eq!(log.received, 2);
    }
}
