use std::{error::Error, fmt, io};

use comms::{ModelId, TransportErr};
use parameter_server::ModelErr;
use tokio::task::JoinError;
use worker::{ClientErr, PartitionErr};

/// The engine module's result type.
pub type Result<T> = std::result::Result<T, EngineErr>;

/// Failures while bootstrapping, running or tearing down a node.
#[derive(Debug)]
pub enum EngineErr {
    InvalidSpec(String),
    TooManyEndpoints { kind: &'static str, requested: usize, max: u32 },
    UnknownTable(ModelId),
    Partition(PartitionErr),
    Transport(TransportErr),
    Client(ClientErr),
    Recovery(ModelErr),
    Task(JoinError),
}

impl fmt::Display for EngineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErr::InvalidSpec(reason) => write!(f, "invalid node spec: {reason}"),
            EngineErr::TooManyEndpoints {
                kind,
                requested,
                max,
            } => write!(f, "requested {requested} {kind}, at most {max} fit in a node"),
            EngineErr::UnknownTable(model_id) => write!(f, "no table with model id {model_id}"),
            EngineErr::Partition(e) => write!(f, "partition error: {e}"),
            EngineErr::Transport(e) => write!(f, "transport error: {e}"),
            EngineErr::Client(e) => write!(f, "client error: {e}"),
            EngineErr::Recovery(e) => write!(f, "{e}"),
            EngineErr::Task(e) => write!(f, "worker task failed: {e}"),
        }
    }
}

impl Error for EngineErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineErr::Partition(e) => Some(e),
            EngineErr::Transport(e) => Some(e),
            EngineErr::Client(e) => Some(e),
            EngineErr::Recovery(e) => Some(e),
            EngineErr::Task(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PartitionErr> for EngineErr {
    fn from(value: PartitionErr) -> Self {
        Self::Partition(value)
    }
}

impl From<TransportErr> for EngineErr {
    fn from(value: TransportErr) -> Self {
        Self::Transport(value)
    }
}

impl From<ClientErr> for EngineErr {
    fn from(value: ClientErr) -> Self {
        Self::Client(value)
    }
}

impl From<ModelErr> for EngineErr {
    fn from(value: ModelErr) -> Self {
        Self::Recovery(value)
    }
}

impl From<JoinError> for EngineErr {
    fn from(value: JoinError) -> Self {
        Self::Task(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<EngineErr> for io::Error {
    fn from(value: EngineErr) -> Self {
        io::Error::other(value)
    }
}
