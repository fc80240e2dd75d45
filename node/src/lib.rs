//! Runs a whole parameter server cluster inside one process: shards, the worker
//! helper and the worker threads, all talking through an in-process mailbox.

pub mod engine;
pub mod error;
pub mod id_mapper;
pub mod info;

pub use engine::Engine;
pub use error::EngineErr;
pub use id_mapper::IdMapper;
pub use info::WorkerInfo;
