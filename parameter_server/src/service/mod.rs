mod builder;
mod server;

pub use builder::ModelBuilder;
pub use server::ShardServer;
