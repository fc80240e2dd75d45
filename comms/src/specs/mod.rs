pub mod node;
pub mod server;
pub mod worker;
