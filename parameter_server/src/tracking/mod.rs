mod pending;
mod progress;

pub use pending::PendingBuffer;
pub use progress::ProgressTracker;
