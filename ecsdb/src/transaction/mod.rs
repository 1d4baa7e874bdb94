pub mod engine;
pub mod wal;
pub mod write_queue;

pub use engine::*;
pub use wal::*;
pub use write_queue::*;
