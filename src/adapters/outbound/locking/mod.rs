pub mod file_lock;
pub mod memory_lock;

pub use file_lock::FileLockProvider;
pub use memory_lock::MemoryLockProvider;
