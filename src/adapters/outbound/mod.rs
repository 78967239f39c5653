pub mod derivers;
pub mod locking;
pub mod staging;
pub mod storage;
