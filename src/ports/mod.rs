pub mod derivation;
pub mod locking;
pub mod storage;

// Re-export all port traits for convenience
pub use derivation::{DeriveError, DerivedArtifact, Deriver, StyleRegistry};
pub use locking::{DerivationLock, LockName, LockProvider};
pub use storage::StorageClient;
