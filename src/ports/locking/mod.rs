mod lock_provider;

pub use lock_provider::{DerivationLock, LockName, LockProvider};
