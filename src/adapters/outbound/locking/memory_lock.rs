use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::ports::locking::{DerivationLock, LockName, LockProvider};

/// Process-local lock provider. Only excludes callers sharing this instance.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockProvider {
    held: Arc<Mutex<HashSet<LockName>>>,
}

impl MemoryLockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, name: &LockName) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(name)
    }
}

#[async_trait]
impl LockProvider for MemoryLockProvider {
    async fn try_acquire(&self, name: &LockName) -> Option<DerivationLock> {
        let inserted = self
            .held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.clone());
        if !inserted {
            return None;
        }

        let held = self.held.clone();
        let owned = name.clone();
        Some(DerivationLock::new(name.clone(), move || {
            held.lock().unwrap_or_else(|e| e.into_inner()).remove(&owned);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{DerivedLocator, Locator, StyleName};

    fn lock_name() -> LockName {
        let original = Locator::parse_explicit("s3://media/cat.jpg").unwrap();
        let style = StyleName::new("thumbnail".to_string()).unwrap();
        LockName::for_derivative(&DerivedLocator::new(original, style).unwrap())
    }

    #[tokio::test]
    async fn test_exclusive_until_released() {
        let provider = MemoryLockProvider::new();
        let name = lock_name();

        let lock = provider.try_acquire(&name).await.unwrap();
        assert!(provider.is_held(&name));
        assert!(provider.try_acquire(&name).await.is_none());

        lock.release();
        assert!(!provider.is_held(&name));
        assert!(provider.try_acquire(&name).await.is_some());
    }
}
