use async_trait::async_trait;

use crate::domain::value_objects::DerivedLocator;

/// Name of a derivation lock, stable across processes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockName(String);

impl LockName {
    /// Hash of the derivative's canonical locator
    pub fn for_derivative(derivative: &DerivedLocator) -> Self {
        let digest = md5::compute(derivative.to_string().as_bytes());
        Self(format!("derivative-{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An acquired lock. Released when dropped, so every exit path releases it.
pub struct DerivationLock {
    name: LockName,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl DerivationLock {
    pub fn new(name: LockName, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            name,
            release: Some(Box::new(release)),
        }
    }

    pub fn name(&self) -> &LockName {
        &self.name
    }

    /// Release now rather than at end of scope
    pub fn release(self) {}
}

impl Drop for DerivationLock {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!(lock = %self.name, "Derivation lock released");
        }
    }
}

impl std::fmt::Debug for DerivationLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivationLock")
            .field("name", &self.name)
            .finish()
    }
}

/// Port for the cross-process mutual exclusion guarding derivative generation.
///
/// Failures to reach the lock backend are reported as "not acquired";
/// lock conditions never surface as errors.
#[async_trait]
pub trait LockProvider: Send + Sync + 'static {
    /// Take the lock without waiting. `None` means somebody else holds it.
    async fn try_acquire(&self, name: &LockName) -> Option<DerivationLock>;
}
