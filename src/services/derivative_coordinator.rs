use std::{path::PathBuf, sync::Arc, time::Duration};

use bytes::Bytes;
use tokio_util::task::TaskTracker;

use crate::{
    adapters::outbound::staging::{LocalStaging, StagedFile},
    domain::{
        errors::{DerivativeError, DerivativeResult, StorageError},
        value_objects::DerivedLocator,
    },
    ports::{
        derivation::{Deriver, StyleRegistry},
        locking::{DerivationLock, LockName, LockProvider},
    },
    services::stream_wrapper::StreamWrapper,
};

/// Tuning for the wait on a peer that holds the derivation lock
#[derive(Debug, Clone)]
pub struct DerivationSettings {
    pub peer_poll_attempts: u32,
    pub peer_poll_interval: Duration,
}

impl Default for DerivationSettings {
    fn default() -> Self {
        Self {
            peer_poll_attempts: 4,
            peer_poll_interval: Duration::from_millis(500),
        }
    }
}

/// What the delivery endpoint should answer
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// Malformed path, unknown style, unknown bucket or missing original
    NotFound,
    /// The derivative is stored; permanent redirect to its URL
    Redirect(String),
    /// Generated by this request
    Generated { data: Bytes, content_type: String },
    /// Generated by a peer and still staged locally
    Staged { path: PathBuf, content_type: String },
}

/// Generates derivatives on demand, at most once at a time per derivative.
///
/// Results are staged locally and served immediately; a background task then
/// uploads them and only afterwards releases the derivation lock.
pub struct DerivativeCoordinator {
    wrapper: StreamWrapper,
    styles: StyleRegistry,
    locks: Arc<dyn LockProvider>,
    staging: LocalStaging,
    settings: DerivationSettings,
    uploads: TaskTracker,
}

impl DerivativeCoordinator {
    pub fn new(
        wrapper: StreamWrapper,
        styles: StyleRegistry,
        locks: Arc<dyn LockProvider>,
        staging: LocalStaging,
    ) -> Self {
        Self {
            wrapper,
            styles,
            locks,
            staging,
            settings: DerivationSettings::default(),
            uploads: TaskTracker::new(),
        }
    }

    pub fn with_settings(mut self, settings: DerivationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn wrapper(&self) -> &StreamWrapper {
        &self.wrapper
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    /// Handle a delivery path `/<bucket>/styles/<style>/<key...>`
    pub async fn deliver_path(&self, path: &str) -> DerivativeResult<DeliveryOutcome> {
        match DerivedLocator::from_request_path(path) {
            Ok(derivative) => self.deliver(&derivative).await,
            Err(e) => {
                tracing::debug!(path, error = %e, "Not a derivative path");
                Ok(DeliveryOutcome::NotFound)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(derivative = %derivative))]
    pub async fn deliver(&self, derivative: &DerivedLocator) -> DerivativeResult<DeliveryOutcome> {
        let Some(deriver) = self.styles.get(derivative.style()) else {
            tracing::debug!(style = %derivative.style(), "Unknown style");
            return Ok(DeliveryOutcome::NotFound);
        };

        let client = self.wrapper.client();
        let original = derivative.original();

        match self.wrapper.ensure_bucket(original).await {
            Ok(()) => {}
            Err(StorageError::BucketNotFound { .. }) => return Ok(DeliveryOutcome::NotFound),
            Err(e) => return Err(e.into()),
        }

        if !client.object_exists(original).await? {
            tracing::debug!(%original, "Original not found");
            return Ok(DeliveryOutcome::NotFound);
        }

        if client.object_exists(derivative.derived()).await? {
            return self.redirect(derivative).await;
        }

        let name = LockName::for_derivative(derivative);
        if let Some(lock) = self.locks.try_acquire(&name).await {
            // A peer may have finished between the existence check and the lock
            if client.object_exists(derivative.derived()).await? {
                return self.redirect(derivative).await;
            }
            return self.generate(derivative, deriver, Some(lock)).await;
        }

        if let Some(outcome) = self.wait_for_peer(derivative).await? {
            return Ok(outcome);
        }

        let lock = self.locks.try_acquire(&name).await;
        if lock.is_none() {
            tracing::warn!(
                lock = %name,
                "Derivation lock still held after waiting; generating without it"
            );
        }
        self.generate(derivative, deriver, lock).await
    }

    async fn redirect(&self, derivative: &DerivedLocator) -> DerivativeResult<DeliveryOutcome> {
        let url = self.wrapper.external_url(derivative.derived()).await?;
        Ok(DeliveryOutcome::Redirect(url))
    }

    async fn wait_for_peer(
        &self,
        derivative: &DerivedLocator,
    ) -> DerivativeResult<Option<DeliveryOutcome>> {
        for attempt in 1..=self.settings.peer_poll_attempts {
            tokio::time::sleep(self.settings.peer_poll_interval).await;

            if let Some(staged) = self.staging.find(derivative).await {
                tracing::debug!(attempt, "Serving derivative staged by peer");
                return Ok(Some(DeliveryOutcome::Staged {
                    path: staged.path,
                    content_type: staged.content_type,
                }));
            }

            // The peer may already have uploaded and cleaned up
            if self
                .wrapper
                .client()
                .object_exists(derivative.derived())
                .await?
            {
                return self.redirect(derivative).await.map(Some);
            }
        }
        Ok(None)
    }

    async fn generate(
        &self,
        derivative: &DerivedLocator,
        deriver: Arc<dyn Deriver>,
        lock: Option<DerivationLock>,
    ) -> DerivativeResult<DeliveryOutcome> {
        let original = derivative.original();
        let source = match self.wrapper.read(original).await {
            Ok(source) => source,
            Err(e) if e.is_not_found() => return Ok(DeliveryOutcome::NotFound),
            Err(e) => return Err(e.into()),
        };

        let started = std::time::Instant::now();
        let artifact = deriver
            .derive(source, original.key())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Derivative generation failed");
                DerivativeError::GenerationFailed {
                    derivative: derivative.clone(),
                    reason: e.to_string(),
                }
            })?;

        let staged = self
            .staging
            .stage(derivative, &artifact.data, &artifact.content_type)
            .await?;
        tracing::info!(
            size = artifact.data.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Generated derivative"
        );

        self.schedule_upload(derivative.clone(), staged, lock);

        Ok(DeliveryOutcome::Generated {
            data: artifact.data,
            content_type: artifact.content_type,
        })
    }

    /// Upload the staged file in the background, then release the lock
    fn schedule_upload(
        &self,
        derivative: DerivedLocator,
        staged: StagedFile,
        lock: Option<DerivationLock>,
    ) {
        let wrapper = self.wrapper.clone();
        let staging = self.staging.clone();

        self.uploads.spawn(async move {
            let _lock = lock;
            let result = match staging.read(&staged.path).await {
                Ok(data) => wrapper
                    .write_with_content_type(derivative.derived(), data, &staged.content_type)
                    .await
                    .map_err(DerivativeError::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => tracing::info!(derivative = %derivative, "Uploaded derivative"),
                Err(e) => {
                    tracing::error!(derivative = %derivative, error = %e, "Derivative upload failed")
                }
            }
            staging.remove(&derivative).await;
        });
    }

    /// Wait until every scheduled upload has finished
    pub async fn wait_for_uploads(&self) {
        self.uploads.close();
        self.uploads.wait().await;
        self.uploads.reopen();
    }

    pub fn pending_uploads(&self) -> usize {
        self.uploads.len()
    }
}
