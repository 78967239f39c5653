use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    adapters::outbound::{
        derivers::{build_registry, StyleDefinition},
        locking::{FileLockProvider, MemoryLockProvider},
        staging::LocalStaging,
        storage::{ObjectStoreClient, S3Config},
    },
    config::{self, WrapperConfig},
    domain::value_objects::BucketName,
    ports::{derivation::StyleRegistry, locking::LockProvider, storage::StorageClient},
    services::{DerivationSettings, DerivativeCoordinator, MetadataCache, StreamWrapper},
};

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
    pub wrapper: Arc<WrapperConfig>,
    pub lock_backend: LockBackend,
    pub staging_dir: PathBuf,
    pub styles: Vec<StyleDefinition>,
    pub derivation: DerivationSettings,
}

/// Wrapper settings default to the process-wide configuration
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::InMemory {
                public_base_url: "http://localhost".to_string(),
                buckets: Vec::new(),
            },
            wrapper: config::current(),
            lock_backend: LockBackend::InMemory,
            staging_dir: std::env::temp_dir().join("object-store-fs").join("staging"),
            styles: Vec::new(),
            derivation: DerivationSettings::default(),
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// Process-local buckets, created up front
    InMemory {
        public_base_url: String,
        buckets: Vec<BucketName>,
    },
    /// S3 or an S3-compatible endpoint, configured from the wrapper settings
    S3,
}

/// Where derivation locks live
#[derive(Debug, Clone)]
pub enum LockBackend {
    InMemory,
    /// Lock files in a directory shared by every instance
    Files { dir: PathBuf },
}

/// Application dependencies container
pub struct AppDependencies {
    pub storage: Arc<dyn StorageClient>,
    pub cache: Arc<MetadataCache>,
    pub locks: Arc<dyn LockProvider>,
    pub staging: LocalStaging,
    pub styles: StyleRegistry,
}

/// Application services container
pub struct AppServices {
    pub wrapper: StreamWrapper,
    pub coordinator: Arc<DerivativeCoordinator>,
}

/// Application builder for dependency injection
pub struct AppBuilder {
    config: AppConfig,
    storage: Option<Arc<dyn StorageClient>>,
    locks: Option<Arc<dyn LockProvider>>,
    styles: Option<StyleRegistry>,
}

impl AppBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            storage: None,
            locks: None,
            styles: None,
        }
    }

    /// Configure the application with custom settings
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_wrapper_config(mut self, wrapper: Arc<WrapperConfig>) -> Self {
        self.config.wrapper = wrapper;
        self
    }

    /// Configure storage backend
    pub fn with_storage_backend(mut self, backend: StorageBackend) -> Self {
        self.config.storage_backend = backend;
        self
    }

    pub fn with_lock_backend(mut self, backend: LockBackend) -> Self {
        self.config.lock_backend = backend;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = dir.into();
        self
    }

    pub fn with_derivation_settings(mut self, settings: DerivationSettings) -> Self {
        self.config.derivation = settings;
        self
    }

    pub fn with_style_definitions(mut self, styles: Vec<StyleDefinition>) -> Self {
        self.config.styles = styles;
        self
    }

    /// Use this client instead of one built from the storage backend
    pub fn with_storage_client(mut self, storage: Arc<dyn StorageClient>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_lock_provider(mut self, locks: Arc<dyn LockProvider>) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Use this registry instead of one built from the style definitions
    pub fn with_styles(mut self, styles: StyleRegistry) -> Self {
        self.styles = Some(styles);
        self
    }

    /// Build the application dependencies
    pub fn build_dependencies(mut self) -> Result<(AppConfig, AppDependencies), AppError> {
        let storage = match self.storage.take() {
            Some(storage) => storage,
            None => self.create_storage_client()?,
        };

        let locks = match self.locks.take() {
            Some(locks) => locks,
            None => self.create_lock_provider(),
        };

        let styles = match self.styles.take() {
            Some(styles) => styles,
            None => build_registry(self.config.styles.clone()),
        };

        let deps = AppDependencies {
            storage,
            cache: Arc::new(MetadataCache::new(self.config.wrapper.metadata_cache_capacity)),
            locks,
            staging: LocalStaging::new(self.config.staging_dir.clone()),
            styles,
        };
        Ok((self.config, deps))
    }

    /// Build the complete application with services
    pub fn build(self) -> Result<AppServices, AppError> {
        let (config, deps) = self.build_dependencies()?;

        let wrapper = StreamWrapper::new(config.wrapper.clone(), deps.storage, deps.cache)
            .map_err(|e| AppError::ServiceInit {
                message: e.to_string(),
            })?;

        tracing::info!(
            styles = deps.styles.len(),
            staging = %config.staging_dir.display(),
            "Application services initialized"
        );

        let coordinator = DerivativeCoordinator::new(
            wrapper.clone(),
            deps.styles,
            deps.locks,
            deps.staging,
        )
        .with_settings(config.derivation);

        Ok(AppServices {
            wrapper,
            coordinator: Arc::new(coordinator),
        })
    }

    fn create_storage_client(&self) -> Result<Arc<dyn StorageClient>, AppError> {
        match &self.config.storage_backend {
            StorageBackend::InMemory {
                public_base_url,
                buckets,
            } => {
                let client = ObjectStoreClient::in_memory(public_base_url.clone());
                for bucket in buckets {
                    client.create_bucket(bucket);
                }
                Ok(Arc::new(client))
            }
            StorageBackend::S3 => {
                if self.config.wrapper.default_bucket.is_none() {
                    tracing::warn!("No default bucket configured; bare s3:// locators will fail");
                }
                let s3 = S3Config::from_wrapper_config(&self.config.wrapper);
                Ok(Arc::new(ObjectStoreClient::s3(s3)))
            }
        }
    }

    fn create_lock_provider(&self) -> Arc<dyn LockProvider> {
        match &self.config.lock_backend {
            LockBackend::InMemory => Arc::new(MemoryLockProvider::new()),
            LockBackend::Files { dir } => Arc::new(FileLockProvider::new(dir.clone())),
        }
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    ServiceInit { message: String },
}

/// Read style definitions from a JSON array
pub fn load_styles_file(path: &Path) -> Result<Vec<StyleDefinition>, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|e| AppError::Configuration {
        message: format!("Failed to read styles file {}: {}", path.display(), e),
    })?;
    serde_json::from_str(&raw).map_err(|e| AppError::Configuration {
        message: format!("Invalid styles file {}: {}", path.display(), e),
    })
}

/// Create an in-memory application for testing and development
pub fn create_in_memory_app(
    wrapper: WrapperConfig,
    styles: Vec<StyleDefinition>,
) -> Result<AppServices, AppError> {
    let buckets = wrapper.default_bucket.iter().cloned().collect();
    AppBuilder::new()
        .with_storage_backend(StorageBackend::InMemory {
            public_base_url: "http://localhost".to_string(),
            buckets,
        })
        .with_wrapper_config(Arc::new(wrapper))
        .with_style_definitions(styles)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::value_objects::{DerivedLocator, Locator},
        ports::locking::LockName,
        services::DeliveryOutcome,
    };
    use bytes::Bytes;

    fn media() -> BucketName {
        BucketName::new("media".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_create_in_memory_app() {
        let wrapper = WrapperConfig::default().with_default_bucket(media());
        let app = create_in_memory_app(wrapper, Vec::new()).unwrap();

        let locator = app.wrapper.resolve("s3://").await.unwrap();
        assert_eq!(locator.bucket(), &media());
        assert!(app.coordinator.styles().is_empty());
    }

    #[tokio::test]
    async fn test_app_builder_with_styles() {
        let staging = tempfile::tempdir().unwrap();
        let styles: Vec<StyleDefinition> =
            serde_json::from_str(r#"[{"name": "thumb", "width": 8, "height": 8}]"#).unwrap();

        let app = AppBuilder::new()
            .with_storage_backend(StorageBackend::InMemory {
                public_base_url: "http://localhost".to_string(),
                buckets: vec![media()],
            })
            .with_staging_dir(staging.path())
            .with_style_definitions(styles)
            .build()
            .unwrap();

        assert_eq!(app.coordinator.styles().len(), 1);

        let outcome = app
            .coordinator
            .deliver_path("/media/styles/thumb/missing.png")
            .await
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_dependencies_creation() {
        let (config, deps) = AppBuilder::new().build_dependencies().unwrap();

        assert!(deps.styles.is_empty());
        assert_eq!(deps.staging.root(), config.staging_dir.as_path());
    }

    #[tokio::test]
    async fn test_injected_dependencies_are_used() {
        let client = ObjectStoreClient::in_memory("http://cdn.local");
        client.create_bucket(&media());
        let locks = Arc::new(MemoryLockProvider::new());

        let (_, deps) = AppBuilder::new()
            .with_storage_client(Arc::new(client))
            .with_lock_provider(locks.clone())
            .with_styles(StyleRegistry::new())
            .build_dependencies()
            .unwrap();

        let locator = Locator::parse_explicit("s3://media/a.jpg").unwrap();
        assert_eq!(deps.storage.build_url(&locator), "http://cdn.local/media/a.jpg");
        assert!(deps.styles.is_empty());

        // Same provider: a lock taken through one handle is visible through the other
        let derivative = DerivedLocator::from_request_path("/media/styles/thumb/a.jpg").unwrap();
        let name = LockName::for_derivative(&derivative);
        let _held = deps.locks.try_acquire(&name).await.unwrap();
        assert!(locks.is_held(&name));
    }

    #[tokio::test]
    async fn test_wrapper_and_coordinator_share_storage() {
        let wrapper = WrapperConfig::default().with_default_bucket(media());
        let app = create_in_memory_app(wrapper, Vec::new()).unwrap();

        let locator = Locator::parse_explicit("s3://media/photo.jpg").unwrap();
        app.wrapper
            .write(&locator, Bytes::from_static(b"jpeg"))
            .await
            .unwrap();

        let derivative = DerivedLocator::from_request_path("/media/styles/thumb/photo.jpg").unwrap();
        assert!(app
            .coordinator
            .wrapper()
            .exists(derivative.original())
            .await
            .unwrap());
    }

    #[test]
    fn test_load_styles_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("styles.json");
        std::fs::write(
            &path,
            r#"[{"name": "thumb", "width": 100, "height": 100, "mode": "crop"}]"#,
        )
        .unwrap();

        let styles = load_styles_file(&path).unwrap();
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].width, Some(100));

        assert!(matches!(
            load_styles_file(&dir.path().join("missing.json")),
            Err(AppError::Configuration { .. })
        ));
    }
}
