pub mod adapters;
pub mod app;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;
pub mod settings;

// Re-export key types for convenience

// Domain types - locators, models and errors
pub use domain::{
    // Value objects
    BucketName,
    DerivedLocator,
    // Errors
    DerivativeError,
    DomainValidationError,
    // Models
    DirEntry,
    FileStat,
    Locator,
    ObjectKey,
    SigningError,
    StorageError,
    StyleName,
};

// Port types - interfaces for external systems
pub use ports::{Deriver, LockProvider, StorageClient, StyleRegistry};

// Service implementations
pub use services::{
    CdnUrlSigner, DeliveryOutcome, DerivativeCoordinator, FileHandle, MetadataCache, OpenMode,
    StatMode, StreamWrapper,
};

// Configuration
pub use config::{PathPattern, PresignedRule, WrapperConfig};

// Application factory and configuration
pub use app::{
    create_in_memory_app, AppBuilder, AppConfig, AppDependencies, AppError, AppServices,
    LockBackend, StorageBackend,
};

// Adapter types - infrastructure implementations
pub use adapters::outbound::storage::ObjectStoreClient;

// Public facade for easy construction
pub mod prelude {
    pub use crate::{
        create_in_memory_app, AppBuilder, AppServices, BucketName, DeliveryOutcome,
        DerivativeCoordinator, Locator, ObjectKey, ObjectStoreClient, StatMode, StorageClient,
        StreamWrapper, WrapperConfig,
    };
}
