// Infrastructure error mapping
pub mod error;

// Storage implementations
pub mod object_store_client;

// Provider-specific implementations
pub mod s3;

// Re-export key types
pub use object_store_client::ObjectStoreClient;
pub use s3::S3Config;
