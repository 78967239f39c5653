//! S3 backend construction using the object_store crate
//!
//! One `AmazonS3` client is built per bucket and canned ACL, since object_store
//! binds a client to a single bucket and has no per-request ACL attribute.

use std::sync::Arc;

use anyhow::{Context, Result};
use http::{HeaderMap, HeaderValue};
use object_store::{
    aws::{AmazonS3, AmazonS3Builder},
    ClientOptions,
};

use crate::{
    config::WrapperConfig,
    domain::{models::Acl, value_objects::BucketName},
};

/// Configuration for S3 storage backend
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub endpoint: Option<String>,
}

impl S3Config {
    pub fn from_wrapper_config(config: &WrapperConfig) -> Self {
        Self {
            region: config.region.clone(),
            access_key: config.credentials.as_ref().map(|c| c.access_key.clone()),
            secret_key: config.credentials.as_ref().map(|c| c.secret_key.clone()),
            endpoint: config.endpoint.clone(),
        }
    }

    /// Base URL objects are addressed under, without a trailing slash.
    ///
    /// Custom endpoints (MinIO, localstack) are path-style; AWS is virtual-hosted.
    pub fn bucket_url(&self, bucket: &BucketName) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", bucket, self.region),
        }
    }
}

/// Create an S3 client bound to `bucket` that applies `acl` to every upload
pub fn create_s3_store(config: &S3Config, bucket: &BucketName, acl: Acl) -> Result<Arc<AmazonS3>> {
    let mut headers = HeaderMap::new();
    headers.insert("x-amz-acl", HeaderValue::from_static(acl.as_header_value()));

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket.as_str())
        .with_region(&config.region)
        .with_client_options(ClientOptions::new().with_default_headers(headers));

    if let Some(access_key) = &config.access_key {
        builder = builder.with_access_key_id(access_key);
    }

    if let Some(secret_key) = &config.secret_key {
        builder = builder.with_secret_access_key(secret_key);
    }

    if let Some(endpoint) = &config.endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(endpoint.starts_with("http://"));
    }

    let store = builder
        .build()
        .with_context(|| format!("Failed to build S3 store for bucket '{}'", bucket))?;

    Ok(Arc::new(store))
}
