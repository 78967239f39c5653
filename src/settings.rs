use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use crate::{
    app::{AppConfig, LockBackend, StorageBackend},
    config::{CdnSettings, Credentials, PathPattern, PresignedRule, WrapperConfig},
    domain::value_objects::BucketName,
    services::DerivationSettings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Memory,
    S3,
}

/// Storage and delivery settings shared by the server and the CLI
#[derive(Args, Debug, Clone)]
pub struct StoreSettings {
    /// Default bucket, used for bare `s3://` locators
    #[arg(long, env = "S3FS_BUCKET")]
    pub bucket: Option<String>,

    #[arg(long, env = "S3FS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom S3 endpoint (MinIO, localstack)
    #[arg(long, env = "S3FS_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, env = "S3FS_ACCESS_KEY")]
    pub access_key: Option<String>,

    #[arg(long, env = "S3FS_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    #[arg(long, env = "S3FS_BACKEND", value_enum, default_value = "memory")]
    pub backend: BackendKind,

    /// Globs forcing a download disposition, comma separated
    #[arg(long, env = "S3FS_SAVE_AS", value_delimiter = ',')]
    pub save_as: Vec<String>,

    /// `ttl|glob` rules for time-limited URLs, comma separated
    #[arg(long, env = "S3FS_PRESIGNED", value_delimiter = ',')]
    pub presigned: Vec<String>,

    #[arg(long, env = "S3FS_PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    #[arg(long, env = "S3FS_CDN_DOMAIN")]
    pub cdn_domain: Option<String>,

    #[arg(long, env = "S3FS_CDN_KEY_PAIR_ID")]
    pub cdn_key_pair_id: Option<String>,

    #[arg(long, env = "S3FS_CDN_PRIVATE_KEY_PATH")]
    pub cdn_private_key_path: Option<PathBuf>,

    /// Base URL of the derivative delivery endpoint
    #[arg(long, env = "S3FS_DELIVERY_BASE_URL")]
    pub delivery_base_url: Option<String>,

    #[arg(long, env = "S3FS_STAGING_DIR", default_value = "/tmp/object-store-fs/staging")]
    pub staging_dir: PathBuf,

    /// Shared lock directory; locks are process-local when unset
    #[arg(long, env = "S3FS_LOCK_DIR")]
    pub lock_dir: Option<PathBuf>,

    /// JSON list of `{name, width, height, mode}`
    #[arg(long, env = "S3FS_STYLES_FILE")]
    pub styles_file: Option<PathBuf>,
}

impl StoreSettings {
    pub fn wrapper_config(&self) -> Result<WrapperConfig> {
        let default_bucket = self
            .bucket
            .as_deref()
            .map(|b| BucketName::new(b.to_string()))
            .transpose()
            .context("Invalid S3FS_BUCKET")?;

        let credentials = match (&self.access_key, &self.secret_key) {
            (Some(access_key), Some(secret_key)) => Some(Credentials {
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
            }),
            (None, None) => None,
            _ => anyhow::bail!("S3FS_ACCESS_KEY and S3FS_SECRET_KEY must be set together"),
        };

        let save_as_patterns = self
            .save_as
            .iter()
            .map(|p| p.parse::<PathPattern>())
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid S3FS_SAVE_AS pattern")?;

        let presigned_patterns = self
            .presigned
            .iter()
            .map(|p| p.parse::<PresignedRule>())
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid S3FS_PRESIGNED rule")?;

        let cdn = match &self.cdn_domain {
            Some(domain) => {
                let private_key_pem = self
                    .cdn_private_key_path
                    .as_ref()
                    .map(|path| {
                        std::fs::read_to_string(path).with_context(|| {
                            format!("Failed to read CDN private key {}", path.display())
                        })
                    })
                    .transpose()?;
                Some(CdnSettings {
                    domain: domain.clone(),
                    key_pair_id: self.cdn_key_pair_id.clone(),
                    private_key_pem,
                })
            }
            None => None,
        };

        Ok(WrapperConfig {
            default_bucket,
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            credentials,
            save_as_patterns,
            presigned_patterns,
            public_base_url: self.public_base_url.clone(),
            cdn,
            delivery_base_url: self.delivery_base_url.clone(),
            ..WrapperConfig::default()
        })
    }

    pub fn to_app_config(&self, wrapper: std::sync::Arc<WrapperConfig>) -> Result<AppConfig> {
        let storage_backend = match self.backend {
            BackendKind::S3 => StorageBackend::S3,
            BackendKind::Memory => StorageBackend::InMemory {
                public_base_url: self
                    .public_base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost".to_string()),
                buckets: wrapper.default_bucket.iter().cloned().collect(),
            },
        };

        let lock_backend = match &self.lock_dir {
            Some(dir) => LockBackend::Files { dir: dir.clone() },
            None => LockBackend::InMemory,
        };

        let styles = match &self.styles_file {
            Some(path) => crate::app::load_styles_file(path)?,
            None => Vec::new(),
        };

        Ok(AppConfig {
            storage_backend,
            wrapper,
            lock_backend,
            staging_dir: self.staging_dir.clone(),
            styles,
            derivation: DerivationSettings::default(),
        })
    }
}
