//! Stream wrapper configuration.
//!
//! A `WrapperConfig` is built once at startup and shared read-only as
//! `Arc<WrapperConfig>`. A process-wide default may be installed exactly once
//! with [`install`]; the first call to [`current`] freezes whatever is
//! installed at that point.

use std::{
    str::FromStr,
    sync::{Arc, OnceLock},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{
    errors::ValidationError,
    value_objects::{BucketName, ObjectKey},
};

/// Default lifetime of presigned URLs when a rule omits it
pub const DEFAULT_PRESIGNED_TTL: Duration = Duration::from_secs(60);

pub const DEFAULT_METADATA_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("A process-wide configuration has already been installed")]
    AlreadyInstalled,

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Failed to read configuration file '{path}': {reason}")]
    File { path: String, reason: String },
}

/// Glob matched against object keys. `*` matches across '/'.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    pattern: glob::Pattern,
}

impl PathPattern {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let pattern = glob::Pattern::new(raw).map_err(|e| ValidationError::InvalidPattern {
            pattern: raw.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: raw.to_string(),
            pattern,
        })
    }

    pub fn matches(&self, key: &ObjectKey) -> bool {
        self.pattern.matches(key.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl FromStr for PathPattern {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for PathPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Keys matching `pattern` are served through time-limited URLs
#[derive(Debug, Clone, PartialEq)]
pub struct PresignedRule {
    pub pattern: PathPattern,
    pub ttl: Duration,
}

impl PresignedRule {
    pub fn new(pattern: &str, ttl: Duration) -> Result<Self, ValidationError> {
        Ok(Self {
            pattern: PathPattern::new(pattern)?,
            ttl,
        })
    }
}

/// Parses `"<ttl seconds>|<glob>"`, or a bare glob with the default TTL
impl FromStr for PresignedRule {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('|') {
            Some((ttl, pattern)) => {
                let secs = ttl
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| ValidationError::InvalidPattern {
                        pattern: s.to_string(),
                        reason: format!("invalid ttl '{}': {}", ttl, e),
                    })?;
                Self::new(pattern.trim(), Duration::from_secs(secs))
            }
            None => Self::new(s.trim(), DEFAULT_PRESIGNED_TTL),
        }
    }
}

impl<'de> Deserialize<'de> for PresignedRule {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// CDN distribution used for signed private delivery
#[derive(Clone, Deserialize)]
pub struct CdnSettings {
    /// Host name of the distribution, e.g. `d111111abcdef8.cloudfront.net`
    pub domain: String,
    pub key_pair_id: Option<String>,
    pub private_key_pem: Option<String>,
}

impl std::fmt::Debug for CdnSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnSettings")
            .field("domain", &self.domain)
            .field("key_pair_id", &self.key_pair_id)
            .field(
                "private_key_pem",
                &self.private_key_pem.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Everything the stream wrapper needs to know about its deployment
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WrapperConfig {
    pub default_bucket: Option<BucketName>,
    pub region: String,
    pub endpoint: Option<String>,
    pub credentials: Option<Credentials>,
    /// Ordered; first match forces a download disposition
    pub save_as_patterns: Vec<PathPattern>,
    /// Ordered; first match selects the URL lifetime
    pub presigned_patterns: Vec<PresignedRule>,
    /// Custom domain (CNAME) replacing the store's own URL
    pub public_base_url: Option<String>,
    pub cdn: Option<CdnSettings>,
    /// Base URL of the derivative delivery endpoint
    pub delivery_base_url: Option<String>,
    pub metadata_cache_capacity: usize,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            default_bucket: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            credentials: None,
            save_as_patterns: Vec::new(),
            presigned_patterns: Vec::new(),
            public_base_url: None,
            cdn: None,
            delivery_base_url: None,
            metadata_cache_capacity: DEFAULT_METADATA_CACHE_CAPACITY,
        }
    }
}

impl WrapperConfig {
    pub fn with_default_bucket(mut self, bucket: BucketName) -> Self {
        self.default_bucket = Some(bucket);
        self
    }

    pub fn with_save_as(mut self, pattern: PathPattern) -> Self {
        self.save_as_patterns.push(pattern);
        self
    }

    pub fn with_presigned(mut self, rule: PresignedRule) -> Self {
        self.presigned_patterns.push(rule);
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }

    pub fn with_cdn(mut self, cdn: CdnSettings) -> Self {
        self.cdn = Some(cdn);
        self
    }

    pub fn with_delivery_base_url(mut self, url: impl Into<String>) -> Self {
        self.delivery_base_url = Some(url.into());
        self
    }

    /// First save-as pattern matching `key`
    pub fn save_as_match(&self, key: &ObjectKey) -> Option<&PathPattern> {
        self.save_as_patterns.iter().find(|p| p.matches(key))
    }

    /// First presigned rule matching `key`
    pub fn presigned_match(&self, key: &ObjectKey) -> Option<&PresignedRule> {
        self.presigned_patterns.iter().find(|r| r.pattern.matches(key))
    }

    /// Load from a JSON document
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file_error = |reason: String| ConfigError::File {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| file_error(e.to_string()))
    }
}

static INSTALLED: OnceLock<Arc<WrapperConfig>> = OnceLock::new();

/// Install the process-wide configuration. Fails once anything has been
/// installed or read.
pub fn install(config: WrapperConfig) -> Result<Arc<WrapperConfig>, ConfigError> {
    let config = Arc::new(config);
    INSTALLED
        .set(config.clone())
        .map_err(|_| ConfigError::AlreadyInstalled)?;
    tracing::debug!(
        default_bucket = ?config.default_bucket,
        "Installed process-wide wrapper configuration"
    );
    Ok(config)
}

/// The process-wide configuration; freezes the defaults if nothing was installed
pub fn current() -> Arc<WrapperConfig> {
    INSTALLED
        .get_or_init(|| Arc::new(WrapperConfig::default()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> ObjectKey {
        ObjectKey::new(k.to_string()).unwrap()
    }

    #[test]
    fn test_star_matches_everything() {
        let all = PathPattern::new("*").unwrap();
        assert!(all.matches(&key("a.txt")));
        assert!(all.matches(&key("deep/nested/file.pdf")));
    }

    #[test]
    fn test_first_match_wins() {
        let config = WrapperConfig::default()
            .with_presigned(PresignedRule::new("private/*", Duration::from_secs(30)).unwrap())
            .with_presigned(PresignedRule::new("*", Duration::from_secs(600)).unwrap());

        let rule = config.presigned_match(&key("private/a.txt")).unwrap();
        assert_eq!(rule.ttl, Duration::from_secs(30));

        let rule = config.presigned_match(&key("public/a.txt")).unwrap();
        assert_eq!(rule.ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_presigned_rule_parsing() {
        let rule: PresignedRule = "120|private/*".parse().unwrap();
        assert_eq!(rule.ttl, Duration::from_secs(120));
        assert_eq!(rule.pattern.as_str(), "private/*");

        let rule: PresignedRule = "secure/*".parse().unwrap();
        assert_eq!(rule.ttl, DEFAULT_PRESIGNED_TTL);

        assert!("soon|private/*".parse::<PresignedRule>().is_err());
        assert!("60|[".parse::<PresignedRule>().is_err());
    }

    #[test]
    fn test_deserialize_config() {
        let config: WrapperConfig = serde_json::from_str(
            r#"{
                "default_bucket": "media",
                "save_as_patterns": ["reports/*"],
                "presigned_patterns": ["300|private/*"],
                "cdn": {"domain": "cdn.example.com", "key_pair_id": "APKAEXAMPLE"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.default_bucket.unwrap().as_str(), "media");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.save_as_patterns[0].as_str(), "reports/*");
        assert_eq!(config.presigned_patterns[0].ttl, Duration::from_secs(300));
        assert!(config.cdn.unwrap().private_key_pem.is_none());
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let creds = Credentials {
            access_key: "AKIA".to_string(),
            secret_key: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
