//! CDN signed URLs (canned and custom policies).
//!
//! The policy document is signed with RSA-SHA1 (PKCS#1 v1.5) and both the
//! signature and any custom policy travel base64-encoded with the URL-safe
//! substitutions `+`→`-`, `=`→`_` and `/`→`~`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rsa::{
    pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, Pkcs1v15Sign, RsaPrivateKey,
};
use serde::Serialize;
use sha1::{Digest, Sha1};

use crate::{
    config::CdnSettings,
    domain::{
        errors::{SigningError, SigningResult},
        value_objects::Locator,
    },
};

#[derive(Serialize)]
struct PolicyDocument<'a> {
    #[serde(rename = "Statement")]
    statement: [Statement<'a>; 1],
}

#[derive(Serialize)]
struct Statement<'a> {
    #[serde(rename = "Resource")]
    resource: &'a str,
    #[serde(rename = "Condition")]
    condition: Condition<'a>,
}

#[derive(Serialize)]
struct Condition<'a> {
    #[serde(rename = "DateLessThan")]
    date_less_than: EpochTime,
    #[serde(rename = "DateGreaterThan", skip_serializing_if = "Option::is_none")]
    date_greater_than: Option<EpochTime>,
    #[serde(rename = "IpAddress", skip_serializing_if = "Option::is_none")]
    ip_address: Option<SourceIp<'a>>,
}

#[derive(Serialize)]
struct EpochTime {
    #[serde(rename = "AWS:EpochTime")]
    epoch: i64,
}

#[derive(Serialize)]
struct SourceIp<'a> {
    #[serde(rename = "AWS:SourceIp")]
    cidr: &'a str,
}

/// A custom policy: wildcard resources, a start time and an IP restriction
#[derive(Debug, Clone, PartialEq)]
pub struct CustomPolicy {
    /// May contain `*` wildcards, e.g. `https://cdn.example.com/private/*`
    pub resource: String,
    pub expires_at: DateTime<Utc>,
    pub not_before: Option<DateTime<Utc>>,
    /// CIDR, e.g. `192.0.2.0/24`
    pub source_ip: Option<String>,
}

impl CustomPolicy {
    pub fn new(resource: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            resource: resource.into(),
            expires_at,
            not_before: None,
            source_ip: None,
        }
    }

    pub fn not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = Some(at);
        self
    }

    pub fn source_ip(mut self, cidr: impl Into<String>) -> Self {
        self.source_ip = Some(cidr.into());
        self
    }

    fn to_json(&self) -> SigningResult<String> {
        policy_json(
            &self.resource,
            self.expires_at,
            self.not_before,
            self.source_ip.as_deref(),
        )
    }
}

fn policy_json(
    resource: &str,
    expires_at: DateTime<Utc>,
    not_before: Option<DateTime<Utc>>,
    source_ip: Option<&str>,
) -> SigningResult<String> {
    let document = PolicyDocument {
        statement: [Statement {
            resource,
            condition: Condition {
                date_less_than: EpochTime {
                    epoch: expires_at.timestamp(),
                },
                date_greater_than: not_before.map(|at| EpochTime {
                    epoch: at.timestamp(),
                }),
                ip_address: source_ip.map(|cidr| SourceIp { cidr }),
            },
        }],
    };
    serde_json::to_string(&document).map_err(|e| SigningError::PolicyEncoding {
        reason: e.to_string(),
    })
}

/// The canned policy signed for `resource_url` until `expires_at`
pub fn canned_policy(resource_url: &str, expires_at: DateTime<Utc>) -> SigningResult<String> {
    policy_json(resource_url, expires_at, None, None)
}

fn url_safe_base64(data: &[u8]) -> String {
    STANDARD
        .encode(data)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '=' => '_',
            '/' => '~',
            other => other,
        })
        .collect()
}

fn sign_policy(policy: &str, key: &RsaPrivateKey) -> SigningResult<String> {
    let digest = Sha1::digest(policy.as_bytes());
    let signature = key
        .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
        .map_err(|e| SigningError::SignatureFailed {
            reason: e.to_string(),
        })?;
    Ok(url_safe_base64(&signature))
}

fn append_query(url: &str, query: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, query)
}

/// Sign `resource_url` with a canned policy.
///
/// Deterministic for identical inputs. Both key parts are required.
pub fn sign_canned_url(
    resource_url: &str,
    expires_at: DateTime<Utc>,
    key_pair_id: Option<&str>,
    private_key: Option<&RsaPrivateKey>,
) -> SigningResult<String> {
    let key_pair_id = key_pair_id
        .filter(|id| !id.is_empty())
        .ok_or(SigningError::Configuration {
            missing: "key pair id",
        })?;
    let private_key = private_key.ok_or(SigningError::Configuration {
        missing: "private key",
    })?;

    let policy = canned_policy(resource_url, expires_at)?;
    let signature = sign_policy(&policy, private_key)?;

    Ok(append_query(
        resource_url,
        &format!(
            "Expires={}&Signature={}&Key-Pair-Id={}",
            expires_at.timestamp(),
            signature,
            key_pair_id
        ),
    ))
}

/// Parse an RSA private key in PKCS#1 or PKCS#8 PEM form
pub fn parse_private_key(pem: &str) -> SigningResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| SigningError::InvalidPrivateKey {
            reason: e.to_string(),
        })
}

/// Signs URLs for one CDN distribution
#[derive(Clone)]
pub struct CdnUrlSigner {
    base_url: String,
    key_pair_id: String,
    private_key: RsaPrivateKey,
}

impl CdnUrlSigner {
    pub fn new(domain: &str, key_pair_id: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        let domain = domain.trim_end_matches('/');
        let base_url = if domain.contains("://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        };
        Self {
            base_url,
            key_pair_id: key_pair_id.into(),
            private_key,
        }
    }

    pub fn from_pem(domain: &str, key_pair_id: impl Into<String>, pem: &str) -> SigningResult<Self> {
        Ok(Self::new(domain, key_pair_id, parse_private_key(pem)?))
    }

    /// Fails fast when the key pair id or key is missing or unusable
    pub fn from_settings(settings: &CdnSettings) -> SigningResult<Self> {
        let key_pair_id = settings
            .key_pair_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(SigningError::Configuration {
                missing: "key pair id",
            })?;
        let pem = settings
            .private_key_pem
            .as_deref()
            .ok_or(SigningError::Configuration {
                missing: "private key",
            })?;
        Self::from_pem(&settings.domain, key_pair_id, pem)
    }

    pub fn key_pair_id(&self) -> &str {
        &self.key_pair_id
    }

    /// Where the distribution serves `locator`
    pub fn resource_url(&self, locator: &Locator) -> String {
        format!("{}/{}", self.base_url, locator.key().url_path())
    }

    pub fn sign(&self, resource_url: &str, expires_at: DateTime<Utc>) -> SigningResult<String> {
        sign_canned_url(
            resource_url,
            expires_at,
            Some(&self.key_pair_id),
            Some(&self.private_key),
        )
    }

    /// Sign `url` under a custom policy, which travels in the `Policy` parameter
    pub fn sign_custom(&self, url: &str, policy: &CustomPolicy) -> SigningResult<String> {
        let json = policy.to_json()?;
        let signature = sign_policy(&json, &self.private_key)?;
        Ok(append_query(
            url,
            &format!(
                "Policy={}&Signature={}&Key-Pair-Id={}",
                url_safe_base64(json.as_bytes()),
                signature,
                self.key_pair_id
            ),
        ))
    }
}

impl std::fmt::Debug for CdnUrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnUrlSigner")
            .field("base_url", &self.base_url)
            .field("key_pair_id", &self.key_pair_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rsa::{
        pkcs1::{EncodeRsaPrivateKey, LineEnding},
        RsaPublicKey,
    };
    use std::collections::HashMap;

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap()
    }

    fn expiry() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    fn query_params(url: &str) -> HashMap<String, String> {
        let (_, query) = url.split_once('?').unwrap();
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn decode_url_safe(value: &str) -> Vec<u8> {
        let standard: String = value
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '=',
                '~' => '/',
                other => other,
            })
            .collect();
        STANDARD.decode(standard).unwrap()
    }

    #[test]
    fn test_canned_policy_layout() {
        let policy = canned_policy("https://cdn.example.com/private/a.pdf", expiry()).unwrap();
        assert_eq!(
            policy,
            r#"{"Statement":[{"Resource":"https://cdn.example.com/private/a.pdf","Condition":{"DateLessThan":{"AWS:EpochTime":1893456000}}}]}"#
        );
    }

    #[test]
    fn test_signed_url_verifies_and_is_deterministic() {
        let key = test_key();
        let url = "https://cdn.example.com/private/a.pdf";

        let signed = sign_canned_url(url, expiry(), Some("APKAEXAMPLE"), Some(&key)).unwrap();
        let again = sign_canned_url(url, expiry(), Some("APKAEXAMPLE"), Some(&key)).unwrap();
        assert_eq!(signed, again);
        assert!(signed.starts_with("https://cdn.example.com/private/a.pdf?Expires=1893456000&"));

        let params = query_params(&signed);
        assert_eq!(params["Key-Pair-Id"], "APKAEXAMPLE");
        let signature = &params["Signature"];
        assert!(!signature.contains(['+', '=', '/']));

        let digest = Sha1::digest(canned_policy(url, expiry()).unwrap().as_bytes());
        RsaPublicKey::from(&key)
            .verify(
                Pkcs1v15Sign::new::<Sha1>(),
                &digest,
                &decode_url_safe(signature),
            )
            .unwrap();
    }

    #[test]
    fn test_missing_key_material() {
        let key = test_key();
        assert_eq!(
            sign_canned_url("https://cdn/x", expiry(), None, Some(&key)),
            Err(SigningError::Configuration {
                missing: "key pair id"
            })
        );
        assert_eq!(
            sign_canned_url("https://cdn/x", expiry(), Some("APKA"), None),
            Err(SigningError::Configuration {
                missing: "private key"
            })
        );

        let settings = CdnSettings {
            domain: "cdn.example.com".to_string(),
            key_pair_id: Some("APKA".to_string()),
            private_key_pem: None,
        };
        assert!(matches!(
            CdnUrlSigner::from_settings(&settings),
            Err(SigningError::Configuration { .. })
        ));
    }

    #[test]
    fn test_pem_loading() {
        let pem = test_key().to_pkcs1_pem(LineEnding::LF).unwrap();
        let signer = CdnUrlSigner::from_pem("cdn.example.com", "APKA", &pem).unwrap();
        let locator = Locator::parse_explicit("s3://media/private/my file.pdf").unwrap();
        assert_eq!(
            signer.resource_url(&locator),
            "https://cdn.example.com/private/my%20file.pdf"
        );

        assert!(matches!(
            CdnUrlSigner::from_pem("cdn.example.com", "APKA", "not a key"),
            Err(SigningError::InvalidPrivateKey { .. })
        ));
    }

    #[test]
    fn test_custom_policy() {
        let key = test_key();
        let signer = CdnUrlSigner::new("https://cdn.example.com/", "APKA", key.clone());
        let policy = CustomPolicy::new("https://cdn.example.com/private/*", expiry())
            .source_ip("192.0.2.0/24");

        let signed = signer
            .sign_custom("https://cdn.example.com/private/a.pdf", &policy)
            .unwrap();
        let params = query_params(&signed);
        assert!(!params.contains_key("Expires"));

        let json = String::from_utf8(decode_url_safe(&params["Policy"])).unwrap();
        assert!(json.contains(r#""IpAddress":{"AWS:SourceIp":"192.0.2.0/24"}"#));
        assert!(!json.contains("DateGreaterThan"));

        let digest = Sha1::digest(json.as_bytes());
        RsaPublicKey::from(&key)
            .verify(
                Pkcs1v15Sign::new::<Sha1>(),
                &digest,
                &decode_url_safe(&params["Signature"]),
            )
            .unwrap();
    }
}
