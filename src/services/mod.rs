pub mod derivative_coordinator;
pub mod metadata_cache;
pub mod stream_wrapper;
pub mod url_signer;

pub use derivative_coordinator::{DeliveryOutcome, DerivationSettings, DerivativeCoordinator};
pub use metadata_cache::MetadataCache;
pub use stream_wrapper::{FileHandle, OpenMode, StatMode, StreamWrapper};
pub use url_signer::{sign_canned_url, CdnUrlSigner, CustomPolicy};
