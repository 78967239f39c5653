mod bucket_name;
mod derived_locator;
mod locator;
mod object_key;
mod style_name;

pub use bucket_name::BucketName;
pub use derived_locator::{derived_key, DerivedLocator, STYLES_PREFIX};
pub use locator::{Locator, ParsedUri, SCHEME};
pub use object_key::ObjectKey;
pub use style_name::StyleName;
