// Adapters layer: one `ServiceAdapter` implementation per vendor kind.

pub mod oauth;
pub mod rest;
#[cfg(feature = "s3")]
pub mod s3;

pub use oauth::OAuthClientCredentialsAdapter;
pub use rest::{AuthPlacement, BodyEncoding, RestAdapter};
#[cfg(feature = "s3")]
pub use s3::S3Adapter;
