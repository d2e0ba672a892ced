pub mod credentials;
pub mod gateway;

pub use crate::domain::credential::Credential;
pub use crate::domain::model::{CallRequest, CallResult, ErrorKind, Payload, ServiceDescriptor};
pub use crate::domain::ports::{AdapterError, ServiceAdapter};
pub use crate::utils::error::Result;
pub use credentials::CredentialStore;
pub use gateway::{GatewayBuilder, ServiceGateway};
