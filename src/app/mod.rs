pub mod bootstrap;

pub use bootstrap::{build_gateway, build_gateway_with_credentials};
