// Domain layer: gateway data model and the adapter port. No network code lives here.

pub mod credential;
pub mod model;
pub mod ports;
