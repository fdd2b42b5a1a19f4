//! Intergroup artifact exchange.
//!
//! Outputs of a Terraform group are exported after it is applied and
//! imported as inputs by later groups that reference them.

mod broker;
mod local;

pub use broker::ArtifactBroker;
pub use local::LocalArtifactBroker;
