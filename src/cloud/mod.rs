//! Compute API integration for robust destroy.
//!
//! This module provides the REST client for networks and firewall rules and
//! the cleanup protocol that runs before a network group is destroyed.

mod client;
mod firewall;
mod token;
mod types;

pub use client::{COMPUTE_API_URL, ComputeApi, ComputeClient};
pub use firewall::{FirewallCleaner, NetworkCleanup};
pub use token::{ACCESS_TOKEN_ENV, AccessTokenSource};
pub use types::{Firewall, Network};
