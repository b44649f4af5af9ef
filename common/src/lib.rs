//! Shared models for `lure`: address bindings, target specifications,
//! configuration and interface helpers.

pub mod binding;
pub mod config;
pub mod network;

pub use binding::AddressBinding;
pub use network::target::{TargetError, TargetSet};
