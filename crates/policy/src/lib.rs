//! Capability-based import policy for rule scripts.
//!
//! Core principle: **a rule only sees the capabilities it imported and the
//! policy allowed.**

mod capability;
mod error;
mod policy;
mod resolve;

pub use capability::{Capability, CapabilityKind, CapabilityRegistry, names};
pub use error::{Error, Result};
pub use policy::{Decision, Policy};
pub use resolve::{FUNCTION_PREFIX, Import, ImportIssue, Resolution, Resolver, function_identifier};
