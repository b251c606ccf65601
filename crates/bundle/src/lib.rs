//! Rule bundles for quarry.
//!
//! A bundle is the unit of distribution for scraping rules: a metadata
//! header, an initial environment, a set of rules keyed by identifier and a
//! table of named function snippets that rules may inline.
//!
//! # Overview
//!
//! - [`RuleBundle`]: the parsed bundle, loadable from YAML or TOML.
//! - [`RuleDefinition`]: imports plus script body for one rule.
//! - [`Value`] / [`Record`]: the typed values used for environments and
//!   rule results across the workspace.
//!
//! Bundles are read once at startup and treated as immutable afterwards.
//!
//! # Example
//!
//! ```no_run
//! use bundle::RuleBundle;
//!
//! let bundle = RuleBundle::load("novels.yaml")?;
//! for (id, rule) in &bundle.rules {
//!     println!("{id}: {} imports", rule.imports.len());
//! }
//! # Ok::<(), bundle::Error>(())
//! ```

mod error;
mod loader;
mod rule;
mod value;

pub use error::{Error, Result};
pub use loader::RuleBundle;
pub use rule::{FunctionTable, Metadata, RuleDefinition, ids};
pub use value::{Record, Value};
