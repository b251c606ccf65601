//! Rule compilation, sandboxing, caching and validation for quarry.
//!
//! [`Engine`] runs the rules of a [`bundle::RuleBundle`]:
//!
//! 1. the invocation inputs are fingerprinted and stored in the environment;
//! 2. a cached program is reused when the fingerprint matches, otherwise the
//!    rule's imports are resolved against the policy and the rule compiled;
//! 3. the program runs and its `result` variable is extracted;
//! 4. built-in categories validate the result against their schema.
//!
//! # Example
//!
//! ```no_run
//! use bundle::{Record, RuleBundle};
//! use runtime::Engine;
//!
//! let engine = Engine::new(RuleBundle::load("novels.yaml")?);
//! let mut inputs = Record::new();
//! inputs.insert("query".into(), "dune".into());
//! for hit in engine.run_search(inputs)? {
//!     println!("{:?}", hit.get("title"));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cache;
mod engine;
mod error;
mod executor;
mod fingerprint;
pub mod helpers;
mod sandbox;
pub mod schema;
pub mod script;

pub use cache::{CacheStats, CompilationCache};
pub use engine::{Engine, EngineBuilder};
pub use error::{Error, Result};
pub use executor::Executor;
pub use fingerprint::Fingerprint;
pub use sandbox::{DEFAULT_MAX_OPERATIONS, ENV, RESULT, RhaiEngine};
pub use schema::{Category, SchemaViolation, ValidatedResult, validate};
pub use script::{CompileRequest, CompiledProgram, Diagnostic, DiagnosticKind, Globals, ScriptEngine};
