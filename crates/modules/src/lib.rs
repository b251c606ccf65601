//! Host capability modules for quarry rules.
//!
//! Each module backs one entry of [`policy::CapabilityRegistry::builtin`].
//! Modules are handed to the script engine through a [`ModuleProvider`] and
//! only the ones a rule was granted become resolvable inside it.
//!
//! | module  | functions |
//! |---------|-----------|
//! | `json`  | `parse`, `stringify` |
//! | `regex` | `is_match`, `find`, `find_all`, `replace` |
//! | `log`   | `debug`, `info`, `warn`, `error` |
//! | `http`  | `get`, `post` |
//! | `html`  | `parse`, `serialize`, `query`, `query_all`, `query_text`, `attr`, `text` |
//! | `times` | `now`, `parse`, `format` |
//! | `util`  | `title_clean`, `slugify`, `chapter_number`, `absolute_url`, ... |

use std::collections::BTreeMap;

use policy::names;
use rhai::{Module, Shared};

pub mod convert;
mod error;
pub mod html;
pub mod http;
pub mod json;
pub mod log;
pub mod pattern;
pub mod times;
pub mod util;

pub use error::{Error, Result};
pub use html::HtmlNode;
pub use http::HttpConfig;

pub(crate) type ScriptResult<T> = std::result::Result<T, Box<rhai::EvalAltResult>>;

/// Source of capability modules, looked up by capability name.
pub trait ModuleProvider: Send + Sync {
    fn module(&self, name: &str) -> Option<Shared<Module>>;
}

/// The built-in modules, built once and shared by every compiled rule.
#[derive(Debug, Clone)]
pub struct HostModules {
    modules: BTreeMap<&'static str, Shared<Module>>,
}

impl HostModules {
    pub fn new(http: HttpConfig) -> Self {
        let modules = [
            (names::JSON, json::module()),
            (names::REGEX, pattern::module()),
            (names::LOG, log::module()),
            (names::HTTP, http::module(http)),
            (names::HTML, html::module()),
            (names::TIMES, times::module()),
            (names::UTIL, util::module()),
        ]
        .into_iter()
        .map(|(name, module)| (name, Shared::new(module)))
        .collect();
        Self { modules }
    }
}

impl Default for HostModules {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

impl ModuleProvider for HostModules {
    fn module(&self, name: &str) -> Option<Shared<Module>> {
        self.modules.get(name).cloned()
    }
}

/// Register the custom types host modules hand to scripts.
pub fn register_types(engine: &mut rhai::Engine) {
    engine
        .register_type_with_name::<HtmlNode>("html-node")
        .register_fn("to_string", |node: &mut HtmlNode| node.markup());
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::CapabilityRegistry;

    #[test]
    fn every_builtin_capability_has_a_module() {
        let modules = HostModules::default();
        for name in CapabilityRegistry::builtin().names() {
            assert!(modules.module(name).is_some(), "no module for {name}");
        }
    }

    #[test]
    fn unknown_name_has_no_module() {
        assert!(HostModules::default().module("fs").is_none());
    }
}
