//! The public rule engine.

use std::sync::Arc;

use bundle::{Metadata, Record, RuleBundle, Value};
use modules::{HostModules, HttpConfig, ModuleProvider};
use policy::{CapabilityRegistry, Policy};

use crate::cache::{CacheStats, CompilationCache};
use crate::executor::Executor;
use crate::sandbox::{DEFAULT_MAX_OPERATIONS, RhaiEngine};
use crate::schema::{self, Category, ValidatedResult};
use crate::script::ScriptEngine;
use crate::{Error, Result};

/// Runs the rules of one bundle.
///
/// `Engine` is `Send + Sync`; share it behind an `Arc` to run rules from
/// several threads.
pub struct Engine {
    metadata: Metadata,
    executor: Executor,
}

impl Engine {
    /// An engine with the built-in modules, a permissive policy and caching on.
    pub fn new(bundle: RuleBundle) -> Self {
        Self::builder(bundle).build()
    }

    pub fn builder(bundle: RuleBundle) -> EngineBuilder {
        EngineBuilder::new(bundle)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Run the `search` rule. Non-record items are dropped.
    pub fn run_search(&self, inputs: Record) -> Result<Vec<Record>> {
        Ok(self.run_category(Category::Search, inputs)?.into_list())
    }

    /// Run the `item-info` rule.
    pub fn run_item_info(&self, inputs: Record) -> Result<Record> {
        self.run_single(Category::ItemInfo, inputs)
    }

    /// Run the `chapter-list` rule. Non-record items are dropped.
    pub fn run_chapter_list(&self, inputs: Record) -> Result<Vec<Record>> {
        Ok(self.run_category(Category::ChapterList, inputs)?.into_list())
    }

    /// Run the `content` rule.
    pub fn run_content(&self, inputs: Record) -> Result<Record> {
        self.run_single(Category::Content, inputs)
    }

    /// Run a built-in category and validate its result.
    pub fn run_category(&self, category: Category, inputs: Record) -> Result<ValidatedResult> {
        let rule = category.rule_id();
        let raw = self
            .executor
            .run(rule, &schema::env_key(rule), Value::Record(inputs))?;
        schema::validate(category, raw).map_err(|violation| {
            tracing::error!(%violation, "result rejected");
            Error::from(violation)
        })
    }

    fn run_single(&self, category: Category, inputs: Record) -> Result<Record> {
        match self.run_category(category, inputs)? {
            ValidatedResult::Single(record) => Ok(record),
            ValidatedResult::List(_) => unreachable!("{category} validates to a single record"),
        }
    }

    /// Run any rule by identifier without schema validation.
    pub fn run_rule(&self, rule: &str, inputs: Record) -> Result<Value> {
        self.executor
            .run(rule, &schema::env_key(rule), Value::Record(inputs))
    }

    /// Add or replace a persistent environment entry.
    pub fn add_env_var(&self, key: impl AsRef<str>, value: impl Into<Value>) {
        self.executor.add_env_var(key.as_ref(), value.into());
    }

    /// Snapshot of the persistent environment.
    pub fn env(&self) -> Record {
        self.executor.env()
    }

    /// Replace the capability deny list. Clears the compilation cache.
    pub fn set_deny<I, S>(&self, deny: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.executor.set_deny(deny.into_iter().map(Into::into));
    }

    pub fn enable_cache(&self) {
        self.executor.cache().enable();
    }

    /// Turn caching off and drop every compiled program.
    pub fn disable_cache(&self) {
        self.executor.cache().disable();
    }

    pub fn clear_cache(&self) {
        self.executor.cache().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.executor.cache().stats()
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.executor.rule_ids()
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    bundle: RuleBundle,
    policy: Policy,
    registry: CapabilityRegistry,
    modules: Option<Arc<dyn ModuleProvider>>,
    script: Option<Arc<dyn ScriptEngine>>,
    http: HttpConfig,
    max_operations: u64,
    cache: bool,
}

impl EngineBuilder {
    fn new(bundle: RuleBundle) -> Self {
        Self {
            bundle,
            policy: Policy::permissive(),
            registry: CapabilityRegistry::builtin(),
            modules: None,
            script: None,
            http: HttpConfig::default(),
            max_operations: DEFAULT_MAX_OPERATIONS,
            cache: true,
        }
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the built-in capability modules.
    pub fn modules(mut self, modules: Arc<dyn ModuleProvider>) -> Self {
        self.modules = Some(modules);
        self
    }

    /// Replace the rhai engine entirely. `modules`, `http` and
    /// `max_operations` are then ignored.
    pub fn script_engine(mut self, script: Arc<dyn ScriptEngine>) -> Self {
        self.script = Some(script);
        self
    }

    pub fn http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    pub fn max_operations(mut self, max_operations: u64) -> Self {
        self.max_operations = max_operations;
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    pub fn build(self) -> Engine {
        let script: Arc<dyn ScriptEngine> = match self.script {
            Some(script) => script,
            None => {
                let modules: Arc<dyn ModuleProvider> = match self.modules {
                    Some(modules) => modules,
                    None => Arc::new(HostModules::new(self.http)),
                };
                Arc::new(RhaiEngine::new(modules).with_max_operations(self.max_operations))
            }
        };

        let RuleBundle {
            metadata,
            env,
            rules,
            functions,
        } = self.bundle;

        tracing::debug!(
            name = %metadata.name,
            rules = rules.len(),
            deny = ?self.policy.deny,
            cache = self.cache,
            "engine ready"
        );

        Engine {
            metadata,
            executor: Executor::new(
                rules,
                functions,
                env,
                self.registry,
                self.policy,
                script,
                CompilationCache::new(self.cache),
            ),
        }
    }
}
