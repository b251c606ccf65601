//! Rule execution: fingerprint, cache lookup, compile, run, extract.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bundle::{FunctionTable, Record, RuleDefinition, Value};
use policy::{CapabilityRegistry, Policy, Resolver};

use crate::cache::CompilationCache;
use crate::fingerprint::Fingerprint;
use crate::sandbox::RESULT;
use crate::script::{CompileRequest, CompiledProgram, ScriptEngine};
use crate::{Error, Result};

/// Runs rules against a shared environment, compiling through a cache.
pub struct Executor {
    rules: BTreeMap<String, RuleDefinition>,
    functions: FunctionTable,
    registry: CapabilityRegistry,
    policy: RwLock<Policy>,
    script: Arc<dyn ScriptEngine>,
    cache: CompilationCache,
    env: RwLock<Record>,
}

impl Executor {
    pub fn new(
        rules: BTreeMap<String, RuleDefinition>,
        functions: FunctionTable,
        env: Record,
        registry: CapabilityRegistry,
        policy: Policy,
        script: Arc<dyn ScriptEngine>,
        cache: CompilationCache,
    ) -> Self {
        Self {
            rules,
            functions,
            registry,
            policy: RwLock::new(policy),
            script,
            cache,
            env: RwLock::new(env),
        }
    }

    /// Run `rule` with `inputs`, storing the inputs under `env_key` first.
    ///
    /// A cached program is reused only when the inputs fingerprint matches
    /// the one it was compiled with. A reused program keeps the environment
    /// captured at its compilation.
    pub fn run(&self, rule: &str, env_key: &str, inputs: Value) -> Result<Value> {
        let span = tracing::info_span!("rule", rule, env_key);
        let _enter = span.enter();

        let fingerprint = Fingerprint::of(&inputs);
        self.add_env_var(env_key, inputs.clone());

        let program = self
            .cache
            .get_or_compile(rule, &fingerprint, || self.compile(rule, env_key, inputs))?;

        let mut globals = program.run().map_err(|diagnostic| {
            tracing::error!(%diagnostic, "rule failed");
            Error::Runtime {
                rule: rule.to_string(),
                diagnostic,
            }
        })?;

        match globals.take(RESULT) {
            Some(value) if !value.is_absent() => Ok(value),
            _ => {
                tracing::error!("rule did not set 'result'");
                Err(Error::MissingResult {
                    rule: rule.to_string(),
                })
            }
        }
    }

    fn compile(&self, rule: &str, env_key: &str, inputs: Value) -> Result<Arc<dyn CompiledProgram>> {
        let definition = self
            .rules
            .get(rule)
            .ok_or_else(|| Error::RuleNotFound(rule.to_string()))?;

        let resolution = {
            let policy = read(&self.policy);
            Resolver::new(&self.registry, &policy).resolve(definition, &self.functions)
        };
        let source = format!("{}\n{}", resolution.preamble, definition.code);
        tracing::debug!(allowed = ?resolution.allowed, skipped = resolution.issues.len(), "compiling rule");

        // `env_key` may have been overwritten concurrently; bind this run's inputs.
        let mut env = read(&self.env).clone();
        env.insert(env_key.to_string(), inputs);

        let request = CompileRequest {
            source: source.clone(),
            env,
            capabilities: resolution.allowed,
        };
        self.script.compile(request).map_err(|diagnostic| {
            tracing::error!(%diagnostic, "failed to compile rule");
            Error::Compile {
                rule: rule.to_string(),
                code: source,
                diagnostic,
            }
        })
    }

    /// Insert or replace a top-level environment entry.
    pub fn add_env_var(&self, key: &str, value: Value) {
        write(&self.env).insert(key.to_string(), value);
    }

    pub fn env(&self) -> Record {
        read(&self.env).clone()
    }

    /// Replace the deny list. Cached programs were bound under the old list,
    /// so the cache is cleared.
    pub fn set_deny(&self, deny: impl IntoIterator<Item = String>) {
        write(&self.policy).deny = deny.into_iter().collect();
        self.cache.clear();
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn cache(&self) -> &CompilationCache {
        &self.cache
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{Diagnostic, DiagnosticKind, Globals};
    use std::sync::Mutex;

    /// Records every compile request and returns a program that echoes the
    /// `env` it was compiled with as its result.
    #[derive(Default)]
    struct RecordingEngine {
        requests: Mutex<Vec<CompileRequest>>,
    }

    impl RecordingEngine {
        fn requests(&self) -> Vec<CompileRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    struct Echo(Record);

    impl CompiledProgram for Echo {
        fn run(&self) -> std::result::Result<Globals, Diagnostic> {
            Ok([(RESULT.to_string(), Value::Record(self.0.clone()))].into_iter().collect())
        }
    }

    impl ScriptEngine for RecordingEngine {
        fn compile(&self, request: CompileRequest) -> std::result::Result<Arc<dyn CompiledProgram>, Diagnostic> {
            if request.source.contains("syntax error") {
                return Err(Diagnostic::new(DiagnosticKind::Parse, "unexpected token"));
            }
            let env = request.env.clone();
            self.requests.lock().unwrap().push(request);
            Ok(Arc::new(Echo(env)))
        }
    }

    fn executor(engine: Arc<RecordingEngine>, policy: Policy) -> Executor {
        let rules = [
            (
                "search".to_string(),
                RuleDefinition::new("result = 1;").with_imports(["html", "http", "fn:parseDate", "fn:missing"]),
            ),
            ("broken".to_string(), RuleDefinition::new("syntax error")),
        ]
        .into_iter()
        .collect();
        let functions = [("parseDate".to_string(), "|x| x".to_string())].into_iter().collect();
        Executor::new(
            rules,
            functions,
            Record::new(),
            CapabilityRegistry::builtin(),
            policy,
            engine,
            CompilationCache::default(),
        )
    }

    fn query(q: &str) -> Value {
        Value::Record([("query".to_string(), Value::from(q))].into_iter().collect())
    }

    #[test]
    fn same_inputs_compile_once() {
        let engine = Arc::new(RecordingEngine::default());
        let executor = executor(engine.clone(), Policy::permissive());
        executor.run("search", "search", query("dune")).unwrap();
        executor.run("search", "search", query("dune")).unwrap();
        assert_eq!(engine.requests().len(), 1);
    }

    #[test]
    fn changed_inputs_recompile() {
        let engine = Arc::new(RecordingEngine::default());
        let executor = executor(engine.clone(), Policy::permissive());
        executor.run("search", "search", query("dune")).unwrap();
        executor.run("search", "search", query("emma")).unwrap();
        assert_eq!(engine.requests().len(), 2);
    }

    #[test]
    fn inputs_are_merged_into_env_before_compiling() {
        let engine = Arc::new(RecordingEngine::default());
        let executor = executor(engine.clone(), Policy::permissive());
        executor.add_env_var("base_url", "https://novels.example".into());
        let result = executor.run("search", "search", query("dune")).unwrap();

        assert_eq!(result.get("search"), Some(&query("dune")));
        assert_eq!(result.get("base_url"), Some(&Value::from("https://novels.example")));
    }

    #[test]
    fn cache_hit_keeps_compile_time_env() {
        let engine = Arc::new(RecordingEngine::default());
        let executor = executor(engine.clone(), Policy::permissive());
        executor.run("search", "search", query("dune")).unwrap();
        executor.add_env_var("late", Value::Int(1));
        let result = executor.run("search", "search", query("dune")).unwrap();
        assert_eq!(result.get("late"), None);
        assert_eq!(executor.env().get("late"), Some(&Value::Int(1)));
    }

    #[test]
    fn preamble_reflects_policy() {
        let engine = Arc::new(RecordingEngine::default());
        let executor = executor(engine.clone(), Policy::offline());
        executor.run("search", "search", query("dune")).unwrap();

        let request = &engine.requests()[0];
        assert_eq!(request.capabilities, vec!["html".to_string()]);
        assert!(request.source.starts_with("import \"html\" as html;\nlet fn_parseDate = |x| x;\n"));
        assert!(!request.source.contains("http"));
        assert!(request.source.ends_with("\nresult = 1;"));
    }

    #[test]
    fn set_deny_clears_cache_and_rebinds() {
        let engine = Arc::new(RecordingEngine::default());
        let executor = executor(engine.clone(), Policy::permissive());
        executor.run("search", "search", query("dune")).unwrap();
        executor.set_deny(["html".to_string()]);
        executor.run("search", "search", query("dune")).unwrap();

        let requests = engine.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].capabilities, vec!["html", "http"]);
        assert_eq!(requests[1].capabilities, vec!["http"]);
    }

    #[test]
    fn unknown_rule_is_not_found() {
        let executor = executor(Arc::new(RecordingEngine::default()), Policy::permissive());
        let err = executor.run("content", "content", query("x")).unwrap_err();
        assert!(matches!(err, Error::RuleNotFound(ref rule) if rule == "content"));
    }

    #[test]
    fn compile_failure_carries_rule_and_source() {
        let executor = executor(Arc::new(RecordingEngine::default()), Policy::permissive());
        let err = executor.run("broken", "broken", query("x")).unwrap_err();
        match err {
            Error::Compile { rule, code, diagnostic } => {
                assert_eq!(rule, "broken");
                assert_eq!(code, "\nsyntax error");
                assert_eq!(diagnostic.kind, DiagnosticKind::Parse);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(executor.cache().stats().entries, 0);
    }
}
