//! [`ScriptEngine`] backed by rhai.
//!
//! Every compiled rule gets its own engine instance whose module resolver
//! holds only the capabilities the rule was granted. Anything else is simply
//! not importable. Undefined variables are rejected at compile time and the
//! operation budget bounds every run.

use std::sync::Arc;

use modules::{ModuleProvider, convert};
use rhai::module_resolvers::StaticModuleResolver;
use rhai::{
    AST, Dynamic, EvalAltResult, ImmutableString, OptimizationLevel, ParseError, ParseErrorType, Position, Scope,
};

use crate::helpers;
use crate::script::{CompileRequest, CompiledProgram, Diagnostic, DiagnosticKind, Globals, ScriptEngine};

/// Name of the immutable environment object.
pub const ENV: &str = "env";
/// Name of the variable a rule assigns its output to.
pub const RESULT: &str = "result";

/// Default operation budget per run.
pub const DEFAULT_MAX_OPERATIONS: u64 = 5_000_000;

pub struct RhaiEngine {
    modules: Arc<dyn ModuleProvider>,
    max_operations: u64,
}

impl RhaiEngine {
    pub fn new(modules: Arc<dyn ModuleProvider>) -> Self {
        Self {
            modules,
            max_operations: DEFAULT_MAX_OPERATIONS,
        }
    }

    /// Cap the operations a single run may perform. Zero means unlimited.
    pub fn with_max_operations(mut self, max_operations: u64) -> Self {
        self.max_operations = max_operations;
        self
    }

    fn engine_for(&self, capabilities: &[String]) -> rhai::Engine {
        let mut resolver = StaticModuleResolver::new();
        for name in capabilities {
            match self.modules.module(name) {
                Some(module) => resolver.insert(name.as_str(), (*module).clone()),
                None => tracing::warn!(capability = %name, "no module provides capability"),
            }
        }

        // `env` is a scope constant; folding it would turn property writes
        // into assignments to literals.
        let mut engine = rhai::Engine::new();
        engine
            .set_optimization_level(OptimizationLevel::None)
            .set_strict_variables(true)
            .set_max_operations(self.max_operations)
            .set_module_resolver(resolver);
        engine
            .register_fn("url_encode", |s: ImmutableString| helpers::url_encode(&s))
            .register_fn("to_title_case", |s: ImmutableString| helpers::to_title_case(&s));
        modules::register_types(&mut engine);
        engine
    }
}

impl ScriptEngine for RhaiEngine {
    fn compile(&self, request: CompileRequest) -> Result<Arc<dyn CompiledProgram>, Diagnostic> {
        let engine = self.engine_for(&request.capabilities);
        let env = Dynamic::from_map(convert::record_to_map(&request.env));
        let ast = engine
            .compile_with_scope(&initial_scope(&env), &request.source)
            .map_err(parse_diagnostic)?;
        Ok(Arc::new(RhaiProgram { engine, ast, env }))
    }
}

struct RhaiProgram {
    engine: rhai::Engine,
    ast: AST,
    env: Dynamic,
}

impl CompiledProgram for RhaiProgram {
    fn run(&self) -> Result<Globals, Diagnostic> {
        let mut scope = initial_scope(&self.env);
        self.engine
            .run_ast_with_scope(&mut scope, &self.ast)
            .map_err(|e| runtime_diagnostic(*e))?;

        // Later entries shadow earlier ones with the same name.
        Ok(scope
            .iter_raw()
            .map(|(name, _, value)| (name.to_string(), convert::from_dynamic(value)))
            .collect())
    }
}

fn initial_scope(env: &Dynamic) -> Scope<'static> {
    let mut scope = Scope::new();
    scope.push_constant_dynamic(ENV, env.clone());
    scope.push_dynamic(RESULT, Dynamic::UNIT);
    scope
}

fn location(position: Position) -> Option<String> {
    (!position.is_none()).then(|| position.to_string())
}

fn parse_diagnostic(err: ParseError) -> Diagnostic {
    let kind = match err.err_type() {
        ParseErrorType::VariableUndefined(_) | ParseErrorType::ModuleUndefined(_) => {
            DiagnosticKind::Compile
        }
        _ => DiagnosticKind::Parse,
    };
    Diagnostic {
        kind,
        message: err.err_type().to_string(),
        location: location(err.position()),
    }
}

fn runtime_diagnostic(mut err: EvalAltResult) -> Diagnostic {
    let position = err.take_position();
    Diagnostic {
        kind: DiagnosticKind::Runtime,
        message: err.to_string(),
        location: location(position),
    }
}
