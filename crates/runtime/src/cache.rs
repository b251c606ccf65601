//! Per-rule compilation cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::Result;
use crate::fingerprint::Fingerprint;
use crate::script::CompiledProgram;

struct CacheEntry {
    program: Arc<dyn CompiledProgram>,
    fingerprint: Fingerprint,
}

struct State {
    enabled: bool,
    entries: HashMap<String, CacheEntry>,
    compiles: u64,
    hits: u64,
}

/// Counters reported by [`CompilationCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub compiles: u64,
    pub hits: u64,
    pub entries: usize,
}

/// Maps rule ids to compiled programs and the fingerprint that produced them.
///
/// The whole lookup, evict, compile, insert sequence runs under one lock, so
/// an entry's program and fingerprint always belong together. Running a
/// program happens outside the lock.
pub struct CompilationCache {
    state: Mutex<State>,
}

impl CompilationCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            state: Mutex::new(State {
                enabled,
                entries: HashMap::new(),
                compiles: 0,
                hits: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached program for `rule` if it was compiled from inputs
    /// with the same fingerprint, otherwise compile a fresh one.
    ///
    /// A stale entry is evicted before `compile` runs, so a failed compile
    /// leaves the rule uncached.
    pub fn get_or_compile<F>(
        &self,
        rule: &str,
        fingerprint: &Fingerprint,
        compile: F,
    ) -> Result<Arc<dyn CompiledProgram>>
    where
        F: FnOnce() -> Result<Arc<dyn CompiledProgram>>,
    {
        let mut state = self.lock();

        if state.enabled {
            match state.entries.get(rule) {
                Some(entry) if entry.fingerprint == *fingerprint => {
                    let program = Arc::clone(&entry.program);
                    state.hits += 1;
                    tracing::debug!(rule, %fingerprint, "cache hit");
                    return Ok(program);
                }
                Some(entry) => {
                    tracing::debug!(rule, old = %entry.fingerprint, new = %fingerprint, "inputs changed, evicting");
                    state.entries.remove(rule);
                }
                None => {}
            }
        }

        let program = compile()?;
        state.compiles += 1;

        if state.enabled {
            state.entries.insert(
                rule.to_string(),
                CacheEntry {
                    program: Arc::clone(&program),
                    fingerprint: fingerprint.clone(),
                },
            );
        }
        Ok(program)
    }

    pub fn enable(&self) {
        self.lock().enabled = true;
    }

    /// Turn caching off and drop every entry in one step.
    pub fn disable(&self) {
        let mut state = self.lock();
        state.enabled = false;
        state.entries.clear();
    }

    /// Drop every entry, keeping caching on or off as it was.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            enabled: state.enabled,
            compiles: state.compiles,
            hits: state.hits,
            entries: state.entries.len(),
        }
    }
}

impl Default for CompilationCache {
    fn default() -> Self {
        Self::new(true)
    }
}
