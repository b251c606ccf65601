//! `log`: structured logging from scripts.
//!
//! `log::info("fetched", "url", u, "status", s)` emits a `tracing` event
//! under target `quarry::script`. Trailing arguments are key/value pairs,
//! at most nine of them per call.

use rhai::{Dynamic, Module};

use crate::{Error, Result, ScriptResult};

#[derive(Debug, Clone, Copy)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn name(self) -> &'static str {
        match self {
            Level::Debug => "log.debug",
            Level::Info => "log.info",
            Level::Warn => "log.warn",
            Level::Error => "log.error",
        }
    }
}

/// Registers one overload of `$name` per argument list.
macro_rules! overloads {
    ($module:ident, $name:ident, $level:ident; $( ($($arg:ident),+) )+) => {
        $(
            $module.set_native_fn($name, move |$($arg: Dynamic),+| -> ScriptResult<()> {
                emit($level, &[$($arg),+]).map_err(Into::into)
            });
        )+
    };
}

pub fn module() -> Module {
    let mut module = Module::new();
    for (name, level) in [
        ("debug", Level::Debug),
        ("info", Level::Info),
        ("warn", Level::Warn),
        ("error", Level::Error),
    ] {
        // Odd pair counts are rejected at call time by `format_event`.
        overloads!(module, name, level;
            (m)
            (m, a1)
            (m, a1, a2)
            (m, a1, a2, a3)
            (m, a1, a2, a3, a4)
            (m, a1, a2, a3, a4, a5)
            (m, a1, a2, a3, a4, a5, a6)
            (m, a1, a2, a3, a4, a5, a6, a7)
            (m, a1, a2, a3, a4, a5, a6, a7, a8)
            (m, a1, a2, a3, a4, a5, a6, a7, a8, a9)
            (m, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10)
            (m, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11)
            (m, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12)
            (m, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13)
            (m, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14)
            (m, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14, a15)
            (m, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14, a15, a16)
            (m, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14, a15, a16, a17)
            (m, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14, a15, a16, a17, a18)
        );
    }
    module
}

fn emit(level: Level, args: &[Dynamic]) -> Result<()> {
    let (message, fields) = format_event(level, args)?;
    match level {
        Level::Debug => tracing::debug!(target: "quarry::script", fields = %fields, "{message}"),
        Level::Info => tracing::info!(target: "quarry::script", fields = %fields, "{message}"),
        Level::Warn => tracing::warn!(target: "quarry::script", fields = %fields, "{message}"),
        Level::Error => tracing::error!(target: "quarry::script", fields = %fields, "{message}"),
    }
    Ok(())
}

/// Split call arguments into the message and a `key=value` field string.
fn format_event(level: Level, args: &[Dynamic]) -> Result<(String, String)> {
    let func = level.name();
    let Some((message, pairs)) = args.split_first() else {
        return Err(Error::usage(func, "expected at least one argument"));
    };
    if !message.is_string() {
        return Err(Error::usage(func, "first argument must be a string"));
    }
    if pairs.len() % 2 != 0 {
        return Err(Error::usage(func, "key-value pairs must be even in number"));
    }

    let mut fields = Vec::with_capacity(pairs.len() / 2);
    for pair in pairs.chunks(2) {
        if !pair[0].is_string() {
            return Err(Error::usage(func, "key must be a string"));
        }
        fields.push(format!("{}={}", pair[0], pair[1]));
    }
    Ok((message.to_string(), fields.join(" ")))
}
