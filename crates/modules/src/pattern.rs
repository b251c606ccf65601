//! `regex`: regular expressions for scripts.

use regex::Regex;
use rhai::{Array, Dynamic, ImmutableString, Module};

use crate::{Result, ScriptResult};

pub fn is_match(pattern: &str, text: &str) -> Result<bool> {
    Ok(Regex::new(pattern)?.is_match(text))
}

/// First match, or `None`.
pub fn find(pattern: &str, text: &str) -> Result<Option<String>> {
    Ok(Regex::new(pattern)?
        .find(text)
        .map(|m| m.as_str().to_string()))
}

/// Every non-overlapping match, left to right.
pub fn find_all(pattern: &str, text: &str) -> Result<Vec<String>> {
    Ok(Regex::new(pattern)?
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect())
}

/// Replace every match. `$1` and `${name}` expand capture groups.
pub fn replace(pattern: &str, text: &str, replacement: &str) -> Result<String> {
    Ok(Regex::new(pattern)?
        .replace_all(text, replacement)
        .into_owned())
}

pub fn module() -> Module {
    let mut module = Module::new();
    module.set_native_fn(
        "is_match",
        |pattern: ImmutableString, text: ImmutableString| -> ScriptResult<bool> {
            Ok(is_match(&pattern, &text)?)
        },
    );
    module.set_native_fn(
        "find",
        |pattern: ImmutableString, text: ImmutableString| -> ScriptResult<Dynamic> {
            Ok(find(&pattern, &text)?
                .map(Dynamic::from)
                .unwrap_or(Dynamic::UNIT))
        },
    );
    module.set_native_fn(
        "find_all",
        |pattern: ImmutableString, text: ImmutableString| -> ScriptResult<Array> {
            Ok(find_all(&pattern, &text)?
                .into_iter()
                .map(Dynamic::from)
                .collect())
        },
    );
    module.set_native_fn(
        "replace",
        |pattern: ImmutableString,
         text: ImmutableString,
         replacement: ImmutableString|
         -> ScriptResult<String> { Ok(replace(&pattern, &text, &replacement)?) },
    );
    module
}
