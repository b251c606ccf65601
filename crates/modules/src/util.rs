//! `util`: string and URL helpers for scraping rules.

use std::sync::LazyLock;

use regex::Regex;
use rhai::{Array, Dynamic, ImmutableString, Map, Module};
use url::Url;

use crate::{Result, ScriptResult};

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

const TITLE_SUFFIXES: [&str; 3] = [" - Novel", " - Volume", " Novel"];

/// Trim whitespace and common listing suffixes from a title.
pub fn title_clean(title: &str) -> String {
    let mut clean = title.trim();
    for suffix in TITLE_SUFFIXES {
        clean = clean.strip_suffix(suffix).unwrap_or(clean);
    }
    clean.to_string()
}

/// Lowercase and replace spaces with dashes.
pub fn slugify(s: &str) -> String {
    s.replace(' ', "-").to_lowercase()
}

/// First run of digits in `s`, or 0.
pub fn chapter_number(s: &str) -> i64 {
    DIGITS
        .find(s)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Resolve `relative` against `base`.
pub fn absolute_url(base: &str, relative: &str) -> Result<String> {
    Ok(Url::parse(base)?.join(relative)?.to_string())
}

pub fn is_chapter_url(url: &str) -> bool {
    url.to_lowercase().contains("chapter")
}

/// Keep string items that look like chapter links.
pub fn filter_chapter_links(links: Array) -> Array {
    links
        .into_iter()
        .filter(|item| item.is_string() && is_chapter_url(&item.to_string()))
        .collect()
}

/// Sort chapter records by the number in their title.
///
/// The sort is stable, so chapters without a number keep their relative
/// order at the front. Non-record items are dropped.
pub fn sort_chapters(chapters: Array) -> Array {
    let mut records: Vec<(i64, Dynamic)> = chapters
        .into_iter()
        .filter(|item| item.is_map())
        .map(|item| {
            let number = item
                .read_lock::<Map>()
                .and_then(|m| m.get("title").map(|t| chapter_number(&t.to_string())))
                .unwrap_or(0);
            (number, item)
        })
        .collect();
    records.sort_by_key(|(number, _)| *number);
    records.into_iter().map(|(_, item)| item).collect()
}

pub fn module() -> Module {
    let mut module = Module::new();

    module.set_native_fn("title_clean", |s: ImmutableString| -> ScriptResult<String> {
        Ok(title_clean(&s))
    });
    module.set_native_fn("slugify", |s: ImmutableString| -> ScriptResult<String> {
        Ok(slugify(&s))
    });
    module.set_native_fn("chapter_number", |s: ImmutableString| -> ScriptResult<i64> {
        Ok(chapter_number(&s))
    });
    module.set_native_fn(
        "absolute_url",
        |base: ImmutableString, relative: ImmutableString| -> ScriptResult<String> {
            Ok(absolute_url(&base, &relative)?)
        },
    );
    module.set_native_fn("is_chapter_url", |s: ImmutableString| -> ScriptResult<bool> {
        Ok(is_chapter_url(&s))
    });
    module.set_native_fn("filter_chapter_links", |links: Array| -> ScriptResult<Array> {
        Ok(filter_chapter_links(links))
    });
    module.set_native_fn("sort_chapters", |chapters: Array| -> ScriptResult<Array> {
        Ok(sort_chapters(chapters))
    });

    module
}
