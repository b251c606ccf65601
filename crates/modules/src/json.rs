//! `json`: JSON encoding for scripts.

use bundle::Value;
use rhai::{Dynamic, ImmutableString, Module};

use crate::convert::{from_dynamic, to_dynamic};
use crate::{Result, ScriptResult};

/// Parse JSON text into a script value. `null` becomes unit.
pub fn parse(text: &str) -> Result<Dynamic> {
    let value: Value = serde_json::from_str(text)?;
    Ok(to_dynamic(&value))
}

/// Serialize a script value as compact JSON.
pub fn stringify(value: &Dynamic) -> Result<String> {
    Ok(serde_json::to_string(&from_dynamic(value))?)
}

pub fn module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("parse", |text: ImmutableString| -> ScriptResult<Dynamic> {
        Ok(parse(&text)?)
    });
    module.set_native_fn("stringify", |value: Dynamic| -> ScriptResult<String> {
        Ok(stringify(&value)?)
    });
    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::Map;

    #[test]
    fn parses_objects_into_maps() {
        let parsed = parse(r#"{"title": "Dune", "chapters": 22, "tags": ["sf"], "cover": null}"#).unwrap();
        let map = parsed.read_lock::<Map>().unwrap();
        assert_eq!(map.get("title").unwrap().to_string(), "Dune");
        assert_eq!(map.get("chapters").unwrap().as_int().unwrap(), 22);
        assert!(map.get("cover").unwrap().is_unit());
        assert!(map.get("tags").unwrap().is_array());
    }

    #[test]
    fn stringify_sorts_keys() {
        let mut map = Map::new();
        map.insert("b".into(), Dynamic::from(2_i64));
        map.insert("a".into(), Dynamic::from("x".to_string()));
        assert_eq!(stringify(&Dynamic::from_map(map)).unwrap(), r#"{"a":"x","b":2}"#);
    }

    #[test]
    fn malformed_text_is_an_error() {
        let err = parse("{not json").unwrap_err();
        assert!(err.to_string().starts_with("json: "));
    }
}
