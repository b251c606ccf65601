use std::sync::Arc;
use std::thread;

use bundle::{Record, RuleBundle, Value};
use policy::Policy;
use runtime::{DiagnosticKind, Engine, Error, SchemaViolation};

const BUNDLE: &str = r#"
metadata:
  name: Example Novels
  version: "1.0"
  author: quarry
  language: en
  sources: ["https://novels.example"]
  identifier: example-novels
env:
  base_url: https://novels.example
functions:
  parseDate: "|x| `date:${x}`"
  text.shout: "|s| s.to_upper()"
rules:
  search:
    imports: [html, util]
    code: |
      let doc = html::parse(`
        <ul>
          <li><a href="/novel/dune">Dune - Novel</a></li>
          <li><a href="/novel/emma">Emma</a></li>
        </ul>`);
      result = [];
      for a in html::query_all(doc, "a") {
          result.push(#{
              title: util::title_clean(html::text(a)),
              url: util::absolute_url(env.base_url, html::attr(a, "href")),
          });
      }
      result.push(42);
  item-info:
    code: |
      result = #{
          title: to_title_case(env.item_info.slug),
          cover: "", author: "", description: "", status: "ongoing",
          genres: env.item_info.genres,
      };
  chapter-list:
    imports: [util]
    code: |
      result = util::sort_chapters([
          #{ title: "Chapter 10", url: "/c/10" },
          #{ title: "Chapter 2", url: "/c/2" },
          #{ title: "Chapter 1" },
      ]);
  content:
    imports: ["fn:parseDate", "fn:text.shout"]
    code: |
      result = #{
          title: fn_text_shout.call(env.content.title),
          content: fn_parseDate.call(env.content.day),
      };
  silent:
    code: "let x = 1;"
  missing-fn:
    imports: ["fn:nope"]
    code: "result = fn_nope.call(1);"
  slug:
    imports: [util]
    code: "result = util::slugify(env.slug.name);"
"#;

fn engine() -> Engine {
    Engine::new(RuleBundle::from_yaml(BUNDLE).unwrap())
}

fn record(pairs: &[(&str, Value)]) -> Record {
    pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
}

fn content_inputs(title: &str) -> Record {
    record(&[("title", title.into()), ("day", "monday".into())])
}

#[test]
fn content_rule_yields_exact_record() {
    let engine = engine();
    let content = engine.run_content(content_inputs("prologue")).unwrap();
    assert_eq!(
        content,
        record(&[("title", "PROLOGUE".into()), ("content", "date:monday".into())])
    );
}

#[test]
fn rule_without_result_is_missing_result() {
    let err = engine().run_rule("silent", Record::new()).unwrap_err();
    assert!(matches!(err, Error::MissingResult { ref rule } if rule == "silent"));
}

#[test]
fn search_drops_non_records_and_resolves_urls() {
    let hits = engine().run_search(Record::new()).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].get("title"), Some(&Value::from("Dune")));
    assert_eq!(
        hits[1].get("url"),
        Some(&Value::from("https://novels.example/novel/emma"))
    );
}

#[test]
fn chapter_list_missing_key_names_the_index() {
    let err = engine().run_chapter_list(Record::new()).unwrap_err();
    match err {
        Error::Schema(SchemaViolation::MissingField { field, index, .. }) => {
            assert_eq!(field, "url");
            assert_eq!(index, Some(0));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn item_info_checks_genres_shape() {
    let engine = engine();
    let ok = engine
        .run_item_info(record(&[
            ("slug", "lord-of-the-rings".into()),
            ("genres", Value::Sequence(vec!["fantasy".into()])),
        ]))
        .unwrap();
    assert_eq!(ok.get("title"), Some(&Value::from("Lord-of-the-Rings")));

    let err = engine
        .run_item_info(record(&[
            ("slug", "dune".into()),
            ("genres", "fantasy".into()),
        ]))
        .unwrap_err();
    assert!(matches!(err, Error::Schema(SchemaViolation::ShapeMismatch { .. })));
}

#[test]
fn missing_function_snippet_fails_compilation() {
    let err = engine().run_rule("missing-fn", Record::new()).unwrap_err();
    match err {
        Error::Compile { rule, diagnostic, .. } => {
            assert_eq!(rule, "missing-fn");
            assert_eq!(diagnostic.kind, DiagnosticKind::Compile);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn denied_capability_is_not_available() {
    let engine = Engine::builder(RuleBundle::from_yaml(BUNDLE).unwrap())
        .policy(Policy::permissive().with_deny(["util"]))
        .build();
    let name = record(&[("name", "Lord of Mysteries".into())]);
    let err = engine.run_rule("slug", name.clone()).unwrap_err();
    assert!(matches!(err, Error::Compile { .. }));

    engine.set_deny(Vec::<String>::new());
    assert_eq!(
        engine.run_rule("slug", name).unwrap(),
        Value::from("lord-of-mysteries")
    );
}

#[test]
fn changed_inputs_recompile_and_equal_inputs_hit() {
    let engine = engine();
    engine.run_content(content_inputs("a")).unwrap();
    engine.run_content(content_inputs("a")).unwrap();
    let stats = engine.cache_stats();
    assert_eq!((stats.compiles, stats.hits), (1, 1));

    let second = engine.run_content(content_inputs("b")).unwrap();
    assert_eq!(second.get("title"), Some(&Value::from("B")));
    assert_eq!(engine.cache_stats().compiles, 2);
}

#[test]
fn reordered_inputs_share_a_program() {
    let engine = engine();
    let forward: Record = [("day", Value::from("mon")), ("title", Value::from("t"))]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let backward: Record = [("title", Value::from("t")), ("day", Value::from("mon"))]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    engine.run_content(forward).unwrap();
    engine.run_content(backward).unwrap();
    assert_eq!(engine.cache_stats().compiles, 1);
}

#[test]
fn disabling_cache_forces_recompilation() {
    let engine = engine();
    engine.run_content(content_inputs("a")).unwrap();
    engine.disable_cache();
    assert_eq!(engine.cache_stats().entries, 0);

    engine.run_content(content_inputs("a")).unwrap();
    engine.run_content(content_inputs("a")).unwrap();
    assert_eq!(engine.cache_stats().compiles, 3);

    engine.enable_cache();
    engine.run_content(content_inputs("a")).unwrap();
    engine.run_content(content_inputs("a")).unwrap();
    assert_eq!(engine.cache_stats().compiles, 4);
}

#[test]
fn inputs_persist_in_env() {
    let engine = engine();
    engine.add_env_var("session", "abc");
    engine.run_content(content_inputs("a")).unwrap();
    let env = engine.env();
    assert_eq!(env.get("session"), Some(&Value::from("abc")));
    assert_eq!(
        env.get("content").and_then(|c| c.get("title")),
        Some(&Value::from("a"))
    );
}

#[test]
fn metadata_is_exposed() {
    let engine = engine();
    assert_eq!(engine.metadata().identifier, "example-novels");
    assert_eq!(engine.metadata().sources, vec!["https://novels.example"]);
}

#[test]
fn unknown_rule_is_reported() {
    let err = engine().run_rule("nonexistent", Record::new()).unwrap_err();
    assert!(matches!(err, Error::RuleNotFound(_)));
}

#[test]
fn concurrent_runs_return_their_own_results() {
    let engine = Arc::new(engine());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let title = if i % 2 == 0 { "even" } else { "odd" };
                let content = engine.run_content(content_inputs(title)).unwrap();
                (title.to_uppercase(), content)
            })
        })
        .collect();

    for handle in handles {
        let (expected, content) = handle.join().unwrap();
        assert_eq!(content.get("title"), Some(&Value::from(expected)));
    }

    let stats = engine.cache_stats();
    assert_eq!(stats.compiles + stats.hits, 8);
    assert_eq!(stats.entries, 1);
}
