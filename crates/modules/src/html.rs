//! `html`: HTML parsing and CSS-selector queries.

use std::sync::{Arc, Mutex, PoisonError};

use ego_tree::NodeId;
use rhai::{Array, Dynamic, ImmutableString, Module};
use scraper::{ElementRef, Html, Selector};

use crate::{Error, Result, ScriptResult};

/// A parsed document or an element inside one.
///
/// Elements share the parsed tree of the document they were selected from,
/// so queries on a `<tr>` see its cells exactly as the page laid them out.
#[derive(Debug, Clone)]
pub struct HtmlNode {
    document: Arc<Mutex<Html>>,
    id: NodeId,
}

impl HtmlNode {
    pub fn document(markup: &str) -> Self {
        let html = Html::parse_document(markup);
        let id = html.root_element().id();
        Self {
            document: Arc::new(Mutex::new(html)),
            id,
        }
    }

    fn with_element<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> T {
        let html = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        let element = html
            .tree
            .get(self.id)
            .and_then(ElementRef::wrap)
            .unwrap_or_else(|| html.root_element());
        f(element)
    }

    /// Serialized markup of this node.
    pub fn markup(&self) -> String {
        self.with_element(|element| element.html())
    }

    /// All descendant elements matching a CSS selector, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<HtmlNode>> {
        let selector = Selector::parse(selector).map_err(|e| Error::Selector {
            selector: selector.to_string(),
            message: e.to_string(),
        })?;
        let ids: Vec<NodeId> =
            self.with_element(|element| element.select(&selector).map(|found| found.id()).collect());
        Ok(ids
            .into_iter()
            .map(|id| HtmlNode {
                document: Arc::clone(&self.document),
                id,
            })
            .collect())
    }

    /// First descendant element matching a CSS selector.
    pub fn select_first(&self, selector: &str) -> Result<Option<HtmlNode>> {
        Ok(self.select(selector)?.into_iter().next())
    }

    /// Concatenated text content.
    pub fn text(&self) -> String {
        self.with_element(|element| element.text().collect())
    }

    /// Attribute of the node's own element.
    pub fn attr(&self, name: &str) -> Option<String> {
        self.with_element(|element| element.value().attr(name).map(str::to_string))
    }
}

pub fn module() -> Module {
    let mut module = Module::new();

    module.set_native_fn("parse", |text: ImmutableString| -> ScriptResult<HtmlNode> {
        Ok(HtmlNode::document(text.as_str()))
    });

    module.set_native_fn("serialize", |node: HtmlNode| -> ScriptResult<String> {
        Ok(node.markup())
    });

    module.set_native_fn(
        "query",
        |node: HtmlNode, selector: ImmutableString| -> ScriptResult<Dynamic> {
            match node.select_first(&selector)? {
                Some(found) => Ok(Dynamic::from(found)),
                None => {
                    warn_no_match("html.query", &selector);
                    Ok(Dynamic::UNIT)
                }
            }
        },
    );

    module.set_native_fn(
        "query_text",
        |node: HtmlNode, selector: ImmutableString| -> ScriptResult<String> {
            match node.select_first(&selector)? {
                Some(found) => Ok(found.text()),
                None => {
                    warn_no_match("html.query_text", &selector);
                    Ok(String::new())
                }
            }
        },
    );

    module.set_native_fn(
        "query_all",
        |node: HtmlNode, selector: ImmutableString| -> ScriptResult<Array> {
            Ok(node
                .select(&selector)?
                .into_iter()
                .map(Dynamic::from)
                .collect())
        },
    );

    module.set_native_fn(
        "attr",
        |node: HtmlNode, name: ImmutableString| -> ScriptResult<Dynamic> {
            Ok(node.attr(&name).map(Dynamic::from).unwrap_or(Dynamic::UNIT))
        },
    );

    module.set_native_fn("text", |node: HtmlNode| -> ScriptResult<String> {
        Ok(node.text())
    });

    module
}

fn warn_no_match(func: &str, selector: &str) {
    tracing::warn!(func, selector, "no element matched the provided selector");
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><head><title>Results</title></head>
<body>
  <ul class="results">
    <li><a class="novel" href="/novel/dune">Dune</a></li>
    <li><a class="novel" href="/novel/emma">Emma</a></li>
  </ul>
  <div id="empty"></div>
</body></html>
"#;

    #[test]
    fn query_all_returns_matches_in_order() {
        let doc = HtmlNode::document(PAGE);
        let links = doc.select("a.novel").unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].text(), "Dune");
        assert_eq!(links[1].attr("href").as_deref(), Some("/novel/emma"));
    }

    #[test]
    fn nested_queries_run_against_the_element() {
        let doc = HtmlNode::document(PAGE);
        let list = doc.select_first("ul.results").unwrap().unwrap();
        let first = list.select_first("li a").unwrap().unwrap();
        assert_eq!(first.text(), "Dune");
    }

    #[test]
    fn missing_match_and_attribute_are_none() {
        let doc = HtmlNode::document(PAGE);
        assert!(doc.select_first("table").unwrap().is_none());
        let empty = doc.select_first("#empty").unwrap().unwrap();
        assert_eq!(empty.attr("class"), None);
        assert_eq!(empty.attr("id").as_deref(), Some("empty"));
    }

    #[test]
    fn invalid_selector_is_an_error() {
        let doc = HtmlNode::document(PAGE);
        let err = doc.select("a[").unwrap_err();
        assert!(matches!(err, Error::Selector { .. }));
    }

    #[test]
    fn element_markup_is_serialized() {
        let doc = HtmlNode::document(PAGE);
        let empty = doc.select_first("#empty").unwrap().unwrap();
        assert_eq!(empty.markup(), r#"<div id="empty"></div>"#);
    }

    #[test]
    fn table_rows_keep_their_cells() {
        let doc = HtmlNode::document(
            r#"<table><tr class="row"><td><a href="/c/1">Chapter 1</a></td><td>2024-01-02</td></tr></table>"#,
        );
        let row = doc.select_first("tr").unwrap().unwrap();
        assert_eq!(row.attr("class").as_deref(), Some("row"));

        let cells = row.select("td").unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].text(), "2024-01-02");
        let link = cells[0].select_first("a").unwrap().unwrap();
        assert_eq!(link.attr("href").as_deref(), Some("/c/1"));
    }
}
