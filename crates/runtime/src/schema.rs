//! Output schemas for the built-in rule categories.

use std::fmt;

use bundle::{Record, Value, ids};
use thiserror::Error;

/// A built-in rule category with a fixed output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Search,
    ItemInfo,
    ChapterList,
    Content,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Search,
        Category::ItemInfo,
        Category::ChapterList,
        Category::Content,
    ];

    /// Identifier of the rule implementing this category.
    pub fn rule_id(self) -> &'static str {
        match self {
            Category::Search => ids::SEARCH,
            Category::ItemInfo => ids::ITEM_INFO,
            Category::ChapterList => ids::CHAPTER_LIST,
            Category::Content => ids::CONTENT,
        }
    }

    pub fn from_rule_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.rule_id() == id)
    }

    /// Fields every result record must carry.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Category::Search | Category::ChapterList => &["title", "url"],
            Category::ItemInfo => &["title", "cover", "author", "description", "status", "genres"],
            Category::Content => &["title", "content"],
        }
    }

    fn is_list(self) -> bool {
        matches!(self, Category::Search | Category::ChapterList)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_id())
    }
}

/// Environment key a rule's inputs are stored under (`item-info` → `item_info`).
pub fn env_key(rule_id: &str) -> String {
    rule_id.replace('-', "_")
}

/// A result that passed its category's schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedResult {
    List(Vec<Record>),
    Single(Record),
}

impl ValidatedResult {
    pub fn into_list(self) -> Vec<Record> {
        match self {
            ValidatedResult::List(items) => items,
            ValidatedResult::Single(record) => vec![record],
        }
    }

    pub fn into_single(self) -> Option<Record> {
        match self {
            ValidatedResult::Single(record) => Some(record),
            ValidatedResult::List(_) => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ValidatedResult::List(items) => {
                Value::Sequence(items.into_iter().map(Value::Record).collect())
            }
            ValidatedResult::Single(record) => Value::Record(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SchemaViolation {
    #[error("{category}: expected {expected}{}, found {found}", field_suffix(.field))]
    ShapeMismatch {
        category: Category,
        field: Option<String>,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{category}: {}missing required key: {field}", index_prefix(.index))]
    MissingField {
        category: Category,
        field: String,
        index: Option<usize>,
    },
}

impl SchemaViolation {
    pub fn category(&self) -> Category {
        match self {
            SchemaViolation::ShapeMismatch { category, .. }
            | SchemaViolation::MissingField { category, .. } => *category,
        }
    }
}

fn field_suffix(field: &Option<String>) -> String {
    field.as_ref().map(|f| format!(" for '{f}'")).unwrap_or_default()
}

fn index_prefix(index: &Option<usize>) -> String {
    index.map(|i| format!("item {i} ")).unwrap_or_default()
}

/// Check a raw rule result against its category's schema.
///
/// Sequence categories check every record element in order before non-record
/// elements are dropped, so a missing key is reported even when the element
/// list also contains junk.
pub fn validate(category: Category, value: Value) -> Result<ValidatedResult, SchemaViolation> {
    if category.is_list() {
        validate_list(category, value).map(ValidatedResult::List)
    } else {
        validate_single(category, value).map(ValidatedResult::Single)
    }
}

fn validate_list(category: Category, value: Value) -> Result<Vec<Record>, SchemaViolation> {
    let items = match value {
        Value::Sequence(items) => items,
        other => return Err(shape(category, None, "sequence", &other)),
    };

    for (index, item) in items.iter().enumerate() {
        if let Value::Record(record) = item {
            require_fields(category, record, Some(index))?;
        }
    }

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Record(record) => records.push(record),
            other => {
                tracing::warn!(%category, index, found = other.type_name(), "skipped non-record item");
            }
        }
    }
    Ok(records)
}

fn validate_single(category: Category, value: Value) -> Result<Record, SchemaViolation> {
    let record = match value {
        Value::Record(record) => record,
        other => return Err(shape(category, None, "record", &other)),
    };

    require_fields(category, &record, None)?;

    if category == Category::ItemInfo {
        let genres = record.get("genres").unwrap_or(&Value::Absent);
        if genres.as_sequence().is_none() {
            return Err(shape(category, Some("genres"), "sequence", genres));
        }
    }
    Ok(record)
}

fn require_fields(
    category: Category,
    record: &Record,
    index: Option<usize>,
) -> Result<(), SchemaViolation> {
    match category
        .required_fields()
        .iter()
        .find(|field| !record.contains_key(**field))
    {
        Some(field) => Err(SchemaViolation::MissingField {
            category,
            field: field.to_string(),
            index,
        }),
        None => Ok(()),
    }
}

fn shape(category: Category, field: Option<&str>, expected: &'static str, found: &Value) -> SchemaViolation {
    SchemaViolation::ShapeMismatch {
        category,
        field: field.map(str::to_string),
        expected,
        found: found.type_name(),
    }
}
