//! Query options handed to repository reads
//!
//! [`QueryOptions`] is what the controller builds from a collection request's
//! query string: the page window, the sort key and direction, and the
//! filters. Backends interpret it however they like; the controller applies no
//! filtering or ordering itself.
//!
//! # Example
//!
//! ```rust
//! use rest_dialect::repository::{FilterValue, QueryOptions, SortOrder};
//!
//! let options = QueryOptions::new()
//!     .with_window(10, 5)
//!     .with_sort("title", SortOrder::Desc)
//!     .with_filter("status", FilterValue::from("active"));
//!
//! assert_eq!(options.offset, 10);
//! assert_eq!(options.max, 5);
//! assert_eq!(options.filter("status").and_then(|f| f.as_str()), Some("active"));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort direction for collection reads
///
/// ```rust
/// use rest_dialect::repository::SortOrder;
///
/// assert_eq!(SortOrder::default(), SortOrder::Asc);
/// assert_eq!(format!("{}", SortOrder::Desc), "desc");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0)
    Desc,
}

impl SortOrder {
    /// Parse a direction case-insensitively
    ///
    /// Returns `None` for anything other than `asc` or `desc`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Check if this is descending order
    #[must_use]
    pub fn is_desc(self) -> bool {
        matches!(self, Self::Desc)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Value a collection read is filtered by
///
/// Plain query parameters produce [`Scalar`](Self::Scalar) for a single
/// occurrence and [`List`](Self::List) for repeated keys. Non-string values
/// taken from the `_filters` JSON object are kept as [`Json`](Self::Json).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Single string value
    Scalar(String),
    /// Several string values, in the order they arrived
    List(Vec<String>),
    /// Any other JSON value
    Json(serde_json::Value),
}

impl FilterValue {
    /// Build a filter value from a JSON value
    ///
    /// Strings become `Scalar`, arrays made only of strings become `List`,
    /// everything else is kept as `Json`.
    ///
    /// ```rust
    /// use rest_dialect::repository::FilterValue;
    /// use serde_json::json;
    ///
    /// assert_eq!(FilterValue::from_json(json!("a")), FilterValue::Scalar("a".into()));
    /// assert_eq!(
    ///     FilterValue::from_json(json!(["a", "b"])),
    ///     FilterValue::List(vec!["a".into(), "b".into()])
    /// );
    /// assert_eq!(FilterValue::from_json(json!(3)), FilterValue::Json(json!(3)));
    /// ```
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::Scalar(s),
            serde_json::Value::Array(items)
                if items.iter().all(serde_json::Value::is_string) =>
            {
                Self::List(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            serde_json::Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect(),
                )
            }
            other => Self::Json(other),
        }
    }

    /// Get the value if it is a single string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Check whether `candidate` is among the string values of this filter
    ///
    /// A `Json` string compares by its content; other `Json` values compare
    /// against their compact JSON text.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Scalar(s) => s == candidate,
            Self::List(values) => values.iter().any(|v| v == candidate),
            Self::Json(serde_json::Value::String(s)) => s == candidate,
            Self::Json(value) => value.to_string() == candidate,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

/// Structured form of a collection request's query string
///
/// Built fresh for every request and not modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Field to sort by; empty means backend default
    pub sort: String,
    /// Sort direction
    pub order: SortOrder,
    /// Number of entities to skip
    pub offset: u64,
    /// Maximum number of entities to return; 0 when the request sets no window
    pub max: u64,
    /// Field filters
    pub filters: BTreeMap<String, FilterValue>,
}

impl QueryOptions {
    /// Options with no window, no sort and no filters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set offset and maximum count
    #[must_use]
    pub fn with_window(mut self, offset: u64, max: u64) -> Self {
        self.offset = offset;
        self.max = max;
        self
    }

    /// Set sort field and direction
    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>, order: SortOrder) -> Self {
        self.sort = sort.into();
        self.order = order;
        self
    }

    /// Add or replace a filter
    #[must_use]
    pub fn with_filter(mut self, field: impl Into<String>, value: FilterValue) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    /// Get the filter for a field
    #[must_use]
    pub fn filter(&self, field: &str) -> Option<&FilterValue> {
        self.filters.get(field)
    }

    /// Check whether the request asked for a bounded window
    #[must_use]
    pub fn is_windowed(&self) -> bool {
        self.max > 0
    }
}
