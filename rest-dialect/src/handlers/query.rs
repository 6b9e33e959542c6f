//! Query string parsing for collection reads
//!
//! [`QueryParams`] holds the decoded query string as ordered `(key, value)`
//! pairs. Routing adds path parameters to it under `:`-prefixed keys (`:id`).
//! [`parse_options`] turns it into [`QueryOptions`]:
//!
//! | Parameter  | Meaning                                                   |
//! |------------|-----------------------------------------------------------|
//! | `_start`   | first index of the window (default 0, negatives clamp to 0) |
//! | `_end`     | index after the window; `max = _end - _start`, at least 0 |
//! | `_sort`    | sort field, copied verbatim                               |
//! | `_order`   | `asc` or `desc`, case-insensitive                         |
//! | `_filters` | JSON object of filters                                    |
//! | anything else not starting with `_` or `:` | a filter              |
//!
//! Plain filter parameters are applied after `_filters`, so they win on
//! conflicting keys.
//!
//! # Example
//!
//! ```rust
//! use rest_dialect::config::ParsePolicy;
//! use rest_dialect::handlers::{parse_options, QueryParams};
//! use rest_dialect::repository::{FilterValue, SortOrder};
//!
//! let params = QueryParams::from_query("_start=10&_end=20&_sort=title&_order=DESC&tag=a&tag=b");
//! let options = parse_options(&params, ParsePolicy::Strict).unwrap();
//!
//! assert_eq!(options.offset, 10);
//! assert_eq!(options.max, 10);
//! assert_eq!(options.sort, "title");
//! assert_eq!(options.order, SortOrder::Desc);
//! assert_eq!(
//!     options.filter("tag"),
//!     Some(&FilterValue::List(vec!["a".to_string(), "b".to_string()]))
//! );
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::ParsePolicy;
use crate::repository::{FilterValue, QueryOptions, SortOrder};

/// Key under which routing places the entity id
pub const ID_PARAM: &str = ":id";

const START_PARAM: &str = "_start";
const END_PARAM: &str = "_end";
const SORT_PARAM: &str = "_sort";
const ORDER_PARAM: &str = "_order";
const FILTERS_PARAM: &str = "_filters";

/// Decoded query parameters in arrival order
///
/// Keys may repeat; [`get`](Self::get) returns the first value and
/// [`get_all`](Self::get_all) all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create an empty parameter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw `application/x-www-form-urlencoded` query string
    ///
    /// ```rust
    /// use rest_dialect::handlers::QueryParams;
    ///
    /// let params = QueryParams::from_query("q=a%20b&q=c+d");
    /// assert_eq!(params.get_all("q"), vec!["a b", "c d"]);
    /// ```
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// First value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in arrival order
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Add a value after the existing ones
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Builder form of [`append`](Self::append)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(key, value);
        self
    }

    /// Iterate over all pairs in arrival order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if there are no pairs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Reasons a query string cannot be turned into [`QueryOptions`]
#[derive(Debug, Error)]
pub enum QueryOptionsError {
    /// `_filters` is not valid JSON
    #[error("Invalid _filters parameter: {0}")]
    InvalidFilters(#[from] serde_json::Error),

    /// `_filters` is valid JSON but not an object
    #[error("Invalid _filters parameter: expected a JSON object")]
    FiltersNotAnObject,

    /// `_order` is neither `asc` nor `desc`
    #[error("Invalid _order parameter: {0}")]
    InvalidOrder(String),
}

/// Build [`QueryOptions`] from query parameters
///
/// # Errors
///
/// Under [`ParsePolicy::Strict`], a malformed `_filters` or an unknown
/// `_order` is an error. Under [`ParsePolicy::Lenient`] the malformed
/// `_filters` is dropped, an unknown `_order` becomes ascending, and this
/// never fails.
pub fn parse_options(
    params: &QueryParams,
    policy: ParsePolicy,
) -> Result<QueryOptions, QueryOptionsError> {
    let start = int_param(params, START_PARAM);
    let end = int_param(params, END_PARAM);

    let mut options = QueryOptions {
        sort: params.get(SORT_PARAM).unwrap_or_default().to_string(),
        order: parse_order(params, policy)?,
        offset: u64::try_from(start.max(0)).unwrap_or_default(),
        max: u64::try_from(end.saturating_sub(start).max(0)).unwrap_or_default(),
        filters: BTreeMap::new(),
    };

    match json_filters(params) {
        Ok(filters) => options.filters.extend(filters),
        Err(e) if policy.is_strict() => return Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed _filters parameter");
        }
    }

    options.filters.extend(plain_filters(params));

    Ok(options)
}

/// Integer value of `key`; 0 when absent or not an integer
fn int_param(params: &QueryParams, key: &str) -> i64 {
    params
        .get(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

fn parse_order(params: &QueryParams, policy: ParsePolicy) -> Result<SortOrder, QueryOptionsError> {
    let raw = match params.get(ORDER_PARAM) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(SortOrder::Asc),
    };

    match SortOrder::parse(raw) {
        Some(order) => Ok(order),
        None if policy.is_strict() => Err(QueryOptionsError::InvalidOrder(raw.to_string())),
        None => {
            tracing::warn!(order = raw, "Unknown _order parameter, sorting ascending");
            Ok(SortOrder::Asc)
        }
    }
}

fn json_filters(params: &QueryParams) -> Result<BTreeMap<String, FilterValue>, QueryOptionsError> {
    let raw = match params.get(FILTERS_PARAM) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(BTreeMap::new()),
    };

    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(field, value)| (field, FilterValue::from_json(value)))
            .collect()),
        _ => Err(QueryOptionsError::FiltersNotAnObject),
    }
}

/// Every parameter that is neither reserved (`_`) nor routing (`:`)
fn plain_filters(params: &QueryParams) -> BTreeMap<String, FilterValue> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in params.iter() {
        if key.starts_with('_') || key.starts_with(':') {
            continue;
        }
        grouped
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                FilterValue::Scalar(values.remove(0))
            } else {
                FilterValue::List(values)
            };
            (key, value)
        })
        .collect()
}
