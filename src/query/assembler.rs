//! Query parameter assembly
//!
//! Builds the store query from whatever the caller sent. Values are
//! opportunistically coerced (booleans, numbers, comma lists); anything
//! unrecognized stays a string. Pagination clamps instead of erroring.

use std::collections::HashMap;

use bson::{doc, Bson, Document};

use super::operators::FilterOp;
use super::RESERVED_PARAMS;

/// Pagination bounds, sourced from configuration
#[derive(Debug, Clone, Copy)]
pub struct QueryLimits {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 500,
        }
    }
}

/// Pagination window: effective limit <= max, skip >= 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: i64,
    pub skip: u64,
}

/// A fully assembled list query
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filter: Document,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub window: PageWindow,
}

/// Assemble a query from raw parameters.
pub fn assemble(params: &HashMap<String, String>, limits: QueryLimits) -> ListQuery {
    ListQuery {
        filter: build_filter(params),
        sort: params.get("sort").and_then(|raw| parse_sort(raw)),
        projection: parse_projection(params),
        window: parse_window(params, limits),
    }
}

/// Build the filter predicate from non-reserved parameters.
fn build_filter(params: &HashMap<String, String>) -> Document {
    let mut filter = Document::new();

    for (key, raw) in params {
        if RESERVED_PARAMS.contains(&key.as_str()) {
            continue;
        }

        // A trailing suffix from the allow-list is an operator; any other
        // dotted key is a plain nested-field path.
        if let Some((field, suffix)) = key.rsplit_once('.') {
            if let Some(op) = FilterOp::parse(suffix) {
                if field.is_empty() {
                    continue;
                }
                insert_operator(&mut filter, field, op, raw);
                continue;
            }
        }

        filter.insert(key.clone(), equality_value(raw));
    }

    filter
}

/// Merge an operator entry into the predicate, so ranges like
/// `a.gte=1&a.lte=5` land on one field entry.
fn insert_operator(filter: &mut Document, field: &str, op: FilterOp, raw: &str) {
    let value = match op {
        FilterOp::In | FilterOp::Nin => Bson::Array(coerce_list(raw)),
        FilterOp::Exists => Bson::Boolean(raw == "true" || raw == "1"),
        FilterOp::Regex => Bson::String(raw.to_string()),
        _ => coerce_scalar(raw),
    };

    match filter.get_mut(field) {
        Some(Bson::Document(existing)) => {
            existing.insert(op.as_store_op(), value);
        }
        _ => {
            filter.insert(field, doc! { op.as_store_op(): value });
        }
    }
}

/// Equality value: comma-bearing values become membership filters.
fn equality_value(raw: &str) -> Bson {
    if raw.contains(',') {
        Bson::Document(doc! { "$in": coerce_list(raw) })
    } else {
        coerce_scalar(raw)
    }
}

/// Coerce a raw parameter value to its most specific type.
pub fn coerce_scalar(raw: &str) -> Bson {
    match raw {
        "true" => return Bson::Boolean(true),
        "false" => return Bson::Boolean(false),
        "null" => return Bson::Null,
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Bson::Int64(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Bson::Double(f);
        }
    }
    Bson::String(raw.to_string())
}

fn coerce_list(raw: &str) -> Vec<Bson> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(coerce_scalar)
        .collect()
}

/// Parse a sort spec: `-created,name` means created descending, then
/// name ascending; later fields break ties among earlier ones.
pub fn parse_sort(raw: &str) -> Option<Document> {
    let mut sort = Document::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.strip_prefix('-') {
            Some(field) if !field.is_empty() => sort.insert(field, -1),
            Some(_) => None,
            None => sort.insert(part, 1),
        };
    }
    if sort.is_empty() {
        None
    } else {
        Some(sort)
    }
}

/// Parse the projection allow-list from `select` or `fields`.
fn parse_projection(params: &HashMap<String, String>) -> Option<Document> {
    let raw = params.get("select").or_else(|| params.get("fields"))?;
    let mut projection = Document::new();
    for field in raw.split(',') {
        let field = field.trim();
        if !field.is_empty() {
            projection.insert(field, 1);
        }
    }
    if projection.is_empty() {
        None
    } else {
        Some(projection)
    }
}

/// Parse pagination, clamping rather than erroring: an unparseable limit
/// falls back to the default, an oversized one to the maximum, a
/// negative skip to zero.
fn parse_window(params: &HashMap<String, String>, limits: QueryLimits) -> PageWindow {
    let limit = params
        .get("limit")
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(limits.default_limit)
        .min(limits.max_limit);

    let skip = params
        .get("skip")
        .and_then(|raw| raw.parse::<i64>().ok())
        .map(|n| n.max(0) as u64)
        .unwrap_or(0);

    PageWindow { limit, skip }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_plain_equality_with_coercion() {
        let query = assemble(
            &params(&[("name", "alice"), ("age", "30"), ("active", "true")]),
            QueryLimits::default(),
        );
        assert_eq!(query.filter.get_str("name").unwrap(), "alice");
        assert_eq!(query.filter.get_i64("age").unwrap(), 30);
        assert!(query.filter.get_bool("active").unwrap());
    }

    #[test]
    fn test_float_and_null_coercion() {
        assert_eq!(coerce_scalar("2.5"), Bson::Double(2.5));
        assert_eq!(coerce_scalar("null"), Bson::Null);
        assert_eq!(coerce_scalar("30x"), Bson::String("30x".to_string()));
    }

    #[test]
    fn test_comma_value_becomes_membership() {
        let query = assemble(&params(&[("status", "active,pending")]), QueryLimits::default());
        let entry = query.filter.get_document("status").unwrap();
        let list = entry.get_array("$in").unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_operator_suffix() {
        let query = assemble(&params(&[("age.gte", "18")]), QueryLimits::default());
        let entry = query.filter.get_document("age").unwrap();
        assert_eq!(entry.get_i64("$gte").unwrap(), 18);
    }

    #[test]
    fn test_range_operators_merge_on_one_field() {
        let query = assemble(
            &params(&[("age.gte", "18"), ("age.lt", "65")]),
            QueryLimits::default(),
        );
        let entry = query.filter.get_document("age").unwrap();
        assert_eq!(entry.get_i64("$gte").unwrap(), 18);
        assert_eq!(entry.get_i64("$lt").unwrap(), 65);
    }

    #[test]
    fn test_unknown_operator_suffix_is_dropped() {
        let query = assemble(&params(&[("age.squint", "18")]), QueryLimits::default());
        assert!(query.filter.is_empty());
    }

    #[test]
    fn test_dotted_path_without_operator_is_equality() {
        let query = assemble(&params(&[("address.city", "Oslo")]), QueryLimits::default());
        assert_eq!(query.filter.get_str("address.city").unwrap(), "Oslo");
    }

    #[test]
    fn test_reserved_params_never_filter() {
        let query = assemble(
            &params(&[("limit", "5"), ("sort", "-a"), ("collection", "users"), ("populate", "x")]),
            QueryLimits::default(),
        );
        assert!(query.filter.is_empty());
    }

    #[test]
    fn test_sort_direction_and_tie_order() {
        let sort = parse_sort("-created,name").unwrap();
        let mut iter = sort.iter();
        let (first, dir1) = iter.next().unwrap();
        let (second, dir2) = iter.next().unwrap();
        assert_eq!(first, "created");
        assert_eq!(dir1, &Bson::Int32(-1));
        assert_eq!(second, "name");
        assert_eq!(dir2, &Bson::Int32(1));
    }

    #[test]
    fn test_projection_from_select_or_fields() {
        let query = assemble(&params(&[("select", "name,email")]), QueryLimits::default());
        let projection = query.projection.unwrap();
        assert_eq!(projection.len(), 2);

        let query = assemble(&params(&[("fields", "name")]), QueryLimits::default());
        assert!(query.projection.unwrap().contains_key("name"));
    }

    #[test]
    fn test_window_defaults_and_clamps() {
        let limits = QueryLimits::default();

        let query = assemble(&params(&[]), limits);
        assert_eq!(query.window, PageWindow { limit: 50, skip: 0 });

        let query = assemble(&params(&[("limit", "9999"), ("skip", "-3")]), limits);
        assert_eq!(query.window, PageWindow { limit: 500, skip: 0 });

        let query = assemble(&params(&[("limit", "abc"), ("skip", "20")]), limits);
        assert_eq!(query.window, PageWindow { limit: 50, skip: 20 });
    }

    #[test]
    fn test_exists_and_regex_operators() {
        let query = assemble(
            &params(&[("email.exists", "true"), ("name.regex", "^a")]),
            QueryLimits::default(),
        );
        assert!(query
            .filter
            .get_document("email")
            .unwrap()
            .get_bool("$exists")
            .unwrap());
        assert_eq!(
            query
                .filter
                .get_document("name")
                .unwrap()
                .get_str("$regex")
                .unwrap(),
            "^a"
        );
    }
}
