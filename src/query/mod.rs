use std::collections::HashMap;

use bytes::BytesMut;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

/// Keys consumed by the builder itself; everything else is a filter.
pub const RESERVED_KEYS: [&str; 4] = ["page", "limit", "sort", "fields"];

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 100;

/// Comparison operator, from a `field[op]` parameter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    fn parse(suffix: &str) -> Option<Self> {
        match suffix {
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            _ => None,
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
        }
    }
}

/// A filter value with its inferred type. The builder does no semantic
/// validation: a value that parses as an integer is bound as one, and any
/// mismatch with the column type is the store's to reject.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl FilterValue {
    pub fn infer(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            return FilterValue::Int(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            return FilterValue::Float(v);
        }
        match raw {
            "true" => FilterValue::Bool(true),
            "false" => FilterValue::Bool(false),
            _ => FilterValue::Text(raw.to_string()),
        }
    }
}

impl ToSql for FilterValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            FilterValue::Int(v) => v.to_sql(ty, out),
            FilterValue::Float(v) => v.to_sql(ty, out),
            FilterValue::Bool(v) => v.to_sql(ty, out),
            FilterValue::Text(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        <i64 as ToSql>::accepts(ty)
            || <f64 as ToSql>::accepts(ty)
            || <bool as ToSql>::accepts(ty)
            || <String as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: FilterValue) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Field projection. `Default` means the collection's public column list;
/// clients can only narrow with an inclusion list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Default,
    Include(Vec<String>),
}

/// A request-scoped query description: filter, sort, projection and
/// pagination, derived from flat string parameters. Building one is a pure
/// transformation; it never rejects input, only normalizes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Filters every consumer applies regardless of client input, e.g.
    /// "only active accounts" or "no secret tours". Threaded explicitly
    /// rather than hidden in a store hook so the rule is visible.
    pub default_filters: Vec<FilterCondition>,
    pub filters: Vec<FilterCondition>,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub page: i64,
    pub limit: i64,
}

impl Query {
    /// Build a query description from raw request parameters, applying the
    /// stages in order: filter, sort, project, paginate.
    pub fn build(params: &HashMap<String, String>) -> Self {
        let mut filters: Vec<FilterCondition> = params
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| {
                let (field, op) = split_operator(key);
                FilterCondition::new(field, op, FilterValue::infer(value))
            })
            .collect();
        // HashMap iteration order is arbitrary; keep the description stable
        filters.sort_by(|a, b| (&a.field, a.op).cmp(&(&b.field, b.op)));

        let sort = match params.get("sort") {
            Some(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| match s.strip_prefix('-') {
                    Some(field) => SortKey {
                        field: field.to_string(),
                        descending: true,
                    },
                    None => SortKey {
                        field: s.to_string(),
                        descending: false,
                    },
                })
                .collect(),
            _ => vec![SortKey {
                field: "created_at".to_string(),
                descending: true,
            }],
        };

        let projection = match params.get("fields") {
            Some(raw) if !raw.trim().is_empty() => Projection::Include(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => Projection::Default,
        };

        // Malformed numbers silently fall back to the defaults
        let page = parse_positive(params.get("page")).unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(params.get("limit")).unwrap_or(DEFAULT_LIMIT);

        Self {
            default_filters: Vec::new(),
            filters,
            sort,
            projection,
            page,
            limit,
        }
    }

    pub fn with_default_filters(mut self, defaults: Vec<FilterCondition>) -> Self {
        self.default_filters = defaults;
        self
    }

    /// Saturates instead of overflowing; an absurd page renders as an
    /// OFFSET past the end of any table, which returns no rows.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Render as a SELECT over `table`, with `default_columns` as the
    /// projection when the client asked for none. An inclusion list can
    /// only narrow within `default_columns`; fields outside it are dropped,
    /// so hidden columns never reach the wire. Filter values are bound
    /// parameters; filter field names become quoted identifiers, so an
    /// unknown field reaches the store and is rejected there.
    pub fn to_select(&self, table: &str, default_columns: &[&str]) -> SqlSelect {
        let included: Vec<&str> = match &self.projection {
            Projection::Default => default_columns.to_vec(),
            Projection::Include(fields) => {
                let narrowed: Vec<&str> = fields
                    .iter()
                    .map(String::as_str)
                    .filter(|f| default_columns.contains(f))
                    .collect();
                if narrowed.is_empty() {
                    default_columns.to_vec()
                } else {
                    narrowed
                }
            }
        };
        let columns = included
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut text = format!("SELECT {} FROM {}", columns, quote_ident(table));
        let mut params: Vec<FilterValue> = Vec::new();

        let conditions: Vec<&FilterCondition> =
            self.default_filters.iter().chain(self.filters.iter()).collect();
        if !conditions.is_empty() {
            let clauses: Vec<String> = conditions
                .iter()
                .map(|c| {
                    params.push(c.value.clone());
                    format!("{} {} ${}", quote_ident(&c.field), c.op.sql(), params.len())
                })
                .collect();
            text.push_str(" WHERE ");
            text.push_str(&clauses.join(" AND "));
        }

        if !self.sort.is_empty() {
            let keys: Vec<String> = self
                .sort
                .iter()
                .map(|k| {
                    format!(
                        "{} {}",
                        quote_ident(&k.field),
                        if k.descending { "DESC" } else { "ASC" }
                    )
                })
                .collect();
            text.push_str(" ORDER BY ");
            text.push_str(&keys.join(", "));
        }

        text.push_str(&format!(" LIMIT {} OFFSET {}", self.limit, self.offset()));

        SqlSelect { text, params }
    }
}

/// A rendered SELECT with its bound values.
#[derive(Debug, Clone)]
pub struct SqlSelect {
    pub text: String,
    pub params: Vec<FilterValue>,
}

impl SqlSelect {
    pub fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }
}

/// `price[gte]` -> (`price`, Gte); anything else is an equality on the
/// whole key, passed through as-is.
fn split_operator(key: &str) -> (String, FilterOp) {
    if let Some(open) = key.find('[') {
        if let Some(rest) = key[open + 1..].strip_suffix(']') {
            if let Some(op) = FilterOp::parse(rest) {
                return (key[..open].to_string(), op);
            }
        }
    }
    (key.to_string(), FilterOp::Eq)
}

fn parse_positive(raw: Option<&String>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).filter(|v| *v >= 1)
}

/// Double-quote an identifier so arbitrary client field names cannot break
/// out of identifier position; unknown columns still fail store-side.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
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
    fn operator_suffix_is_split_from_the_field() {
        assert_eq!(split_operator("price[gte]"), ("price".to_string(), FilterOp::Gte));
        assert_eq!(split_operator("price[lt]"), ("price".to_string(), FilterOp::Lt));
        assert_eq!(split_operator("price"), ("price".to_string(), FilterOp::Eq));
        // unknown or malformed suffixes pass through as the literal key
        assert_eq!(split_operator("price[ne]"), ("price[ne]".to_string(), FilterOp::Eq));
        assert_eq!(split_operator("price[gte"), ("price[gte".to_string(), FilterOp::Eq));
    }

    #[test]
    fn value_types_are_inferred() {
        assert_eq!(FilterValue::infer("500"), FilterValue::Int(500));
        assert_eq!(FilterValue::infer("4.7"), FilterValue::Float(4.7));
        assert_eq!(FilterValue::infer("true"), FilterValue::Bool(true));
        assert_eq!(FilterValue::infer("easy"), FilterValue::Text("easy".to_string()));
    }

    #[test]
    fn pagination_defaults_on_garbage() {
        let q = Query::build(&params(&[("page", "abc"), ("limit", "-3")]));
        assert_eq!(q.page, DEFAULT_PAGE);
        assert_eq!(q.limit, DEFAULT_LIMIT);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn default_filters_render_before_client_filters() {
        let q = Query::build(&params(&[("difficulty", "easy")]))
            .with_default_filters(vec![FilterCondition::eq(
                "secret_tour",
                FilterValue::Bool(false),
            )]);
        let sql = q.to_select("tours", &["id", "name"]);
        assert!(sql.text.contains("\"secret_tour\" = $1"));
        assert!(sql.text.contains("\"difficulty\" = $2"));
    }
}
