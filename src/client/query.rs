//! PostgREST query-string construction.
//!
//! PostgREST expresses projections and filters as query parameters:
//! `select=*,cliente(id,nombre)`, `id=eq.7`, `nombre=ilike.*acme*`,
//! `or=(numero.ilike.*x*,descripcion.ilike.*x*)`, `order=fecha.desc`,
//! `limit=10`. [`Query`] keeps those parameters in insertion order and renders
//! them with the grammar characters left readable.

use std::fmt;

use crate::client::types::SortOrder;

/// Characters PostgREST's filter grammar depends on. They are sent verbatim;
/// everything else outside the unreserved set is percent-encoded.
const GRAMMAR_CHARS: &[char] = &['*', '(', ')', ',', '.'];

/// Characters that would split or close an `or=(...)` clause list.
const RESERVED_IN_LIST: &[char] = &[',', '(', ')', '"', '\\'];

/// Filter operators used by the resource client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    Is,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
            FilterOperator::ILike => "ilike",
            FilterOperator::Is => "is",
        }
    }
}

/// One `field.op.value` clause inside an `or=(...)` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Condition {
    pub fn new(field: &str, operator: FilterOperator, value: impl fmt::Display) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value: value.to_string(),
        }
    }

    pub fn ilike(field: &str, pattern: &str) -> Self {
        Self::new(field, FilterOperator::ILike, pattern)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.field, self.operator.as_str(), self.value)
    }
}

/// Parameter names PostgREST reads as query modifiers rather than column
/// filters.
pub const RESERVED_KEYS: &[&str] = &[
    "select",
    "order",
    "limit",
    "offset",
    "or",
    "and",
    "not",
    "on_conflict",
    "columns",
];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// `*term*` for a case-insensitive substring match in a plain
/// `field=ilike.<pattern>` filter, where the value is taken verbatim.
pub fn contains_pattern(term: &str) -> String {
    format!("*{}*", term)
}

/// [`contains_pattern`] for use inside `or=(...)`.
///
/// Terms containing list delimiters are double-quoted so they stay a single
/// value; PostgREST strips the quotes only inside logic-tree lists.
pub fn list_contains_pattern(term: &str) -> String {
    let pattern = contains_pattern(term);
    if term.contains(RESERVED_IN_LIST) {
        let escaped = pattern.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    } else {
        pattern
    }
}

fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut buf = [0u8; 4];
    for c in value.chars() {
        if GRAMMAR_CHARS.contains(&c) {
            out.push(c);
        } else {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    out
}

/// Ordered PostgREST query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(mut self, key: &str, value: String) -> Self {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value,
            None => self.params.push((key.to_string(), value)),
        }
        self
    }

    /// Columns and embedded relations to return. Omitted means all scalar
    /// columns with no expansion.
    pub fn select(self, columns: &str) -> Self {
        self.set("select", columns.to_string())
    }

    pub fn filter(mut self, field: &str, operator: FilterOperator, value: impl fmt::Display) -> Self {
        self.params
            .push((field.to_string(), format!("{}.{}", operator.as_str(), value)));
        self
    }

    pub fn eq(self, field: &str, value: impl fmt::Display) -> Self {
        self.filter(field, FilterOperator::Eq, value)
    }

    pub fn ilike(self, field: &str, pattern: &str) -> Self {
        self.filter(field, FilterOperator::ILike, pattern)
    }

    /// Disjunction of conditions in a single `or=(c1,c2,...)` parameter.
    pub fn or(self, conditions: &[Condition]) -> Self {
        let clauses: Vec<String> = conditions.iter().map(Condition::to_string).collect();
        self.set("or", format!("({})", clauses.join(",")))
    }

    pub fn order(self, field: &str, order: SortOrder) -> Self {
        self.set("order", format!("{}.{}", field, order.as_str()))
    }

    pub fn limit(self, count: u32) -> Self {
        self.set("limit", count.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// `base` with the rendered parameters appended, if any.
    pub fn url(&self, base: &str) -> String {
        if self.is_empty() {
            base.to_string()
        } else {
            format!("{}?{}", base, self.to_query_string())
        }
    }
}
