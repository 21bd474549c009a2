// src/query.rs

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

fn uuid_pattern() -> &'static Regex {
    static UUID_RE: OnceLock<Regex> = OnceLock::new();
    UUID_RE.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .expect("uuid pattern is a valid regex")
    })
}

/// Sort direction for an `order by` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// A request template for listing a collection: a `ql` filter, ordering and page size.
///
/// Conditions are joined with `and` unless [`or`](UsergridQuery::or) is called between
/// them; [`not`](UsergridQuery::not) negates the next condition.
///
/// ```rust
/// use usergrid_rs::UsergridQuery;
///
/// let mut query = UsergridQuery::new();
/// (&mut query).eq("author", "Hemingway").gt("pages", 100).desc("published");
/// assert_eq!(
///     query.build_ql().as_deref(),
///     Some("select * where author = 'Hemingway' and pages > 100 order by published desc")
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsergridQuery {
    requirements: String,
    connector: Option<&'static str>,
    negate_next: bool,
    order: Vec<(String, SortOrder)>,
    raw_ql: Option<String>,
    limit: Option<u32>,
}

impl UsergridQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `ql` verbatim, ignoring any conditions and ordering added through the builder.
    pub fn ql(&mut self, ql: &str) -> &mut Self {
        self.raw_ql = Some(ql.to_string());
        self
    }

    /// Sets the page size sent as `limit` on every page request.
    pub fn limit(&mut self, limit: u32) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn get_limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn eq<V: Serialize>(&mut self, term: &str, value: V) -> &mut Self {
        self.add_operation(term, "=", value)
    }

    pub fn gt<V: Serialize>(&mut self, term: &str, value: V) -> &mut Self {
        self.add_operation(term, ">", value)
    }

    pub fn gte<V: Serialize>(&mut self, term: &str, value: V) -> &mut Self {
        self.add_operation(term, ">=", value)
    }

    pub fn lt<V: Serialize>(&mut self, term: &str, value: V) -> &mut Self {
        self.add_operation(term, "<", value)
    }

    pub fn lte<V: Serialize>(&mut self, term: &str, value: V) -> &mut Self {
        self.add_operation(term, "<=", value)
    }

    /// Full-text match on a string property. Use `*` as a trailing wildcard.
    pub fn contains(&mut self, term: &str, value: &str) -> &mut Self {
        let requirement = format!("{} contains {}", term, quote_string(value));
        self.add_requirement(requirement)
    }

    /// Entities whose `location` lies within `distance` meters of the given point.
    pub fn location_within(&mut self, distance: f64, latitude: f64, longitude: f64) -> &mut Self {
        let requirement = format!(
            "location within {} of {}, {}",
            distance, latitude, longitude
        );
        self.add_requirement(requirement)
    }

    /// Joins the next condition with `and` (the default).
    pub fn and(&mut self) -> &mut Self {
        self.connector = Some("and");
        self
    }

    /// Joins the next condition with `or`.
    pub fn or(&mut self) -> &mut Self {
        self.connector = Some("or");
        self
    }

    /// Negates the next condition.
    pub fn not(&mut self) -> &mut Self {
        self.negate_next = true;
        self
    }

    pub fn asc(&mut self, term: &str) -> &mut Self {
        self.sort(term, SortOrder::Asc)
    }

    pub fn desc(&mut self, term: &str) -> &mut Self {
        self.sort(term, SortOrder::Desc)
    }

    /// Adds or replaces the sort direction for `term`. Clauses keep insertion order.
    pub fn sort(&mut self, term: &str, order: SortOrder) -> &mut Self {
        if let Some(existing) = self.order.iter_mut().find(|(t, _)| t == term) {
            existing.1 = order;
        } else {
            self.order.push((term.to_string(), order));
        }
        self
    }

    fn add_operation<V: Serialize>(&mut self, term: &str, operator: &str, value: V) -> &mut Self {
        match serde_json::to_value(value) {
            Ok(json_val) => {
                let requirement = format!("{} {} {}", term, operator, format_value(&json_val));
                self.add_requirement(requirement)
            }
            Err(e) => {
                log::warn!("Dropping query condition on '{}': {}", term, e);
                self
            }
        }
    }

    fn add_requirement(&mut self, requirement: String) -> &mut Self {
        let requirement = if self.negate_next {
            format!("not {}", requirement)
        } else {
            requirement
        };
        if !self.requirements.is_empty() {
            self.requirements.push(' ');
            self.requirements.push_str(self.connector.unwrap_or("and"));
            self.requirements.push(' ');
        }
        self.requirements.push_str(&requirement);
        self.connector = None;
        self.negate_next = false;
        self
    }

    /// The `ql` expression for this query, or `None` when it selects everything in default order.
    pub fn build_ql(&self) -> Option<String> {
        if let Some(raw) = &self.raw_ql {
            return Some(raw.clone());
        }
        if self.requirements.is_empty() && self.order.is_empty() {
            return None;
        }
        let mut ql = String::from("select *");
        if !self.requirements.is_empty() {
            ql.push_str(" where ");
            ql.push_str(&self.requirements);
        }
        if !self.order.is_empty() {
            let clauses: Vec<String> = self
                .order
                .iter()
                .map(|(term, order)| format!("{} {}", term, order.as_str()))
                .collect();
            ql.push_str(" order by ");
            ql.push_str(&clauses.join(","));
        }
        Some(ql)
    }

    /// Query parameters for one page request: `ql`, `limit` and, when continuing, `cursor`.
    ///
    /// `default_limit` applies when no explicit [`limit`](UsergridQuery::limit) was set.
    /// The cursor is passed through verbatim.
    pub fn build_query_params(
        &self,
        default_limit: u32,
        cursor: Option<&str>,
    ) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(ql) = self.build_ql() {
            params.push(("ql".to_string(), ql));
        }
        params.push((
            "limit".to_string(),
            self.limit.unwrap_or(default_limit).to_string(),
        ));
        if let Some(c) = cursor.filter(|c| !c.is_empty()) {
            params.push(("cursor".to_string(), c.to_string()));
        }
        params
    }
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "\\'"))
}

// UUIDs and non-strings go in bare; other strings are single-quoted.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) if uuid_pattern().is_match(s) => s.clone(),
        Value::String(s) => quote_string(s),
        other => other.to_string(),
    }
}
