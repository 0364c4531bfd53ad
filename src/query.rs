//! Query filter engine shared by every list endpoint.
//!
//! Search compares Unicode-lowercased text through the `fold` SQL function
//! registered on every pooled connection, since SQLite's `LIKE` only ignores
//! ASCII case.
//!
//! A [`FilterSet`] describes which query parameters an entity understands:
//! exact-match id fields, the columns searched by `q`, and the fields `o`
//! may order by. [`FilterSet::plan`] turns the request's query string into a
//! [`QueryPlan`] holding the SQL `WHERE`/`ORDER BY` fragments plus one
//! [`ClauseOutcome`] per clause it looked at.
//!
//! Malformed parameters never fail the request. They produce a
//! [`Clause::Skipped`] outcome and the collection is left untouched for that
//! clause only.

use std::collections::HashMap;
use std::fmt;

use rusqlite::types::Value;

use crate::db::FOLD;

pub const SEARCH_PARAM: &str = "q";
pub const ORDER_PARAM: &str = "o";

/// Filter configuration for one entity.
#[derive(Debug)]
pub struct FilterSet {
    /// Query parameters matched exactly against an integer column of the same name.
    pub exact: &'static [&'static str],
    /// Columns searched by `q`, combined with OR.
    pub search: &'static [&'static str],
    /// Public field name accepted by `o`, paired with the column it sorts by.
    pub ordering: &'static [(&'static str, &'static str)],
    /// `ORDER BY` used when `o` is absent or skipped.
    pub default_order: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotAnId(String),
    UnknownOrderField(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotAnId(value) => write!(f, "{value:?} is not an integer id"),
            SkipReason::UnknownOrderField(field) => write!(f, "cannot order by {field:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Applied,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseOutcome {
    pub param: &'static str,
    pub clause: Clause,
}

/// SQL fragments produced from a request's query parameters.
#[derive(Debug, Default)]
pub struct QueryPlan {
    conditions: Vec<String>,
    params: Vec<Value>,
    order_by: String,
    pub outcomes: Vec<ClauseOutcome>,
}

impl QueryPlan {
    /// ` WHERE ...` including the leading space, or an empty string.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn order_clause(&self) -> &str {
        &self.order_by
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ClauseOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.clause, Clause::Skipped(_)))
    }
}

impl FilterSet {
    pub fn plan(&self, query: &HashMap<String, String>) -> QueryPlan {
        let mut plan = QueryPlan {
            order_by: self.default_order.to_string(),
            ..QueryPlan::default()
        };

        for &field in self.exact {
            if let Some(raw) = present(query, field) {
                let clause = match raw.trim().parse::<i64>() {
                    Ok(id) => {
                        plan.conditions.push(format!("{field} = ?"));
                        plan.params.push(Value::Integer(id));
                        Clause::Applied
                    }
                    Err(_) => Clause::Skipped(SkipReason::NotAnId(raw.to_string())),
                };
                plan.outcomes.push(ClauseOutcome {
                    param: field,
                    clause,
                });
            }
        }

        if !self.search.is_empty() {
            if let Some(term) = present(query, SEARCH_PARAM) {
                let pattern = format!("%{}%", escape_like(term));
                let matches: Vec<String> = self
                    .search
                    .iter()
                    .map(|column| format!("{FOLD}({column}) LIKE {FOLD}(?) ESCAPE '\\'"))
                    .collect();
                plan.conditions.push(format!("({})", matches.join(" OR ")));
                plan.params
                    .extend(self.search.iter().map(|_| Value::Text(pattern.clone())));
                plan.outcomes.push(ClauseOutcome {
                    param: SEARCH_PARAM,
                    clause: Clause::Applied,
                });
            }
        }

        if let Some(raw) = present(query, ORDER_PARAM) {
            let clause = match self.order_by(raw) {
                Some(order_by) => {
                    plan.order_by = order_by;
                    Clause::Applied
                }
                None => Clause::Skipped(SkipReason::UnknownOrderField(raw.to_string())),
            };
            plan.outcomes.push(ClauseOutcome {
                param: ORDER_PARAM,
                clause,
            });
        }

        for outcome in plan.skipped() {
            if let Clause::Skipped(reason) = &outcome.clause {
                tracing::debug!(param = outcome.param, %reason, "Ignoring query parameter");
            }
        }

        plan
    }

    /// Resolve an `o` value such as `-created_at` to an `ORDER BY` clause.
    /// Ties are broken by id in the same direction so pages stay stable.
    fn order_by(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        let (name, direction) = match raw.strip_prefix('-') {
            Some(name) => (name, "DESC"),
            None => (raw.strip_prefix('+').unwrap_or(raw), "ASC"),
        };

        let (_, column) = self.ordering.iter().find(|(field, _)| *field == name)?;
        if *column == "id" {
            Some(format!("id {direction}"))
        } else {
            Some(format!("{column} {direction}, id {direction}"))
        }
    }
}

/// A parameter counts as present only when it is non-empty.
fn present<'a>(query: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    query
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
