//! Traits connecting row types and filters to the generic listing service.

use sqlx::{Postgres, QueryBuilder};

/// A row type that can be listed and fetched by id.
///
/// The SQL fragments are static strings; user input only ever reaches the
/// query through bound parameters.
pub trait Listed {
    /// Column list of the `SELECT`.
    const SELECT: &'static str;
    /// `FROM` body including joins.
    const FROM: &'static str;
    /// Primary key expression, e.g. `p.id`.
    const ID: &'static str;
    /// Public ordering field to SQL expression.
    const ORDERING: &'static [(&'static str, &'static str)];
    const DEFAULT_ORDERING: &'static str;
    /// Columns matched by `?search=`.
    const SEARCH_COLUMNS: &'static [&'static str];
    /// Resource name used in 404 messages.
    const NAME: &'static str;
}

/// Structured filters of a list endpoint.
pub trait ListFilter {
    /// Append `AND ...` conditions to a query that already has a `WHERE`.
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>);
}

/// Push `AND column = value` when the filter value is present.
pub fn push_eq<'a, T>(qb: &mut QueryBuilder<'a, Postgres>, column: &str, value: &Option<T>)
where
    T: 'a + Clone + Send + sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres>,
{
    if let Some(value) = value {
        qb.push(" AND ").push(column).push(" = ").push_bind(value.clone());
    }
}

/// Push an `AND (a ILIKE $p OR b ILIKE $p ...)` group for a search term.
pub fn push_search(qb: &mut QueryBuilder<'_, Postgres>, columns: &[&str], term: Option<&str>) {
    let Some(term) = term else {
        return;
    };
    if columns.is_empty() {
        return;
    }
    let pattern = super::pagination::like_pattern(term);
    qb.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
    }
    qb.push(")");
}
