//! Page-number pagination and whitelisted ordering for list endpoints.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Query parameters common to every list endpoint.
///
/// `?page=2&page_size=25&search=abc&ordering=-created_at,username`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl ListParams {
    /// Page number clamped to >= 1.
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> i64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.page_size())
    }

    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// One page of results plus the totals a table needs to render its pager.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, params: &ListParams) -> Self {
        let page_size = params.page_size();
        Self {
            count,
            page: params.page(),
            page_size,
            total_pages: total_pages(count, page_size),
            results,
        }
    }
}

fn total_pages(count: i64, page_size: i64) -> i64 {
    if count <= 0 {
        0
    } else {
        (count + page_size - 1) / page_size
    }
}

/// Turn a client `ordering` parameter into an `ORDER BY` body.
///
/// `allowed` maps public field names to SQL expressions. Fields may be
/// comma separated and prefixed with `-` for descending order; fields not in
/// `allowed` are ignored. If nothing valid remains, `default` is used.
/// `tie_breaker` is appended so that pagination is stable.
pub fn order_by_clause(
    ordering: Option<&str>,
    allowed: &[(&str, &str)],
    default: &str,
    tie_breaker: &str,
) -> String {
    let parse = |raw: &str| -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .filter_map(|field| {
                let (name, direction) = match field.strip_prefix('-') {
                    Some(name) => (name, "DESC"),
                    None => (field, "ASC"),
                };
                allowed
                    .iter()
                    .find(|(public, _)| *public == name)
                    .map(|(_, column)| format!("{column} {direction}"))
            })
            .collect()
    };

    let mut terms = ordering.map(parse).unwrap_or_default();
    if terms.is_empty() {
        terms = parse(default);
    }
    terms.push(tie_breaker.to_string());
    terms.join(", ")
}

/// Escape `%`, `_` and `\` so a search term matches literally inside `ILIKE`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
