//! Generic list and detail queries for flat resources.
//!
//! Purchases, earnings and wallet profiles all follow the same pattern:
//! filtered `COUNT(*)`, then the same filters with ordering and a page
//! window. Each row type describes its SQL through `Listed`; each filter
//! struct pushes its own conditions through `ListFilter`.

use sqlx::{FromRow, Postgres, QueryBuilder, postgres::PgRow};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        listing::{ListFilter, Listed, push_search},
        pagination::{ListParams, Page, order_by_clause},
    },
};

/// Apply search and structured filters after `WHERE TRUE`.
fn push_filters<R: Listed, F: ListFilter>(
    qb: &mut QueryBuilder<'_, Postgres>,
    params: &ListParams,
    filter: &F,
) {
    push_search(qb, R::SEARCH_COLUMNS, params.search_term());
    filter.push_conditions(qb);
}

/// Build the page query for `R` without executing it.
pub fn page_query<R: Listed, F: ListFilter>(
    params: &ListParams,
    filter: &F,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM {} WHERE TRUE", R::SELECT, R::FROM));
    push_filters::<R, F>(&mut qb, params, filter);

    qb.push(" ORDER BY ").push(order_by_clause(
        params.ordering.as_deref(),
        R::ORDERING,
        R::DEFAULT_ORDERING,
        &format!("{} DESC", R::ID),
    ));
    qb.push(" LIMIT ")
        .push_bind(params.page_size())
        .push(" OFFSET ")
        .push_bind(params.offset());
    qb
}

/// List one page of `R`.
///
/// `count` is computed with the same search and filters as `results`.
pub async fn list<R, F>(pool: &DbPool, params: &ListParams, filter: &F) -> Result<Page<R>, AppError>
where
    R: Listed + for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: ListFilter,
{
    let mut count_qb =
        QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {} WHERE TRUE", R::FROM));
    push_filters::<R, F>(&mut count_qb, params, filter);
    let count: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let results: Vec<R> = page_query::<R, F>(params, filter)
        .build_query_as()
        .fetch_all(pool)
        .await?;

    Ok(Page::new(results, count, params))
}

/// Fetch one `R` by primary key.
pub async fn get<R>(pool: &DbPool, id: i64) -> Result<R, AppError>
where
    R: Listed + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql = format!("SELECT {} FROM {} WHERE {} = $1", R::SELECT, R::FROM, R::ID);
    sqlx::query_as::<_, R>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(R::NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        boostyfi::{self, BoostyfiEarning},
        limitless::{self, LimitlessPurchase},
        wallet_profile::{WalletProfile, WalletProfileFilter},
    };

    #[test]
    fn purchase_page_query_combines_filters_ordering_and_window() {
        let params = ListParams {
            page: Some(2),
            page_size: Some(25),
            search: Some("0xdead".into()),
            ordering: Some("amount_usdt".into()),
        };
        let filter = limitless::PurchaseFilter {
            payment_status: Some("COMPLETED".into()),
            ..Default::default()
        };
        let qb = page_query::<LimitlessPurchase, _>(&params, &filter);
        let sql = qb.sql();

        assert!(sql.contains("FROM limitless_purchases p LEFT JOIN limitless_users b"));
        assert!(sql.contains("AND (p.tx_hash ILIKE $1)"));
        assert!(sql.contains("AND p.payment_status = $2"));
        assert!(sql.ends_with("ORDER BY p.amount_usdt ASC, p.id DESC LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn default_ordering_applies_without_client_ordering() {
        let params = ListParams::default();
        let filter = boostyfi::EarningFilter {
            referral_system_type: Some(2),
            ..Default::default()
        };
        let qb = page_query::<BoostyfiEarning, _>(&params, &filter);
        let sql = qb.sql();

        assert!(sql.contains("AND e.referral_system_type = $1"));
        assert!(sql.contains("ORDER BY e.created_at DESC, e.id DESC"));
    }

    #[test]
    fn wallet_profiles_search_every_contact_column() {
        let params = ListParams {
            search: Some("whale".into()),
            ..Default::default()
        };
        let qb = page_query::<WalletProfile, _>(&params, &WalletProfileFilter::default());
        let sql = qb.sql();

        assert!(sql.contains("w.main_wallet ILIKE $1"));
        assert!(sql.contains("w.rank ILIKE $5"));
        assert!(sql.contains("ORDER BY w.export_id DESC, w.id DESC"));
    }
}
