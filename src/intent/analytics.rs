//! Sales and customer analytics
//!
//! Reporting windows come from [`Period`]; their cutoff expressions are fixed
//! fragments and never carry caller text.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::allowlist::{ClosedSet, GroupBy, Metric, Period};
use crate::engine::{fetch_scoped, Database};
use crate::error::Result;
use crate::normalize::{
    add_share, shape_rows, summarize_activity, summarize_segments, to_f64, to_i64, with_rank,
};
use crate::output::Outcome;
use crate::query::{contains_pattern, QueryBuilder, Statement};
use crate::validate::{normalize_text, validate_choice, validate_limit, validate_store_id, LimitPolicy};

/// Lower bound used when the window is unbounded
const BEGINNING_OF_TIME: &str = "'1970-01-01'";

/// Arguments for `get_popular_films`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct PopularFilmsArgs {
    /// all_time, last_month or last_week (default all_time)
    pub period: Option<String>,
    /// Part of the category name
    pub category: Option<String>,
    /// Store (1 or 2)
    pub store_id: Option<i64>,
    /// Maximum results (1-50, default 10)
    pub limit: Option<i64>,
}

/// Arguments for `get_revenue_summary`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct RevenueSummaryArgs {
    /// store, category, month or staff (default store)
    pub group_by: Option<String>,
    /// all_time, last_month or last_week (default all_time)
    pub period: Option<String>,
    /// Store (1 or 2)
    pub store_id: Option<i64>,
}

/// Arguments for `get_store_stats`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct StoreStatsArgs {
    /// Store (1 or 2); both stores when omitted
    pub store_id: Option<i64>,
}

/// Arguments for `get_top_customers`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct TopCustomersArgs {
    /// rentals or spending (default rentals)
    pub metric: Option<String>,
    /// all_time, last_month or last_week (default all_time)
    pub period: Option<String>,
    /// Store (1 or 2)
    pub store_id: Option<i64>,
    /// Maximum results (1-50, default 10)
    pub limit: Option<i64>,
}

/// Arguments for `get_customer_segments`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CustomerSegmentsArgs {
    /// Store (1 or 2)
    pub store_id: Option<i64>,
}

/// Arguments for `get_customer_activity`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CustomerActivityArgs {
    /// all_time, last_month or last_week (default last_month)
    pub period: Option<String>,
    /// Store (1 or 2)
    pub store_id: Option<i64>,
}

/// Summary tagged with the store filter it was computed under
#[derive(Debug, Serialize)]
struct Scoped<T> {
    store_id: Option<i64>,
    #[serde(flatten)]
    report: T,
}

/// Append the window condition on `column`, if the period is bounded
fn push_period(qb: &mut QueryBuilder, column: &str, period: Period) {
    if let Some(cutoff) = period.cutoff_sql() {
        qb.push(&format!("AND {column} >= {cutoff}"));
    }
}

pub(crate) fn popular_films_statement(args: PopularFilmsArgs) -> Result<Statement> {
    let period = validate_choice(args.period.as_deref(), Period::AllTime)?;
    let category = normalize_text(args.category);
    let store_id = validate_store_id(args.store_id)?;
    let limit = validate_limit(args.limit, LimitPolicy::LISTING);

    let mut qb = QueryBuilder::new(
        "SELECT f.title, c.name AS category, f.rating, COUNT(DISTINCT r.rental_id) AS rental_count, \
         COALESCE(SUM(p.amount), 0) AS total_revenue \
         FROM rental r \
         JOIN inventory i ON r.inventory_id = i.inventory_id \
         JOIN film f ON i.film_id = f.film_id \
         LEFT JOIN film_category fc ON f.film_id = fc.film_id \
         LEFT JOIN category c ON fc.category_id = c.category_id \
         LEFT JOIN payment p ON r.rental_id = p.rental_id \
         WHERE 1=1",
    );
    push_period(&mut qb, "r.rental_date", period);
    qb.filter_opt("AND c.name LIKE ?", category.as_deref().map(contains_pattern));
    qb.filter_opt("AND i.store_id = ?", store_id);
    qb.push("GROUP BY f.film_id, f.title, c.name, f.rating");
    qb.push("ORDER BY rental_count DESC, f.title");
    qb.limit(limit);
    qb.build()
}

/// Grouping column, its output name, and result ordering
fn revenue_grouping(group_by: GroupBy) -> (&'static str, &'static str, &'static str) {
    match group_by {
        GroupBy::Store => ("st.store_id AS store_id", "st.store_id", "total_revenue DESC"),
        GroupBy::Category => ("c.name AS category", "c.category_id, c.name", "total_revenue DESC"),
        GroupBy::Month => (
            "DATE_FORMAT(p.payment_date, '%Y-%m') AS month",
            "DATE_FORMAT(p.payment_date, '%Y-%m')",
            "month",
        ),
        GroupBy::Staff => (
            "CONCAT(st.first_name, ' ', st.last_name) AS staff",
            "st.staff_id, st.first_name, st.last_name",
            "total_revenue DESC",
        ),
    }
}

pub(crate) fn revenue_summary_statement(args: RevenueSummaryArgs) -> Result<Statement> {
    let group_by = validate_choice(args.group_by.as_deref(), GroupBy::Store)?;
    let period = validate_choice(args.period.as_deref(), Period::AllTime)?;
    let store_id = validate_store_id(args.store_id)?;
    let (select, group, order) = revenue_grouping(group_by);

    let mut qb = QueryBuilder::new(format!(
        "SELECT {select}, COUNT(p.payment_id) AS payment_count, \
         SUM(p.amount) AS total_revenue, AVG(p.amount) AS avg_payment \
         FROM payment p \
         JOIN staff st ON p.staff_id = st.staff_id"
    ));
    // Payments without a rental still count; they land in a null category
    if group_by == GroupBy::Category {
        qb.push(
            "LEFT JOIN rental r ON p.rental_id = r.rental_id \
             LEFT JOIN inventory i ON r.inventory_id = i.inventory_id \
             LEFT JOIN film_category fc ON i.film_id = fc.film_id \
             LEFT JOIN category c ON fc.category_id = c.category_id",
        );
    }
    qb.push("WHERE 1=1");
    push_period(&mut qb, "p.payment_date", period);
    qb.filter_opt("AND st.store_id = ?", store_id);
    qb.push(&format!("GROUP BY {group} ORDER BY {order}"));
    qb.limit(LimitPolicy::REPORT.max);
    qb.build()
}

pub(crate) fn store_stats_statement(args: StoreStatsArgs) -> Result<Statement> {
    let store_id = validate_store_id(args.store_id)?;

    let mut qb = QueryBuilder::new(
        "SELECT s.store_id, \
         CONCAT(m.first_name, ' ', m.last_name) AS manager, \
         CONCAT(a.address, ', ', ci.city, ', ', co.country) AS address, \
         (SELECT COUNT(*) FROM customer c WHERE c.store_id = s.store_id) AS total_customers, \
         (SELECT COUNT(*) FROM customer c WHERE c.store_id = s.store_id AND c.active = 1) AS active_customers, \
         (SELECT COUNT(*) FROM inventory i WHERE i.store_id = s.store_id) AS total_inventory, \
         (SELECT COUNT(*) FROM rental r JOIN inventory i ON r.inventory_id = i.inventory_id \
          WHERE i.store_id = s.store_id) AS total_rentals, \
         (SELECT COALESCE(SUM(p.amount), 0) FROM payment p JOIN staff st ON p.staff_id = st.staff_id \
          WHERE st.store_id = s.store_id) AS total_revenue \
         FROM store s \
         JOIN staff m ON s.manager_staff_id = m.staff_id \
         JOIN address a ON s.address_id = a.address_id \
         JOIN city ci ON a.city_id = ci.city_id \
         JOIN country co ON ci.country_id = co.country_id \
         WHERE 1=1",
    );
    qb.filter_opt("AND s.store_id = ?", store_id);
    qb.push("ORDER BY s.store_id");
    qb.limit(LimitPolicy::REPORT.max);
    qb.build()
}

pub(crate) fn top_customers_statement(args: TopCustomersArgs) -> Result<Statement> {
    let metric = validate_choice(args.metric.as_deref(), Metric::Rentals)?;
    let period = validate_choice(args.period.as_deref(), Period::AllTime)?;
    let store_id = validate_store_id(args.store_id)?;
    let limit = validate_limit(args.limit, LimitPolicy::LISTING);

    let mut qb = QueryBuilder::new(
        "SELECT c.customer_id, CONCAT(c.first_name, ' ', c.last_name) AS name, c.email, c.store_id, \
         COUNT(DISTINCT r.rental_id) AS rental_count, COALESCE(SUM(p.amount), 0) AS total_spent \
         FROM customer c \
         JOIN rental r ON c.customer_id = r.customer_id \
         LEFT JOIN payment p ON r.rental_id = p.rental_id \
         WHERE 1=1",
    );
    push_period(&mut qb, "r.rental_date", period);
    qb.filter_opt("AND c.store_id = ?", store_id);
    qb.push("GROUP BY c.customer_id, c.first_name, c.last_name, c.email, c.store_id");
    qb.push(match metric {
        Metric::Rentals => "ORDER BY rental_count DESC, total_spent DESC, c.customer_id",
        Metric::Spending => "ORDER BY total_spent DESC, rental_count DESC, c.customer_id",
    });
    qb.limit(limit);
    qb.build()
}

pub(crate) fn customer_segments_statement(store_id: Option<i64>) -> Result<Statement> {
    let mut qb = QueryBuilder::new(
        "SELECT c.customer_id, COUNT(DISTINCT r.rental_id) AS rental_count, \
         COALESCE(SUM(p.amount), 0) AS total_spent \
         FROM customer c \
         LEFT JOIN rental r ON c.customer_id = r.customer_id \
         LEFT JOIN payment p ON r.rental_id = p.rental_id \
         WHERE c.active = 1",
    );
    qb.filter_opt("AND c.store_id = ?", store_id);
    qb.push("GROUP BY c.customer_id");
    qb.build()
}

pub(crate) fn customer_activity_statement(period: Period, store_id: Option<i64>) -> Result<Statement> {
    let cutoff = period.cutoff_sql().unwrap_or(BEGINNING_OF_TIME);

    let mut qb = QueryBuilder::new(format!(
        "SELECT COUNT(*) AS total_customers, \
         SUM(CASE WHEN EXISTS (SELECT 1 FROM rental r WHERE r.customer_id = c.customer_id \
             AND r.rental_date >= {cutoff}) THEN 1 ELSE 0 END) AS active_customers, \
         SUM(CASE WHEN c.create_date >= {cutoff} THEN 1 ELSE 0 END) AS new_customers, \
         SUM(CASE WHEN c.active = 1 AND NOT EXISTS (SELECT 1 FROM rental r \
             WHERE r.customer_id = c.customer_id AND r.rental_date >= {cutoff}) \
             THEN 1 ELSE 0 END) AS dormant_customers \
         FROM customer c WHERE 1=1"
    ));
    qb.filter_opt("AND c.store_id = ?", store_id);
    qb.build()
}

/// Most-rented films, ranked
pub async fn get_popular_films<D: Database>(db: &D, args: PopularFilmsArgs) -> Result<Outcome> {
    let statement = popular_films_statement(args)?;
    let rows = fetch_scoped(db, &statement).await?;
    let records = with_rank(shape_rows(rows, &["total_revenue"], &["rental_count"]));
    Ok(Outcome::records(records, "no rentals in the selected period"))
}

/// Revenue per group with each group's share of the total
pub async fn get_revenue_summary<D: Database>(db: &D, args: RevenueSummaryArgs) -> Result<Outcome> {
    let statement = revenue_summary_statement(args)?;
    let rows = fetch_scoped(db, &statement).await?;

    let mut records = shape_rows(rows, &["total_revenue", "avg_payment"], &["payment_count"]);
    add_share(&mut records, "total_revenue", "percentage");
    Ok(Outcome::records(records, "no payments in the selected period"))
}

/// Headline numbers per store
pub async fn get_store_stats<D: Database>(db: &D, args: StoreStatsArgs) -> Result<Outcome> {
    let statement = store_stats_statement(args)?;
    let rows = fetch_scoped(db, &statement).await?;
    let records = shape_rows(
        rows,
        &["total_revenue"],
        &["total_customers", "active_customers", "total_inventory", "total_rentals"],
    );
    Ok(Outcome::records(records, "no stores found"))
}

/// Best customers by rentals or spending, ranked
pub async fn get_top_customers<D: Database>(db: &D, args: TopCustomersArgs) -> Result<Outcome> {
    let statement = top_customers_statement(args)?;
    let rows = fetch_scoped(db, &statement).await?;
    let records = with_rank(shape_rows(rows, &["total_spent"], &["rental_count"]));
    Ok(Outcome::records(records, "no customer rentals in the selected period"))
}

/// Active customers partitioned into VIP, Regular, Occasional and Inactive
pub async fn get_customer_segments<D: Database>(db: &D, args: CustomerSegmentsArgs) -> Result<Outcome> {
    let store_id = validate_store_id(args.store_id)?;
    let rows = fetch_scoped(db, &customer_segments_statement(store_id)?).await?;
    if rows.is_empty() {
        return Ok(Outcome::NoData("no active customers".to_string()));
    }

    let customers: Vec<(i64, f64)> =
        rows.iter().map(|row| (to_i64(row.get("rental_count")), to_f64(row.get("total_spent")))).collect();
    Outcome::summary(Scoped { store_id, report: summarize_segments(&customers) })
}

/// Active, new and dormant customers over a period
pub async fn get_customer_activity<D: Database>(db: &D, args: CustomerActivityArgs) -> Result<Outcome> {
    let period = validate_choice(args.period.as_deref(), Period::LastMonth)?;
    let store_id = validate_store_id(args.store_id)?;

    let rows = fetch_scoped(db, &customer_activity_statement(period, store_id)?).await?;
    let Some(row) = rows.first() else {
        return Ok(Outcome::NoData("no customers".to_string()));
    };

    let report = summarize_activity(period.as_str(), row);
    if report.total_customers == 0 {
        return Ok(Outcome::NoData("no customers".to_string()));
    }
    Outcome::summary(Scoped { store_id, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Param;

    #[test]
    fn test_popular_films_period_is_fixed_fragment() {
        let stmt = popular_films_statement(PopularFilmsArgs {
            period: Some("LAST_WEEK".into()),
            store_id: Some(1),
            ..Default::default()
        })
        .unwrap();
        assert!(stmt.sql().contains("r.rental_date >= DATE_SUB(NOW(), INTERVAL 7 DAY)"));
        assert_eq!(stmt.params(), &[Param::Int(1), Param::Int(10)]);
    }

    #[test]
    fn test_revenue_summary_groupings() {
        for group_by in GroupBy::ALL {
            let stmt = revenue_summary_statement(RevenueSummaryArgs {
                group_by: Some(group_by.as_str().to_string()),
                ..Default::default()
            })
            .unwrap();
            assert_eq!(stmt.params(), &[Param::Int(LimitPolicy::REPORT.max)]);
            assert_eq!(stmt.sql().contains("JOIN category c"), *group_by == GroupBy::Category);
            assert!(!stmt.sql().contains("JOIN rental r") || *group_by == GroupBy::Category);
        }
    }

    #[test]
    fn test_month_format_is_not_a_placeholder() {
        let stmt = revenue_summary_statement(RevenueSummaryArgs {
            group_by: Some("month".into()),
            store_id: Some(2),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(stmt.params(), &[Param::Int(2), Param::Int(100)]);
        assert!(stmt.sql().contains("AND st.store_id = ?"));
    }

    #[test]
    fn test_revenue_by_store_keeps_payments_without_rental() {
        let stmt = revenue_summary_statement(RevenueSummaryArgs::default()).unwrap();
        assert!(stmt.sql().contains("FROM payment p JOIN staff st"));
        assert!(stmt.sql().contains("GROUP BY st.store_id"));
        assert!(!stmt.sql().contains("JOIN rental"));
    }

    #[test]
    fn test_popular_films_counts_each_rental_once() {
        let stmt = popular_films_statement(PopularFilmsArgs::default()).unwrap();
        assert!(stmt.sql().contains("COUNT(DISTINCT r.rental_id) AS rental_count"));
    }

    #[test]
    fn test_store_stats_is_bounded() {
        let stmt = store_stats_statement(StoreStatsArgs::default()).unwrap();
        assert!(stmt.sql().ends_with("LIMIT ?"));
        assert_eq!(stmt.params(), &[Param::Int(100)]);
    }

    #[test]
    fn test_top_customers_metric_ordering() {
        let stmt = top_customers_statement(TopCustomersArgs { metric: Some("spending".into()), ..Default::default() })
            .unwrap();
        assert!(stmt.sql().contains("ORDER BY total_spent DESC"));
    }

    #[test]
    fn test_activity_all_time_uses_epoch() {
        let stmt = customer_activity_statement(Period::AllTime, None).unwrap();
        assert!(stmt.sql().contains(BEGINNING_OF_TIME));
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn test_invalid_metric_rejected() {
        let err = top_customers_statement(TopCustomersArgs { metric: Some("revenue".into()), ..Default::default() })
            .unwrap_err();
        assert!(err.to_string().contains("rentals, spending"));
    }
}
