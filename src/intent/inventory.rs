//! Inventory and catalog performance

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::allowlist::Period;
use crate::engine::{fetch_scoped, Database};
use crate::error::Result;
use crate::normalize::{add_share, shape_rows, to_i64, turnover_rate, with_rank};
use crate::output::Outcome;
use crate::query::{contains_pattern, QueryBuilder, Statement};
use crate::validate::{
    normalize_text, validate_choice, validate_days, validate_limit, validate_store_id, LimitPolicy,
};

/// Arguments for `get_inventory_turnover`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct InventoryTurnoverArgs {
    /// Store (1 or 2)
    pub store_id: Option<i64>,
    /// Part of the category name
    pub category: Option<String>,
    /// Maximum results (1-50, default 10)
    pub limit: Option<i64>,
}

/// Arguments for `get_category_performance`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CategoryPerformanceArgs {
    /// all_time, last_month or last_week (default all_time)
    pub period: Option<String>,
    /// Store (1 or 2)
    pub store_id: Option<i64>,
}

/// Arguments for `get_underperforming_films`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UnderperformingFilmsArgs {
    /// Days without a rental (1-3650, default 30)
    pub days_not_rented: Option<i64>,
    /// Store (1 or 2)
    pub store_id: Option<i64>,
    /// Part of the category name
    pub category: Option<String>,
    /// Maximum results (1-50, default 10)
    pub limit: Option<i64>,
}

pub(crate) fn inventory_turnover_statement(args: InventoryTurnoverArgs) -> Result<Statement> {
    let store_id = validate_store_id(args.store_id)?;
    let category = normalize_text(args.category);
    let limit = validate_limit(args.limit, LimitPolicy::LISTING);

    let mut qb = QueryBuilder::new(
        "SELECT f.title, c.name AS category, \
         COUNT(DISTINCT i.inventory_id) AS inventory_count, \
         COUNT(r.rental_id) AS rental_count \
         FROM film f \
         JOIN inventory i ON f.film_id = i.film_id \
         LEFT JOIN rental r ON i.inventory_id = r.inventory_id \
         LEFT JOIN film_category fc ON f.film_id = fc.film_id \
         LEFT JOIN category c ON fc.category_id = c.category_id \
         WHERE 1=1",
    );
    qb.filter_opt("AND i.store_id = ?", store_id);
    qb.filter_opt("AND c.name LIKE ?", category.as_deref().map(contains_pattern));
    qb.push("GROUP BY f.film_id, f.title, c.name");
    qb.push("ORDER BY COUNT(r.rental_id) / COUNT(DISTINCT i.inventory_id) DESC, f.title");
    qb.limit(limit);
    qb.build()
}

pub(crate) fn category_performance_statement(args: CategoryPerformanceArgs) -> Result<Statement> {
    let period = validate_choice(args.period.as_deref(), Period::AllTime)?;
    let store_id = validate_store_id(args.store_id)?;

    let mut qb = QueryBuilder::new(
        "SELECT c.name AS category, COUNT(DISTINCT f.film_id) AS film_count, \
         COUNT(DISTINCT r.rental_id) AS rental_count, COALESCE(SUM(p.amount), 0) AS total_revenue \
         FROM category c \
         JOIN film_category fc ON c.category_id = fc.category_id \
         JOIN film f ON fc.film_id = f.film_id \
         JOIN inventory i ON f.film_id = i.film_id \
         JOIN rental r ON i.inventory_id = r.inventory_id \
         LEFT JOIN payment p ON r.rental_id = p.rental_id \
         WHERE 1=1",
    );
    if let Some(cutoff) = period.cutoff_sql() {
        qb.push(&format!("AND r.rental_date >= {cutoff}"));
    }
    qb.filter_opt("AND i.store_id = ?", store_id);
    qb.push("GROUP BY c.category_id, c.name ORDER BY total_revenue DESC, c.name");
    qb.limit(LimitPolicy::REPORT.max);
    qb.build()
}

pub(crate) fn underperforming_films_statement(args: UnderperformingFilmsArgs) -> Result<Statement> {
    let days = validate_days("days_not_rented", args.days_not_rented, 30, 1..=3650)?;
    let store_id = validate_store_id(args.store_id)?;
    let category = normalize_text(args.category);
    let limit = validate_limit(args.limit, LimitPolicy::LISTING);

    let mut qb = QueryBuilder::new(
        "SELECT f.title, c.name AS category, f.rating, f.rental_rate, \
         COUNT(DISTINCT i.inventory_id) AS copies, \
         MAX(r.rental_date) AS last_rented, \
         DATEDIFF(NOW(), MAX(r.rental_date)) AS days_since_rental \
         FROM film f \
         JOIN inventory i ON f.film_id = i.film_id \
         LEFT JOIN rental r ON i.inventory_id = r.inventory_id \
         LEFT JOIN film_category fc ON f.film_id = fc.film_id \
         LEFT JOIN category c ON fc.category_id = c.category_id \
         WHERE 1=1",
    );
    qb.filter_opt("AND i.store_id = ?", store_id);
    qb.filter_opt("AND c.name LIKE ?", category.as_deref().map(contains_pattern));
    qb.push("GROUP BY f.film_id, f.title, c.name, f.rating, f.rental_rate");
    qb.filter(
        "HAVING MAX(r.rental_date) IS NULL OR MAX(r.rental_date) < DATE_SUB(NOW(), INTERVAL ? DAY)",
        days,
    );
    qb.push("ORDER BY last_rented IS NOT NULL, last_rented, f.title");
    qb.limit(limit);
    qb.build()
}

/// Rentals per copy, ranked
pub async fn get_inventory_turnover<D: Database>(db: &D, args: InventoryTurnoverArgs) -> Result<Outcome> {
    let statement = inventory_turnover_statement(args)?;
    let rows = fetch_scoped(db, &statement).await?;

    let records = shape_rows(rows, &[], &["inventory_count", "rental_count"])
        .into_iter()
        .map(|mut record| {
            let rate = turnover_rate(to_i64(record.get("rental_count")), to_i64(record.get("inventory_count")));
            record.insert("turnover_rate".to_string(), Value::from(rate));
            record
        })
        .collect();
    Ok(Outcome::records(with_rank(records), "no inventory matched the given filters"))
}

/// Rentals and revenue per category with each category's revenue share
pub async fn get_category_performance<D: Database>(db: &D, args: CategoryPerformanceArgs) -> Result<Outcome> {
    let statement = category_performance_statement(args)?;
    let rows = fetch_scoped(db, &statement).await?;

    let mut records = shape_rows(rows, &["total_revenue"], &["film_count", "rental_count"]);
    add_share(&mut records, "total_revenue", "revenue_share");
    Ok(Outcome::records(with_rank(records), "no rentals in the selected period"))
}

/// Films with no rental in the last `days_not_rented` days
pub async fn get_underperforming_films<D: Database>(db: &D, args: UnderperformingFilmsArgs) -> Result<Outcome> {
    let statement = underperforming_films_statement(args)?;
    let rows = fetch_scoped(db, &statement).await?;
    let records = shape_rows(rows, &["rental_rate"], &["copies"]);
    Ok(Outcome::records(records, "every film was rented within the window"))
}
