//! Customer lookups

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::{fetch_scoped, Database};
use crate::error::{GateError, Result};
use crate::normalize::{set_flag, shape_row, shape_rows};
use crate::output::Outcome;
use crate::query::{contains_pattern, QueryBuilder, Statement};
use crate::validate::{normalize_text, validate_limit, validate_store_id, LimitPolicy};

/// Arguments for `search_customers`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SearchCustomersArgs {
    /// Part of the customer's full name
    pub name: Option<String>,
    /// Part of the email address
    pub email: Option<String>,
    /// Home store (1 or 2)
    pub store_id: Option<i64>,
    /// Only active accounts (default false)
    pub active_only: Option<bool>,
    /// Maximum results (1-50, default 10)
    pub limit: Option<i64>,
}

/// Arguments for `get_customer_details`; one of the two is required
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CustomerDetailsArgs {
    /// Customer number
    pub customer_id: Option<i64>,
    /// Exact email address
    pub email: Option<String>,
}

pub(crate) fn search_customers_statement(args: SearchCustomersArgs) -> Result<Statement> {
    let name = normalize_text(args.name);
    let email = normalize_text(args.email);
    let store_id = validate_store_id(args.store_id)?;
    let limit = validate_limit(args.limit, LimitPolicy::LISTING);

    let mut qb = QueryBuilder::new(
        "SELECT c.customer_id, CONCAT(c.first_name, ' ', c.last_name) AS name, c.email, \
         c.store_id, c.active, c.create_date AS registration_date \
         FROM customer c WHERE 1=1",
    );
    qb.filter_opt("AND CONCAT(c.first_name, ' ', c.last_name) LIKE ?", name.as_deref().map(contains_pattern));
    qb.filter_opt("AND c.email LIKE ?", email.as_deref().map(contains_pattern));
    qb.filter_opt("AND c.store_id = ?", store_id);
    if args.active_only.unwrap_or(false) {
        qb.push("AND c.active = 1");
    }
    qb.push("ORDER BY c.last_name, c.first_name");
    qb.limit(limit);
    qb.build()
}

pub(crate) fn customer_details_statement(args: CustomerDetailsArgs) -> Result<Statement> {
    let mut qb = QueryBuilder::new(
        "SELECT c.customer_id, CONCAT(c.first_name, ' ', c.last_name) AS name, c.email, \
         CONCAT(a.address, ', ', ci.city, ', ', co.country) AS address, a.phone, \
         c.store_id, c.active, c.create_date AS registration_date, \
         (SELECT COUNT(*) FROM rental r WHERE r.customer_id = c.customer_id) AS total_rentals, \
         (SELECT COALESCE(SUM(p.amount), 0) FROM payment p WHERE p.customer_id = c.customer_id) AS total_spent \
         FROM customer c \
         JOIN address a ON c.address_id = a.address_id \
         JOIN city ci ON a.city_id = ci.city_id \
         JOIN country co ON ci.country_id = co.country_id",
    );

    match (args.customer_id, normalize_text(args.email)) {
        (Some(id), _) if id < 1 => {
            return Err(GateError::validation(format!("Invalid customer_id: {id}. Must be a positive integer")));
        }
        (Some(id), _) => qb.filter("WHERE c.customer_id = ?", id),
        (None, Some(email)) => qb.filter("WHERE c.email = ?", email),
        (None, None) => return Err(GateError::validation("Either customer_id or email is required")),
    };
    qb.push("LIMIT 1");
    qb.build()
}

/// Customers matching every supplied filter
pub async fn search_customers<D: Database>(db: &D, args: SearchCustomersArgs) -> Result<Outcome> {
    let statement = search_customers_statement(args)?;
    let rows = fetch_scoped(db, &statement).await?;

    let mut records = shape_rows(rows, &[], &[]);
    records.iter_mut().for_each(|r| set_flag(r, "active"));
    Ok(Outcome::records(records, "no customers matched the given filters"))
}

/// One customer with contact details and lifetime totals
pub async fn get_customer_details<D: Database>(db: &D, args: CustomerDetailsArgs) -> Result<Outcome> {
    let statement = customer_details_statement(args)?;
    let row = fetch_scoped(db, &statement)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| GateError::not_found("no customer found with the given identifier"))?;

    let mut record = shape_row(row, &["total_spent"], &["total_rentals"]);
    set_flag(&mut record, "active");
    Ok(Outcome::Data(Value::Object(record)))
}
