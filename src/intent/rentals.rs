//! Rental desk operations

use schemars::JsonSchema;
use serde::Deserialize;

use crate::allowlist::RentalStatus;
use crate::engine::{fetch_scoped, Database};
use crate::error::{GateError, Result};
use crate::normalize::{at_least, shape_rows};
use crate::output::Outcome;
use crate::query::{QueryBuilder, Statement};
use crate::validate::{validate_choice, validate_days, validate_limit, validate_store_id, LimitPolicy};

/// Arguments for `get_customer_rentals`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CustomerRentalsArgs {
    /// Customer number
    pub customer_id: i64,
    /// Rental status: all, active or returned (default all)
    pub status: Option<String>,
    /// Maximum results (1-50, default 10)
    pub limit: Option<i64>,
}

/// Arguments for `get_overdue_rentals`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct OverdueRentalsArgs {
    /// Minimum days past the due date (default 0)
    pub days_overdue: Option<i64>,
    /// Store (1 or 2)
    pub store_id: Option<i64>,
    /// Maximum results (1-100, default 20)
    pub limit: Option<i64>,
}

pub(crate) fn customer_rentals_statement(args: CustomerRentalsArgs) -> Result<Statement> {
    if args.customer_id < 1 {
        return Err(GateError::validation(format!(
            "Invalid customer_id: {}. Must be a positive integer",
            args.customer_id
        )));
    }
    let status = validate_choice(args.status.as_deref(), RentalStatus::All)?;
    let limit = validate_limit(args.limit, LimitPolicy::LISTING);

    let mut qb = QueryBuilder::new(
        "SELECT r.rental_id, f.title, r.rental_date, r.return_date, \
         CASE WHEN r.return_date IS NULL THEN 'active' ELSE 'returned' END AS status, \
         (SELECT COALESCE(SUM(p.amount), 0) FROM payment p WHERE p.rental_id = r.rental_id) AS amount \
         FROM rental r \
         JOIN inventory i ON r.inventory_id = i.inventory_id \
         JOIN film f ON i.film_id = f.film_id",
    );
    qb.filter("WHERE r.customer_id = ?", args.customer_id);
    match status {
        RentalStatus::All => {}
        RentalStatus::Active => {
            qb.push("AND r.return_date IS NULL");
        }
        RentalStatus::Returned => {
            qb.push("AND r.return_date IS NOT NULL");
        }
    }
    qb.push("ORDER BY r.rental_date DESC");
    qb.limit(limit);
    qb.build()
}

pub(crate) fn overdue_rentals_statement(days_overdue: i64, store_id: Option<i64>, limit: i64) -> Result<Statement> {
    let mut qb = QueryBuilder::new(
        "SELECT r.rental_id, CONCAT(c.first_name, ' ', c.last_name) AS customer_name, \
         c.email, a.phone, f.title AS film_title, i.store_id, r.rental_date, \
         DATE_ADD(r.rental_date, INTERVAL f.rental_duration DAY) AS due_date, \
         DATEDIFF(NOW(), DATE_ADD(r.rental_date, INTERVAL f.rental_duration DAY)) AS days_overdue \
         FROM rental r \
         JOIN inventory i ON r.inventory_id = i.inventory_id \
         JOIN film f ON i.film_id = f.film_id \
         JOIN customer c ON r.customer_id = c.customer_id \
         JOIN address a ON c.address_id = a.address_id \
         WHERE r.return_date IS NULL",
    );
    qb.filter(
        "AND DATEDIFF(NOW(), DATE_ADD(r.rental_date, INTERVAL f.rental_duration DAY)) >= ?",
        days_overdue,
    );
    qb.filter_opt("AND i.store_id = ?", store_id);
    qb.push("ORDER BY days_overdue DESC, r.rental_date");
    qb.limit(limit);
    qb.build()
}

/// Rental history of one customer
pub async fn get_customer_rentals<D: Database>(db: &D, args: CustomerRentalsArgs) -> Result<Outcome> {
    let customer_id = args.customer_id;
    let statement = customer_rentals_statement(args)?;
    let rows = fetch_scoped(db, &statement).await?;
    Ok(Outcome::records(
        shape_rows(rows, &["amount"], &[]),
        format!("no rentals found for customer {customer_id}"),
    ))
}

/// Unreturned rentals past their due date
pub async fn get_overdue_rentals<D: Database>(db: &D, args: OverdueRentalsArgs) -> Result<Outcome> {
    let days_overdue = validate_days("days_overdue", args.days_overdue, 0, 0..=i64::from(i32::MAX))?;
    let store_id = validate_store_id(args.store_id)?;
    let limit = validate_limit(args.limit, LimitPolicy::OVERDUE);

    let statement = overdue_rentals_statement(days_overdue, store_id, limit)?;
    let rows = fetch_scoped(db, &statement).await?;

    let records = at_least(shape_rows(rows, &[], &["days_overdue"]), "days_overdue", days_overdue);
    Ok(Outcome::records(records, format!("no rentals overdue by {days_overdue} days or more")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Param;

    #[test]
    fn test_customer_rentals_status_clause() {
        let stmt = customer_rentals_statement(CustomerRentalsArgs {
            customer_id: 1,
            status: Some("Active".into()),
            limit: None,
        })
        .unwrap();
        assert!(stmt.sql().contains("r.return_date IS NULL ORDER BY"));
        assert!(!stmt.sql().contains("JOIN payment"), "one row per rental");
        assert_eq!(stmt.params(), &[Param::Int(1), Param::Int(10)]);
    }

    #[test]
    fn test_customer_rentals_rejects_unknown_status() {
        let err = customer_rentals_statement(CustomerRentalsArgs {
            customer_id: 1,
            status: Some("lost".into()),
            limit: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("all, active, returned"));
    }

    #[test]
    fn test_overdue_statement_params() {
        let stmt = overdue_rentals_statement(7, Some(2), 20).unwrap();
        assert_eq!(stmt.params(), &[Param::Int(7), Param::Int(2), Param::Int(20)]);
        assert_eq!(stmt.placeholder_count(), 3);
    }
}
