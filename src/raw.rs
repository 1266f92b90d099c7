//! Raw-Query Catalog
//!
//! Four operations over caller-written SQL and table names:
//! - `query`: any statement the gatekeeper accepts
//! - `list_tables`: `SHOW TABLES`, flattened to a list of names
//! - `describe_table`: column layout of one known table
//! - `get_sample_data`: first rows of one known table (at most 10)
//!
//! Every statement this module produces is parameter-free. Table names are
//! interpolated only as [`KnownTable`] values, which exist only after the
//! allow-list check succeeded.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::allowlist::KnownTable;
use crate::dispatch::{schema_of, ToolDescriptor};
use crate::engine::{fetch_scoped, Database};
use crate::error::Result;
use crate::gatekeeper::{check_statement, ensure_single_statement};
use crate::output::Outcome;
use crate::query::Statement;
use crate::validate::{decode_args, validate_limit, validate_table_name, LimitPolicy};

/// Most rows a raw `query` returns; the rest are discarded
pub const MAX_QUERY_ROWS: usize = 1000;

/// Compact schema guide embedded in the `query` description
const SCHEMA_GUIDE: &str = "\
## Sakila schema

actor(actor_id, first_name, last_name, last_update)
film(film_id, title, description, release_year, language_id, original_language_id, \
rental_duration, rental_rate DECIMAL, length, replacement_cost DECIMAL, \
rating ENUM('G','PG','PG-13','R','NC-17'), special_features SET, last_update)
customer(customer_id, store_id, first_name, last_name, email, address_id, active, create_date, last_update)
rental(rental_id, rental_date, inventory_id, customer_id, return_date NULL while out, staff_id, last_update)
payment(payment_id, customer_id, staff_id, rental_id, amount DECIMAL, payment_date, last_update)
inventory(inventory_id, film_id, store_id, last_update)
category(category_id, name, last_update)
language(language_id, name, last_update)
store(store_id, manager_staff_id, address_id, last_update)
staff(staff_id, first_name, last_name, address_id, email, store_id, active, username, last_update)
address(address_id, address, address2, district, city_id, postal_code, phone, last_update)
city(city_id, city, country_id, last_update)
country(country_id, country, last_update)
film_actor(actor_id, film_id, last_update)
film_category(film_id, category_id, last_update)
film_text(film_id, title, description)

## Common joins

film -> film_actor -> actor: film.film_id = film_actor.film_id, film_actor.actor_id = actor.actor_id
film -> film_category -> category: film.film_id = film_category.film_id, film_category.category_id = category.category_id
rental -> inventory -> film: rental.inventory_id = inventory.inventory_id, inventory.film_id = film.film_id
customer -> payment: customer.customer_id = payment.customer_id
customer -> address -> city -> country: customer.address_id = address.address_id, \
address.city_id = city.city_id, city.country_id = country.country_id

## Views

actor_info, customer_list, film_list, nicer_but_slower_film_list, \
sales_by_film_category, sales_by_store, staff_list";

/// Arguments for `query`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryArgs {
    /// SQL to execute (SELECT, SHOW, DESCRIBE, DESC or EXPLAIN only)
    pub sql: String,
}

/// Arguments for `list_tables`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListTablesArgs {}

/// Arguments for `describe_table`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeTableArgs {
    /// Table name
    pub table_name: String,
}

/// Arguments for `get_sample_data`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SampleDataArgs {
    /// Table name
    pub table_name: String,

    /// Number of rows (1-10, default 5)
    #[schemars(range(min = 1, max = 10))]
    pub limit: Option<i64>,
}

/// Operations served in raw-query mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawOperation {
    Query,
    ListTables,
    DescribeTable,
    GetSampleData,
}

impl RawOperation {
    /// Catalog order
    pub const ALL: [Self; 4] = [Self::Query, Self::ListTables, Self::DescribeTable, Self::GetSampleData];

    /// Wire name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::ListTables => "list_tables",
            Self::DescribeTable => "describe_table",
            Self::GetSampleData => "get_sample_data",
        }
    }

    /// Look up an operation by wire name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    fn description(self) -> String {
        match self {
            Self::Query => format!(
                "Execute a read-only SQL statement (SELECT, SHOW, DESCRIBE, DESC or EXPLAIN). \
                 One statement per call; write and DDL keywords are rejected. \
                 At most {MAX_QUERY_ROWS} rows are returned; add a LIMIT for larger tables.\n\n{SCHEMA_GUIDE}"
            ),
            Self::ListTables => "List the tables of the Sakila database.".to_string(),
            Self::DescribeTable => "Show the column layout of one Sakila table.".to_string(),
            Self::GetSampleData => "Fetch sample rows from one Sakila table (at most 10 rows).".to_string(),
        }
    }

    /// Catalog entry with JSON Schema for the arguments
    #[must_use]
    pub fn descriptor(self) -> ToolDescriptor {
        let input_schema = match self {
            Self::Query => schema_of::<QueryArgs>(),
            Self::ListTables => schema_of::<ListTablesArgs>(),
            Self::DescribeTable => schema_of::<DescribeTableArgs>(),
            Self::GetSampleData => schema_of::<SampleDataArgs>(),
        };
        ToolDescriptor { name: self.name(), description: self.description(), input_schema }
    }

    /// Decode arguments and run the operation
    pub async fn run<D: Database>(self, db: &D, arguments: &Map<String, Value>) -> Result<Outcome> {
        match self {
            Self::Query => query(db, decode_args(arguments)?).await,
            Self::ListTables => list_tables(db, decode_args(arguments)?).await,
            Self::DescribeTable => describe_table(db, decode_args(arguments)?).await,
            Self::GetSampleData => get_sample_data(db, decode_args(arguments)?).await,
        }
    }
}

/// Run caller SQL after the gatekeeper accepted it
pub async fn query<D: Database>(db: &D, args: QueryArgs) -> Result<Outcome> {
    let sql = check_statement(&args.sql)?;
    ensure_single_statement(sql)?;
    debug!(sql, "raw statement accepted");

    let mut rows = fetch_scoped(db, &Statement::raw(sql)).await?;
    if rows.len() > MAX_QUERY_ROWS {
        warn!(returned = rows.len(), kept = MAX_QUERY_ROWS, "raw result truncated");
        rows.truncate(MAX_QUERY_ROWS);
    }
    Ok(Outcome::records(rows, "the statement returned no rows"))
}

/// Table names, one string per table
pub async fn list_tables<D: Database>(db: &D, _args: ListTablesArgs) -> Result<Outcome> {
    let rows = fetch_scoped(db, &Statement::raw("SHOW TABLES")).await?;

    // The SHOW TABLES column is named after the database; take the first value
    let tables: Vec<Value> = rows.into_iter().filter_map(|row| row.into_iter().next().map(|(_, v)| v)).collect();

    if tables.is_empty() {
        return Ok(Outcome::NoData("the database has no tables".to_string()));
    }
    Ok(Outcome::Data(Value::Array(tables)))
}

/// Column layout of one table
pub async fn describe_table<D: Database>(db: &D, args: DescribeTableArgs) -> Result<Outcome> {
    let table = validate_table_name(&args.table_name)?;

    let rows = fetch_scoped(db, &describe_statement(table)).await?;
    Ok(Outcome::records(rows, format!("table {} has no columns", table.name())))
}

/// First `limit` rows of one table
pub async fn get_sample_data<D: Database>(db: &D, args: SampleDataArgs) -> Result<Outcome> {
    let table = validate_table_name(&args.table_name)?;
    let limit = validate_limit(args.limit, LimitPolicy::SAMPLE);

    let rows = fetch_scoped(db, &sample_statement(table, limit)).await?;
    Ok(Outcome::records(rows, format!("table {} is empty", table.name())))
}

fn describe_statement(table: KnownTable) -> Statement {
    Statement::raw(format!("DESCRIBE {}", table.quoted()))
}

/// `limit` is a clamped integer, never caller text
fn sample_statement(table: KnownTable, limit: i64) -> Statement {
    Statement::raw(format!("SELECT * FROM {} LIMIT {limit}", table.quoted()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trip() {
        for op in RawOperation::ALL {
            assert_eq!(RawOperation::from_name(op.name()), Some(op));
        }
        assert_eq!(RawOperation::from_name("search_films"), None);
    }

    #[test]
    fn test_statements_are_parameter_free() {
        let table = validate_table_name("film").unwrap();
        assert_eq!(describe_statement(table).sql(), "DESCRIBE `film`");
        let sample = sample_statement(table, 5);
        assert_eq!(sample.sql(), "SELECT * FROM `film` LIMIT 5");
        assert!(sample.params().is_empty());
    }

    #[test]
    fn test_query_description_carries_schema_guide() {
        let descriptor = RawOperation::Query.descriptor();
        assert!(descriptor.description.contains("film_actor"));
        assert!(descriptor.description.contains("Common joins"));
        assert!(descriptor.description.contains("At most 1000 rows"));
    }

    #[test]
    fn test_sample_schema_requires_table_name() {
        let schema = RawOperation::GetSampleData.descriptor().input_schema;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], serde_json::json!(["table_name"]));
        assert!(schema["properties"]["limit"].is_object());
    }
}
