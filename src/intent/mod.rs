//! Intent Catalog
//!
//! Eighteen named business operations. Each has a typed argument struct
//! decoded from the caller's argument map, a handler that validates those
//! arguments and builds parameterized SQL, and a description that never
//! mentions keys, constraints or DDL.
//!
//! # Organization
//! - [`films`]: search, details, categories, availability, filmography
//! - [`customers`]: search and details
//! - [`rentals`]: customer history and overdue rentals
//! - [`analytics`]: popularity, revenue, store stats, top customers, segments, activity
//! - [`inventory`]: turnover, category performance, underperforming titles

use serde_json::{Map, Value};

use crate::dispatch::{schema_of, ToolDescriptor};
use crate::engine::Database;
use crate::error::Result;
use crate::output::Outcome;
use crate::validate::decode_args;

pub mod analytics;
pub mod customers;
pub mod films;
pub mod inventory;
pub mod rentals;

macro_rules! intent_catalog {
    ($( $variant:ident => $name:literal, $args:ty, $handler:path, $description:literal; )+) => {
        /// Operations served in intent mode
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum IntentOperation {
            $($variant,)+
        }

        impl IntentOperation {
            /// Catalog order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire name
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Caller-facing description
            #[must_use]
            pub const fn description(self) -> &'static str {
                match self {
                    $(Self::$variant => $description,)+
                }
            }

            /// JSON Schema of the argument struct
            #[must_use]
            pub fn input_schema(self) -> Value {
                match self {
                    $(Self::$variant => schema_of::<$args>(),)+
                }
            }

            /// Decode arguments and run the handler
            pub async fn run<D: Database>(self, db: &D, arguments: &Map<String, Value>) -> Result<Outcome> {
                match self {
                    $(Self::$variant => $handler(db, decode_args::<$args>(arguments)?).await,)+
                }
            }
        }
    };
}

intent_catalog! {
    SearchFilms => "search_films", films::SearchFilmsArgs, films::search_films,
        "Search films by title, category, rating or actor name. All filters are optional and combine.";
    GetFilmDetails => "get_film_details", films::FilmDetailsArgs, films::get_film_details,
        "Show one film in detail: description, rating, length, price, cast, categories and copies per store. \
         The title may be partial; the first match is used.";
    ListCategories => "list_categories", films::ListCategoriesArgs, films::list_categories,
        "List all film categories with the number of films in each.";
    CheckFilmAvailability => "check_film_availability", films::FilmAvailabilityArgs, films::check_film_availability,
        "Check whether a film can be rented right now: copies owned, rented out and available per store.";
    SearchCustomers => "search_customers", customers::SearchCustomersArgs, customers::search_customers,
        "Search customers by name, email or home store, optionally only active accounts.";
    GetCustomerDetails => "get_customer_details", customers::CustomerDetailsArgs, customers::get_customer_details,
        "Show one customer's contact details, home store, registration date and lifetime rentals and spending. \
         Identify the customer by customer_id or by email.";
    GetCustomerRentals => "get_customer_rentals", rentals::CustomerRentalsArgs, rentals::get_customer_rentals,
        "List a customer's rentals, newest first, filtered by status: all, active (not yet returned) or returned.";
    GetOverdueRentals => "get_overdue_rentals", rentals::OverdueRentalsArgs, rentals::get_overdue_rentals,
        "List unreturned rentals past their due date with customer contact details, most overdue first.";
    GetPopularFilms => "get_popular_films", analytics::PopularFilmsArgs, analytics::get_popular_films,
        "Rank the most rented films over a period, optionally for one category or store.";
    GetRevenueSummary => "get_revenue_summary", analytics::RevenueSummaryArgs, analytics::get_revenue_summary,
        "Summarize revenue grouped by store, category, month or staff member, with each group's share of the total.";
    GetStoreStats => "get_store_stats", analytics::StoreStatsArgs, analytics::get_store_stats,
        "Headline numbers per store: manager, address, customers, inventory, rentals and revenue.";
    GetActorFilmography => "get_actor_filmography", films::ActorFilmographyArgs, films::get_actor_filmography,
        "List the films an actor appears in. The name may be partial; the first match is used.";
    GetTopCustomers => "get_top_customers", analytics::TopCustomersArgs, analytics::get_top_customers,
        "Rank customers by number of rentals or by total spending over a period.";
    GetCustomerSegments => "get_customer_segments", analytics::CustomerSegmentsArgs, analytics::get_customer_segments,
        "Split active customers into VIP, Regular, Occasional and Inactive segments by rentals and spending.";
    GetCustomerActivity => "get_customer_activity", analytics::CustomerActivityArgs, analytics::get_customer_activity,
        "Count active, new and dormant customers over a period, each as a share of all customers.";
    GetInventoryTurnover => "get_inventory_turnover", inventory::InventoryTurnoverArgs, inventory::get_inventory_turnover,
        "Rank films by rentals per copy held, optionally for one store or category.";
    GetCategoryPerformance => "get_category_performance", inventory::CategoryPerformanceArgs, inventory::get_category_performance,
        "Rank categories by revenue over a period, with rentals, film counts and revenue share.";
    GetUnderperformingFilms => "get_underperforming_films", inventory::UnderperformingFilmsArgs, inventory::get_underperforming_films,
        "List stocked films that have not been rented for a number of days.";
}

impl IntentOperation {
    /// Look up an operation by wire name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Catalog entry with JSON Schema for the arguments
    #[must_use]
    pub fn descriptor(self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_has_eighteen_unique_names() {
        let names: HashSet<&str> = IntentOperation::ALL.iter().map(|op| op.name()).collect();
        assert_eq!(IntentOperation::ALL.len(), 18);
        assert_eq!(names.len(), 18);
    }

    #[test]
    fn test_from_name_round_trip() {
        for op in IntentOperation::ALL {
            assert_eq!(IntentOperation::from_name(op.name()), Some(*op));
        }
        assert_eq!(IntentOperation::from_name("query"), None);
    }

    #[test]
    fn test_descriptions_hide_schema_vocabulary() {
        for op in IntentOperation::ALL {
            for term in ["PRIMARY KEY", "FOREIGN KEY", "FK", "PK", "CREATE TABLE"] {
                assert!(!op.description().contains(term), "{} mentions {term}", op.name());
            }
        }
    }

    #[test]
    fn test_schemas_are_objects() {
        for op in IntentOperation::ALL {
            assert_eq!(op.input_schema()["type"], "object", "{}", op.name());
        }
    }

    #[test]
    fn test_search_films_schema_properties() {
        let schema = IntentOperation::SearchFilms.input_schema();
        for prop in ["title", "category", "rating", "actor_name", "limit"] {
            assert!(schema["properties"].get(prop).is_some(), "missing {prop}");
        }
    }
}
