//! Film catalog operations

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::allowlist::ClosedSet;
use crate::engine::{fetch_scoped, Database, Session};
use crate::error::{GateError, Result};
use crate::normalize::{shape_row, shape_rows, to_i64, Record};
use crate::output::Outcome;
use crate::query::{contains_pattern, QueryBuilder, Statement};
use crate::validate::{
    normalize_text, require_text, validate_limit, validate_rating, validate_store_id, LimitPolicy,
};

const FILM_DECIMALS: &[&str] = &["rental_rate"];

/// Arguments for `search_films`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SearchFilmsArgs {
    /// Part of the film title
    pub title: Option<String>,
    /// Part of the category name, e.g. "Action"
    pub category: Option<String>,
    /// Rating: G, PG, PG-13, R or NC-17
    pub rating: Option<String>,
    /// Part of an actor's name
    pub actor_name: Option<String>,
    /// Maximum results (1-50, default 10)
    pub limit: Option<i64>,
}

/// Arguments for `get_film_details`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FilmDetailsArgs {
    /// Film title or part of it
    pub title: String,
}

/// Arguments for `list_categories`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListCategoriesArgs {}

/// Arguments for `check_film_availability`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FilmAvailabilityArgs {
    /// Film title or part of it
    pub title: String,
    /// Restrict to one store (1 or 2)
    pub store_id: Option<i64>,
}

/// Arguments for `get_actor_filmography`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ActorFilmographyArgs {
    /// Actor name or part of it
    pub actor_name: String,
    /// Maximum films listed (1-50, default 10)
    pub limit: Option<i64>,
}

pub(crate) fn search_films_statement(args: SearchFilmsArgs) -> Result<Statement> {
    let title = normalize_text(args.title);
    let category = normalize_text(args.category);
    let rating = validate_rating(args.rating.as_deref())?;
    let actor_name = normalize_text(args.actor_name);
    let limit = validate_limit(args.limit, LimitPolicy::LISTING);

    let mut qb = QueryBuilder::new(
        "SELECT DISTINCT f.film_id, f.title, f.description, f.release_year, f.rating, \
         f.length, f.rental_rate, f.rental_duration, c.name AS category \
         FROM film f \
         LEFT JOIN film_category fc ON f.film_id = fc.film_id \
         LEFT JOIN category c ON fc.category_id = c.category_id",
    );
    if actor_name.is_some() {
        qb.push(
            "JOIN film_actor fa ON f.film_id = fa.film_id \
             JOIN actor a ON fa.actor_id = a.actor_id",
        );
    }
    qb.push("WHERE 1=1");
    qb.filter_opt("AND f.title LIKE ?", title.as_deref().map(contains_pattern));
    qb.filter_opt("AND c.name LIKE ?", category.as_deref().map(contains_pattern));
    qb.filter_opt("AND f.rating = ?", rating.map(|r| r.as_str()));
    qb.filter_opt(
        "AND CONCAT(a.first_name, ' ', a.last_name) LIKE ?",
        actor_name.as_deref().map(contains_pattern),
    );
    qb.push("ORDER BY f.title");
    qb.limit(limit);
    qb.build()
}

/// Films matching every supplied filter
pub async fn search_films<D: Database>(db: &D, args: SearchFilmsArgs) -> Result<Outcome> {
    let statement = search_films_statement(args)?;
    let rows = fetch_scoped(db, &statement).await?;
    Ok(Outcome::records(shape_rows(rows, FILM_DECIMALS, &[]), "no films matched the given filters"))
}

/// One film with cast, categories and per-store copies
pub async fn get_film_details<D: Database>(db: &D, args: FilmDetailsArgs) -> Result<Outcome> {
    let title = require_text("title", &args.title)?;
    let mut session = db.acquire().await?;

    let film = resolve_film(
        &mut session,
        "SELECT f.film_id, f.title, f.description, f.release_year, f.rating, f.length, \
         f.rental_rate, f.rental_duration, f.replacement_cost, f.special_features, \
         l.name AS language \
         FROM film f JOIN language l ON f.language_id = l.language_id",
        &title,
    )
    .await?;
    let exact = exact_title(&film)?;

    let actors = session
        .fetch(&Statement::new(
            "SELECT CONCAT(a.first_name, ' ', a.last_name) AS name \
             FROM actor a \
             JOIN film_actor fa ON a.actor_id = fa.actor_id \
             JOIN film f ON fa.film_id = f.film_id \
             WHERE f.title = ? ORDER BY a.last_name, a.first_name",
            vec![exact.clone().into()],
        )?)
        .await?;

    let categories = session
        .fetch(&Statement::new(
            "SELECT c.name FROM category c \
             JOIN film_category fc ON c.category_id = fc.category_id \
             JOIN film f ON fc.film_id = f.film_id \
             WHERE f.title = ? ORDER BY c.name",
            vec![exact.clone().into()],
        )?)
        .await?;

    let inventory = session
        .fetch(&Statement::new(
            "SELECT i.store_id, COUNT(i.inventory_id) AS copies \
             FROM inventory i JOIN film f ON i.film_id = f.film_id \
             WHERE f.title = ? GROUP BY i.store_id ORDER BY i.store_id",
            vec![exact.into()],
        )?)
        .await?;

    let mut details = shape_row(film, &["rental_rate", "replacement_cost"], &[]);
    details.insert("actors".to_string(), column(actors, "name"));
    details.insert("categories".to_string(), column(categories, "name"));
    details.insert(
        "inventory".to_string(),
        Value::Array(shape_rows(inventory, &[], &["copies"]).into_iter().map(Value::Object).collect()),
    );
    Ok(Outcome::Data(Value::Object(details)))
}

/// Every category with its film count
pub async fn list_categories<D: Database>(db: &D, _args: ListCategoriesArgs) -> Result<Outcome> {
    let statement = Statement::new(
        "SELECT c.name AS category, COUNT(fc.film_id) AS film_count \
         FROM category c \
         LEFT JOIN film_category fc ON c.category_id = fc.category_id \
         GROUP BY c.category_id, c.name ORDER BY c.name LIMIT ?",
        vec![LimitPolicy::REPORT.max.into()],
    )?;
    let rows = fetch_scoped(db, &statement).await?;
    Ok(Outcome::records(shape_rows(rows, &[], &["film_count"]), "no categories found"))
}

/// Copies in stock per store for one film
pub async fn check_film_availability<D: Database>(db: &D, args: FilmAvailabilityArgs) -> Result<Outcome> {
    let title = require_text("title", &args.title)?;
    let store_id = validate_store_id(args.store_id)?;
    let mut session = db.acquire().await?;

    let film = resolve_film(
        &mut session,
        "SELECT f.film_id, f.title, f.rental_rate, f.rental_duration FROM film f",
        &title,
    )
    .await?;
    let exact = exact_title(&film)?;

    let mut qb = QueryBuilder::new(
        "SELECT i.store_id, COUNT(DISTINCT i.inventory_id) AS total_copies, \
         COUNT(DISTINCT r.inventory_id) AS rented_out \
         FROM film f \
         JOIN inventory i ON f.film_id = i.film_id \
         LEFT JOIN rental r ON i.inventory_id = r.inventory_id AND r.return_date IS NULL",
    );
    qb.filter("WHERE f.title = ?", exact);
    qb.filter_opt("AND i.store_id = ?", store_id);
    qb.push("GROUP BY i.store_id ORDER BY i.store_id");
    let rows = session.fetch(&qb.build()?).await?;

    let stores: Vec<Record> = shape_rows(rows, &[], &["total_copies", "rented_out"])
        .into_iter()
        .map(|mut store| {
            let available = (to_i64(store.get("total_copies")) - to_i64(store.get("rented_out"))).max(0);
            store.insert("available".to_string(), Value::from(available));
            store
        })
        .collect();
    let in_stock = stores.iter().any(|s| to_i64(s.get("available")) > 0);

    let mut result = shape_row(film, FILM_DECIMALS, &[]);
    result.insert("in_stock".to_string(), Value::Bool(in_stock));
    result.insert("stores".to_string(), Value::Array(stores.into_iter().map(Value::Object).collect()));
    Ok(Outcome::Data(Value::Object(result)))
}

/// One actor and the films they appear in
pub async fn get_actor_filmography<D: Database>(db: &D, args: ActorFilmographyArgs) -> Result<Outcome> {
    let actor_name = require_text("actor_name", &args.actor_name)?;
    let limit = validate_limit(args.limit, LimitPolicy::LISTING);
    let mut session = db.acquire().await?;

    let actor = session
        .fetch(&Statement::new(
            "SELECT a.actor_id, CONCAT(a.first_name, ' ', a.last_name) AS name \
             FROM actor a \
             WHERE CONCAT(a.first_name, ' ', a.last_name) LIKE ? \
             ORDER BY a.last_name, a.first_name LIMIT 1",
            vec![contains_pattern(&actor_name)],
        )?)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| GateError::not_found(format!("no actor found matching '{actor_name}'")))?;
    let actor_id = to_i64(actor.get("actor_id"));

    let count = session
        .fetch(&Statement::new(
            "SELECT COUNT(*) AS film_count FROM film_actor WHERE actor_id = ?",
            vec![actor_id.into()],
        )?)
        .await?;

    let mut qb = QueryBuilder::new(
        "SELECT f.title, f.release_year, f.rating, c.name AS category, f.rental_rate \
         FROM film f \
         JOIN film_actor fa ON f.film_id = fa.film_id \
         LEFT JOIN film_category fc ON f.film_id = fc.film_id \
         LEFT JOIN category c ON fc.category_id = c.category_id",
    );
    qb.filter("WHERE fa.actor_id = ?", actor_id);
    qb.push("ORDER BY f.title");
    qb.limit(limit);
    let films = session.fetch(&qb.build()?).await?;

    Ok(Outcome::Data(json!({
        "actor_id": actor_id,
        "name": actor.get("name").cloned().unwrap_or(Value::Null),
        "film_count": to_i64(count.first().and_then(|row| row.get("film_count"))),
        "films": shape_rows(films, FILM_DECIMALS, &[]),
    })))
}

/// Resolve a fuzzy title to the first matching film row
async fn resolve_film<S: Session>(session: &mut S, select: &str, title: &str) -> Result<Record> {
    let mut qb = QueryBuilder::new(select);
    qb.filter("WHERE f.title LIKE ?", contains_pattern(title));
    qb.push("ORDER BY f.title LIMIT 1");

    session
        .fetch(&qb.build()?)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| GateError::not_found(format!("no film found matching '{title}'")))
}

fn exact_title(film: &Record) -> Result<String> {
    film.get("title")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GateError::internal("film lookup returned no title"))
}

fn column(rows: Vec<Record>, field: &str) -> Value {
    Value::Array(rows.into_iter().filter_map(|mut row| row.remove(field)).collect())
}
