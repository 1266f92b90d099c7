//! Request Admission Benchmarks
//!
//! Everything that runs before a statement reaches the server:
//! - Raw SQL classification (accept and reject paths)
//! - Single-statement scanning
//! - Parameterized statement assembly

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sakila_mcp::gatekeeper::{check_statement, ensure_single_statement};
use sakila_mcp::query::contains_pattern;
use sakila_mcp::QueryBuilder;

const REPORT_SQL: &str = "SELECT c.name AS category, COUNT(r.rental_id) AS rentals, SUM(p.amount) AS revenue \
     FROM payment p \
     JOIN rental r ON p.rental_id = r.rental_id \
     JOIN inventory i ON r.inventory_id = i.inventory_id \
     JOIN film_category fc ON i.film_id = fc.film_id \
     JOIN category c ON fc.category_id = c.category_id \
     WHERE p.payment_date >= '2005-06-01' AND c.name LIKE '%;%' \
     GROUP BY c.name ORDER BY revenue DESC";

fn bench_check_statement(c: &mut Criterion) {
    c.bench_function("gatekeeper_accept_report", |b| {
        b.iter(|| check_statement(black_box(REPORT_SQL)).is_ok());
    });

    c.bench_function("gatekeeper_reject_stacked_delete", |b| {
        b.iter(|| check_statement(black_box("SELECT * FROM film; DELETE FROM film")).is_err());
    });

    c.bench_function("gatekeeper_reject_command", |b| {
        b.iter(|| check_statement(black_box("UPDATE film SET rental_rate = 0")).is_err());
    });
}

fn bench_single_statement(c: &mut Criterion) {
    c.bench_function("single_statement_scan", |b| {
        b.iter(|| ensure_single_statement(black_box(REPORT_SQL)).is_ok());
    });
}

fn bench_builder(c: &mut Criterion) {
    c.bench_function("builder_search_films", |b| {
        b.iter(|| {
            let mut qb = QueryBuilder::new(
                "SELECT DISTINCT f.film_id, f.title, c.name AS category FROM film f \
                 LEFT JOIN film_category fc ON f.film_id = fc.film_id \
                 LEFT JOIN category c ON fc.category_id = c.category_id",
            );
            qb.push("WHERE 1=1");
            qb.filter("AND f.title LIKE ?", contains_pattern(black_box("love")));
            qb.filter("AND c.name LIKE ?", contains_pattern(black_box("Family")));
            qb.filter("AND f.rating = ?", "PG");
            qb.push("ORDER BY f.title");
            qb.limit(10);
            qb.build()
        });
    });
}

criterion_group!(benches, bench_check_statement, bench_single_statement, bench_builder);
criterion_main!(benches);
