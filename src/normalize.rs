//! Result Normalization
//!
//! Database rows arrive with whatever representation the driver chose:
//! decimals as numbers or strings, aggregates as null when nothing matched,
//! counts as integers or decimal strings (MySQL `SUM` over integers yields
//! DECIMAL). Everything here turns those rows into a stable JSON shape and
//! computes derived fields.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::engine::Row;

/// Output record: field name to JSON primitive
pub type Record = Map<String, Value>;

/// Read any numeric-looking value as `f64`; absent, null and garbage are `0.0`.
#[must_use]
pub fn to_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

/// Read any numeric-looking value as `i64`; absent, null and garbage are `0`.
#[must_use]
pub fn to_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64)).unwrap_or(0)
        }
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

/// Round half away from zero to `places` decimals
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `count / total * 100` rounded to one decimal; `0.0` when total is zero.
#[must_use]
pub fn percentage(count: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        round_to(count / total * 100.0, 1)
    }
}

/// Rentals per copy rounded to two decimals; `0.0` without inventory.
#[must_use]
pub fn turnover_rate(rental_count: i64, inventory_count: i64) -> f64 {
    if inventory_count == 0 {
        0.0
    } else {
        round_to(rental_count as f64 / inventory_count as f64, 2)
    }
}

fn float_value(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::from(0.0), Value::Number)
}

/// Shape raw rows into records.
///
/// Every field in `decimals` becomes a float (absent/null aggregates become
/// `0.0`); every field in `counts` becomes an integer.
#[must_use]
pub fn shape_rows(rows: Vec<Row>, decimals: &[&str], counts: &[&str]) -> Vec<Record> {
    rows.into_iter().map(|row| shape_row(row, decimals, counts)).collect()
}

/// Single-row form of [`shape_rows`]
#[must_use]
pub fn shape_row(mut row: Row, decimals: &[&str], counts: &[&str]) -> Record {
    for field in decimals {
        let value = round_to(to_f64(row.get(*field)), 2);
        row.insert((*field).to_string(), float_value(value));
    }
    for field in counts {
        let value = to_i64(row.get(*field));
        row.insert((*field).to_string(), Value::from(value));
    }
    row
}

/// Turn a 0/1 column into a JSON boolean
pub fn set_flag(record: &mut Record, field: &str) {
    if let Some(value) = record.get(field) {
        let flag = match value {
            Value::Bool(b) => *b,
            other => to_i64(Some(other)) != 0,
        };
        record.insert(field.to_string(), Value::Bool(flag));
    }
}

/// Keep records whose integer `field` is at least `threshold`
#[must_use]
pub fn at_least(records: Vec<Record>, field: &str, threshold: i64) -> Vec<Record> {
    records.into_iter().filter(|r| to_i64(r.get(field)) >= threshold).collect()
}

/// Prefix each record with its 1-based position as `rank`
#[must_use]
pub fn with_rank(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            let mut ranked = Record::new();
            ranked.insert("rank".to_string(), Value::from(idx + 1));
            ranked.extend(record);
            ranked
        })
        .collect()
}

/// Add `field` as the share of `source` in the column total
pub fn add_share(records: &mut [Record], source: &str, field: &str) {
    let total: f64 = records.iter().map(|r| to_f64(r.get(source))).sum();
    for record in records.iter_mut() {
        let share = percentage(to_f64(record.get(source)), total);
        record.insert(field.to_string(), float_value(share));
    }
}

/// Customer segment, evaluated in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Segment {
    /// 20+ rentals and 100+ spent
    #[serde(rename = "VIP")]
    Vip,
    /// 10+ rentals or 50+ spent
    Regular,
    /// At least one rental
    Occasional,
    /// No rentals
    Inactive,
}

impl Segment {
    /// All segments in priority order
    pub const ALL: [Self; 4] = [Self::Vip, Self::Regular, Self::Occasional, Self::Inactive];

    /// Display name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vip => "VIP",
            Self::Regular => "Regular",
            Self::Occasional => "Occasional",
            Self::Inactive => "Inactive",
        }
    }

    /// Human-readable membership rule
    #[must_use]
    pub const fn criteria(self) -> &'static str {
        match self {
            Self::Vip => "rentals >= 20 and spending >= 100",
            Self::Regular => "rentals >= 10 or spending >= 50",
            Self::Occasional => "rentals >= 1",
            Self::Inactive => "no rentals",
        }
    }

    /// Classify one customer. Total: every input maps to exactly one segment.
    #[must_use]
    pub fn classify(rental_count: i64, total_spent: f64) -> Self {
        if rental_count >= 20 && total_spent >= 100.0 {
            Self::Vip
        } else if rental_count >= 10 || total_spent >= 50.0 {
            Self::Regular
        } else if rental_count >= 1 {
            Self::Occasional
        } else {
            Self::Inactive
        }
    }
}

/// Per-segment statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStats {
    pub segment: Segment,
    pub criteria: &'static str,
    pub customer_count: u64,
    pub percentage: f64,
    pub avg_rentals: f64,
    pub avg_spending: f64,
}

/// Segmentation summary over a customer population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    pub total_customers: u64,
    pub segments: Vec<SegmentStats>,
}

/// Classify `(rental_count, total_spent)` pairs into the four segments.
///
/// Segment counts always sum to `total_customers`.
#[must_use]
pub fn summarize_segments(customers: &[(i64, f64)]) -> SegmentReport {
    let total = customers.len() as u64;

    let segments = Segment::ALL
        .iter()
        .map(|&segment| {
            let members: Vec<&(i64, f64)> =
                customers.iter().filter(|(rentals, spent)| Segment::classify(*rentals, *spent) == segment).collect();
            let count = members.len() as u64;
            let (rentals, spent) =
                members.iter().fold((0.0, 0.0), |(r, s), (rentals, spent)| (r + *rentals as f64, s + spent));
            let avg = |sum: f64| if count == 0 { 0.0 } else { round_to(sum / count as f64, 2) };

            SegmentStats {
                segment,
                criteria: segment.criteria(),
                customer_count: count,
                percentage: percentage(count as f64, total as f64),
                avg_rentals: avg(rentals),
                avg_spending: avg(spent),
            }
        })
        .collect();

    SegmentReport { total_customers: total, segments }
}

/// One activity measure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityMeasure {
    pub count: i64,
    pub percentage: f64,
}

/// Customer activity over a period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityReport {
    pub period: &'static str,
    pub total_customers: i64,
    /// Rented within the period
    pub active: ActivityMeasure,
    /// Registered within the period
    pub new: ActivityMeasure,
    /// Active account with no rental within the period
    pub dormant: ActivityMeasure,
}

/// Build the activity report from one aggregate row.
///
/// Reads `total_customers`, `active_customers`, `new_customers` and
/// `dormant_customers`; each measure is a percentage of the shared total.
#[must_use]
pub fn summarize_activity(period: &'static str, row: &Row) -> ActivityReport {
    let total = to_i64(row.get("total_customers"));
    let measure = |field: &str| {
        let count = to_i64(row.get(field));
        ActivityMeasure { count, percentage: percentage(count as f64, total as f64) }
    };

    ActivityReport {
        period,
        total_customers: total,
        active: measure("active_customers"),
        new: measure("new_customers"),
        dormant: measure("dormant_customers"),
    }
}
