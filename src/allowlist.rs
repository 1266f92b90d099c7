//! Closed Domains
//!
//! Every allow-list the gateway consults lives here as immutable static data.
//! Nothing in this module is mutated after compilation.

/// Leading commands accepted in raw-query mode
pub const ALLOWED_COMMANDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN"];

/// Keywords that reject a raw statement wherever they appear as a whole word.
///
/// Order matters: the first keyword in this list that is present is reported.
pub const DANGEROUS_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "TRUNCATE", "ALTER", "CREATE", "GRANT", "REVOKE",
];

/// Base tables of the Sakila schema, sorted
pub const KNOWN_TABLES: &[&str] = &[
    "actor",
    "address",
    "category",
    "city",
    "country",
    "customer",
    "film",
    "film_actor",
    "film_category",
    "film_text",
    "inventory",
    "language",
    "payment",
    "rental",
    "staff",
    "store",
];

/// Store identifiers present in the dataset
pub const VALID_STORES: &[i64] = &[1, 2];

/// A parameter whose value must come from a small fixed set.
///
/// Matching is case-insensitive; the canonical spelling is what flows into
/// queries and output.
pub trait ClosedSet: Sized + Copy + 'static {
    /// Label used in error messages ("rating", "period", ...)
    const LABEL: &'static str;

    /// Every member, in display order
    const ALL: &'static [Self];

    /// Canonical spelling
    fn as_str(self) -> &'static str;

    /// Case-insensitive lookup
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.iter().copied().find(|v| v.as_str().eq_ignore_ascii_case(raw))
    }

    /// Comma-separated list of canonical spellings
    fn valid_values() -> String {
        Self::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
    }
}

macro_rules! closed_set {
    ($(#[$meta:meta])* $name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[doc = $text]
                $variant,
            )+
        }

        impl ClosedSet for $name {
            const LABEL: &'static str = $label;
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_set!(
    /// MPAA film rating
    Rating, "rating", {
        G => "G",
        Pg => "PG",
        Pg13 => "PG-13",
        R => "R",
        Nc17 => "NC-17",
    }
);

closed_set!(
    /// Rental lifecycle filter
    RentalStatus, "status", {
        All => "all",
        Active => "active",
        Returned => "returned",
    }
);

closed_set!(
    /// Revenue grouping key
    GroupBy, "group_by", {
        Store => "store",
        Category => "category",
        Month => "month",
        Staff => "staff",
    }
);

closed_set!(
    /// Reporting window relative to now
    Period, "period", {
        AllTime => "all_time",
        LastMonth => "last_month",
        LastWeek => "last_week",
    }
);

closed_set!(
    /// Customer ranking metric
    Metric, "metric", {
        Rentals => "rentals",
        Spending => "spending",
    }
);

impl Period {
    /// SQL expression for the window start, `None` for an unbounded window.
    ///
    /// The result is a fixed fragment chosen from this closed set, never
    /// caller text.
    #[must_use]
    pub const fn cutoff_sql(self) -> Option<&'static str> {
        match self {
            Self::AllTime => None,
            Self::LastMonth => Some("DATE_SUB(NOW(), INTERVAL 1 MONTH)"),
            Self::LastWeek => Some("DATE_SUB(NOW(), INTERVAL 7 DAY)"),
        }
    }
}

/// A table name that passed every allow-list check.
///
/// Only [`crate::validate::validate_table_name`] constructs this type, so any
/// code holding one can interpolate it: the check always happened first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownTable(&'static str);

impl KnownTable {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Canonical table name
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }

    /// Backtick-delimited identifier for interpolation into SQL
    #[must_use]
    pub fn quoted(self) -> String {
        format!("`{}`", self.0.replace('`', "``"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_parse_is_case_insensitive() {
        assert_eq!(Rating::parse("pg-13"), Some(Rating::Pg13));
        assert_eq!(Rating::parse("nc-17"), Some(Rating::Nc17));
        assert_eq!(Rating::parse("G"), Some(Rating::G));
        assert_eq!(Rating::parse("X"), None);
    }

    #[test]
    fn test_valid_values_listing() {
        assert_eq!(Rating::valid_values(), "G, PG, PG-13, R, NC-17");
        assert_eq!(RentalStatus::valid_values(), "all, active, returned");
        assert_eq!(GroupBy::valid_values(), "store, category, month, staff");
        assert_eq!(Period::valid_values(), "all_time, last_month, last_week");
        assert_eq!(Metric::valid_values(), "rentals, spending");
    }

    #[test]
    fn test_known_tables_sorted_and_unique() {
        let mut sorted = KNOWN_TABLES.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, KNOWN_TABLES);
    }

    #[test]
    fn test_period_cutoff() {
        assert!(Period::AllTime.cutoff_sql().is_none());
        assert!(Period::LastWeek.cutoff_sql().unwrap().contains("7 DAY"));
    }

    #[test]
    fn test_known_table_quoting() {
        assert_eq!(KnownTable::new("film").quoted(), "`film`");
    }
}
