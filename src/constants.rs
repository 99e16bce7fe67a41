/// Column and file name constants to keep readers and writers consistent.
/// Header names match the published survey exports verbatim.

// Visitor counts (JNTO monthly arrivals)
pub const VISITOR_YEAR: &str = "Year";
pub const VISITOR_MONTH: &str = "Month_Numeric";
pub const VISITOR_COUNTRY: &str = "Country/Area";
pub const VISITOR_COUNT: &str = "Visitor_Numeric";

// Spend survey (consumption trend survey)
pub const SPEND_YEAR: &str = "year";
pub const SPEND_COUNTRY: &str = "country";
pub const SPEND_QUARTER: &str = "Quarter";
pub const SPEND_EXPENSE_ITEM: &str = "expense_items";
pub const SPEND_DETAIL: &str = "details";
pub const SPEND_CONSUMPTION_UNIT: &str = "consumption_unit";
pub const SPEND_COMPOSITION_RATIO: &str = "composition_ratio";

// Destination visit rate
pub const DESTINATION_YEAR: &str = "Year";
pub const DESTINATION_PREFECTURE: &str = "Prefecture";
pub const DESTINATION_VISIT_RATE: &str = "Visit Rate(%)";
/// Pre-pandemic reference year for destination growth comparisons
pub const PRE_PANDEMIC_YEAR: i32 = 2019;

// Behavior (PCA) scores
pub const BEHAVIOR_YEAR: &str = "Year";
pub const BEHAVIOR_COUNTRY: &str = "Country/Area";
/// Score columns are the headers carrying this prefix (PC1, PC2, ...)
pub const BEHAVIOR_COMPONENT_PREFIX: &str = "PC";

/// Column suffixes used by the ratio/unit table
pub const RATIO_SUFFIX: &str = "_ratio";
pub const UNIT_SUFFIX: &str = "_unit";
pub const OFFICIAL_TOTAL_COLUMN: &str = "avg_total_spend_official";

// Default spend classification rules
pub const DEFAULT_TOTAL_MARKER_PATTERN: &str = "全体|TOTAL|ALL";
pub const DEFAULT_ALL_DETAIL_SENTINEL: &str = "all";
pub const DEFAULT_MAJOR_LABEL: &str = "全体";

// Default input locations
pub const DEFAULT_VISITORS_FILE: &str = "data/inbound_visiter.csv";
pub const DEFAULT_SPENDING_FILE: &str = "data/inbound_spending.csv";
pub const DEFAULT_DESTINATION_FILE: &str = "data/inbound_destination.csv";
pub const DEFAULT_BEHAVIOR_FILE: &str = "data/pca_scores_timeseries.csv";

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const CONFIG_ENV_VAR: &str = "INBOUND_CONFIG";

/// Table names accepted by the `export` command
pub const TABLE_NAMES: [&str; 9] = [
    "visitor_pivot",
    "ratio_unit",
    "destination_pivot",
    "behavior_scores",
    "annual_visitors",
    "yearly_avg_spend",
    "market_potential_quarterly",
    "market_potential_yearly",
    "spend_items",
];
