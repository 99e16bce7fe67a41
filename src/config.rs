use crate::constants;
use crate::error::{PipelineError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataPaths,
    pub spend: SpendRules,
    pub presentation: PresentationConfig,
    pub logging: LoggingConfig,
}

/// Locations of the raw input files. Visitors and spending are mandatory;
/// the other two may be absent on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub visitors: PathBuf,
    pub spending: PathBuf,
    pub destination: PathBuf,
    pub behavior_scores: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            visitors: PathBuf::from(constants::DEFAULT_VISITORS_FILE),
            spending: PathBuf::from(constants::DEFAULT_SPENDING_FILE),
            destination: PathBuf::from(constants::DEFAULT_DESTINATION_FILE),
            behavior_scores: PathBuf::from(constants::DEFAULT_BEHAVIOR_FILE),
        }
    }
}

impl DataPaths {
    /// Resolve the default file names against a data directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let file_name = |p: &str| {
            Path::new(p)
                .file_name()
                .map(|name| dir.join(name))
                .unwrap_or_else(|| dir.join(p))
        };
        Self {
            visitors: file_name(constants::DEFAULT_VISITORS_FILE),
            spending: file_name(constants::DEFAULT_SPENDING_FILE),
            destination: file_name(constants::DEFAULT_DESTINATION_FILE),
            behavior_scores: file_name(constants::DEFAULT_BEHAVIOR_FILE),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [
            self.visitors.as_path(),
            self.spending.as_path(),
            self.destination.as_path(),
            self.behavior_scores.as_path(),
        ]
    }
}

/// How spend-survey rows are classified into items, totals and major categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpendRules {
    /// Matched case-insensitively against `expense_items`
    pub total_marker_pattern: String,
    /// `details` value marking a major-category aggregate row
    pub all_detail_sentinel: String,
    /// Label substituted for the sentinel inside item names
    pub major_label: String,
}

impl Default for SpendRules {
    fn default() -> Self {
        Self {
            total_marker_pattern: constants::DEFAULT_TOTAL_MARKER_PATTERN.to_string(),
            all_detail_sentinel: constants::DEFAULT_ALL_DETAIL_SENTINEL.to_string(),
            major_label: constants::DEFAULT_MAJOR_LABEL.to_string(),
        }
    }
}

impl SpendRules {
    pub fn total_marker(&self) -> Result<Regex> {
        Ok(RegexBuilder::new(&self.total_marker_pattern)
            .case_insensitive(true)
            .build()?)
    }
}

/// Display constants handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub item_order: Vec<String>,
    pub colors: BTreeMap<String, String>,
    pub pc_labels: BTreeMap<String, String>,
    pub all_countries_label: String,
    pub other_label: String,
    pub priority_countries: Vec<String>,
    pub source_caption: String,
    /// Used when no market-potential year is available
    pub default_year: i32,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        let owned = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        Self {
            item_order: ["買物代", "宿泊費", "飲食費", "娯楽等サービス費", "交通費", "その他"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            colors: owned(&[
                ("宿泊費", "#1f77b4"),
                ("飲食費", "#ff7f0e"),
                ("買物代", "#2ca02c"),
                ("交通費", "#d62728"),
                ("娯楽等サービス費", "#9467bd"),
                ("その他", "#8c564b"),
            ]),
            pc_labels: owned(&[
                ("PC1", "PC1: 日本文化への関心と体験意欲"),
                ("PC2", "PC2: アクティブ志向 vs 和の寛ぎ・食志向"),
                ("PC3", "PC3: 自然・地方志向 vs 都市型娯楽志向"),
            ]),
            all_countries_label: "全国籍･地域".to_string(),
            other_label: "その他".to_string(),
            priority_countries: [
                "全国籍･地域",
                "韓国",
                "中国",
                "香港",
                "台湾",
                "シンガポール",
                "米国",
                "オーストラリア",
                "フランス",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            source_caption: "出典: 観光庁「訪日外国人消費動向調査」より作成".to_string(),
            default_year: 2024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_prefix: "inbound_pipeline.log".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the built-in defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        // Fail fast on a bad pattern rather than at first load
        config.spend.total_marker()?;
        Ok(config)
    }

    /// Resolve the config path from `INBOUND_CONFIG`, falling back to `config.toml`.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(constants::CONFIG_ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| constants::DEFAULT_CONFIG_FILE.to_string());
        Self::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [data]
            visitors = "fixtures/v.csv"

            [spend]
            all_detail_sentinel = "ALL_ROWS"
            "#,
        )
        .unwrap();

        assert_eq!(config.data.visitors, PathBuf::from("fixtures/v.csv"));
        assert_eq!(
            config.data.spending,
            PathBuf::from(constants::DEFAULT_SPENDING_FILE)
        );
        assert_eq!(config.spend.all_detail_sentinel, "ALL_ROWS");
        assert_eq!(config.spend.major_label, "全体");
        assert_eq!(config.presentation.item_order.len(), 6);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let config = Config::from_toml(include_str!("../config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn total_marker_is_case_insensitive() {
        let marker = SpendRules::default().total_marker().unwrap();
        assert!(marker.is_match("Total"));
        assert!(marker.is_match("overall_all"));
        assert!(marker.is_match("全体"));
        assert!(!marker.is_match("宿泊費"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let result = Config::from_toml(
            r#"
            [spend]
            total_marker_pattern = "(unclosed"
            "#,
        );
        assert!(matches!(result, Err(PipelineError::Pattern(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn data_paths_resolve_inside_directory() {
        let paths = DataPaths::in_dir("/srv/inbound");
        assert_eq!(
            paths.visitors,
            PathBuf::from("/srv/inbound/inbound_visiter.csv")
        );
        assert_eq!(
            paths.behavior_scores,
            PathBuf::from("/srv/inbound/pca_scores_timeseries.csv")
        );
    }
}
