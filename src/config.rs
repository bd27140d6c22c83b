//! Chart configuration: which metrics a chart offers, how each is scaled and formatted, and
//! the behaviour knobs of the chart itself. Configs are plain serde types, so they can be
//! loaded from JSON or taken from the built-in presets that mirror the dashboard pages.

use crate::api::{DEFAULT_VALUES_PATH, Since};
use crate::error::ConfigError;
use crate::models::EntityId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reserved metric id that switches a chart into the grid of all its metrics.
pub const ALL_METRICS_ID: &str = "__all__";

pub const DEFAULT_ENTITIES: [EntityId; 5] = [11, 13, 25, 29, 31];
pub const DEFAULT_YEAR_FROM: i32 = 2000;
pub const DEFAULT_PREFERRED_START_YEAR: i32 = 2014;

fn default_true() -> bool {
    true
}

fn default_entities() -> Vec<EntityId> {
    DEFAULT_ENTITIES.to_vec()
}

fn default_endpoint() -> String {
    DEFAULT_VALUES_PATH.to_string()
}

fn default_year_from() -> i32 {
    DEFAULT_YEAR_FROM
}

fn default_preferred_start() -> i32 {
    DEFAULT_PREFERRED_START_YEAR
}

/// Display rules for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub label: String,
    /// Raw values are divided by this before display. Must be nonzero when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_divisor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_axis_digits: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_tooltip_digits: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_axis_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_tooltip_suffix: Option<String>,
    /// Shared fallback for both suffixes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_suffix: Option<String>,
    /// Zero observations are gaps for these ratios unless disabled.
    #[serde(default = "default_true")]
    pub treat_zero_as_missing: bool,
}

impl MetricConfig {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            label: title.clone(),
            title,
            value_divisor: None,
            value_axis_digits: None,
            value_tooltip_digits: None,
            value_axis_suffix: None,
            value_tooltip_suffix: None,
            value_suffix: None,
            treat_zero_as_missing: true,
        }
    }

    /// The synthetic entry that selects grid mode.
    pub fn show_all(label: impl Into<String>) -> Self {
        let label = label.into();
        Self::new(ALL_METRICS_ID, label)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_digits(mut self, axis: usize, tooltip: usize) -> Self {
        self.value_axis_digits = Some(axis);
        self.value_tooltip_digits = Some(tooltip);
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.value_suffix = Some(suffix.into());
        self
    }

    /// Millions of USD: divide by 1e6, no axis decimals, two in tooltips.
    pub fn millions_usd(mut self) -> Self {
        self.value_divisor = Some(1_000_000.0);
        self.with_suffix(" M USD").with_digits(0, 2)
    }

    /// Text for metric pickers; configs loaded from JSON may leave `label` empty.
    pub fn picker_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.title
        } else {
            &self.label
        }
    }

    pub fn is_show_all(&self) -> bool {
        self.id == ALL_METRICS_ID
    }
}

/// How a committed drag maps to the view window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliderCommit {
    /// Commit `[min, max]` of both handle positions.
    #[default]
    Window,
    /// Releasing one handle also snaps the other to its domain edge.
    ExtendToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Time-series lines, optionally with area fill.
    #[default]
    Line,
    /// One bar per entity with its latest value in the window.
    LatestBar,
}

/// One chart instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub metrics: Vec<MetricConfig>,
    pub default_metric: String,
    #[serde(default = "default_entities")]
    pub default_entities: Vec<EntityId>,
    #[serde(default)]
    pub with_area: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint_path: String,
    #[serde(default = "default_year_from")]
    pub year_from: i32,
    /// Used instead of `year_from` by endpoints that filter on dates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<chrono::NaiveDate>,
    #[serde(default = "default_preferred_start")]
    pub preferred_start_year: i32,
    #[serde(default)]
    pub slider_commit: SliderCommit,
    #[serde(default)]
    pub kind: ChartKind,
}

impl ChartConfig {
    pub fn new(metrics: Vec<MetricConfig>, default_metric: impl Into<String>) -> Self {
        Self {
            metrics,
            default_metric: default_metric.into(),
            default_entities: default_entities(),
            with_area: false,
            endpoint_path: default_endpoint(),
            year_from: DEFAULT_YEAR_FROM,
            start_date: None,
            preferred_start_year: DEFAULT_PREFERRED_START_YEAR,
            slider_commit: SliderCommit::default(),
            kind: ChartKind::default(),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: ChartConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.iter().all(MetricConfig::is_show_all) {
            return Err(ConfigError::Invalid("no metrics configured".into()));
        }
        for m in &self.metrics {
            if m.id.trim().is_empty() {
                return Err(ConfigError::Invalid("metric with empty id".into()));
            }
            if let Some(d) = m.value_divisor
                && (d == 0.0 || !d.is_finite())
            {
                return Err(ConfigError::Invalid(format!(
                    "metric '{}' has value_divisor {d}; it must be finite and nonzero",
                    m.id
                )));
            }
        }
        if self.metric(&self.default_metric).is_none() {
            return Err(ConfigError::Invalid(format!(
                "default metric '{}' is not among the configured metrics",
                self.default_metric
            )));
        }
        Ok(())
    }

    pub fn metric(&self, id: &str) -> Option<&MetricConfig> {
        self.metrics.iter().find(|m| m.id == id)
    }

    /// Metrics shown as subcharts in grid mode, in configured order.
    pub fn grid_metrics(&self) -> impl Iterator<Item = &MetricConfig> {
        self.metrics.iter().filter(|m| !m.is_show_all())
    }

    pub fn grid_metric_ids(&self) -> Vec<String> {
        self.grid_metrics().map(|m| m.id.clone()).collect()
    }

    pub fn has_show_all(&self) -> bool {
        self.metrics.iter().any(MetricConfig::is_show_all)
    }

    pub fn since(&self) -> Since {
        match self.start_date {
            Some(d) => Since::StartDate(d),
            None => Since::YearFrom(self.year_from),
        }
    }

    pub fn with_area(mut self, on: bool) -> Self {
        self.with_area = on;
        self
    }

    pub fn with_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }
}

/// Names of the built-in presets, in listing order.
pub const PRESET_NAMES: [&str; 7] = [
    "moodys-ratios",
    "moodys-ratings",
    "costs-yield",
    "operating",
    "balance-ratios",
    "balance",
    "wabr-wasr",
];

fn with_show_all(metrics: Vec<MetricConfig>) -> Vec<MetricConfig> {
    let mut out = vec![MetricConfig::show_all("Show all")];
    out.extend(metrics);
    out
}

/// Built-in chart configuration by name.
pub fn preset(name: &str) -> Result<ChartConfig, ConfigError> {
    let cfg = match name {
        "moodys-ratios" => ChartConfig::new(
            with_show_all(vec![
                MetricConfig::new("moodys_01", "Leverage Ratio"),
                MetricConfig::new("moodys_02", "Usable Equity / Gross Loans"),
                MetricConfig::new("moodys_03", "Return on Average Assets"),
                MetricConfig::new("moodys_04", "Return on Average Equity"),
                MetricConfig::new("moodys_05", "Net Interest Margin"),
            ]),
            "moodys_01",
        ),
        "moodys-ratings" => ChartConfig::new(
            with_show_all(vec![
                MetricConfig::new("moodys_06", "Weighted Average Borrower Rating")
                    .with_label("WABR"),
                MetricConfig::new("moodys_07", "Weighted Average Shareholder Rating")
                    .with_label("WASR"),
            ]),
            "moodys_06",
        ),
        "costs-yield" => ChartConfig::new(
            with_show_all(vec![
                MetricConfig::new("sp_01", "Yield on customer loans"),
                MetricConfig::new("sp_02", "Cost of funds"),
                MetricConfig::new("sp_03", "Spread"),
            ]),
            "sp_01",
        ),
        "operating" => ChartConfig::new(
            with_show_all(vec![
                MetricConfig::new("sp_04", "Operating expenses / Loans"),
                MetricConfig::new("sp_05", "Personnel expenses / Equity"),
                MetricConfig::new("sp_06", "Operating expenses / Equity"),
                MetricConfig::new("sp_07", "Personnel expenses / Loans"),
            ]),
            "sp_04",
        ),
        "balance-ratios" => ChartConfig::new(
            with_show_all(vec![
                MetricConfig::new("sp_12", "Return on average adjusted equity (ROAEE)"),
                MetricConfig::new("sp_13", "Return on average assets (ROAA)"),
                MetricConfig::new("sp_14", "Net interest margin"),
            ]),
            "sp_12",
        ),
        "balance" => ChartConfig::new(
            with_show_all(vec![
                MetricConfig::new("sp_08", "Total assets").millions_usd(),
                MetricConfig::new("sp_10", "Net loans").millions_usd(),
                MetricConfig::new("sp_09", "Equity").millions_usd(),
                MetricConfig::new("sp_11", "Liabilities").millions_usd(),
            ]),
            "sp_08",
        )
        .with_area(true),
        "wabr-wasr" => ChartConfig::new(
            with_show_all(vec![
                MetricConfig::new("WABR", "Weighted Average Borrower Rating").with_digits(0, 0),
                MetricConfig::new("WASR", "Weighted Average Shareholder Rating")
                    .with_digits(0, 0),
            ]),
            "WABR",
        )
        .with_endpoint("/wabr-wasr/"),
        other => return Err(ConfigError::UnknownPreset(other.to_string())),
    };
    Ok(cfg)
}

/// All presets with their names.
pub fn presets() -> Vec<(&'static str, ChartConfig)> {
    PRESET_NAMES
        .iter()
        .filter_map(|n| preset(n).ok().map(|c| (*n, c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_is_valid() {
        for (name, cfg) in presets() {
            cfg.validate()
                .unwrap_or_else(|e| panic!("preset {name} invalid: {e}"));
            assert!(cfg.has_show_all(), "{name} lacks the show-all entry");
            assert_eq!(cfg.metrics[0].id, ALL_METRICS_ID);
        }
        assert_eq!(presets().len(), PRESET_NAMES.len());
    }

    #[test]
    fn balance_preset_uses_millions() {
        let cfg = preset("balance").unwrap();
        assert!(cfg.with_area);
        let m = cfg.metric("sp_08").unwrap();
        assert_eq!(m.value_divisor, Some(1_000_000.0));
        assert_eq!(m.value_axis_digits, Some(0));
        assert_eq!(m.value_suffix.as_deref(), Some(" M USD"));
        assert_eq!(cfg.grid_metric_ids(), vec!["sp_08", "sp_10", "sp_09", "sp_11"]);
    }

    #[test]
    fn zero_divisor_is_rejected() {
        let mut cfg = preset("costs-yield").unwrap();
        cfg.metrics[1].value_divisor = Some(0.0);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_preset() {
        assert!(matches!(
            preset("nope"),
            Err(ConfigError::UnknownPreset(n)) if n == "nope"
        ));
    }

    #[test]
    fn json_defaults_fill_in() {
        let cfg: ChartConfig = serde_json::from_str(
            r#"{"metrics":[{"id":"x","title":"X"}],"default_metric":"x"}"#,
        )
        .unwrap();
        assert_eq!(cfg.default_entities, DEFAULT_ENTITIES.to_vec());
        assert_eq!(cfg.endpoint_path, "/metric-values/");
        assert_eq!(cfg.slider_commit, SliderCommit::Window);
        assert!(cfg.metrics[0].treat_zero_as_missing);
        assert_eq!(cfg.since(), Since::YearFrom(2000));
    }
}
