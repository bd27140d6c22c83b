use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Stable identifier of a rated institution (`mdb_id` on the wire).
pub type EntityId = i64;

/// Raw row from a values endpoint.
///
/// The API is loose about types: years and values may arrive as numbers or
/// numeric strings, and some endpoint families send a `date` instead of a `year`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// Present when several metrics were requested in one call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_id: Option<String>,
    #[serde(rename = "mdb_id", deserialize_with = "de_entity_id")]
    pub entity_id: EntityId,
    #[serde(
        default,
        deserialize_with = "de_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub value: Option<f64>,
}

impl RawRow {
    pub fn new(entity_id: EntityId, year: i32, value: Option<f64>) -> Self {
        Self {
            metric_id: None,
            entity_id,
            year: Some(year as f64),
            date: None,
            value,
        }
    }

    pub fn with_metric(mut self, metric_id: impl Into<String>) -> Self {
        self.metric_id = Some(metric_id.into());
        self
    }

    /// Observation year: `year` when finite, else the year of an ISO `date`.
    pub fn year(&self) -> Option<i32> {
        if let Some(y) = self.year {
            return y.is_finite().then_some(y.trunc() as i32);
        }
        let date = self.date.as_deref()?.trim();
        let head = date.get(..10).unwrap_or(date);
        NaiveDate::parse_from_str(head, "%Y-%m-%d")
            .map(|d| d.year())
            .ok()
            .or_else(|| date.get(..4).and_then(|y| y.parse().ok()))
    }

    /// Numeric value, `None` for nulls and non-finite numbers.
    pub fn value(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

/// Entity listing row (`mdbs/` endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "mdb_id", deserialize_with = "de_entity_id")]
    pub id: EntityId,
    #[serde(rename = "mdb_code", default)]
    pub code: Option<String>,
    #[serde(rename = "mdb_name", default)]
    pub name: Option<String>,
}

impl Entity {
    /// Short label used on lines and in tooltips; falls back to the raw id.
    pub fn label(&self) -> String {
        match self.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => self.id.to_string(),
        }
    }
}

/// Metric metadata row (`metrics/` endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricMeta {
    pub metric_id: String,
    #[serde(default)]
    pub metric_name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Where a metric's numbers come from, as shown under a chart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceInfo {
    pub label: String,
    pub url: Option<String>,
}

impl MetricMeta {
    /// Normalised attribution for the metadata `source` string.
    pub fn source_info(&self) -> Option<SourceInfo> {
        let raw = self.source.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let lower = raw.to_lowercase();
        let info = if lower.contains("mood") {
            SourceInfo {
                label: "Moody's".into(),
                url: Some("https://www.moodys.com".into()),
            }
        } else if ["s&p", "spglobal", "standard & poor"]
            .iter()
            .any(|k| lower.contains(k))
        {
            SourceInfo {
                label: "S&P Global Market Intelligence".into(),
                url: Some("https://www.spglobal.com/market-intelligence/es".into()),
            }
        } else {
            SourceInfo {
                label: raw.to_string(),
                url: None,
            }
        };
        Some(info)
    }
}

/// One observation of one entity. `value == None` is a gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub entity_id: EntityId,
    pub year: i32,
    pub value: Option<f64>,
}

impl MetricPoint {
    pub fn new(entity_id: EntityId, year: i32, value: Option<f64>) -> Self {
        Self {
            entity_id,
            year,
            value,
        }
    }

    /// Value if present and finite.
    pub fn finite(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

/// Per-entity series, ascending by year with unique years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub key: EntityId,
    pub label: String,
    pub values: Vec<MetricPoint>,
}

impl Series {
    pub fn first_year(&self) -> Option<i32> {
        self.values.first().map(|p| p.year)
    }

    pub fn last_year(&self) -> Option<i32> {
        self.values.last().map(|p| p.year)
    }

    /// Points whose year falls inside `[from, to]`.
    pub fn clipped(&self, from: i32, to: i32) -> Series {
        Series {
            key: self.key,
            label: self.label.clone(),
            values: self
                .values
                .iter()
                .filter(|p| p.year >= from && p.year <= to)
                .copied()
                .collect(),
        }
    }

    pub fn finite_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(MetricPoint::finite)
    }
}

/// Serde helper: entity ids arrive as integers, floats or strings.
fn de_entity_id<'de, D>(deserializer: D) -> Result<EntityId, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| D::Error::custom(format!("invalid entity id {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<EntityId>()
            .map_err(|e| D::Error::custom(format!("invalid entity id '{s}': {e}"))),
        other => Err(D::Error::custom(format!("invalid entity id {other}"))),
    }
}

/// Serde helper: accept a number, a numeric string or null. Anything else maps to `None`
/// so that one malformed cell never discards a whole payload.
fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
