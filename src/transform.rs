//! Display transforms: year-over-year change, unit scaling and number formatting.
//!
//! Both transforms are pure; feeding the same series and config twice yields the same output.

use crate::config::MetricConfig;
use crate::models::{MetricPoint, Series};
use num_format::{Locale, ToFormattedString};

/// Suffix applied when a divisor is in effect and the config names none.
pub const DEFAULT_SCALED_SUFFIX: &str = " M USD";
pub const YOY_TITLE_SUFFIX: &str = " (Var % YoY)";

/// Year-over-year percent change. The first point has no predecessor and maps to `None`, as
/// does every point whose predecessor is missing or zero.
pub fn to_yoy(points: &[MetricPoint]) -> Vec<MetricPoint> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let value = if i == 0 {
                None
            } else {
                match (points[i - 1].finite(), p.finite()) {
                    (Some(prev), Some(cur)) if prev != 0.0 => Some((cur - prev) / prev * 100.0),
                    _ => None,
                }
            };
            MetricPoint { value, ..*p }
        })
        .collect()
}

pub fn yoy_series(series: &[Series]) -> Vec<Series> {
    series
        .iter()
        .map(|s| Series {
            values: to_yoy(&s.values),
            ..s.clone()
        })
        .collect()
}

/// Map a user-provided locale tag to a `num_format::Locale`.
///
/// Supported tags (case-insensitive): `en`, `us`, `en_US`, `de`, `de_DE`, `german`,
/// `fr`, `es`, `it`, `pt`, `nl`. Defaults to English.
pub fn map_locale(tag: &str) -> Locale {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => Locale::de,
        "fr" | "fr_fr" => Locale::fr,
        "es" | "es_es" => Locale::es,
        "it" | "it_it" => Locale::it,
        "pt" | "pt_pt" | "pt_br" => Locale::pt,
        "nl" | "nl_nl" => Locale::nl,
        _ => Locale::en,
    }
}

/// Resolved scaling and formatting rules for one metric in one mode.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub divisor: f64,
    pub axis_digits: usize,
    pub tooltip_digits: usize,
    pub axis_suffix: String,
    pub tooltip_suffix: String,
    pub yoy: bool,
    pub locale: Locale,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::for_metric(None, false)
    }
}

impl DisplayConfig {
    /// Resolve the rules for `meta`. In YoY mode values are already percentages, so no divisor
    /// and no unit suffix apply.
    pub fn for_metric(meta: Option<&MetricConfig>, yoy: bool) -> Self {
        let divisor = match meta.and_then(|m| m.value_divisor) {
            Some(d) if !yoy && d.is_finite() && d != 0.0 => d,
            _ => 1.0,
        };
        let scaled = divisor != 1.0;
        let axis_digits = meta
            .and_then(|m| m.value_axis_digits)
            .unwrap_or(if scaled { 0 } else { 2 });
        let tooltip_digits = meta.and_then(|m| m.value_tooltip_digits).unwrap_or(2);

        let pick = |specific: Option<&String>| -> String {
            if yoy {
                return String::new();
            }
            let explicit = specific
                .or(meta.and_then(|m| m.value_suffix.as_ref()))
                .filter(|s| !s.is_empty());
            match explicit {
                Some(s) => s.clone(),
                None if scaled => DEFAULT_SCALED_SUFFIX.to_string(),
                None => String::new(),
            }
        };
        let axis_suffix = pick(meta.and_then(|m| m.value_axis_suffix.as_ref()));
        let tooltip_suffix = pick(meta.and_then(|m| m.value_tooltip_suffix.as_ref()));

        Self {
            divisor,
            axis_digits,
            tooltip_digits,
            axis_suffix,
            tooltip_suffix,
            yoy,
            locale: Locale::en,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn scale(&self, v: f64) -> f64 {
        v / self.divisor
    }

    /// Axis tick text: `"8 M USD"`, `"1,234.50"`, or `"+10%"` in YoY mode.
    pub fn format_axis(&self, v: f64) -> String {
        if self.yoy {
            format!("{}%", format_signed(v, 0, &self.locale))
        } else {
            format!(
                "{}{}",
                format_grouped(v, self.axis_digits, &self.locale),
                self.axis_suffix
            )
        }
    }

    /// Tooltip text: `"8.00 M USD"`, or `"+10.00%"` in YoY mode.
    pub fn format_tooltip(&self, v: f64) -> String {
        if self.yoy {
            format!("{}%", format_signed(v, 2, &self.locale))
        } else {
            format!(
                "{}{}",
                format_grouped(v, self.tooltip_digits, &self.locale),
                self.tooltip_suffix
            )
        }
    }
}

/// Divide every value by the display divisor.
pub fn scale_series(series: &[Series], display: &DisplayConfig) -> Vec<Series> {
    series
        .iter()
        .map(|s| Series {
            values: s
                .values
                .iter()
                .map(|p| MetricPoint {
                    value: p.value.map(|v| display.scale(v)),
                    ..*p
                })
                .collect(),
            ..s.clone()
        })
        .collect()
}

/// YoY (when asked) then unit scaling, for one metric.
pub fn apply_display(series: &[Series], display: &DisplayConfig) -> Vec<Series> {
    if display.yoy {
        scale_series(&yoy_series(series), display)
    } else {
        scale_series(series, display)
    }
}

pub fn display_title(meta: &MetricConfig, yoy: bool) -> String {
    if yoy {
        format!("{}{}", meta.title, YOY_TITLE_SUFFIX)
    } else {
        meta.title.clone()
    }
}

/// Fixed-point with thousands grouping. Negative zero after rounding prints without a sign.
pub fn format_grouped(v: f64, digits: usize, locale: &Locale) -> String {
    if !v.is_finite() {
        return String::new();
    }
    let (negative, body) = grouped_abs(v, digits, locale);
    if negative {
        format!("-{body}")
    } else {
        body
    }
}

/// Like [`format_grouped`] but always signed (`+0.00` for zero).
pub fn format_signed(v: f64, digits: usize, locale: &Locale) -> String {
    if !v.is_finite() {
        return String::new();
    }
    let (negative, body) = grouped_abs(v, digits, locale);
    if negative {
        format!("-{body}")
    } else {
        format!("+{body}")
    }
}

fn grouped_abs(v: f64, digits: usize, locale: &Locale) -> (bool, String) {
    let fixed = format!("{:.*}", digits, v.abs());
    let rounds_to_zero = fixed.chars().all(|c| c == '0' || c == '.');
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let grouped = match int_part.parse::<u128>() {
        Ok(n) => n.to_formatted_string(locale),
        Err(_) => int_part.to_string(),
    };
    let body = match frac_part {
        Some(f) => format!("{grouped}{}{f}", locale.decimal()),
        None => grouped,
    };
    (v < 0.0 && !rounds_to_zero, body)
}
