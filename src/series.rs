//! Shape raw rows into per-entity series.

use crate::models::{EntityId, MetricPoint, RawRow, Series};
use std::collections::{BTreeMap, HashMap};

/// Options for [`build_series`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Drop zero observations as if they were missing.
    pub treat_zero_as_missing: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            treat_zero_as_missing: true,
        }
    }
}

/// Group `rows` by entity into ascending, gap-free series.
///
/// Rows with no usable year are dropped, as are points whose value is null, non-finite or
/// (by default) zero. When `selected` is non-empty only those entities survive, in the order
/// they appear in `selected`; otherwise every entity is kept, ordered by id. A repeated year
/// within one entity keeps the last row seen. Entities left with no points are dropped.
pub fn build_series(
    rows: &[RawRow],
    selected: &[EntityId],
    labels: &HashMap<EntityId, String>,
    opts: BuildOptions,
) -> Vec<Series> {
    let mut groups: BTreeMap<EntityId, BTreeMap<i32, f64>> = BTreeMap::new();
    for row in rows {
        let Some(year) = row.year() else { continue };
        let Some(value) = row.value() else { continue };
        if opts.treat_zero_as_missing && value == 0.0 {
            continue;
        }
        groups.entry(row.entity_id).or_default().insert(year, value);
    }

    let make = |key: EntityId, points: &BTreeMap<i32, f64>| Series {
        key,
        label: labels
            .get(&key)
            .cloned()
            .unwrap_or_else(|| key.to_string()),
        values: points
            .iter()
            .map(|(&year, &v)| MetricPoint::new(key, year, Some(v)))
            .collect(),
    };

    if selected.is_empty() {
        groups
            .iter()
            .filter(|(_, pts)| !pts.is_empty())
            .map(|(&k, pts)| make(k, pts))
            .collect()
    } else {
        selected
            .iter()
            .filter_map(|k| groups.get(k).map(|pts| (*k, pts)))
            .filter(|(_, pts)| !pts.is_empty())
            .map(|(k, pts)| make(k, pts))
            .collect()
    }
}

/// Split multi-metric rows by their `metric_id` tag. Untagged rows are dropped.
pub fn group_rows_by_metric(rows: &[RawRow]) -> HashMap<String, Vec<RawRow>> {
    let mut out: HashMap<String, Vec<RawRow>> = HashMap::new();
    for row in rows {
        if let Some(id) = row.metric_id.as_deref() {
            out.entry(id.to_string()).or_default().push(row.clone());
        }
    }
    out
}

/// Rows belonging to `metric_id`; untagged rows are assumed to belong to it.
pub fn rows_for_metric(rows: &[RawRow], metric_id: &str) -> Vec<RawRow> {
    rows.iter()
        .filter(|r| r.metric_id.as_deref().is_none_or(|m| m == metric_id))
        .cloned()
        .collect()
}

/// Sorted unique entity ids present in `rows`.
pub fn entity_ids_in(rows: &[RawRow]) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = rows.iter().map(|r| r.entity_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(e: EntityId, y: i32, v: Option<f64>) -> RawRow {
        RawRow::new(e, y, v)
    }

    #[test]
    fn drops_zero_null_and_non_finite() {
        let rows = vec![
            row(1, 2020, Some(2.0)),
            row(1, 2019, Some(0.0)),
            row(1, 2018, None),
            row(1, 2017, Some(f64::NAN)),
            row(1, 2016, Some(1.0)),
        ];
        let s = build_series(&rows, &[], &HashMap::new(), BuildOptions::default());
        assert_eq!(s.len(), 1);
        let years: Vec<i32> = s[0].values.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2016, 2020]);
        assert!(
            s[0].values
                .iter()
                .all(|p| p.value.is_some_and(|v| v.is_finite() && v != 0.0))
        );
    }

    #[test]
    fn zero_kept_when_policy_off() {
        let rows = vec![row(1, 2019, Some(0.0)), row(1, 2020, Some(1.0))];
        let s = build_series(
            &rows,
            &[],
            &HashMap::new(),
            BuildOptions {
                treat_zero_as_missing: false,
            },
        );
        assert_eq!(s[0].values.len(), 2);
    }

    #[test]
    fn selection_filters_and_orders() {
        let rows = vec![
            row(3, 2020, Some(3.0)),
            row(1, 2020, Some(1.0)),
            row(2, 2020, Some(2.0)),
        ];
        let labels: HashMap<EntityId, String> = [(2, "CAF".to_string())].into();
        let s = build_series(&rows, &[2, 9, 3], &labels, BuildOptions::default());
        assert_eq!(s.iter().map(|x| x.key).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(s[0].label, "CAF");
        assert_eq!(s[1].label, "3");
    }

    #[test]
    fn entity_with_only_zeros_is_dropped() {
        let rows = vec![row(1, 2020, Some(0.0)), row(2, 2020, Some(5.0))];
        let s = build_series(&rows, &[1, 2], &HashMap::new(), BuildOptions::default());
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].key, 2);
    }

    #[test]
    fn groups_tagged_rows() {
        let rows = vec![
            row(1, 2020, Some(1.0)).with_metric("a"),
            row(1, 2020, Some(2.0)).with_metric("b"),
            row(1, 2020, Some(3.0)),
        ];
        let g = group_rows_by_metric(&rows);
        assert_eq!(g.len(), 2);
        assert_eq!(rows_for_metric(&rows, "a").len(), 2);
    }
}
