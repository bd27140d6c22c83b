//! Per-chart view state and the hover/tooltip logic.
//!
//! Everything here is a pure state update or a pure computation over a built
//! [`PanelView`]; nothing touches fetched data.

use std::collections::BTreeSet;

use crate::config::ALL_METRICS_ID;
use crate::domain::YearRange;
use crate::models::{Entity, EntityId, MetricPoint, RawRow};
use crate::viz::colors::Color;
use crate::viz::frame::{PanelView, TooltipRow, TooltipView};

/// Tooltip box width used for placement.
pub const TOOLTIP_WIDTH: f64 = 220.0;
/// Height kept free below the tooltip's top edge.
pub const TOOLTIP_CLEARANCE: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Insertion order is legend order.
    pub selected_entity_ids: Vec<EntityId>,
    pub hidden_entity_ids: BTreeSet<EntityId>,
    pub selected_metric_id: String,
    pub yoy_mode: bool,
    pub year_domain: Option<YearRange>,
}

impl ViewState {
    pub fn new(metric_id: impl Into<String>, entities: &[EntityId]) -> Self {
        let mut view = Self {
            selected_entity_ids: Vec::with_capacity(entities.len()),
            hidden_entity_ids: BTreeSet::new(),
            selected_metric_id: metric_id.into(),
            yoy_mode: false,
            year_domain: None,
        };
        for id in entities {
            view.add_entity(*id);
        }
        view
    }

    /// Append `id` to the selection. Returns `false` (and changes nothing) if already selected.
    pub fn add_entity(&mut self, id: EntityId) -> bool {
        if self.selected_entity_ids.contains(&id) {
            return false;
        }
        self.selected_entity_ids.push(id);
        true
    }

    /// Drop `id` from both the selection and the hidden set.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let before = self.selected_entity_ids.len();
        self.selected_entity_ids.retain(|k| *k != id);
        let hidden = self.hidden_entity_ids.remove(&id);
        hidden || before != self.selected_entity_ids.len()
    }

    /// Flip visibility; returns the new hidden flag.
    pub fn toggle_visibility(&mut self, id: EntityId) -> bool {
        if self.hidden_entity_ids.remove(&id) {
            false
        } else {
            self.hidden_entity_ids.insert(id);
            true
        }
    }

    pub fn is_hidden(&self, id: EntityId) -> bool {
        self.hidden_entity_ids.contains(&id)
    }

    pub fn is_show_all(&self) -> bool {
        self.selected_metric_id == ALL_METRICS_ID
    }
}

/// Closest year to `target` in ascending `years`; ties go to the earlier year.
pub fn nearest_year(years: &[i32], target: f64) -> Option<i32> {
    if years.is_empty() || !target.is_finite() {
        return None;
    }
    let i = years.partition_point(|y| (*y as f64) < target);
    if i == 0 {
        return Some(years[0]);
    }
    if i >= years.len() {
        return years.last().copied();
    }
    let (lo, hi) = (years[i - 1], years[i]);
    if (hi as f64 - target).abs() < (target - lo as f64).abs() {
        Some(hi)
    } else {
        Some(lo)
    }
}

/// Index of the point nearest `year` in a year-sorted slice; ties go to the earlier index.
pub fn nearest_point_index(points: &[MetricPoint], year: i32) -> Option<usize> {
    if points.is_empty() {
        return None;
    }
    let j = points.partition_point(|p| p.year < year);
    if j >= points.len() {
        return Some(points.len() - 1);
    }
    if j > 0 && (points[j].year - year).abs() >= (year - points[j - 1].year).abs() {
        return Some(j - 1);
    }
    Some(j)
}

/// Tooltip for a pointer at canvas x `px` over `panel`, or `None` when nothing visible has data.
///
/// Years come from visible series only. Rows are sorted by value, largest first.
pub fn compute_tooltip(
    panel: &PanelView,
    panel_index: usize,
    px: f64,
    canvas: (f64, f64),
) -> Option<TooltipView> {
    let mut years: Vec<i32> = panel
        .visible_series()
        .flat_map(|s| s.points.iter().filter(|p| p.finite().is_some()).map(|p| p.year))
        .collect();
    years.sort_unstable();
    years.dedup();

    let year = nearest_year(&years, panel.x.invert(px))?;
    let rule_x = panel.x.map(year as f64);

    let mut rows: Vec<TooltipRow> = panel
        .visible_series()
        .filter_map(|s| {
            let j = nearest_point_index(&s.points, year)?;
            let p = s.points[j];
            let value = p.finite()?;
            Some(TooltipRow {
                key: s.key,
                label: s.label.clone(),
                color: s.color,
                value,
                text: panel.display.format_tooltip(value),
                point: (panel.x.map(p.year as f64), panel.y.map(value)),
            })
        })
        .collect();
    if rows.is_empty() {
        return None;
    }
    rows.sort_by(|a, b| b.value.total_cmp(&a.value));

    let anchor_y = rows.iter().map(|r| r.point.1).sum::<f64>() / rows.len() as f64;
    let (width, height) = canvas;
    let left = (rule_x + 12.0).max(8.0).min(width - TOOLTIP_WIDTH);
    let top = (height - TOOLTIP_CLEARANCE).min(anchor_y - 12.0).max(8.0);

    Some(TooltipView {
        panel: panel_index,
        year,
        header: format!("Year: {year}"),
        rows,
        anchor: (left, top),
        rule_x,
    })
}

/// Entities that appear in `rows` and are not selected yet, in listing order.
///
/// Ids found in the rows but missing from the listing are offered under their raw id.
pub fn addable_entities(
    entities: &[Entity],
    rows: &[RawRow],
    selected: &[EntityId],
) -> Vec<Entity> {
    let present: BTreeSet<EntityId> = rows.iter().map(|r| r.entity_id).collect();
    let mut out: Vec<Entity> = entities
        .iter()
        .filter(|e| present.contains(&e.id) && !selected.contains(&e.id))
        .cloned()
        .collect();
    for id in &present {
        if !selected.contains(id) && !entities.iter().any(|e| e.id == *id) {
            out.push(Entity {
                id: *id,
                code: None,
                name: None,
            });
        }
    }
    out
}

/// One legend row.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub key: EntityId,
    pub label: String,
    pub color: Color,
    pub hidden: bool,
    /// Whether the entity has any observation for the active metric(s).
    pub has_data: bool,
}
