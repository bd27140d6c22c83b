//! One interactive chart: load bookkeeping, view state and frame building.
//!
//! A [`ChartSession`] never performs I/O itself. It hands out [`LoadRequest`]s, accepts
//! [`LoadOutcome`]s (discarding stale ones), and turns its current data and view state into a
//! [`ChartFrame`] for any canvas size. Pointer events feed the hover tooltip, the range
//! slider and the end-of-line label actions.

use std::collections::{HashMap, HashSet};

use num_format::Locale;

use crate::api::normalize_metric_ids;
use crate::config::{ChartConfig, ChartKind, MetricConfig};
use crate::domain::{DomainResolver, YearRange, value_domain};
use crate::interaction::{LegendEntry, ViewState, addable_entities, compute_tooltip};
use crate::layout::{PlotLayout, Rect, grid_layout};
use crate::loader::{LoadOutcome, LoadRequest};
use crate::models::{Entity, EntityId, MetricMeta, MetricPoint, RawRow, Series, SourceInfo};
use crate::series::{
    BuildOptions, build_series, entity_ids_in, group_rows_by_metric, rows_for_metric,
};
use crate::slider::RangeSlider;
use crate::transform::{DisplayConfig, apply_display, display_title};
use crate::viz::colors::{Color, entity_color};
use crate::viz::frame::{
    BarItem, BarView, ChartFrame, FrameBody, Hit, LabelBox, MessageKind, PanelView, SeriesView,
    SliderView,
};
use crate::viz::scale::{BandScale, LinearScale};
use crate::viz::text::estimate_text_width;

pub const LOAD_ERROR_MESSAGE: &str = "Could not load data. Please try again.";
pub const EMPTY_MESSAGE: &str = "No data for the current selection.";
pub const LOADING_MESSAGE: &str = "Loading…";
pub const NO_BARS_MESSAGE: &str = "No data";

/// End-of-line labels may reach this far right of the plot.
const LABEL_REACH: f64 = 72.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    /// Load succeeded but nothing plottable survived filtering.
    Empty,
    Failed(String),
}

/// Inputs for one line panel.
struct PanelInput<'a> {
    metric_id: &'a str,
    title: String,
    display: DisplayConfig,
    plot: Rect,
    x_domain: (f64, f64),
    /// Display values clipped to the window.
    series: Vec<Series>,
    /// Used for the value axis when no visible value is in the window.
    fallback_values: Vec<f64>,
    compact: bool,
    show_x_labels: bool,
    with_labels: bool,
}

#[derive(Debug)]
pub struct ChartSession {
    config: ChartConfig,
    view: ViewState,
    slider: RangeSlider,
    resolver: DomainResolver,
    locale: Locale,
    generation: u64,
    pending: Option<u64>,
    needs_load: bool,
    state: LoadState,
    rows: Vec<RawRow>,
    entities: Vec<Entity>,
    labels: HashMap<EntityId, String>,
    codes: HashMap<EntityId, String>,
    metric_meta: Vec<MetricMeta>,
    pointer: Option<(f64, f64)>,
    frame: Option<ChartFrame>,
}

impl ChartSession {
    pub fn new(config: ChartConfig) -> Self {
        let view = ViewState::new(config.default_metric.clone(), &config.default_entities);
        Self {
            slider: RangeSlider::new(config.slider_commit),
            resolver: DomainResolver::new(config.preferred_start_year),
            config,
            view,
            locale: Locale::en,
            generation: 0,
            pending: None,
            needs_load: true,
            state: LoadState::Idle,
            rows: Vec::new(),
            entities: Vec::new(),
            labels: HashMap::new(),
            codes: HashMap::new(),
            metric_meta: Vec::new(),
            pointer: None,
            frame: None,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Frame from the last [`ChartSession::prepare`].
    pub fn frame(&self) -> Option<&ChartFrame> {
        self.frame.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.slider.is_dragging()
    }

    /// Metric ids the current view needs: every grid metric in show-all mode.
    pub fn active_metric_ids(&self) -> Vec<String> {
        if self.view.is_show_all() {
            let ids = self.config.grid_metric_ids();
            normalize_metric_ids(ids.iter().map(String::as_str))
        } else {
            normalize_metric_ids([self.view.selected_metric_id.as_str()])
        }
    }

    /// Issue a new load and make it the only one whose result will be accepted.
    pub fn begin_load(&mut self) -> LoadRequest {
        self.generation += 1;
        self.pending = Some(self.generation);
        self.needs_load = false;
        self.state = LoadState::Loading;
        LoadRequest {
            generation: self.generation,
            endpoint_path: self.config.endpoint_path.clone(),
            metric_ids: self.active_metric_ids(),
            since: self.config.since(),
        }
    }

    /// A request if the view changed since the last load, else `None`.
    pub fn take_load_request(&mut self) -> Option<LoadRequest> {
        self.needs_load.then(|| self.begin_load())
    }

    /// Apply a finished load. Outcomes of superseded loads are dropped and `false` returned.
    pub fn apply_load(&mut self, outcome: LoadOutcome) -> bool {
        if self.pending != Some(outcome.generation) {
            log::debug!(
                "discarding stale load {} (current {})",
                outcome.generation,
                self.generation
            );
            return false;
        }
        self.pending = None;
        match outcome.result {
            Err(_) => {
                self.rows.clear();
                self.state = LoadState::Failed(LOAD_ERROR_MESSAGE.to_string());
            }
            Ok(data) => {
                self.rows = data.rows;
                if let Some(entities) = data.entities {
                    self.set_entities(entities);
                }
                if let Some(meta) = data.metrics {
                    self.metric_meta = meta;
                }
                self.refresh_state();
                if let Some(global) = self.global_domain() {
                    self.view.year_domain =
                        Some(self.resolver.reconcile(self.view.year_domain, global));
                }
            }
        }
        true
    }

    fn set_entities(&mut self, entities: Vec<Entity>) {
        self.labels = entities.iter().map(|e| (e.id, e.label())).collect();
        self.codes = entities
            .iter()
            .filter_map(|e| e.code.clone().map(|c| (e.id, c)))
            .collect();
        self.entities = entities;
    }

    fn refresh_state(&mut self) {
        if !matches!(self.state, LoadState::Loading | LoadState::Ready | LoadState::Empty) {
            return;
        }
        let has_data = self.metric_series().iter().any(|(_, s)| !s.is_empty());
        self.state = if has_data {
            LoadState::Ready
        } else {
            LoadState::Empty
        };
    }

    /// Switch metric. Returns `false` for the current or an unknown id.
    pub fn select_metric(&mut self, id: &str) -> bool {
        if id == self.view.selected_metric_id || self.config.metric(id).is_none() {
            return false;
        }
        self.view.selected_metric_id = id.to_string();
        self.needs_load = true;
        self.pointer = None;
        true
    }

    pub fn set_yoy(&mut self, on: bool) {
        self.view.yoy_mode = on;
    }

    pub fn toggle_visibility(&mut self, id: EntityId) -> bool {
        self.view.toggle_visibility(id)
    }

    /// Select `id` if the loaded rows contain it. `false` if absent or already selected.
    pub fn add_entity(&mut self, id: EntityId) -> bool {
        if !entity_ids_in(&self.rows).contains(&id) || !self.view.add_entity(id) {
            return false;
        }
        self.refresh_state();
        true
    }

    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        if !self.view.remove_entity(id) {
            return false;
        }
        self.refresh_state();
        true
    }

    /// Set the view window, clamped into the current global domain.
    pub fn set_year_domain(&mut self, window: YearRange) {
        self.view.year_domain = Some(match self.global_domain() {
            Some(g) => self.resolver.reconcile(Some(window), g),
            None => window,
        });
    }

    /// Built (unscaled) series per active metric.
    fn metric_series(&self) -> Vec<(String, Vec<Series>)> {
        if self.view.is_show_all() {
            let grouped = group_rows_by_metric(&self.rows);
            self.config
                .grid_metrics()
                .map(|m| {
                    let rows = grouped.get(&m.id).map(Vec::as_slice).unwrap_or(&[]);
                    (m.id.clone(), self.build(m.id.as_str(), rows))
                })
                .collect()
        } else {
            let id = self.view.selected_metric_id.clone();
            let rows = rows_for_metric(&self.rows, &id);
            let series = self.build(&id, &rows);
            vec![(id, series)]
        }
    }

    fn build(&self, metric_id: &str, rows: &[RawRow]) -> Vec<Series> {
        let opts = BuildOptions {
            treat_zero_as_missing: self
                .config
                .metric(metric_id)
                .is_none_or(|m| m.treat_zero_as_missing),
        };
        build_series(rows, &self.view.selected_entity_ids, &self.labels, opts)
    }

    /// Global year domain of everything currently plotted.
    pub fn global_domain(&self) -> Option<YearRange> {
        let years: Vec<i32> = self
            .metric_series()
            .iter()
            .flat_map(|(_, ss)| ss.iter().flat_map(|s| s.values.iter().map(|p| p.year)))
            .collect();
        self.resolver.resolve_global_domain(years)
    }

    fn color_of(&self, id: EntityId) -> Color {
        entity_color(
            id,
            self.codes.get(&id).map(String::as_str),
            &self.view.selected_entity_ids,
        )
    }

    fn display_for(&self, meta: Option<&MetricConfig>) -> DisplayConfig {
        DisplayConfig::for_metric(meta, self.view.yoy_mode).with_locale(self.locale)
    }

    fn title_for(&self, metric_id: &str, meta: Option<&MetricConfig>) -> String {
        match meta {
            Some(m) => display_title(m, self.view.yoy_mode),
            None => metric_id.to_string(),
        }
    }

    fn source_for(&self, metric_id: &str) -> Option<SourceInfo> {
        self.metric_meta
            .iter()
            .find(|m| m.metric_id == metric_id)
            .and_then(MetricMeta::source_info)
    }

    /// Resolve everything for a `width`×`height` canvas. Also clamps the view window into the
    /// current data and syncs the slider, preserving an in-progress drag.
    pub fn prepare(&mut self, width: f64, height: f64) -> ChartFrame {
        let frame = match self.state.clone() {
            LoadState::Idle | LoadState::Loading => {
                ChartFrame::message(width, height, MessageKind::Loading, LOADING_MESSAGE)
            }
            LoadState::Failed(msg) => ChartFrame::message(width, height, MessageKind::Error, msg),
            LoadState::Empty => ChartFrame::message(width, height, MessageKind::Empty, EMPTY_MESSAGE),
            LoadState::Ready => self.build_frame(width, height),
        };
        self.frame = Some(frame.clone());
        frame
    }

    fn build_frame(&mut self, width: f64, height: f64) -> ChartFrame {
        let empty = || ChartFrame::message(width, height, MessageKind::Empty, EMPTY_MESSAGE);
        let Some(global) = self.global_domain() else {
            return empty();
        };
        let window = self.resolver.reconcile(self.view.year_domain, global);
        self.view.year_domain = Some(window);

        let show_all = self.view.is_show_all();
        let layout = if show_all {
            PlotLayout::grid(width, height)
        } else {
            PlotLayout::single(width, height)
        };
        if !layout.inner.is_drawable() {
            return empty();
        }
        let body = if show_all {
            self.grid_body(&layout, window)
        } else if self.config.kind == ChartKind::LatestBar {
            Some(self.bar_body(&layout, window))
        } else {
            self.single_body(&layout, window)
        };
        let Some(body) = body else {
            return empty();
        };

        self.slider.sync(global, window, layout.slider.width);
        let (t0, t1) = self.slider.extent();
        let (h0, h1) = self.slider.handles_px();
        let sx = layout.slider.x;
        let slider = SliderView {
            strip: layout.slider,
            track: (sx + t0, sx + t1),
            handles: (sx + h0, sx + h1),
            window,
            global,
            tip: self.slider.tooltip(),
        };

        let mut frame = ChartFrame {
            width,
            height,
            body,
            slider: Some(slider),
            tooltip: None,
            attributions: self.attributions(),
        };
        self.apply_hover(&mut frame);
        frame
    }

    fn attributions(&self) -> Vec<SourceInfo> {
        let ids: Vec<String> = if self.view.is_show_all() {
            self.config.grid_metric_ids()
        } else {
            vec![self.view.selected_metric_id.clone()]
        };
        let mut seen = HashSet::new();
        ids.iter()
            .filter_map(|id| self.source_for(id))
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }

    fn single_body(&self, layout: &PlotLayout, window: YearRange) -> Option<FrameBody> {
        let id = self.view.selected_metric_id.clone();
        let meta = self.config.metric(&id);
        let display = self.display_for(meta);
        let (_, raw) = self.metric_series().into_iter().next()?;
        let shown = apply_display(&raw, &display);
        let fallback_values: Vec<f64> = shown.iter().flat_map(|s| s.finite_values()).collect();
        let clipped: Vec<Series> = shown
            .iter()
            .map(|s| s.clipped(window.start, window.end))
            .collect();
        let panel = self.build_panel(PanelInput {
            metric_id: &id,
            title: self.title_for(&id, meta),
            display,
            plot: layout.inner,
            x_domain: (window.start as f64, window.end as f64),
            series: clipped,
            fallback_values,
            compact: false,
            show_x_labels: true,
            with_labels: true,
        });
        Some(FrameBody::Panels(vec![panel]))
    }

    /// One subchart per grid metric that has data in the window.
    fn grid_body(&self, layout: &PlotLayout, window: YearRange) -> Option<FrameBody> {
        let charts: Vec<(String, Vec<Series>)> = self
            .metric_series()
            .into_iter()
            .filter_map(|(id, raw)| {
                let display = self.display_for(self.config.metric(&id));
                let clipped: Vec<Series> = apply_display(&raw, &display)
                    .iter()
                    .map(|s| s.clipped(window.start, window.end))
                    .collect();
                clipped
                    .iter()
                    .any(|s| !s.values.is_empty())
                    .then_some((id, clipped))
            })
            .collect();
        if charts.is_empty() {
            return None;
        }
        let cells = grid_layout(charts.len(), layout.inner.width, layout.inner.height);
        if !cells.iter().all(|c| c.plot_rect().is_drawable()) {
            return None;
        }
        let panels = charts
            .into_iter()
            .zip(cells)
            .map(|((id, series), cell)| {
                let meta = self.config.metric(&id);
                let first = series.iter().filter_map(Series::first_year).min();
                let last = series.iter().filter_map(Series::last_year).max();
                let x0 = first.map_or(window.start, |y| y.max(window.start));
                let x1 = last.map_or(window.end, |y| y.min(window.end));
                let fallback_values: Vec<f64> =
                    series.iter().flat_map(|s| s.finite_values()).collect();
                self.build_panel(PanelInput {
                    metric_id: &id,
                    title: self.title_for(&id, meta),
                    display: self.display_for(meta),
                    plot: cell.plot_rect().translate(layout.inner.x, layout.inner.y),
                    x_domain: (x0 as f64, x1 as f64),
                    series,
                    fallback_values,
                    compact: true,
                    show_x_labels: cell.bottom_of_column,
                    with_labels: false,
                })
            })
            .collect();
        Some(FrameBody::Panels(panels))
    }

    fn build_panel(&self, input: PanelInput<'_>) -> PanelView {
        let plot = input.plot;
        let visible = input
            .series
            .iter()
            .filter(|s| !self.view.is_hidden(s.key))
            .flat_map(|s| s.finite_values());
        let (lo, hi) = value_domain(visible, input.fallback_values.iter().copied());
        let y = LinearScale::new()
            .domain(lo, hi)
            .nice(10)
            .range(plot.bottom(), plot.y);
        let x = LinearScale::new()
            .domain(input.x_domain.0, input.x_domain.1)
            .range(plot.x, plot.right());

        let series = input
            .series
            .into_iter()
            .map(|s| {
                let color = self.color_of(s.key);
                let label_box = if input.with_labels {
                    label_box(&s.label, &s.values, &x, &y, &plot)
                } else {
                    None
                };
                SeriesView {
                    key: s.key,
                    hidden: self.view.is_hidden(s.key),
                    label: s.label,
                    color,
                    points: s.values,
                    label_box,
                }
            })
            .collect();

        PanelView {
            metric_id: input.metric_id.to_string(),
            title: input.title,
            plot,
            x,
            y,
            x_ticks: if input.compact { 4 } else { 10 },
            y_ticks: if input.compact { 3 } else { 6 },
            show_x_labels: input.show_x_labels,
            display: input.display,
            with_area: self.config.with_area,
            compact: input.compact,
            series,
            hover_year: None,
        }
    }

    fn bar_body(&self, layout: &PlotLayout, window: YearRange) -> FrameBody {
        let id = self.view.selected_metric_id.clone();
        let meta = self.config.metric(&id);
        let display = self.display_for(meta);
        let plot = layout.inner;
        let raw = self
            .metric_series()
            .into_iter()
            .next()
            .map(|(_, s)| s)
            .unwrap_or_default();

        let mut latest: Vec<(EntityId, String, MetricPoint, f64)> = apply_display(&raw, &display)
            .into_iter()
            .filter_map(|s| {
                let finite = |p: &&MetricPoint| p.finite().is_some();
                let p = s
                    .values
                    .iter()
                    .filter(finite)
                    .rfind(|p| window.contains(p.year))
                    .or_else(|| s.values.iter().filter(finite).next_back())?;
                let v = p.finite()?;
                Some((s.key, s.label, *p, v))
            })
            .collect();
        latest.sort_by(|a, b| a.3.total_cmp(&b.3));

        // The zero baseline always lies inside the domain.
        let (lo, hi) = latest
            .iter()
            .fold((0.0_f64, 0.0_f64), |(lo, hi), b| (lo.min(b.3), hi.max(b.3)));
        let (lo, hi) = if lo == hi { (0.0, 1.0) } else { (lo * 1.08, hi * 1.08) };
        let y = LinearScale::new()
            .domain(lo, hi)
            .nice(10)
            .range(plot.bottom(), plot.y);
        let band = BandScale::new(latest.len())
            .range(plot.x, plot.right())
            .padding(0.25);
        let base = y.map(0.0);
        let bars: Vec<BarItem> = latest
            .into_iter()
            .enumerate()
            .map(|(i, (key, label, p, v))| {
                let top = y.map(v);
                BarItem {
                    key,
                    label,
                    color: self.color_of(key),
                    hidden: self.view.is_hidden(key),
                    year: p.year,
                    value: v,
                    rect: Rect::new(band.position(i), top.min(base), band.bandwidth(), (base - top).abs()),
                }
            })
            .collect();

        FrameBody::Bars(BarView {
            title: self.title_for(&id, meta),
            plot,
            y,
            y_ticks: 6,
            display,
            empty_text: bars.is_empty().then(|| NO_BARS_MESSAGE.to_string()),
            bars,
        })
    }

    fn apply_hover(&self, frame: &mut ChartFrame) {
        let Some((px, py)) = self.pointer else { return };
        let (w, h) = (frame.width, frame.height);
        let FrameBody::Panels(panels) = &mut frame.body else {
            return;
        };
        let Some(idx) = panels.iter().position(|p| p.plot.contains(px, py)) else {
            return;
        };
        if let Some(t) = compute_tooltip(&panels[idx], idx, px, (w, h)) {
            panels[idx].hover_year = Some(t.year);
            frame.tooltip = Some(t);
        }
    }

    /// Pointer moved to canvas `(x, y)`: drives the active drag and the hover.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        self.pointer = Some((x, y));
        if self.slider.is_dragging()
            && let Some(strip) = self.slider_strip()
        {
            self.slider.drag_to(x - strip.x);
        }
    }

    /// Hide the tooltip and reset marker emphasis.
    pub fn pointer_left(&mut self) {
        self.pointer = None;
    }

    /// Press at `(x, y)`. Returns `true` when it grabbed a slider handle.
    pub fn pointer_pressed(&mut self, x: f64, y: f64) -> bool {
        let Some(strip) = self.slider_strip() else {
            return false;
        };
        if !strip.contains(x, y) {
            return false;
        }
        match self.slider.hit_test(x - strip.x) {
            Some(handle) => self.slider.begin_drag(handle),
            None => false,
        }
    }

    /// Release; commits the slider window if a drag was active.
    pub fn pointer_released(&mut self) -> Option<YearRange> {
        let window = self.slider.end_drag()?;
        self.view.year_domain = Some(window);
        Some(window)
    }

    /// Abandon an active slider drag, keeping the committed window.
    pub fn cancel_drag(&mut self) {
        self.slider.cancel();
    }

    /// Click on a label (toggle visibility) or its remove glyph (drop the entity).
    pub fn click(&mut self, x: f64, y: f64) -> Option<Hit> {
        let hit = self.frame.as_ref()?.hit(x, y)?;
        match hit {
            Hit::Toggle(id) => {
                self.toggle_visibility(id);
            }
            Hit::Remove(id) => {
                self.remove_entity(id);
            }
        }
        Some(hit)
    }

    fn slider_strip(&self) -> Option<Rect> {
        self.frame.as_ref()?.slider.as_ref().map(|s| s.strip)
    }

    /// Legend rows in selection order.
    pub fn legend_entries(&self) -> Vec<LegendEntry> {
        let with_data: HashSet<EntityId> = self
            .metric_series()
            .iter()
            .flat_map(|(_, ss)| ss.iter().map(|s| s.key))
            .collect();
        self.view
            .selected_entity_ids
            .iter()
            .map(|&id| LegendEntry {
                key: id,
                label: self
                    .labels
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| id.to_string()),
                color: self.color_of(id),
                hidden: self.view.is_hidden(id),
                has_data: with_data.contains(&id),
            })
            .collect()
    }

    /// Entities offered by the entity picker.
    pub fn addable_entities(&self) -> Vec<Entity> {
        addable_entities(&self.entities, &self.rows, &self.view.selected_entity_ids)
    }
}

/// Label to the right of the last defined point, plus its click targets.
fn label_box(
    label: &str,
    points: &[MetricPoint],
    x: &LinearScale,
    y: &LinearScale,
    plot: &Rect,
) -> Option<LabelBox> {
    let last = points.iter().rev().find(|p| p.finite().is_some())?;
    let v = last.finite()?;
    let lx = (x.map(last.year as f64) + 12.0).min(plot.right() + LABEL_REACH);
    let ly = y.map(v).max(plot.y).min(plot.bottom().max(plot.y));
    let tw = estimate_text_width(label, crate::viz::LABEL_FONT);
    Some(LabelBox {
        anchor: (lx, ly),
        text_rect: Rect::new(lx, ly - 8.0, tw, 16.0),
        remove_rect: Rect::new(lx + tw + 6.0, ly - 8.0, 10.0, 16.0),
    })
}
