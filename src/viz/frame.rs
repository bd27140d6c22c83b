//! Everything one render pass needs, fully resolved: geometry, scales, colors, opacity and
//! hover state. Built by [`crate::chart::ChartSession`], drawn by [`super::render_frame`].

use super::colors::Color;
use super::scale::LinearScale;
use crate::domain::YearRange;
use crate::layout::Rect;
use crate::models::{EntityId, MetricPoint, SourceInfo};
use crate::slider::SliderTip;
use crate::transform::DisplayConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartFrame {
    pub width: f64,
    pub height: f64,
    pub body: FrameBody,
    pub slider: Option<SliderView>,
    pub tooltip: Option<TooltipView>,
    pub attributions: Vec<SourceInfo>,
}

impl ChartFrame {
    pub fn message(width: f64, height: f64, kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            width,
            height,
            body: FrameBody::Message(MessageView {
                kind,
                text: text.into(),
            }),
            slider: None,
            tooltip: None,
            attributions: Vec::new(),
        }
    }

    pub fn panels(&self) -> &[PanelView] {
        match &self.body {
            FrameBody::Panels(p) => p,
            _ => &[],
        }
    }

    /// Label or remove glyph under `(x, y)`, in canvas pixels. The slider strip never hits.
    pub fn hit(&self, x: f64, y: f64) -> Option<Hit> {
        if let Some(slider) = &self.slider
            && slider.strip.contains(x, y)
        {
            return None;
        }
        for panel in self.panels() {
            for s in &panel.series {
                if let Some(b) = &s.label_box {
                    if b.remove_rect.contains(x, y) {
                        return Some(Hit::Remove(s.key));
                    }
                    if b.text_rect.contains(x, y) {
                        return Some(Hit::Toggle(s.key));
                    }
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Toggle(EntityId),
    Remove(EntityId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameBody {
    Message(MessageView),
    Panels(Vec<PanelView>),
    Bars(BarView),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Loading,
    Error,
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub kind: MessageKind,
    pub text: String,
}

/// One plot: the single chart, or a grid subchart.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub metric_id: String,
    pub title: String,
    /// Plot area in canvas pixels; lines and areas are clipped to it.
    pub plot: Rect,
    /// Years to pixels.
    pub x: LinearScale,
    /// Display values to pixels.
    pub y: LinearScale,
    pub x_ticks: usize,
    pub y_ticks: usize,
    pub show_x_labels: bool,
    pub display: DisplayConfig,
    pub with_area: bool,
    /// Grid subcharts use lighter hidden styling and smaller markers.
    pub compact: bool,
    pub series: Vec<SeriesView>,
    /// Year currently emphasised by the hover.
    pub hover_year: Option<i32>,
}

impl PanelView {
    pub fn marker_radius(&self, emphasised: bool) -> f64 {
        match (self.compact, emphasised) {
            (false, false) => 2.5,
            (false, true) => 4.0,
            (true, false) => 2.4,
            (true, true) => 3.6,
        }
    }

    pub fn line_opacity(&self, hidden: bool) -> f64 {
        match (hidden, self.compact) {
            (false, _) => 1.0,
            (true, false) => 0.15,
            (true, true) => 0.18,
        }
    }

    pub fn marker_opacity(&self, hidden: bool) -> f64 {
        match (hidden, self.compact) {
            (false, _) => 1.0,
            (true, false) => 0.15,
            (true, true) => 0.2,
        }
    }

    pub fn area_opacity(&self, hidden: bool) -> f64 {
        if hidden { 0.06 } else { 0.12 }
    }

    pub fn label_opacity(&self, hidden: bool) -> f64 {
        if hidden { 0.35 } else { 1.0 }
    }

    pub fn visible_series(&self) -> impl Iterator<Item = &SeriesView> {
        self.series.iter().filter(|s| !s.hidden)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesView {
    pub key: EntityId,
    pub label: String,
    pub color: Color,
    pub hidden: bool,
    /// Display values inside the view window.
    pub points: Vec<MetricPoint>,
    pub label_box: Option<LabelBox>,
}

/// End-of-line label with its click targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBox {
    /// Left-centre of the label text.
    pub anchor: (f64, f64),
    pub text_rect: Rect,
    pub remove_rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderView {
    pub strip: Rect,
    /// Track ends and handle centres, in canvas pixels.
    pub track: (f64, f64),
    pub handles: (f64, f64),
    pub window: YearRange,
    pub global: YearRange,
    pub tip: Option<SliderTip>,
}

impl SliderView {
    /// Vertical centre of the track.
    pub fn track_y(&self) -> f64 {
        self.strip.y + 12.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipRow {
    pub key: EntityId,
    pub label: String,
    pub color: Color,
    pub value: f64,
    pub text: String,
    /// Marker position of this row's point.
    pub point: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipView {
    pub panel: usize,
    pub year: i32,
    pub header: String,
    /// Sorted by value, largest first.
    pub rows: Vec<TooltipRow>,
    /// Top-left of the tooltip box.
    pub anchor: (f64, f64),
    pub rule_x: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarItem {
    pub key: EntityId,
    pub label: String,
    pub color: Color,
    pub hidden: bool,
    pub year: i32,
    pub value: f64,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarView {
    pub title: String,
    pub plot: Rect,
    pub y: LinearScale,
    pub y_ticks: usize,
    pub display: DisplayConfig,
    pub bars: Vec<BarItem>,
    pub empty_text: Option<String>,
}
