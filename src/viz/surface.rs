//! Drawing-surface abstraction.
//!
//! The renderer only talks to [`Surface`], so the same frame can go to a file through plotters,
//! to the egui painter, or into a [`RecordingSurface`] for assertions in tests.

use super::colors::Color;
use crate::error::RenderError;
use crate::layout::Rect;
use crate::models::EntityId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
    pub opacity: f64,
}

impl StrokeStyle {
    pub fn new(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            opacity: 1.0,
        }
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillStyle {
    pub color: Color,
    pub opacity: f64,
}

impl FillStyle {
    pub fn new(color: Color, opacity: f64) -> Self {
        Self { color, opacity }
    }

    pub fn solid(color: Color) -> Self {
        Self::new(color, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f64,
    pub color: Color,
    pub opacity: f64,
    /// Horizontal anchor; text is always vertically centred on the position.
    pub anchor: Anchor,
    pub bold: bool,
}

impl TextStyle {
    pub fn new(size: f64, color: Color) -> Self {
        Self {
            size,
            color,
            opacity: 1.0,
            anchor: Anchor::Start,
            bold: false,
        }
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

/// What a group of primitives depicts. Backends may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Title,
    Axis,
    Area(EntityId),
    Line(EntityId),
    Markers(EntityId),
    Label(EntityId),
    Remove(EntityId),
    Bar(EntityId),
    HoverRule,
    Tooltip,
    Slider,
    SliderTip,
    Message,
    Attribution,
}

pub trait Surface {
    /// Open a group; every primitive until the matching [`Surface::end`] belongs to `role`.
    fn begin(&mut self, _role: Role) {}
    fn end(&mut self) {}

    fn rect(
        &mut self,
        rect: Rect,
        fill: Option<FillStyle>,
        stroke: Option<StrokeStyle>,
    ) -> Result<(), RenderError>;

    fn polyline(&mut self, points: &[(f64, f64)], stroke: StrokeStyle) -> Result<(), RenderError>;

    /// Fill between the x-monotone `upper` curve and the horizontal line `y = baseline`.
    fn area(
        &mut self,
        upper: &[(f64, f64)],
        baseline: f64,
        fill: FillStyle,
    ) -> Result<(), RenderError>;

    fn circle(
        &mut self,
        center: (f64, f64),
        radius: f64,
        fill: Option<FillStyle>,
        stroke: Option<StrokeStyle>,
    ) -> Result<(), RenderError>;

    fn text(&mut self, pos: (f64, f64), text: &str, style: TextStyle) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        rect: Rect,
        fill: Option<FillStyle>,
        stroke: Option<StrokeStyle>,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        stroke: StrokeStyle,
    },
    Area {
        upper: Vec<(f64, f64)>,
        baseline: f64,
        fill: FillStyle,
    },
    Circle {
        center: (f64, f64),
        radius: f64,
        fill: Option<FillStyle>,
        stroke: Option<StrokeStyle>,
    },
    Text {
        pos: (f64, f64),
        text: String,
        style: TextStyle,
    },
}

impl DrawOp {
    /// Effective opacity of the primitive.
    pub fn opacity(&self) -> f64 {
        match self {
            DrawOp::Polyline { stroke, .. } => stroke.opacity,
            DrawOp::Area { fill, .. } => fill.opacity,
            DrawOp::Text { style, .. } => style.opacity,
            DrawOp::Rect { fill, stroke, .. } | DrawOp::Circle { fill, stroke, .. } => fill
                .map(|f| f.opacity)
                .or(stroke.map(|s| s.opacity))
                .unwrap_or(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub role: Option<Role>,
    pub op: DrawOp,
}

/// Surface that keeps every primitive in order.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    stack: Vec<Role>,
    pub ops: Vec<Recorded>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, op: DrawOp) -> Result<(), RenderError> {
        self.ops.push(Recorded {
            role: self.stack.last().copied(),
            op,
        });
        Ok(())
    }

    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &DrawOp> {
        self.ops
            .iter()
            .filter(move |r| r.role == Some(role))
            .map(|r| &r.op)
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|r| match &r.op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn texts_with_role(&self, role: Role) -> Vec<&str> {
        self.with_role(role)
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.ops.clear();
    }
}

impl Surface for RecordingSurface {
    fn begin(&mut self, role: Role) {
        self.stack.push(role);
    }

    fn end(&mut self) {
        self.stack.pop();
    }

    fn rect(
        &mut self,
        rect: Rect,
        fill: Option<FillStyle>,
        stroke: Option<StrokeStyle>,
    ) -> Result<(), RenderError> {
        self.push(DrawOp::Rect { rect, fill, stroke })
    }

    fn polyline(&mut self, points: &[(f64, f64)], stroke: StrokeStyle) -> Result<(), RenderError> {
        self.push(DrawOp::Polyline {
            points: points.to_vec(),
            stroke,
        })
    }

    fn area(
        &mut self,
        upper: &[(f64, f64)],
        baseline: f64,
        fill: FillStyle,
    ) -> Result<(), RenderError> {
        self.push(DrawOp::Area {
            upper: upper.to_vec(),
            baseline,
            fill,
        })
    }

    fn circle(
        &mut self,
        center: (f64, f64),
        radius: f64,
        fill: Option<FillStyle>,
        stroke: Option<StrokeStyle>,
    ) -> Result<(), RenderError> {
        self.push(DrawOp::Circle {
            center,
            radius,
            fill,
            stroke,
        })
    }

    fn text(&mut self, pos: (f64, f64), text: &str, style: TextStyle) -> Result<(), RenderError> {
        self.push(DrawOp::Text {
            pos,
            text: text.to_string(),
            style,
        })
    }
}
