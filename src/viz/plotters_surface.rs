//! [`Surface`] over a plotters drawing area, plus file output to **SVG** or **PNG**.

use std::path::{Path, PathBuf};
use std::sync::Once;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontFamily, FontStyle};
use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;

use super::colors::Color as RgbColor;
use super::render_frame;
use super::surface::{Anchor, FillStyle, StrokeStyle, Surface, TextStyle as SurfaceText};
use super::frame::ChartFrame;
use crate::error::RenderError;
use crate::layout::Rect;

/// Env var pointing at a TTF/OTF file used for PNG text.
pub const FONT_ENV: &str = "MDBI_FONT";

const FONT_CANDIDATES: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// One-time registration of a "sans-serif" font for the `ab_glyph` text path, which does not
/// discover OS fonts. SVG output does not need it.
static INIT_FONTS: Once = Once::new();

fn ensure_fonts_registered() {
    INIT_FONTS.call_once(|| {
        let candidates = std::env::var_os(FONT_ENV)
            .map(PathBuf::from)
            .into_iter()
            .chain(FONT_CANDIDATES.iter().map(PathBuf::from));
        for path in candidates {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            let normal = plotters::style::register_font("sans-serif", FontStyle::Normal, bytes);
            let bold = plotters::style::register_font("sans-serif", FontStyle::Bold, bytes);
            if normal.is_ok() && bold.is_ok() {
                log::debug!("registered chart font {}", path.display());
                return;
            }
        }
        log::warn!("no usable font found for PNG text; set {FONT_ENV} to a .ttf file");
    });
}

fn rgb(c: RgbColor) -> RGBColor {
    RGBColor(c.r, c.g, c.b)
}

fn px(p: (f64, f64)) -> (i32, i32) {
    (p.0.round() as i32, p.1.round() as i32)
}

fn backend_err<E: std::fmt::Debug>(e: E) -> RenderError {
    RenderError::Backend(format!("{e:?}"))
}

pub struct PlottersSurface<'a, DB: DrawingBackend> {
    area: &'a DrawingArea<DB, Shift>,
}

impl<'a, DB: DrawingBackend> PlottersSurface<'a, DB> {
    pub fn new(area: &'a DrawingArea<DB, Shift>) -> Self {
        Self { area }
    }

    fn stroke(s: StrokeStyle) -> ShapeStyle {
        rgb(s.color)
            .mix(s.opacity)
            .stroke_width(s.width.round().max(1.0) as u32)
    }

    fn fill(f: FillStyle) -> ShapeStyle {
        rgb(f.color).mix(f.opacity).filled()
    }
}

impl<DB: DrawingBackend> Surface for PlottersSurface<'_, DB> {
    fn rect(
        &mut self,
        rect: Rect,
        fill: Option<FillStyle>,
        stroke: Option<StrokeStyle>,
    ) -> Result<(), RenderError> {
        let corners = [px((rect.x, rect.y)), px((rect.right(), rect.bottom()))];
        if let Some(f) = fill {
            self.area
                .draw(&Rectangle::new(corners, Self::fill(f)))
                .map_err(backend_err)?;
        }
        if let Some(s) = stroke {
            self.area
                .draw(&Rectangle::new(corners, Self::stroke(s)))
                .map_err(backend_err)?;
        }
        Ok(())
    }

    fn polyline(&mut self, points: &[(f64, f64)], stroke: StrokeStyle) -> Result<(), RenderError> {
        if points.len() < 2 {
            return Ok(());
        }
        let path: Vec<(i32, i32)> = points.iter().copied().map(px).collect();
        self.area
            .draw(&PathElement::new(path, Self::stroke(stroke)))
            .map_err(backend_err)
    }

    fn area(
        &mut self,
        upper: &[(f64, f64)],
        baseline: f64,
        fill: FillStyle,
    ) -> Result<(), RenderError> {
        let (Some(first), Some(last)) = (upper.first(), upper.last()) else {
            return Ok(());
        };
        let mut poly: Vec<(i32, i32)> = upper.iter().copied().map(px).collect();
        poly.push(px((last.0, baseline)));
        poly.push(px((first.0, baseline)));
        self.area
            .draw(&Polygon::new(poly, Self::fill(fill)))
            .map_err(backend_err)
    }

    fn circle(
        &mut self,
        center: (f64, f64),
        radius: f64,
        fill: Option<FillStyle>,
        stroke: Option<StrokeStyle>,
    ) -> Result<(), RenderError> {
        let c = px(center);
        let r = radius.round().max(1.0) as i32;
        if let Some(f) = fill {
            self.area
                .draw(&Circle::new(c, r, Self::fill(f)))
                .map_err(backend_err)?;
        }
        if let Some(s) = stroke {
            self.area
                .draw(&Circle::new(c, r, Self::stroke(s)))
                .map_err(backend_err)?;
        }
        Ok(())
    }

    fn text(&mut self, pos: (f64, f64), text: &str, style: SurfaceText) -> Result<(), RenderError> {
        if text.is_empty() {
            return Ok(());
        }
        let h = match style.anchor {
            Anchor::Start => HPos::Left,
            Anchor::Middle => HPos::Center,
            Anchor::End => HPos::Right,
        };
        let weight = if style.bold {
            FontStyle::Bold
        } else {
            FontStyle::Normal
        };
        let color = rgb(style.color).mix(style.opacity);
        let font = TextStyle::from((FontFamily::SansSerif, style.size, weight))
            .color(&color)
            .pos(Pos::new(h, VPos::Center));
        self.area
            .draw(&Text::new(text.to_string(), px(pos), font))
            .map_err(backend_err)
    }
}

fn draw_on<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    frame: &ChartFrame,
) -> Result<(), RenderError> {
    root.fill(&WHITE).map_err(backend_err)?;
    render_frame(frame, &mut PlottersSurface::new(&root))?;
    root.present().map_err(backend_err)
}

/// Render `frame` to `path`; the extension picks the backend (`.svg` or `.png`).
pub fn render_to_file(frame: &ChartFrame, path: impl AsRef<Path>) -> Result<(), RenderError> {
    let path = path.as_ref();
    let (w, h) = (frame.width.round(), frame.height.round());
    if !(w >= 1.0 && h >= 1.0 && w.is_finite() && h.is_finite()) {
        return Err(RenderError::InvalidSize {
            width: w.max(0.0) as u32,
            height: h.max(0.0) as u32,
        });
    }
    let size = (w as u32, h as u32);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("svg") => draw_on(SVGBackend::new(path, size).into_drawing_area(), frame),
        Some("png") => {
            ensure_fonts_registered();
            draw_on(BitMapBackend::new(path, size).into_drawing_area(), frame)
        }
        _ => Err(RenderError::UnsupportedFormat(path.to_path_buf())),
    }
}
