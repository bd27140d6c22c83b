//! Chart rendering: turns a resolved [`ChartFrame`] into drawing calls on any [`Surface`].
//!
//! - Monotone lines broken at gaps, optional area fill down to the plot bottom
//! - Point markers with hover emphasis, end-of-line labels with a remove glyph
//! - Locale-aware axis ticks (`30,000` vs `30.000`), signed percent ticks in YoY mode
//! - Hover rule, tooltip box, range slider strip, latest-value bars
//!
//! Every pass redraws the whole frame; nothing is kept between passes.

pub mod colors;
pub mod curve;
pub mod frame;
pub mod plotters_surface;
pub mod scale;
pub mod surface;
pub mod text;

pub use frame::{ChartFrame, FrameBody, Hit, MessageKind, PanelView, SeriesView};
pub use plotters_surface::render_to_file;
pub use surface::{RecordingSurface, Role, Surface};

use crate::error::RenderError;
use crate::layout::Rect;
use crate::models::SourceInfo;
use colors::{
    BORDER, Color, ERROR, HANDLE, HANDLE_RING, INK, NEUTRAL, RULE, SELECTION, SLATE, TRACK, WHITE,
};
use curve::{clip_polyline, defined_runs, monotone_x};
use frame::{BarView, MessageView, SliderView, TooltipView};
use surface::{Anchor, FillStyle, StrokeStyle, TextStyle};
use text::{estimate_text_width, truncate_to_width};

pub const LINE_WIDTH: f64 = 2.0;
/// Bezier samples per segment when flattening monotone curves.
pub const CURVE_STEPS: usize = 12;
pub const LABEL_FONT: f64 = 11.0;
pub const AXIS_FONT: f64 = 11.0;
pub const TOOLTIP_FONT: f64 = 12.0;
pub const REMOVE_GLYPH: &str = "×";
pub const HOVER_MARKER_RADIUS: f64 = 6.0;

fn group<S: Surface>(
    s: &mut S,
    role: Role,
    draw: impl FnOnce(&mut S) -> Result<(), RenderError>,
) -> Result<(), RenderError> {
    s.begin(role);
    let res = draw(s);
    s.end();
    res
}

/// Draw `frame` onto `s`. A frame with no usable size draws nothing.
pub fn render_frame<S: Surface>(frame: &ChartFrame, s: &mut S) -> Result<(), RenderError> {
    if !Rect::new(0.0, 0.0, frame.width, frame.height).is_drawable() {
        return Ok(());
    }
    match &frame.body {
        FrameBody::Message(m) => draw_message(frame, m, s)?,
        FrameBody::Panels(panels) => {
            for panel in panels {
                draw_panel(panel, s)?;
            }
            if let Some(t) = &frame.tooltip
                && let Some(panel) = panels.get(t.panel)
            {
                draw_hover(panel, t, s)?;
            }
        }
        FrameBody::Bars(bars) => draw_bars(bars, s)?,
    }
    if let Some(slider) = &frame.slider {
        draw_slider(slider, s)?;
    }
    draw_attributions(frame, s)
}

fn draw_message<S: Surface>(
    frame: &ChartFrame,
    m: &MessageView,
    s: &mut S,
) -> Result<(), RenderError> {
    let color = match m.kind {
        MessageKind::Error => ERROR,
        MessageKind::Loading | MessageKind::Empty => NEUTRAL,
    };
    group(s, Role::Message, |s| {
        s.text(
            (frame.width / 2.0, frame.height / 2.0),
            &m.text,
            TextStyle::new(13.0, color).anchor(Anchor::Middle),
        )
    })
}

fn draw_panel<S: Surface>(p: &PanelView, s: &mut S) -> Result<(), RenderError> {
    if !p.plot.is_drawable() {
        return Ok(());
    }
    let (title_y, title_px) = if p.compact {
        (p.plot.y - 24.0, 12.0)
    } else {
        (p.plot.y - 16.0, 14.0)
    };
    let title = truncate_to_width(&p.title, title_px, p.plot.width);
    group(s, Role::Title, |s| {
        s.text((p.plot.x, title_y), &title, TextStyle::new(title_px, INK).bold())
    })?;

    draw_axes(p, s)?;

    if p.with_area {
        for sv in &p.series {
            let fill = FillStyle::new(sv.color, p.area_opacity(sv.hidden));
            group(s, Role::Area(sv.key), |s| {
                for curve in series_curves(p, sv) {
                    if curve.len() < 2 {
                        continue;
                    }
                    let upper: Vec<(f64, f64)> = curve
                        .iter()
                        .map(|&(x, y)| {
                            (
                                x.clamp(p.plot.x, p.plot.right()),
                                y.clamp(p.plot.y, p.plot.bottom()),
                            )
                        })
                        .collect();
                    s.area(&upper, p.plot.bottom(), fill)?;
                }
                Ok(())
            })?;
        }
    }

    for sv in &p.series {
        let stroke = StrokeStyle::new(sv.color, LINE_WIDTH).opacity(p.line_opacity(sv.hidden));
        group(s, Role::Line(sv.key), |s| {
            for curve in series_curves(p, sv) {
                for piece in clip_polyline(&curve, &p.plot) {
                    s.polyline(&piece, stroke)?;
                }
            }
            Ok(())
        })?;
    }

    for sv in &p.series {
        let opacity = p.marker_opacity(sv.hidden);
        group(s, Role::Markers(sv.key), |s| {
            for pt in &sv.points {
                let Some(v) = pt.finite() else { continue };
                let c = (p.x.map(pt.year as f64), p.y.map(v));
                if !p.plot.contains(c.0, c.1) {
                    continue;
                }
                let hot = p.hover_year == Some(pt.year);
                let fill = if hot { sv.color } else { WHITE };
                let width = if hot { 2.0 } else { 1.5 };
                s.circle(
                    c,
                    p.marker_radius(hot),
                    Some(FillStyle::new(fill, opacity)),
                    Some(StrokeStyle::new(sv.color, width).opacity(opacity)),
                )?;
            }
            Ok(())
        })?;
    }

    for sv in &p.series {
        let Some(b) = &sv.label_box else { continue };
        let opacity = p.label_opacity(sv.hidden);
        group(s, Role::Label(sv.key), |s| {
            s.text(
                b.anchor,
                &sv.label,
                TextStyle::new(LABEL_FONT, sv.color).bold().opacity(opacity),
            )
        })?;
        group(s, Role::Remove(sv.key), |s| {
            s.text(
                (b.remove_rect.x, b.anchor.1),
                REMOVE_GLYPH,
                TextStyle::new(LABEL_FONT + 1.0, SLATE).bold().opacity(opacity),
            )
        })?;
    }
    Ok(())
}

/// Screen-space curves of one series: one per run of defined points.
fn series_curves(p: &PanelView, sv: &SeriesView) -> Vec<Vec<(f64, f64)>> {
    let projected: Vec<(f64, Option<f64>)> = sv
        .points
        .iter()
        .map(|pt| (p.x.map(pt.year as f64), pt.finite().map(|v| p.y.map(v))))
        .collect();
    defined_runs(&projected)
        .into_iter()
        .map(|run| monotone_x(&run, CURVE_STEPS))
        .collect()
}

/// Whole-year ticks of the x scale.
pub fn year_ticks(p: &PanelView) -> Vec<i32> {
    p.x.ticks(p.x_ticks)
        .into_iter()
        .filter(|t| t.fract().abs() < 1e-9)
        .map(|t| t.round() as i32)
        .collect()
}

fn draw_value_axis<S: Surface>(
    plot: &Rect,
    y: &scale::LinearScale,
    count: usize,
    format: impl Fn(f64) -> String,
    s: &mut S,
) -> Result<(), RenderError> {
    let grid = StrokeStyle::new(BORDER, 1.0);
    let label = TextStyle::new(AXIS_FONT, SLATE).anchor(Anchor::End);
    for t in y.ticks(count) {
        let py = y.map(t);
        if !py.is_finite() || py < plot.y - 0.5 || py > plot.bottom() + 0.5 {
            continue;
        }
        s.polyline(&[(plot.x, py), (plot.right(), py)], grid)?;
        s.text((plot.x - 8.0, py), &format(t), label)?;
    }
    Ok(())
}

fn draw_axes<S: Surface>(p: &PanelView, s: &mut S) -> Result<(), RenderError> {
    group(s, Role::Axis, |s| {
        draw_value_axis(&p.plot, &p.y, p.y_ticks, |t| p.display.format_axis(t), s)?;
        let bottom = p.plot.bottom();
        s.polyline(
            &[(p.plot.x, bottom), (p.plot.right(), bottom)],
            StrokeStyle::new(TRACK, 1.0),
        )?;
        let label = TextStyle::new(AXIS_FONT, SLATE).anchor(Anchor::Middle);
        for year in year_ticks(p) {
            let px = p.x.map(year as f64);
            s.polyline(&[(px, bottom), (px, bottom + 5.0)], StrokeStyle::new(TRACK, 1.0))?;
            if p.show_x_labels {
                s.text((px, bottom + 16.0), &year.to_string(), label)?;
            }
        }
        Ok(())
    })
}

/// Dashes of `on` px separated by `off` px along a vertical line.
fn vertical_dashes(x: f64, y0: f64, y1: f64, on: f64, off: f64) -> Vec<[(f64, f64); 2]> {
    let mut out = Vec::new();
    let mut y = y0;
    while y < y1 {
        out.push([(x, y), (x, (y + on).min(y1))]);
        y += on + off;
    }
    out
}

fn draw_hover<S: Surface>(p: &PanelView, t: &TooltipView, s: &mut S) -> Result<(), RenderError> {
    group(s, Role::HoverRule, |s| {
        let rule = StrokeStyle::new(RULE, 1.0);
        for dash in vertical_dashes(t.rule_x, p.plot.y, p.plot.bottom(), 3.0, 3.0) {
            s.polyline(&dash, rule)?;
        }
        for row in &t.rows {
            s.circle(
                row.point,
                HOVER_MARKER_RADIUS,
                Some(FillStyle::solid(WHITE)),
                Some(StrokeStyle::new(row.color, 2.0)),
            )?;
        }
        Ok(())
    })?;

    group(s, Role::Tooltip, |s| {
        let pad = 10.0;
        let line_h = 16.0;
        let widest = t
            .rows
            .iter()
            .map(|r| {
                estimate_text_width(&r.label, TOOLTIP_FONT).max(60.0)
                    + estimate_text_width(&r.text, TOOLTIP_FONT)
                    + 28.0
            })
            .fold(estimate_text_width(&t.header, TOOLTIP_FONT), f64::max);
        let w = (widest + 2.0 * pad).min(crate::interaction::TOOLTIP_WIDTH);
        let h = pad * 2.0 + 18.0 + line_h * t.rows.len() as f64;
        let (x, y) = t.anchor;
        s.rect(
            Rect::new(x, y, w, h),
            Some(FillStyle::new(WHITE, 0.95)),
            Some(StrokeStyle::new(BORDER, 1.0)),
        )?;
        s.text(
            (x + pad, y + pad + 7.0),
            &t.header,
            TextStyle::new(TOOLTIP_FONT, INK).bold(),
        )?;
        for (i, row) in t.rows.iter().enumerate() {
            let ry = y + pad + 18.0 + line_h * i as f64 + line_h / 2.0;
            s.rect(
                Rect::new(x + pad, ry - 5.0, 10.0, 10.0),
                Some(FillStyle::solid(row.color)),
                None,
            )?;
            s.text(
                (x + pad + 16.0, ry),
                &row.label,
                TextStyle::new(TOOLTIP_FONT, INK),
            )?;
            s.text(
                (x + w - pad, ry),
                &row.text,
                TextStyle::new(TOOLTIP_FONT, INK).bold().anchor(Anchor::End),
            )?;
        }
        Ok(())
    })
}

fn draw_slider<S: Surface>(v: &SliderView, s: &mut S) -> Result<(), RenderError> {
    if !v.strip.is_drawable() {
        return Ok(());
    }
    let cy = v.track_y();
    group(s, Role::Slider, |s| {
        let (t0, t1) = v.track;
        s.rect(
            Rect::new(t0, cy - 4.0, (t1 - t0).max(0.0), 8.0),
            Some(FillStyle::solid(TRACK)),
            None,
        )?;
        let (h0, h1) = v.handles;
        s.rect(
            Rect::new(h0.min(h1), cy - 3.0, (h1 - h0).abs(), 6.0),
            Some(FillStyle::solid(SELECTION)),
            None,
        )?;
        for hx in [h0, h1] {
            s.circle(
                (hx, cy),
                8.0,
                Some(FillStyle::solid(HANDLE)),
                Some(StrokeStyle::new(HANDLE_RING, 2.0)),
            )?;
        }
        Ok(())
    })?;

    let Some(tip) = v.tip else { return Ok(()) };
    let px = v.strip.x + tip.px;
    group(s, Role::SliderTip, |s| {
        s.rect(
            Rect::new(px - 22.0, cy + 18.0, 44.0, 18.0),
            Some(FillStyle::solid(WHITE)),
            Some(StrokeStyle::new(BORDER, 1.0)),
        )?;
        s.text(
            (px, cy + 27.0),
            &tip.year.to_string(),
            TextStyle::new(LABEL_FONT, INK).bold().anchor(Anchor::Middle),
        )
    })
}

fn draw_bars<S: Surface>(b: &BarView, s: &mut S) -> Result<(), RenderError> {
    if !b.plot.is_drawable() {
        return Ok(());
    }
    group(s, Role::Title, |s| {
        s.text(
            (b.plot.x + b.plot.width / 2.0, b.plot.y - 16.0),
            &b.title,
            TextStyle::new(14.0, INK).bold().anchor(Anchor::Middle),
        )
    })?;
    if let Some(text) = &b.empty_text {
        return group(s, Role::Message, |s| {
            s.text(
                (b.plot.x + b.plot.width / 2.0, b.plot.y + b.plot.height / 2.0),
                text,
                TextStyle::new(13.0, NEUTRAL).anchor(Anchor::Middle),
            )
        });
    }
    let base = b.y.map(0.0);
    group(s, Role::Axis, |s| {
        draw_value_axis(&b.plot, &b.y, b.y_ticks, |t| b.display.format_axis(t), s)?;
        s.polyline(
            &[(b.plot.x, base), (b.plot.right(), base)],
            StrokeStyle::new(TRACK, 1.0),
        )
    })?;
    for bar in &b.bars {
        let (fill_opacity, text_opacity) = if bar.hidden { (0.25, 0.45) } else { (1.0, 1.0) };
        let tick_color: Color = if bar.hidden { RULE } else { bar.color };
        let cx = bar.rect.x + bar.rect.width / 2.0;
        // negative bars hang below the baseline, so their value sits underneath
        let value_y = if bar.value < 0.0 {
            bar.rect.bottom() + 10.0
        } else {
            bar.rect.y - 8.0
        };
        group(s, Role::Bar(bar.key), |s| {
            s.rect(bar.rect, Some(FillStyle::new(bar.color, fill_opacity)), None)?;
            s.text(
                (cx, value_y),
                &b.display.format_tooltip(bar.value),
                TextStyle::new(LABEL_FONT, INK)
                    .bold()
                    .anchor(Anchor::Middle)
                    .opacity(text_opacity),
            )?;
            s.text(
                (cx, b.plot.bottom() + 14.0),
                &bar.label,
                TextStyle::new(10.0, tick_color)
                    .anchor(Anchor::Middle)
                    .opacity(if bar.hidden { 0.6 } else { 1.0 }),
            )
        })?;
    }
    Ok(())
}

/// `"Source: Moody's · S&P Global Market Intelligence"`.
pub fn attribution_text(sources: &[SourceInfo]) -> Option<String> {
    if sources.is_empty() {
        return None;
    }
    let labels: Vec<&str> = sources.iter().map(|s| s.label.as_str()).collect();
    Some(format!("Source: {}", labels.join(" · ")))
}

fn draw_attributions<S: Surface>(frame: &ChartFrame, s: &mut S) -> Result<(), RenderError> {
    let Some(text) = attribution_text(&frame.attributions) else {
        return Ok(());
    };
    group(s, Role::Attribution, |s| {
        s.text(
            (12.0, frame.height - 10.0),
            &text,
            TextStyle::new(AXIS_FONT, SLATE),
        )
    })
}
