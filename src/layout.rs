//! Plot geometry: single-chart margins and the two-column grid used in show-all mode.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn inset(&self, m: &Margins) -> Rect {
        Rect::new(
            self.x + m.left,
            self.y + m.top,
            self.width - m.left - m.right,
            self.height - m.top - m.bottom,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Room reserved right of the plot for end-of-line labels.
pub const LABEL_GUTTER: f64 = 96.0;
/// Room reserved below the plot for the range slider strip.
pub const SLIDER_STRIP: f64 = 64.0;
pub const GRID_GAP: f64 = 16.0;

pub const SINGLE_MARGINS: Margins = Margins {
    top: 32.0,
    right: 24.0 + LABEL_GUTTER,
    bottom: 28.0 + SLIDER_STRIP,
    left: 56.0,
};

/// Outer margins in grid mode; no label gutter, a taller title band.
pub const GRID_MARGINS: Margins = Margins {
    top: 40.0,
    right: 24.0,
    bottom: 28.0 + SLIDER_STRIP,
    left: 56.0,
};

/// Margins inside each grid cell around its plot.
pub const SUBCHART_MARGINS: Margins = Margins {
    top: 44.0,
    right: 18.0,
    bottom: 34.0,
    left: 54.0,
};

pub const MIN_SINGLE_HEIGHT: f64 = 420.0;
pub const MIN_GRID_HEIGHT: f64 = 520.0;
pub const GRID_ROW_HEIGHT: f64 = 260.0;

/// Preferred canvas height for a viewport: 68% of it, never below the minimum. Grid mode
/// instead grows with the number of rows.
pub fn preferred_height(viewport_height: f64, grid_rows: Option<usize>) -> f64 {
    match grid_rows {
        Some(rows) => MIN_GRID_HEIGHT.max(rows as f64 * GRID_ROW_HEIGHT + 120.0),
        None => MIN_SINGLE_HEIGHT.max(viewport_height * 0.68),
    }
}

/// Canvas split into plot area and slider strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotLayout {
    pub canvas: Rect,
    pub margins: Margins,
    /// Inner area holding the single plot or the whole grid.
    pub inner: Rect,
    /// Slider strip, full inner width, below `inner`.
    pub slider: Rect,
}

impl PlotLayout {
    pub fn single(width: f64, height: f64) -> Self {
        Self::with_margins(width, height, SINGLE_MARGINS)
    }

    pub fn grid(width: f64, height: f64) -> Self {
        Self::with_margins(width, height, GRID_MARGINS)
    }

    fn with_margins(width: f64, height: f64, margins: Margins) -> Self {
        let canvas = Rect::new(0.0, 0.0, width.max(0.0), height.max(0.0));
        let inner = canvas.inset(&margins);
        let slider = Rect::new(inner.x, inner.bottom() + 28.0, inner.width, SLIDER_STRIP - 28.0);
        Self {
            canvas,
            margins,
            inner,
            slider,
        }
    }
}

/// One subchart slot, relative to the grid's inner origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub index: usize,
    pub col: usize,
    pub row: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Last cell in its column; the only one that labels its x axis.
    pub bottom_of_column: bool,
}

impl GridCell {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Plot area inside the cell, after subchart margins.
    pub fn plot_rect(&self) -> Rect {
        self.rect().inset(&SUBCHART_MARGINS)
    }
}

/// Lay `metric_count` subcharts out column-major in two columns (one column for a single
/// metric). The left column takes the extra cell when the count is odd.
pub fn grid_layout(metric_count: usize, inner_width: f64, inner_height: f64) -> Vec<GridCell> {
    if metric_count == 0 {
        return Vec::new();
    }
    let cols = if metric_count > 1 { 2 } else { 1 };
    let left_count = metric_count.div_ceil(cols);
    let right_count = metric_count - left_count;
    let rows = left_count.max(right_count).max(1);

    let col_width = if cols == 2 {
        (inner_width - GRID_GAP) / 2.0
    } else {
        inner_width
    };
    let cell_height = (inner_height - GRID_GAP * (rows as f64 - 1.0)) / rows as f64;

    (0..metric_count)
        .map(|index| {
            let (col, row) = if index < left_count {
                (0, index)
            } else {
                (1, index - left_count)
            };
            let in_col = if col == 0 { left_count } else { right_count };
            GridCell {
                index,
                col,
                row,
                x: col as f64 * (col_width + GRID_GAP),
                y: row as f64 * (cell_height + GRID_GAP),
                width: col_width.max(0.0),
                height: cell_height.max(0.0),
                bottom_of_column: row + 1 == in_col,
            }
        })
        .collect()
}

/// Row count of the grid for `metric_count` subcharts.
pub fn grid_rows(metric_count: usize) -> usize {
    if metric_count <= 1 {
        metric_count
    } else {
        metric_count.div_ceil(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_layout_leaves_label_and_slider_room() {
        let l = PlotLayout::single(1000.0, 600.0);
        assert_eq!(l.inner, Rect::new(56.0, 32.0, 1000.0 - 56.0 - 120.0, 600.0 - 32.0 - 92.0));
        assert!(l.slider.y > l.inner.bottom());
        assert!(l.slider.bottom() <= 600.0);
    }

    #[test]
    fn five_metrics_split_three_two() {
        let cells = grid_layout(5, 816.0, 600.0);
        assert_eq!(cells.len(), 5);
        let cols: Vec<usize> = cells.iter().map(|c| c.col).collect();
        assert_eq!(cols, vec![0, 0, 0, 1, 1]);
        assert_eq!(cells[3].row, 0);
        assert_eq!(cells[0].width, 400.0);
        assert_eq!(cells[3].x, 416.0);
        let h = (600.0 - 32.0) / 3.0;
        assert!((cells[1].y - (h + 16.0)).abs() < 1e-9);
        let bottoms: Vec<usize> = cells
            .iter()
            .filter(|c| c.bottom_of_column)
            .map(|c| c.index)
            .collect();
        assert_eq!(bottoms, vec![2, 4]);
    }

    #[test]
    fn one_metric_single_column() {
        let cells = grid_layout(1, 800.0, 500.0);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].width, 800.0);
        assert_eq!(cells[0].height, 500.0);
        assert!(cells[0].bottom_of_column);
    }

    #[test]
    fn layout_is_deterministic() {
        assert_eq!(grid_layout(4, 700.0, 480.0), grid_layout(4, 700.0, 480.0));
        assert!(grid_layout(0, 700.0, 480.0).is_empty());
    }

    #[test]
    fn preferred_heights() {
        assert_eq!(preferred_height(400.0, None), 420.0);
        assert_eq!(preferred_height(1000.0, None), 680.0);
        assert_eq!(preferred_height(0.0, Some(1)), 520.0);
        assert_eq!(preferred_height(0.0, Some(3)), 900.0);
        assert_eq!(grid_rows(5), 3);
    }
}
