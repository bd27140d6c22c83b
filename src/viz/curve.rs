//! Line geometry: gap-aware runs, monotone cubic interpolation and rectangle clipping.

use crate::layout::Rect;

pub type Pt = (f64, f64);

/// Split `points` into runs of consecutive defined points. A `None` (or non-finite) y breaks
/// the line; nothing is interpolated across it.
pub fn defined_runs(points: &[(f64, Option<f64>)]) -> Vec<Vec<Pt>> {
    let mut runs = Vec::new();
    let mut cur: Vec<Pt> = Vec::new();
    for &(x, y) in points {
        match y.filter(|v| v.is_finite()) {
            Some(y) if x.is_finite() => cur.push((x, y)),
            _ => {
                if !cur.is_empty() {
                    runs.push(std::mem::take(&mut cur));
                }
            }
        }
    }
    if !cur.is_empty() {
        runs.push(cur);
    }
    runs
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Tangent at the middle of three points (Steffen's method).
fn slope3(p0: Pt, p1: Pt, p2: Pt) -> f64 {
    let h0 = p1.0 - p0.0;
    let h1 = p2.0 - p1.0;
    let s0 = if h0 != 0.0 {
        (p1.1 - p0.1) / h0
    } else {
        0.0
    };
    let s1 = if h1 != 0.0 {
        (p2.1 - p1.1) / h1
    } else {
        0.0
    };
    let p = if h0 + h1 != 0.0 {
        (s0 * h1 + s1 * h0) / (h0 + h1)
    } else {
        0.0
    };
    let t = (sign(s0) + sign(s1)) * s0.abs().min(s1.abs()).min(0.5 * p.abs());
    if t.is_finite() { t } else { 0.0 }
}

/// End tangent from the neighbouring tangent.
fn slope2(p0: Pt, p1: Pt, t: f64) -> f64 {
    let h = p1.0 - p0.0;
    if h != 0.0 {
        (3.0 * (p1.1 - p0.1) / h - t) / 2.0
    } else {
        t
    }
}

/// Monotone-in-x cubic through `points`, flattened into a polyline with `steps` samples per
/// segment. The curve never overshoots between two data points.
pub fn monotone_x(points: &[Pt], steps: usize) -> Vec<Pt> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut tangents = vec![0.0; n];
    for i in 1..n - 1 {
        tangents[i] = slope3(points[i - 1], points[i], points[i + 1]);
    }
    tangents[0] = slope2(points[0], points[1], tangents[1]);
    tangents[n - 1] = slope2(points[n - 2], points[n - 1], tangents[n - 2]);

    let steps = steps.max(1);
    let mut out = Vec::with_capacity((n - 1) * steps + 1);
    out.push(points[0]);
    for i in 0..n - 1 {
        let (x0, y0) = points[i];
        let (x1, y1) = points[i + 1];
        let dx = (x1 - x0) / 3.0;
        let c1 = (x0 + dx, y0 + dx * tangents[i]);
        let c2 = (x1 - dx, y1 - dx * tangents[i + 1]);
        for s in 1..=steps {
            let t = s as f64 / steps as f64;
            let u = 1.0 - t;
            let b0 = u * u * u;
            let b1 = 3.0 * u * u * t;
            let b2 = 3.0 * u * t * t;
            let b3 = t * t * t;
            out.push((
                b0 * x0 + b1 * c1.0 + b2 * c2.0 + b3 * x1,
                b0 * y0 + b1 * c1.1 + b2 * c2.1 + b3 * y1,
            ));
        }
    }
    out
}

/// Liang–Barsky: the part of segment `a`→`b` inside `r`.
pub fn clip_segment(a: Pt, b: Pt, r: &Rect) -> Option<(Pt, Pt)> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    let checks = [
        (-dx, a.0 - r.x),
        (dx, r.right() - a.0),
        (-dy, a.1 - r.y),
        (dy, r.bottom() - a.1),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                if t > t1 {
                    return None;
                }
                t0 = t0.max(t);
            } else {
                if t < t0 {
                    return None;
                }
                t1 = t1.min(t);
            }
        }
    }
    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

/// Clip a polyline to `r`, splitting it wherever it leaves the rectangle.
pub fn clip_polyline(points: &[Pt], r: &Rect) -> Vec<Vec<Pt>> {
    let mut out: Vec<Vec<Pt>> = Vec::new();
    let mut cur: Vec<Pt> = Vec::new();
    if points.len() == 1 {
        if r.contains(points[0].0, points[0].1) {
            out.push(points.to_vec());
        }
        return out;
    }
    for w in points.windows(2) {
        match clip_segment(w[0], w[1], r) {
            Some((p, q)) => {
                let joins = cur
                    .last()
                    .is_some_and(|l| (l.0 - p.0).abs() < 1e-9 && (l.1 - p.1).abs() < 1e-9);
                if !joins {
                    if cur.len() > 1 {
                        out.push(std::mem::take(&mut cur));
                    }
                    cur.clear();
                    cur.push(p);
                }
                cur.push(q);
            }
            None => {
                if cur.len() > 1 {
                    out.push(std::mem::take(&mut cur));
                }
                cur.clear();
            }
        }
    }
    if cur.len() > 1 {
        out.push(cur);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_split_runs() {
        let runs = defined_runs(&[
            (0.0, Some(1.0)),
            (1.0, Some(2.0)),
            (2.0, None),
            (3.0, Some(f64::NAN)),
            (4.0, Some(5.0)),
        ]);
        assert_eq!(runs, vec![vec![(0.0, 1.0), (1.0, 2.0)], vec![(4.0, 5.0)]]);
    }

    #[test]
    fn monotone_does_not_overshoot() {
        let pts = [(0.0, 0.0), (1.0, 10.0), (2.0, 10.0), (3.0, 0.0)];
        let curve = monotone_x(&pts, 16);
        assert_eq!(curve.first(), Some(&(0.0, 0.0)));
        assert_eq!(curve.last(), Some(&(3.0, 0.0)));
        assert!(curve.iter().all(|p| p.1 <= 10.0 + 1e-9 && p.1 >= -1e-9));
        assert!(curve.windows(2).all(|w| w[1].0 >= w[0].0));
    }

    #[test]
    fn two_points_stay_straight() {
        let pts = [(0.0, 0.0), (1.0, 1.0)];
        assert_eq!(monotone_x(&pts, 8), pts.to_vec());
    }

    #[test]
    fn clip_splits_on_exit() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let line = [(1.0, 5.0), (5.0, 20.0), (9.0, 5.0)];
        let parts = clip_polyline(&line, &r);
        assert_eq!(parts.len(), 2);
        for part in &parts {
            assert!(part.iter().all(|p| r.contains(p.0, p.1 - 1e-9)));
        }
        assert!(clip_segment((-5.0, -5.0), (-1.0, -1.0), &r).is_none());
        let inside = clip_polyline(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)], &r);
        assert_eq!(inside, vec![vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]]);
    }
}
