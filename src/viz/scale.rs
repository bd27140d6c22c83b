//! Continuous and band scales in the d3 manner: linear mapping, inversion, `nice()` bounds
//! and round-number ticks.

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

/// Linear scale from a data domain to a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
    clamp: bool,
}

impl Default for LinearScale {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearScale {
    pub fn new() -> Self {
        Self {
            domain: (0.0, 1.0),
            range: (0.0, 1.0),
            clamp: false,
        }
    }

    pub fn domain(mut self, a: f64, b: f64) -> Self {
        self.domain = (a, b);
        self
    }

    pub fn range(mut self, a: f64, b: f64) -> Self {
        self.range = (a, b);
        self
    }

    pub fn clamp(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn domain_bounds(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range_bounds(&self) -> (f64, f64) {
        self.range
    }

    /// Domain value to range. A zero-width domain maps to the middle of the range.
    pub fn map(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        let mut t = (v - d0) / (d1 - d0);
        if self.clamp {
            t = t.clamp(0.0, 1.0);
        }
        r0 + t * (r1 - r0)
    }

    /// Range value back to the domain.
    pub fn invert(&self, px: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return (d0 + d1) / 2.0;
        }
        let mut t = (px - r0) / (r1 - r0);
        if self.clamp {
            t = t.clamp(0.0, 1.0);
        }
        d0 + t * (d1 - d0)
    }

    /// Extend the domain outward to round tick boundaries.
    pub fn nice(mut self, count: usize) -> Self {
        let (mut start, mut stop) = self.domain;
        let reversed = stop < start;
        if reversed {
            std::mem::swap(&mut start, &mut stop);
        }
        let mut prev_step: Option<f64> = None;
        for _ in 0..10 {
            let step = tick_increment(start, stop, count as f64);
            if prev_step == Some(step) {
                break;
            }
            if step > 0.0 {
                start = (start / step).floor() * step;
                stop = (stop / step).ceil() * step;
            } else if step < 0.0 {
                start = (start * step).ceil() / step;
                stop = (stop * step).floor() / step;
            } else {
                break;
            }
            prev_step = Some(step);
        }
        self.domain = if reversed { (stop, start) } else { (start, stop) };
        self
    }

    /// Round-number ticks inside the domain.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (a, b) = self.domain;
        ticks(a.min(b), a.max(b), count as f64)
    }
}

fn tick_spec(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };
    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let inv = 10f64.powf(-power) / factor;
        i1 = (start * inv).round();
        i2 = (stop * inv).round();
        if i1 / inv < start {
            i1 += 1.0;
        }
        if i2 / inv > stop {
            i2 -= 1.0;
        }
        inc = -inv;
    } else {
        let step = 10f64.powf(power) * factor;
        i1 = (start / step).round();
        i2 = (stop / step).round();
        if i1 * step < start {
            i1 += 1.0;
        }
        if i2 * step > stop {
            i2 -= 1.0;
        }
        inc = step;
    }
    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    (i1, i2, inc)
}

/// Step between ticks; negative values encode the reciprocal of a sub-unit step.
fn tick_increment(start: f64, stop: f64, count: f64) -> f64 {
    if !(count > 0.0) || !start.is_finite() || !stop.is_finite() || stop <= start {
        return 0.0;
    }
    tick_spec(start, stop, count).2
}

fn ticks(start: f64, stop: f64, count: f64) -> Vec<f64> {
    if !(count > 0.0) || !start.is_finite() || !stop.is_finite() {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let (i1, i2, inc) = tick_spec(start, stop, count);
    if !(i2 >= i1) {
        return Vec::new();
    }
    let n = (i2 - i1 + 1.0) as usize;
    (0..n)
        .map(|i| {
            let k = i1 + i as f64;
            if inc < 0.0 { k / -inc } else { k * inc }
        })
        .collect()
}

/// Evenly spaced bands with uniform padding, for categorical bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandScale {
    count: usize,
    range: (f64, f64),
    padding: f64,
}

impl BandScale {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            range: (0.0, 1.0),
            padding: 0.0,
        }
    }

    pub fn range(mut self, a: f64, b: f64) -> Self {
        self.range = (a, b);
        self
    }

    pub fn padding(mut self, p: f64) -> Self {
        self.padding = p.clamp(0.0, 1.0);
        self
    }

    pub fn step(&self) -> f64 {
        let n = self.count as f64;
        let denom = (n - self.padding + 2.0 * self.padding).max(1.0);
        (self.range.1 - self.range.0) / denom
    }

    pub fn bandwidth(&self) -> f64 {
        self.step() * (1.0 - self.padding)
    }

    /// Left edge of band `i`.
    pub fn position(&self, i: usize) -> f64 {
        self.range.0 + self.step() * (self.padding + i as f64)
    }

    pub fn center(&self, i: usize) -> f64 {
        self.position(i) + self.bandwidth() / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_and_invert() {
        let s = LinearScale::new().domain(2014.0, 2024.0).range(0.0, 100.0);
        assert_eq!(s.map(2019.0), 50.0);
        assert_eq!(s.invert(50.0), 2019.0);
        let flat = LinearScale::new().domain(5.0, 5.0).range(0.0, 100.0);
        assert_eq!(flat.map(5.0), 50.0);
    }

    #[test]
    fn nice_rounds_outward() {
        let s = LinearScale::new().domain(0.13, 9.7).nice(10);
        assert_eq!(s.domain_bounds(), (0.0, 10.0));
        let s = LinearScale::new().domain(-3.2, 41.8).nice(10);
        assert_eq!(s.domain_bounds(), (-5.0, 45.0));
    }

    #[test]
    fn ticks_are_round() {
        let s = LinearScale::new().domain(0.0, 10.0);
        assert_eq!(s.ticks(5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        let s = LinearScale::new().domain(2014.0, 2023.0);
        assert_eq!(s.ticks(10).len(), 10);
        let s = LinearScale::new().domain(0.0, 1.0);
        assert_eq!(s.ticks(2), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn band_scale_padding() {
        let b = BandScale::new(4).range(0.0, 100.0).padding(0.25);
        assert!((b.step() - 100.0 / 4.25).abs() < 1e-9);
        assert!((b.bandwidth() - b.step() * 0.75).abs() < 1e-9);
        assert!(b.position(0) > 0.0);
        assert!(b.position(3) + b.bandwidth() < 100.0 + 1e-9);
    }
}
