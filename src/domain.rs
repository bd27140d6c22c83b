//! Year domains: the global bounds of loaded data and the user's view window inside them.

use serde::{Deserialize, Serialize};

/// Inclusive year range. Constructors keep `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// Build a range, swapping inverted bounds.
    pub fn new(a: i32, b: i32) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }

    pub fn span(&self) -> i32 {
        self.end - self.start
    }
}

impl std::fmt::Display for YearRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Clamp both ends of `current` into `global`, swapping if the result is inverted.
pub fn clamp_view_window(current: YearRange, global: YearRange) -> YearRange {
    let a = current.start.clamp(global.start, global.end);
    let b = current.end.clamp(global.start, global.end);
    YearRange::new(a, b)
}

fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Value-axis domain before `nice()`.
///
/// Uses the extent of `visible` (visible series clipped to the window), else of `fallback`,
/// else `[0, 1]`. A single-valued extent is padded by 5% of its magnitude (at least 1); then
/// 10% of the span is added above the maximum.
pub fn value_domain(
    visible: impl IntoIterator<Item = f64>,
    fallback: impl IntoIterator<Item = f64>,
) -> (f64, f64) {
    let (mut lo, mut hi) = extent(visible)
        .or_else(|| extent(fallback))
        .unwrap_or((0.0, 1.0));
    if lo == hi {
        let pad = (lo.abs() * 0.05).max(1.0);
        lo -= pad;
        hi += pad;
    }
    let span = hi - lo;
    (lo, hi + span * 0.1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainResolver {
    /// Lower bound of the global domain whenever data continues past it.
    pub preferred_start: i32,
}

impl DomainResolver {
    pub fn new(preferred_start: i32) -> Self {
        Self { preferred_start }
    }

    /// Bounds of the loaded years with the preferred start applied as a floor.
    ///
    /// When all data ends before the preferred start, the domain collapses onto the
    /// latest year rather than reaching back. `None` when there are no years at all.
    pub fn resolve_global_domain(&self, years: impl IntoIterator<Item = i32>) -> Option<YearRange> {
        let mut it = years.into_iter();
        let first = it.next()?;
        let (raw_min, raw_max) = it.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        let start = raw_min.max(self.preferred_start).min(raw_max);
        Some(YearRange::new(start, raw_max))
    }

    /// Initial view window for freshly loaded data: the whole resolved domain.
    pub fn default_window(&self, global: YearRange) -> YearRange {
        global
    }

    /// Keep `current` if set (clamped), otherwise seed the default window.
    pub fn reconcile(&self, current: Option<YearRange>, global: YearRange) -> YearRange {
        match current {
            Some(c) => clamp_view_window(c, global),
            None => self.default_window(global),
        }
    }
}

impl Default for DomainResolver {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PREFERRED_START_YEAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_start_is_a_floor() {
        let r = DomainResolver::new(2014);
        assert_eq!(
            r.resolve_global_domain(2000..=2023),
            Some(YearRange::new(2014, 2023))
        );
        assert_eq!(
            r.resolve_global_domain([2016, 2019]),
            Some(YearRange::new(2016, 2019))
        );
    }

    #[test]
    fn old_data_collapses_to_latest_year() {
        let r = DomainResolver::new(2014);
        assert_eq!(
            r.resolve_global_domain([2005, 2010]),
            Some(YearRange::new(2010, 2010))
        );
        assert_eq!(r.resolve_global_domain(std::iter::empty()), None);
    }

    #[test]
    fn clamp_swaps_and_is_idempotent() {
        let g = YearRange::new(2014, 2023);
        let cur = YearRange {
            start: 2030,
            end: 2010,
        };
        let once = clamp_view_window(cur, g);
        assert_eq!(once, YearRange::new(2014, 2023));
        assert_eq!(clamp_view_window(once, g), once);

        for a in 2005..2030 {
            for b in 2005..2030 {
                let c = clamp_view_window(YearRange { start: a, end: b }, g);
                assert!(c.start <= c.end);
                assert!(g.contains(c.start) && g.contains(c.end));
                assert_eq!(clamp_view_window(c, g), c);
            }
        }
    }

    #[test]
    fn value_domain_headroom_and_padding() {
        const NONE: [f64; 0] = [];
        assert_eq!(value_domain([0.0, 10.0], NONE), (0.0, 11.0));
        let (lo, hi) = value_domain([f64::NAN], [2.0, 4.0]);
        assert_eq!(lo, 2.0);
        assert!((hi - 4.2).abs() < 1e-9);
        let (lo, hi) = value_domain(NONE, NONE);
        assert_eq!(lo, 0.0);
        assert!((hi - 1.1).abs() < 1e-9);
        let (lo, hi) = value_domain([100.0], NONE);
        assert_eq!(lo, 95.0);
        assert!((hi - 106.0).abs() < 1e-9);
        let (lo, hi) = value_domain([0.0], NONE);
        assert_eq!(lo, -1.0);
        assert!((hi - 1.2).abs() < 1e-9);
    }

    #[test]
    fn reconcile_keeps_user_window() {
        let r = DomainResolver::new(2014);
        let g = YearRange::new(2014, 2023);
        assert_eq!(r.reconcile(None, g), g);
        assert_eq!(
            r.reconcile(Some(YearRange::new(2018, 2030)), g),
            YearRange::new(2018, 2023)
        );
    }
}
