//! Two-handle range slider as an explicit state machine.
//!
//! Positions are in slider-local pixels: `0..width`, with the usable track inset by
//! [`SLIDER_PADDING`] on both sides. Only one handle drags at a time and a handle never
//! crosses the other.

use crate::config::SliderCommit;
use crate::domain::{YearRange, clamp_view_window};
use crate::viz::scale::LinearScale;

pub const SLIDER_PADDING: f64 = 10.0;
/// Grab distance around a handle centre.
pub const HANDLE_HIT_RADIUS: f64 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { handle: Handle, pending_px: f64 },
}

/// Floating label shown above the handle being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderTip {
    pub handle: Handle,
    pub px: f64,
    pub year: i32,
}

#[derive(Debug, Clone)]
pub struct RangeSlider {
    global: YearRange,
    scale: LinearScale,
    left_px: f64,
    right_px: f64,
    state: DragState,
    commit: SliderCommit,
}

impl RangeSlider {
    pub fn new(commit: SliderCommit) -> Self {
        Self {
            global: YearRange::new(0, 0),
            scale: LinearScale::new().domain(0.0, 0.0).range(0.0, 0.0),
            left_px: 0.0,
            right_px: 0.0,
            state: DragState::Idle,
            commit,
        }
    }

    /// Re-derive the track from the current domain, window and width.
    ///
    /// While a drag is in progress the dragged handle keeps its pending position (re-clamped
    /// into the possibly new extent); only the other handle follows `window`.
    pub fn sync(&mut self, global: YearRange, window: YearRange, width: f64) {
        self.global = global;
        let lo = SLIDER_PADDING;
        let hi = (width - SLIDER_PADDING).max(lo);
        self.scale = LinearScale::new()
            .domain(global.start as f64, global.end as f64)
            .range(lo, hi);
        let window = clamp_view_window(window, global);
        let l = self.scale.map(window.start as f64);
        let r = self.scale.map(window.end as f64);
        match self.state {
            DragState::Idle => {
                self.left_px = l;
                self.right_px = r;
            }
            DragState::Dragging { handle, pending_px } => {
                let (a, b) = self.extent();
                let pending = pending_px.clamp(a, b);
                match handle {
                    Handle::Left => {
                        self.right_px = r;
                        self.left_px = pending.min(self.right_px);
                    }
                    Handle::Right => {
                        self.left_px = l;
                        self.right_px = pending.max(self.left_px);
                    }
                }
                self.state = DragState::Dragging {
                    handle,
                    pending_px: pending,
                };
            }
        }
    }

    /// Usable pixel extent of the track.
    pub fn extent(&self) -> (f64, f64) {
        self.scale.range_bounds()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn handles_px(&self) -> (f64, f64) {
        (self.left_px, self.right_px)
    }

    /// Year under `px`, rounded and clamped to the global domain.
    pub fn year_at(&self, px: f64) -> i32 {
        let y = self.scale.invert(px).round() as i32;
        y.clamp(self.global.start, self.global.end)
    }

    /// Which handle, if any, a press at `x` grabs. Coincident handles resolve by side.
    pub fn hit_test(&self, x: f64) -> Option<Handle> {
        let dl = (x - self.left_px).abs();
        let dr = (x - self.right_px).abs();
        if dl > HANDLE_HIT_RADIUS && dr > HANDLE_HIT_RADIUS {
            return None;
        }
        if dl < dr {
            Some(Handle::Left)
        } else if dr < dl {
            Some(Handle::Right)
        } else if x <= self.left_px {
            Some(Handle::Left)
        } else {
            Some(Handle::Right)
        }
    }

    /// Start dragging `handle`. Ignored while another drag is active.
    pub fn begin_drag(&mut self, handle: Handle) -> bool {
        if self.is_dragging() {
            return false;
        }
        let px = match handle {
            Handle::Left => self.left_px,
            Handle::Right => self.right_px,
        };
        self.state = DragState::Dragging {
            handle,
            pending_px: px,
        };
        true
    }

    /// Move the dragged handle towards `x`, clamped to the track and to the other handle.
    pub fn drag_to(&mut self, x: f64) {
        let DragState::Dragging { handle, .. } = self.state else {
            return;
        };
        let (a, b) = self.extent();
        let x = x.clamp(a, b);
        let px = match handle {
            Handle::Left => {
                self.left_px = x.min(self.right_px);
                self.left_px
            }
            Handle::Right => {
                self.right_px = x.max(self.left_px);
                self.right_px
            }
        };
        self.state = DragState::Dragging {
            handle,
            pending_px: px,
        };
    }

    /// Release the handle and return the window to commit.
    pub fn end_drag(&mut self) -> Option<YearRange> {
        let DragState::Dragging { handle, .. } = self.state else {
            return None;
        };
        self.state = DragState::Idle;
        let committed = match self.commit {
            SliderCommit::Window => YearRange::new(
                self.year_at(self.left_px.min(self.right_px)),
                self.year_at(self.left_px.max(self.right_px)),
            ),
            SliderCommit::ExtendToEdge => match handle {
                Handle::Left => {
                    self.right_px = self.scale.map(self.global.end as f64);
                    YearRange::new(self.year_at(self.left_px), self.global.end)
                }
                Handle::Right => {
                    self.left_px = self.scale.map(self.global.start as f64);
                    YearRange::new(self.global.start, self.year_at(self.right_px))
                }
            },
        };
        Some(clamp_view_window(committed, self.global))
    }

    /// Abort a drag without committing.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    pub fn tooltip(&self) -> Option<SliderTip> {
        match self.state {
            DragState::Idle => None,
            DragState::Dragging { handle, pending_px } => Some(SliderTip {
                handle,
                px: pending_px,
                year: self.year_at(pending_px),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slider(commit: SliderCommit) -> RangeSlider {
        let mut s = RangeSlider::new(commit);
        // 2014..2024 over 10..210: 20 px per year
        s.sync(YearRange::new(2014, 2024), YearRange::new(2016, 2020), 220.0);
        s
    }

    #[test]
    fn handles_follow_window_when_idle() {
        let s = slider(SliderCommit::Window);
        assert_eq!(s.handles_px(), (50.0, 130.0));
        assert_eq!(s.extent(), (10.0, 210.0));
        assert_eq!(s.tooltip(), None);
    }

    #[test]
    fn left_handle_cannot_cross_right() {
        let mut s = slider(SliderCommit::Window);
        assert!(s.begin_drag(Handle::Left));
        s.drag_to(500.0);
        assert_eq!(s.handles_px(), (130.0, 130.0));
        let w = s.end_drag().unwrap();
        assert_eq!(w, YearRange::new(2020, 2020));
        assert_eq!(s.state(), DragState::Idle);
    }

    #[test]
    fn right_handle_clamps_to_track() {
        let mut s = slider(SliderCommit::Window);
        s.begin_drag(Handle::Right);
        s.drag_to(10_000.0);
        assert_eq!(s.handles_px().1, 210.0);
        s.drag_to(-50.0);
        assert_eq!(s.handles_px().1, 50.0);
        assert_eq!(s.end_drag(), Some(YearRange::new(2016, 2016)));
    }

    #[test]
    fn only_one_handle_at_a_time() {
        let mut s = slider(SliderCommit::Window);
        assert!(s.begin_drag(Handle::Left));
        assert!(!s.begin_drag(Handle::Right));
        assert!(matches!(
            s.state(),
            DragState::Dragging {
                handle: Handle::Left,
                ..
            }
        ));
    }

    #[test]
    fn tooltip_tracks_pending_year() {
        let mut s = slider(SliderCommit::Window);
        s.begin_drag(Handle::Left);
        s.drag_to(92.0);
        let tip = s.tooltip().unwrap();
        assert_eq!(tip.handle, Handle::Left);
        assert_eq!(tip.year, 2018);
        s.end_drag();
        assert!(s.tooltip().is_none());
    }

    #[test]
    fn extend_to_edge_snaps_other_handle() {
        let mut s = slider(SliderCommit::ExtendToEdge);
        s.begin_drag(Handle::Left);
        s.drag_to(70.0);
        assert_eq!(s.end_drag(), Some(YearRange::new(2017, 2024)));
        assert_eq!(s.handles_px().1, 210.0);

        let mut s = slider(SliderCommit::ExtendToEdge);
        s.begin_drag(Handle::Right);
        s.drag_to(150.0);
        assert_eq!(s.end_drag(), Some(YearRange::new(2014, 2021)));
        assert_eq!(s.handles_px().0, 10.0);
    }

    #[test]
    fn sync_during_drag_preserves_pending_position() {
        let mut s = slider(SliderCommit::Window);
        s.begin_drag(Handle::Right);
        s.drag_to(170.0);
        s.sync(YearRange::new(2014, 2024), YearRange::new(2016, 2020), 220.0);
        assert_eq!(s.handles_px(), (50.0, 170.0));
        assert_eq!(s.end_drag(), Some(YearRange::new(2016, 2022)));
    }

    #[test]
    fn hit_test_picks_nearest_and_resolves_ties_by_side() {
        let mut s = slider(SliderCommit::Window);
        assert_eq!(s.hit_test(52.0), Some(Handle::Left));
        assert_eq!(s.hit_test(128.0), Some(Handle::Right));
        assert_eq!(s.hit_test(90.0), None);
        s.sync(YearRange::new(2014, 2024), YearRange::new(2024, 2024), 220.0);
        assert_eq!(s.hit_test(205.0), Some(Handle::Left));
        assert_eq!(s.hit_test(212.0), Some(Handle::Right));
    }

    #[test]
    fn any_drag_sequence_commits_an_ordered_in_domain_window() {
        let global = YearRange::new(2010, 2023);
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };
        for commit in [SliderCommit::Window, SliderCommit::ExtendToEdge] {
            let mut s = RangeSlider::new(commit);
            let mut window = global;
            for _ in 0..200 {
                s.sync(global, window, 300.0);
                let handle = if next() % 2 == 0 {
                    Handle::Left
                } else {
                    Handle::Right
                };
                s.begin_drag(handle);
                for _ in 0..(next() % 5) {
                    s.drag_to((next() % 400) as f64 - 50.0);
                }
                window = s.end_drag().unwrap();
                assert!(window.start <= window.end);
                assert!(global.contains(window.start) && global.contains(window.end));
            }
        }
    }
}
