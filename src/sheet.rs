// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Draggable bottom sheet
//!
//! The sheet height is a single offset bounded by `[min, max]`. Gesture events
//! drive a small state machine; rendering only reads from it.

use std::time::Duration;
use tracing::trace;

use crate::config::SheetConfig;
use crate::{FlareError, Result};

/// Allowed range of the sheet offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetBounds {
    min: f64,
    max: f64,
}

impl SheetBounds {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(FlareError::InvalidBounds(format!("[{}, {}]", min, max)));
        }
        Ok(Self { min, max })
    }

    /// Bounds as fractions of the viewport height
    pub fn from_config(config: &SheetConfig) -> Result<Self> {
        Self::new(
            config.viewport_height * config.min_fraction,
            config.viewport_height * config.max_fraction,
        )
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Position of `offset` within the range, 0.0 at min and 1.0 at max
    fn progress(&self, offset: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((offset - self.min) / span).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetState {
    Idle { offset: f64 },
    Dragging { anchor: f64, offset: f64 },
}

/// Tween from the release point to the snapped bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapAnimation {
    pub from: f64,
    pub to: f64,
    pub duration: Duration,
}

impl SnapAnimation {
    /// Offset at `elapsed`; lands exactly on `to` once the duration has passed
    pub fn sample(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.to;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let eased = 1.0 - (1.0 - t).powi(3);
        self.from + (self.to - self.from) * eased
    }
}

/// RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// `#rrggbb` form for stylesheets
    pub fn css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

const MARIAN_BLUE: Rgb = Rgb(54, 68, 115);
const SPACE_CADET: Rgb = Rgb(26, 28, 56);

pub struct BottomSheetController {
    bounds: SheetBounds,
    state: SheetState,
    snap_duration: Duration,
}

impl BottomSheetController {
    /// Start collapsed at the minimum height
    pub fn new(bounds: SheetBounds, snap_duration: Duration) -> Self {
        Self {
            bounds,
            state: SheetState::Idle { offset: bounds.min },
            snap_duration,
        }
    }

    pub fn from_config(config: &SheetConfig) -> Result<Self> {
        Ok(Self::new(
            SheetBounds::from_config(config)?,
            Duration::from_millis(config.snap_duration_ms),
        ))
    }

    pub fn bounds(&self) -> SheetBounds {
        self.bounds
    }

    pub fn state(&self) -> SheetState {
        self.state
    }

    pub fn offset(&self) -> f64 {
        match self.state {
            SheetState::Idle { offset } | SheetState::Dragging { offset, .. } => offset,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SheetState::Dragging { .. })
    }

    /// Idle -> Dragging, anchoring at the current offset. Ignored mid-drag.
    pub fn on_drag_start(&mut self) {
        if let SheetState::Idle { offset } = self.state {
            self.state = SheetState::Dragging { anchor: offset, offset };
        }
    }

    /// Apply the gesture's total translation since drag start.
    ///
    /// Positive `delta` is a downward drag and shrinks the sheet. Non-finite
    /// input and updates outside a drag are ignored.
    pub fn on_drag_update(&mut self, delta: f64) {
        let SheetState::Dragging { anchor, .. } = self.state else {
            trace!("Drag update outside a drag, ignoring");
            return;
        };
        if delta.is_nan() {
            return;
        }
        let offset = self.bounds.clamp(anchor - delta);
        self.state = SheetState::Dragging { anchor, offset };
    }

    /// Dragging -> Idle, snapping to the nearer bound (ties go to max).
    ///
    /// Returns the tween the renderer should play, or `None` when no drag was active.
    pub fn on_drag_end(&mut self) -> Option<SnapAnimation> {
        let SheetState::Dragging { offset, .. } = self.state else {
            return None;
        };
        let target = if offset >= self.bounds.midpoint() {
            self.bounds.max
        } else {
            self.bounds.min
        };
        self.state = SheetState::Idle { offset: target };
        Some(SnapAnimation {
            from: offset,
            to: target,
            duration: self.snap_duration,
        })
    }

    /// Distance of the sheet's top edge from the top of the viewport
    pub fn top_edge(&self, viewport_height: f64) -> f64 {
        viewport_height - self.offset()
    }

    /// Background colour, blended from marian blue (collapsed) to space cadet (expanded)
    pub fn background(&self) -> Rgb {
        let p = self.bounds.progress(self.offset());
        let mix = |a: u8, b: u8| ((1.0 - p) * f64::from(a) + p * f64::from(b)).round() as u8;
        Rgb(
            mix(MARIAN_BLUE.0, SPACE_CADET.0),
            mix(MARIAN_BLUE.1, SPACE_CADET.1),
            mix(MARIAN_BLUE.2, SPACE_CADET.2),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> BottomSheetController {
        BottomSheetController::new(SheetBounds::new(100.0, 500.0).unwrap(), Duration::from_millis(300))
    }

    fn drag_to(sheet: &mut BottomSheetController, delta: f64) -> Option<SnapAnimation> {
        sheet.on_drag_start();
        sheet.on_drag_update(delta);
        sheet.on_drag_end()
    }

    #[test]
    fn test_starts_collapsed() {
        let sheet = controller();
        assert_eq!(sheet.offset(), 100.0);
        assert!(!sheet.is_dragging());
    }

    #[test]
    fn test_drag_moves_relative_to_anchor() {
        let mut sheet = controller();
        sheet.on_drag_start();
        sheet.on_drag_update(-50.0);
        assert_eq!(sheet.offset(), 150.0);
        // Total translation, not incremental
        sheet.on_drag_update(-80.0);
        assert_eq!(sheet.offset(), 180.0);
    }

    #[test]
    fn test_offset_stays_in_bounds() {
        let mut sheet = controller();
        sheet.on_drag_start();
        for delta in [-1e9, 1e9, -401.0, 0.5, f64::INFINITY, f64::NEG_INFINITY, f64::NAN, -f64::MAX] {
            sheet.on_drag_update(delta);
            let offset = sheet.offset();
            assert!((100.0..=500.0).contains(&offset), "offset {} escaped for delta {}", offset, delta);
        }
    }

    #[test]
    fn test_nan_keeps_offset() {
        let mut sheet = controller();
        sheet.on_drag_start();
        sheet.on_drag_update(-20.0);
        sheet.on_drag_update(f64::NAN);
        assert_eq!(sheet.offset(), 120.0);
    }

    #[test]
    fn test_snap_to_nearer_bound() {
        let mut sheet = controller();
        let anim = drag_to(&mut sheet, -150.0).unwrap();
        assert_eq!((anim.from, anim.to), (250.0, 100.0));
        assert_eq!(sheet.offset(), 100.0);

        drag_to(&mut sheet, -250.0);
        assert_eq!(sheet.offset(), 500.0);

        drag_to(&mut sheet, 150.0);
        assert_eq!(sheet.offset(), 500.0);
    }

    #[test]
    fn test_midpoint_snaps_up() {
        let mut sheet = controller();
        drag_to(&mut sheet, -200.0);
        assert_eq!(sheet.offset(), 500.0);
    }

    #[test]
    fn test_updates_outside_drag_ignored() {
        let mut sheet = controller();
        sheet.on_drag_update(-300.0);
        assert_eq!(sheet.offset(), 100.0);
        assert!(sheet.on_drag_end().is_none());
    }

    #[test]
    fn test_restart_mid_drag_keeps_anchor() {
        let mut sheet = controller();
        sheet.on_drag_start();
        sheet.on_drag_update(-100.0);
        sheet.on_drag_start();
        sheet.on_drag_update(-10.0);
        assert_eq!(sheet.offset(), 110.0);
    }

    #[test]
    fn test_animation_ends_on_target() {
        let anim = SnapAnimation { from: 250.0, to: 500.0, duration: Duration::from_millis(300) };
        assert_eq!(anim.sample(Duration::ZERO), 250.0);
        let mid = anim.sample(Duration::from_millis(150));
        assert!(mid > 250.0 && mid < 500.0);
        assert_eq!(anim.sample(Duration::from_millis(300)), 500.0);
        assert_eq!(anim.sample(Duration::from_secs(5)), 500.0);
    }

    #[test]
    fn test_background_follows_offset() {
        let mut sheet = controller();
        assert_eq!(sheet.background(), MARIAN_BLUE);
        drag_to(&mut sheet, -400.0);
        assert_eq!(sheet.background(), SPACE_CADET);
        assert_eq!(sheet.top_edge(852.0), 352.0);
        assert_eq!(SPACE_CADET.css(), "#1a1c38");
    }

    #[test]
    fn test_bounds_from_config() {
        let bounds = SheetBounds::from_config(&SheetConfig::default()).unwrap();
        assert!((bounds.min() - 852.0 * 0.51).abs() < 1e-9);
        assert!((bounds.max() - 852.0 * 0.93).abs() < 1e-9);
        assert!(SheetBounds::new(10.0, 5.0).is_err());
        assert!(SheetBounds::new(f64::NAN, 5.0).is_err());
    }
}
