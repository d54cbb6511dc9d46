//! Pan/zoom state of the pattern view, debounced re-fitting and exclusive
//! pointer capture.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::math::{Point2, UvBounds, Vector2};

const MIN_SCALE: f64 = 1e-3;
const MAX_SCALE: f64 = 1e7;

/// Maps UV space onto pixels. `v` grows upwards, screen `y` downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport2d {
    width: f64,
    height: f64,
    /// Pixels per UV unit.
    scale: f64,
    /// Pixel position of UV `(0, 0)`.
    offset: Vector2,
}

impl Default for Viewport2d {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport2d {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scale: height,
            offset: Vector2::new(0.0, height),
        }
    }

    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Changes the pixel size. Pan and zoom are kept; callers re-fit.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    #[must_use]
    pub fn to_screen(&self, uv: &Point2) -> Point2 {
        Point2::new(
            self.offset.x + uv.x * self.scale,
            self.offset.y - uv.y * self.scale,
        )
    }

    #[must_use]
    pub fn to_uv(&self, screen: &Point2) -> Point2 {
        Point2::new(
            (screen.x - self.offset.x) / self.scale,
            (self.offset.y - screen.y) / self.scale,
        )
    }

    /// Zooms and centers so that `bounds` fills the viewport minus a
    /// `padding` fraction on each side. Empty bounds leave the view as is.
    pub fn fit(&mut self, bounds: &UvBounds, padding: f64) {
        if bounds.is_empty() {
            return;
        }
        let usable = 1.0 - 2.0 * padding.clamp(0.0, 0.45);
        let sx = self.width * usable / bounds.width().max(f64::EPSILON);
        let sy = self.height * usable / bounds.height().max(f64::EPSILON);
        self.scale = sx.min(sy).clamp(MIN_SCALE, MAX_SCALE);
        let cu = (bounds.min_u + bounds.max_u) * 0.5;
        let cv = (bounds.min_v + bounds.max_v) * 0.5;
        self.offset = Vector2::new(
            self.width * 0.5 - cu * self.scale,
            self.height * 0.5 + cv * self.scale,
        );
        debug!(scale = self.scale, "pattern viewport fitted");
    }

    pub fn pan_by(&mut self, delta: &Vector2) {
        self.offset += delta;
    }

    /// Multiplies the zoom by `factor`, keeping the UV under `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: &Point2, factor: f64) {
        let uv = self.to_uv(anchor);
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        self.offset = Vector2::new(anchor.x - uv.x * self.scale, anchor.y + uv.y * self.scale);
    }
}

/// Debounces re-fit requests of the pattern viewport.
///
/// Requests restart a quiet period; the fit runs once it has elapsed. While
/// the surrounding panel is animating, requests are dropped rather than
/// queued, and a single fit is due as soon as the animation ends.
#[derive(Debug, Clone)]
pub struct FitScheduler {
    debounce: Duration,
    pending_since: Option<Instant>,
    transitioning: bool,
}

impl FitScheduler {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending_since: None,
            transitioning: false,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// Records a size change at `now`.
    pub fn request(&mut self, now: Instant) {
        if self.transitioning {
            return;
        }
        self.pending_since = Some(now);
    }

    /// Marks the start or end of a panel animation. Returns `true` when the
    /// animation just ended and a fit must run immediately.
    pub fn set_transitioning(&mut self, transitioning: bool) -> bool {
        let ended = self.transitioning && !transitioning;
        self.transitioning = transitioning;
        if transitioning || ended {
            self.pending_since = None;
        }
        ended
    }

    /// Returns `true` once per request when its quiet period has elapsed
    /// at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending_since {
            Some(since) if now.saturating_duration_since(since) >= self.debounce => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }
}

/// Interaction that currently owns the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    PanZoom,
    PanelResize,
}

/// Exclusive pointer capture. While a panel resize owns the pointer, neither
/// view reacts to geometry interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerCapture {
    active: Option<CaptureKind>,
}

impl PointerCapture {
    /// Takes the pointer for `kind`. Fails if another interaction holds it.
    pub fn begin(&mut self, kind: CaptureKind) -> bool {
        match self.active {
            None => {
                self.active = Some(kind);
                true
            }
            Some(current) => current == kind,
        }
    }

    /// Releases the pointer if `kind` holds it.
    pub fn end(&mut self, kind: CaptureKind) {
        if self.active == Some(kind) {
            self.active = None;
        }
    }

    #[must_use]
    pub fn active(&self) -> Option<CaptureKind> {
        self.active
    }

    /// Returns `true` if selection and placement clicks are accepted.
    #[must_use]
    pub fn geometry_interactive(&self) -> bool {
        self.active != Some(CaptureKind::PanelResize)
    }
}
