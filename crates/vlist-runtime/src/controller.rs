#![forbid(unsafe_code)]

//! Viewport controller.
//!
//! Owns the viewport, the geometry, the current [`Window`], the scroll
//! throttler, the host scroll subscription and (optionally) the visibility
//! tracker. Hosts feed it events; it publishes a new window only when the
//! computed one differs from the last published one.
//!
//! # Event flow
//!
//! ```text
//! on_scroll ──> ScrollThrottler ──(RequestFrame)──> host.request_frame
//!                                                        │
//! on_frame  <────────────────────────────────────────────┘
//!     └─> compute_window ──(changed)──> listeners + visibility tracker
//! ```
//!
//! # Teardown
//!
//! [`ViewportController::teardown`] and `Drop` share one release path that
//! cancels the outstanding frame, disconnects every observer and unsubscribes
//! the scroll listener. Each handle is stored in an `Option` and taken on
//! release, so a second pass is a no-op.

use std::fmt;
use std::time::Instant;

use vlist_core::{
    ExtentModel, FixedGeometry, RenderedItem, Viewport, Window, WindowDelta, compute_window,
    render_window,
};

use crate::config::ListConfig;
use crate::host::{FrameToken, ListenerId, ScrollSubscription, ViewportHost};
use crate::throttle::{FrameOutcome, PushOutcome, ScrollThrottler, ThrottleStats};
use crate::visibility::{ItemVisibility, VisibilityTracker, VisibilityUpdate};

type WindowListener = Box<dyn FnMut(&Window)>;

/// Where a target item should land when scrolling to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollAlign {
    /// Item start at the viewport start.
    Start,
    /// Item centered in the viewport.
    Center,
    /// Item end at the viewport end.
    End,
    /// Scroll as little as possible; no movement if already fully visible.
    #[default]
    Nearest,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Window computations.
    pub recomputes: u64,
    /// Windows published to listeners.
    pub publishes: u64,
    /// Computations that produced the already-published window.
    pub unchanged: u64,
    /// Throttler counters.
    pub throttle: ThrottleStats,
}

/// What a teardown released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// A scroll subscription was released.
    pub unsubscribed: bool,
    /// An outstanding frame callback was cancelled.
    pub frame_cancelled: bool,
    /// Intersection observers disconnected.
    pub observers_released: usize,
}

/// Event-driven owner of a virtualized list's render window.
pub struct ViewportController<G: ExtentModel, H: ViewportHost> {
    host: H,
    geometry: G,
    config: ListConfig,
    viewport: Viewport,
    window: Window,
    last_delta: WindowDelta,
    throttler: ScrollThrottler,
    visibility: Option<VisibilityTracker>,
    scroll_subscription: Option<ScrollSubscription>,
    pending_frame: Option<FrameToken>,
    listeners: Vec<(ListenerId, WindowListener)>,
    next_listener: u64,
    stats: ControllerStats,
}

impl<G: ExtentModel, H: ViewportHost> fmt::Debug for ViewportController<G, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportController")
            .field("viewport", &self.viewport)
            .field("window", &self.window)
            .field("count", &self.geometry.len())
            .field("config", &self.config)
            .field("scroll_subscription", &self.scroll_subscription)
            .field("pending_frame", &self.pending_frame)
            .field("listeners", &self.listeners.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<G: ExtentModel, H: ViewportHost> ViewportController<G, H> {
    /// Create a controller, subscribe to scroll events and size the content.
    ///
    /// The initial window is computed at scroll offset zero; it is available
    /// through [`window`](Self::window) and is not delivered to listeners.
    pub fn new(mut host: H, geometry: G, config: ListConfig, client_extent: f64) -> Self {
        let subscription = host.subscribe_scroll();
        host.set_content_extent(geometry.total_extent());

        let viewport = Viewport::new(0.0, client_extent);
        let window = compute_window(viewport, &geometry, config.overscan);

        let mut visibility = config
            .lazy_visibility
            .then(|| VisibilityTracker::new(config.observer, config.assume_visible_on_mount));
        if let Some(tracker) = visibility.as_mut() {
            tracker.sync(&window, &mut host);
        }

        tracing::debug!(
            target: "vlist.controller",
            subscription = subscription.0,
            count = geometry.len(),
            client_extent,
            config = %config.summary_short(),
            "subscribe"
        );

        Self {
            host,
            throttler: ScrollThrottler::new(config.quantum),
            geometry,
            config,
            viewport,
            window,
            last_delta: WindowDelta {
                entered: vec![window.indices()],
                exited: Vec::new(),
            },
            visibility,
            scroll_subscription: Some(subscription),
            pending_frame: None,
            listeners: Vec::new(),
            next_listener: 0,
            stats: ControllerStats {
                recomputes: 1,
                ..ControllerStats::default()
            },
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    /// Last published window.
    #[inline]
    #[must_use]
    pub fn window(&self) -> Window {
        self.window
    }

    /// Index ranges created and destroyed by the last publication.
    #[must_use]
    pub fn last_delta(&self) -> &WindowDelta {
        &self.last_delta
    }

    /// Viewport as of the last recompute.
    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Current geometry.
    #[must_use]
    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    /// The host surface.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Visibility state of `index`; always `Unmounted` when lazy visibility is off.
    #[must_use]
    pub fn visibility(&self, index: usize) -> ItemVisibility {
        self.visibility
            .as_ref()
            .map_or(ItemVisibility::Unmounted, |t| t.state(index))
    }

    /// Diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> ControllerStats {
        ControllerStats {
            throttle: self.throttler.stats(),
            ..self.stats
        }
    }

    // ── Host events ──────────────────────────────────────────────────────

    /// Feed a raw scroll offset.
    pub fn on_scroll(&mut self, offset: f64) {
        self.on_scroll_at(offset, Instant::now());
    }

    /// Feed a raw scroll offset at a specific time (for testing).
    pub fn on_scroll_at(&mut self, offset: f64, now: Instant) {
        if self.throttler.push_at(offset, now) == PushOutcome::RequestFrame {
            self.schedule_frame();
        }
    }

    /// Frame callback. Returns `true` if a new window was published.
    pub fn on_frame(&mut self) -> bool {
        self.on_frame_at(Instant::now())
    }

    /// Frame callback at a specific time (for testing).
    pub fn on_frame_at(&mut self, now: Instant) -> bool {
        self.pending_frame = None;
        match self.throttler.frame_at(now) {
            FrameOutcome::Idle => false,
            FrameOutcome::Defer => {
                self.schedule_frame();
                false
            }
            FrameOutcome::Recompute(signal) => {
                self.viewport.scroll_offset = signal.offset;
                self.recompute(false)
            }
        }
    }

    /// The scroll container changed size. Recomputes immediately.
    pub fn on_resize(&mut self, client_extent: f64) -> bool {
        self.viewport.client_extent = client_extent;
        self.recompute(false)
    }

    /// Replace the geometry wholesale and publish unconditionally.
    pub fn replace_geometry(&mut self, geometry: G) {
        tracing::debug!(
            target: "vlist.controller",
            old_count = self.geometry.len(),
            new_count = geometry.len(),
            total_extent = geometry.total_extent(),
            "replace_geometry"
        );
        self.geometry = geometry;
        self.host.set_content_extent(self.geometry.total_extent());
        self.recompute(true);
    }

    /// Feed an intersection notification for a rendered item.
    pub fn on_intersection(&mut self, index: usize, intersecting: bool) -> VisibilityUpdate {
        self.visibility
            .as_mut()
            .map_or(VisibilityUpdate::Ignored, |t| t.notify(index, intersecting))
    }

    /// Restrict lazy-visibility tracking to indices accepted by `predicate`.
    ///
    /// Re-syncs the current window at once, attaching or detaching observers as
    /// needed. Returns `false` (and does nothing) when lazy visibility is off.
    pub fn set_visibility_opt_in<F>(&mut self, predicate: F) -> bool
    where
        F: Fn(usize) -> bool + 'static,
    {
        let Some(tracker) = self.visibility.as_mut() else {
            return false;
        };
        tracker.set_opt_in(predicate);
        tracker.sync(&self.window, &mut self.host);
        true
    }

    // ── Listeners ────────────────────────────────────────────────────────

    /// Register a callback invoked with every newly published window.
    pub fn on_window_change<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&Window) + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(callback)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    // ── Rendering helpers ────────────────────────────────────────────────

    /// Positioned items of the current window.
    pub fn render_items<'a, T, K, F>(&self, items: &'a [T], key_fn: F) -> Vec<RenderedItem<'a, T, K>>
    where
        F: Fn(&T) -> K,
    {
        render_window(&self.window, &self.geometry, items, key_fn)
    }

    /// Scroll offset that brings `index` into view with the given alignment.
    ///
    /// The result is clamped to the scrollable range. The controller does not
    /// scroll by itself; the host applies the offset and reports it back
    /// through [`on_scroll`](Self::on_scroll).
    #[must_use]
    pub fn scroll_offset_for(&self, index: usize, align: ScrollAlign) -> f64 {
        let viewport = self.viewport.sanitized();
        let client = viewport.client_extent;
        let index = index.min(self.geometry.len().saturating_sub(1));
        let start = self.geometry.offset_of(index);
        let end = start + self.geometry.extent_of(index);

        let target = match align {
            ScrollAlign::Start => start,
            ScrollAlign::End => end - client,
            ScrollAlign::Center => start + (end - start) / 2.0 - client / 2.0,
            ScrollAlign::Nearest => {
                if start < viewport.scroll_offset {
                    start
                } else if end > viewport.visible_end() {
                    end - client
                } else {
                    viewport.scroll_offset
                }
            }
        };

        let max_scroll = (self.geometry.total_extent() - client).max(0.0);
        target.clamp(0.0, max_scroll)
    }

    // ── Teardown ─────────────────────────────────────────────────────────

    /// Release every host resource and drop the controller.
    pub fn teardown(mut self) -> TeardownReport {
        self.release()
    }

    fn release(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        self.throttler.cancel();
        if let Some(token) = self.pending_frame.take() {
            self.host.cancel_frame(token);
            report.frame_cancelled = true;
        }
        if let Some(tracker) = self.visibility.as_mut() {
            report.observers_released = tracker.clear(&mut self.host);
        }
        if let Some(subscription) = self.scroll_subscription.take() {
            self.host.unsubscribe_scroll(subscription);
            report.unsubscribed = true;
            tracing::debug!(
                target: "vlist.controller",
                subscription = subscription.0,
                frame_cancelled = report.frame_cancelled,
                observers_released = report.observers_released,
                "teardown"
            );
        }
        self.listeners.clear();
        report
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn schedule_frame(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.host.request_frame());
        }
    }

    /// Recompute the window; publish if it changed or `force` is set.
    fn recompute(&mut self, force: bool) -> bool {
        self.stats.recomputes += 1;
        let next = compute_window(self.viewport, &self.geometry, self.config.overscan);
        if !force && next == self.window {
            self.stats.unchanged += 1;
            return false;
        }

        let delta = WindowDelta::between(&self.window, &next);
        self.window = next;

        if let Some(tracker) = self.visibility.as_mut() {
            if force {
                tracker.sync(&self.window, &mut self.host);
            } else {
                tracker.apply_delta(&delta, &mut self.host);
            }
        }
        self.last_delta = delta;
        self.stats.publishes += 1;

        tracing::trace!(
            target: "vlist.controller",
            start_index = next.start_index,
            end_index = next.end_index,
            offset = next.offset,
            forced = force,
            "publish"
        );

        for (_, listener) in &mut self.listeners {
            listener(&self.window);
        }
        true
    }
}

impl<H: ViewportHost> ViewportController<FixedGeometry, H> {
    /// The collection now has `count` items of the same extent.
    ///
    /// Rebuilds the geometry, resizes the content and publishes unconditionally.
    pub fn on_collection_change(&mut self, count: usize) {
        let geometry = self.geometry.with_count(count);
        self.replace_geometry(geometry);
    }
}

impl<G: ExtentModel, H: ViewportHost> Drop for ViewportController<G, H> {
    fn drop(&mut self) {
        self.release();
    }
}
