#![forbid(unsafe_code)]

//! Lazy-visibility tracking for rendered items.
//!
//! Items that opt in receive an intersection observer while they are inside
//! the render window. Each tracked index moves through a small state machine:
//!
//! ```text
//! (absent) --mount--> Mounted{intersecting: false}
//!                         |  ^
//!       intersection seen |  | intersection lost
//!                         v  |
//!                     Mounted{intersecting: true}
//!                         |
//!                       unmount  (observer disconnected)
//!                         v
//!                      Unmounted
//! ```
//!
//! Tracking can be narrowed to selected items with
//! [`VisibilityTracker::set_opt_in`]; indices the predicate rejects are never
//! mounted.
//!
//! The observer is attached inside [`VisibilityTracker::mount`] and released
//! inside [`VisibilityTracker::unmount`]; there is no other path that creates
//! or drops one. Notifications for indices that are not mounted are ignored,
//! since hosts commonly deliver them a frame late.

use std::collections::BTreeMap;
use std::fmt;

use vlist_core::{Viewport, Window, WindowDelta};

use crate::host::{ObserverId, ViewportHost};

/// Default observer root margin, in offset units.
pub const DEFAULT_ROOT_MARGIN: f64 = 200.0;

/// Default fraction of an item that must be inside the root to count.
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Intersection observer parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverOptions {
    /// Distance the observation root extends beyond the viewport on each side.
    pub root_margin: f64,
    /// Minimum visible fraction in `[0, 1]`. `0.0` means any overlap.
    pub threshold: f64,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: DEFAULT_ROOT_MARGIN,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ObserverOptions {
    /// Set the root margin.
    #[must_use]
    pub fn with_root_margin(mut self, root_margin: f64) -> Self {
        self.root_margin = root_margin;
        self
    }

    /// Set the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Fraction of `[item_start, item_start + item_extent)` inside the
    /// margin-extended viewport.
    ///
    /// Zero-extent items count as fully visible when their start lies inside
    /// the root.
    #[must_use]
    pub fn intersection_ratio(&self, item_start: f64, item_extent: f64, viewport: Viewport) -> f64 {
        let viewport = viewport.sanitized();
        let root_start = viewport.scroll_offset - self.root_margin;
        let root_end = viewport.visible_end() + self.root_margin;

        if !(item_extent > 0.0) {
            return if item_start >= root_start && item_start <= root_end {
                1.0
            } else {
                0.0
            };
        }

        let item_end = item_start + item_extent;
        let overlap = item_end.min(root_end) - item_start.max(root_start);
        (overlap.max(0.0) / item_extent).min(1.0)
    }

    /// Whether an item counts as intersecting under these options.
    #[must_use]
    pub fn is_intersecting(&self, item_start: f64, item_extent: f64, viewport: Viewport) -> bool {
        let ratio = self.intersection_ratio(item_start, item_extent, viewport);
        if self.threshold <= 0.0 {
            ratio > 0.0
        } else {
            ratio >= self.threshold
        }
    }
}

/// Observable state of one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemVisibility {
    /// Inside the window with a live observer.
    Mounted {
        /// Whether the observer last reported an intersection.
        intersecting: bool,
    },
    /// Not tracked.
    Unmounted,
}

impl ItemVisibility {
    /// `true` only for a mounted, intersecting item.
    #[must_use]
    pub fn is_intersecting(&self) -> bool {
        matches!(self, Self::Mounted { intersecting: true })
    }
}

/// Result of feeding an intersection notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityUpdate {
    /// The index is not mounted; the notification was dropped.
    Ignored,
    /// Same state as before.
    Unchanged,
    /// State flipped.
    Changed {
        /// New intersecting flag.
        intersecting: bool,
    },
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    observer: ObserverId,
    intersecting: bool,
}

type OptIn = Box<dyn Fn(usize) -> bool>;

/// Per-index visibility state machine with observer ownership.
#[derive(Default)]
pub struct VisibilityTracker {
    items: BTreeMap<usize, Tracked>,
    options: ObserverOptions,
    assume_visible_on_mount: bool,
    opt_in: Option<OptIn>,
}

impl fmt::Debug for VisibilityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityTracker")
            .field("items", &self.items)
            .field("options", &self.options)
            .field("assume_visible_on_mount", &self.assume_visible_on_mount)
            .field("opt_in", &self.opt_in.is_some())
            .finish()
    }
}

impl VisibilityTracker {
    /// Create a tracker.
    #[must_use]
    pub fn new(options: ObserverOptions, assume_visible_on_mount: bool) -> Self {
        Self {
            items: BTreeMap::new(),
            options,
            assume_visible_on_mount,
            opt_in: None,
        }
    }

    /// Track only indices for which `predicate` returns `true`.
    ///
    /// Takes effect on the next mount or [`sync`](Self::sync); already mounted
    /// indices stay until then.
    pub fn set_opt_in<F>(&mut self, predicate: F)
    where
        F: Fn(usize) -> bool + 'static,
    {
        self.opt_in = Some(Box::new(predicate));
    }

    /// Track every index again.
    pub fn clear_opt_in(&mut self) {
        self.opt_in = None;
    }

    /// Whether `index` is eligible for tracking.
    #[must_use]
    pub fn opts_in(&self, index: usize) -> bool {
        self.opt_in.as_ref().is_none_or(|p| p(index))
    }

    /// Observer options passed to [`ViewportHost::observe`].
    #[must_use]
    pub fn options(&self) -> ObserverOptions {
        self.options
    }

    /// Current state of `index`.
    #[must_use]
    pub fn state(&self, index: usize) -> ItemVisibility {
        self.items
            .get(&index)
            .map_or(ItemVisibility::Unmounted, |t| ItemVisibility::Mounted {
                intersecting: t.intersecting,
            })
    }

    /// Number of live observers.
    #[must_use]
    pub fn mounted_count(&self) -> usize {
        self.items.len()
    }

    /// Mounted indices in ascending order.
    pub fn mounted_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.keys().copied()
    }

    /// Mount `index`, attaching an observer. No-op if already mounted or the
    /// index has not opted in.
    pub fn mount<H: ViewportHost + ?Sized>(&mut self, index: usize, host: &mut H) {
        if self.items.contains_key(&index) || !self.opts_in(index) {
            return;
        }
        let observer = host.observe(index, &self.options);
        tracing::trace!(target: "vlist.visibility", index, observer = observer.0, "mount");
        self.items.insert(
            index,
            Tracked {
                observer,
                intersecting: self.assume_visible_on_mount,
            },
        );
    }

    /// Unmount `index`, disconnecting its observer. No-op if not mounted.
    pub fn unmount<H: ViewportHost + ?Sized>(&mut self, index: usize, host: &mut H) {
        if let Some(tracked) = self.items.remove(&index) {
            tracing::trace!(
                target: "vlist.visibility",
                index,
                observer = tracked.observer.0,
                "unmount"
            );
            host.disconnect(tracked.observer);
        }
    }

    /// Apply a window transition: unmount exited indices, then mount entered ones.
    pub fn apply_delta<H: ViewportHost + ?Sized>(&mut self, delta: &WindowDelta, host: &mut H) {
        for index in delta.exited_indices() {
            self.unmount(index, host);
        }
        for index in delta.entered_indices() {
            self.mount(index, host);
        }
    }

    /// Make the mounted set equal to the opted-in indices of `window`.
    ///
    /// Handles stale entries (for example indices beyond a shrunken collection,
    /// or items that stopped opting in) that a delta alone would not reach.
    pub fn sync<H: ViewportHost + ?Sized>(&mut self, window: &Window, host: &mut H) {
        let stale: Vec<usize> = self
            .items
            .keys()
            .copied()
            .filter(|i| !window.contains(*i) || !self.opts_in(*i))
            .collect();
        for index in stale {
            self.unmount(index, host);
        }
        for index in window.indices() {
            self.mount(index, host);
        }
    }

    /// Feed an intersection notification.
    pub fn notify(&mut self, index: usize, intersecting: bool) -> VisibilityUpdate {
        let Some(tracked) = self.items.get_mut(&index) else {
            tracing::trace!(target: "vlist.visibility", index, "ignored notification");
            return VisibilityUpdate::Ignored;
        };
        if tracked.intersecting == intersecting {
            return VisibilityUpdate::Unchanged;
        }
        tracked.intersecting = intersecting;
        VisibilityUpdate::Changed { intersecting }
    }

    /// Disconnect every observer. Returns how many were released.
    pub fn clear<H: ViewportHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let items = std::mem::take(&mut self.items);
        let released = items.len();
        for (_, tracked) in items {
            host.disconnect(tracked.observer);
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FrameToken, ScrollSubscription};

    #[derive(Default)]
    struct ObserverLog {
        next: u64,
        live: BTreeMap<u64, usize>,
        disconnected: Vec<u64>,
    }

    impl ViewportHost for ObserverLog {
        fn subscribe_scroll(&mut self) -> ScrollSubscription {
            ScrollSubscription(0)
        }
        fn unsubscribe_scroll(&mut self, _subscription: ScrollSubscription) {}
        fn request_frame(&mut self) -> FrameToken {
            FrameToken(0)
        }
        fn cancel_frame(&mut self, _token: FrameToken) {}
        fn observe(&mut self, index: usize, _options: &ObserverOptions) -> ObserverId {
            self.next += 1;
            self.live.insert(self.next, index);
            ObserverId(self.next)
        }
        fn disconnect(&mut self, observer: ObserverId) {
            assert!(
                self.live.remove(&observer.0).is_some(),
                "double disconnect of {observer:?}"
            );
            self.disconnected.push(observer.0);
        }
        fn set_content_extent(&mut self, _extent: f64) {}
    }

    fn window(start_index: usize, end_index: usize) -> Window {
        Window {
            start_index,
            end_index,
            offset: 0.0,
        }
    }

    #[test]
    fn default_options() {
        let opts = ObserverOptions::default();
        assert_eq!(opts.root_margin, 200.0);
        assert_eq!(opts.threshold, 1.0);
    }

    #[test]
    fn ratio_with_margin() {
        let opts = ObserverOptions::default();
        let vp = Viewport::new(1000.0, 600.0);
        // Root spans 800..1800.
        assert_eq!(opts.intersection_ratio(900.0, 100.0, vp), 1.0);
        assert_eq!(opts.intersection_ratio(750.0, 100.0, vp), 0.5);
        assert_eq!(opts.intersection_ratio(1900.0, 100.0, vp), 0.0);
        assert!(opts.is_intersecting(800.0, 200.0, vp));
        assert!(!opts.is_intersecting(750.0, 100.0, vp));
        assert!(opts.with_threshold(0.0).is_intersecting(750.0, 100.0, vp));
        assert!(!opts.with_root_margin(0.0).is_intersecting(900.0, 100.0, vp));
    }

    #[test]
    fn zero_extent_item_ratio() {
        let opts = ObserverOptions::default().with_root_margin(0.0);
        let vp = Viewport::new(0.0, 100.0);
        assert_eq!(opts.intersection_ratio(50.0, 0.0, vp), 1.0);
        assert_eq!(opts.intersection_ratio(150.0, 0.0, vp), 0.0);
    }

    #[test]
    fn state_machine_transitions() {
        let mut host = ObserverLog::default();
        let mut tracker = VisibilityTracker::new(ObserverOptions::default(), false);

        assert_eq!(tracker.state(3), ItemVisibility::Unmounted);
        tracker.mount(3, &mut host);
        assert_eq!(
            tracker.state(3),
            ItemVisibility::Mounted {
                intersecting: false
            }
        );
        assert_eq!(
            tracker.notify(3, true),
            VisibilityUpdate::Changed { intersecting: true }
        );
        assert!(tracker.state(3).is_intersecting());
        assert_eq!(tracker.notify(3, true), VisibilityUpdate::Unchanged);
        assert_eq!(
            tracker.notify(3, false),
            VisibilityUpdate::Changed {
                intersecting: false
            }
        );

        tracker.unmount(3, &mut host);
        assert_eq!(tracker.state(3), ItemVisibility::Unmounted);
        assert_eq!(tracker.notify(3, true), VisibilityUpdate::Ignored);
        assert_eq!(tracker.state(3), ItemVisibility::Unmounted);
        assert!(host.live.is_empty());
    }

    #[test]
    fn assume_visible_on_mount() {
        let mut host = ObserverLog::default();
        let mut tracker = VisibilityTracker::new(ObserverOptions::default(), true);
        tracker.mount(0, &mut host);
        assert!(tracker.state(0).is_intersecting());
    }

    #[test]
    fn mount_twice_keeps_one_observer() {
        let mut host = ObserverLog::default();
        let mut tracker = VisibilityTracker::default();
        tracker.mount(1, &mut host);
        tracker.mount(1, &mut host);
        assert_eq!(host.live.len(), 1);
        tracker.unmount(1, &mut host);
        tracker.unmount(1, &mut host);
        assert_eq!(host.disconnected.len(), 1);
    }

    #[test]
    fn apply_delta_follows_window() {
        let mut host = ObserverLog::default();
        let mut tracker = VisibilityTracker::default();
        tracker.sync(&window(0, 5), &mut host);
        assert_eq!(tracker.mounted_count(), 5);

        let delta = WindowDelta::between(&window(0, 5), &window(3, 8));
        tracker.apply_delta(&delta, &mut host);
        assert_eq!(tracker.mounted_indices().collect::<Vec<_>>(), vec![3, 4, 5, 6, 7]);
        assert_eq!(host.live.len(), 5);
        assert_eq!(host.disconnected.len(), 3);
    }

    #[test]
    fn sync_drops_stale_entries() {
        let mut host = ObserverLog::default();
        let mut tracker = VisibilityTracker::default();
        tracker.sync(&window(10, 15), &mut host);
        tracker.sync(&Window::EMPTY, &mut host);
        assert_eq!(tracker.mounted_count(), 0);
        assert!(host.live.is_empty());
    }

    #[test]
    fn opt_in_limits_mounted_items() {
        let mut host = ObserverLog::default();
        let mut tracker = VisibilityTracker::default();
        tracker.set_opt_in(|i| i % 2 == 0);
        tracker.sync(&window(0, 6), &mut host);
        assert_eq!(tracker.mounted_indices().collect::<Vec<_>>(), vec![0, 2, 4]);
        assert_eq!(tracker.state(1), ItemVisibility::Unmounted);
        assert_eq!(tracker.notify(1, true), VisibilityUpdate::Ignored);

        // Narrowing further detaches items that no longer opt in.
        tracker.set_opt_in(|i| i == 4);
        tracker.sync(&window(0, 6), &mut host);
        assert_eq!(tracker.mounted_indices().collect::<Vec<_>>(), vec![4]);
        assert_eq!(host.live.len(), 1);

        tracker.clear_opt_in();
        assert!(tracker.opts_in(1));
        tracker.sync(&window(0, 6), &mut host);
        assert_eq!(tracker.mounted_count(), 6);
        assert!(format!("{tracker:?}").contains("opt_in: false"));
    }

    #[test]
    fn clear_releases_everything_once() {
        let mut host = ObserverLog::default();
        let mut tracker = VisibilityTracker::default();
        tracker.sync(&window(0, 4), &mut host);
        assert_eq!(tracker.clear(&mut host), 4);
        assert_eq!(tracker.clear(&mut host), 0);
        assert!(host.live.is_empty());
        assert_eq!(host.disconnected.len(), 4);
    }
}
