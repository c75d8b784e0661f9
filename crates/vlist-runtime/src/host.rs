#![forbid(unsafe_code)]

//! Host surface interface.
//!
//! The controller never touches a UI toolkit directly. Everything it needs
//! from the surrounding platform goes through [`ViewportHost`]:
//!
//! | Resource | Acquire | Release |
//! |----------|---------|---------|
//! | Scroll listener | [`subscribe_scroll`](ViewportHost::subscribe_scroll) | [`unsubscribe_scroll`](ViewportHost::unsubscribe_scroll) |
//! | Frame callback | [`request_frame`](ViewportHost::request_frame) | delivery, or [`cancel_frame`](ViewportHost::cancel_frame) |
//! | Intersection observer | [`observe`](ViewportHost::observe) | [`disconnect`](ViewportHost::disconnect) |
//!
//! Every handle returned by an acquire call is released exactly once by the
//! controller. Hosts report scroll offsets, client resizes, frame callbacks and
//! intersection changes back through the controller's `on_*` methods.

use std::fmt;

pub use crate::visibility::ObserverOptions;

/// Handle for the controller's scroll listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScrollSubscription(pub u64);

/// Handle for a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(pub u64);

/// Handle for an intersection observer attached to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

/// Identifier for a window-change listener registered on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Platform services consumed by the viewport controller.
pub trait ViewportHost {
    /// Start delivering scroll events for the list's scroll container.
    fn subscribe_scroll(&mut self) -> ScrollSubscription;

    /// Stop delivering scroll events.
    fn unsubscribe_scroll(&mut self, subscription: ScrollSubscription);

    /// Schedule one frame callback. The host later calls the controller's
    /// `on_frame`.
    fn request_frame(&mut self) -> FrameToken;

    /// Cancel a frame callback that has not been delivered.
    fn cancel_frame(&mut self, token: FrameToken);

    /// Attach an intersection observer to the element rendered for `index`.
    fn observe(&mut self, index: usize, options: &ObserverOptions) -> ObserverId;

    /// Detach an observer.
    fn disconnect(&mut self, observer: ObserverId);

    /// Size the scrollable content so the scrollbar reflects every item.
    fn set_content_extent(&mut self, extent: f64);
}

impl<H: ViewportHost + ?Sized> ViewportHost for &mut H {
    fn subscribe_scroll(&mut self) -> ScrollSubscription {
        (**self).subscribe_scroll()
    }

    fn unsubscribe_scroll(&mut self, subscription: ScrollSubscription) {
        (**self).unsubscribe_scroll(subscription);
    }

    fn request_frame(&mut self) -> FrameToken {
        (**self).request_frame()
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        (**self).cancel_frame(token);
    }

    fn observe(&mut self, index: usize, options: &ObserverOptions) -> ObserverId {
        (**self).observe(index, options)
    }

    fn disconnect(&mut self, observer: ObserverId) {
        (**self).disconnect(observer);
    }

    fn set_content_extent(&mut self, extent: f64) {
        (**self).set_content_extent(extent);
    }
}
