#![forbid(unsafe_code)]

//! Headless scroll session.
//!
//! [`DemoHost`] stands in for a UI surface: it hands out handles, remembers the
//! outstanding frame and which index each observer watches. [`run`] drives a
//! controller through a scripted session and writes every published window as
//! one JSON line.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use serde::Serialize;
use vlist::{
    ControllerStats, ExtentModel, FrameToken, ListConfig, ObserverId,
    ObserverOptions, PrefixSumGeometry, ScrollAlign, ScrollSubscription, TeardownReport,
    ViewportController, ViewportHost, Window, render_window,
};

use crate::cli::Opts;

/// Samples delivered between two frame callbacks.
const SAMPLES_PER_FRAME: u32 = 4;

// ============================================================================
// Host
// ============================================================================

/// In-memory host surface.
#[derive(Debug, Default)]
pub struct DemoHost {
    next_id: u64,
    frame: Cell<Option<FrameToken>>,
    observers: BTreeMap<ObserverId, usize>,
    content_extent: f64,
}

impl DemoHost {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Deliver the outstanding frame, if any.
    fn take_frame(&self) -> Option<FrameToken> {
        self.frame.take()
    }

    /// Indices with a live observer.
    fn observed_indices(&self) -> Vec<usize> {
        self.observers.values().copied().collect()
    }
}

impl ViewportHost for DemoHost {
    fn subscribe_scroll(&mut self) -> ScrollSubscription {
        ScrollSubscription(self.next())
    }

    fn unsubscribe_scroll(&mut self, subscription: ScrollSubscription) {
        tracing::debug!(subscription = subscription.0, "scroll listener detached");
    }

    fn request_frame(&mut self) -> FrameToken {
        let token = FrameToken(self.next());
        self.frame.set(Some(token));
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if self.frame.get() == Some(token) {
            self.frame.set(None);
        }
    }

    fn observe(&mut self, index: usize, _options: &ObserverOptions) -> ObserverId {
        let id = ObserverId(self.next());
        self.observers.insert(id, index);
        id
    }

    fn disconnect(&mut self, observer: ObserverId) {
        self.observers.remove(&observer);
    }

    fn set_content_extent(&mut self, extent: f64) {
        self.content_extent = extent;
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Serialize)]
struct WindowRecord<'a> {
    event: &'static str,
    seq: u64,
    phase: &'a str,
    scroll_offset: f64,
    content_extent: f64,
    window: Window,
    first_key: Option<&'a str>,
    last_key: Option<&'a str>,
    rendered: usize,
    intersecting: usize,
}

/// Final line of a session.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSummary {
    pub event: &'static str,
    pub published: u64,
    pub recomputes: u64,
    pub unchanged: u64,
    pub samples: u64,
    pub signals: u64,
    pub coalesced: u64,
    pub frames_requested: u64,
    pub final_window: Window,
    pub unsubscribed: bool,
    pub frame_cancelled: bool,
    pub observers_released: usize,
}

impl SessionSummary {
    fn new(stats: ControllerStats, final_window: Window, report: TeardownReport) -> Self {
        Self {
            event: "summary",
            published: stats.publishes,
            recomputes: stats.recomputes,
            unchanged: stats.unchanged,
            samples: stats.throttle.samples,
            signals: stats.throttle.signals,
            coalesced: stats.throttle.coalesced,
            frames_requested: stats.throttle.frames_requested,
            final_window,
            unsubscribed: report.unsubscribed,
            frame_cancelled: report.frame_cancelled,
            observers_released: report.observers_released,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure while running a session.
#[derive(Debug)]
pub enum DemoError {
    /// The list could not be built.
    List(vlist::Error),
    /// Writing output failed.
    Io(io::Error),
    /// Serializing a record failed.
    Json(serde_json::Error),
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(err) => write!(f, "list setup failed: {err}"),
            Self::Io(err) => write!(f, "output failed: {err}"),
            Self::Json(err) => write!(f, "serialization failed: {err}"),
        }
    }
}

impl std::error::Error for DemoError {}

impl From<vlist::Error> for DemoError {
    fn from(err: vlist::Error) -> Self {
        Self::List(err)
    }
}

impl From<io::Error> for DemoError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for DemoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Item labels for a collection of `count` items.
#[must_use]
pub fn labels(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("Item {i}")).collect()
}

/// Per-item extents alternating between `base` and `1.5 * base`.
#[must_use]
pub fn variable_extents(count: usize, base: f64) -> Vec<f64> {
    (0..count)
        .map(|i| if i % 2 == 0 { base } else { base * 1.5 })
        .collect()
}

/// Run a session described by `opts` and write JSONL to `out`.
///
/// # Errors
/// Returns [`DemoError`] if the list cannot be built or output fails.
pub fn run<W: Write>(
    opts: &Opts,
    config: ListConfig,
    out: &mut W,
) -> Result<SessionSummary, DemoError> {
    let config = if opts.lazy {
        config.with_lazy_visibility(true)
    } else {
        config
    };
    tracing::info!(
        count = opts.count,
        variable = opts.variable,
        config = %config.summary_short(),
        "session_start"
    );

    if opts.variable {
        let extents = variable_extents(opts.count, opts.item_extent);
        let controller =
            vlist::variable_list(DemoHost::default(), &extents, opts.client_extent, config)?;
        let base = opts.item_extent;
        drive(opts, controller, out, |c, n| {
            let geometry = PrefixSumGeometry::from_extents(&variable_extents(n, base))?;
            c.replace_geometry(geometry);
            Ok(())
        })
    } else {
        let controller = vlist::fixed_list(
            DemoHost::default(),
            opts.count,
            opts.item_extent,
            opts.client_extent,
            config,
        )?;
        drive(opts, controller, out, |c, n| {
            c.on_collection_change(n);
            Ok(())
        })
    }
}

fn drive<G, W, S>(
    opts: &Opts,
    mut controller: ViewportController<G, DemoHost>,
    out: &mut W,
    shrink: S,
) -> Result<SessionSummary, DemoError>
where
    G: ExtentModel,
    W: Write,
    S: FnOnce(&mut ViewportController<G, DemoHost>, usize) -> Result<(), vlist::Error>,
{
    let published = Rc::new(RefCell::new(Vec::<Window>::new()));
    let sink = published.clone();
    controller.on_window_change(move |w| sink.borrow_mut().push(*w));

    let mut items = labels(opts.count);
    let mut seq = 0u64;

    write_record(out, &controller, &items, "initial", &mut seq, controller.window())?;

    // Smooth scroll: several samples per frame, one frame callback each.
    let sub_step = opts.step / f64::from(SAMPLES_PER_FRAME);
    let mut offset = 0.0;
    for _ in 0..opts.steps {
        for _ in 0..SAMPLES_PER_FRAME {
            offset += sub_step;
            controller.on_scroll(offset);
        }
        deliver_frame(&mut controller);
        flush(out, &controller, &items, "scroll", &mut seq, &published)?;
    }

    if let Some(index) = opts.jump_to {
        let target = controller.scroll_offset_for(index, ScrollAlign::Start);
        tracing::info!(index, target, "jump");
        controller.on_scroll(target);
        deliver_frame(&mut controller);
        flush(out, &controller, &items, "jump", &mut seq, &published)?;
    }

    if let Some(count) = opts.shrink_to {
        tracing::info!(from = items.len(), to = count, "collection_change");
        items = labels(count);
        shrink(&mut controller, count)?;
        flush(out, &controller, &items, "collection", &mut seq, &published)?;
    }

    // Leave a scroll in flight so teardown has a frame to cancel.
    controller.on_scroll(offset + opts.step);

    let stats = controller.stats();
    let final_window = controller.window();
    let report = controller.teardown();
    tracing::info!(
        published = stats.publishes,
        observers_released = report.observers_released,
        "session_end"
    );

    let summary = SessionSummary::new(stats, final_window, report);
    serde_json::to_writer(&mut *out, &summary)?;
    writeln!(out)?;
    Ok(summary)
}

/// Deliver the outstanding frame and the intersection notifications a real
/// observer would produce for the new scroll position.
fn deliver_frame<G: ExtentModel>(controller: &mut ViewportController<G, DemoHost>) {
    if controller.host().take_frame().is_some() {
        controller.on_frame();
    }

    let options = controller.config().observer;
    let viewport = controller.viewport();
    let notifications: Vec<(usize, bool)> = controller
        .host()
        .observed_indices()
        .into_iter()
        .map(|index| {
            let geometry = controller.geometry();
            let visible = options.is_intersecting(
                geometry.offset_of(index),
                geometry.extent_of(index),
                viewport,
            );
            (index, visible)
        })
        .collect();
    for (index, visible) in notifications {
        let _ = controller.on_intersection(index, visible);
    }
}

fn flush<G: ExtentModel, W: Write>(
    out: &mut W,
    controller: &ViewportController<G, DemoHost>,
    items: &[String],
    phase: &str,
    seq: &mut u64,
    published: &Rc<RefCell<Vec<Window>>>,
) -> Result<(), DemoError> {
    let windows: Vec<Window> = published.borrow_mut().drain(..).collect();
    for window in windows {
        write_record(out, controller, items, phase, seq, window)?;
    }
    Ok(())
}

fn write_record<G: ExtentModel, W: Write>(
    out: &mut W,
    controller: &ViewportController<G, DemoHost>,
    items: &[String],
    phase: &str,
    seq: &mut u64,
    window: Window,
) -> Result<(), DemoError> {
    let rendered = render_window(&window, controller.geometry(), items, String::clone);
    let intersecting = window
        .indices()
        .filter(|i| controller.visibility(*i).is_intersecting())
        .count();
    let record = WindowRecord {
        event: "window",
        seq: *seq,
        phase,
        scroll_offset: controller.viewport().scroll_offset,
        content_extent: controller.host().content_extent,
        window,
        first_key: rendered.first().map(|r| r.key.as_str()),
        last_key: rendered.last().map(|r| r.key.as_str()),
        rendered: rendered.len(),
        intersecting,
    };
    *seq += 1;
    serde_json::to_writer(&mut *out, &record)?;
    writeln!(out)?;
    Ok(())
}
