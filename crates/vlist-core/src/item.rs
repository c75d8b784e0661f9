#![forbid(unsafe_code)]

//! Item identity and the positioned items handed to the rendering layer.

use std::fmt;
use std::hash::Hash;

use crate::geometry::ExtentModel;
use crate::window::Window;

/// Stable identity used by the host to reconcile rendered items.
///
/// Keys must survive reordering: two items with the same key are the same
/// logical item even when their index changes.
pub trait ItemKey {
    /// Key type.
    type Key: Clone + Eq + Hash + fmt::Debug;

    /// The key for this item.
    fn item_key(&self) -> Self::Key;
}

impl ItemKey for String {
    type Key = String;

    fn item_key(&self) -> String {
        self.clone()
    }
}

impl ItemKey for &str {
    type Key = String;

    fn item_key(&self) -> String {
        (*self).to_owned()
    }
}

macro_rules! impl_item_key_for_int {
    ($($t:ty),*) => {
        $(
            impl ItemKey for $t {
                type Key = $t;

                fn item_key(&self) -> $t {
                    *self
                }
            }
        )*
    };
}

impl_item_key_for_int!(u32, u64, usize, i32, i64);

/// An item inside the current window, positioned absolutely.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedItem<'a, T, K> {
    /// Ordinal index in the full collection.
    pub index: usize,
    /// Reconciliation key.
    pub key: K,
    /// The payload.
    pub item: &'a T,
    /// Absolute start offset, derived from `index`.
    pub offset: f64,
    /// Extent of the item.
    pub extent: f64,
}

/// Materialize the items of `window`, keyed by `key_fn`.
///
/// Indices past the end of `items` are skipped, so a window computed against a
/// stale geometry never reads out of bounds.
pub fn render_window<'a, T, K, G, F>(
    window: &Window,
    geometry: &G,
    items: &'a [T],
    key_fn: F,
) -> Vec<RenderedItem<'a, T, K>>
where
    G: ExtentModel + ?Sized,
    F: Fn(&T) -> K,
{
    let end = window.end_index.min(items.len());
    let start = window.start_index.min(end);
    items[start..end]
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let index = start + i;
            RenderedItem {
                index,
                key: key_fn(item),
                item,
                offset: geometry.offset_of(index),
                extent: geometry.extent_of(index),
            }
        })
        .collect()
}

/// [`render_window`] keyed by [`ItemKey`].
pub fn render_window_keyed<'a, T, G>(
    window: &Window,
    geometry: &G,
    items: &'a [T],
) -> Vec<RenderedItem<'a, T, T::Key>>
where
    T: ItemKey,
    G: ExtentModel + ?Sized,
{
    render_window(window, geometry, items, ItemKey::item_key)
}
