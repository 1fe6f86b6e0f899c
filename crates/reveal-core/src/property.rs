//! Change-detecting properties.
//!
//! A [`Property<T>`] wraps a value and reports whether a write actually
//! changed it. Pair it with a [`Signal`](crate::Signal) to notify listeners
//! only on real changes:
//!
//! ```
//! use reveal_core::{Property, Signal};
//!
//! struct Viewport {
//!     height: Property<f32>,
//!     height_changed: Signal<f32>,
//! }
//!
//! impl Viewport {
//!     fn set_height(&self, height: f32) {
//!         if self.height.set(height) {
//!             self.height_changed.emit(height);
//!         }
//!     }
//! }
//!
//! let viewport = Viewport { height: Property::new(600.0), height_changed: Signal::new() };
//! viewport.set_height(600.0); // no emission
//! viewport.set_height(720.0);
//! assert_eq!(viewport.height.get(), 720.0);
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A value with change detection.
///
/// Uses interior mutability with `RwLock` and is `Send + Sync` when `T` is.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}
