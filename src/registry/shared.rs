//! Lock-guarded handles to application-owned storage.
//!
//! Every field the transport context and the periodic context both touch
//! lives behind one `embassy-sync` blocking mutex. The application creates
//! the handle and keeps a clone; the registry only ever holds clones.

use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// A single mutual-exclusion domain around one value.
pub type Guarded<T> = Mutex<CriticalSectionRawMutex, RefCell<T>>;

/// Build a [`Guarded`] value.
pub fn guarded<T>(value: T) -> Guarded<T> {
    Mutex::new(RefCell::new(value))
}

/// Cloneable handle to a [`Guarded`] value.
pub struct Shared<T>(Arc<Guarded<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(guarded(value)))
    }

    /// Run `f` with shared access to the value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.lock(|cell| f(&cell.borrow()))
    }

    /// Run `f` with exclusive access to the value.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.0.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Whether both handles point at the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Copy> Shared<T> {
    pub fn get(&self) -> T {
        self.with(|v| *v)
    }

    pub fn set(&self, value: T) {
        self.with_mut(|v| *v = value);
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.with(|v| f.debug_tuple("Shared").field(v).finish())
    }
}
