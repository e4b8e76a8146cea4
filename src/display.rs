// vasurf/src/display.rs
//
//! The shared connection to a driver.

use crate::context::{Context, ContextID};
use crate::driver::{ApiVersion, Driver};

use fnv::FnvHashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// A connection to a video-acceleration driver.
///
/// The display is the single point of serialization for the driver: `lock()` must be held
/// around every driver call. Displays are cheap to clone, and all clones share the same driver
/// and lock.
///
/// The display also keeps a registry of the contexts created on it, so that surfaces can refer
/// to their parent context by `ContextID` without keeping it alive.
#[derive(Clone)]
pub struct Display(Arc<DisplayData>);

struct DisplayData {
    driver: Mutex<Box<dyn Driver>>,
    api_version: ApiVersion,
    contexts: Mutex<FnvHashMap<ContextID, Weak<dyn Context>>>,
}

impl Debug for Display {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Display(API {})", self.0.api_version)
    }
}

impl Display {
    /// Opens a display on top of the given driver.
    pub fn new<D>(driver: D) -> Display
    where
        D: Driver + 'static,
    {
        let api_version = driver.api_version();
        Display(Arc::new(DisplayData {
            driver: Mutex::new(Box::new(driver)),
            api_version,
            contexts: Mutex::new(FnvHashMap::default()),
        }))
    }

    /// Acquires exclusive access to the driver.
    ///
    /// Release the guard as soon as the driver call returns. A lock poisoned by a panic in
    /// another thread is recovered, since driver state is owned by the driver itself.
    pub fn lock(&self) -> MutexGuard<Box<dyn Driver>> {
        self.0.driver.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Returns the version of the driver interface.
    #[inline]
    pub fn api_version(&self) -> ApiVersion {
        self.0.api_version
    }

    /// Returns true if both handles refer to the same display.
    #[inline]
    pub fn is(&self, other: &Display) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // Lock the context registry
    fn contexts(&self) -> MutexGuard<FnvHashMap<ContextID, Weak<dyn Context>>> {
        self.0.contexts.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Makes a context reachable by its id.
    ///
    /// The registry holds a weak reference only.
    pub fn register_context(&self, context: &Arc<dyn Context>) {
        let mut contexts = self.contexts();
        contexts.retain(|_, context| context.strong_count() > 0);
        contexts.insert(context.id(), Arc::downgrade(context));
    }

    /// Removes a context from the registry.
    pub fn unregister_context(&self, id: ContextID) {
        self.contexts().remove(&id);
    }

    /// Looks up a live context by id.
    pub fn context(&self, id: ContextID) -> Option<Arc<dyn Context>> {
        self.contexts().get(&id).and_then(Weak::upgrade)
    }
}
