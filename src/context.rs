// vasurf/src/context.rs
//
//! Declarations common to all contexts.

use crate::overlay::OverlayComposition;
use crate::Error;

use std::sync::Mutex;

/// Identifies a context.
///
/// Surfaces refer to their parent context by id; the context itself is looked up through
/// `Display::context()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextID(pub u64);

static NEXT_CONTEXT_ID: Mutex<ContextID> = Mutex::new(ContextID(0));

impl ContextID {
    /// Returns an id that no other context in this process has.
    pub fn new() -> ContextID {
        let mut next_context_id = NEXT_CONTEXT_ID.lock().unwrap_or_else(|err| err.into_inner());
        let id = *next_context_id;
        next_context_id.0 += 1;
        id
    }
}

impl Default for ContextID {
    #[inline]
    fn default() -> ContextID {
        ContextID::new()
    }
}

/// A decoding or rendering context that surfaces belong to.
///
/// A context may render overlays itself rather than through per-surface subpictures. Surfaces
/// forward overlay compositions to their parent context when asked to.
pub trait Context: Send + Sync {
    /// Returns the id this context was registered with.
    fn id(&self) -> ContextID;

    /// Replaces the overlays the context renders with `composition`. `None` clears them.
    fn apply_composition(&self, composition: Option<&OverlayComposition>) -> Result<(), Error>;
}
