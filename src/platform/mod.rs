// vasurf/src/platform/mod.rs
//
//! Driver backends.

pub mod software;

#[cfg(va_backend)]
pub mod va;
