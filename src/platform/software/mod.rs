// vasurf/src/platform/software/mod.rs
//
//! A driver that emulates video acceleration in system memory.
//!
//! Useful for testing and for machines without a video-acceleration stack. Surfaces always use
//! the default frame layout of their pixel format, and subpictures are tracked but never
//! blended.

pub mod driver;

pub use self::driver::{Association, SoftwareDriver};
