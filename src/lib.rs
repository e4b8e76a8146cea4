// vasurf/src/lib.rs
//
//! Hardware video surface management on top of a video-acceleration driver.
//!
//! A `Surface` is an opaque, GPU-resident frame buffer allocated by the driver. This crate
//! allocates and destroys surfaces, moves pixel data between surfaces and CPU-mappable images,
//! and composites overlay images (subpictures) onto surfaces. It does no pixel processing of
//! its own: conversion and blending happen in the driver. Every driver call is serialized
//! through the single lock held by the `Display`.
//!
//! The driver is reached through the `Driver` trait. A software implementation that emulates a
//! driver in memory is always available; a libva backend is available on Linux with the `sm-va`
//! feature.

#[macro_use]
extern crate bitflags;

pub mod platform;
pub use platform::software::SoftwareDriver;
#[cfg(va_backend)]
pub use platform::va::VaDriver;

pub mod error;
pub use crate::error::{DriverStatus, Error};

pub mod driver;
pub use crate::driver::{ApiVersion, Driver, ImageID, SubpictureID, SurfaceID};

mod display;
pub use crate::display::Display;

mod format;
pub use crate::format::{ChromaType, Fourcc, VideoFormat};

mod video_info;
pub use crate::video_info::{VideoInfo, MAX_PLANES};

mod image;
pub use crate::image::Image;

mod subpicture;
pub use crate::subpicture::{Subpicture, SubpictureFlags};

mod buffer_proxy;
pub use crate::buffer_proxy::{BufferMemoryType, BufferProxy};

mod overlay;
pub use crate::overlay::{OverlayComposition, OverlayRectangle};

mod context;
pub use crate::context::{Context, ContextID};

mod surface;
pub use crate::surface::{Rectangle, Surface, SurfaceAllocFlags, SurfaceStatus};

#[cfg(test)]
mod tests;
