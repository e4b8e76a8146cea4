// vasurf/src/subpicture.rs
//
//! Subpictures: overlay images that can be composited onto surfaces.

use crate::display::Display;
use crate::driver::{DriverSubpictureFlags, SubpictureID};
use crate::error::CheckStatus;
use crate::format::VideoFormat;
use crate::image::Image;
use crate::overlay::OverlayRectangle;
use crate::Error;

use log::{debug, warn};
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex};

bitflags! {
    /// How a subpicture is blended onto its surfaces.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SubpictureFlags: u32 {
        /// The source pixels have their color channels multiplied by alpha.
        const PREMULTIPLIED_ALPHA = 0x0001;
        /// The whole subpicture is blended with the alpha set by `set_global_alpha()`.
        const GLOBAL_ALPHA        = 0x0002;
        /// Pixels matching the driver's chroma key are transparent.
        const CHROMA_KEYING       = 0x0004;
    }
}

impl SubpictureFlags {
    pub(crate) fn to_driver_flags(self) -> DriverSubpictureFlags {
        let mut flags = DriverSubpictureFlags::empty();
        if self.contains(SubpictureFlags::CHROMA_KEYING) {
            flags |= DriverSubpictureFlags::CHROMA_KEYING;
        }
        if self.contains(SubpictureFlags::GLOBAL_ALPHA) {
            flags |= DriverSubpictureFlags::GLOBAL_ALPHA;
        }
        flags
    }
}

/// An overlay image bound to the driver for compositing.
///
/// Subpictures are reference counted; a surface keeps a handle to each subpicture associated
/// with it. Two handles compare equal with `is()` when they refer to the same subpicture.
#[derive(Clone)]
pub struct Subpicture(Arc<SubpictureData>);

struct SubpictureData {
    display: Display,
    id: SubpictureID,
    image: Image,
    flags: SubpictureFlags,
    global_alpha: Mutex<f32>,
}

impl Debug for Subpicture {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Subpicture({})", self.0.id)
    }
}

impl Drop for SubpictureData {
    fn drop(&mut self) {
        debug!("subpicture {}", self.id);
        if !self.id.is_valid() {
            return;
        }
        let result = self.display.lock().destroy_subpicture(self.id);
        if result.check("vaDestroySubpicture()").is_err() {
            warn!("failed to destroy subpicture {}", self.id);
        }
    }
}

impl Subpicture {
    /// Creates a subpicture sourcing its pixels from `image`.
    pub fn new(image: &Image, flags: SubpictureFlags) -> Result<Subpicture, Error> {
        let display = image.display();
        debug!("create from image {}", image.id());
        let id = display
            .lock()
            .create_subpicture(image.id())
            .check("vaCreateSubpicture()")?;
        debug!("subpicture {}", id);
        Ok(Subpicture(Arc::new(SubpictureData {
            display: display.clone(),
            id,
            image: image.clone(),
            flags,
            global_alpha: Mutex::new(1.0),
        })))
    }

    /// Uploads the pixels of an overlay rectangle into a new image and creates a subpicture from
    /// it.
    pub fn from_overlay_rectangle(
        display: &Display,
        rect: &OverlayRectangle,
    ) -> Result<Subpicture, Error> {
        let (width, height) = (rect.width(), rect.height());
        if width == 0 || height == 0 {
            return Err(Error::PreconditionMismatch);
        }
        let image = Image::new(display, VideoFormat::BGRA, width, height)?;

        // Repack the rows to the image pitch.
        let src_stride = width as usize * 4;
        let dst_stride = image.pitches().first().copied().unwrap_or(0) as usize;
        if dst_stride < src_stride {
            return Err(Error::PreconditionMismatch);
        }
        let dst_offset = image.offsets().first().copied().unwrap_or(0) as usize;
        let mut data = vec![0; image.data_size()];
        for (row, src_row) in rect.pixels().chunks(src_stride).enumerate() {
            let start = dst_offset + row * dst_stride;
            match data.get_mut(start..start + src_stride) {
                Some(dst_row) => dst_row.copy_from_slice(src_row),
                None => return Err(Error::PreconditionMismatch),
            }
        }
        image.write_pixels(&data)?;

        let mut flags = SubpictureFlags::empty();
        if rect.is_premultiplied() {
            flags |= SubpictureFlags::PREMULTIPLIED_ALPHA;
        }
        let global_alpha = rect.global_alpha();
        if global_alpha != 1.0 {
            flags |= SubpictureFlags::GLOBAL_ALPHA;
        }

        let subpicture = Subpicture::new(&image, flags)?;
        if flags.contains(SubpictureFlags::GLOBAL_ALPHA) {
            subpicture.set_global_alpha(global_alpha)?;
        }
        Ok(subpicture)
    }

    #[inline]
    pub fn id(&self) -> SubpictureID {
        self.0.id
    }

    /// The image the subpicture takes its pixels from.
    #[inline]
    pub fn image(&self) -> &Image {
        &self.0.image
    }

    #[inline]
    pub fn flags(&self) -> SubpictureFlags {
        self.0.flags
    }

    pub fn global_alpha(&self) -> f32 {
        *self.0.global_alpha.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Sets the alpha value the whole subpicture is blended with.
    ///
    /// Only subpictures created with `GLOBAL_ALPHA` accept this; others return
    /// `PreconditionMismatch`.
    pub fn set_global_alpha(&self, global_alpha: f32) -> Result<(), Error> {
        if !self.0.flags.contains(SubpictureFlags::GLOBAL_ALPHA) {
            return Err(Error::PreconditionMismatch);
        }
        let mut current = self.0.global_alpha.lock().unwrap_or_else(|err| err.into_inner());
        if *current == global_alpha {
            return Ok(());
        }
        self.0
            .display
            .lock()
            .set_subpicture_global_alpha(self.0.id, global_alpha)
            .check("vaSetSubpictureGlobalAlpha()")?;
        *current = global_alpha;
        Ok(())
    }

    /// Returns true if both handles refer to the same subpicture.
    #[inline]
    pub fn is(&self, other: &Subpicture) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
