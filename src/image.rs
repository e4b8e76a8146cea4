// vasurf/src/image.rs
//
//! CPU-mappable images.

use crate::display::Display;
use crate::driver::{BufferID, ImageDescriptor, ImageID};
use crate::error::CheckStatus;
use crate::format::VideoFormat;
use crate::Error;

use euclid::default::Size2D;
use log::{debug, warn};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// A driver image: pixel data that can be read and written from the CPU.
///
/// Images are reference counted. Cloning an `Image` makes another handle to the same driver
/// image; the driver image is destroyed when the last handle is dropped.
#[derive(Clone)]
pub struct Image(Arc<ImageData>);

struct ImageData {
    display: Display,
    descriptor: ImageDescriptor,
}

impl Debug for Image {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Image({})", self.0.descriptor.id)
    }
}

impl Drop for ImageData {
    fn drop(&mut self) {
        let id = self.descriptor.id;
        debug!("image {}", id);
        if !id.is_valid() {
            return;
        }
        let result = self.display.lock().destroy_image(id);
        if result.check("vaDestroyImage()").is_err() {
            warn!("failed to destroy image {}", id);
        }
    }
}

impl Image {
    /// Creates an image with its own storage.
    pub fn new(
        display: &Display,
        format: VideoFormat,
        width: u32,
        height: u32,
    ) -> Result<Image, Error> {
        debug!("format {:?}, size {}x{}", format, width, height);
        let fourcc = format.to_fourcc().ok_or(Error::UnsupportedFormat(format))?;
        let descriptor = display
            .lock()
            .create_image(fourcc, width, height)
            .check("vaCreateImage()")?;
        Ok(Image::from_descriptor(display, descriptor))
    }

    /// Takes ownership of an image the driver has already created.
    pub(crate) fn from_descriptor(display: &Display, descriptor: ImageDescriptor) -> Image {
        debug!("image {}", descriptor.id);
        Image(Arc::new(ImageData {
            display: display.clone(),
            descriptor,
        }))
    }

    #[inline]
    pub fn id(&self) -> ImageID {
        self.0.descriptor.id
    }

    /// The driver buffer holding the pixel data.
    #[inline]
    pub fn buffer_id(&self) -> BufferID {
        self.0.descriptor.buffer
    }

    /// The image format, or `None` if the driver's pixel format has no `VideoFormat`
    /// equivalent.
    pub fn format(&self) -> Option<VideoFormat> {
        VideoFormat::from_fourcc(self.0.descriptor.fourcc)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.0.descriptor.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.0.descriptor.height
    }

    #[inline]
    pub fn size(&self) -> Size2D<u32> {
        Size2D::new(self.width(), self.height())
    }

    #[inline]
    pub fn num_planes(&self) -> usize {
        self.0.descriptor.num_planes as usize
    }

    /// The row pitch of each plane, in bytes.
    pub fn pitches(&self) -> &[u32] {
        &self.0.descriptor.pitches[..self.num_planes()]
    }

    /// The byte offset of each plane in the buffer.
    pub fn offsets(&self) -> &[u32] {
        &self.0.descriptor.offsets[..self.num_planes()]
    }

    /// The size of the image buffer, in bytes.
    #[inline]
    pub fn data_size(&self) -> usize {
        self.0.descriptor.data_size as usize
    }

    #[inline]
    pub fn display(&self) -> &Display {
        &self.0.display
    }

    /// Copies the image data out of the driver buffer.
    pub fn read_pixels(&self) -> Result<Vec<u8>, Error> {
        self.0
            .display
            .lock()
            .read_buffer(self.buffer_id())
            .check("vaMapBuffer()")
    }

    /// Copies `pixels` into the driver buffer. `pixels` must fit in `data_size()` bytes.
    pub fn write_pixels(&self, pixels: &[u8]) -> Result<(), Error> {
        if pixels.len() > self.data_size() {
            return Err(Error::PreconditionMismatch);
        }
        self.0
            .display
            .lock()
            .write_buffer(self.buffer_id(), pixels)
            .check("vaMapBuffer()")
    }
}
