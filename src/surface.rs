// vasurf/src/surface.rs
//
//! Hardware video surfaces.

use crate::buffer_proxy::BufferProxy;
use crate::context::ContextID;
use crate::display::Display;
use crate::driver::{ApiVersion, DriverSurfaceStatus, ExternalBufferFlags, ExternalBuffers};
use crate::driver::{MemoryType, RtFormat, SurfaceAttrib, SurfaceID};
use crate::error::CheckStatus;
use crate::format::{ChromaType, Fourcc, VideoFormat};
use crate::image::Image;
use crate::overlay::OverlayComposition;
use crate::subpicture::Subpicture;
use crate::video_info::VideoInfo;
use crate::Error;

use euclid::default::{Point2D, Rect, Size2D};
use log::{debug, error, warn};
use std::cell::OnceCell;
use std::cmp;
use std::fmt::{self, Debug, Formatter};

/// A rectangle in pixels.
pub type Rectangle = Rect<u32>;

// Allocation with a surface attribute list.
const SURFACE_ATTRIBUTES_VERSION: ApiVersion = ApiVersion::new(0, 34);
// Allocation on top of externally supplied memory.
const EXTERNAL_BUFFERS_VERSION: ApiVersion = ApiVersion::new(0, 36);

bitflags! {
    /// Constraints on how the driver lays out a surface created with `Surface::new_full()`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SurfaceAllocFlags: u32 {
        /// Store the surface linearly, without tiling.
        const LINEAR_STORAGE = 0x0000_0001;
        /// Use the plane strides of the supplied `VideoInfo`.
        const FIXED_STRIDES  = 0x0000_0002;
        /// Use the plane offsets of the supplied `VideoInfo`.
        const FIXED_OFFSETS  = 0x0000_0004;
    }
}

bitflags! {
    /// The pending operations on a surface.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SurfaceStatus: u32 {
        /// No operation is pending.
        const IDLE       = 0x0000_0001;
        /// The surface is being rendered to.
        const RENDERING  = 0x0000_0002;
        /// The surface is being displayed.
        const DISPLAYING = 0x0000_0004;
        /// The encoder skipped the frame held by the surface.
        const SKIPPED    = 0x0000_0008;
    }
}

impl SurfaceStatus {
    fn from_driver_status(driver_status: DriverSurfaceStatus) -> SurfaceStatus {
        let core = driver_status
            & (DriverSurfaceStatus::READY
                | DriverSurfaceStatus::RENDERING
                | DriverSurfaceStatus::DISPLAYING);
        let mut status = if core == DriverSurfaceStatus::READY {
            SurfaceStatus::IDLE
        } else if core == DriverSurfaceStatus::RENDERING {
            SurfaceStatus::RENDERING
        } else if core == DriverSurfaceStatus::DISPLAYING {
            SurfaceStatus::DISPLAYING
        } else {
            SurfaceStatus::empty()
        };
        if driver_status.contains(DriverSurfaceStatus::SKIPPED) {
            status |= SurfaceStatus::SKIPPED;
        }
        status
    }
}

/// An opaque, hardware-resident frame buffer.
///
/// A surface is created with one of three strategies: from a chroma type (`new()`), from an
/// explicit frame layout (`new_full()`, `new_with_format()`), or on top of externally allocated
/// memory (`new_from_buffer_proxy()`). Its size never changes afterwards.
///
/// Subpictures associated with the surface are composited onto it by the driver when it is
/// displayed. The surface holds a handle to each associated subpicture and keeps at most one
/// association per subpicture.
///
/// Dropping the surface tears down every association, forgets the parent context, frees the
/// driver surface, and releases the external buffer, if any. Surfaces are not `Sync`: a single
/// surface must not be mutated from several threads at once.
pub struct Surface {
    display: Display,
    id: SurfaceID,
    chroma_type: ChromaType,
    size: Size2D<u32>,
    // Resolved on first call to `format()` unless known at creation.
    format: OnceCell<VideoFormat>,
    subpictures: Option<Vec<Subpicture>>,
    extbuf_proxy: Option<BufferProxy>,
    parent_context: Option<ContextID>,
}

impl Debug for Surface {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Surface({})", self.id)
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        debug!("surface {}", self.id);

        self.destroy_subpictures();
        self.set_parent_context(None);

        if self.id.is_valid() {
            let result = self.display.lock().destroy_surface(self.id);
            if result.check("vaDestroySurfaces()").is_err() {
                warn!("failed to destroy surface {}", self.id);
            }
            self.id = SurfaceID::INVALID;
        }
        self.extbuf_proxy = None;
    }
}

// Maps a video format to its driver pixel format, chroma type, and render-target format.
fn lookup_format(format: VideoFormat) -> Result<(Fourcc, ChromaType, RtFormat), Error> {
    let formats = format.to_fourcc().and_then(|fourcc| {
        let chroma_type = format.chroma_type()?;
        Some((fourcc, chroma_type, chroma_type.to_rt_format()?))
    });
    formats.ok_or_else(|| {
        error!("unsupported format {:?}", format);
        Error::UnsupportedFormat(format)
    })
}

impl Surface {
    /// Creates a surface with the given chroma type and size.
    ///
    /// The pixel format is left to the driver and determined lazily by `format()`.
    pub fn new(
        display: &Display,
        chroma_type: ChromaType,
        width: u32,
        height: u32,
    ) -> Result<Surface, Error> {
        debug!("size {}x{}, chroma type {:?}", width, height, chroma_type);
        let mut surface = Surface::uninitialized(display);
        surface.create(chroma_type, width, height)?;
        Ok(surface)
    }

    /// Creates a surface with the format and size of `info`, optionally constrained by `flags`.
    ///
    /// Returns `CapabilityUnavailable` if the driver interface is older than 0.34. Callers
    /// should treat that as "not supported here" and fall back to `new()`.
    pub fn new_full(
        display: &Display,
        info: &VideoInfo,
        flags: SurfaceAllocFlags,
    ) -> Result<Surface, Error> {
        debug!(
            "size {}x{}, format {:?}, flags {:#010x}",
            info.width(),
            info.height(),
            info.format(),
            flags.bits()
        );
        let mut surface = Surface::uninitialized(display);
        surface.create_full(info, flags)?;
        Ok(surface)
    }

    /// Creates a surface with an explicit pixel format and the default frame layout.
    ///
    /// Returns `PreconditionMismatch` if the frame is too large to lay out.
    pub fn new_with_format(
        display: &Display,
        format: VideoFormat,
        width: u32,
        height: u32,
    ) -> Result<Surface, Error> {
        let info = VideoInfo::new(format, width, height).ok_or(Error::PreconditionMismatch)?;
        Surface::new_full(display, &info, SurfaceAllocFlags::empty())
    }

    /// Creates a surface backed by the buffer `proxy`, laid out as described by `info`.
    ///
    /// The surface keeps its own handle to `proxy`, so the caller may drop theirs right away.
    /// Returns `CapabilityUnavailable` if the driver interface is older than 0.36.
    pub fn new_from_buffer_proxy(
        display: &Display,
        proxy: &BufferProxy,
        info: &VideoInfo,
    ) -> Result<Surface, Error> {
        debug!("{:?}, format {:?}", proxy, info.format());
        let mut surface = Surface::uninitialized(display);
        surface.create_from_buffer_proxy(proxy, info)?;
        Ok(surface)
    }

    // A surface that owns no driver resource yet. Dropping it makes no driver call.
    fn uninitialized(display: &Display) -> Surface {
        Surface {
            display: display.clone(),
            id: SurfaceID::INVALID,
            chroma_type: ChromaType::Yuv420,
            size: Size2D::zero(),
            format: OnceCell::new(),
            subpictures: None,
            extbuf_proxy: None,
            parent_context: None,
        }
    }

    fn require_api_version(&self, required: ApiVersion) -> Result<(), Error> {
        let available = self.display.api_version();
        if available < required {
            debug!("driver API {} is older than {}", available, required);
            return Err(Error::CapabilityUnavailable {
                required,
                available,
            });
        }
        Ok(())
    }

    fn create(&mut self, chroma_type: ChromaType, width: u32, height: u32) -> Result<(), Error> {
        let rt_format = match chroma_type.to_rt_format() {
            Some(rt_format) => rt_format,
            None => {
                error!("unsupported chroma-type {:?}", chroma_type);
                return Err(Error::UnsupportedChroma(chroma_type));
            }
        };

        let id = self
            .display
            .lock()
            .create_surface(rt_format, width, height, &[])
            .check("vaCreateSurfaces()")?;

        self.chroma_type = chroma_type;
        self.size = Size2D::new(width, height);
        debug!("surface {}", id);
        self.id = id;
        Ok(())
    }

    fn create_full(&mut self, info: &VideoInfo, flags: SurfaceAllocFlags) -> Result<(), Error> {
        self.require_api_version(SURFACE_ATTRIBUTES_VERSION)?;

        let format = info.format();
        let (fourcc, chroma_type, rt_format) = lookup_format(format)?;

        let mut extbuf = ExternalBuffers::new(fourcc, info.width(), info.height());
        let mut extbuf_needed = false;
        if flags.contains(SurfaceAllocFlags::LINEAR_STORAGE) {
            extbuf.flags.remove(ExternalBufferFlags::ENABLE_TILING);
            extbuf_needed = true;
        }

        let n_planes = info.n_planes();
        extbuf.num_planes = n_planes as u32;
        if flags.contains(SurfaceAllocFlags::FIXED_STRIDES) {
            for plane in 0..n_planes {
                extbuf.pitches[plane] = info.plane_stride(plane);
            }
            extbuf_needed = true;
        }
        if flags.contains(SurfaceAllocFlags::FIXED_OFFSETS) {
            for plane in 0..n_planes {
                extbuf.offsets[plane] = info.plane_offset(plane);
            }
            extbuf_needed = true;
        }

        let mut attribs = vec![SurfaceAttrib::PixelFormat(fourcc)];
        if extbuf_needed {
            attribs.push(SurfaceAttrib::MemoryType(MemoryType::Va));
            attribs.push(SurfaceAttrib::ExternalBufferDescriptor(extbuf));
        }

        let id = self
            .display
            .lock()
            .create_surface(rt_format, info.width(), info.height(), &attribs)
            .check("vaCreateSurfaces()")?;

        self.format = OnceCell::from(format);
        self.chroma_type = chroma_type;
        self.size = Size2D::new(info.width(), info.height());
        debug!("surface {}", id);
        self.id = id;
        Ok(())
    }

    fn create_from_buffer_proxy(
        &mut self,
        proxy: &BufferProxy,
        info: &VideoInfo,
    ) -> Result<(), Error> {
        self.require_api_version(EXTERNAL_BUFFERS_VERSION)?;

        // Held from here on, whether or not allocation succeeds.
        self.extbuf_proxy = Some(proxy.clone());

        let format = info.format();
        let (width, height) = (info.width(), info.height());
        let (fourcc, chroma_type, rt_format) = lookup_format(format)?;

        let mut extbuf = ExternalBuffers::new(fourcc, width, height);
        extbuf.data_size = u32::try_from(proxy.size()).map_err(|_| Error::PreconditionMismatch)?;
        let n_planes = info.n_planes();
        extbuf.num_planes = n_planes as u32;
        for plane in 0..n_planes {
            extbuf.pitches[plane] = info.plane_stride(plane);
            extbuf.offsets[plane] = info.plane_offset(plane);
        }
        extbuf.buffers = vec![proxy.handle()];

        let attribs = [
            SurfaceAttrib::ExternalBufferDescriptor(extbuf),
            SurfaceAttrib::MemoryType(proxy.memory_type().to_memory_type()),
        ];

        let id = self
            .display
            .lock()
            .create_surface(rt_format, width, height, &attribs)
            .check("vaCreateSurfaces()")?;

        self.format = OnceCell::from(format);
        self.chroma_type = chroma_type;
        self.size = Size2D::new(width, height);
        debug!("surface {}", id);
        self.id = id;
        Ok(())
    }

    /// Returns the driver identifier of the surface.
    #[inline]
    pub fn id(&self) -> SurfaceID {
        self.id
    }

    #[inline]
    pub fn display(&self) -> &Display {
        &self.display
    }

    /// Returns the chroma type the surface was created with.
    #[inline]
    pub fn chroma_type(&self) -> ChromaType {
        self.chroma_type
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    #[inline]
    pub fn size(&self) -> Size2D<u32> {
        self.size
    }

    /// Returns the pixel format of the surface.
    ///
    /// Surfaces created with an explicit format report it directly. Otherwise the first call
    /// derives an image from the surface to read its format back, then releases the image; the
    /// result is cached. `VideoFormat::Encoded` is returned, and cached, when no image can be
    /// derived or its format is not known.
    pub fn format(&self) -> VideoFormat {
        *self.format.get_or_init(|| {
            self.derive_image()
                .ok()
                .and_then(|image| image.format())
                .unwrap_or(VideoFormat::Encoded)
        })
    }

    /// Returns the pixel format if it is already known, without querying the driver.
    #[inline]
    pub fn cached_format(&self) -> Option<VideoFormat> {
        self.format.get().copied()
    }

    /// Returns the external buffer backing this surface, if any.
    #[inline]
    pub fn buffer_proxy(&self) -> Option<&BufferProxy> {
        self.extbuf_proxy.as_ref()
    }

    /// Sets the parent context, or clears it with `None`.
    ///
    /// The surface only remembers the id; it never keeps the context alive.
    pub fn set_parent_context(&mut self, context: Option<ContextID>) {
        self.parent_context = context;
    }

    #[inline]
    pub fn parent_context(&self) -> Option<ContextID> {
        self.parent_context
    }

    /// Derives an image that maps the surface memory directly, without copying.
    ///
    /// This only works if the driver supports direct mapping for the surface's internal format;
    /// otherwise use `get_image()` and `put_image()`, which copy. The derived image can outlive
    /// this call; dropping it does not affect the surface contents.
    pub fn derive_image(&self) -> Result<Image, Error> {
        let descriptor = self
            .display
            .lock()
            .derive_image(self.id)
            .check("vaDeriveImage()")?;
        if !descriptor.id.is_valid() || !descriptor.buffer.is_valid() {
            return Err(Error::NoImage);
        }
        Ok(Image::from_descriptor(&self.display, descriptor))
    }

    // The image must match the surface exactly: same display, same size.
    fn check_transfer_image(&self, image: &Image) -> Result<Rectangle, Error> {
        if !image.display().is(&self.display) || image.size() != self.size {
            return Err(Error::PreconditionMismatch);
        }
        if !image.id().is_valid() {
            return Err(Error::PreconditionMismatch);
        }
        Ok(Rect::new(Point2D::zero(), self.size))
    }

    /// Copies the whole surface into `image`, which must have the same size as the surface.
    pub fn get_image(&self, image: &Image) -> Result<(), Error> {
        let rect = self.check_transfer_image(image)?;
        self.display
            .lock()
            .get_image(self.id, &rect, image.id())
            .check("vaGetImage()")
    }

    /// Copies the whole of `image`, which must have the same size as the surface, into the
    /// surface.
    pub fn put_image(&self, image: &Image) -> Result<(), Error> {
        let rect = self.check_transfer_image(image)?;
        self.display
            .lock()
            .put_image(self.id, image.id(), &rect, &rect)
            .check("vaPutImage()")
    }

    /// Returns the subpictures currently associated with the surface.
    pub fn subpictures(&self) -> &[Subpicture] {
        self.subpictures.as_deref().unwrap_or(&[])
    }

    /// Associates `subpicture` with the surface.
    ///
    /// `src_rect` is the region of the subpicture image to use and defaults to the whole image.
    /// `dst_rect` is the region of the surface it is rendered into and defaults to the whole
    /// surface. If the subpicture is already associated, the old association is removed first.
    /// The surface keeps a handle to the subpicture until it is deassociated.
    pub fn associate_subpicture(
        &mut self,
        subpicture: &Subpicture,
        src_rect: Option<Rectangle>,
        dst_rect: Option<Rectangle>,
    ) -> Result<(), Error> {
        let subpictures = self.subpictures.get_or_insert_with(Vec::new);
        if let Some(index) = subpictures.iter().position(|other| other.is(subpicture)) {
            let old_subpicture = subpictures.swap_remove(index);
            self.deassociate_from_driver(&old_subpicture)?;
        }

        self.associate_with_driver(subpicture, src_rect, dst_rect)?;

        debug!("subpicture {} bound to surface {}", subpicture.id(), self.id);
        self.subpictures
            .get_or_insert_with(Vec::new)
            .push(subpicture.clone());
        Ok(())
    }

    fn associate_with_driver(
        &self,
        subpicture: &Subpicture,
        src_rect: Option<Rectangle>,
        dst_rect: Option<Rectangle>,
    ) -> Result<(), Error> {
        if !self.id.is_valid() {
            return Err(Error::PreconditionMismatch);
        }

        let src_rect = src_rect.unwrap_or_else(|| {
            let image = subpicture.image();
            Rect::new(Point2D::zero(), image.size())
        });
        let dst_rect = dst_rect.unwrap_or_else(|| Rect::new(Point2D::zero(), self.size));

        self.display
            .lock()
            .associate_subpicture(
                subpicture.id(),
                &[self.id],
                &src_rect,
                &dst_rect,
                subpicture.flags().to_driver_flags(),
            )
            .check("vaAssociateSubpicture()")
    }

    /// Deassociates `subpicture` from the surface. Other associations are kept.
    ///
    /// Deassociating a subpicture that is not associated succeeds and does nothing. If the
    /// driver call fails, the subpicture is still no longer considered associated.
    pub fn deassociate_subpicture(&mut self, subpicture: &Subpicture) -> Result<(), Error> {
        let subpictures = match self.subpictures {
            Some(ref mut subpictures) => subpictures,
            None => return Ok(()),
        };

        let index = match subpictures.iter().position(|other| other.is(subpicture)) {
            Some(index) => index,
            None => {
                debug!(
                    "subpicture {} was not bound to surface {}",
                    subpicture.id(),
                    self.id
                );
                return Ok(());
            }
        };

        let subpicture = subpictures.swap_remove(index);
        self.deassociate_from_driver(&subpicture)
    }

    fn deassociate_from_driver(&self, subpicture: &Subpicture) -> Result<(), Error> {
        if !self.id.is_valid() {
            return Err(Error::PreconditionMismatch);
        }
        self.display
            .lock()
            .deassociate_subpicture(subpicture.id(), &[self.id])
            .check("vaDeassociateSubpicture()")
    }

    /// Deassociates every subpicture from the surface.
    ///
    /// Driver failures are logged and do not stop the remaining subpictures from being
    /// deassociated.
    pub fn destroy_subpictures(&mut self) {
        let subpictures = match self.subpictures.take() {
            Some(subpictures) => subpictures,
            None => return,
        };
        for subpicture in subpictures {
            if self.deassociate_from_driver(&subpicture).is_err() {
                warn!(
                    "failed to deassociate subpicture {} from surface {}",
                    subpicture.id(),
                    self.id
                );
            }
        }
    }

    /// Replaces the subpictures of the surface with the rectangles of `composition`.
    ///
    /// If `propagate_context` is set and the parent context is alive, the composition is handed
    /// to the context instead and the surface is left untouched. Otherwise all current
    /// subpictures are removed, and a subpicture is associated for each rectangle; `None`
    /// only removes them. Processing stops at the first rectangle that cannot be associated;
    /// rectangles associated before it stay.
    pub fn set_subpictures_from_composition(
        &mut self,
        composition: Option<&OverlayComposition>,
        propagate_context: bool,
    ) -> Result<(), Error> {
        if propagate_context {
            let context = self.parent_context.and_then(|id| self.display.context(id));
            if let Some(context) = context {
                return context.apply_composition(composition);
            }
        }

        self.destroy_subpictures();

        let composition = match composition {
            Some(composition) => composition,
            None => return Ok(()),
        };

        for (index, rect) in composition.rectangles().iter().enumerate() {
            let subpicture = match Subpicture::from_overlay_rectangle(&self.display, rect) {
                Ok(subpicture) => subpicture,
                Err(err) => {
                    warn!("could not create subpicture for overlay rectangle {}", index);
                    return Err(err);
                }
            };

            // Only the y origin and the width are clamped to the surface.
            let mut sub_rect = rect.render_rectangle();
            sub_rect.origin.y = cmp::min(sub_rect.origin.y, self.size.height);
            sub_rect.size.width = cmp::min(sub_rect.size.width, self.size.width);

            if let Err(err) = self.associate_subpicture(&subpicture, None, Some(sub_rect)) {
                warn!("could not render overlay rectangle {}", index);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Blocks until all pending operations on the surface have completed.
    pub fn sync(&self) -> Result<(), Error> {
        self.display
            .lock()
            .sync_surface(self.id)
            .check("vaSyncSurface()")
    }

    /// Returns the pending operations on the surface, without blocking.
    pub fn query_status(&self) -> Result<SurfaceStatus, Error> {
        let driver_status = self
            .display
            .lock()
            .query_surface_status(self.id)
            .check("vaQuerySurfaceStatus()")?;
        Ok(SurfaceStatus::from_driver_status(driver_status))
    }
}
