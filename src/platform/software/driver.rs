// vasurf/src/platform/software/driver.rs
//
//! The in-memory driver.

use crate::driver::{ApiVersion, BufferID, Driver, DriverSubpictureFlags, DriverSurfaceStatus};
use crate::driver::{ImageDescriptor, ImageID, MemoryType, RtFormat, SubpictureID};
use crate::driver::{SurfaceAttrib, SurfaceID};
use crate::error::DriverStatus;
use crate::format::{ChromaType, Fourcc, VideoFormat};
use crate::surface::Rectangle;
use crate::video_info::VideoInfo;

use euclid::default::{Point2D, Rect, Size2D};
use fnv::FnvHashMap;
use log::debug;

const SURFACE_ATTRIBUTES_VERSION: ApiVersion = ApiVersion::new(0, 34);

const SUBPICTURE_FORMATS: [Fourcc; 4] = [Fourcc::BGRA, Fourcc::RGBA, Fourcc::ARGB, Fourcc::ABGR];

/// The binding of a subpicture to one surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Association {
    /// The region of the subpicture image.
    pub src: Rectangle,
    /// The region of the surface the subpicture is rendered into.
    pub dst: Rectangle,
    pub flags: DriverSubpictureFlags,
}

/// A driver that keeps all of its resources in system memory.
///
/// Surfaces allocated on top of external buffers get storage of their own; the external memory
/// is validated but never touched.
pub struct SoftwareDriver {
    api_version: ApiVersion,
    next_id: u32,
    surfaces: FnvHashMap<SurfaceID, SoftwareSurface>,
    images: FnvHashMap<ImageID, ImageDescriptor>,
    buffers: FnvHashMap<BufferID, BufferStorage>,
    subpictures: FnvHashMap<SubpictureID, SoftwareSubpicture>,
}

struct SoftwareSurface {
    size: Size2D<u32>,
    // `None` if the render-target format has no pixel layout we can emulate.
    format: Option<VideoFormat>,
    pixels: Vec<u8>,
    attribs: Vec<SurfaceAttrib>,
    status: DriverSurfaceStatus,
}

enum BufferStorage {
    Owned(Vec<u8>),
    // The pixels of a surface, mapped by a derived image.
    Surface(SurfaceID),
}

struct SoftwareSubpicture {
    image: ImageID,
    global_alpha: f32,
    associations: FnvHashMap<SurfaceID, Association>,
}

// The pixel format a surface gets when allocation doesn't name one.
fn default_format(rt_format: RtFormat) -> Result<Option<VideoFormat>, DriverStatus> {
    match rt_format {
        RtFormat::YUV420 => Ok(Some(VideoFormat::NV12)),
        RtFormat::YUV422 => Ok(Some(VideoFormat::YUY2)),
        RtFormat::YUV444 => Ok(Some(VideoFormat::AYUV)),
        RtFormat::YUV400 => Ok(Some(VideoFormat::GRAY8)),
        RtFormat::YUV420_10 => Ok(Some(VideoFormat::P010_10LE)),
        RtFormat::RGB32 => Ok(Some(VideoFormat::BGRA)),
        RtFormat::YUV411 | RtFormat::RGB16 => Ok(None),
        _ => Err(DriverStatus::UnsupportedRtFormat),
    }
}

// The pixel format must be storable in a surface of the render-target format.
fn check_pixel_format(fourcc: Fourcc, rt_format: RtFormat) -> Result<VideoFormat, DriverStatus> {
    VideoFormat::from_fourcc(fourcc)
        .filter(|format| format.chroma_type().and_then(ChromaType::to_rt_format) == Some(rt_format))
        .ok_or(DriverStatus::InvalidImageFormat)
}

fn image_descriptor(
    id: ImageID,
    buffer: BufferID,
    format: VideoFormat,
    size: Size2D<u32>,
) -> Result<ImageDescriptor, DriverStatus> {
    let fourcc = format.to_fourcc().ok_or(DriverStatus::InvalidImageFormat)?;
    let info = VideoInfo::new(format, size.width, size.height)
        .ok_or(DriverStatus::ResolutionNotSupported)?;
    let num_planes = info.n_planes();
    if num_planes > 3 {
        return Err(DriverStatus::InvalidImageFormat);
    }

    let mut pitches = [0; 3];
    let mut offsets = [0; 3];
    for plane in 0..num_planes {
        pitches[plane] = info.plane_stride(plane);
        offsets[plane] = info.plane_offset(plane);
    }

    Ok(ImageDescriptor {
        id,
        buffer,
        fourcc,
        width: size.width,
        height: size.height,
        data_size: u32::try_from(info.size()).map_err(|_| DriverStatus::AllocationFailed)?,
        num_planes: num_planes as u32,
        pitches,
        offsets,
    })
}

fn fits_within(rect: &Rectangle, size: Size2D<u32>) -> bool {
    let right = rect.origin.x.checked_add(rect.size.width);
    let bottom = rect.origin.y.checked_add(rect.size.height);
    matches!((right, bottom), (Some(right), Some(bottom)) if right <= size.width && bottom <= size.height)
}

impl Default for SoftwareDriver {
    fn default() -> SoftwareDriver {
        SoftwareDriver::new()
    }
}

impl SoftwareDriver {
    /// Creates a driver reporting interface version 1.0.
    pub fn new() -> SoftwareDriver {
        SoftwareDriver::with_api_version(ApiVersion::new(1, 0))
    }

    /// Creates a driver reporting the given interface version.
    ///
    /// Versions older than 0.34 reject surface attributes, as real drivers of that age do.
    pub fn with_api_version(api_version: ApiVersion) -> SoftwareDriver {
        SoftwareDriver {
            api_version,
            next_id: 1,
            surfaces: FnvHashMap::default(),
            images: FnvHashMap::default(),
            buffers: FnvHashMap::default(),
            subpictures: FnvHashMap::default(),
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    #[inline]
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn subpicture_count(&self) -> usize {
        self.subpictures.len()
    }

    /// The attributes a live surface was allocated with.
    pub fn surface_attribs(&self, surface: SurfaceID) -> Option<&[SurfaceAttrib]> {
        self.surfaces.get(&surface).map(|surface| &surface.attribs[..])
    }

    /// The pixel data of a live surface.
    pub fn surface_pixels(&self, surface: SurfaceID) -> Option<&[u8]> {
        self.surfaces.get(&surface).map(|surface| &surface.pixels[..])
    }

    /// Overrides the status a surface reports until it is next synced.
    pub fn set_surface_status(
        &mut self,
        surface: SurfaceID,
        status: DriverSurfaceStatus,
    ) -> Result<(), DriverStatus> {
        let surface = self.surfaces.get_mut(&surface).ok_or(DriverStatus::InvalidSurface)?;
        surface.status = status;
        Ok(())
    }

    /// The surfaces a subpicture is bound to, with the geometry of each binding.
    pub fn associations(&self, subpicture: SubpictureID) -> Vec<(SurfaceID, Association)> {
        match self.subpictures.get(&subpicture) {
            Some(subpicture) => subpicture
                .associations
                .iter()
                .map(|(&surface, &association)| (surface, association))
                .collect(),
            None => vec![],
        }
    }

    /// The global alpha of a live subpicture.
    pub fn subpicture_global_alpha(&self, subpicture: SubpictureID) -> Option<f32> {
        self.subpictures
            .get(&subpicture)
            .map(|subpicture| subpicture.global_alpha)
    }

    fn buffer(&self, buffer: BufferID) -> Result<&[u8], DriverStatus> {
        match self.buffers.get(&buffer) {
            Some(BufferStorage::Owned(data)) => Ok(&data[..]),
            Some(BufferStorage::Surface(surface)) => self
                .surfaces
                .get(surface)
                .map(|surface| &surface.pixels[..])
                .ok_or(DriverStatus::InvalidSurface),
            None => Err(DriverStatus::InvalidBuffer),
        }
    }

    fn buffer_mut(&mut self, buffer: BufferID) -> Result<&mut Vec<u8>, DriverStatus> {
        match self.buffers.get_mut(&buffer) {
            Some(BufferStorage::Owned(data)) => Ok(data),
            Some(BufferStorage::Surface(surface)) => self
                .surfaces
                .get_mut(surface)
                .map(|surface| &mut surface.pixels)
                .ok_or(DriverStatus::InvalidSurface),
            None => Err(DriverStatus::InvalidBuffer),
        }
    }

    // Whole-frame transfers between a surface and an image of the same format and size.
    fn check_transfer(
        &self,
        surface: SurfaceID,
        image: ImageID,
        rects: &[&Rectangle],
    ) -> Result<ImageDescriptor, DriverStatus> {
        let descriptor = *self.images.get(&image).ok_or(DriverStatus::InvalidImage)?;
        let surface = self.surfaces.get(&surface).ok_or(DriverStatus::InvalidSurface)?;
        if surface.format.and_then(VideoFormat::to_fourcc) != Some(descriptor.fourcc) {
            return Err(DriverStatus::InvalidImageFormat);
        }
        if Size2D::new(descriptor.width, descriptor.height) != surface.size {
            return Err(DriverStatus::InvalidParameter);
        }
        let frame = Rect::new(Point2D::zero(), surface.size);
        if rects.iter().any(|&rect| *rect != frame) {
            return Err(DriverStatus::Unimplemented);
        }
        Ok(descriptor)
    }
}

impl Driver for SoftwareDriver {
    #[inline]
    fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    fn create_surface(
        &mut self,
        rt_format: RtFormat,
        width: u32,
        height: u32,
        attribs: &[SurfaceAttrib],
    ) -> Result<SurfaceID, DriverStatus> {
        if width == 0 || height == 0 {
            return Err(DriverStatus::ResolutionNotSupported);
        }
        if !attribs.is_empty() && self.api_version < SURFACE_ATTRIBUTES_VERSION {
            return Err(DriverStatus::AttributeNotSupported);
        }

        let mut format = default_format(rt_format)?;
        let mut memory_type = MemoryType::Va;
        let mut extbuf = None;
        for attrib in attribs {
            match *attrib {
                SurfaceAttrib::PixelFormat(fourcc) => {
                    format = Some(check_pixel_format(fourcc, rt_format)?)
                }
                SurfaceAttrib::MemoryType(attrib_memory_type) => memory_type = attrib_memory_type,
                SurfaceAttrib::ExternalBufferDescriptor(ref descriptor) => extbuf = Some(descriptor),
            }
        }

        let mut externally_backed = false;
        if let Some(extbuf) = extbuf {
            if extbuf.width != width || extbuf.height != height {
                return Err(DriverStatus::InvalidParameter);
            }
            format = Some(check_pixel_format(extbuf.pixel_format, rt_format)?);
            externally_backed = !extbuf.buffers.is_empty();
        }
        if externally_backed == (memory_type == MemoryType::Va) {
            return Err(DriverStatus::UnsupportedMemoryType);
        }

        let frame_size = match format {
            Some(format) => VideoInfo::new(format, width, height)
                .ok_or(DriverStatus::ResolutionNotSupported)?
                .size(),
            None => 0,
        };
        if let Some(extbuf) = extbuf.filter(|_| externally_backed) {
            if (extbuf.data_size as usize) < frame_size {
                return Err(DriverStatus::InvalidParameter);
            }
        }

        let id = SurfaceID(self.next_id());
        debug!("create surface {} {}x{} {:?}", id, width, height, format);
        self.surfaces.insert(
            id,
            SoftwareSurface {
                size: Size2D::new(width, height),
                format,
                pixels: vec![0; frame_size],
                attribs: attribs.to_vec(),
                status: DriverSurfaceStatus::READY,
            },
        );
        Ok(id)
    }

    fn destroy_surface(&mut self, surface_id: SurfaceID) -> Result<(), DriverStatus> {
        let surface = self
            .surfaces
            .remove(&surface_id)
            .ok_or(DriverStatus::InvalidSurface)?;
        debug!("destroy surface {}", surface_id);

        // Derived images keep the last contents of the surface.
        for storage in self.buffers.values_mut() {
            if let BufferStorage::Surface(owner) = *storage {
                if owner == surface_id {
                    *storage = BufferStorage::Owned(surface.pixels.clone());
                }
            }
        }
        for subpicture in self.subpictures.values_mut() {
            subpicture.associations.remove(&surface_id);
        }
        Ok(())
    }

    fn derive_image(&mut self, surface_id: SurfaceID) -> Result<ImageDescriptor, DriverStatus> {
        let surface = self
            .surfaces
            .get(&surface_id)
            .ok_or(DriverStatus::InvalidSurface)?;
        let format = surface.format.ok_or(DriverStatus::OperationFailed)?;
        let size = surface.size;

        let id = ImageID(self.next_id());
        let buffer = BufferID(self.next_id());
        let descriptor = image_descriptor(id, buffer, format, size)?;
        self.buffers.insert(buffer, BufferStorage::Surface(surface_id));
        self.images.insert(id, descriptor);
        Ok(descriptor)
    }

    fn create_image(
        &mut self,
        fourcc: Fourcc,
        width: u32,
        height: u32,
    ) -> Result<ImageDescriptor, DriverStatus> {
        let format = VideoFormat::from_fourcc(fourcc).ok_or(DriverStatus::InvalidImageFormat)?;
        if width == 0 || height == 0 {
            return Err(DriverStatus::InvalidParameter);
        }

        let id = ImageID(self.next_id());
        let buffer = BufferID(self.next_id());
        let descriptor = image_descriptor(id, buffer, format, Size2D::new(width, height))?;
        self.buffers.insert(
            buffer,
            BufferStorage::Owned(vec![0; descriptor.data_size as usize]),
        );
        self.images.insert(id, descriptor);
        Ok(descriptor)
    }

    fn destroy_image(&mut self, image: ImageID) -> Result<(), DriverStatus> {
        let descriptor = self.images.remove(&image).ok_or(DriverStatus::InvalidImage)?;
        self.buffers.remove(&descriptor.buffer);
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferID) -> Result<Vec<u8>, DriverStatus> {
        self.buffer(buffer).map(|data| data.to_vec())
    }

    fn write_buffer(&mut self, buffer: BufferID, data: &[u8]) -> Result<(), DriverStatus> {
        let target = self.buffer_mut(buffer)?;
        match target.get_mut(..data.len()) {
            Some(target) => {
                target.copy_from_slice(data);
                Ok(())
            }
            None => Err(DriverStatus::InvalidParameter),
        }
    }

    fn get_image(
        &mut self,
        surface: SurfaceID,
        rect: &Rectangle,
        image: ImageID,
    ) -> Result<(), DriverStatus> {
        let descriptor = self.check_transfer(surface, image, &[rect])?;
        let pixels = self
            .surface_pixels(surface)
            .ok_or(DriverStatus::InvalidSurface)?
            .to_vec();
        self.write_buffer(descriptor.buffer, &pixels)
    }

    fn put_image(
        &mut self,
        surface: SurfaceID,
        image: ImageID,
        src: &Rectangle,
        dst: &Rectangle,
    ) -> Result<(), DriverStatus> {
        let descriptor = self.check_transfer(surface, image, &[src, dst])?;
        let pixels = self.buffer(descriptor.buffer)?.to_vec();
        let surface = self.surfaces.get_mut(&surface).ok_or(DriverStatus::InvalidSurface)?;
        match surface.pixels.get_mut(..pixels.len()) {
            Some(target) => {
                target.copy_from_slice(&pixels);
                Ok(())
            }
            None => Err(DriverStatus::InvalidParameter),
        }
    }

    fn create_subpicture(&mut self, image: ImageID) -> Result<SubpictureID, DriverStatus> {
        let descriptor = self.images.get(&image).ok_or(DriverStatus::InvalidImage)?;
        if !SUBPICTURE_FORMATS.contains(&descriptor.fourcc) {
            return Err(DriverStatus::InvalidImageFormat);
        }

        let id = SubpictureID(self.next_id());
        debug!("create subpicture {} from image {}", id, image);
        self.subpictures.insert(
            id,
            SoftwareSubpicture {
                image,
                global_alpha: 1.0,
                associations: FnvHashMap::default(),
            },
        );
        Ok(id)
    }

    fn destroy_subpicture(&mut self, subpicture: SubpictureID) -> Result<(), DriverStatus> {
        self.subpictures
            .remove(&subpicture)
            .map(|_| ())
            .ok_or(DriverStatus::InvalidSubpicture)
    }

    fn set_subpicture_global_alpha(
        &mut self,
        subpicture: SubpictureID,
        global_alpha: f32,
    ) -> Result<(), DriverStatus> {
        let subpicture = self
            .subpictures
            .get_mut(&subpicture)
            .ok_or(DriverStatus::InvalidSubpicture)?;
        if !(0.0..=1.0).contains(&global_alpha) {
            return Err(DriverStatus::InvalidParameter);
        }
        subpicture.global_alpha = global_alpha;
        Ok(())
    }

    fn associate_subpicture(
        &mut self,
        subpicture: SubpictureID,
        surfaces: &[SurfaceID],
        src: &Rectangle,
        dst: &Rectangle,
        flags: DriverSubpictureFlags,
    ) -> Result<(), DriverStatus> {
        let image = self
            .subpictures
            .get(&subpicture)
            .ok_or(DriverStatus::InvalidSubpicture)?
            .image;
        let image = self.images.get(&image).ok_or(DriverStatus::InvalidImage)?;
        if !fits_within(src, Size2D::new(image.width, image.height)) {
            return Err(DriverStatus::InvalidParameter);
        }
        if surfaces.iter().any(|surface| !self.surfaces.contains_key(surface)) {
            return Err(DriverStatus::InvalidSurface);
        }

        let association = Association {
            src: *src,
            dst: *dst,
            flags,
        };
        if let Some(subpicture) = self.subpictures.get_mut(&subpicture) {
            for &surface in surfaces {
                subpicture.associations.insert(surface, association);
            }
        }
        Ok(())
    }

    fn deassociate_subpicture(
        &mut self,
        subpicture: SubpictureID,
        surfaces: &[SurfaceID],
    ) -> Result<(), DriverStatus> {
        let subpicture = self
            .subpictures
            .get_mut(&subpicture)
            .ok_or(DriverStatus::InvalidSubpicture)?;
        if surfaces
            .iter()
            .any(|surface| !subpicture.associations.contains_key(surface))
        {
            return Err(DriverStatus::InvalidParameter);
        }
        for surface in surfaces {
            subpicture.associations.remove(surface);
        }
        Ok(())
    }

    fn sync_surface(&mut self, surface: SurfaceID) -> Result<(), DriverStatus> {
        let surface = self.surfaces.get_mut(&surface).ok_or(DriverStatus::InvalidSurface)?;
        surface.status = DriverSurfaceStatus::READY;
        Ok(())
    }

    fn query_surface_status(
        &mut self,
        surface: SurfaceID,
    ) -> Result<DriverSurfaceStatus, DriverStatus> {
        self.surfaces
            .get(&surface)
            .map(|surface| surface.status)
            .ok_or(DriverStatus::InvalidSurface)
    }
}
