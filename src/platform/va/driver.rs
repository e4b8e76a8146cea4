// vasurf/src/platform/va/driver.rs
//
//! A driver that forwards every call to `libva`.

use super::error::va_check;
use super::ffi::*;
use crate::driver::{ApiVersion, BufferID, Driver, DriverSubpictureFlags, DriverSurfaceStatus};
use crate::driver::{ImageDescriptor, ImageID, RtFormat, SubpictureID, SurfaceAttrib, SurfaceID};
use crate::error::{CheckStatus, DriverStatus};
use crate::format::Fourcc;
use crate::surface::Rectangle;
use crate::Error;

use fnv::FnvHashMap;
use libc::{c_int, c_short, c_uint, c_ushort, c_void, uintptr_t};
use log::{debug, warn};
use std::ffi::CStr;
use std::ptr;
use std::slice;

/// A `libva` display and the bookkeeping needed to map image buffers.
pub struct VaDriver {
    display: VADisplay,
    api_version: ApiVersion,
    image_formats: Vec<VAImageFormat>,
    // The buffer and its size, for each live image.
    images: FnvHashMap<ImageID, (BufferID, usize)>,
}

unsafe impl Send for VaDriver {}

impl Drop for VaDriver {
    fn drop(&mut self) {
        let status = unsafe { vaTerminate(self.display) };
        if status != VA_STATUS_SUCCESS {
            warn!("vaTerminate() failed: {}", error_string(status));
        }
    }
}

fn error_string(status: VAStatus) -> String {
    unsafe {
        let string = vaErrorStr(status);
        if string.is_null() {
            return format!("{:#x}", status);
        }
        CStr::from_ptr(string).to_string_lossy().into_owned()
    }
}

fn integer_value(value: i32) -> VAGenericValue {
    VAGenericValue {
        type_: VAGenericValueTypeInteger,
        value: VAGenericValueUnion { i: value },
    }
}

fn pointer_value(value: *mut c_void) -> VAGenericValue {
    VAGenericValue {
        type_: VAGenericValueTypePointer,
        value: VAGenericValueUnion { p: value },
    }
}

fn to_short(value: u32) -> Result<c_short, DriverStatus> {
    c_short::try_from(value).map_err(|_| DriverStatus::InvalidParameter)
}

fn to_ushort(value: u32) -> Result<c_ushort, DriverStatus> {
    c_ushort::try_from(value).map_err(|_| DriverStatus::InvalidParameter)
}

fn to_int(value: u32) -> Result<c_int, DriverStatus> {
    c_int::try_from(value).map_err(|_| DriverStatus::InvalidParameter)
}

fn image_descriptor(image: &VAImage) -> ImageDescriptor {
    ImageDescriptor {
        id: ImageID(image.image_id),
        buffer: BufferID(image.buf),
        fourcc: Fourcc(image.format.fourcc),
        width: image.width as u32,
        height: image.height as u32,
        data_size: image.data_size,
        num_planes: image.num_planes,
        pitches: image.pitches,
        offsets: image.offsets,
    }
}

impl VaDriver {
    /// Initializes `libva` on `display` and takes ownership of it. The display is terminated
    /// when the driver is dropped.
    ///
    /// # Safety
    ///
    /// `display` must be a display obtained from one of the `vaGetDisplay*()` functions that has
    /// not been initialized or terminated yet.
    pub unsafe fn new(display: VADisplay) -> Result<VaDriver, Error> {
        let (mut major, mut minor) = (0, 0);
        va_check(vaInitialize(display, &mut major, &mut minor)).check("vaInitialize()")?;
        let api_version = ApiVersion::new(major as u32, minor as u32);
        debug!("initialized libva API {}", api_version);

        let mut driver = VaDriver {
            display,
            api_version,
            image_formats: vec![],
            images: FnvHashMap::default(),
        };

        let max_formats = vaMaxNumImageFormats(display).max(0);
        let mut image_formats = vec![VAImageFormat::default(); max_formats as usize];
        let mut num_formats = 0;
        va_check(vaQueryImageFormats(display, image_formats.as_mut_ptr(), &mut num_formats))
            .check("vaQueryImageFormats()")?;
        image_formats.truncate(num_formats.max(0) as usize);
        driver.image_formats = image_formats;
        Ok(driver)
    }

    /// The raw `libva` display.
    #[inline]
    pub fn display(&self) -> VADisplay {
        self.display
    }

    fn track_image(&mut self, image: &VAImage) -> ImageDescriptor {
        let descriptor = image_descriptor(image);
        self.images.insert(descriptor.id, (descriptor.buffer, descriptor.data_size as usize));
        descriptor
    }

    fn buffer_size(&self, buffer: BufferID) -> Result<usize, DriverStatus> {
        self.images
            .values()
            .find(|&&(image_buffer, _)| image_buffer == buffer)
            .map(|&(_, size)| size)
            .ok_or(DriverStatus::InvalidBuffer)
    }

    // Maps the buffer for the duration of `f`.
    fn with_mapped_buffer<F, T>(&mut self, buffer: BufferID, f: F) -> Result<T, DriverStatus>
    where
        F: FnOnce(&mut [u8]) -> T,
    {
        let size = self.buffer_size(buffer)?;
        unsafe {
            let mut data: *mut c_void = ptr::null_mut();
            va_check(vaMapBuffer(self.display, buffer.0, &mut data))?;
            if data.is_null() {
                va_check(vaUnmapBuffer(self.display, buffer.0))?;
                return Err(DriverStatus::OperationFailed);
            }
            let result = f(slice::from_raw_parts_mut(data as *mut u8, size));
            va_check(vaUnmapBuffer(self.display, buffer.0))?;
            Ok(result)
        }
    }
}

impl Driver for VaDriver {
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
        // Storage referenced by pointer from `va_attribs`. Must outlive the call.
        let mut handles: Vec<Vec<uintptr_t>> = vec![];
        let mut descriptors: Vec<Box<VASurfaceAttribExternalBuffers>> = vec![];

        let mut va_attribs = Vec::with_capacity(attribs.len());
        for attrib in attribs {
            let (type_, value) = match *attrib {
                SurfaceAttrib::PixelFormat(fourcc) => {
                    (VASurfaceAttribPixelFormat, integer_value(fourcc.0 as i32))
                }
                SurfaceAttrib::MemoryType(memory_type) => {
                    (VASurfaceAttribMemoryType, integer_value(memory_type.bits() as i32))
                }
                SurfaceAttrib::ExternalBufferDescriptor(ref extbuf) => {
                    let mut buffers: Vec<uintptr_t> = extbuf.buffers.clone();
                    let mut descriptor = Box::new(VASurfaceAttribExternalBuffers {
                        pixel_format: extbuf.pixel_format.0,
                        width: extbuf.width,
                        height: extbuf.height,
                        data_size: extbuf.data_size,
                        num_planes: extbuf.num_planes,
                        pitches: extbuf.pitches,
                        offsets: extbuf.offsets,
                        buffers: if buffers.is_empty() {
                            ptr::null_mut()
                        } else {
                            buffers.as_mut_ptr()
                        },
                        num_buffers: buffers.len() as u32,
                        flags: extbuf.flags.bits(),
                        private_data: ptr::null_mut(),
                    });
                    let value = pointer_value(&mut *descriptor as *mut _ as *mut c_void);
                    handles.push(buffers);
                    descriptors.push(descriptor);
                    (VASurfaceAttribExternalBufferDescriptor, value)
                }
            };
            va_attribs.push(VASurfaceAttrib {
                type_,
                flags: VA_SURFACE_ATTRIB_SETTABLE,
                value,
            });
        }

        let mut surface = VA_INVALID_ID;
        unsafe {
            va_check(vaCreateSurfaces(
                self.display,
                rt_format.0,
                width,
                height,
                &mut surface,
                1,
                if va_attribs.is_empty() {
                    ptr::null_mut()
                } else {
                    va_attribs.as_mut_ptr()
                },
                va_attribs.len() as c_uint,
            ))?;
        }
        Ok(SurfaceID(surface))
    }

    fn destroy_surface(&mut self, surface: SurfaceID) -> Result<(), DriverStatus> {
        let mut surface = surface.0;
        unsafe { va_check(vaDestroySurfaces(self.display, &mut surface, 1)) }
    }

    fn derive_image(&mut self, surface: SurfaceID) -> Result<ImageDescriptor, DriverStatus> {
        let mut image = VAImage::default();
        unsafe {
            va_check(vaDeriveImage(self.display, surface.0, &mut image))?;
        }
        Ok(self.track_image(&image))
    }

    fn create_image(
        &mut self,
        fourcc: Fourcc,
        width: u32,
        height: u32,
    ) -> Result<ImageDescriptor, DriverStatus> {
        let mut format = *self
            .image_formats
            .iter()
            .find(|format| format.fourcc == fourcc.0)
            .ok_or(DriverStatus::InvalidImageFormat)?;
        let mut image = VAImage::default();
        unsafe {
            va_check(vaCreateImage(
                self.display,
                &mut format,
                to_int(width)?,
                to_int(height)?,
                &mut image,
            ))?;
        }
        Ok(self.track_image(&image))
    }

    fn destroy_image(&mut self, image: ImageID) -> Result<(), DriverStatus> {
        self.images.remove(&image);
        unsafe { va_check(vaDestroyImage(self.display, image.0)) }
    }

    fn read_buffer(&mut self, buffer: BufferID) -> Result<Vec<u8>, DriverStatus> {
        self.with_mapped_buffer(buffer, |data| data.to_vec())
    }

    fn write_buffer(&mut self, buffer: BufferID, data: &[u8]) -> Result<(), DriverStatus> {
        let written = self.with_mapped_buffer(buffer, |target| match target.get_mut(..data.len()) {
            Some(target) => {
                target.copy_from_slice(data);
                true
            }
            None => false,
        })?;
        if !written {
            return Err(DriverStatus::InvalidParameter);
        }
        Ok(())
    }

    fn get_image(
        &mut self,
        surface: SurfaceID,
        rect: &Rectangle,
        image: ImageID,
    ) -> Result<(), DriverStatus> {
        unsafe {
            va_check(vaGetImage(
                self.display,
                surface.0,
                to_int(rect.origin.x)?,
                to_int(rect.origin.y)?,
                rect.size.width,
                rect.size.height,
                image.0,
            ))
        }
    }

    fn put_image(
        &mut self,
        surface: SurfaceID,
        image: ImageID,
        src: &Rectangle,
        dst: &Rectangle,
    ) -> Result<(), DriverStatus> {
        unsafe {
            va_check(vaPutImage(
                self.display,
                surface.0,
                image.0,
                to_int(src.origin.x)?,
                to_int(src.origin.y)?,
                src.size.width,
                src.size.height,
                to_int(dst.origin.x)?,
                to_int(dst.origin.y)?,
                dst.size.width,
                dst.size.height,
            ))
        }
    }

    fn create_subpicture(&mut self, image: ImageID) -> Result<SubpictureID, DriverStatus> {
        let mut subpicture = VA_INVALID_ID;
        unsafe {
            va_check(vaCreateSubpicture(self.display, image.0, &mut subpicture))?;
        }
        Ok(SubpictureID(subpicture))
    }

    fn destroy_subpicture(&mut self, subpicture: SubpictureID) -> Result<(), DriverStatus> {
        unsafe { va_check(vaDestroySubpicture(self.display, subpicture.0)) }
    }

    fn set_subpicture_global_alpha(
        &mut self,
        subpicture: SubpictureID,
        global_alpha: f32,
    ) -> Result<(), DriverStatus> {
        unsafe {
            va_check(vaSetSubpictureGlobalAlpha(
                self.display,
                subpicture.0,
                global_alpha,
            ))
        }
    }

    fn associate_subpicture(
        &mut self,
        subpicture: SubpictureID,
        surfaces: &[SurfaceID],
        src: &Rectangle,
        dst: &Rectangle,
        flags: DriverSubpictureFlags,
    ) -> Result<(), DriverStatus> {
        let mut surfaces: Vec<VASurfaceID> = surfaces.iter().map(|surface| surface.0).collect();
        unsafe {
            va_check(vaAssociateSubpicture(
                self.display,
                subpicture.0,
                surfaces.as_mut_ptr(),
                surfaces.len() as c_int,
                to_short(src.origin.x)?,
                to_short(src.origin.y)?,
                to_ushort(src.size.width)?,
                to_ushort(src.size.height)?,
                to_short(dst.origin.x)?,
                to_short(dst.origin.y)?,
                to_ushort(dst.size.width)?,
                to_ushort(dst.size.height)?,
                flags.bits(),
            ))
        }
    }

    fn deassociate_subpicture(
        &mut self,
        subpicture: SubpictureID,
        surfaces: &[SurfaceID],
    ) -> Result<(), DriverStatus> {
        let mut surfaces: Vec<VASurfaceID> = surfaces.iter().map(|surface| surface.0).collect();
        unsafe {
            va_check(vaDeassociateSubpicture(
                self.display,
                subpicture.0,
                surfaces.as_mut_ptr(),
                surfaces.len() as c_int,
            ))
        }
    }

    fn sync_surface(&mut self, surface: SurfaceID) -> Result<(), DriverStatus> {
        unsafe { va_check(vaSyncSurface(self.display, surface.0)) }
    }

    fn query_surface_status(
        &mut self,
        surface: SurfaceID,
    ) -> Result<DriverSurfaceStatus, DriverStatus> {
        let mut status: c_uint = 0;
        unsafe {
            va_check(vaQuerySurfaceStatus(self.display, surface.0, &mut status))?;
        }
        Ok(DriverSurfaceStatus::from_bits_truncate(status))
    }
}
