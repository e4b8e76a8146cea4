// vasurf/src/platform/va/ffi.rs
//
//! Bindings to the parts of `libva` this crate uses.

#![allow(non_camel_case_types, non_snake_case, dead_code)]

use libc::{c_char, c_float, c_int, c_short, c_uint, c_ushort, c_void, uintptr_t};

pub enum VADisplayOpaque {}
pub type VADisplay = *mut VADisplayOpaque;

pub type VAStatus = c_int;
pub type VAGenericID = c_uint;
pub type VASurfaceID = VAGenericID;
pub type VAImageID = VAGenericID;
pub type VABufferID = VAGenericID;
pub type VASubpictureID = VAGenericID;

pub const VA_INVALID_ID: VAGenericID = 0xffff_ffff;

pub const VA_STATUS_SUCCESS:                        VAStatus = 0x00;
pub const VA_STATUS_ERROR_OPERATION_FAILED:         VAStatus = 0x01;
pub const VA_STATUS_ERROR_ALLOCATION_FAILED:        VAStatus = 0x02;
pub const VA_STATUS_ERROR_INVALID_DISPLAY:          VAStatus = 0x03;
pub const VA_STATUS_ERROR_INVALID_CONFIG:           VAStatus = 0x04;
pub const VA_STATUS_ERROR_INVALID_CONTEXT:          VAStatus = 0x05;
pub const VA_STATUS_ERROR_INVALID_SURFACE:          VAStatus = 0x06;
pub const VA_STATUS_ERROR_INVALID_BUFFER:           VAStatus = 0x07;
pub const VA_STATUS_ERROR_INVALID_IMAGE:            VAStatus = 0x08;
pub const VA_STATUS_ERROR_INVALID_SUBPICTURE:       VAStatus = 0x09;
pub const VA_STATUS_ERROR_ATTR_NOT_SUPPORTED:       VAStatus = 0x0a;
pub const VA_STATUS_ERROR_MAX_NUM_EXCEEDED:         VAStatus = 0x0b;
pub const VA_STATUS_ERROR_UNSUPPORTED_RT_FORMAT:    VAStatus = 0x0e;
pub const VA_STATUS_ERROR_SURFACE_BUSY:             VAStatus = 0x10;
pub const VA_STATUS_ERROR_INVALID_PARAMETER:        VAStatus = 0x12;
pub const VA_STATUS_ERROR_RESOLUTION_NOT_SUPPORTED: VAStatus = 0x13;
pub const VA_STATUS_ERROR_UNIMPLEMENTED:            VAStatus = 0x14;
pub const VA_STATUS_ERROR_INVALID_IMAGE_FORMAT:     VAStatus = 0x16;
pub const VA_STATUS_ERROR_HW_BUSY:                  VAStatus = 0x22;
pub const VA_STATUS_ERROR_UNSUPPORTED_MEMORY_TYPE:  VAStatus = 0x24;
pub const VA_STATUS_ERROR_TIMEDOUT:                 VAStatus = 0x26;

pub const VASurfaceAttribPixelFormat:              c_int = 1;
pub const VASurfaceAttribMemoryType:               c_int = 6;
pub const VASurfaceAttribExternalBufferDescriptor: c_int = 7;

pub const VA_SURFACE_ATTRIB_SETTABLE: c_uint = 0x0000_0002;

pub const VAGenericValueTypeInteger: c_int = 1;
pub const VAGenericValueTypePointer: c_int = 3;

#[repr(C)]
#[derive(Clone, Copy)]
pub union VAGenericValueUnion {
    pub i: i32,
    pub f: c_float,
    pub p: *mut c_void,
    pub func: Option<extern "C" fn()>,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct VAGenericValue {
    pub type_: c_int,
    pub value: VAGenericValueUnion,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct VASurfaceAttrib {
    pub type_: c_int,
    pub flags: c_uint,
    pub value: VAGenericValue,
}

#[repr(C)]
pub struct VASurfaceAttribExternalBuffers {
    pub pixel_format: u32,
    pub width: u32,
    pub height: u32,
    pub data_size: u32,
    pub num_planes: u32,
    pub pitches: [u32; 4],
    pub offsets: [u32; 4],
    pub buffers: *mut uintptr_t,
    pub num_buffers: u32,
    pub flags: u32,
    pub private_data: *mut c_void,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct VAImageFormat {
    pub fourcc: u32,
    pub byte_order: u32,
    pub bits_per_pixel: u32,
    pub depth: u32,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
    pub alpha_mask: u32,
    pub va_reserved: [u32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct VAImage {
    pub image_id: VAImageID,
    pub format: VAImageFormat,
    pub buf: VABufferID,
    pub width: u16,
    pub height: u16,
    pub data_size: u32,
    pub num_planes: u32,
    pub pitches: [u32; 3],
    pub offsets: [u32; 3],
    pub num_palette_entries: i32,
    pub entry_bytes: i32,
    pub component_order: [i8; 4],
    pub va_reserved: [u32; 4],
}

#[link(name = "va")]
extern "C" {
    pub fn vaInitialize(dpy: VADisplay, major_version: *mut c_int, minor_version: *mut c_int)
                        -> VAStatus;
    pub fn vaTerminate(dpy: VADisplay) -> VAStatus;
    pub fn vaErrorStr(error_status: VAStatus) -> *const c_char;

    pub fn vaCreateSurfaces(dpy: VADisplay,
                            format: c_uint,
                            width: c_uint,
                            height: c_uint,
                            surfaces: *mut VASurfaceID,
                            num_surfaces: c_uint,
                            attrib_list: *mut VASurfaceAttrib,
                            num_attribs: c_uint)
                            -> VAStatus;
    pub fn vaDestroySurfaces(dpy: VADisplay, surfaces: *mut VASurfaceID, num_surfaces: c_int)
                             -> VAStatus;
    pub fn vaSyncSurface(dpy: VADisplay, render_target: VASurfaceID) -> VAStatus;
    pub fn vaQuerySurfaceStatus(dpy: VADisplay, render_target: VASurfaceID, status: *mut c_uint)
                                -> VAStatus;

    pub fn vaMaxNumImageFormats(dpy: VADisplay) -> c_int;
    pub fn vaQueryImageFormats(dpy: VADisplay,
                               format_list: *mut VAImageFormat,
                               num_formats: *mut c_int)
                               -> VAStatus;
    pub fn vaCreateImage(dpy: VADisplay,
                         format: *mut VAImageFormat,
                         width: c_int,
                         height: c_int,
                         image: *mut VAImage)
                         -> VAStatus;
    pub fn vaDestroyImage(dpy: VADisplay, image: VAImageID) -> VAStatus;
    pub fn vaDeriveImage(dpy: VADisplay, surface: VASurfaceID, image: *mut VAImage) -> VAStatus;
    pub fn vaGetImage(dpy: VADisplay,
                      surface: VASurfaceID,
                      x: c_int,
                      y: c_int,
                      width: c_uint,
                      height: c_uint,
                      image: VAImageID)
                      -> VAStatus;
    pub fn vaPutImage(dpy: VADisplay,
                      surface: VASurfaceID,
                      image: VAImageID,
                      src_x: c_int,
                      src_y: c_int,
                      src_width: c_uint,
                      src_height: c_uint,
                      dest_x: c_int,
                      dest_y: c_int,
                      dest_width: c_uint,
                      dest_height: c_uint)
                      -> VAStatus;

    pub fn vaMapBuffer(dpy: VADisplay, buf_id: VABufferID, pbuf: *mut *mut c_void) -> VAStatus;
    pub fn vaUnmapBuffer(dpy: VADisplay, buf_id: VABufferID) -> VAStatus;

    pub fn vaCreateSubpicture(dpy: VADisplay, image: VAImageID, subpicture: *mut VASubpictureID)
                              -> VAStatus;
    pub fn vaDestroySubpicture(dpy: VADisplay, subpicture: VASubpictureID) -> VAStatus;
    pub fn vaSetSubpictureGlobalAlpha(dpy: VADisplay,
                                      subpicture: VASubpictureID,
                                      global_alpha: c_float)
                                      -> VAStatus;
    pub fn vaAssociateSubpicture(dpy: VADisplay,
                                 subpicture: VASubpictureID,
                                 target_surfaces: *mut VASurfaceID,
                                 num_surfaces: c_int,
                                 src_x: c_short,
                                 src_y: c_short,
                                 src_width: c_ushort,
                                 src_height: c_ushort,
                                 dest_x: c_short,
                                 dest_y: c_short,
                                 dest_width: c_ushort,
                                 dest_height: c_ushort,
                                 flags: u32)
                                 -> VAStatus;
    pub fn vaDeassociateSubpicture(dpy: VADisplay,
                                   subpicture: VASubpictureID,
                                   target_surfaces: *mut VASurfaceID,
                                   num_surfaces: c_int)
                                   -> VAStatus;
}
