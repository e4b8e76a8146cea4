// vasurf/src/driver.rs
//
//! The abstract interface that all video-acceleration drivers conform to.
//!
//! Each method corresponds to exactly one driver entry point. Implementations do no locking of
//! their own: the `Display` owns the driver behind a mutex and every caller in this crate holds
//! that lock for the duration of one call.

use crate::error::DriverStatus;
use crate::format::Fourcc;
use crate::surface::Rectangle;

use std::fmt::{self, Display, Formatter};

macro_rules! resource_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub struct $name(pub u32);

        impl $name {
            /// The sentinel value that never names a live resource.
            pub const INVALID: $name = $name(0xffff_ffff);

            /// Returns true unless this is the invalid sentinel.
            #[inline]
            pub fn is_valid(self) -> bool {
                self != $name::INVALID
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                write!(f, "{:#010x}", self.0)
            }
        }
    };
}

resource_id!(
    /// The driver-assigned identifier of a surface.
    SurfaceID
);
resource_id!(
    /// The driver-assigned identifier of an image.
    ImageID
);
resource_id!(
    /// The driver-assigned identifier of a data buffer.
    BufferID
);
resource_id!(
    /// The driver-assigned identifier of a subpicture.
    SubpictureID
);

/// The version of the driver interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    /// The major version (e.g. 1 in 1.20).
    pub major: u32,
    /// The minor version (e.g. 20 in 1.20).
    pub minor: u32,
}

impl ApiVersion {
    /// Creates a version structure with the given major and minor version numbers.
    #[inline]
    pub const fn new(major: u32, minor: u32) -> ApiVersion {
        ApiVersion { major, minor }
    }
}

impl Display for ApiVersion {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A driver render-target format, i.e. the driver's own chroma enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RtFormat(pub u32);

impl RtFormat {
    pub const YUV420: RtFormat = RtFormat(0x0000_0001);
    pub const YUV422: RtFormat = RtFormat(0x0000_0002);
    pub const YUV444: RtFormat = RtFormat(0x0000_0004);
    pub const YUV411: RtFormat = RtFormat(0x0000_0008);
    pub const YUV400: RtFormat = RtFormat(0x0000_0010);
    pub const YUV420_10: RtFormat = RtFormat(0x0000_0100);
    pub const RGB16: RtFormat = RtFormat(0x0001_0000);
    pub const RGB32: RtFormat = RtFormat(0x0002_0000);
}

/// The kind of memory backing a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryType {
    /// Memory allocated and owned by the driver.
    Va,
    /// A V4L2 buffer.
    V4l2,
    /// A plain user-space pointer.
    UserPtr,
    /// A DRM GEM buffer, named by its flink handle.
    KernelDrm,
    /// A DRM PRIME (dma-buf) file descriptor.
    DrmPrime,
}

impl MemoryType {
    /// The driver's bit value for this memory type.
    pub fn bits(self) -> u32 {
        match self {
            MemoryType::Va => 0x0000_0001,
            MemoryType::V4l2 => 0x0000_0002,
            MemoryType::UserPtr => 0x0000_0004,
            MemoryType::KernelDrm => 0x1000_0000,
            MemoryType::DrmPrime => 0x2000_0000,
        }
    }
}

bitflags! {
    /// Flags of an external buffer descriptor.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ExternalBufferFlags: u32 {
        /// The buffer may use a tiled layout.
        const ENABLE_TILING = 0x0000_0001;
    }
}

/// Describes memory that backs, or is to back, a surface.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalBuffers {
    pub pixel_format: Fourcc,
    pub width: u32,
    pub height: u32,
    pub data_size: u32,
    pub num_planes: u32,
    pub pitches: [u32; 4],
    pub offsets: [u32; 4],
    /// Native handles of the buffers. Empty when the driver allocates the memory itself.
    pub buffers: Vec<usize>,
    pub flags: ExternalBufferFlags,
}

impl ExternalBuffers {
    /// Creates an empty descriptor for a buffer of the given pixel format and size.
    pub fn new(pixel_format: Fourcc, width: u32, height: u32) -> ExternalBuffers {
        ExternalBuffers {
            pixel_format,
            width,
            height,
            data_size: 0,
            num_planes: 0,
            pitches: [0; 4],
            offsets: [0; 4],
            buffers: vec![],
            flags: ExternalBufferFlags::empty(),
        }
    }
}

/// An attribute passed to surface allocation.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceAttrib {
    /// The explicit pixel format of the surface.
    PixelFormat(Fourcc),
    /// The kind of memory backing the surface.
    MemoryType(MemoryType),
    /// The layout, and possibly the storage, of the surface memory.
    ExternalBufferDescriptor(ExternalBuffers),
}

/// Describes a driver image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageDescriptor {
    pub id: ImageID,
    /// The buffer holding the image data.
    pub buffer: BufferID,
    pub fourcc: Fourcc,
    pub width: u32,
    pub height: u32,
    pub data_size: u32,
    pub num_planes: u32,
    pub pitches: [u32; 3],
    pub offsets: [u32; 3],
}

bitflags! {
    /// Surface status bits, as the driver reports them.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DriverSurfaceStatus: u32 {
        const RENDERING  = 0x01;
        const DISPLAYING = 0x02;
        const READY      = 0x04;
        const SKIPPED    = 0x08;
    }
}

bitflags! {
    /// Subpicture rendering flags, as the driver understands them.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DriverSubpictureFlags: u32 {
        const CHROMA_KEYING               = 0x0001;
        const GLOBAL_ALPHA                = 0x0002;
        const DESTINATION_IS_SCREEN_COORD = 0x0004;
    }
}

/// A video-acceleration driver.
///
/// Drivers are owned by a `Display`, which serializes all calls.
pub trait Driver: Send {
    /// Returns the version of the driver interface.
    fn api_version(&self) -> ApiVersion;

    /// Allocates one surface.
    ///
    /// Drivers older than 0.34 only accept an empty attribute list.
    fn create_surface(
        &mut self,
        rt_format: RtFormat,
        width: u32,
        height: u32,
        attribs: &[SurfaceAttrib],
    ) -> Result<SurfaceID, DriverStatus>;

    /// Destroys a surface.
    fn destroy_surface(&mut self, surface: SurfaceID) -> Result<(), DriverStatus>;

    /// Creates an image that maps the surface memory directly, without copying.
    fn derive_image(&mut self, surface: SurfaceID) -> Result<ImageDescriptor, DriverStatus>;

    /// Creates an image with its own storage.
    fn create_image(
        &mut self,
        fourcc: Fourcc,
        width: u32,
        height: u32,
    ) -> Result<ImageDescriptor, DriverStatus>;

    /// Destroys an image and its buffer.
    fn destroy_image(&mut self, image: ImageID) -> Result<(), DriverStatus>;

    /// Maps a buffer and copies its contents out.
    fn read_buffer(&mut self, buffer: BufferID) -> Result<Vec<u8>, DriverStatus>;

    /// Maps a buffer and copies `data` into it, starting at offset zero.
    fn write_buffer(&mut self, buffer: BufferID, data: &[u8]) -> Result<(), DriverStatus>;

    /// Copies the `rect` region of the surface into the image.
    fn get_image(
        &mut self,
        surface: SurfaceID,
        rect: &Rectangle,
        image: ImageID,
    ) -> Result<(), DriverStatus>;

    /// Copies the `src` region of the image into the `dst` region of the surface.
    fn put_image(
        &mut self,
        surface: SurfaceID,
        image: ImageID,
        src: &Rectangle,
        dst: &Rectangle,
    ) -> Result<(), DriverStatus>;

    /// Creates a subpicture sourcing its pixels from the image.
    fn create_subpicture(&mut self, image: ImageID) -> Result<SubpictureID, DriverStatus>;

    /// Destroys a subpicture.
    fn destroy_subpicture(&mut self, subpicture: SubpictureID) -> Result<(), DriverStatus>;

    /// Sets the alpha value the subpicture is blended with.
    fn set_subpicture_global_alpha(
        &mut self,
        subpicture: SubpictureID,
        global_alpha: f32,
    ) -> Result<(), DriverStatus>;

    /// Binds the `src` region of the subpicture to the `dst` region of each surface.
    fn associate_subpicture(
        &mut self,
        subpicture: SubpictureID,
        surfaces: &[SurfaceID],
        src: &Rectangle,
        dst: &Rectangle,
        flags: DriverSubpictureFlags,
    ) -> Result<(), DriverStatus>;

    /// Unbinds the subpicture from each surface.
    fn deassociate_subpicture(
        &mut self,
        subpicture: SubpictureID,
        surfaces: &[SurfaceID],
    ) -> Result<(), DriverStatus>;

    /// Blocks until all pending operations on the surface have completed.
    fn sync_surface(&mut self, surface: SurfaceID) -> Result<(), DriverStatus>;

    /// Returns the pending operations on the surface, without blocking.
    fn query_surface_status(
        &mut self,
        surface: SurfaceID,
    ) -> Result<DriverSurfaceStatus, DriverStatus>;
}
