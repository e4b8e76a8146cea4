// vasurf/src/video_info.rs
//
//! The memory layout of a video frame.

use crate::format::VideoFormat;

/// The largest number of planes a frame can have.
pub const MAX_PLANES: usize = 4;

/// Describes the layout of a video frame: its format, size, and per-plane strides and offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    format: VideoFormat,
    width: u32,
    height: u32,
    n_planes: usize,
    strides: [u32; MAX_PLANES],
    offsets: [u32; MAX_PLANES],
    size: usize,
}

#[inline]
fn round_up_4(value: u32) -> Option<u32> {
    value.checked_add(3).map(|value| value & !3)
}

#[inline]
fn half(value: u32) -> u32 {
    value / 2 + value % 2
}

impl VideoInfo {
    /// Computes the default layout of a frame: strides rounded up to four bytes, planes stored
    /// one after the other.
    ///
    /// Returns `None` if a stride or a plane offset does not fit in 32 bits.
    pub fn new(format: VideoFormat, width: u32, height: u32) -> Option<VideoInfo> {
        let packed = |bytes_per_pixel: u32| width.checked_mul(bytes_per_pixel);
        let chroma = |bytes_per_pair: u32| half(width).checked_mul(bytes_per_pair);

        // (stride, rows) of each plane.
        let planes: Vec<(u32, u32)> = match format {
            VideoFormat::I420 | VideoFormat::YV12 => {
                let chroma_stride = round_up_4(half(width))?;
                vec![
                    (round_up_4(width)?, height),
                    (chroma_stride, half(height)),
                    (chroma_stride, half(height)),
                ]
            }
            VideoFormat::NV12 => vec![
                (round_up_4(width)?, height),
                (round_up_4(chroma(2)?)?, half(height)),
            ],
            VideoFormat::P010_10LE => vec![
                (round_up_4(packed(2)?)?, height),
                (round_up_4(chroma(4)?)?, half(height)),
            ],
            VideoFormat::YUY2 | VideoFormat::UYVY => vec![(round_up_4(chroma(4)?)?, height)],
            VideoFormat::GRAY8 => vec![(round_up_4(width)?, height)],
            VideoFormat::RGB => vec![(round_up_4(packed(3)?)?, height)],
            VideoFormat::AYUV
            | VideoFormat::RGBA
            | VideoFormat::BGRA
            | VideoFormat::ARGB
            | VideoFormat::ABGR
            | VideoFormat::RGBx
            | VideoFormat::BGRx
            | VideoFormat::xRGB
            | VideoFormat::xBGR => vec![(packed(4)?, height)],
            VideoFormat::Encoded => vec![],
        };

        let mut strides = [0; MAX_PLANES];
        let mut offsets = [0; MAX_PLANES];
        let mut size: usize = 0;
        for (index, &(stride, rows)) in planes.iter().enumerate() {
            strides[index] = stride;
            offsets[index] = u32::try_from(size).ok()?;
            let plane_size = (stride as usize).checked_mul(rows as usize)?;
            size = size.checked_add(plane_size)?;
        }

        Some(VideoInfo {
            format,
            width,
            height,
            n_planes: planes.len(),
            strides,
            offsets,
            size,
        })
    }

    /// Describes a frame with explicit per-plane strides and offsets.
    ///
    /// `strides` and `offsets` must have the same length, at most `MAX_PLANES`; `None` is
    /// returned otherwise.
    pub fn with_planes(
        format: VideoFormat,
        width: u32,
        height: u32,
        strides: &[u32],
        offsets: &[u32],
        size: usize,
    ) -> Option<VideoInfo> {
        if strides.len() != offsets.len() || strides.len() > MAX_PLANES {
            return None;
        }
        let mut info = VideoInfo {
            format,
            width,
            height,
            n_planes: strides.len(),
            strides: [0; MAX_PLANES],
            offsets: [0; MAX_PLANES],
            size,
        };
        info.strides[..strides.len()].copy_from_slice(strides);
        info.offsets[..offsets.len()].copy_from_slice(offsets);
        Some(info)
    }

    #[inline]
    pub fn format(&self) -> VideoFormat {
        self.format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn n_planes(&self) -> usize {
        self.n_planes
    }

    /// The row stride of `plane`, in bytes.
    #[inline]
    pub fn plane_stride(&self, plane: usize) -> u32 {
        self.strides[plane]
    }

    /// The byte offset of `plane` from the start of the frame.
    #[inline]
    pub fn plane_offset(&self, plane: usize) -> u32 {
        self.offsets[plane]
    }

    /// The total size of the frame, in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}
