// vasurf/src/format.rs
//
//! Chroma types, video formats, and their driver equivalents.

use crate::driver::RtFormat;

use std::fmt::{self, Debug, Display, Formatter};

/// The color subsampling scheme of a surface's internal storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ChromaType {
    /// 4:2:0 subsampling, 8 bits per component.
    Yuv420,
    /// 4:2:2 subsampling.
    Yuv422,
    /// 4:4:4, no subsampling.
    Yuv444,
    /// 4:1:1 subsampling.
    Yuv411,
    /// 4:1:0 subsampling.
    Yuv410,
    /// Luma only.
    Yuv400,
    /// 4:2:0 subsampling, 10 bits per component.
    Yuv420_10Bpp,
    /// 32-bit packed RGB.
    Rgb32,
    /// 16-bit packed RGB.
    Rgb16,
}

impl ChromaType {
    /// Returns the driver render-target format for this chroma type, or `None` if the driver has
    /// no equivalent.
    pub fn to_rt_format(self) -> Option<RtFormat> {
        match self {
            ChromaType::Yuv420 => Some(RtFormat::YUV420),
            ChromaType::Yuv422 => Some(RtFormat::YUV422),
            ChromaType::Yuv444 => Some(RtFormat::YUV444),
            ChromaType::Yuv411 => Some(RtFormat::YUV411),
            ChromaType::Yuv400 => Some(RtFormat::YUV400),
            ChromaType::Yuv420_10Bpp => Some(RtFormat::YUV420_10),
            ChromaType::Rgb32 => Some(RtFormat::RGB32),
            ChromaType::Rgb16 => Some(RtFormat::RGB16),
            ChromaType::Yuv410 => None,
        }
    }
}

/// A four-character code naming a driver pixel format.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fourcc(pub u32);

impl Fourcc {
    /// Builds a fourcc from its four characters, least significant byte first.
    #[inline]
    pub const fn from_chars(chars: &[u8; 4]) -> Fourcc {
        Fourcc(
            chars[0] as u32
                | (chars[1] as u32) << 8
                | (chars[2] as u32) << 16
                | (chars[3] as u32) << 24,
        )
    }

    /// Returns the four characters of this code.
    pub fn to_chars(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub const NV12: Fourcc = Fourcc::from_chars(b"NV12");
    pub const I420: Fourcc = Fourcc::from_chars(b"I420");
    pub const YV12: Fourcc = Fourcc::from_chars(b"YV12");
    pub const YUY2: Fourcc = Fourcc::from_chars(b"YUY2");
    pub const UYVY: Fourcc = Fourcc::from_chars(b"UYVY");
    pub const AYUV: Fourcc = Fourcc::from_chars(b"AYUV");
    pub const P010: Fourcc = Fourcc::from_chars(b"P010");
    pub const Y800: Fourcc = Fourcc::from_chars(b"Y800");
    pub const RGBA: Fourcc = Fourcc::from_chars(b"RGBA");
    pub const BGRA: Fourcc = Fourcc::from_chars(b"BGRA");
    pub const ARGB: Fourcc = Fourcc::from_chars(b"ARGB");
    pub const ABGR: Fourcc = Fourcc::from_chars(b"ABGR");
    pub const RGBX: Fourcc = Fourcc::from_chars(b"RGBX");
    pub const BGRX: Fourcc = Fourcc::from_chars(b"BGRX");
    pub const XRGB: Fourcc = Fourcc::from_chars(b"XRGB");
    pub const XBGR: Fourcc = Fourcc::from_chars(b"XBGR");
}

impl Debug for Fourcc {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Fourcc({})", self)
    }
}

impl Display for Fourcc {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for &c in &self.to_chars() {
            let c = if c.is_ascii_graphic() { c as char } else { '?' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// A pixel format for CPU-visible image data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum VideoFormat {
    /// The surface holds data in a driver-private layout that cannot be described here.
    Encoded,
    I420,
    YV12,
    NV12,
    YUY2,
    UYVY,
    AYUV,
    P010_10LE,
    GRAY8,
    RGBA,
    BGRA,
    ARGB,
    ABGR,
    RGBx,
    BGRx,
    xRGB,
    xBGR,
    /// Packed 24-bit RGB. Drivers have no surface format for it.
    RGB,
}

static FORMAT_TABLE: [(VideoFormat, Fourcc, ChromaType); 16] = [
    (VideoFormat::NV12, Fourcc::NV12, ChromaType::Yuv420),
    (VideoFormat::I420, Fourcc::I420, ChromaType::Yuv420),
    (VideoFormat::YV12, Fourcc::YV12, ChromaType::Yuv420),
    (VideoFormat::YUY2, Fourcc::YUY2, ChromaType::Yuv422),
    (VideoFormat::UYVY, Fourcc::UYVY, ChromaType::Yuv422),
    (VideoFormat::AYUV, Fourcc::AYUV, ChromaType::Yuv444),
    (VideoFormat::P010_10LE, Fourcc::P010, ChromaType::Yuv420_10Bpp),
    (VideoFormat::GRAY8, Fourcc::Y800, ChromaType::Yuv400),
    (VideoFormat::RGBA, Fourcc::RGBA, ChromaType::Rgb32),
    (VideoFormat::BGRA, Fourcc::BGRA, ChromaType::Rgb32),
    (VideoFormat::ARGB, Fourcc::ARGB, ChromaType::Rgb32),
    (VideoFormat::ABGR, Fourcc::ABGR, ChromaType::Rgb32),
    (VideoFormat::RGBx, Fourcc::RGBX, ChromaType::Rgb32),
    (VideoFormat::BGRx, Fourcc::BGRX, ChromaType::Rgb32),
    (VideoFormat::xRGB, Fourcc::XRGB, ChromaType::Rgb32),
    (VideoFormat::xBGR, Fourcc::XBGR, ChromaType::Rgb32),
];

impl VideoFormat {
    /// Returns the driver pixel format for this video format.
    pub fn to_fourcc(self) -> Option<Fourcc> {
        FORMAT_TABLE
            .iter()
            .find(|&&(format, _, _)| format == self)
            .map(|&(_, fourcc, _)| fourcc)
    }

    /// Returns the video format for a driver pixel format.
    pub fn from_fourcc(fourcc: Fourcc) -> Option<VideoFormat> {
        FORMAT_TABLE
            .iter()
            .find(|&&(_, entry, _)| entry == fourcc)
            .map(|&(format, _, _)| format)
    }

    /// Returns the chroma type a surface holding this format must have.
    pub fn chroma_type(self) -> Option<ChromaType> {
        match self {
            VideoFormat::RGB => Some(ChromaType::Rgb32),
            _ => FORMAT_TABLE
                .iter()
                .find(|&&(format, _, _)| format == self)
                .map(|&(_, _, chroma_type)| chroma_type),
        }
    }
}
