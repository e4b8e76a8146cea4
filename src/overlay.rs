// vasurf/src/overlay.rs
//
//! Overlay compositions: the subtitles and graphics to be applied to a frame.

use crate::surface::Rectangle;
use crate::Error;

/// One overlay: a block of 32-bit ARGB pixels (BGRA byte order) and the region of the frame it
/// is rendered into.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayRectangle {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    render_rectangle: Rectangle,
    global_alpha: f32,
    premultiplied: bool,
}

impl OverlayRectangle {
    /// Wraps `width * height` tightly packed pixels.
    ///
    /// Returns `PreconditionMismatch` if `pixels` has the wrong length.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        render_rectangle: Rectangle,
    ) -> Result<OverlayRectangle, Error> {
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(Error::PreconditionMismatch);
        }
        Ok(OverlayRectangle {
            pixels,
            width,
            height,
            render_rectangle,
            global_alpha: 1.0,
            premultiplied: false,
        })
    }

    /// Sets the alpha the whole rectangle is blended with.
    pub fn with_global_alpha(mut self, global_alpha: f32) -> OverlayRectangle {
        self.global_alpha = global_alpha;
        self
    }

    /// Marks the pixels as having premultiplied alpha.
    pub fn with_premultiplied_alpha(mut self, premultiplied: bool) -> OverlayRectangle {
        self.premultiplied = premultiplied;
        self
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The region of the frame, in frame pixels, the overlay is scaled into.
    #[inline]
    pub fn render_rectangle(&self) -> Rectangle {
        self.render_rectangle
    }

    #[inline]
    pub fn global_alpha(&self) -> f32 {
        self.global_alpha
    }

    #[inline]
    pub fn is_premultiplied(&self) -> bool {
        self.premultiplied
    }
}

/// An ordered list of overlay rectangles, applied back to front.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayComposition {
    rectangles: Vec<OverlayRectangle>,
}

impl OverlayComposition {
    pub fn new() -> OverlayComposition {
        OverlayComposition::default()
    }

    /// Appends a rectangle on top of the current ones.
    pub fn add_rectangle(&mut self, rectangle: OverlayRectangle) {
        self.rectangles.push(rectangle)
    }

    #[inline]
    pub fn n_rectangles(&self) -> usize {
        self.rectangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rectangles.is_empty()
    }

    pub fn rectangle(&self, index: usize) -> Option<&OverlayRectangle> {
        self.rectangles.get(index)
    }

    pub fn rectangles(&self) -> &[OverlayRectangle] {
        &self.rectangles
    }
}

impl FromIterator<OverlayRectangle> for OverlayComposition {
    fn from_iter<I: IntoIterator<Item = OverlayRectangle>>(iter: I) -> OverlayComposition {
        OverlayComposition {
            rectangles: iter.into_iter().collect(),
        }
    }
}
