// vasurf/src/tests.rs
//
//! Unit tests.

use crate::driver::{BufferID, DriverSubpictureFlags, DriverSurfaceStatus, ExternalBufferFlags};
use crate::driver::{ImageDescriptor, MemoryType, RtFormat, SurfaceAttrib};
use crate::{ApiVersion, BufferMemoryType, BufferProxy, ChromaType, Context, ContextID, Display};
use crate::{Driver, DriverStatus, Error, Fourcc, Image, ImageID, OverlayComposition};
use crate::{OverlayRectangle, Rectangle, SoftwareDriver, Subpicture, SubpictureFlags};
use crate::{SubpictureID, Surface, SurfaceAllocFlags, SurfaceID, SurfaceStatus, VideoFormat};
use crate::VideoInfo;

use euclid::default::{Point2D, Rect, Size2D};
use fnv::FnvHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct DriverLog {
    calls: Vec<&'static str>,
    // Call name -> (successes left before failing, status to fail with).
    faults: FnvHashMap<&'static str, (usize, DriverStatus)>,
}

// Wraps the software driver, recording every call and failing the ones it is told to.
struct TestDriver {
    software: Arc<Mutex<SoftwareDriver>>,
    log: Arc<Mutex<DriverLog>>,
}

impl TestDriver {
    fn record(&self, call: &'static str) -> Result<MutexGuard<SoftwareDriver>, DriverStatus> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(call);
        if let Some(fault) = log.faults.get_mut(call) {
            if fault.0 == 0 {
                return Err(fault.1);
            }
            fault.0 -= 1;
        }
        Ok(self.software.lock().unwrap())
    }
}

impl Driver for TestDriver {
    fn api_version(&self) -> ApiVersion {
        self.software.lock().unwrap().api_version()
    }

    fn create_surface(
        &mut self,
        rt_format: RtFormat,
        width: u32,
        height: u32,
        attribs: &[SurfaceAttrib],
    ) -> Result<SurfaceID, DriverStatus> {
        self.record("create_surface")?
            .create_surface(rt_format, width, height, attribs)
    }

    fn destroy_surface(&mut self, surface: SurfaceID) -> Result<(), DriverStatus> {
        self.record("destroy_surface")?.destroy_surface(surface)
    }

    fn derive_image(&mut self, surface: SurfaceID) -> Result<ImageDescriptor, DriverStatus> {
        self.record("derive_image")?.derive_image(surface)
    }

    fn create_image(
        &mut self,
        fourcc: Fourcc,
        width: u32,
        height: u32,
    ) -> Result<ImageDescriptor, DriverStatus> {
        self.record("create_image")?.create_image(fourcc, width, height)
    }

    fn destroy_image(&mut self, image: ImageID) -> Result<(), DriverStatus> {
        self.record("destroy_image")?.destroy_image(image)
    }

    fn read_buffer(&mut self, buffer: BufferID) -> Result<Vec<u8>, DriverStatus> {
        self.record("read_buffer")?.read_buffer(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferID, data: &[u8]) -> Result<(), DriverStatus> {
        self.record("write_buffer")?.write_buffer(buffer, data)
    }

    fn get_image(
        &mut self,
        surface: SurfaceID,
        rect: &Rectangle,
        image: ImageID,
    ) -> Result<(), DriverStatus> {
        self.record("get_image")?.get_image(surface, rect, image)
    }

    fn put_image(
        &mut self,
        surface: SurfaceID,
        image: ImageID,
        src: &Rectangle,
        dst: &Rectangle,
    ) -> Result<(), DriverStatus> {
        self.record("put_image")?.put_image(surface, image, src, dst)
    }

    fn create_subpicture(&mut self, image: ImageID) -> Result<SubpictureID, DriverStatus> {
        self.record("create_subpicture")?.create_subpicture(image)
    }

    fn destroy_subpicture(&mut self, subpicture: SubpictureID) -> Result<(), DriverStatus> {
        self.record("destroy_subpicture")?.destroy_subpicture(subpicture)
    }

    fn set_subpicture_global_alpha(
        &mut self,
        subpicture: SubpictureID,
        global_alpha: f32,
    ) -> Result<(), DriverStatus> {
        self.record("set_subpicture_global_alpha")?
            .set_subpicture_global_alpha(subpicture, global_alpha)
    }

    fn associate_subpicture(
        &mut self,
        subpicture: SubpictureID,
        surfaces: &[SurfaceID],
        src: &Rectangle,
        dst: &Rectangle,
        flags: DriverSubpictureFlags,
    ) -> Result<(), DriverStatus> {
        self.record("associate_subpicture")?
            .associate_subpicture(subpicture, surfaces, src, dst, flags)
    }

    fn deassociate_subpicture(
        &mut self,
        subpicture: SubpictureID,
        surfaces: &[SurfaceID],
    ) -> Result<(), DriverStatus> {
        self.record("deassociate_subpicture")?
            .deassociate_subpicture(subpicture, surfaces)
    }

    fn sync_surface(&mut self, surface: SurfaceID) -> Result<(), DriverStatus> {
        self.record("sync_surface")?.sync_surface(surface)
    }

    fn query_surface_status(
        &mut self,
        surface: SurfaceID,
    ) -> Result<DriverSurfaceStatus, DriverStatus> {
        self.record("query_surface_status")?.query_surface_status(surface)
    }
}

struct Harness {
    display: Display,
    software: Arc<Mutex<SoftwareDriver>>,
    log: Arc<Mutex<DriverLog>>,
}

impl Harness {
    fn new() -> Harness {
        Harness::with_api_version(ApiVersion::new(1, 0))
    }

    fn with_api_version(api_version: ApiVersion) -> Harness {
        let software = Arc::new(Mutex::new(SoftwareDriver::with_api_version(api_version)));
        let log = Arc::new(Mutex::new(DriverLog::default()));
        let display = Display::new(TestDriver {
            software: software.clone(),
            log: log.clone(),
        });
        Harness {
            display,
            software,
            log,
        }
    }

    fn software(&self) -> MutexGuard<SoftwareDriver> {
        self.software.lock().unwrap()
    }

    fn calls(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().calls.clone()
    }

    fn count(&self, call: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|&&recorded| recorded == call)
            .count()
    }

    fn clear_calls(&self) {
        self.log.lock().unwrap().calls.clear()
    }

    fn fail(&self, call: &'static str, status: DriverStatus) {
        self.fail_after(call, 0, status)
    }

    fn fail_after(&self, call: &'static str, successes: usize, status: DriverStatus) {
        self.log.lock().unwrap().faults.insert(call, (successes, status));
    }

    fn heal(&self, call: &'static str) {
        self.log.lock().unwrap().faults.remove(call);
    }

    fn bgra_subpicture(&self, width: u32, height: u32, flags: SubpictureFlags) -> Subpicture {
        let image = Image::new(&self.display, VideoFormat::BGRA, width, height).unwrap();
        Subpicture::new(&image, flags).unwrap()
    }
}

fn rect(x: u32, y: u32, width: u32, height: u32) -> Rectangle {
    Rect::new(Point2D::new(x, y), Size2D::new(width, height))
}

fn overlay(width: u32, height: u32, render_rectangle: Rectangle) -> OverlayRectangle {
    let pixels = vec![0x80; width as usize * height as usize * 4];
    OverlayRectangle::new(pixels, width, height, render_rectangle).unwrap()
}

struct TestContext {
    id: ContextID,
    applied: Mutex<Vec<Option<usize>>>,
}

impl Context for TestContext {
    fn id(&self) -> ContextID {
        self.id
    }

    fn apply_composition(&self, composition: Option<&OverlayComposition>) -> Result<(), Error> {
        self.applied
            .lock()
            .unwrap()
            .push(composition.map(OverlayComposition::n_rectangles));
        Ok(())
    }
}

fn register_test_context(display: &Display) -> Arc<TestContext> {
    let context = Arc::new(TestContext {
        id: ContextID::new(),
        applied: Mutex::new(vec![]),
    });
    let registered: Arc<dyn Context> = context.clone();
    display.register_context(&registered);
    context
}

#[test]
fn test_surface_creation() {
    let harness = Harness::new();
    let surface = Surface::new(&harness.display, ChromaType::Yuv420, 320, 240).unwrap();
    assert!(surface.id().is_valid());
    assert_eq!(surface.width(), 320);
    assert_eq!(surface.height(), 240);
    assert_eq!(surface.size(), Size2D::new(320, 240));
    assert_eq!(surface.chroma_type(), ChromaType::Yuv420);
    assert_eq!(surface.cached_format(), None);
    assert!(surface.subpictures().is_empty());
    assert!(surface.buffer_proxy().is_none());
    assert_eq!(harness.calls(), vec!["create_surface"]);
    assert_eq!(harness.software().surface_attribs(surface.id()), Some(&[][..]));

    let id = surface.id();
    drop(surface);
    assert_eq!(harness.count("destroy_surface"), 1);
    assert_eq!(harness.software().surface_count(), 0);
    assert!(harness.software().surface_attribs(id).is_none());
}

#[test]
fn test_unsupported_chroma_makes_no_driver_call() {
    let harness = Harness::new();
    match Surface::new(&harness.display, ChromaType::Yuv410, 64, 64) {
        Err(Error::UnsupportedChroma(ChromaType::Yuv410)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(harness.calls().is_empty());
}

#[test]
fn test_unsupported_format_makes_no_driver_call() {
    let harness = Harness::new();
    for &format in &[VideoFormat::Encoded, VideoFormat::RGB] {
        match Surface::new_with_format(&harness.display, format, 64, 64) {
            Err(Error::UnsupportedFormat(rejected)) => assert_eq!(rejected, format),
            other => panic!("unexpected result: {:?}", other),
        }
    }
    assert!(harness.calls().is_empty());
}

#[test]
fn test_creation_failure() {
    let harness = Harness::new();
    harness.fail("create_surface", DriverStatus::AllocationFailed);
    match Surface::new(&harness.display, ChromaType::Yuv420, 64, 64) {
        Err(Error::DriverCallFailed {
            call: "vaCreateSurfaces()",
            status: DriverStatus::AllocationFailed,
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(harness.calls(), vec!["create_surface"]);
}

#[test]
fn test_full_surface_names_pixel_format() {
    let harness = Harness::new();
    let info = VideoInfo::new(VideoFormat::YUY2, 64, 32).unwrap();
    let surface = Surface::new_full(&harness.display, &info, SurfaceAllocFlags::empty()).unwrap();
    assert_eq!(surface.chroma_type(), ChromaType::Yuv422);
    assert_eq!(surface.cached_format(), Some(VideoFormat::YUY2));
    assert_eq!(surface.format(), VideoFormat::YUY2);
    assert_eq!(harness.count("derive_image"), 0);
    assert_eq!(
        harness.software().surface_attribs(surface.id()).unwrap(),
        &[SurfaceAttrib::PixelFormat(Fourcc::YUY2)][..]
    );
}

#[test]
fn test_full_surface_layout_constraints() {
    let harness = Harness::new();
    let info = VideoInfo::new(VideoFormat::NV12, 50, 30).unwrap();

    let flags = SurfaceAllocFlags::LINEAR_STORAGE | SurfaceAllocFlags::FIXED_STRIDES;
    let surface = Surface::new_full(&harness.display, &info, flags).unwrap();
    let attribs = harness.software().surface_attribs(surface.id()).unwrap().to_vec();
    assert_eq!(attribs.len(), 3);
    assert_eq!(attribs[0], SurfaceAttrib::PixelFormat(Fourcc::NV12));
    assert_eq!(attribs[1], SurfaceAttrib::MemoryType(MemoryType::Va));
    match attribs[2] {
        SurfaceAttrib::ExternalBufferDescriptor(ref extbuf) => {
            assert_eq!(extbuf.pixel_format, Fourcc::NV12);
            assert_eq!((extbuf.width, extbuf.height), (50, 30));
            assert!(!extbuf.flags.contains(ExternalBufferFlags::ENABLE_TILING));
            assert_eq!(extbuf.num_planes, 2);
            assert_eq!(extbuf.pitches, [52, 52, 0, 0]);
            assert_eq!(extbuf.offsets, [0; 4]);
            assert!(extbuf.buffers.is_empty());
        }
        ref other => panic!("unexpected attribute: {:?}", other),
    }

    let surface = Surface::new_full(&harness.display, &info, SurfaceAllocFlags::FIXED_OFFSETS)
        .unwrap();
    let attribs = harness.software().surface_attribs(surface.id()).unwrap().to_vec();
    match attribs[2] {
        SurfaceAttrib::ExternalBufferDescriptor(ref extbuf) => {
            assert_eq!(extbuf.offsets, [0, 52 * 30, 0, 0]);
            assert_eq!(extbuf.pitches, [0; 4]);
        }
        ref other => panic!("unexpected attribute: {:?}", other),
    }
}

#[test]
fn test_capability_gating() {
    let harness = Harness::with_api_version(ApiVersion::new(0, 33));
    let info = VideoInfo::new(VideoFormat::NV12, 64, 64).unwrap();
    match Surface::new_full(&harness.display, &info, SurfaceAllocFlags::empty()) {
        Err(Error::CapabilityUnavailable {
            required,
            available,
        }) => {
            assert_eq!(required, ApiVersion::new(0, 34));
            assert_eq!(available, ApiVersion::new(0, 33));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(harness.calls().is_empty());

    // The basic strategy needs no capability.
    Surface::new(&harness.display, ChromaType::Yuv420, 64, 64).unwrap();

    let harness = Harness::with_api_version(ApiVersion::new(0, 35));
    Surface::new_full(&harness.display, &info, SurfaceAllocFlags::empty()).unwrap();
    harness.clear_calls();
    let proxy = BufferProxy::new(BufferMemoryType::DmaBuf, 7, info.size());
    match Surface::new_from_buffer_proxy(&harness.display, &proxy, &info) {
        Err(Error::CapabilityUnavailable { required, .. }) => {
            assert_eq!(required, ApiVersion::new(0, 36))
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(harness.calls().is_empty());
}

#[test]
fn test_huge_dimensions_fail_cleanly() {
    let harness = Harness::new();
    match Surface::new(&harness.display, ChromaType::Yuv420, u32::MAX - 1, 2) {
        Err(Error::DriverCallFailed {
            call: "vaCreateSurfaces()",
            status: DriverStatus::ResolutionNotSupported,
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(harness.software().surface_count(), 0);

    // Offsets past 4 GiB can't be described to the driver.
    harness.clear_calls();
    match Surface::new_with_format(&harness.display, VideoFormat::NV12, 70000, 70000) {
        Err(Error::PreconditionMismatch) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(harness.count("create_surface"), 0);

    assert!(Surface::new(&harness.display, ChromaType::Yuv420, 64, 64).is_ok());
}

#[test]
fn test_buffer_proxy_surface() {
    let harness = Harness::new();
    let info = VideoInfo::new(VideoFormat::NV12, 64, 48).unwrap();

    // Surfaces left in the driver when the proxy was released.
    let observed = Arc::new(Mutex::new(None));
    let proxy = {
        let software = harness.software.clone();
        let observed = observed.clone();
        BufferProxy::with_destroy_notify(BufferMemoryType::DmaBuf, 42, info.size(), move || {
            *observed.lock().unwrap() = Some(software.lock().unwrap().surface_count());
        })
    };

    let surface = Surface::new_from_buffer_proxy(&harness.display, &proxy, &info).unwrap();
    assert_eq!(surface.cached_format(), Some(VideoFormat::NV12));
    assert!(surface.buffer_proxy().unwrap().is(&proxy));

    let attribs = harness.software().surface_attribs(surface.id()).unwrap().to_vec();
    assert_eq!(attribs.len(), 2);
    match attribs[0] {
        SurfaceAttrib::ExternalBufferDescriptor(ref extbuf) => {
            assert_eq!(extbuf.buffers, vec![42]);
            assert_eq!(extbuf.data_size as usize, info.size());
            assert_eq!(extbuf.num_planes, 2);
            assert_eq!(extbuf.pitches, [64, 64, 0, 0]);
            assert_eq!(extbuf.offsets, [0, 64 * 48, 0, 0]);
            assert_eq!(extbuf.flags, ExternalBufferFlags::empty());
        }
        ref other => panic!("unexpected attribute: {:?}", other),
    }
    assert_eq!(attribs[1], SurfaceAttrib::MemoryType(MemoryType::DrmPrime));

    drop(proxy);
    assert_eq!(*observed.lock().unwrap(), None);

    drop(surface);
    assert_eq!(*observed.lock().unwrap(), Some(0));
}

#[test]
fn test_buffer_proxy_released_on_failure() {
    let harness = Harness::new();
    let info = VideoInfo::new(VideoFormat::NV12, 64, 48).unwrap();

    let released = Arc::new(AtomicBool::new(false));
    let proxy = {
        let released = released.clone();
        BufferProxy::with_destroy_notify(BufferMemoryType::GemBuffer, 3, 16, move || {
            released.store(true, Ordering::SeqCst)
        })
    };

    // Too small for the frame.
    match Surface::new_from_buffer_proxy(&harness.display, &proxy, &info) {
        Err(Error::DriverCallFailed {
            call: "vaCreateSurfaces()",
            status: DriverStatus::InvalidParameter,
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(harness.count("destroy_surface"), 0);
    assert!(!released.load(Ordering::SeqCst));
    drop(proxy);
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn test_lazy_format() {
    let harness = Harness::new();
    let surface = Surface::new(&harness.display, ChromaType::Yuv420, 32, 32).unwrap();
    assert_eq!(surface.cached_format(), None);
    assert_eq!(surface.format(), VideoFormat::NV12);
    assert_eq!(surface.cached_format(), Some(VideoFormat::NV12));
    assert_eq!(harness.count("derive_image"), 1);
    assert_eq!(harness.count("destroy_image"), 1);
    assert_eq!(harness.software().image_count(), 0);

    assert_eq!(surface.format(), VideoFormat::NV12);
    assert_eq!(harness.count("derive_image"), 1);
}

#[test]
fn test_lazy_format_falls_back_to_encoded() {
    let harness = Harness::new();
    let surface = Surface::new(&harness.display, ChromaType::Yuv411, 32, 32).unwrap();
    assert_eq!(surface.format(), VideoFormat::Encoded);
    assert_eq!(surface.cached_format(), Some(VideoFormat::Encoded));
    assert_eq!(surface.format(), VideoFormat::Encoded);
    assert_eq!(harness.count("derive_image"), 1);
}

#[test]
fn test_derive_image() {
    let harness = Harness::new();
    let surface = Surface::new_with_format(&harness.display, VideoFormat::BGRA, 8, 4).unwrap();
    let image = surface.derive_image().unwrap();
    assert!(image.id().is_valid());
    assert_eq!(image.format(), Some(VideoFormat::BGRA));
    assert_eq!(image.size(), surface.size());
    assert_eq!(image.pitches(), &[32]);
    assert_eq!(image.data_size(), 8 * 4 * 4);

    // The derived image maps the surface memory.
    let pixels = vec![0x5a; image.data_size()];
    image.write_pixels(&pixels).unwrap();
    assert_eq!(harness.software().surface_pixels(surface.id()), Some(&pixels[..]));

    drop(surface);
    assert_eq!(image.read_pixels().unwrap(), pixels);
    drop(image);
    assert_eq!(harness.software().image_count(), 0);
}

#[test]
fn test_derive_image_failure() {
    let harness = Harness::new();
    let surface = Surface::new(&harness.display, ChromaType::Yuv420, 8, 8).unwrap();
    harness.fail("derive_image", DriverStatus::OperationFailed);
    match surface.derive_image() {
        Err(Error::DriverCallFailed {
            call: "vaDeriveImage()",
            status: DriverStatus::OperationFailed,
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(surface.format(), VideoFormat::Encoded);
}

#[test]
fn test_put_then_get_image() {
    let harness = Harness::new();
    let surface = Surface::new_with_format(&harness.display, VideoFormat::NV12, 16, 8).unwrap();

    let source = Image::new(&harness.display, VideoFormat::NV12, 16, 8).unwrap();
    let pattern: Vec<u8> = (0..source.data_size()).map(|index| index as u8).collect();
    source.write_pixels(&pattern).unwrap();
    surface.put_image(&source).unwrap();

    let destination = Image::new(&harness.display, VideoFormat::NV12, 16, 8).unwrap();
    surface.get_image(&destination).unwrap();
    assert_eq!(destination.read_pixels().unwrap(), pattern);
    assert_eq!(harness.count("put_image"), 1);
    assert_eq!(harness.count("get_image"), 1);
}

#[test]
fn test_transfer_size_mismatch_makes_no_driver_call() {
    let harness = Harness::new();
    let surface = Surface::new_with_format(&harness.display, VideoFormat::NV12, 16, 16).unwrap();
    let image = Image::new(&harness.display, VideoFormat::NV12, 16, 8).unwrap();
    assert_eq!(surface.get_image(&image), Err(Error::PreconditionMismatch));
    assert_eq!(surface.put_image(&image), Err(Error::PreconditionMismatch));
    assert_eq!(harness.count("get_image"), 0);
    assert_eq!(harness.count("put_image"), 0);

    // Images from another display are rejected too.
    let other = Harness::new();
    let foreign = Image::new(&other.display, VideoFormat::NV12, 16, 16).unwrap();
    assert_eq!(surface.get_image(&foreign), Err(Error::PreconditionMismatch));
    assert_eq!(other.count("get_image") + harness.count("get_image"), 0);
}

#[test]
fn test_transfer_driver_failure() {
    let harness = Harness::new();
    let surface = Surface::new_with_format(&harness.display, VideoFormat::NV12, 16, 16).unwrap();
    let image = Image::new(&harness.display, VideoFormat::I420, 16, 16).unwrap();
    match surface.put_image(&image) {
        Err(Error::DriverCallFailed {
            call: "vaPutImage()",
            status: DriverStatus::InvalidImageFormat,
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_associate_defaults_to_full_rectangles() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 32).unwrap();
    let subpicture = harness.bgra_subpicture(8, 4, SubpictureFlags::empty());

    surface.associate_subpicture(&subpicture, None, None).unwrap();
    assert_eq!(surface.subpictures().len(), 1);
    assert!(surface.subpictures()[0].is(&subpicture));

    let associations = harness.software().associations(subpicture.id());
    assert_eq!(associations.len(), 1);
    let (bound_surface, association) = associations[0];
    assert_eq!(bound_surface, surface.id());
    assert_eq!(association.src, rect(0, 0, 8, 4));
    assert_eq!(association.dst, rect(0, 0, 64, 32));
    assert_eq!(association.flags, DriverSubpictureFlags::empty());
}

#[test]
fn test_associate_passes_blend_flags() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 32).unwrap();
    let keyed = harness.bgra_subpicture(8, 4, SubpictureFlags::CHROMA_KEYING);
    let blended = harness.bgra_subpicture(
        8,
        4,
        SubpictureFlags::GLOBAL_ALPHA | SubpictureFlags::PREMULTIPLIED_ALPHA,
    );

    surface.associate_subpicture(&keyed, None, None).unwrap();
    surface.associate_subpicture(&blended, None, None).unwrap();

    let flags = |subpicture: &Subpicture| {
        harness.software().associations(subpicture.id())[0].1.flags
    };
    assert_eq!(flags(&keyed), DriverSubpictureFlags::CHROMA_KEYING);
    assert_eq!(flags(&blended), DriverSubpictureFlags::GLOBAL_ALPHA);
}

#[test]
fn test_reassociate_replaces_binding() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 32).unwrap();
    let subpicture = harness.bgra_subpicture(8, 4, SubpictureFlags::GLOBAL_ALPHA);

    surface.associate_subpicture(&subpicture, None, None).unwrap();
    surface
        .associate_subpicture(&subpicture, Some(rect(0, 0, 4, 2)), Some(rect(10, 10, 4, 2)))
        .unwrap();

    assert_eq!(surface.subpictures().len(), 1);
    assert_eq!(harness.count("associate_subpicture"), 2);
    assert_eq!(harness.count("deassociate_subpicture"), 1);

    let associations = harness.software().associations(subpicture.id());
    assert_eq!(associations.len(), 1);
    let (_, association) = associations[0];
    assert_eq!(association.src, rect(0, 0, 4, 2));
    assert_eq!(association.dst, rect(10, 10, 4, 2));
    assert_eq!(association.flags, DriverSubpictureFlags::GLOBAL_ALPHA);
}

#[test]
fn test_reassociate_fails_when_removal_fails() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 32).unwrap();
    let subpicture = harness.bgra_subpicture(8, 4, SubpictureFlags::empty());
    surface.associate_subpicture(&subpicture, None, None).unwrap();

    harness.fail("deassociate_subpicture", DriverStatus::SurfaceBusy);
    match surface.associate_subpicture(&subpicture, None, Some(rect(1, 1, 8, 4))) {
        Err(Error::DriverCallFailed {
            call: "vaDeassociateSubpicture()",
            status: DriverStatus::SurfaceBusy,
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(harness.count("associate_subpicture"), 1);
    assert!(surface.subpictures().is_empty());
}

#[test]
fn test_associate_failure_keeps_subpicture_out() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 32).unwrap();
    let subpicture = harness.bgra_subpicture(8, 4, SubpictureFlags::empty());

    // The source region must lie within the subpicture image.
    match surface.associate_subpicture(&subpicture, Some(rect(4, 0, 8, 4)), None) {
        Err(Error::DriverCallFailed {
            call: "vaAssociateSubpicture()",
            status: DriverStatus::InvalidParameter,
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(surface.subpictures().is_empty());
}

#[test]
fn test_deassociate_is_idempotent() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 32).unwrap();
    let subpicture = harness.bgra_subpicture(8, 4, SubpictureFlags::empty());
    let other = harness.bgra_subpicture(8, 4, SubpictureFlags::empty());

    // No association set yet.
    surface.deassociate_subpicture(&subpicture).unwrap();

    surface.associate_subpicture(&subpicture, None, None).unwrap();
    surface.associate_subpicture(&other, None, None).unwrap();
    surface.deassociate_subpicture(&subpicture).unwrap();
    surface.deassociate_subpicture(&subpicture).unwrap();

    assert_eq!(harness.count("deassociate_subpicture"), 1);
    assert_eq!(surface.subpictures().len(), 1);
    assert!(surface.subpictures()[0].is(&other));
    assert!(harness.software().associations(subpicture.id()).is_empty());
    assert_eq!(harness.software().associations(other.id()).len(), 1);
}

#[test]
fn test_deassociate_failure_still_removes() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 32).unwrap();
    let subpicture = harness.bgra_subpicture(8, 4, SubpictureFlags::empty());
    surface.associate_subpicture(&subpicture, None, None).unwrap();

    harness.fail("deassociate_subpicture", DriverStatus::HardwareBusy);
    match surface.deassociate_subpicture(&subpicture) {
        Err(Error::DriverCallFailed { status, .. }) => {
            assert_eq!(status, DriverStatus::HardwareBusy)
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(surface.subpictures().is_empty());

    harness.heal("deassociate_subpicture");
    surface.deassociate_subpicture(&subpicture).unwrap();
    assert_eq!(harness.count("deassociate_subpicture"), 1);
}

#[test]
fn test_destroy_subpictures() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 32).unwrap();
    let subpictures: Vec<Subpicture> = (0..3)
        .map(|_| harness.bgra_subpicture(4, 4, SubpictureFlags::empty()))
        .collect();
    for subpicture in &subpictures {
        surface.associate_subpicture(subpicture, None, None).unwrap();
    }

    surface.destroy_subpictures();
    assert!(surface.subpictures().is_empty());
    assert_eq!(harness.count("deassociate_subpicture"), 3);
    for subpicture in &subpictures {
        assert!(harness.software().associations(subpicture.id()).is_empty());
    }

    // Nothing left to tear down.
    surface.destroy_subpictures();
    assert_eq!(harness.count("deassociate_subpicture"), 3);
}

#[test]
fn test_drop_tears_down_despite_failures() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 32).unwrap();
    for _ in 0..3 {
        let subpicture = harness.bgra_subpicture(4, 4, SubpictureFlags::empty());
        surface.associate_subpicture(&subpicture, None, None).unwrap();
    }
    surface.set_parent_context(Some(ContextID::new()));

    harness.fail("deassociate_subpicture", DriverStatus::OperationFailed);
    drop(surface);

    assert_eq!(harness.count("deassociate_subpicture"), 3);
    assert_eq!(harness.count("destroy_surface"), 1);
    assert_eq!(harness.count("destroy_subpicture"), 3);
    let software = harness.software();
    assert_eq!(software.surface_count(), 0);
    assert_eq!(software.subpicture_count(), 0);
    assert_eq!(software.image_count(), 0);
}

#[test]
fn test_drop_survives_destroy_failure() {
    let harness = Harness::new();
    let surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 32).unwrap();
    harness.fail("destroy_surface", DriverStatus::InvalidSurface);
    drop(surface);
    assert_eq!(harness.count("destroy_surface"), 1);
}

#[test]
fn test_subpicture_global_alpha() {
    let harness = Harness::new();
    let plain = harness.bgra_subpicture(4, 4, SubpictureFlags::empty());
    assert_eq!(plain.set_global_alpha(0.5), Err(Error::PreconditionMismatch));

    let blended = harness.bgra_subpicture(4, 4, SubpictureFlags::GLOBAL_ALPHA);
    assert_eq!(blended.global_alpha(), 1.0);
    blended.set_global_alpha(0.5).unwrap();
    blended.set_global_alpha(0.5).unwrap();
    assert_eq!(blended.global_alpha(), 0.5);
    assert_eq!(harness.count("set_subpicture_global_alpha"), 1);
    assert_eq!(harness.software().subpicture_global_alpha(blended.id()), Some(0.5));
}

#[test]
fn test_composition_creates_subpictures() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 48).unwrap();

    let composition: OverlayComposition = vec![
        overlay(4, 2, rect(0, 0, 16, 16)),
        overlay(4, 2, rect(10, 100, 200, 8))
            .with_global_alpha(0.25)
            .with_premultiplied_alpha(true),
    ]
    .into_iter()
    .collect();
    surface
        .set_subpictures_from_composition(Some(&composition), false)
        .unwrap();

    let subpictures = surface.subpictures().to_vec();
    assert_eq!(subpictures.len(), 2);
    assert_eq!(subpictures[0].flags(), SubpictureFlags::empty());
    assert_eq!(
        subpictures[1].flags(),
        SubpictureFlags::GLOBAL_ALPHA | SubpictureFlags::PREMULTIPLIED_ALPHA
    );
    assert_eq!(subpictures[1].global_alpha(), 0.25);

    let software = harness.software();
    let (_, first) = software.associations(subpictures[0].id())[0];
    assert_eq!(first.src, rect(0, 0, 4, 2));
    assert_eq!(first.dst, rect(0, 0, 16, 16));

    // Only the y origin and the width are clamped.
    let (_, second) = software.associations(subpictures[1].id())[0];
    assert_eq!(second.dst, rect(10, 48, 64, 8));
    assert_eq!(software.subpicture_global_alpha(subpictures[1].id()), Some(0.25));
}

#[test]
fn test_composition_replaces_previous_subpictures() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 48).unwrap();
    let existing = harness.bgra_subpicture(4, 4, SubpictureFlags::empty());
    surface.associate_subpicture(&existing, None, None).unwrap();

    let mut composition = OverlayComposition::new();
    composition.add_rectangle(overlay(2, 2, rect(4, 4, 2, 2)));
    surface
        .set_subpictures_from_composition(Some(&composition), false)
        .unwrap();
    assert_eq!(surface.subpictures().len(), 1);
    assert!(!surface.subpictures()[0].is(&existing));
    assert!(harness.software().associations(existing.id()).is_empty());
}

#[test]
fn test_no_composition_clears_subpictures() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 48).unwrap();
    let composition: OverlayComposition = (0..2).map(|_| overlay(2, 2, rect(0, 0, 8, 8))).collect();
    surface
        .set_subpictures_from_composition(Some(&composition), false)
        .unwrap();
    assert_eq!(surface.subpictures().len(), 2);

    surface.set_subpictures_from_composition(None, false).unwrap();
    assert!(surface.subpictures().is_empty());
    let software = harness.software();
    assert_eq!(software.subpicture_count(), 0);
    assert_eq!(software.image_count(), 0);
}

#[test]
fn test_composition_stops_at_first_failure() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 48).unwrap();
    let composition: OverlayComposition = (0..3).map(|_| overlay(2, 2, rect(0, 0, 8, 8))).collect();

    harness.fail_after("associate_subpicture", 1, DriverStatus::HardwareBusy);
    match surface.set_subpictures_from_composition(Some(&composition), false) {
        Err(Error::DriverCallFailed {
            call: "vaAssociateSubpicture()",
            status: DriverStatus::HardwareBusy,
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(harness.count("associate_subpicture"), 2);
    assert_eq!(harness.count("create_subpicture"), 2);
    assert_eq!(surface.subpictures().len(), 1);
}

#[test]
fn test_composition_propagates_to_parent() {
    let harness = Harness::new();
    let context = register_test_context(&harness.display);
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 48).unwrap();
    let existing = harness.bgra_subpicture(4, 4, SubpictureFlags::empty());
    surface.associate_subpicture(&existing, None, None).unwrap();
    surface.set_parent_context(Some(context.id));
    assert_eq!(surface.parent_context(), Some(context.id));

    let composition: OverlayComposition = (0..2).map(|_| overlay(2, 2, rect(0, 0, 8, 8))).collect();
    harness.clear_calls();
    surface
        .set_subpictures_from_composition(Some(&composition), true)
        .unwrap();
    surface.set_subpictures_from_composition(None, true).unwrap();

    assert_eq!(*context.applied.lock().unwrap(), vec![Some(2), None]);
    assert!(harness.calls().is_empty());
    assert_eq!(surface.subpictures().len(), 1);

    // Without propagation the surface handles the composition itself.
    surface
        .set_subpictures_from_composition(Some(&composition), false)
        .unwrap();
    assert_eq!(context.applied.lock().unwrap().len(), 2);
    assert_eq!(surface.subpictures().len(), 2);
}

#[test]
fn test_composition_with_dead_parent_applies_locally() {
    let harness = Harness::new();
    let context = register_test_context(&harness.display);
    let context_id = context.id;
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 48).unwrap();
    surface.set_parent_context(Some(context_id));
    drop(context);
    assert!(harness.display.context(context_id).is_none());

    let composition: OverlayComposition = (0..1).map(|_| overlay(2, 2, rect(0, 0, 8, 8))).collect();
    surface
        .set_subpictures_from_composition(Some(&composition), true)
        .unwrap();
    assert_eq!(surface.subpictures().len(), 1);
}

#[test]
fn test_parent_context() {
    let harness = Harness::new();
    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 16, 16).unwrap();
    assert_eq!(surface.parent_context(), None);
    let id = ContextID::new();
    surface.set_parent_context(Some(id));
    assert_eq!(surface.parent_context(), Some(id));
    surface.set_parent_context(None);
    assert_eq!(surface.parent_context(), None);
    assert_ne!(ContextID::new(), id);
    assert_ne!(ContextID::default(), id);
}

#[test]
fn test_sync_and_status() {
    let harness = Harness::new();
    let surface = Surface::new(&harness.display, ChromaType::Yuv420, 16, 16).unwrap();
    assert_eq!(surface.query_status().unwrap(), SurfaceStatus::IDLE);

    let statuses = [
        (
            DriverSurfaceStatus::RENDERING | DriverSurfaceStatus::SKIPPED,
            SurfaceStatus::RENDERING | SurfaceStatus::SKIPPED,
        ),
        (DriverSurfaceStatus::DISPLAYING, SurfaceStatus::DISPLAYING),
        (
            DriverSurfaceStatus::READY | DriverSurfaceStatus::RENDERING,
            SurfaceStatus::empty(),
        ),
        (DriverSurfaceStatus::SKIPPED, SurfaceStatus::SKIPPED),
    ];
    for &(driver_status, status) in &statuses {
        harness
            .software()
            .set_surface_status(surface.id(), driver_status)
            .unwrap();
        assert_eq!(surface.query_status().unwrap(), status);
    }

    surface.sync().unwrap();
    assert_eq!(surface.query_status().unwrap(), SurfaceStatus::IDLE);

    harness.fail("sync_surface", DriverStatus::TimedOut);
    match surface.sync() {
        Err(Error::DriverCallFailed {
            call: "vaSyncSurface()",
            status: DriverStatus::TimedOut,
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_default_layouts() {
    let info = VideoInfo::new(VideoFormat::NV12, 320, 240).unwrap();
    assert_eq!(info.n_planes(), 2);
    assert_eq!((info.plane_stride(0), info.plane_stride(1)), (320, 320));
    assert_eq!((info.plane_offset(0), info.plane_offset(1)), (0, 76800));
    assert_eq!(info.size(), 115200);

    let info = VideoInfo::new(VideoFormat::I420, 13, 7).unwrap();
    assert_eq!(info.n_planes(), 3);
    assert_eq!(
        (0..3).map(|plane| info.plane_stride(plane)).collect::<Vec<_>>(),
        vec![16, 8, 8]
    );
    assert_eq!(
        (0..3).map(|plane| info.plane_offset(plane)).collect::<Vec<_>>(),
        vec![0, 112, 144]
    );
    assert_eq!(info.size(), 176);

    assert_eq!(VideoInfo::new(VideoFormat::Encoded, 16, 16).unwrap().n_planes(), 0);
    assert!(VideoInfo::with_planes(VideoFormat::NV12, 16, 16, &[16], &[0, 256], 384).is_none());
}

#[test]
fn test_layout_overflow() {
    assert_eq!(VideoInfo::new(VideoFormat::RGBA, 0x4000_0000, 1), None);
    assert_eq!(VideoInfo::new(VideoFormat::I420, u32::MAX, 1), None);
    assert_eq!(VideoInfo::new(VideoFormat::NV12, u32::MAX - 1, 2), None);
    assert_eq!(VideoInfo::new(VideoFormat::NV12, 70000, 70000), None);
    assert_eq!(VideoInfo::new(VideoFormat::YUY2, u32::MAX, 1), None);

    let info = VideoInfo::new(VideoFormat::NV12, 0x8000, 0x8000).unwrap();
    assert_eq!(info.plane_offset(1), 0x4000_0000);
    assert_eq!(info.size(), 0x6000_0000);
}

#[test]
fn test_format_mapping() {
    assert_eq!(ChromaType::Yuv410.to_rt_format(), None);
    assert_eq!(VideoFormat::P010_10LE.to_fourcc(), Some(Fourcc::P010));
    assert_eq!(VideoFormat::Encoded.to_fourcc(), None);
    assert_eq!(VideoFormat::from_fourcc(Fourcc::Y800), Some(VideoFormat::GRAY8));
    assert_eq!(VideoFormat::from_fourcc(Fourcc::from_chars(b"XXXX")), None);
    assert_eq!(VideoFormat::RGB.chroma_type(), Some(ChromaType::Rgb32));
    assert_eq!(VideoFormat::Encoded.chroma_type(), None);
    assert_eq!(Fourcc::NV12.to_string(), "NV12");
}

#[test]
fn test_overlay_rectangle_validation() {
    match OverlayRectangle::new(vec![0; 15], 2, 2, rect(0, 0, 2, 2)) {
        Err(Error::PreconditionMismatch) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    let rectangle = overlay(2, 2, rect(1, 2, 3, 4));
    assert_eq!(rectangle.global_alpha(), 1.0);
    assert!(!rectangle.is_premultiplied());
    assert_eq!(rectangle.render_rectangle(), rect(1, 2, 3, 4));
}

#[test]
fn test_empty_overlay_rectangle_is_rejected() {
    let harness = Harness::new();
    let empty = OverlayRectangle::new(vec![], 0, 4, rect(0, 0, 8, 8)).unwrap();
    match Subpicture::from_overlay_rectangle(&harness.display, &empty) {
        Err(Error::PreconditionMismatch) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(harness.count("create_image"), 0);

    let mut surface = Surface::new(&harness.display, ChromaType::Yuv420, 64, 64).unwrap();
    let mut composition = OverlayComposition::new();
    composition.add_rectangle(empty);
    assert!(surface.set_subpictures_from_composition(Some(&composition), false).is_err());
    assert!(surface.subpictures().is_empty());
}
