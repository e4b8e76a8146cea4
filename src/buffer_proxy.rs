// vasurf/src/buffer_proxy.rs
//
//! Externally allocated memory that can back a surface.

use crate::driver::MemoryType;

use log::debug;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// The kind of native handle a `BufferProxy` wraps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferMemoryType {
    /// A DRM GEM buffer name, as returned by flink.
    GemBuffer,
    /// A dma-buf file descriptor.
    DmaBuf,
    /// A V4L2 buffer.
    V4l2,
    /// A user-space pointer.
    UserPtr,
}

impl BufferMemoryType {
    pub(crate) fn to_memory_type(self) -> MemoryType {
        match self {
            BufferMemoryType::GemBuffer => MemoryType::KernelDrm,
            BufferMemoryType::DmaBuf => MemoryType::DrmPrime,
            BufferMemoryType::V4l2 => MemoryType::V4l2,
            BufferMemoryType::UserPtr => MemoryType::UserPtr,
        }
    }
}

/// A reference-counted wrapper around a buffer allocated outside this crate.
///
/// The proxy does not own the memory; it only names it. An optional destroy notification runs
/// when the last handle is dropped, which is the owner's signal that no surface uses the buffer
/// any more.
#[derive(Clone)]
pub struct BufferProxy(Arc<BufferProxyData>);

struct BufferProxyData {
    memory_type: BufferMemoryType,
    handle: usize,
    size: usize,
    destroy_notify: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Debug for BufferProxy {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "BufferProxy({:?}, {:#x}, {} bytes)",
            self.0.memory_type, self.0.handle, self.0.size
        )
    }
}

impl Drop for BufferProxyData {
    fn drop(&mut self) {
        debug!("release buffer proxy handle {:#x}", self.handle);
        if let Some(destroy_notify) = self.destroy_notify.take() {
            destroy_notify();
        }
    }
}

impl BufferProxy {
    /// Wraps a native buffer handle of `size` bytes.
    pub fn new(memory_type: BufferMemoryType, handle: usize, size: usize) -> BufferProxy {
        BufferProxy(Arc::new(BufferProxyData {
            memory_type,
            handle,
            size,
            destroy_notify: None,
        }))
    }

    /// Like `new()`, but runs `destroy_notify` once the last handle is dropped.
    pub fn with_destroy_notify<F>(
        memory_type: BufferMemoryType,
        handle: usize,
        size: usize,
        destroy_notify: F,
    ) -> BufferProxy
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        BufferProxy(Arc::new(BufferProxyData {
            memory_type,
            handle,
            size,
            destroy_notify: Some(Box::new(destroy_notify)),
        }))
    }

    #[inline]
    pub fn memory_type(&self) -> BufferMemoryType {
        self.0.memory_type
    }

    /// The native handle: a GEM name, a file descriptor, or an address, depending on the memory
    /// type.
    #[inline]
    pub fn handle(&self) -> usize {
        self.0.handle
    }

    /// The size of the buffer, in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.0.size
    }

    /// Returns true if both handles refer to the same proxy.
    #[inline]
    pub fn is(&self, other: &BufferProxy) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
