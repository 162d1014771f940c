//! Borrowed pixel buffers and their import into encoder pictures.
//!
//! A [`PixelBuffer`] is any externally owned raster that has to be locked
//! before its bytes may be read. [`import_picture`] holds the lock only for
//! the duration of the copy, releasing it through [`PixelGuard`] on every
//! path.

use alloc::vec::Vec;
use core::cell::Cell;

use imgref::Img;
use thiserror::Error;

use crate::encoder::Picture;

/// Pixel layout of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 8 bits per channel, R G B A byte order.
    Rgba8888,
    /// 16 bit packed 5-6-5 color.
    Rgb565,
    /// 8 bit coverage only.
    Alpha8,
    /// 16 bits per channel floating point.
    RgbaF16,
}

/// Geometry and format reported by a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Distance between row starts in bytes.
    pub stride: u32,
    /// Pixel layout.
    pub format: PixelFormat,
}

/// Failure reported by a pixel provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BufferError {
    /// The buffer's pixels are no longer available.
    #[error("pixel buffer has been recycled")]
    Recycled,
    /// The provider refused to lock the pixels.
    #[error("pixel lock failed: {0}")]
    LockFailed(&'static str),
}

/// An externally owned raster that must be locked before reading.
pub trait PixelBuffer {
    /// Geometry and format of the buffer.
    fn info(&self) -> BufferInfo;

    /// Acquires read access to the raw bytes.
    ///
    /// Every successful call is paired with exactly one
    /// [`unlock_pixels`](Self::unlock_pixels). Prefer
    /// [`lock_pixels`](Self::lock_pixels), which does the pairing.
    fn acquire_pixels(&self) -> Result<&[u8], BufferError>;

    /// Releases access acquired by [`acquire_pixels`](Self::acquire_pixels).
    fn unlock_pixels(&self);

    /// Locks the pixels for the lifetime of the returned guard.
    fn lock_pixels(&self) -> Result<PixelGuard<'_, Self>, BufferError>
    where
        Self: Sized,
    {
        let pixels = self.acquire_pixels()?;
        Ok(PixelGuard {
            buffer: self,
            pixels,
        })
    }
}

/// Scoped read access to a buffer's bytes. Dropping it unlocks the buffer.
pub struct PixelGuard<'a, B: PixelBuffer> {
    buffer: &'a B,
    pixels: &'a [u8],
}

impl<B: PixelBuffer> PixelGuard<'_, B> {
    /// The locked bytes.
    pub fn pixels(&self) -> &[u8] {
        self.pixels
    }
}

impl<B: PixelBuffer> Drop for PixelGuard<'_, B> {
    fn drop(&mut self) {
        self.buffer.unlock_pixels();
    }
}

/// An in-memory pixel buffer.
///
/// Tracks outstanding locks so callers can check that every lock was
/// released.
#[derive(Debug)]
pub struct MemoryBuffer {
    data: Vec<u8>,
    info: BufferInfo,
    locks: Cell<u32>,
}

impl MemoryBuffer {
    /// Wraps raw bytes described by `info`. The bytes are not validated
    /// against the geometry; importing does that.
    pub fn new(data: Vec<u8>, info: BufferInfo) -> Self {
        Self {
            data,
            info,
            locks: Cell::new(0),
        }
    }

    /// A tightly packed RGBA8888 buffer.
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self::new(
            data,
            BufferInfo {
                width,
                height,
                stride: width * 4,
                format: PixelFormat::Rgba8888,
            },
        )
    }

    /// A width x height buffer filled with one RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba.repeat(width as usize * height as usize);
        Self::from_rgba(data, width, height)
    }

    /// Number of locks currently held.
    pub fn outstanding_locks(&self) -> u32 {
        self.locks.get()
    }
}

impl PixelBuffer for MemoryBuffer {
    fn info(&self) -> BufferInfo {
        self.info
    }

    fn acquire_pixels(&self) -> Result<&[u8], BufferError> {
        self.locks.set(self.locks.get() + 1);
        Ok(&self.data)
    }

    fn unlock_pixels(&self) {
        self.locks.set(self.locks.get().saturating_sub(1));
    }
}

/// Why a single frame could not be imported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImportError {
    /// The pixel provider failed to lock the buffer.
    #[error("could not lock pixels: {0}")]
    Lock(#[from] BufferError),

    /// Only RGBA8888 buffers can be imported.
    #[error("unsupported pixel format {0:?}")]
    UnsupportedFormat(PixelFormat),

    /// The buffer's stride, size or byte length is inconsistent, or it is
    /// smaller than the target canvas.
    #[error("invalid buffer geometry: {0}")]
    Geometry(&'static str),

    /// The picture could not be allocated.
    #[error("picture allocation failed")]
    Allocation,
}

/// Copies the top-left `width x height` region of `buffer` into a new
/// picture.
///
/// The buffer stays locked only while this function runs.
pub fn import_picture<B: PixelBuffer>(
    buffer: &B,
    width: u32,
    height: u32,
) -> Result<Picture, ImportError> {
    let guard = buffer.lock_pixels()?;
    let info = buffer.info();

    if info.format != PixelFormat::Rgba8888 {
        return Err(ImportError::UnsupportedFormat(info.format));
    }
    check_geometry(&info, guard.pixels().len(), width, height)?;

    let view = Img::new_stride(
        guard.pixels(),
        info.width as usize * 4,
        info.height as usize,
        info.stride as usize,
    );
    let picture = Picture::try_from_rgba_bytes(view, width as usize, height as usize)
        .map_err(|_| ImportError::Allocation)?;
    drop(guard);
    Ok(picture)
}

fn check_geometry(
    info: &BufferInfo,
    len: usize,
    width: u32,
    height: u32,
) -> Result<(), ImportError> {
    if info.width == 0 || info.height == 0 {
        return Err(ImportError::Geometry("empty buffer"));
    }
    if info.width < width || info.height < height {
        return Err(ImportError::Geometry("buffer smaller than canvas"));
    }
    let row_bytes = info.width as usize * 4;
    let stride = info.stride as usize;
    if stride % 4 != 0 || stride < row_bytes {
        return Err(ImportError::Geometry("bad stride"));
    }
    let needed = (info.height as usize - 1)
        .checked_mul(stride)
        .and_then(|n| n.checked_add(row_bytes))
        .ok_or(ImportError::Geometry("buffer too large"))?;
    if len < needed {
        return Err(ImportError::Geometry("pixel data shorter than stride x height"));
    }
    Ok(())
}

/// One input frame: a borrowed buffer shown for `duration_ms`.
#[derive(Debug)]
pub struct Frame<'a, B> {
    /// The pixels.
    pub buffer: &'a B,
    /// Display time in milliseconds, at least 1.
    pub duration_ms: u32,
}

impl<B> Clone for Frame<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Frame<'_, B> {}

impl<'a, B> Frame<'a, B> {
    /// Pairs a buffer with its duration.
    pub fn new(buffer: &'a B, duration_ms: u32) -> Self {
        Self {
            buffer,
            duration_ms,
        }
    }

    /// Builds frames from parallel slices. Returns `None` when the lengths
    /// differ.
    pub fn zip(buffers: &'a [B], durations: &[u32]) -> Option<Vec<Self>> {
        (buffers.len() == durations.len()).then(|| {
            buffers
                .iter()
                .zip(durations)
                .map(|(buffer, &duration_ms)| Self::new(buffer, duration_ms))
                .collect()
        })
    }
}
