//! WebP container assembler.
//!
//! Lays the frames queued by an [`AnimationAccumulator`] out as one
//! extended-format RIFF/WEBP file:
//!
//! ```text
//! RIFF <size> WEBP
//!   VP8X  flags, canvas size
//!   ANIM  background color, loop count
//!   ANMF  frame header, [ALPH], VP8      (one per frame)
//! ```

use alloc::vec::Vec;

use super::anim::AnimationAccumulator;
use super::demux::WebPDemuxer;
use super::error::MuxError;
use crate::encoder::{LoopCount, VecWriter, chunk_size, write_chunk};

const VP8X_FLAG_ANIMATION: u8 = 1 << 1;
const VP8X_FLAG_ALPHA: u8 = 1 << 4;
const ANMF_FLAG_NO_BLEND: u8 = 1 << 1;

/// Size of the fixed fields at the start of an `ANMF` payload.
const ANMF_HEADER_SIZE: usize = 16;

/// One encoded frame with its display duration.
#[derive(Debug, Clone)]
pub(crate) struct MuxFrame {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) duration_ms: u32,
    /// `VP8 ` chunk payload.
    pub(crate) bitstream: Vec<u8>,
    /// `ALPH` chunk payload, absent for opaque frames.
    pub(crate) alpha_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
struct AnimationParams {
    background_color: [u8; 4],
    loop_count: LoopCount,
}

/// Frames and animation parameters of one container.
#[derive(Debug)]
pub(crate) struct WebPMux {
    canvas_width: u32,
    canvas_height: u32,
    animation: AnimationParams,
    frames: Vec<MuxFrame>,
}

impl WebPMux {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            canvas_width: width,
            canvas_height: height,
            animation: AnimationParams {
                background_color: [0; 4],
                loop_count: LoopCount::Forever,
            },
            frames: Vec::new(),
        }
    }

    /// `background_color` is in BGRA byte order.
    pub(crate) fn set_animation(&mut self, background_color: [u8; 4], loop_count: LoopCount) {
        self.animation = AnimationParams {
            background_color,
            loop_count,
        };
    }

    /// Queues a full-canvas frame.
    pub(crate) fn push_frame(&mut self, frame: MuxFrame) -> Result<(), MuxError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(MuxError::InvalidDimensions {
                width: frame.width,
                height: frame.height,
            });
        }
        if frame.width != self.canvas_width || frame.height != self.canvas_height {
            return Err(MuxError::FrameDimensionMismatch {
                width: frame.width,
                height: frame.height,
                canvas_width: self.canvas_width,
                canvas_height: self.canvas_height,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn frames(&self) -> &[MuxFrame] {
        &self.frames
    }

    fn assemble_animated(&self) -> Result<Vec<u8>, MuxError> {
        if self.frames.is_empty() {
            return Err(MuxError::NoFrames);
        }

        // "WEBP" + VP8X + ANIM
        let mut total = 4 + chunk_size(10) as usize + chunk_size(6) as usize;
        for frame in &self.frames {
            total += chunk_size(anmf_payload_size(frame)) as usize;
        }
        let total = u32::try_from(total)
            .map_err(|_| MuxError::InvalidFormat("container larger than 4 GiB".into()))?;

        let mut out = Vec::with_capacity(total as usize + 8);
        out.write_all(b"RIFF");
        out.write_u32_le(total);
        out.write_all(b"WEBP");

        let mut flags = VP8X_FLAG_ANIMATION;
        if self.frames.iter().any(|f| f.alpha_data.is_some()) {
            flags |= VP8X_FLAG_ALPHA;
        }
        let mut vp8x = Vec::with_capacity(10);
        vp8x.push(flags);
        vp8x.write_all(&[0; 3]);
        vp8x.write_u24_le(self.canvas_width - 1);
        vp8x.write_u24_le(self.canvas_height - 1);
        write_chunk(&mut out, b"VP8X", &vp8x);

        let mut anim = Vec::with_capacity(6);
        anim.write_all(&self.animation.background_color);
        anim.write_u16_le(self.animation.loop_count.to_chunk_value());
        write_chunk(&mut out, b"ANIM", &anim);

        for frame in &self.frames {
            write_anmf(&mut out, frame);
        }

        debug_assert_eq!(out.len(), total as usize + 8);
        Ok(out)
    }
}

fn anmf_payload_size(frame: &MuxFrame) -> usize {
    let mut size = ANMF_HEADER_SIZE;
    if let Some(alpha) = &frame.alpha_data {
        size += chunk_size(alpha.len()) as usize;
    }
    size + chunk_size(frame.bitstream.len()) as usize
}

fn write_anmf(out: &mut Vec<u8>, frame: &MuxFrame) {
    out.write_all(b"ANMF");
    out.write_u32_le(anmf_payload_size(frame) as u32);

    // full-canvas frame at the origin
    out.write_u24_le(0);
    out.write_u24_le(0);
    out.write_u24_le(frame.width - 1);
    out.write_u24_le(frame.height - 1);
    out.write_u24_le(frame.duration_ms);
    // dispose none
    out.push(ANMF_FLAG_NO_BLEND);

    if let Some(alpha) = &frame.alpha_data {
        write_chunk(out, b"ALPH", alpha);
    }
    write_chunk(out, b"VP8 ", &frame.bitstream);
}

/// A finished animated WebP file.
#[derive(Clone, PartialEq, Eq)]
pub struct AssembledContainer {
    bytes: Vec<u8>,
    frame_count: u32,
    total_duration_ms: u64,
}

impl AssembledContainer {
    /// The file contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for an assembled container.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of `ANMF` frames.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Sum of the frame durations.
    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    /// Takes ownership of the file contents.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl core::fmt::Debug for AssembledContainer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AssembledContainer")
            .field("len", &self.bytes.len())
            .field("frame_count", &self.frame_count)
            .field("total_duration_ms", &self.total_duration_ms)
            .finish()
    }
}

impl AsRef<[u8]> for AssembledContainer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Writes every queued frame of `state` into a WebP container.
///
/// The accumulator is consumed. Fails with [`MuxError::NoFrames`] when no
/// frame was appended; nothing is produced in that case.
pub fn assemble(state: AnimationAccumulator) -> Result<AssembledContainer, MuxError> {
    let mux = state.into_mux()?;
    let bytes = mux.assemble_animated()?;

    // Read the header fields back from the finished file.
    let (frame_count, total_duration_ms) = {
        let demux = WebPDemuxer::new(&bytes)?;
        (demux.frame_count(), demux.total_duration_ms())
    };
    log::info!(
        "assembled {}x{} animation: {frame_count} frames, {total_duration_ms} ms, {} bytes",
        mux.canvas_width,
        mux.canvas_height,
        bytes.len()
    );
    Ok(AssembledContainer {
        bytes,
        frame_count,
        total_duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn frame(duration_ms: u32, bitstream_len: usize, alpha: Option<usize>) -> MuxFrame {
        MuxFrame {
            width: 4,
            height: 2,
            duration_ms,
            bitstream: vec![0xAB; bitstream_len],
            alpha_data: alpha.map(|n| vec![1; n]),
        }
    }

    fn u32_at(bytes: &[u8], pos: usize) -> u32 {
        u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
    }

    #[test]
    fn test_chunk_layout() {
        let mut mux = WebPMux::new(4, 2);
        mux.set_animation([1, 2, 3, 4], LoopCount::Forever);
        mux.push_frame(frame(100, 10, None)).unwrap();
        let out = mux.assemble_animated().unwrap();

        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(u32_at(&out, 4) as usize, out.len() - 8);
        assert_eq!(&out[8..12], b"WEBP");

        assert_eq!(&out[12..16], b"VP8X");
        assert_eq!(u32_at(&out, 16), 10);
        assert_eq!(out[20], VP8X_FLAG_ANIMATION);
        assert_eq!(&out[24..30], &[3, 0, 0, 1, 0, 0]);

        assert_eq!(&out[30..34], b"ANIM");
        assert_eq!(&out[38..44], &[1, 2, 3, 4, 0, 0]);

        assert_eq!(&out[44..48], b"ANMF");
        assert_eq!(u32_at(&out, 48), 16 + 8 + 10);
        let header = &out[52..68];
        assert_eq!(&header[..6], &[0; 6]);
        assert_eq!(&header[6..12], &[3, 0, 0, 1, 0, 0]);
        assert_eq!(&header[12..15], &[100, 0, 0]);
        assert_eq!(header[15], ANMF_FLAG_NO_BLEND);
        assert_eq!(&out[68..72], b"VP8 ");
        assert_eq!(out.len(), 68 + 8 + 10);
    }

    #[test]
    fn test_alpha_chunk_precedes_bitstream_and_sets_flag() {
        let mut mux = WebPMux::new(4, 2);
        mux.push_frame(frame(40, 6, Some(3))).unwrap();
        let out = mux.assemble_animated().unwrap();

        assert_eq!(out[20] & VP8X_FLAG_ALPHA, VP8X_FLAG_ALPHA);
        // ALPH: 8 header + 3 payload + 1 pad
        assert_eq!(u32_at(&out, 48), 16 + 12 + 8 + 6);
        assert_eq!(&out[68..72], b"ALPH");
        assert_eq!(u32_at(&out, 72), 3);
        assert_eq!(out[79], 0);
        assert_eq!(&out[80..84], b"VP8 ");
        assert_eq!(out.len() % 2, 0);
    }

    #[test]
    fn test_push_frame_rejects_other_sizes() {
        let mut mux = WebPMux::new(8, 8);
        assert!(matches!(
            mux.push_frame(frame(10, 2, None)),
            Err(MuxError::FrameDimensionMismatch { canvas_width: 8, .. })
        ));
        assert!(mux.frames().is_empty());
    }

    #[test]
    fn test_empty_mux_fails() {
        let mux = WebPMux::new(4, 4);
        assert!(matches!(mux.assemble_animated(), Err(MuxError::NoFrames)));
    }
}
