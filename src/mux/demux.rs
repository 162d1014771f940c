//! Zero-copy WebP demuxer.
//!
//! Parses a WebP file at the chunk level, exposing frame metadata and raw
//! bitstream data without decoding pixels.
//!
//! # Example
//!
//! ```rust,no_run
//! use zensticker::mux::WebPDemuxer;
//!
//! let data: &[u8] = &[]; // your WebP data
//! let demuxer = WebPDemuxer::new(data)?;
//! println!("{}x{}, {} frame(s)", demuxer.canvas_width(), demuxer.canvas_height(), demuxer.frame_count());
//!
//! for frame in demuxer.frames() {
//!     println!("  frame {}: {}x{} duration={}ms",
//!         frame.frame_num, frame.width, frame.height, frame.duration_ms);
//! }
//! # Ok::<(), zensticker::mux::MuxError>(())
//! ```

use alloc::format;
use alloc::vec::Vec;

use super::error::MuxError;
use crate::encoder::LoopCount;
use crate::slice_reader::SliceReader;

const VP8_MAGIC: [u8; 3] = [0x9D, 0x01, 0x2A];
const VP8L_SIGNATURE: u8 = 0x2F;

/// How the frame area is disposed after rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeMethod {
    /// Do not dispose. The frame remains on the canvas.
    None,
    /// Fill the frame rectangle with the background color.
    Background,
}

/// How the frame is blended with the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMethod {
    /// Use alpha blending with the existing canvas content.
    AlphaBlend,
    /// Overwrite the canvas region with the frame data.
    Overwrite,
}

/// Metadata for a single frame extracted by the demuxer.
///
/// `bitstream` holds the raw VP8 or VP8L data without RIFF framing. For
/// lossy frames with separate alpha, `alpha_data` is the `ALPH` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemuxFrame<'a> {
    /// 1-based frame number.
    pub frame_num: u32,
    /// Horizontal offset of the frame on the canvas (always even).
    pub x_offset: u32,
    /// Vertical offset of the frame on the canvas (always even).
    pub y_offset: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame duration in milliseconds. Zero for still images.
    pub duration_ms: u32,
    /// How the frame area is disposed after rendering.
    pub dispose: DisposeMethod,
    /// How the frame is blended onto the canvas.
    pub blend: BlendMethod,
    /// Whether the frame carries alpha.
    pub has_alpha: bool,
    /// `true` for VP8, `false` for VP8L.
    pub is_lossy: bool,
    /// Raw VP8 or VP8L bitstream data for this frame.
    pub bitstream: &'a [u8],
    /// Raw `ALPH` chunk payload, if present.
    pub alpha_data: Option<&'a [u8]>,
}

/// Parsed view of a WebP file.
#[derive(Debug, Clone)]
pub struct WebPDemuxer<'a> {
    canvas_width: u32,
    canvas_height: u32,
    loop_count: LoopCount,
    background_color: [u8; 4],
    has_alpha: bool,
    is_animated: bool,
    frames: Vec<DemuxFrame<'a>>,
}

impl<'a> WebPDemuxer<'a> {
    /// Parse a WebP file from a byte slice.
    ///
    /// Every chunk header and frame header is validated up front; truncated
    /// or inconsistent data is an error, never a panic.
    pub fn new(data: &'a [u8]) -> Result<Self, MuxError> {
        let mut r = SliceReader::new(data);

        if &r.read_fourcc()? != b"RIFF" {
            return Err(MuxError::InvalidFormat("missing RIFF signature".into()));
        }
        let riff_size = r.read_u32_le()? as usize;
        if &r.read_fourcc()? != b"WEBP" {
            return Err(MuxError::InvalidFormat("missing WEBP signature".into()));
        }
        // Trailing bytes after the RIFF payload are ignored.
        let end = riff_size.saturating_add(8).min(data.len());
        let mut r = SliceReader::new(&data[..end]);
        r.skip(12)?;

        let fourcc = r.read_fourcc()?;
        let size = r.read_u32_le()? as usize;
        let payload = r.take_slice(size)?;

        match &fourcc {
            b"VP8 " => Self::still(parse_vp8_frame(payload)?),
            b"VP8L" => Self::still(parse_vp8l_frame(payload)?),
            b"VP8X" => {
                skip_padding(&mut r, size);
                Self::parse_extended(payload, r)
            }
            _ => Err(MuxError::InvalidFormat(format!(
                "unknown first chunk {}",
                fourcc.escape_ascii()
            ))),
        }
    }

    fn still(frame: DemuxFrame<'a>) -> Result<Self, MuxError> {
        Ok(Self {
            canvas_width: frame.width,
            canvas_height: frame.height,
            loop_count: LoopCount::Forever,
            background_color: [0; 4],
            has_alpha: frame.has_alpha,
            is_animated: false,
            frames: alloc::vec![frame],
        })
    }

    fn parse_extended(vp8x: &'a [u8], mut r: SliceReader<'a>) -> Result<Self, MuxError> {
        let mut header = SliceReader::new(vp8x);
        let flags = header.read_u8()?;
        header.skip(3)?;
        let canvas_width = header.read_u24_le()? + 1;
        let canvas_height = header.read_u24_le()? + 1;

        let mut demuxer = Self {
            canvas_width,
            canvas_height,
            loop_count: LoopCount::Forever,
            background_color: [0; 4],
            has_alpha: flags & 0b0001_0000 != 0,
            is_animated: flags & 0b0000_0010 != 0,
            frames: Vec::new(),
        };
        let mut still_alpha = None;

        while let Ok(fourcc) = r.read_fourcc() {
            let size = r.read_u32_le()? as usize;
            let payload = r.take_slice(size)?;
            skip_padding(&mut r, size);

            match &fourcc {
                b"ANIM" if demuxer.is_animated => {
                    let mut anim = SliceReader::new(payload);
                    demuxer.background_color = anim.read_fourcc()?;
                    demuxer.loop_count = LoopCount::from_chunk_value(anim.read_u16_le()?);
                }
                b"ANMF" if demuxer.is_animated => {
                    let num = demuxer.frames.len() as u32 + 1;
                    let frame = parse_anmf_frame(payload, num)?;
                    if frame.x_offset + frame.width > canvas_width
                        || frame.y_offset + frame.height > canvas_height
                    {
                        return Err(MuxError::InvalidFormat(format!(
                            "frame {num} extends past the canvas"
                        )));
                    }
                    demuxer.frames.push(frame);
                }
                b"ALPH" if !demuxer.is_animated => still_alpha = Some(payload),
                b"VP8 " if !demuxer.is_animated => {
                    let mut frame = parse_vp8_frame(payload)?;
                    frame.has_alpha = still_alpha.is_some();
                    frame.alpha_data = still_alpha;
                    demuxer.frames.push(frame);
                }
                b"VP8L" if !demuxer.is_animated => demuxer.frames.push(parse_vp8l_frame(payload)?),
                _ => {}
            }
        }

        if !demuxer.is_animated && demuxer.frames.is_empty() {
            return Err(MuxError::InvalidFormat("no image chunk".into()));
        }
        Ok(demuxer)
    }

    /// Canvas width in pixels.
    pub fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    /// Canvas height in pixels.
    pub fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    /// Number of frames. Still images have one.
    pub fn frame_count(&self) -> u32 {
        self.frames.len() as u32
    }

    /// Loop count for animated images.
    pub fn loop_count(&self) -> LoopCount {
        self.loop_count
    }

    /// Background color for animated images, BGRA byte order.
    pub fn background_color(&self) -> [u8; 4] {
        self.background_color
    }

    /// Whether the `VP8X` animation flag is set.
    pub fn is_animated(&self) -> bool {
        self.is_animated
    }

    /// Whether the image has alpha data.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Sum of all frame durations.
    pub fn total_duration_ms(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.duration_ms)).sum()
    }

    /// Get a specific frame by 1-based index.
    pub fn frame(&self, n: u32) -> Option<&DemuxFrame<'a>> {
        self.frames.get(n.checked_sub(1)? as usize)
    }

    /// All frames in display order.
    pub fn frames(&self) -> &[DemuxFrame<'a>] {
        &self.frames
    }
}

fn skip_padding(r: &mut SliceReader<'_>, size: usize) {
    if size % 2 == 1 {
        // a missing pad byte at the very end is tolerated
        let _ = r.skip(1);
    }
}

/// Reads the keyframe header of a VP8 bitstream.
fn parse_vp8_frame(bitstream: &[u8]) -> Result<DemuxFrame<'_>, MuxError> {
    let mut r = SliceReader::new(bitstream);
    let frame_tag = r.read_u24_le()?;
    if frame_tag & 1 != 0 {
        return Err(MuxError::InvalidFormat("VP8 frame is not a keyframe".into()));
    }
    if r.take_slice(3)? != VP8_MAGIC {
        return Err(MuxError::InvalidFormat("invalid VP8 magic".into()));
    }
    let width = u32::from(r.read_u16_le()? & 0x3FFF);
    let height = u32::from(r.read_u16_le()? & 0x3FFF);
    Ok(DemuxFrame {
        frame_num: 1,
        x_offset: 0,
        y_offset: 0,
        width,
        height,
        duration_ms: 0,
        dispose: DisposeMethod::None,
        blend: BlendMethod::Overwrite,
        has_alpha: false,
        is_lossy: true,
        bitstream,
        alpha_data: None,
    })
}

/// Reads the header of a VP8L bitstream.
fn parse_vp8l_frame(bitstream: &[u8]) -> Result<DemuxFrame<'_>, MuxError> {
    let mut r = SliceReader::new(bitstream);
    if r.read_u8()? != VP8L_SIGNATURE {
        return Err(MuxError::InvalidFormat("invalid VP8L signature".into()));
    }
    let header = r.read_u32_le()?;
    Ok(DemuxFrame {
        frame_num: 1,
        x_offset: 0,
        y_offset: 0,
        width: (header & 0x3FFF) + 1,
        height: ((header >> 14) & 0x3FFF) + 1,
        duration_ms: 0,
        dispose: DisposeMethod::None,
        blend: BlendMethod::Overwrite,
        has_alpha: (header >> 28) & 1 != 0,
        is_lossy: false,
        bitstream,
        alpha_data: None,
    })
}

/// Parses one `ANMF` payload:
///
/// ```text
/// x/2  y/2  width-1  height-1  duration   (u24 each)
/// flags                                   (bit 0 dispose, bit 1 no blend)
/// [ALPH] VP8  |  VP8L                     (sub-chunks)
/// ```
fn parse_anmf_frame(payload: &[u8], frame_num: u32) -> Result<DemuxFrame<'_>, MuxError> {
    let mut r = SliceReader::new(payload);
    let x_offset = r.read_u24_le()? * 2;
    let y_offset = r.read_u24_le()? * 2;
    let width = r.read_u24_le()? + 1;
    let height = r.read_u24_le()? + 1;
    let duration_ms = r.read_u24_le()?;
    let flags = r.read_u8()?;
    let dispose = if flags & 1 != 0 {
        DisposeMethod::Background
    } else {
        DisposeMethod::None
    };
    let blend = if flags & 2 != 0 {
        BlendMethod::Overwrite
    } else {
        BlendMethod::AlphaBlend
    };

    let mut alpha_data = None;
    loop {
        let fourcc = r.read_fourcc()?;
        let size = r.read_u32_le()? as usize;
        let data = r.take_slice(size)?;
        skip_padding(&mut r, size);

        let mut frame = match &fourcc {
            b"ALPH" if alpha_data.is_none() => {
                alpha_data = Some(data);
                continue;
            }
            b"VP8 " => parse_vp8_frame(data)?,
            b"VP8L" if alpha_data.is_none() => parse_vp8l_frame(data)?,
            _ => {
                return Err(MuxError::InvalidFormat(format!(
                    "unexpected chunk {} in frame {frame_num}",
                    fourcc.escape_ascii()
                )));
            }
        };
        if (frame.width, frame.height) != (width, height) {
            return Err(MuxError::InvalidFormat(format!(
                "frame {frame_num} header says {width}x{height}, bitstream {}x{}",
                frame.width, frame.height
            )));
        }
        frame.frame_num = frame_num;
        frame.x_offset = x_offset;
        frame.y_offset = y_offset;
        frame.duration_ms = duration_ms;
        frame.dispose = dispose;
        frame.blend = blend;
        if alpha_data.is_some() {
            frame.has_alpha = true;
            frame.alpha_data = alpha_data;
        }
        return Ok(frame);
    }
}
