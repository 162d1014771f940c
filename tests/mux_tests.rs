//! Tests for the accumulator, assembler and demuxer APIs.

use std::io::Cursor;

use image_webp::WebPDecoder;
use rgb::RGBA8;
use zensticker::mux::{
    AnimationAccumulator, BlendMethod, DisposeMethod, MuxError, WebPDemuxer, assemble,
};
use zensticker::{EncodingConfig, LoopCount, Picture};

/// Create a solid-color picture.
fn solid_picture(width: usize, height: usize, r: u8, g: u8, b: u8, a: u8) -> Picture {
    Picture::from_pixels(vec![RGBA8::new(r, g, b, a); width * height], width, height).unwrap()
}

fn u32_at(bytes: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap())
}

#[test]
fn assembled_layout_is_extended_animation() {
    let mut anim = AnimationAccumulator::new(30, 20, EncodingConfig::new()).unwrap();
    anim.append(&solid_picture(30, 20, 9, 9, 9, 255), 0).unwrap();
    anim.finalize(75).unwrap();
    let webp = assemble(anim).unwrap().into_bytes();

    assert_eq!(&webp[..4], b"RIFF");
    assert_eq!(u32_at(&webp, 4) as usize, webp.len() - 8);
    assert_eq!(&webp[8..16], b"WEBPVP8X");
    // animation flag only
    assert_eq!(webp[20], 0b0000_0010);
    assert_eq!(&webp[30..34], b"ANIM");
    // transparent background, loop forever
    assert_eq!(&webp[38..44], &[0, 0, 0, 0, 0, 0]);
    assert_eq!(&webp[44..48], b"ANMF");
    assert_eq!(webp.len() % 2, 0);
}

#[test]
fn demuxer_reads_back_frames() {
    let mut anim = AnimationAccumulator::new(16, 16, EncodingConfig::new()).unwrap();
    anim.append(&solid_picture(16, 16, 255, 0, 0, 255), 0).unwrap();
    anim.append(&solid_picture(16, 16, 0, 255, 0, 128), 50).unwrap();
    anim.append(&solid_picture(16, 16, 0, 0, 255, 255), 200).unwrap();
    anim.finalize(300).unwrap();
    let container = assemble(anim).unwrap();

    let demux = WebPDemuxer::new(container.as_bytes()).unwrap();
    assert!(demux.is_animated());
    assert!(demux.has_alpha());
    assert_eq!((demux.canvas_width(), demux.canvas_height()), (16, 16));
    assert_eq!(demux.loop_count(), LoopCount::Forever);
    assert_eq!(demux.frame_count(), container.frame_count());

    let durations: Vec<u32> = demux.frames().iter().map(|f| f.duration_ms).collect();
    assert_eq!(durations, [50, 150, 100]);
    for frame in demux.frames() {
        assert_eq!((frame.x_offset, frame.y_offset), (0, 0));
        assert_eq!((frame.width, frame.height), (16, 16));
        assert_eq!(frame.dispose, DisposeMethod::None);
        assert_eq!(frame.blend, BlendMethod::Overwrite);
        assert!(frame.is_lossy);
    }
    let alpha: Vec<bool> = demux.frames().iter().map(|f| f.alpha_data.is_some()).collect();
    assert_eq!(alpha, [false, true, false]);
}

#[test]
fn unfinalized_animation_still_decodes() {
    let mut anim = AnimationAccumulator::new(8, 8, EncodingConfig::new()).unwrap();
    for ts in [0, 100, 200, 300] {
        anim.append(&solid_picture(8, 8, 40, 80, 120, 255), ts).unwrap();
    }
    let container = assemble(anim).unwrap();
    assert_eq!(container.total_duration_ms(), 400);

    let mut decoder = WebPDecoder::new(Cursor::new(container.as_bytes())).unwrap();
    assert_eq!(decoder.num_frames(), 4);
    let mut buf = vec![0u8; decoder.output_buffer_size().unwrap()];
    for _ in 0..4 {
        assert_eq!(decoder.read_frame(&mut buf).unwrap(), 100);
    }
}

#[test]
fn single_frame_without_finalize_gets_fallback() {
    let mut anim = AnimationAccumulator::new(8, 8, EncodingConfig::new()).unwrap();
    anim.append(&solid_picture(8, 8, 1, 1, 1, 255), 500).unwrap();
    assert_eq!(assemble(anim).unwrap().total_duration_ms(), 100);
}

#[test]
fn assemble_without_frames_fails() {
    let anim = AnimationAccumulator::new(8, 8, EncodingConfig::new()).unwrap();
    assert!(matches!(assemble(anim), Err(MuxError::NoFrames)));
}

#[test]
fn failed_finalize_keeps_frames() {
    let mut anim = AnimationAccumulator::new(8, 8, EncodingConfig::new()).unwrap();
    anim.append(&solid_picture(8, 8, 1, 1, 1, 255), 100).unwrap();
    assert!(matches!(
        anim.finalize(100),
        Err(MuxError::TimestampOutOfOrder { .. })
    ));
    let container = assemble(anim).unwrap();
    assert_eq!(container.frame_count(), 1);
}

#[test]
fn background_color_is_written() {
    let config = EncodingConfig::new().with_background_color([1, 2, 3, 4]);
    let mut anim = AnimationAccumulator::new(8, 8, config).unwrap();
    anim.append(&solid_picture(8, 8, 1, 1, 1, 255), 0).unwrap();
    anim.finalize(10).unwrap();
    let container = assemble(anim).unwrap();
    let demux = WebPDemuxer::new(container.as_bytes()).unwrap();
    assert_eq!(demux.background_color(), [1, 2, 3, 4]);
}

#[test]
fn odd_canvas_sizes_decode() {
    for (width, height) in [(1, 1), (17, 3), (33, 65)] {
        let mut anim = AnimationAccumulator::new(width, height, EncodingConfig::new()).unwrap();
        let picture = solid_picture(width as usize, height as usize, 200, 10, 90, 255);
        anim.append(&picture, 0).unwrap();
        anim.finalize(20).unwrap();
        let container = assemble(anim).unwrap();

        let mut decoder = WebPDecoder::new(Cursor::new(container.as_bytes())).unwrap();
        assert_eq!(decoder.dimensions(), (width, height));
        let mut buf = vec![0u8; decoder.output_buffer_size().unwrap()];
        assert_eq!(decoder.read_frame(&mut buf).unwrap(), 20);
    }
}

#[test]
fn demuxer_rejects_garbage() {
    assert!(WebPDemuxer::new(b"").is_err());
    assert!(WebPDemuxer::new(b"RIFF\x10\0\0\0WEBPJUNK\x04\0\0\0abcd").is_err());
    assert!(WebPDemuxer::new(&[0xFF; 64]).is_err());
}
