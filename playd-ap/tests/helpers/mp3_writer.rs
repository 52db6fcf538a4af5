//! Minimal MPEG-1 Layer III writer for test fixtures
//!
//! Emits constant-bitrate mono frames (128 kbps, 44.1 kHz) with no bit
//! reservoir and no Xing header. Each granule codes a run of unit spectral
//! lines in the count1 region: enough for a real decoder to produce
//! non-silent PCM of a known length.

use std::io::Write;
use std::path::Path;

use super::bit_writer::BitWriter;

pub const MP3_SAMPLE_RATE: u32 = 44_100;

/// PCM frames per MPEG-1 Layer III frame
pub const MP3_FRAME_SAMPLES: u64 = 1152;

const FRAME_BYTES: usize = 417;
const UNIT_LINES: u64 = 32;
const GLOBAL_GAIN: u64 = 180;

/// Write `frames` MPEG frames to `path`
pub fn write_mp3(path: &Path, frames: usize) -> std::io::Result<()> {
    let mut out = Vec::with_capacity(frames * FRAME_BYTES);
    for number in 0..frames {
        out.extend_from_slice(&frame(number));
    }
    std::fs::File::create(path)?.write_all(&out)
}

fn frame(number: usize) -> Vec<u8> {
    // Sync, MPEG-1 Layer III without CRC; 128 kbps, 44.1 kHz; mono
    let mut out = vec![0xFF, 0xFB, 0x90, 0xC0];

    // Count1 table B codes a quad of ones as 0000, then a sign bit per line
    let quads = UNIT_LINES / 4;
    let granule_bits = quads * 8;

    let mut side = BitWriter::default();
    side.put(0, 9); // main_data_begin
    side.put(0, 5); // private bits
    side.put(0, 4); // scfsi
    for _ in 0..2 {
        side.put(granule_bits, 12); // part2_3_length
        side.put(0, 9); // big_values
        side.put(GLOBAL_GAIN, 8);
        side.put(0, 4); // scalefac_compress, no scale factor bits
        side.put(0, 1); // window switching
        side.put(0, 15); // table_select x3
        side.put(0, 4); // region0_count
        side.put(0, 3); // region1_count
        side.put(0, 1); // preflag
        side.put(0, 1); // scalefac_scale
        side.put(1, 1); // count1table_select
    }
    out.extend_from_slice(&side.finish());

    // Flip the sign every other frame so the signal is not one repeated frame
    let signs = if number % 2 == 0 { 0b0000 } else { 0b1111 };
    let mut main = BitWriter::default();
    for _ in 0..2 * quads {
        main.put(0b0000, 4);
        main.put(signs, 4);
    }
    out.extend_from_slice(&main.finish());

    out.resize(FRAME_BYTES, 0);
    out
}
