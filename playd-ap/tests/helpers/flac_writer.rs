//! Minimal FLAC encoder for test fixtures
//!
//! Writes 16-bit, 44.1 kHz streams using only verbatim subframes: a
//! STREAMINFO block followed by fixed-blocksize frames. No compression, but
//! a real decoder reads the result like any other FLAC file.

use std::io::Write;
use std::path::Path;

use super::bit_writer::BitWriter;

pub const FLAC_SAMPLE_RATE: u32 = 44_100;

/// Write interleaved `samples` as a FLAC file with `block_size` frames per
/// FLAC frame
pub fn write_flac(
    path: &Path,
    channels: u16,
    block_size: u16,
    samples: &[i16],
) -> std::io::Result<()> {
    assert!((1..=8).contains(&channels));
    assert!(block_size >= 16);
    let channels_usize = channels as usize;
    assert_eq!(samples.len() % channels_usize, 0);
    let total_frames = (samples.len() / channels_usize) as u64;

    let mut out = Vec::new();
    out.extend_from_slice(b"fLaC");

    // STREAMINFO, flagged as the last metadata block
    out.push(0x80);
    out.extend_from_slice(&[0, 0, 34]);
    let mut info = BitWriter::default();
    info.put(block_size as u64, 16);
    info.put(block_size as u64, 16);
    info.put(0, 24);
    info.put(0, 24);
    info.put(FLAC_SAMPLE_RATE as u64, 20);
    info.put(channels as u64 - 1, 3);
    info.put(15, 5);
    info.put(total_frames, 36);
    for _ in 0..16 {
        info.put(0, 8);
    }
    out.extend_from_slice(&info.finish());

    let block_samples = block_size as usize * channels_usize;
    for (number, block) in samples.chunks(block_samples).enumerate() {
        out.extend_from_slice(&frame(number as u64, channels_usize, block));
    }

    std::fs::File::create(path)?.write_all(&out)
}

fn frame(number: u64, channels: usize, block: &[i16]) -> Vec<u8> {
    let frames = block.len() / channels;

    let mut header = vec![0xFF, 0xF8];
    // Blocksize from a 16-bit field at the end of the header, 44.1 kHz
    header.push(0x79);
    // Independent channels, 16 bits per sample
    header.push(((channels as u8 - 1) << 4) | 0x08);
    header.extend_from_slice(&utf8_number(number));
    header.extend_from_slice(&((frames - 1) as u16).to_be_bytes());
    let crc = crc8(&header);
    header.push(crc);

    let mut body = header;
    for ch in 0..channels {
        // Verbatim subframe, no wasted bits
        body.push(0x02);
        for frame in block.chunks_exact(channels) {
            body.extend_from_slice(&frame[ch].to_be_bytes());
        }
    }

    let crc = crc16(&body);
    body.extend_from_slice(&crc.to_be_bytes());
    body
}

/// FLAC's UTF-8-style variable-length frame number
fn utf8_number(n: u64) -> Vec<u8> {
    if n < 0x80 {
        return vec![n as u8];
    }

    let mut len = 2;
    while len < 7 && n >= 1u64 << (5 * len + 1) {
        len += 1;
    }

    let mut bytes = vec![0u8; len];
    let mut value = n;
    for byte in bytes.iter_mut().skip(1).rev() {
        *byte = 0x80 | (value & 0x3F) as u8;
        value >>= 6;
    }
    let lead_mask = !(0xFFu8 >> len);
    bytes[0] = lead_mask | value as u8;
    bytes
}

fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x07 } else { crc << 1 };
        }
    }
    crc
}

fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x8005 } else { crc << 1 };
        }
    }
    crc
}
