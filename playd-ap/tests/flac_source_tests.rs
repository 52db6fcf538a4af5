//! FLAC source tests over generated fixtures
//!
//! The fixtures use verbatim subframes, so decoded PCM must equal the input
//! sample for sample.

mod helpers;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use helpers::{write_flac, FLAC_SAMPLE_RATE};
use playd_ap::sources::{
    EqualizerBands, FlacSource, Mp3Library, Source, SourceFactory, SourceOpener,
};
use serial_test::serial;
use tempfile::TempDir;

const BLOCK: u16 = 1024;
const BLOCKS: usize = 44;

/// Interleaved ramp: left counts up, right counts down
fn ramp(frames: usize, channels: u16) -> Vec<i16> {
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let value = (i % 30_000) as i16;
        samples.push(value);
        if channels == 2 {
            samples.push(-value);
        }
    }
    samples
}

fn fixture(dir: &TempDir, name: &str, channels: u16) -> (PathBuf, Vec<i16>) {
    let samples = ramp(BLOCK as usize * BLOCKS, channels);
    let path = dir.path().join(name);
    write_flac(&path, channels, BLOCK, &samples).unwrap();
    (path, samples)
}

/// Decode to the end in `chunk_bytes` pieces
fn drain(source: &mut dyn Source, chunk_bytes: usize) -> Vec<i16> {
    let mut buf = vec![0u8; chunk_bytes];
    let mut out = Vec::new();
    loop {
        let n = source.decode(&mut buf);
        if n == 0 {
            break;
        }
        out.extend(
            buf[..n]
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]])),
        );
    }
    out
}

fn open(path: &Path) -> FlacSource {
    FlacSource::open(path).unwrap()
}

#[test]
fn test_stream_parameters() {
    let dir = TempDir::new().unwrap();
    let (path, _) = fixture(&dir, "stereo.flac", 2);
    let source = open(&path);

    assert!(source.valid());
    assert_eq!(source.sample_rate(), FLAC_SAMPLE_RATE);
    assert_eq!(source.channels(), 2);
    assert_eq!(source.total_frames(), BLOCK as u64 * BLOCKS as u64);
    assert_eq!(source.frame_bytes(), 4);
    assert_eq!(source.tell(), 0);
    assert!(!source.done());
}

#[test]
fn test_decodes_every_sample() {
    let dir = TempDir::new().unwrap();
    let (path, samples) = fixture(&dir, "stereo.flac", 2);
    let mut source = open(&path);

    // A chunk size that never lines up with the FLAC block size
    let decoded = drain(&mut source, 3000 * 4 + 2);

    assert_eq!(decoded.len() * 2, samples.len() * 2);
    assert_eq!(decoded, samples);
    assert!(source.done());
    assert_eq!(source.tell(), source.total_frames());
}

#[test]
fn test_mono_stream() {
    let dir = TempDir::new().unwrap();
    let (path, samples) = fixture(&dir, "mono.flac", 1);
    let mut source = open(&path);

    assert_eq!(source.channels(), 1);
    assert_eq!(drain(&mut source, 4096), samples);
}

#[test]
fn test_seek_to_tell_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let (path, samples) = fixture(&dir, "stereo.flac", 2);

    let mut source = open(&path);
    let mut head = vec![0u8; 3000 * 4];
    assert_eq!(source.decode(&mut head), head.len());
    let here = source.tell();
    assert_eq!(here, 3000);

    source.seek(here);
    assert_eq!(source.tell(), here);
    let rest = drain(&mut source, 4096);

    assert_eq!(rest, samples[3000 * 2..]);
}

#[test]
fn test_seek_is_sample_accurate() {
    let dir = TempDir::new().unwrap();
    let (path, samples) = fixture(&dir, "stereo.flac", 2);
    let mut source = open(&path);

    source.seek(10_001);
    assert_eq!(source.tell(), 10_001);
    let rest = drain(&mut source, 4096);
    assert_eq!(rest, samples[10_001 * 2..]);

    // Backwards after reaching the end
    source.seek(5);
    assert!(!source.done());
    let rest = drain(&mut source, 4096);
    assert_eq!(rest, samples[5 * 2..]);
}

#[test]
fn test_seek_past_end_is_clamped() {
    let dir = TempDir::new().unwrap();
    let (path, _) = fixture(&dir, "stereo.flac", 2);
    let mut source = open(&path);

    source.seek(u64::MAX);
    assert_eq!(source.tell(), source.total_frames());
    assert!(source.done());

    let mut buf = [0u8; 64];
    assert_eq!(source.decode(&mut buf), 0);
}

#[test]
fn test_small_buffer_gets_whole_frames_only() {
    let dir = TempDir::new().unwrap();
    let (path, samples) = fixture(&dir, "stereo.flac", 2);
    let mut source = open(&path);

    // Room for one frame plus a stray byte
    let mut buf = [0u8; 5];
    assert_eq!(source.decode(&mut buf), 4);
    assert_eq!(i16::from_le_bytes([buf[0], buf[1]]), samples[0]);
    assert_eq!(i16::from_le_bytes([buf[2], buf[3]]), samples[1]);
    assert_eq!(source.tell(), 1);
}

#[test]
#[serial(mp3_library)]
fn test_factory_selects_by_extension() {
    let dir = TempDir::new().unwrap();
    let (flac, _) = fixture(&dir, "song.FLAC", 2);

    let garbage = dir.path().join("noise.mp3");
    std::fs::write(&garbage, vec![0x55u8; 4096]).unwrap();
    let text = dir.path().join("notes.txt");
    std::fs::write(&text, "not audio").unwrap();

    let library = Mp3Library::acquire(false, Arc::new(EqualizerBands::new())).unwrap();
    let factory = SourceFactory::new(Arc::clone(&library));

    let source = factory.make_source(&flac).expect("flac should open");
    assert_eq!(source.channels(), 2);

    assert!(factory.make_source(&garbage).is_none());
    assert!(factory.make_source(&text).is_none());
    assert!(factory.make_source(&dir.path().join("missing.flac")).is_none());

    library.release();
}
