//! Command protocol spoken between the UI process and the playback service
//!
//! Every exchange is one request frame followed by one response frame; the
//! client never pipelines.
//!
//! ```text
//! request:  [opcode: u8][payload_len: u32 BE][payload: JSON or empty]
//! response: [status: u8][payload_len: u32 BE][payload: JSON reply or empty]
//! ```
//!
//! Opcodes without arguments carry an empty payload. A payload larger than
//! the receiver's limit is read and discarded so the stream stays in sync.

use crate::error::{Error, Result};
use crate::types::{PlaybackState, RepeatMode, ShuffleMode, TrackId, TrackInfo};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Default TCP port the service listens on
pub const DEFAULT_PORT: u16 = 5731;

/// Default upper bound for a single frame payload (1 MiB)
pub const DEFAULT_MAX_PAYLOAD: usize = 1 << 20;

/// Number of equalizer bands carried by SetEqualizer / GetEqualizer
pub const EQUALIZER_BANDS: usize = 32;

const HEADER_LEN: usize = 5;

/// Request opcodes. The numeric values are the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Version = 0,
    GetStatus = 1,
    Play = 2,
    Pause = 3,
    Stop = 4,
    Next = 5,
    Previous = 6,
    Seek = 7,
    SetVolume = 8,
    SetMuted = 9,
    SetRepeatMode = 10,
    SetShuffleMode = 11,
    SetQueue = 12,
    SetQueueIndex = 13,
    InsertIntoQueue = 14,
    RemoveFromQueue = 15,
    MoveInQueue = 16,
    GetQueue = 17,
    AddToSubQueue = 18,
    RemoveFromSubQueue = 19,
    SkipSubQueue = 20,
    GetSubQueue = 21,
    SetEqualizer = 22,
    GetEqualizer = 23,
    SetPlayingFrom = 24,
    Reset = 25,
    Exit = 26,
}

impl Opcode {
    const ALL: [Opcode; 27] = [
        Opcode::Version,
        Opcode::GetStatus,
        Opcode::Play,
        Opcode::Pause,
        Opcode::Stop,
        Opcode::Next,
        Opcode::Previous,
        Opcode::Seek,
        Opcode::SetVolume,
        Opcode::SetMuted,
        Opcode::SetRepeatMode,
        Opcode::SetShuffleMode,
        Opcode::SetQueue,
        Opcode::SetQueueIndex,
        Opcode::InsertIntoQueue,
        Opcode::RemoveFromQueue,
        Opcode::MoveInQueue,
        Opcode::GetQueue,
        Opcode::AddToSubQueue,
        Opcode::RemoveFromSubQueue,
        Opcode::SkipSubQueue,
        Opcode::GetSubQueue,
        Opcode::SetEqualizer,
        Opcode::GetEqualizer,
        Opcode::SetPlayingFrom,
        Opcode::Reset,
        Opcode::Exit,
    ];
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Opcode::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| Error::Protocol(format!("unknown opcode {}", value)))
    }
}

/// Arguments of SetQueue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueArgs {
    pub tracks: Vec<TrackId>,
    pub start: usize,
}

/// Arguments of InsertIntoQueue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsertArgs {
    pub position: usize,
    pub track: TrackId,
}

/// Arguments of MoveInQueue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveArgs {
    pub from: usize,
    pub to: usize,
}

/// A decoded request
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Version,
    GetStatus,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Seek { seconds: f64 },
    SetVolume { level: f32 },
    SetMuted { muted: bool },
    SetRepeatMode(RepeatMode),
    SetShuffleMode(ShuffleMode),
    SetQueue(QueueArgs),
    SetQueueIndex { index: usize },
    InsertIntoQueue(InsertArgs),
    RemoveFromQueue { position: usize },
    MoveInQueue(MoveArgs),
    GetQueue,
    AddToSubQueue { track: TrackId },
    RemoveFromSubQueue { position: usize },
    SkipSubQueue { count: usize },
    GetSubQueue,
    SetEqualizer { bands: Vec<f32> },
    GetEqualizer,
    SetPlayingFrom { label: String },
    Reset,
    Exit,
}

impl Request {
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::Version => Opcode::Version,
            Request::GetStatus => Opcode::GetStatus,
            Request::Play => Opcode::Play,
            Request::Pause => Opcode::Pause,
            Request::Stop => Opcode::Stop,
            Request::Next => Opcode::Next,
            Request::Previous => Opcode::Previous,
            Request::Seek { .. } => Opcode::Seek,
            Request::SetVolume { .. } => Opcode::SetVolume,
            Request::SetMuted { .. } => Opcode::SetMuted,
            Request::SetRepeatMode(_) => Opcode::SetRepeatMode,
            Request::SetShuffleMode(_) => Opcode::SetShuffleMode,
            Request::SetQueue(_) => Opcode::SetQueue,
            Request::SetQueueIndex { .. } => Opcode::SetQueueIndex,
            Request::InsertIntoQueue(_) => Opcode::InsertIntoQueue,
            Request::RemoveFromQueue { .. } => Opcode::RemoveFromQueue,
            Request::MoveInQueue(_) => Opcode::MoveInQueue,
            Request::GetQueue => Opcode::GetQueue,
            Request::AddToSubQueue { .. } => Opcode::AddToSubQueue,
            Request::RemoveFromSubQueue { .. } => Opcode::RemoveFromSubQueue,
            Request::SkipSubQueue { .. } => Opcode::SkipSubQueue,
            Request::GetSubQueue => Opcode::GetSubQueue,
            Request::SetEqualizer { .. } => Opcode::SetEqualizer,
            Request::GetEqualizer => Opcode::GetEqualizer,
            Request::SetPlayingFrom { .. } => Opcode::SetPlayingFrom,
            Request::Reset => Opcode::Reset,
            Request::Exit => Opcode::Exit,
        }
    }

    /// Encode the arguments of this request (empty for argument-less opcodes)
    pub fn encode_payload(&self) -> Result<Vec<u8>> {
        let payload = match self {
            Request::Seek { seconds } => serde_json::to_vec(seconds)?,
            Request::SetVolume { level } => serde_json::to_vec(level)?,
            Request::SetMuted { muted } => serde_json::to_vec(muted)?,
            Request::SetRepeatMode(mode) => serde_json::to_vec(mode)?,
            Request::SetShuffleMode(mode) => serde_json::to_vec(mode)?,
            Request::SetQueue(args) => serde_json::to_vec(args)?,
            Request::SetQueueIndex { index } => serde_json::to_vec(index)?,
            Request::InsertIntoQueue(args) => serde_json::to_vec(args)?,
            Request::RemoveFromQueue { position } => serde_json::to_vec(position)?,
            Request::MoveInQueue(args) => serde_json::to_vec(args)?,
            Request::AddToSubQueue { track } => serde_json::to_vec(track)?,
            Request::RemoveFromSubQueue { position } => serde_json::to_vec(position)?,
            Request::SkipSubQueue { count } => serde_json::to_vec(count)?,
            Request::SetEqualizer { bands } => serde_json::to_vec(bands)?,
            Request::SetPlayingFrom { label } => serde_json::to_vec(label)?,
            _ => Vec::new(),
        };
        Ok(payload)
    }

    /// Decode a request from its opcode byte and payload.
    ///
    /// Unknown opcodes, missing or malformed payloads and an equalizer with
    /// the wrong band count are all reported as [`Error::Protocol`].
    pub fn decode(code: u8, payload: &[u8]) -> Result<Request> {
        let op = Opcode::try_from(code)?;
        let request = match op {
            Opcode::Version => Request::Version,
            Opcode::GetStatus => Request::GetStatus,
            Opcode::Play => Request::Play,
            Opcode::Pause => Request::Pause,
            Opcode::Stop => Request::Stop,
            Opcode::Next => Request::Next,
            Opcode::Previous => Request::Previous,
            Opcode::Seek => Request::Seek {
                seconds: parse_args(op, payload)?,
            },
            Opcode::SetVolume => Request::SetVolume {
                level: parse_args(op, payload)?,
            },
            Opcode::SetMuted => Request::SetMuted {
                muted: parse_args(op, payload)?,
            },
            Opcode::SetRepeatMode => Request::SetRepeatMode(parse_args(op, payload)?),
            Opcode::SetShuffleMode => Request::SetShuffleMode(parse_args(op, payload)?),
            Opcode::SetQueue => Request::SetQueue(parse_args(op, payload)?),
            Opcode::SetQueueIndex => Request::SetQueueIndex {
                index: parse_args(op, payload)?,
            },
            Opcode::InsertIntoQueue => Request::InsertIntoQueue(parse_args(op, payload)?),
            Opcode::RemoveFromQueue => Request::RemoveFromQueue {
                position: parse_args(op, payload)?,
            },
            Opcode::MoveInQueue => Request::MoveInQueue(parse_args(op, payload)?),
            Opcode::GetQueue => Request::GetQueue,
            Opcode::AddToSubQueue => Request::AddToSubQueue {
                track: parse_args(op, payload)?,
            },
            Opcode::RemoveFromSubQueue => Request::RemoveFromSubQueue {
                position: parse_args(op, payload)?,
            },
            Opcode::SkipSubQueue => Request::SkipSubQueue {
                count: parse_args(op, payload)?,
            },
            Opcode::GetSubQueue => Request::GetSubQueue,
            Opcode::SetEqualizer => {
                let bands: Vec<f32> = parse_args(op, payload)?;
                if bands.len() != EQUALIZER_BANDS {
                    return Err(Error::Protocol(format!(
                        "equalizer needs {} bands, got {}",
                        EQUALIZER_BANDS,
                        bands.len()
                    )));
                }
                Request::SetEqualizer { bands }
            }
            Opcode::GetEqualizer => Request::GetEqualizer,
            Opcode::SetPlayingFrom => Request::SetPlayingFrom {
                label: parse_args(op, payload)?,
            },
            Opcode::Reset => Request::Reset,
            Opcode::Exit => Request::Exit,
        };
        Ok(request)
    }

    /// Write this request as one frame
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let payload = self.encode_payload()?;
        write_frame(writer, self.opcode().into(), &payload)
    }
}

fn parse_args<T: DeserializeOwned>(op: Opcode, payload: &[u8]) -> Result<T> {
    if payload.is_empty() {
        return Err(Error::Protocol(format!("{:?} requires a payload", op)));
    }
    serde_json::from_slice(payload)
        .map_err(|e| Error::Protocol(format!("malformed {:?} payload: {}", op, e)))
}

/// Response status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    /// Transport command issued with no active track
    NothingPlaying = 1,
    /// Request understood but refused
    Failed = 2,
    /// Unknown opcode or malformed payload
    ProtocolError = 3,
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        status as u8
    }
}

impl TryFrom<u8> for Status {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Status::Ok),
            1 => Ok(Status::NothingPlaying),
            2 => Ok(Status::Failed),
            3 => Ok(Status::ProtocolError),
            _ => Err(Error::Protocol(format!("unknown status {}", value))),
        }
    }
}

/// Snapshot returned by GetStatus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: PlaybackState,
    pub track: Option<TrackId>,
    pub info: Option<TrackInfo>,
    pub position_secs: f64,
    pub duration_secs: f64,
    /// Active track was taken from the sub-queue
    pub from_sub_queue: bool,
    pub queue_index: Option<usize>,
    pub repeat: RepeatMode,
    pub shuffle: ShuffleMode,
    pub volume: f32,
    pub muted: bool,
    pub playing_from: String,
}

/// Snapshot returned by GetQueue, in play order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub tracks: Vec<TrackId>,
    pub index: Option<usize>,
}

/// Response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Reply {
    Empty,
    Version(String),
    Status(StatusSnapshot),
    Queue(QueueSnapshot),
    Tracks(Vec<TrackId>),
    Equalizer(Vec<f32>),
    Error(String),
}

/// One response frame
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub reply: Reply,
}

impl Response {
    pub fn ok() -> Self {
        Self::with(Reply::Empty)
    }

    pub fn with(reply: Reply) -> Self {
        Self {
            status: Status::Ok,
            reply,
        }
    }

    pub fn nothing_playing() -> Self {
        Self {
            status: Status::NothingPlaying,
            reply: Reply::Empty,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            reply: Reply::Error(message.into()),
        }
    }

    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self {
            status: Status::ProtocolError,
            reply: Reply::Error(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn encode_payload(&self) -> Result<Vec<u8>> {
        match self.reply {
            Reply::Empty => Ok(Vec::new()),
            ref reply => Ok(serde_json::to_vec(reply)?),
        }
    }

    pub fn decode(code: u8, payload: &[u8]) -> Result<Response> {
        let status = Status::try_from(code)?;
        let reply = if payload.is_empty() {
            Reply::Empty
        } else {
            serde_json::from_slice(payload)
                .map_err(|e| Error::Protocol(format!("malformed reply: {}", e)))?
        };
        Ok(Response { status, reply })
    }

    /// Write this response as one frame
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let payload = self.encode_payload()?;
        write_frame(writer, self.status.into(), &payload)
    }

    /// Read one response frame
    pub fn read_from<R: Read>(reader: &mut R, max_payload: usize) -> Result<Response> {
        match read_frame(reader, max_payload)? {
            Some(Frame::Complete { code, payload }) => Response::decode(code, &payload),
            Some(Frame::Oversized { len, .. }) => Err(Error::Protocol(format!(
                "reply of {} bytes exceeds limit of {}",
                len, max_payload
            ))),
            None => Err(Error::Protocol("connection closed".to_string())),
        }
    }
}

/// A frame as read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Complete { code: u8, payload: Vec<u8> },
    /// Payload exceeded the limit and was discarded
    Oversized { code: u8, len: usize },
}

/// Read one frame.
///
/// Returns `Ok(None)` on a clean end of stream before any header byte.
pub fn read_frame<R: Read>(reader: &mut R, max_payload: usize) -> Result<Option<Frame>> {
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(Error::Protocol(
                    "connection closed inside frame header".to_string(),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let code = header[0];
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;

    if len > max_payload {
        let discarded = io::copy(&mut reader.by_ref().take(len as u64), &mut io::sink())?;
        if discarded < len as u64 {
            return Err(Error::Protocol(
                "connection closed inside oversized payload".to_string(),
            ));
        }
        return Ok(Some(Frame::Oversized { code, len }));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(Frame::Complete { code, payload }))
}

/// Write one frame and flush
pub fn write_frame<W: Write>(writer: &mut W, code: u8, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::Protocol(format!("payload of {} bytes is too large", payload.len())))?;
    let mut header = [0u8; HEADER_LEN];
    header[0] = code;
    header[1..].copy_from_slice(&len.to_be_bytes());
    writer.write_all(&header)?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}
