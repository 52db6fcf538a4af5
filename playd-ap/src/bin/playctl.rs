//! playctl - command-line client for a running playd-ap
//!
//! Sends one request per invocation and prints the reply.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use playd_common::client::Client;
use playd_common::protocol::{
    InsertArgs, MoveArgs, QueueArgs, Reply, Request, Status, DEFAULT_PORT,
};
use playd_common::{RepeatMode, ShuffleMode, TrackId};

#[derive(Parser, Debug)]
#[command(name = "playctl")]
#[command(about = "Control a running playd-ap service")]
#[command(version)]
struct Args {
    /// Service host
    #[arg(long, default_value = "127.0.0.1", env = "PLAYD_HOST")]
    host: String,

    /// Service command port
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PLAYD_PORT")]
    port: u16,

    /// Give up on a response after this many seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Service version
    Version,
    /// Playback status
    Status,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    /// Seek within the current track
    Seek { seconds: f64 },
    /// Set the volume (0.0 - 1.0)
    Volume { level: f32 },
    Mute,
    Unmute,
    Repeat { mode: RepeatArg },
    Shuffle { mode: ShuffleArg },
    /// Replace the play queue
    Queue {
        /// Track ids in play order
        #[arg(required = true)]
        tracks: Vec<i32>,
        /// Position to start at
        #[arg(short, long, default_value_t = 0)]
        start: usize,
    },
    /// Jump to a queue position
    Jump { index: usize },
    /// Insert a track into the play queue
    Insert { position: usize, track: i32 },
    /// Remove a play queue entry
    Remove { position: usize },
    /// Move a play queue entry
    Move { from: usize, to: usize },
    /// Show the play queue
    ShowQueue,
    /// Play a track next, ahead of the play queue
    Enqueue { track: i32 },
    /// Remove a sub-queue entry
    Dequeue { position: usize },
    /// Drop entries from the front of the sub-queue
    SkipSub { count: usize },
    /// Show the sub-queue
    ShowSub,
    /// Set all 32 equalizer band gains
    Eq {
        #[arg(num_args = 32, required = true)]
        bands: Vec<f32>,
    },
    /// Show the equalizer band gains
    ShowEq,
    /// Set the "playing from" label
    From { label: String },
    /// Return the service to its startup state
    Reset,
    /// Shut the service down
    Exit,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RepeatArg {
    Off,
    One,
    All,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShuffleArg {
    Off,
    On,
}

impl Command {
    fn into_request(self) -> Request {
        match self {
            Command::Version => Request::Version,
            Command::Status => Request::GetStatus,
            Command::Play => Request::Play,
            Command::Pause => Request::Pause,
            Command::Stop => Request::Stop,
            Command::Next => Request::Next,
            Command::Previous => Request::Previous,
            Command::Seek { seconds } => Request::Seek { seconds },
            Command::Volume { level } => Request::SetVolume { level },
            Command::Mute => Request::SetMuted { muted: true },
            Command::Unmute => Request::SetMuted { muted: false },
            Command::Repeat { mode } => Request::SetRepeatMode(match mode {
                RepeatArg::Off => RepeatMode::Off,
                RepeatArg::One => RepeatMode::One,
                RepeatArg::All => RepeatMode::All,
            }),
            Command::Shuffle { mode } => Request::SetShuffleMode(match mode {
                ShuffleArg::Off => ShuffleMode::Off,
                ShuffleArg::On => ShuffleMode::On,
            }),
            Command::Queue { tracks, start } => Request::SetQueue(QueueArgs {
                tracks: tracks.into_iter().map(TrackId).collect(),
                start,
            }),
            Command::Jump { index } => Request::SetQueueIndex { index },
            Command::Insert { position, track } => Request::InsertIntoQueue(InsertArgs {
                position,
                track: TrackId(track),
            }),
            Command::Remove { position } => Request::RemoveFromQueue { position },
            Command::Move { from, to } => Request::MoveInQueue(MoveArgs { from, to }),
            Command::ShowQueue => Request::GetQueue,
            Command::Enqueue { track } => Request::AddToSubQueue {
                track: TrackId(track),
            },
            Command::Dequeue { position } => Request::RemoveFromSubQueue { position },
            Command::SkipSub { count } => Request::SkipSubQueue { count },
            Command::ShowSub => Request::GetSubQueue,
            Command::Eq { bands } => Request::SetEqualizer { bands },
            Command::ShowEq => Request::GetEqualizer,
            Command::From { label } => Request::SetPlayingFrom { label },
            Command::Reset => Request::Reset,
            Command::Exit => Request::Exit,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut client =
        Client::connect(addr.as_str()).with_context(|| format!("Failed to connect to {}", addr))?;
    client.set_timeout(Some(Duration::from_secs(args.timeout.max(1))))?;

    let request = args.command.into_request();
    let response = client
        .request(&request)
        .with_context(|| format!("{:?} request failed", request.opcode()))?;

    match response.status {
        Status::Ok => print_reply(response.reply)?,
        Status::NothingPlaying => println!("nothing playing"),
        Status::Failed | Status::ProtocolError => match response.reply {
            Reply::Error(message) => bail!("{:?}: {}", response.status, message),
            _ => bail!("{:?}", response.status),
        },
    }
    Ok(())
}

fn print_reply(reply: Reply) -> Result<()> {
    match reply {
        Reply::Empty => println!("ok"),
        Reply::Version(version) => println!("{}", version),
        Reply::Status(status) => println!("{}", serde_json::to_string_pretty(&status)?),
        Reply::Queue(queue) => {
            for (pos, track) in queue.tracks.iter().enumerate() {
                let marker = if queue.index == Some(pos) { '>' } else { ' ' };
                println!("{} {:>4}  {}", marker, pos, track);
            }
        }
        Reply::Tracks(tracks) => {
            for (pos, track) in tracks.iter().enumerate() {
                println!("{:>4}  {}", pos, track);
            }
        }
        Reply::Equalizer(bands) => {
            let line: Vec<String> = bands.iter().map(|g| format!("{:.2}", g)).collect();
            println!("{}", line.join(" "));
        }
        Reply::Error(message) => println!("{}", message),
    }
    Ok(())
}
