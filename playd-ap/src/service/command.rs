//! Command dispatch
//!
//! Maps one decoded request onto the main service and builds its response.
//! Runs on the command thread; nothing here waits on the decoder.

use super::MainService;
use crate::error::Error;
use playd_common::protocol::{Reply, Request, Response};
use tracing::debug;

/// Execute one request
pub fn handle(service: &MainService, request: Request) -> Response {
    debug!("Request: {:?}", request.opcode());

    match request {
        Request::Version => Response::with(Reply::Version(service.version())),
        Request::GetStatus => Response::with(Reply::Status(service.status())),

        Request::Play => transport(service.play()),
        Request::Pause => transport(service.pause()),
        Request::Stop => transport(service.stop()),
        Request::Next => transport(service.next()),
        Request::Previous => transport(service.previous()),
        Request::Seek { seconds } => transport(service.seek(seconds)),

        Request::SetVolume { level } => {
            service.set_volume(level);
            Response::ok()
        }
        Request::SetMuted { muted } => {
            service.set_muted(muted);
            Response::ok()
        }
        Request::SetRepeatMode(mode) => {
            service.set_repeat_mode(mode);
            Response::ok()
        }
        Request::SetShuffleMode(mode) => {
            service.set_shuffle_mode(mode);
            Response::ok()
        }

        Request::SetQueue(args) => {
            service.set_queue(args.tracks, args.start);
            Response::ok()
        }
        Request::SetQueueIndex { index } => result(service.set_queue_index(index)),
        Request::InsertIntoQueue(args) => {
            service.insert_into_queue(args.position, args.track);
            Response::ok()
        }
        Request::RemoveFromQueue { position } => {
            result(service.remove_from_queue(position).map(|_| ()))
        }
        Request::MoveInQueue(args) => result(service.move_in_queue(args.from, args.to)),
        Request::GetQueue => Response::with(Reply::Queue(service.queue_snapshot())),

        Request::AddToSubQueue { track } => {
            service.add_to_sub_queue(track);
            Response::ok()
        }
        Request::RemoveFromSubQueue { position } => {
            result(service.remove_from_sub_queue(position).map(|_| ()))
        }
        Request::SkipSubQueue { count } => {
            service.skip_sub_queue(count);
            Response::ok()
        }
        Request::GetSubQueue => Response::with(Reply::Tracks(service.sub_queue_snapshot())),

        Request::SetEqualizer { bands } => {
            service.set_equalizer(&bands);
            Response::ok()
        }
        Request::GetEqualizer => Response::with(Reply::Equalizer(service.equalizer().to_vec())),

        Request::SetPlayingFrom { label } => {
            service.set_playing_from(label);
            Response::ok()
        }
        Request::Reset => {
            service.reset();
            Response::ok()
        }
        Request::Exit => {
            service.request_exit();
            Response::ok()
        }
    }
}

fn transport(accepted: bool) -> Response {
    if accepted {
        Response::ok()
    } else {
        Response::nothing_playing()
    }
}

fn result(outcome: Result<(), Error>) -> Response {
    match outcome {
        Ok(()) => Response::ok(),
        Err(e) => Response::failed(e.to_string()),
    }
}
