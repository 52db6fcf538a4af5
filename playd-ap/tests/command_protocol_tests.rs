//! Command socket tests
//!
//! A real `CommandServer` on an ephemeral localhost port, backed by a service
//! over synthetic sources. The playback-control step is driven by hand.

mod helpers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use helpers::service_with_tracks;
use playd_ap::service::server::CommandServer;
use playd_ap::service::MainService;
use playd_common::client::Client;
use playd_common::protocol::{Opcode, QueueArgs, Reply, Request, Status};
use playd_common::{PlaybackState, TrackId};

struct Harness {
    service: Arc<MainService>,
    addr: SocketAddr,
    server: Option<JoinHandle<()>>,
}

impl Harness {
    fn start(max_payload: usize) -> Self {
        let (service, _) = service_with_tracks(&[10, 20, 30], &[]);
        let server = CommandServer::bind("127.0.0.1:0", max_payload).unwrap();
        let addr = server.local_addr().unwrap();

        let runner = Arc::clone(&service);
        let handle = std::thread::spawn(move || server.run(runner));
        Self {
            service,
            addr,
            server: Some(handle),
        }
    }

    fn client(&self) -> Client {
        let client = Client::connect(self.addr).unwrap();
        client.set_timeout(Some(Duration::from_secs(5))).unwrap();
        client
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.service.request_exit();
        if let Some(handle) = self.server.take() {
            let _ = handle.join();
        }
    }
}

#[test]
fn test_unknown_opcode_keeps_connection_open() {
    let harness = Harness::start(1 << 20);
    let mut client = harness.client();

    let response = client.request_raw(200, &[]).unwrap();
    assert_eq!(response.status, Status::ProtocolError);
    assert!(matches!(response.reply, Reply::Error(_)));

    let reply = client.expect_ok(&Request::Version).unwrap();
    match reply {
        Reply::Version(version) => assert!(version.starts_with(env!("CARGO_PKG_VERSION"))),
        other => panic!("unexpected reply {:?}", other),
    }
}

#[test]
fn test_malformed_payload_is_protocol_error() {
    let harness = Harness::start(1 << 20);
    let mut client = harness.client();

    let response = client
        .request_raw(Opcode::SetVolume.into(), b"loud")
        .unwrap();
    assert_eq!(response.status, Status::ProtocolError);

    let response = client.request_raw(Opcode::SetQueue.into(), &[]).unwrap();
    assert_eq!(response.status, Status::ProtocolError);

    assert!(client.request(&Request::GetStatus).unwrap().is_ok());
}

#[test]
fn test_oversized_payload_is_discarded() {
    let harness = Harness::start(64);
    let mut client = harness.client();

    let label = format!("\"{}\"", "x".repeat(200));
    let response = client
        .request_raw(Opcode::SetPlayingFrom.into(), label.as_bytes())
        .unwrap();
    assert_eq!(response.status, Status::ProtocolError);

    // Stream is still in sync
    client
        .expect_ok(&Request::SetPlayingFrom {
            label: "Radio".to_string(),
        })
        .unwrap();
    assert_eq!(harness.service.status().playing_from, "Radio");
}

#[test]
fn test_transport_with_nothing_playing() {
    let harness = Harness::start(1 << 20);
    let mut client = harness.client();

    for request in [Request::Play, Request::Pause, Request::Next, Request::Stop] {
        let response = client.request(&request).unwrap();
        assert_eq!(response.status, Status::NothingPlaying, "{:?}", request);
    }
}

#[test]
fn test_queue_and_status_over_the_socket() {
    let harness = Harness::start(1 << 20);
    let mut client = harness.client();

    client
        .expect_ok(&Request::SetQueue(QueueArgs {
            tracks: vec![TrackId(10), TrackId(20), TrackId(30)],
            start: 1,
        }))
        .unwrap();
    harness.service.tick();

    match client.expect_ok(&Request::GetStatus).unwrap() {
        Reply::Status(status) => {
            assert_eq!(status.state, PlaybackState::Playing);
            assert_eq!(status.track, Some(TrackId(20)));
            assert_eq!(status.queue_index, Some(1));
        }
        other => panic!("unexpected reply {:?}", other),
    }

    // Removing the playing entry is refused, not a protocol error
    let response = client
        .request(&Request::RemoveFromQueue { position: 1 })
        .unwrap();
    assert_eq!(response.status, Status::Failed);

    client
        .expect_ok(&Request::AddToSubQueue { track: TrackId(30) })
        .unwrap();
    match client.expect_ok(&Request::GetSubQueue).unwrap() {
        Reply::Tracks(tracks) => assert_eq!(tracks, vec![TrackId(30)]),
        other => panic!("unexpected reply {:?}", other),
    }

    match client.expect_ok(&Request::GetEqualizer).unwrap() {
        Reply::Equalizer(bands) => assert_eq!(bands, vec![1.0; 32]),
        other => panic!("unexpected reply {:?}", other),
    }
}

#[test]
fn test_clients_are_served_one_after_another() {
    let harness = Harness::start(1 << 20);

    {
        let mut first = harness.client();
        first.expect_ok(&Request::SetVolume { level: 0.25 }).unwrap();
    }

    let mut second = harness.client();
    match second.expect_ok(&Request::GetStatus).unwrap() {
        Reply::Status(status) => assert_eq!(status.volume, 0.25),
        other => panic!("unexpected reply {:?}", other),
    }
}

#[test]
fn test_exit_stops_the_server() {
    let mut harness = Harness::start(1 << 20);
    let mut client = harness.client();

    client.expect_ok(&Request::Exit).unwrap();
    assert!(harness.service.exit_requested());

    let handle = harness.server.take().unwrap();
    handle.join().unwrap();
}
