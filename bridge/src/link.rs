//! TCP link to the servo controller.
//!
//! One outbound stream-socket connection to an operator-supplied peer.
//! The socket is owned by a dedicated worker thread; the [`ServoLink`]
//! handle feeds it commands over a channel, so at most one connect and
//! one send are ever in flight and neither can block the telemetry path.
//! Every state transition is reported to the observer through an event
//! channel.

use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};
use servo::ServoAngle;

use crate::error::LinkError;

/// TCP port the servo controller listens on.
pub const SERVO_PORT: u16 = 8888;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection lifecycle state. The only way callers observe socket
/// health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    /// A connect attempt failed; the operator can retry from here.
    Failed(String),
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected)
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
            LinkState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Events delivered to the registered observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link entered a new state.
    State(LinkState),
    /// A write failed mid-session; a `State(Disconnected)` follows.
    SendFailed(String),
}

enum LinkCommand {
    Connect {
        host: String,
        port: u16,
        generation: u64,
    },
    Send(ServoAngle),
    Disconnect,
    Shutdown,
}

/// Handle to the servo link worker.
///
/// Dropping the handle shuts the worker down and joins it, closing any
/// open socket.
pub struct ServoLink {
    to_worker: mpsc::Sender<LinkCommand>,
    worker: Option<JoinHandle<()>>,
    state: Arc<RwLock<LinkState>>,
    generation: Arc<AtomicU64>,
    events: mpsc::Sender<LinkEvent>,
}

impl ServoLink {
    /// Spawn the link worker. State transitions are reported on
    /// `events`; the caller keeps the receiving end.
    pub fn spawn(events: mpsc::Sender<LinkEvent>) -> Self {
        let state = Arc::new(RwLock::new(LinkState::Disconnected));
        let generation = Arc::new(AtomicU64::new(0));
        let (to_worker, from_handle) = mpsc::channel();
        let worker = LinkWorker::run(
            Arc::clone(&state),
            Arc::clone(&generation),
            events.clone(),
            from_handle,
        );
        ServoLink {
            to_worker,
            worker: Some(worker),
            state,
            generation,
            events,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> LinkState {
        self.state.read().unwrap().clone()
    }

    /// Request a connection to `host:port`.
    ///
    /// Fails fast with `InvalidAddress` on a blank host, and with `Busy`
    /// while an attempt is in flight or a connection is already up; a new
    /// attempt is accepted from `Disconnected` or `Failed`. The attempt
    /// itself runs on the worker; its outcome arrives as a `Connected` or
    /// `Failed` state event.
    pub fn connect(&self, host: &str, port: u16) -> Result<(), LinkError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(LinkError::InvalidAddress("peer host is empty".to_string()));
        }
        match self.state() {
            LinkState::Disconnected | LinkState::Failed(_) => {}
            LinkState::Connecting | LinkState::Connected => return Err(LinkError::Busy),
        }
        transition(&self.state, &self.events, LinkState::Connecting);
        let command = LinkCommand::Connect {
            host: host.to_string(),
            port,
            generation: self.generation.load(Ordering::SeqCst),
        };
        if self.to_worker.send(command).is_err() {
            transition(&self.state, &self.events, LinkState::Disconnected);
            return Err(LinkError::WorkerGone);
        }
        Ok(())
    }

    /// Queue one angle for sending. Valid only while connected.
    pub fn send(&self, angle: ServoAngle) -> Result<(), LinkError> {
        if !self.state().is_connected() {
            return Err(LinkError::NotConnected);
        }
        self.to_worker
            .send(LinkCommand::Send(angle))
            .map_err(|_| LinkError::WorkerGone)
    }

    /// Close the connection. Idempotent and safe from any state.
    ///
    /// Bumping the generation first guarantees that a connect attempt
    /// still in flight cannot resurrect the session: its completion will
    /// observe the stale generation and discard the socket.
    pub fn disconnect(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.to_worker.send(LinkCommand::Disconnect);
    }
}

impl Drop for ServoLink {
    fn drop(&mut self) {
        let _ = self.to_worker.send(LinkCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct LinkWorker {
    stream: Option<TcpStream>,
    state: Arc<RwLock<LinkState>>,
    generation: Arc<AtomicU64>,
    events: mpsc::Sender<LinkEvent>,
}

impl LinkWorker {
    fn run(
        state: Arc<RwLock<LinkState>>,
        generation: Arc<AtomicU64>,
        events: mpsc::Sender<LinkEvent>,
        commands: mpsc::Receiver<LinkCommand>,
    ) -> JoinHandle<()> {
        std::thread::spawn(move || {
            let mut worker = LinkWorker {
                stream: None,
                state,
                generation,
                events,
            };
            loop {
                match commands.recv() {
                    Ok(LinkCommand::Connect {
                        host,
                        port,
                        generation,
                    }) => worker.handle_connect(&host, port, generation),
                    Ok(LinkCommand::Send(angle)) => worker.handle_send(angle),
                    Ok(LinkCommand::Disconnect) => worker.close(),
                    Ok(LinkCommand::Shutdown) | Err(mpsc::RecvError) => {
                        worker.close();
                        return;
                    }
                }
            }
        })
    }

    fn handle_connect(&mut self, host: &str, port: u16, generation: u64) {
        info!("connecting to {}:{}", host, port);
        match open_stream(host, port) {
            Ok(stream) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    // disconnect was requested while the attempt was in
                    // flight; the completion is stale
                    debug!("discarding stale connect completion for {}:{}", host, port);
                    let _ = stream.shutdown(Shutdown::Both);
                    self.transition(LinkState::Disconnected);
                    return;
                }
                info!("connected to {}:{}", host, port);
                self.stream = Some(stream);
                self.transition(LinkState::Connected);
            }
            Err(e) => {
                let reason = describe_io_error(&e);
                warn!("connect to {}:{} failed: {}", host, port, reason);
                self.transition(LinkState::Failed(reason));
            }
        }
    }

    fn handle_send(&mut self, angle: ServoAngle) {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                // connection went away between the caller's check and now
                debug!("dropping send of {} while disconnected", angle);
                return;
            }
        };
        match write_line(stream, angle) {
            Ok(()) => debug!("sent servo angle {}", angle),
            Err(e) => {
                let reason = describe_io_error(&e);
                warn!("write of {} failed: {}", angle, reason);
                let _ = self.events.send(LinkEvent::SendFailed(reason));
                self.close();
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!("link closed");
        }
        self.transition(LinkState::Disconnected);
    }

    fn transition(&self, next: LinkState) {
        transition(&self.state, &self.events, next);
    }
}

/// Apply a state transition and notify the observer. No-op transitions
/// are skipped so `disconnect()` stays quiet when already disconnected.
fn transition(
    state: &Arc<RwLock<LinkState>>,
    events: &mpsc::Sender<LinkEvent>,
    next: LinkState,
) {
    {
        let mut current = state.write().unwrap();
        if *current == next {
            return;
        }
        debug!("link state {} -> {}", current, next);
        *current = next.clone();
    }
    let _ = events.send(LinkEvent::State(next));
}

fn open_stream(host: &str, port: u16) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                // each angle must reach the peer as a discrete message
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "host resolved to no addresses",
        )
    }))
}

/// One ASCII decimal angle per line, flushed immediately. The peer polls
/// per-line, so no buffering across sends.
fn write_line(stream: &mut TcpStream, angle: ServoAngle) -> std::io::Result<()> {
    stream.write_all(format!("{}\n", angle.degrees()).as_bytes())?;
    stream.flush()
}

fn describe_io_error(e: &std::io::Error) -> String {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::ConnectionRefused => "connection refused by peer".to_string(),
        ErrorKind::TimedOut => "connection timed out".to_string(),
        ErrorKind::ConnectionReset => "connection reset by peer".to_string(),
        ErrorKind::BrokenPipe => "connection closed by peer".to_string(),
        _ => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::sync::mpsc::Receiver;

    const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

    fn spawn_link() -> (ServoLink, Receiver<LinkEvent>) {
        let (tx, rx) = mpsc::channel();
        (ServoLink::spawn(tx), rx)
    }

    fn expect_state(events: &Receiver<LinkEvent>, expected: LinkState) {
        match events.recv_timeout(EVENT_TIMEOUT) {
            Ok(LinkEvent::State(state)) => assert_eq!(state, expected),
            other => panic!("expected state {:?}, got {:?}", expected, other),
        }
    }

    #[test]
    fn test_connect_sequence_and_send() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (link, events) = spawn_link();

        assert_eq!(link.state(), LinkState::Disconnected);
        link.connect("127.0.0.1", port).unwrap();
        expect_state(&events, LinkState::Connecting);

        let (peer, _) = listener.accept().unwrap();
        expect_state(&events, LinkState::Connected);

        link.send(ServoAngle::new(90)).unwrap();
        link.send(ServoAngle::new(180)).unwrap();

        let mut reader = BufReader::new(peer);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "90\n");
        line.clear();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "180\n");
    }

    #[test]
    fn test_send_while_disconnected_rejected() {
        let (link, events) = spawn_link();
        assert_eq!(
            link.send(ServoAngle::new(45)),
            Err(LinkError::NotConnected)
        );
        assert!(events.try_recv().is_err(), "no events expected");
    }

    #[test]
    fn test_blank_host_rejected_before_io() {
        let (link, events) = spawn_link();
        assert!(matches!(
            link.connect("", SERVO_PORT),
            Err(LinkError::InvalidAddress(_))
        ));
        assert!(matches!(
            link.connect("   ", SERVO_PORT),
            Err(LinkError::InvalidAddress(_))
        ));
        assert!(events.try_recv().is_err(), "no events expected");
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_refused_connect_fails_then_retry_accepted() {
        // bind and immediately drop to get a port with no listener
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let (link, events) = spawn_link();

        link.connect("127.0.0.1", port).unwrap();
        expect_state(&events, LinkState::Connecting);
        match events.recv_timeout(EVENT_TIMEOUT) {
            Ok(LinkEvent::State(LinkState::Failed(reason))) => {
                assert!(!reason.is_empty());
            }
            other => panic!("expected failed state, got {:?}", other),
        }

        // Failed is retryable
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        link.connect("127.0.0.1", port).unwrap();
        expect_state(&events, LinkState::Connecting);
        let _peer = listener.accept().unwrap();
        expect_state(&events, LinkState::Connected);
    }

    #[test]
    fn test_connect_while_connected_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (link, events) = spawn_link();

        link.connect("127.0.0.1", port).unwrap();
        expect_state(&events, LinkState::Connecting);
        let _peer = listener.accept().unwrap();
        expect_state(&events, LinkState::Connected);

        assert_eq!(link.connect("127.0.0.1", port), Err(LinkError::Busy));
    }

    #[test]
    fn test_disconnect_idempotent_from_any_state() {
        let (link, events) = spawn_link();

        // from Disconnected: stays quiet
        link.disconnect();
        link.disconnect();
        std::thread::sleep(Duration::from_millis(50));
        assert!(events.try_recv().is_err(), "no events expected");
        assert_eq!(link.state(), LinkState::Disconnected);

        // from Connected: closes the socket, peer sees EOF
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        link.connect("127.0.0.1", port).unwrap();
        expect_state(&events, LinkState::Connecting);
        let (peer, _) = listener.accept().unwrap();
        expect_state(&events, LinkState::Connected);

        link.disconnect();
        expect_state(&events, LinkState::Disconnected);

        let mut reader = BufReader::new(peer);
        let mut line = String::new();
        assert_eq!(reader.read_line(&mut line).unwrap(), 0, "expected EOF");
    }

    #[test]
    fn test_write_failure_reports_and_disconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (link, events) = spawn_link();

        link.connect("127.0.0.1", port).unwrap();
        expect_state(&events, LinkState::Connecting);
        let (peer, _) = listener.accept().unwrap();
        expect_state(&events, LinkState::Connected);
        drop(peer);

        // the first write after the peer closes may still land in the
        // kernel buffer; keep sending until the failure surfaces
        let mut saw_send_failed = false;
        let mut saw_disconnected = false;
        for i in 0..50 {
            let angle = ServoAngle::new(if i % 2 == 0 { 0 } else { 180 });
            let _ = link.send(angle);
            while let Ok(event) = events.try_recv() {
                match event {
                    LinkEvent::SendFailed(_) => saw_send_failed = true,
                    LinkEvent::State(LinkState::Disconnected) => saw_disconnected = true,
                    other => panic!("unexpected event {:?}", other),
                }
            }
            if saw_disconnected {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        assert!(saw_send_failed, "write failure was never reported");
        assert!(saw_disconnected, "link never transitioned to disconnected");
        assert_eq!(link.state(), LinkState::Disconnected);
        assert_eq!(
            link.send(ServoAngle::new(0)),
            Err(LinkError::NotConnected)
        );
    }

    #[test]
    fn test_drop_joins_worker_and_closes_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (link, events) = spawn_link();

        link.connect("127.0.0.1", port).unwrap();
        expect_state(&events, LinkState::Connecting);
        let (peer, _) = listener.accept().unwrap();
        expect_state(&events, LinkState::Connected);

        drop(link);

        let mut reader = BufReader::new(peer);
        let mut line = String::new();
        assert_eq!(reader.read_line(&mut line).unwrap(), 0, "expected EOF");
    }
}
