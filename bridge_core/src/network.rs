//! Cooperative connection scheduler driven once per host frame.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::codec::{error_envelope, has_complete_head, Request, Response};
use crate::config::BridgeConfig;
use crate::host::Host;
use crate::metrics::BridgeMetrics;
use crate::router::route;

const READ_CHUNK: usize = 8 * 1024;

struct PendingConnection {
    stream: TcpStream,
    peer: SocketAddr,
    arrived: Instant,
    buffer: Vec<u8>,
    outgoing: Option<Outgoing>,
}

/// Serialized response still being handed to the socket.
struct Outgoing {
    status: u16,
    bytes: Vec<u8>,
    written: usize,
}

impl Outgoing {
    fn new(response: &Response) -> Self {
        Self {
            status: response.status,
            bytes: response.to_bytes(),
            written: 0,
        }
    }

    fn remaining(&self) -> &[u8] {
        &self.bytes[self.written..]
    }
}

enum Progress {
    Waiting,
    Ready,
    Closed,
}

/// Non-blocking HTTP listener serviced from the host's update loop.
///
/// Each [`tick`](BridgeServer::tick) makes one accept attempt, one read
/// attempt per connection still receiving, and writes as much of each
/// pending response as the socket takes without blocking. A response that
/// does not fit is continued on later ticks until the connection deadline.
/// No threads are spawned.
pub struct BridgeServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: BridgeConfig,
    pending: Vec<PendingConnection>,
    metrics: BridgeMetrics,
}

impl BridgeServer {
    pub fn bind(config: BridgeConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        info!(
            target: "card_bridge::network",
            bind = %local_addr,
            "bridge.listening"
        );
        Ok(Self {
            listener,
            local_addr,
            config,
            pending: Vec::new(),
            metrics: BridgeMetrics::default(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }

    pub fn pending_connections(&self) -> usize {
        self.pending.len()
    }

    /// Service the socket once. Returns how many requests were answered.
    pub fn tick<H: Host + ?Sized>(&mut self, host: &mut H) -> usize {
        self.accept_one();

        let mut served = 0;
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].outgoing.is_none() {
                match self.read_once(index) {
                    Progress::Waiting => {
                        index += 1;
                        continue;
                    }
                    Progress::Closed => {
                        self.pending.swap_remove(index);
                        continue;
                    }
                    Progress::Ready => {
                        let response = self.respond(index, host);
                        self.pending[index].outgoing = Some(Outgoing::new(&response));
                        served += 1;
                    }
                }
            }
            match self.write_once(index) {
                Progress::Waiting => index += 1,
                Progress::Ready | Progress::Closed => {
                    self.pending.swap_remove(index);
                }
            }
        }
        served
    }

    fn accept_one(&mut self) {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                if let Err(err) = stream.set_nonblocking(true) {
                    warn!(
                        target: "card_bridge::network",
                        %peer,
                        error = %err,
                        "connection.rejected=nonblocking"
                    );
                    return;
                }
                debug!(target: "card_bridge::network", %peer, "connection.accepted");
                self.pending.push(PendingConnection {
                    stream,
                    peer,
                    arrived: Instant::now(),
                    buffer: Vec::new(),
                    outgoing: None,
                });
            }
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => {
                warn!(target: "card_bridge::network", error = %err, "accept.failed");
            }
        }
    }

    fn read_once(&mut self, index: usize) -> Progress {
        let limit = self.config.max_request_bytes.max(1);
        let timeout = self.config.connection_timeout();
        let connection = &mut self.pending[index];

        let room = limit
            .saturating_sub(connection.buffer.len())
            .clamp(1, READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];
        match connection.stream.read(&mut chunk[..room]) {
            Ok(0) if connection.buffer.is_empty() => {
                debug!(
                    target: "card_bridge::network",
                    peer = %connection.peer,
                    "connection.closed=peer"
                );
                return Progress::Closed;
            }
            Ok(0) => return Progress::Ready,
            Ok(read) => {
                connection.buffer.extend_from_slice(&chunk[..read]);
                if has_complete_head(&connection.buffer) || connection.buffer.len() >= limit {
                    return Progress::Ready;
                }
            }
            Err(ref err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                warn!(
                    target: "card_bridge::network",
                    peer = %connection.peer,
                    error = %err,
                    "connection.read_failed"
                );
                return Progress::Closed;
            }
        }

        if connection.arrived.elapsed() >= timeout {
            debug!(
                target: "card_bridge::network",
                peer = %connection.peer,
                buffered = connection.buffer.len(),
                "connection.closed=timeout"
            );
            return Progress::Closed;
        }
        Progress::Waiting
    }

    fn respond<H: Host + ?Sized>(&mut self, index: usize, host: &mut H) -> Response {
        let peer = self.pending[index].peer;
        match Request::parse(&self.pending[index].buffer) {
            Ok(request) => route(&request, host, &mut self.metrics),
            Err(err) => {
                debug!(
                    target: "card_bridge::network",
                    %peer,
                    error = %err,
                    "request.malformed"
                );
                self.metrics.record_request();
                Response::json(400, error_envelope(&err.to_string()))
            }
        }
    }

    /// Push response bytes until the socket would block. `Ready` once all
    /// bytes are out, `Closed` on failure or when the deadline passes first.
    fn write_once(&mut self, index: usize) -> Progress {
        let timeout = self.config.connection_timeout();
        let connection = &mut self.pending[index];
        let Some(outgoing) = connection.outgoing.as_mut() else {
            return Progress::Waiting;
        };

        while !outgoing.remaining().is_empty() {
            match connection.stream.write(outgoing.remaining()) {
                Ok(0) => {
                    warn!(
                        target: "card_bridge::network",
                        peer = %connection.peer,
                        status = outgoing.status,
                        "connection.write_failed=zero"
                    );
                    return Progress::Closed;
                }
                Ok(written) => outgoing.written += written,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                    if connection.arrived.elapsed() >= timeout {
                        warn!(
                            target: "card_bridge::network",
                            peer = %connection.peer,
                            status = outgoing.status,
                            unsent = outgoing.remaining().len(),
                            "connection.closed=write_timeout"
                        );
                        return Progress::Closed;
                    }
                    return Progress::Waiting;
                }
                Err(err) => {
                    warn!(
                        target: "card_bridge::network",
                        peer = %connection.peer,
                        status = outgoing.status,
                        error = %err,
                        "connection.write_failed"
                    );
                    return Progress::Closed;
                }
            }
        }

        // Peer may already be gone; the response has been handed off.
        let _ = connection.stream.shutdown(Shutdown::Write);
        debug!(
            target: "card_bridge::network",
            peer = %connection.peer,
            status = outgoing.status,
            bytes = outgoing.bytes.len(),
            "response.sent"
        );
        Progress::Ready
    }
}
