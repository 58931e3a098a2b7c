#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use bridge_core::{BridgeConfig, BridgeServer, MemoryHost, WorldBuilder};
use serde_json::Value as JsonValue;

/// Bridge bound to an ephemeral port, ticked on its own thread.
///
/// The host and server live entirely on that thread; the test thread only
/// talks to them over TCP, like a remote agent would.
pub struct BridgeHarness {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

pub struct HttpReply {
    pub status: u16,
    pub head: String,
    pub body: JsonValue,
}

impl BridgeHarness {
    pub fn start(world: WorldBuilder) -> Self {
        Self::start_with(world, BridgeConfig::default())
    }

    pub fn start_with(world: WorldBuilder, config: BridgeConfig) -> Self {
        let config = BridgeConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..config
        };
        let stop = Arc::new(AtomicBool::new(false));
        let (addr_tx, addr_rx) = mpsc::channel();
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let mut server = BridgeServer::bind(config).expect("bind bridge");
            let mut host = MemoryHost::new(world.build());
            addr_tx.send(server.local_addr()).expect("report address");
            while !thread_stop.load(Ordering::Relaxed) {
                server.tick(&mut host);
                thread::sleep(Duration::from_millis(1));
            }
        });
        let addr = addr_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("bridge thread never bound");
        Self {
            addr,
            stop,
            handle: Some(handle),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn connect(&self) -> Result<TcpStream> {
        let stream = TcpStream::connect(self.addr).context("connect to bridge")?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        Ok(stream)
    }

    pub fn send_raw(&self, raw: &[u8]) -> Result<HttpReply> {
        let mut stream = self.connect()?;
        stream.write_all(raw)?;
        let mut response = String::new();
        stream.read_to_string(&mut response)?;
        parse_reply(&response)
    }

    pub fn request(&self, method: &str, path: &str, body: Option<&str>) -> Result<HttpReply> {
        let body = body.unwrap_or("");
        let raw = format!(
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        self.send_raw(raw.as_bytes())
    }

    pub fn get(&self, path: &str) -> Result<JsonValue> {
        Ok(self.request("GET", path, None)?.body)
    }

    pub fn post(&self, path: &str, body: &str) -> Result<JsonValue> {
        Ok(self.request("POST", path, Some(body))?.body)
    }
}

impl Drop for BridgeHarness {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn parse_reply(response: &str) -> Result<HttpReply> {
    let (head, body) = response
        .split_once("\r\n\r\n")
        .ok_or_else(|| anyhow!("response has no header terminator: {response:?}"))?;
    let status = head
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow!("missing status code"))?
        .parse()
        .context("status code")?;
    let body = if body.trim().is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_str(body).context("response body is JSON")?
    };
    Ok(HttpReply {
        status,
        head: head.to_string(),
        body,
    })
}
