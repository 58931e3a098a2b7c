use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpStream},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use bridge_runtime::{parse_action_line, ActionResult, LegalActionSet};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;

#[derive(Parser, Debug)]
#[command(author, version, about = "Command-line client for the card-run bridge", long_about = None)]
struct Args {
    /// Bridge address
    #[arg(long, default_value = "127.0.0.1:7777")]
    addr: SocketAddr,

    /// Connect and read timeout (milliseconds)
    #[arg(long, default_value_t = 5_000)]
    timeout_ms: u64,

    /// Print compact JSON instead of pretty output
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: ProbeCommand,
}

#[derive(Subcommand, Debug)]
enum ProbeCommand {
    /// Liveness and request counters
    Health,
    /// Full state document
    State,
    /// Legal actions for the current phase
    Legal,
    /// Submit an action, e.g. `act play 1 2 3`, `act buy 1` or a JSON body
    Act {
        #[arg(trailing_var_arg = true, required = true)]
        line: Vec<String>,
    },
    /// Ask the bridge to reset the run
    Reset,
    /// Send a config document and print the echo
    Config {
        /// Inline JSON object
        json: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let client = BridgeClient {
        addr: args.addr,
        timeout: Duration::from_millis(args.timeout_ms.max(1)),
    };

    let document = match &args.command {
        ProbeCommand::Health => client.get("/health")?,
        ProbeCommand::State => client.get("/state")?,
        ProbeCommand::Legal => {
            let document = client.get("/legal")?;
            let legal: LegalActionSet = serde_json::from_value(document.clone())
                .with_context(|| "Bridge returned a malformed legal action set")?;
            if !legal.phase.is_decision_point() {
                eprintln!("{} is not a decision point; wait for the host to settle", legal.phase);
            }
            for action in &legal.actions {
                eprintln!("{:<18} {}", action.kind.as_str(), action.description);
            }
            document
        }
        ProbeCommand::Act { line } => {
            let command = parse_action_line(&line.join(" "))
                .with_context(|| format!("Unable to parse action '{}'", line.join(" ")))?;
            let document = client.post("/action", &command.to_json().to_string())?;
            let result: ActionResult = serde_json::from_value(document.clone())
                .with_context(|| "Bridge returned a malformed action result")?;
            if let Some(reason) = &result.error {
                eprintln!("rejected: {reason}");
            }
            document
        }
        ProbeCommand::Reset => client.post("/reset", "{}")?,
        ProbeCommand::Config { json } => {
            let body: JsonValue = serde_json::from_str(json)
                .with_context(|| "Config argument is not valid JSON")?;
            client.post("/config", &body.to_string())?
        }
    };

    if args.compact {
        println!("{document}");
    } else {
        println!("{}", serde_json::to_string_pretty(&document)?);
    }
    Ok(())
}

struct BridgeClient {
    addr: SocketAddr,
    timeout: Duration,
}

impl BridgeClient {
    fn get(&self, path: &str) -> Result<JsonValue> {
        self.send("GET", path, "")
    }

    fn post(&self, path: &str, body: &str) -> Result<JsonValue> {
        self.send("POST", path, body)
    }

    fn send(&self, method: &str, path: &str, body: &str) -> Result<JsonValue> {
        let mut stream = TcpStream::connect_timeout(&self.addr, self.timeout)
            .with_context(|| format!("Failed to connect to bridge at {}", self.addr))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let request = format!(
            "{method} {path} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            self.addr,
            body.len()
        );
        stream.write_all(request.as_bytes())?;

        let mut response = String::new();
        stream
            .read_to_string(&mut response)
            .with_context(|| format!("{method} {path} did not complete"))?;
        let (head, payload) = response
            .split_once("\r\n\r\n")
            .ok_or_else(|| anyhow!("Bridge closed the connection without a response"))?;
        let status = head.split_whitespace().nth(1).unwrap_or("?");
        if !status.starts_with('2') {
            eprintln!("HTTP {status}");
        }
        serde_json::from_str(payload)
            .with_context(|| format!("Response to {method} {path} is not JSON"))
    }
}
