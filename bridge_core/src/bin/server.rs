use std::process;
use std::thread;

use tracing::{debug, error, info};

use bridge_core::{classify, BridgeConfig, BridgeServer, Host, MemoryHost};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match BridgeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(target: "card_bridge::server", error = %err, "config.load_failed");
            process::exit(1);
        }
    };
    let frame_interval = config.frame_interval();

    let mut server = match BridgeServer::bind(config) {
        Ok(server) => server,
        Err(err) => {
            error!(target: "card_bridge::server", error = %err, "bridge.bind_failed");
            process::exit(1);
        }
    };
    let mut host = MemoryHost::demo();

    info!(
        target: "card_bridge::server",
        bind = %server.local_addr(),
        phase = %classify(&host.world()),
        "headless bridge ready"
    );

    let mut last_state = host.current_state();
    loop {
        server.tick(&mut host);
        host.advance_frame();

        let state = host.current_state();
        if state != last_state {
            debug!(
                target: "card_bridge::server",
                from = ?last_state,
                to = ?state,
                "host.state_changed"
            );
            last_state = state;
        }
        thread::sleep(frame_interval);
    }
}
