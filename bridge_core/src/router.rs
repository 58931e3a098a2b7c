//! Request routing and per-endpoint handlers.

use bridge_runtime::{ActionCommand, ActionResult};
use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use tracing::{debug, error};

use crate::codec::{decode_document, encode_document, error_envelope, Request, Response};
use crate::dispatch::{dispatch, observe};
use crate::host::{Host, HostError};
use crate::metrics::BridgeMetrics;

pub const RESET_HINT: &str = "Reset is not supported remotely; start a new run manually in the game";

/// Fault raised while handling a routed request; answered with a 500.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Route one parsed request and produce its response.
///
/// Counters are updated here: every routed request counts, and a handler
/// fault also bumps the error counter.
pub fn route<H: Host + ?Sized>(
    request: &Request,
    host: &mut H,
    metrics: &mut BridgeMetrics,
) -> Response {
    let key = request.route_key();
    let outcome = match key.as_str() {
        _ if request.method == "OPTIONS" => Ok(Response::empty()),
        "GET_health" => Ok(json_ok(&metrics.health())),
        "GET_state" => Ok(json_ok(&observe(host).0)),
        "GET_legal" => Ok(json_ok(&observe(host).1)),
        "POST_action" => handle_action(request, host),
        "POST_reset" => Ok(json_ok(&ActionResult::failure(RESET_HINT))),
        "POST_config" => Ok(handle_config(request)),
        _ => Ok(Response::json(404, error_envelope("Not found"))),
    };

    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            let detail = err.to_string();
            error!(
                target: "card_bridge::server",
                route = %key,
                error = %detail,
                "request.failed"
            );
            metrics.record_error(detail.clone());
            Response::json(500, error_envelope(&detail))
        }
    };
    metrics.record_request();
    debug!(
        target: "card_bridge::server",
        route = %key,
        status = response.status,
        "request.completed"
    );
    response
}

fn json_ok<T: serde::Serialize + ?Sized>(document: &T) -> Response {
    Response::json(200, encode_document(document))
}

fn handle_action<H: Host + ?Sized>(request: &Request, host: &mut H) -> Result<Response, HandlerError> {
    let Some(body) = request.body.as_deref().and_then(decode_document) else {
        return Ok(json_ok(&ActionResult::failure("Invalid JSON body")));
    };
    let command = match ActionCommand::from_json(&body) {
        Ok(command) => command,
        Err(err) => return Ok(json_ok(&ActionResult::failure(err.to_string()))),
    };
    let result = dispatch(host, &command)?;
    Ok(json_ok(&result))
}

fn handle_config(request: &Request) -> Response {
    let config = request
        .body
        .as_deref()
        .and_then(decode_document)
        .unwrap_or_else(|| JsonValue::Object(Default::default()));
    json_ok(&json!({ "ok": true, "config": config }))
}
