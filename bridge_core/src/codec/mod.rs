//! Wire codec: JSON documents and HTTP/1.1 framing.

pub mod http;
pub mod json;

pub use http::{has_complete_head, HttpParseError, Request, Response};
pub use json::{decode_document, encode_document, error_envelope, host_to_json, json_to_host};
