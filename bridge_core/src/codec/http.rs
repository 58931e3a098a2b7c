use std::collections::BTreeMap;

use thiserror::Error;

const HEAD_SEPARATOR: &[u8] = b"\r\n\r\n";
const BARE_HEAD_SEPARATOR: &[u8] = b"\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpParseError {
    #[error("empty request")]
    Empty,
    #[error("malformed request line: {0}")]
    MalformedRequestLine(String),
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),
}

/// One parsed request. Header names are lowercased; the last duplicate wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Parse a buffered request.
    ///
    /// The body is whatever follows the first blank line; `Content-Length`
    /// is not consulted.
    pub fn parse(raw: &[u8]) -> Result<Self, HttpParseError> {
        let (head, body) = match find_head_end(raw) {
            Some((head_end, body_start)) => (&raw[..head_end], Some(&raw[body_start..])),
            None => (raw, None),
        };
        let head = String::from_utf8_lossy(head);
        let mut lines = head.lines();

        let request_line = lines
            .by_ref()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or(HttpParseError::Empty)?;
        let mut parts = request_line.split_whitespace();
        let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(target), Some(version), None) => (method, target, version),
            _ => return Err(HttpParseError::MalformedRequestLine(request_line.to_string())),
        };
        if !version.starts_with("HTTP/1.") {
            return Err(HttpParseError::UnsupportedVersion(version.to_string()));
        }

        let mut headers = BTreeMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        Ok(Self {
            method: method.to_ascii_uppercase(),
            target: target.to_string(),
            version: version.to_string(),
            headers,
            body: body.filter(|bytes| !bytes.is_empty()).map(<[u8]>::to_vec),
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Target without the query string or leading slashes.
    pub fn path(&self) -> &str {
        let without_query = self
            .target
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(&self.target);
        without_query.trim_start_matches('/')
    }

    /// Routing key, e.g. `GET_state` or `POST_action`.
    pub fn route_key(&self) -> String {
        format!("{}_{}", self.method, self.path())
    }
}

/// Whether the buffer already holds a complete request head.
pub fn has_complete_head(raw: &[u8]) -> bool {
    find_head_end(raw).is_some()
}

/// End of the head and start of the body.
fn find_head_end(raw: &[u8]) -> Option<(usize, usize)> {
    if let Some(pos) = find(raw, HEAD_SEPARATOR) {
        return Some((pos, pos + HEAD_SEPARATOR.len()));
    }
    find(raw, BARE_HEAD_SEPARATOR).map(|pos| (pos, pos + BARE_HEAD_SEPARATOR.len()))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON,
            body,
        }
    }

    /// Empty 200, used for CORS preflight.
    pub fn empty() -> Self {
        Self::json(200, Vec::new())
    }

    pub fn status_text(&self) -> &'static str {
        status_text(self.status)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             \r\n",
            self.status,
            self.status_text(),
            self.content_type,
            self.body.len()
        );
        let mut bytes = Vec::with_capacity(head.len() + self.body.len());
        bytes.extend_from_slice(head.as_bytes());
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
