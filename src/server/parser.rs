//! # Parser de Requests HTTP
//! src/server/parser.rs
//!
//! Lee un request completo desde un [`SocketReader`]. El parser avanza por
//! cuatro estados:
//!
//! ```text
//! AwaitingRequestLine → AwaitingHeaders → AwaitingBody(n) → Complete
//!                              │                                ▲
//!                              └──── sin Content-Length ────────┘
//! ```
//!
//! ## Formato esperado
//!
//! ```text
//! POST /echo HTTP/1.1\r\n
//! Host: localhost\r\n
//! Content-Length: 5\r\n
//! \r\n
//! hello
//! ```
//!
//! Una request line con menos de 3 tokens es fatal para la conexión: el
//! servidor la cierra sin responder. Los headers sin `:` se ignoran.

use crate::error::ParseError;
use crate::http::{HeaderList, Method, Request};
use crate::server::socket::{SocketReader, MAX_HEADERS};
use std::io::Read;

/// Request line ya separada en sus tres partes
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestLine {
    method: Method,
    url: String,
    version: String,
}

enum ParseState {
    AwaitingRequestLine,
    AwaitingHeaders {
        line: RequestLine,
        headers: HeaderList,
    },
    AwaitingBody {
        line: RequestLine,
        headers: HeaderList,
        remaining: usize,
    },
    Complete(Request),
}

/// Lee el siguiente request de la conexión
///
/// `address` es la IP del peer, resuelta una vez por conexión.
///
/// # Errores
///
/// - `ParseError::InvalidRequest` si la request line está mal formada
/// - `ParseError::TooManyHeaders` si llegan más de `MAX_HEADERS` headers
/// - `ParseError::Socket` si el peer cerró o falló la lectura
pub fn read_request<R: Read>(
    reader: &mut SocketReader<R>,
    address: &str,
) -> Result<Request, ParseError> {
    let mut state = ParseState::AwaitingRequestLine;

    loop {
        state = match state {
            ParseState::AwaitingRequestLine => {
                let raw = reader.read_line()?;
                ParseState::AwaitingHeaders {
                    line: parse_request_line(&raw)?,
                    headers: HeaderList::new(),
                }
            }

            ParseState::AwaitingHeaders { line, mut headers } => {
                let raw = reader.read_line()?;
                if raw.is_empty() {
                    match content_length(&headers) {
                        Some(remaining) if remaining > 0 => ParseState::AwaitingBody {
                            line,
                            headers,
                            remaining,
                        },
                        _ => ParseState::Complete(build(line, headers, Vec::new(), address)),
                    }
                } else {
                    if let Some((name, value)) = parse_header(&raw) {
                        if headers.len() >= MAX_HEADERS {
                            return Err(ParseError::TooManyHeaders(MAX_HEADERS));
                        }
                        headers.append(name, value);
                    }
                    ParseState::AwaitingHeaders { line, headers }
                }
            }

            ParseState::AwaitingBody {
                line,
                headers,
                remaining,
            } => {
                let body = reader.read_exact(remaining)?;
                ParseState::Complete(build(line, headers, body, address))
            }

            ParseState::Complete(request) => return Ok(request),
        };
    }
}

/// `METHOD URL VERSION`
///
/// Los tokens extra después de la versión se ignoran.
fn parse_request_line(raw: &str) -> Result<RequestLine, ParseError> {
    let mut parts = raw.split_whitespace();

    match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(url), Some(version)) => Ok(RequestLine {
            method: Method::parse(method),
            url: url.to_string(),
            version: version.to_string(),
        }),
        _ => Err(ParseError::InvalidRequest(raw.to_string())),
    }
}

/// `Name: Value`, separando en el primer `:`
fn parse_header(raw: &str) -> Option<(&str, &str)> {
    raw.split_once(':')
        .map(|(name, value)| (name.trim(), value.trim()))
}

/// `Content-Length` válido (sin importar mayúsculas), si existe
fn content_length(headers: &HeaderList) -> Option<usize> {
    headers
        .get("Content-Length")
        .and_then(|value| value.trim().parse::<usize>().ok())
}

fn build(line: RequestLine, headers: HeaderList, body: Vec<u8>, address: &str) -> Request {
    Request::new(line.method, line.url)
        .with_version(line.version)
        .with_headers(headers)
        .with_body(body)
        .with_address(address)
}
