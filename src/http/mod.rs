//! # Módulo HTTP
//!
//! Modelo de datos que fluye por todo el servidor. No conoce sockets ni
//! router: eso vive en `server` y `router`.
//!
//! - `Method` y `StatusCode`: enumeraciones cerradas del protocolo
//! - `HeaderList`: headers ordenados con búsqueda case-insensitive
//! - `Store`: bolsa opaca de valores para middlewares
//! - `Request` / `Response`: valores inmutables; los "setters" retornan
//!   un valor nuevo
//! - `Body` / `BodyStream`: body materializado o perezoso
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! Header-Name: Header-Value\r\n
//! Content-Length: 5\r\n
//! \r\n
//! hello
//! ```

pub mod body;
pub mod headers;
pub mod method;
pub mod request;
pub mod response;
pub mod status;
pub mod store;

// Re-exportamos los tipos principales para facilitar su uso
// Esto permite usar `http::Request` en vez de `http::request::Request`
pub use body::{Body, BodyStream, ReaderStream, RequestBody};
pub use headers::{Header, HeaderList};
pub use method::Method;
pub use request::{Params, Request};
pub use response::Response;
pub use status::StatusCode;
pub use store::Store;
