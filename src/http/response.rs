//! # Construcción de Respuestas HTTP
//!
//! Igual que `Request`, una `Response` se deriva en vez de mutarse: el
//! handler crea una respuesta vacía y cada middleware, al volver, puede
//! producir una nueva a partir de la anterior.
//!
//! Justo antes de escribirla en el socket el servidor llama
//! [`Response::finalize`] una única vez para dejar body y headers
//! consistentes.
//!
//! ## Formato en el socket
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/plain\r\n
//! Content-Length: 2\r\n
//! \r\n
//! ok
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use mini_http::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .text("Hello")
//!     .set_header("X-Request-Id", "abc123")
//!     .finalize();
//!
//! assert_eq!(response.header("Content-Length"), Some("5"));
//! ```

use super::{Body, BodyStream, HeaderList, Request, StatusCode, Store};
use crate::error::HandlerError;
use serde::Serialize;
use std::any::Any;

/// Representa una respuesta HTTP
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderList,
    store: Store,
    body: Body,
}

impl Response {
    /// Crea una respuesta vacía con el código de estado especificado
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    // === Lectura ===

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Separa la respuesta en status, headers y body
    pub fn into_parts(self) -> (StatusCode, HeaderList, Body) {
        (self.status, self.headers, self.body)
    }

    // === Derivar una respuesta nueva ===

    pub fn set_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn set_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn append_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn delete_header(mut self, name: &str) -> Self {
        self.headers.delete(name);
        self
    }

    pub fn update_header<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(Option<&str>) -> Option<String>,
    {
        self.headers.update(name, f);
        self
    }

    pub fn set_store<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.store.insert(key, value);
        self
    }

    pub fn tap<F: FnOnce(Self) -> Self>(self, f: F) -> Self {
        f(self)
    }

    fn set_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    fn set_content_type(self, content_type: Option<&str>) -> Self {
        match content_type {
            Some(t) => self.set_header("Content-Type", t),
            None => self,
        }
    }

    // === Helpers de body ===

    /// Quita el body y el `Content-Type`
    pub fn none(self) -> Self {
        self.set_body(Body::None).delete_header("Content-Type")
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.set_body(Body::from(text.into()))
            .set_header("Content-Type", "text/plain")
    }

    pub fn html(self, html: impl Into<String>) -> Self {
        self.set_body(Body::from(html.into()))
            .set_header("Content-Type", "text/html")
    }

    /// Serializa `value` como JSON
    ///
    /// # Errores
    ///
    /// `HandlerError::Internal` si `value` no se puede serializar.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, HandlerError> {
        let bytes = serde_json::to_vec(value).map_err(HandlerError::internal)?;
        Ok(self
            .set_body(Body::Bytes(bytes))
            .set_header("Content-Type", "application/json"))
    }

    pub fn bytes(self, bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        self.set_body(Body::Bytes(bytes))
            .set_content_type(content_type)
    }

    pub fn stream(self, stream: Box<dyn BodyStream>, content_type: Option<&str>) -> Self {
        self.set_body(Body::Stream(stream))
            .set_content_type(content_type)
    }

    // === Redirecciones ===

    /// Redirige a `url`. Un status que no es de redirección se
    /// reemplaza por 302 Found.
    pub fn redirect(self, url: impl Into<String>, status: StatusCode) -> Self {
        let status = if status.is_redirect() {
            status
        } else {
            StatusCode::Found
        };
        self.set_header("Location", url).set_status(status)
    }

    /// Redirige al `Referer` del request o, si no tiene, a `alt_url`
    pub fn redirect_back(self, request: &Request, alt_url: &str) -> Self {
        let url = request.header("Referer").unwrap_or(alt_url).to_string();
        self.redirect(url, StatusCode::Found)
    }

    // === Finalize ===

    /// Normaliza la respuesta justo antes de enviarla
    ///
    /// - Status sin body (204/205/304): se borra el body, `Content-Type`,
    ///   `Content-Length` y `Transfer-Encoding`.
    /// - Body de longitud conocida: `Content-Length`.
    /// - Stream de longitud desconocida: `Transfer-Encoding: chunked`.
    pub fn finalize(self) -> Self {
        if self.status.is_empty_body() {
            return self
                .none()
                .delete_header("Content-Length")
                .delete_header("Transfer-Encoding");
        }

        match self.body.length() {
            Some(len) => self
                .delete_header("Transfer-Encoding")
                .set_header("Content-Length", len.to_string()),
            None => self
                .delete_header("Content-Length")
                .set_header("Transfer-Encoding", "chunked"),
        }
    }

    /// ¿El body debe enviarse con chunked framing?
    pub fn is_chunked(&self) -> bool {
        self.header("Transfer-Encoding")
            .map(|v| v.eq_ignore_ascii_case("chunked"))
            .unwrap_or(false)
    }

    /// Status line y headers listos para el socket
    ///
    /// Formato:
    /// - Status line: `HTTP/1.1 200 OK\r\n`
    /// - Headers en orden de inserción: `Name: Value\r\n`
    /// - Línea vacía: `\r\n`
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128);

        let status_line = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.reason_phrase()
        );
        result.extend_from_slice(status_line.as_bytes());

        for (name, value) in self.headers.iter() {
            result.extend_from_slice(name.as_bytes());
            result.extend_from_slice(b": ");
            result.extend_from_slice(value.as_bytes());
            result.extend_from_slice(b"\r\n");
        }

        result.extend_from_slice(b"\r\n");
        result
    }
}
