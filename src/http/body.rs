//! # Bodies
//! src/http/body.rs
//!
//! - [`RequestBody`]: los bytes leídos del socket (ya materializados por el
//!   parser vía `Content-Length`). Se convierten a texto o JSON recién
//!   cuando el handler lo pide.
//! - [`Body`]: el body de una respuesta. Puede no existir, estar completo
//!   en memoria o ser un stream que produce bytes hasta agotarse.

use crate::error::HandlerError;
use serde::de::DeserializeOwned;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

/// Body de un request
///
/// Clonar un `Request` no copia el body.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestBody {
    bytes: Arc<[u8]>,
}

impl RequestBody {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes: bytes.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Interpreta el body como UTF-8
    ///
    /// # Errores
    ///
    /// `HandlerError::BadBody` si los bytes no son UTF-8 válido.
    pub fn utf8(&self) -> Result<&str, HandlerError> {
        std::str::from_utf8(&self.bytes)
            .map_err(|e| HandlerError::BadBody(format!("body is not valid utf-8: {}", e)))
    }

    /// Deserializa el body como JSON
    ///
    /// # Errores
    ///
    /// `HandlerError::BadBody` si el JSON es inválido o no encaja en `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_slice(&self.bytes)
            .map_err(|e| HandlerError::BadBody(format!("invalid json body: {}", e)))
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestBody({} bytes)", self.bytes.len())
    }
}

/// Fuente perezosa de bytes para el body de una respuesta
///
/// El servidor llama `next_chunk` hasta recibir `Ok(None)`.
pub trait BodyStream: Send {
    /// Siguiente bloque de bytes, `None` al terminar
    fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Longitud total si se conoce sin consumir el stream
    fn length(&self) -> Option<usize> {
        None
    }
}

/// Tamaño de cada bloque leído por [`ReaderStream`]
const CHUNK_SIZE: usize = 16 * 1024;

/// Adapta cualquier `Read` (un archivo, por ejemplo) a `BodyStream`
pub struct ReaderStream<R> {
    reader: R,
    len: Option<usize>,
}

impl<R: Read + Send> ReaderStream<R> {
    /// Stream de longitud desconocida (se envía con chunked encoding)
    pub fn new(reader: R) -> Self {
        Self { reader, len: None }
    }

    /// Stream cuya longitud se conoce de antemano (p.ej. metadata del archivo)
    pub fn with_len(reader: R, len: usize) -> Self {
        Self { reader, len: Some(len) }
    }
}

impl<R: Read + Send> BodyStream for ReaderStream<R> {
    fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Some(buf));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn length(&self) -> Option<usize> {
        self.len
    }
}

/// Body de una respuesta
#[derive(Default)]
pub enum Body {
    /// Sin body
    #[default]
    None,

    /// Bytes completos en memoria
    Bytes(Vec<u8>),

    /// Stream perezoso
    Stream(Box<dyn BodyStream>),
}

impl Body {
    /// Longitud si se conoce estáticamente
    pub fn length(&self) -> Option<usize> {
        match self {
            Body::None => Some(0),
            Body::Bytes(bytes) => Some(bytes.len()),
            Body::Stream(stream) => stream.length(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Body::None)
    }

    /// Siguiente bloque a escribir; deja el body agotado
    pub fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        if let Body::Stream(stream) = self {
            return stream.next_chunk();
        }
        match std::mem::take(self) {
            Body::Bytes(bytes) if !bytes.is_empty() => Ok(Some(bytes)),
            _ => Ok(None),
        }
    }

    /// Consume el body completo en memoria
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next_chunk()? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::None => f.write_str("Body::None"),
            Body::Bytes(bytes) => write!(f, "Body::Bytes({} bytes)", bytes.len()),
            Body::Stream(stream) => write!(f, "Body::Stream(len: {:?})", stream.length()),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(s.into_bytes())
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Bytes(s.as_bytes().to_vec())
    }
}
