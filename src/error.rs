//! # Errores
//! src/error.rs
//!
//! Cada capa tiene su propio tipo de error:
//!
//! - [`SocketError`]: fallos del socket (bind, accept, lectura, escritura).
//!   Son fatales para la conexión o para el listener.
//! - [`ParseError`]: request mal formado. Fatal para la conexión, no se
//!   envía respuesta.
//! - [`HandlerError`]: errores de un handler. El middleware de errores los
//!   convierte en 400 o 500, nunca llegan al socket.

use std::io;

/// Errores del Wire Socket
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("socket creation failed: {0}")]
    SocketCreationFailed(#[source] io::Error),

    #[error("address already in use: {0}")]
    AddressInUse(#[source] io::Error),

    #[error("bind failed: {0}")]
    BindFailed(#[source] io::Error),

    #[error("listen failed: {0}")]
    ListenFailed(#[source] io::Error),

    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),

    /// El peer cerró la conexión (lectura de 0 bytes)
    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("recv failed: {0}")]
    RecvFailed(#[source] io::Error),

    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),

    /// El stream entregó una cantidad de bytes distinta a la declarada
    #[error("body declared {declared} bytes but produced {produced}")]
    BodyLengthMismatch { declared: usize, produced: usize },

    #[error("could not resolve peer name: {0}")]
    PeerNameFailed(#[source] io::Error),
}

/// Errores del parser de requests
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// La request line no tiene METHOD PATH VERSION
    #[error("invalid request line: {0:?}")]
    InvalidRequest(String),

    #[error("more than {0} headers")]
    TooManyHeaders(usize),

    #[error(transparent)]
    Socket(#[from] SocketError),
}

/// Errores que un handler puede retornar
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// El body no se pudo convertir al formato esperado (se responde 400)
    #[error("bad request body: {0}")]
    BadBody(String),

    /// Cualquier otro error (se responde 500)
    #[error("internal error: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Envuelve cualquier error como `Internal`
    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        HandlerError::Internal(err.into())
    }
}
