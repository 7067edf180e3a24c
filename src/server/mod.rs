//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto (`socket`)
//! 2. Acepta conexiones, un thread por conexión (`tcp`)
//! 3. Lee y parsea requests HTTP/1.1 (`parser`)
//! 4. Escribe las responses en el mismo orden en que llegaron los requests

pub mod parser;
pub mod socket;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use socket::{Socket, SocketReader};
pub use tcp::Server;
