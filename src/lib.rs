//! # mini_http
//! src/lib.rs
//!
//! Servidor HTTP/1.1 mínimo implementado desde los sockets: un thread por
//! conexión, middleware componible y un router por segmentos.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: tipos del protocolo (métodos, status, headers, request, response)
//! - `server`: socket, parser de requests y servidor TCP
//! - `middleware`: composición de handlers y middleware incluido
//! - `router`: enrutamiento por árbol de segmentos
//! - `error`: errores de cada capa
//! - `config` / `logging`: CLI y tracing
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use mini_http::http::{Method, Response};
//! use mini_http::middleware::handler;
//! use mini_http::router::Router;
//! use mini_http::server::Server;
//!
//! let app = Router::root(vec![
//!     Router::get(handler(|_req| Ok(Response::default().text("ok")))),
//! ]);
//!
//! let server = Server::new(app.into_handler(), false);
//! server.boot(3000).expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod server;
