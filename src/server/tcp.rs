//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread acepta conexiones y cada conexión se procesa en su propio
//! thread:
//!
//! ```text
//! loop {
//!     parsear request → handler → finalize → escribir response
//! }
//! ```
//!
//! El loop de una conexión termina cuando el parser falla (el peer cerró,
//! request mal formado), cuando falla una escritura o después de un
//! request con `Connection: close`. Al salir, la conexión siempre se
//! quita del set de conexiones vivas y el socket se cierra.
//!
//! ## Estado compartido
//!
//! El listener y el set de conexiones vivas están detrás de un único
//! `Mutex`. El lock nunca se mantiene durante I/O bloqueante.
//!
//! `halt()` incrementa una generación. Un socket aceptado por un accept
//! loop de una generación anterior se cierra en vez de registrarse, así
//! una conexión que llega justo durante `halt()` no queda viva.

use crate::error::SocketError;
use crate::http::{Request, Response, StatusCode};
use crate::middleware::{builtin, Handler};
use crate::server::parser;
use crate::server::socket::Socket;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

/// Servidor HTTP/1.1 thread-per-connection
pub struct Server {
    inner: Arc<Inner>,
}

struct Inner {
    /// Handler raíz, ya envuelto por el middleware incluido
    handler: Handler,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    listener: Option<Arc<Socket>>,
    live: HashMap<u64, Arc<Socket>>,
    generation: u64,
    next_id: u64,
}

impl Server {
    /// Crea un servidor que atiende con `handler`
    ///
    /// El handler se envuelve con el middleware incluido (opciones, manejo
    /// de errores, HEAD).
    pub fn new(handler: Handler, trust_proxy: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                handler: builtin::builtins(trust_proxy)(handler),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Escucha en `0.0.0.0:port` y arranca el accept loop
    ///
    /// Si el servidor ya estaba escuchando, primero se detiene.
    pub fn boot(&self, port: u16) -> Result<(), SocketError> {
        self.boot_on(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    /// Igual que [`Server::boot`] pero en una dirección específica
    pub fn boot_on(&self, addr: SocketAddr) -> Result<(), SocketError> {
        self.halt();

        let listener = Arc::new(Socket::listen_on(addr)?);
        let generation = {
            let mut state = self.inner.state.lock();
            state.listener = Some(Arc::clone(&listener));
            state.generation
        };

        info!(
            addr = %listener.local_addr().unwrap_or(addr),
            "server listening"
        );

        let inner = Arc::clone(&self.inner);
        let accept_listener = Arc::clone(&listener);
        let spawned = thread::Builder::new()
            .name("mini_http-accept".to_string())
            .spawn(move || inner.accept_loop(accept_listener, generation));

        if let Err(e) = spawned {
            self.halt();
            return Err(SocketError::SocketCreationFailed(e));
        }
        Ok(())
    }

    /// Cierra el listener y todas las conexiones abiertas
    ///
    /// Los threads bloqueados en `accept`/`recv` se despiertan con error y
    /// terminan solos.
    pub fn halt(&self) {
        self.inner.halt();
    }

    /// Dirección en la que escucha (útil con el puerto 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        let state = self.inner.state.lock();
        state.listener.as_ref().and_then(|l| l.local_addr())
    }

    /// Cuántas conexiones están abiertas ahora
    pub fn live_connections(&self) -> usize {
        self.inner.state.lock().live.len()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.inner.halt();
    }
}

impl Inner {
    fn halt(&self) {
        let (listener, live) = {
            let mut state = self.state.lock();
            state.generation += 1;
            (state.listener.take(), std::mem::take(&mut state.live))
        };

        if let Some(listener) = listener {
            listener.shutdown();
            info!(connections = live.len(), "server halted");
        }
        for socket in live.values() {
            socket.shutdown();
        }
    }

    fn accept_loop(self: Arc<Self>, listener: Arc<Socket>, generation: u64) {
        loop {
            let client = match listener.accept() {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    debug!(error = %e, "accept loop stopped");
                    break;
                }
            };

            let id = {
                let mut state = self.state.lock();
                if state.generation != generation {
                    None
                } else {
                    state.next_id += 1;
                    let id = state.next_id;
                    state.live.insert(id, Arc::clone(&client));
                    Some(id)
                }
            };

            let Some(id) = id else {
                // halt() corrió entre accept y el registro
                client.shutdown();
                continue;
            };

            let inner = Arc::clone(&self);
            let conn = Arc::clone(&client);
            let spawned = thread::Builder::new()
                .name(format!("mini_http-conn-{}", id))
                .spawn(move || inner.serve(id, conn));

            if let Err(e) = spawned {
                warn!(error = %e, "could not spawn connection thread");
                self.state.lock().live.remove(&id);
                client.shutdown();
            }
        }

        // Un boot() posterior ya puede haber instalado otro listener
        let still_current = {
            let state = self.state.lock();
            state
                .listener
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &listener))
        };
        if still_current {
            self.halt();
        }
    }

    fn serve(self: Arc<Self>, id: u64, socket: Arc<Socket>) {
        let _guard = ConnectionGuard {
            inner: Arc::clone(&self),
            id,
            socket: Arc::clone(&socket),
        };

        let address = match socket.peer_name() {
            Ok(address) => address.to_string(),
            Err(e) => {
                debug!(id, error = %e, "dropping connection without peer");
                return;
            }
        };
        debug!(id, peer = %address, "connection accepted");

        let mut reader = socket.reader();
        loop {
            let request = match parser::read_request(&mut reader, &address) {
                Ok(request) => request,
                Err(e) => {
                    debug!(id, reason = %e, "connection loop finished");
                    break;
                }
            };

            let close = wants_close(&request);
            let response = match (self.handler)(request) {
                Ok(response) => response,
                Err(e) => {
                    error!(id, error = %e, "unhandled handler error");
                    Response::new(StatusCode::InternalServerError).text("Internal Server Error")
                }
            };

            if let Err(e) = write_response(&socket, response.finalize()) {
                warn!(id, error = %e, "failed to write response");
                break;
            }
            if close {
                debug!(id, "closing after Connection: close");
                break;
            }
        }
    }
}

/// Quita la conexión del set y la cierra, pase lo que pase en `serve`
struct ConnectionGuard {
    inner: Arc<Inner>,
    id: u64,
    socket: Arc<Socket>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.inner.state.lock().live.remove(&self.id);
        self.socket.shutdown();
    }
}

fn wants_close(request: &Request) -> bool {
    request
        .header("Connection")
        .map(|value| value.eq_ignore_ascii_case("close"))
        .unwrap_or(false)
}

/// Escribe headers y body. Los streams sin longitud van con chunked framing.
///
/// Con `Content-Length` nunca se escriben más bytes de los declarados; si
/// el stream entrega otra cantidad se retorna `BodyLengthMismatch` y la
/// conexión se cierra.
fn write_response(socket: &Socket, response: Response) -> Result<(), SocketError> {
    socket.write(&response.head_bytes())?;

    let chunked = response.is_chunked();
    let (_, _, mut body) = response.into_parts();
    let declared = if chunked { None } else { body.length() };
    let mut produced = 0usize;

    while let Some(chunk) = body.next_chunk().map_err(SocketError::WriteFailed)? {
        if chunk.is_empty() {
            continue;
        }
        if chunked {
            socket.write(format!("{:x}\r\n", chunk.len()).as_bytes())?;
            socket.write(&chunk)?;
            socket.write(b"\r\n")?;
            continue;
        }

        let room = declared.map_or(chunk.len(), |declared| declared.saturating_sub(produced));
        socket.write(&chunk[..chunk.len().min(room)])?;
        produced += chunk.len();

        if let Some(declared) = declared.filter(|&declared| produced > declared) {
            return Err(SocketError::BodyLengthMismatch { declared, produced });
        }
    }

    if chunked {
        socket.write(b"0\r\n\r\n")?;
    }
    match declared {
        Some(declared) if produced != declared => {
            Err(SocketError::BodyLengthMismatch { declared, produced })
        }
        _ => Ok(()),
    }
}
