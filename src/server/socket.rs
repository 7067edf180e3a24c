//! # Wire Socket
//! src/server/socket.rs
//!
//! Envoltura delgada sobre un socket TCP (de escucha o aceptado):
//!
//! - `listen(port)`: crea, activa `SO_REUSEADDR`, hace bind y listen
//! - `accept()`: bloquea hasta la siguiente conexión
//! - `write(bytes)`: escribe todo el buffer aunque `send` acepte sólo una
//!   parte
//! - `shutdown()`: idempotente; se puede llamar desde otro thread para
//!   despertar un `accept`/`recv` bloqueado
//!
//! La lectura vive en [`SocketReader`], que tiene su propio buffer y
//! pertenece al thread de la conexión.
//!
//! Un peer que se desconecta nunca produce SIGPIPE: en Linux se envía con
//! `MSG_NOSIGNAL` y en macOS se activa `SO_NOSIGPIPE`, así que el error
//! aparece como `WriteFailed`.

use crate::error::SocketError;
use socket2::{Domain, Protocol, Type};
use std::io::{self, BufRead, BufReader, Read};
use std::net::{Ipv4Addr, Shutdown, SocketAddr};
use std::sync::{Arc, OnceLock};

/// Largo máximo de una línea (request line o header)
pub const MAX_LINE_LEN: usize = 8192;

/// Headers aceptados por request antes de la línea vacía
pub const MAX_HEADERS: usize = 100;

/// Conexiones pendientes en la cola del listener
const BACKLOG: i32 = 128;

#[cfg(target_os = "linux")]
const SEND_FLAGS: i32 = libc::MSG_NOSIGNAL;
#[cfg(not(target_os = "linux"))]
const SEND_FLAGS: i32 = 0;

/// Socket TCP
#[derive(Debug)]
pub struct Socket {
    inner: socket2::Socket,

    /// IP del peer, resuelta la primera vez que se pide
    peer_name: OnceLock<String>,
}

impl Socket {
    /// Abre un socket escuchando en `0.0.0.0:port`
    pub fn listen(port: u16) -> Result<Self, SocketError> {
        Self::listen_on(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    /// Abre un socket escuchando en `addr`
    pub fn listen_on(addr: SocketAddr) -> Result<Self, SocketError> {
        let socket = socket2::Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(SocketError::SocketCreationFailed)?;

        socket
            .set_reuse_address(true)
            .map_err(SocketError::SocketCreationFailed)?;
        disable_sigpipe(&socket);

        socket.bind(&addr.into()).map_err(|e| {
            if e.kind() == io::ErrorKind::AddrInUse {
                SocketError::AddressInUse(e)
            } else {
                SocketError::BindFailed(e)
            }
        })?;

        socket.listen(BACKLOG).map_err(SocketError::ListenFailed)?;

        Ok(Self::from_raw(socket))
    }

    fn from_raw(inner: socket2::Socket) -> Self {
        Self {
            inner,
            peer_name: OnceLock::new(),
        }
    }

    /// Espera la siguiente conexión entrante
    pub fn accept(&self) -> Result<Socket, SocketError> {
        loop {
            match self.inner.accept() {
                Ok((client, _)) => {
                    disable_sigpipe(&client);
                    return Ok(Self::from_raw(client));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SocketError::AcceptFailed(e)),
            }
        }
    }

    /// Dirección local (útil al hacer bind en el puerto 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr().ok().and_then(|addr| addr.as_socket())
    }

    /// IP numérica del peer
    ///
    /// Se resuelve una sola vez por conexión y queda cacheada.
    pub fn peer_name(&self) -> Result<&str, SocketError> {
        if let Some(name) = self.peer_name.get() {
            return Ok(name.as_str());
        }

        let addr = self.inner.peer_addr().map_err(SocketError::PeerNameFailed)?;
        let name = match addr.as_socket() {
            Some(addr) => addr.ip().to_string(),
            None => {
                return Err(SocketError::PeerNameFailed(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "peer is not an inet address",
                )))
            }
        };

        Ok(self.peer_name.get_or_init(|| name).as_str())
    }

    /// Escribe todos los bytes, reintentando cuando `send` es parcial
    pub fn write(&self, bytes: &[u8]) -> Result<(), SocketError> {
        let mut sent = 0;
        while sent < bytes.len() {
            match self.inner.send_with_flags(&bytes[sent..], SEND_FLAGS) {
                Ok(0) => {
                    return Err(SocketError::WriteFailed(io::Error::from(
                        io::ErrorKind::WriteZero,
                    )))
                }
                Ok(n) => sent += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SocketError::WriteFailed(e)),
            }
        }
        Ok(())
    }

    /// Cierra lectura y escritura. Llamarlo dos veces no hace nada.
    ///
    /// Un thread bloqueado en `accept` o `recv` sobre este socket se
    /// despierta con error.
    pub fn shutdown(&self) {
        // ENOTCONN si ya estaba cerrado: da igual
        let _ = self.inner.shutdown(Shutdown::Both);
    }

    /// Shutdown y liberación del descriptor
    pub fn close(self) {
        self.shutdown();
    }

    /// Lector con buffer para este socket
    pub fn reader(self: &Arc<Self>) -> SocketReader<SocketStream> {
        SocketReader::new(SocketStream(Arc::clone(self)))
    }
}

#[cfg(target_vendor = "apple")]
fn disable_sigpipe(socket: &socket2::Socket) {
    let _ = socket.set_nosigpipe(true);
}

#[cfg(not(target_vendor = "apple"))]
fn disable_sigpipe(_socket: &socket2::Socket) {}

/// `Read` sobre un socket compartido
pub struct SocketStream(Arc<Socket>);

impl Read for SocketStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.0.inner).read(buf)
    }
}

/// Lector bloqueante con buffer: bytes, líneas y bodies de largo fijo
///
/// Es genérico sobre `Read` para poder probar el parser con bytes en
/// memoria.
pub struct SocketReader<R> {
    inner: BufReader<R>,
}

impl<R: Read> SocketReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(MAX_LINE_LEN, reader),
        }
    }

    /// Bytes disponibles en el buffer; error si el peer cerró
    fn fill(&mut self) -> Result<&[u8], SocketError> {
        loop {
            match self.inner.fill_buf() {
                Ok([]) => return Err(SocketError::ConnectionClosed),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SocketError::RecvFailed(e)),
            }
        }
        Ok(self.inner.buffer())
    }

    /// Lee un byte
    pub fn read_byte(&mut self) -> Result<u8, SocketError> {
        let byte = self.fill()?[0];
        self.inner.consume(1);
        Ok(byte)
    }

    /// Lee hasta `\n` y descarta los `\r`
    pub fn read_line(&mut self) -> Result<String, SocketError> {
        let mut line = Vec::new();
        loop {
            let (found, used) = {
                let available = self.fill()?;
                match available.iter().position(|&b| b == b'\n') {
                    Some(i) => {
                        line.extend_from_slice(&available[..i]);
                        (true, i + 1)
                    }
                    None => {
                        line.extend_from_slice(available);
                        (false, available.len())
                    }
                }
            };
            self.inner.consume(used);

            if line.len() > MAX_LINE_LEN {
                return Err(SocketError::LineTooLong(MAX_LINE_LEN));
            }
            if found {
                break;
            }
        }

        line.retain(|&b| b != b'\r');
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Lee exactamente `len` bytes
    pub fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, SocketError> {
        // No reservar de golpe lo que diga un Content-Length arbitrario
        let mut body = Vec::with_capacity(len.min(64 * 1024));
        let read = Read::take(&mut self.inner, len as u64)
            .read_to_end(&mut body)
            .map_err(SocketError::RecvFailed)?;

        if read < len {
            return Err(SocketError::ConnectionClosed);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpStream;

    #[test]
    fn test_read_line_strips_cr() {
        let mut reader = SocketReader::new(&b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"[..]);
        assert_eq!(reader.read_line().unwrap(), "GET / HTTP/1.1");
        assert_eq!(reader.read_line().unwrap(), "Host: x");
        assert_eq!(reader.read_line().unwrap(), "");
        assert!(matches!(reader.read_line(), Err(SocketError::ConnectionClosed)));
    }

    #[test]
    fn test_read_line_bare_lf() {
        let mut reader = SocketReader::new(&b"a\nb\n"[..]);
        assert_eq!(reader.read_line().unwrap(), "a");
        assert_eq!(reader.read_line().unwrap(), "b");
    }

    #[test]
    fn test_read_line_too_long() {
        let long = vec![b'a'; MAX_LINE_LEN + 10];
        let mut reader = SocketReader::new(&long[..]);
        assert!(matches!(reader.read_line(), Err(SocketError::LineTooLong(_))));
    }

    #[test]
    fn test_read_byte_and_exact() {
        let mut reader = SocketReader::new(&b"xhello world"[..]);
        assert_eq!(reader.read_byte().unwrap(), b'x');
        assert_eq!(reader.read_exact(5).unwrap(), b"hello");
        assert_eq!(reader.read_exact(6).unwrap(), b" world");
        assert!(matches!(reader.read_byte(), Err(SocketError::ConnectionClosed)));
    }

    #[test]
    fn test_read_exact_short() {
        let mut reader = SocketReader::new(&b"abc"[..]);
        assert!(matches!(reader.read_exact(5), Err(SocketError::ConnectionClosed)));
    }

    #[test]
    fn test_listen_accept_write() {
        let listener = Socket::listen_on("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).unwrap();
        let accepted = Arc::new(listener.accept().unwrap());
        assert_eq!(accepted.peer_name().unwrap(), "127.0.0.1");
        // cacheado
        assert_eq!(accepted.peer_name().unwrap(), "127.0.0.1");

        client.write_all(b"ping\r\n").unwrap();
        let mut reader = accepted.reader();
        assert_eq!(reader.read_line().unwrap(), "ping");

        accepted.write(b"pong").unwrap();
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn test_address_in_use() {
        let first = Socket::listen_on("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = first.local_addr().unwrap();

        // SO_REUSEADDR no permite dos listeners activos en el mismo puerto
        let second = Socket::listen_on(addr);
        assert!(matches!(second, Err(SocketError::AddressInUse(_))));
    }

    #[test]
    fn test_shutdown_unblocks_reader() {
        let listener = Socket::listen_on("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).unwrap();
        let accepted = Arc::new(listener.accept().unwrap());

        let mut reader = accepted.reader();
        let waiter = std::thread::spawn(move || reader.read_line());

        std::thread::sleep(std::time::Duration::from_millis(50));
        accepted.shutdown();
        accepted.shutdown();

        assert!(waiter.join().unwrap().is_err());
    }
}
