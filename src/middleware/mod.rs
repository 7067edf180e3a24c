//! # Middleware
//! src/middleware/mod.rs
//!
//! Un [`Handler`] transforma un `Request` en un `Response` (o un error).
//! Un [`Middleware`] envuelve un handler y retorna otro.
//!
//! ```text
//! compose([m1, m2, m3])(handler) = m1(m2(m3(handler)))
//!
//!   request ──▶ m1 ──▶ m2 ──▶ m3 ──▶ handler
//!   response ◀── m1 ◀── m2 ◀── m3 ◀──┘
//! ```
//!
//! El primero de la lista es el más externo: ve el request antes que
//! nadie y el response al final.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use mini_http::http::{Method, Request, Response};
//! use mini_http::middleware::{self, around, compose};
//!
//! let add_header = around(|req, next| {
//!     next(req).map(|res| res.set_header("X-Powered-By", "mini_http"))
//! });
//!
//! let app = compose(vec![add_header])(middleware::handler(|_req| {
//!     Ok(Response::default().text("ok"))
//! }));
//!
//! let response = app(Request::new(Method::GET, "/")).unwrap();
//! assert_eq!(response.header("x-powered-by"), Some("mini_http"));
//! ```

pub mod batteries;
pub mod builtin;

use crate::error::HandlerError;
use crate::http::{Request, Response};
use std::sync::Arc;

/// Resultado de un handler
pub type HandlerResult = Result<Response, HandlerError>;

/// `Request -> Response`, compartible entre threads de conexión
pub type Handler = Arc<dyn Fn(Request) -> HandlerResult + Send + Sync>;

/// `Handler -> Handler`
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Convierte una closure en [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(Request) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Convierte una closure `Handler -> Handler` en [`Middleware`]
pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Middleware a partir de una función `(request, next) -> result`
///
/// Es la forma más común: hacer algo antes, llamar `next` y hacer algo
/// con el resultado.
pub fn around<F>(f: F) -> Middleware
where
    F: Fn(Request, &Handler) -> HandlerResult + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: Handler| -> Handler {
        let f = Arc::clone(&f);
        Arc::new(move |request: Request| f(request, &next))
    })
}

/// Middleware que no hace nada
pub fn identity() -> Middleware {
    Arc::new(|next: Handler| next)
}

/// Compone una lista de middleware; el primero queda más afuera
///
/// Componer una lista vacía es [`identity`].
pub fn compose(middleware: impl IntoIterator<Item = Middleware>) -> Middleware {
    let chain: Vec<Middleware> = middleware.into_iter().collect();
    if chain.is_empty() {
        return identity();
    }

    Arc::new(move |inner: Handler| {
        chain
            .iter()
            .rev()
            .fold(inner, |wrapped, outer| outer(wrapped))
    })
}
