//! # Middleware Incluido
//! src/middleware/builtin.rs
//!
//! El servidor siempre envuelve el handler del usuario con estos tres,
//! del más externo al más interno:
//!
//! 1. `wrap_options`: marca el request con la opción `trust_proxy`
//! 2. `wrap_error_handler`: convierte errores y panics en 400/500
//! 3. `wrap_head`: atiende HEAD como GET y descarta el body

use super::{around, compose, Middleware};
use crate::error::HandlerError;
use crate::http::{Method, Response, StatusCode};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

/// Los tres middleware incluidos, ya compuestos
pub fn builtins(trust_proxy: bool) -> Middleware {
    compose(vec![
        wrap_options(trust_proxy),
        wrap_error_handler(),
        wrap_head(),
    ])
}

pub fn wrap_options(trust_proxy: bool) -> Middleware {
    around(move |request, next| next(request.set_trust_proxy(trust_proxy)))
}

/// Ningún error ni panic del handler llega al servidor
///
/// - `HandlerError::BadBody` → 400
/// - cualquier otro error → 500 (se registra)
/// - panic → 500 (se registra)
///
/// El body es siempre el reason phrase; el detalle queda sólo en el log.
/// En un HEAD el error se responde sin body, igual que un éxito.
pub fn wrap_error_handler() -> Middleware {
    around(|request, next| {
        let method = request.method();
        let url = request.url().to_string();
        let head = method == Method::HEAD;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| next(request)));

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(HandlerError::BadBody(reason))) => {
                debug!(%method, %url, %reason, "rejected request body");
                generic(StatusCode::BadRequest, head)
            }
            Ok(Err(err)) => {
                error!(%method, %url, error = %err, "handler failed");
                generic(StatusCode::InternalServerError, head)
            }
            Err(payload) => {
                error!(%method, %url, panic = %panic_message(payload.as_ref()), "handler panicked");
                generic(StatusCode::InternalServerError, head)
            }
        };
        Ok(response)
    })
}

pub fn wrap_head() -> Middleware {
    around(|request, next| {
        if request.method() == Method::HEAD {
            next(request.set_method(Method::GET)).map(Response::none)
        } else {
            next(request)
        }
    })
}

fn generic(status: StatusCode, head: bool) -> Response {
    let response = Response::new(status);
    if head {
        response
    } else {
        response.text(status.reason_phrase())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;
    use crate::middleware::{handler, HandlerResult};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn run(mw: Middleware, inner: impl Fn(Request) -> HandlerResult + Send + Sync + 'static, req: Request) -> Response {
        mw(handler(inner))(req).unwrap()
    }

    fn body_text(response: Response) -> String {
        let bytes = response.into_parts().2.into_bytes().unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_bad_body_is_400() {
        let response = run(
            wrap_error_handler(),
            |req| {
                let _: Vec<u32> = req.json()?;
                Ok(Response::default())
            },
            Request::new(Method::POST, "/").with_body(b"{not json".to_vec()),
        );
        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(body_text(response), "Bad Request");
    }

    #[test]
    fn test_internal_error_is_500_without_details() {
        let response = run(
            wrap_error_handler(),
            |_| Err(HandlerError::internal("database password is hunter2")),
            Request::new(Method::GET, "/"),
        );
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(body_text(response), "Internal Server Error");
    }

    #[test]
    fn test_panic_is_500() {
        let response = run(
            wrap_error_handler(),
            |_| panic!("boom"),
            Request::new(Method::GET, "/"),
        );
        assert_eq!(response.status(), StatusCode::InternalServerError);
    }

    #[test]
    fn test_head_dispatched_as_get() {
        let seen = Arc::new(Mutex::new(None));
        let seen_inner = Arc::clone(&seen);

        let response = run(
            wrap_head(),
            move |req| {
                *seen_inner.lock() = Some(req.method());
                Ok(Response::default().text("body"))
            },
            Request::new(Method::HEAD, "/"),
        );

        assert_eq!(*seen.lock(), Some(Method::GET));
        assert!(response.body().is_none());
        assert!(response.header("Content-Type").is_none());
    }

    #[test]
    fn test_options_stamp_trust_proxy() {
        let response = run(
            wrap_options(true),
            |req| Ok(Response::default().text(req.ip().to_string())),
            Request::new(Method::GET, "/")
                .with_address("127.0.0.1")
                .set_header("X-Forwarded-For", "203.0.113.9"),
        );
        assert_eq!(body_text(response), "203.0.113.9");
    }

    #[test]
    fn test_builtins_order() {
        // HEAD + panic: el handler de errores está afuera de wrap_head
        let response = run(
            builtins(false),
            |_| panic!("head panic"),
            Request::new(Method::HEAD, "/"),
        );
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert!(response.body().is_none());
        assert!(response.header("Content-Type").is_none());
    }

    #[test]
    fn test_head_error_has_no_body() {
        let response = run(
            builtins(false),
            |_| Err(HandlerError::internal("boom")),
            Request::new(Method::HEAD, "/"),
        );
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert!(response.body().is_none());

        let response = run(
            builtins(false),
            |req| {
                let _: Vec<u32> = req.json()?;
                Ok(Response::default())
            },
            Request::new(Method::HEAD, "/").with_body(b"{".to_vec()),
        );
        assert_eq!(response.status(), StatusCode::BadRequest);
        assert!(response.body().is_none());
    }
}
