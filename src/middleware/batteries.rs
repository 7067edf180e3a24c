//! # Middleware Opcional
//! src/middleware/batteries.rs

use super::{around, identity, Middleware};
use crate::http::{Response, StatusCode};
use regex::Regex;
use std::time::Instant;
use tracing::{error, info, warn};

/// Un segmento seguido de uno o más `/` al final del path
const TRAILING_SLASH: &str = r"([^/]+)/+$";

/// Registra cada request al entrar y al salir
///
/// ```text
/// --> GET /users/42
/// <-- GET /users/42 200 3ms
/// ```
pub fn logger() -> Middleware {
    around(|request, next| {
        let method = request.method();
        let url = request.url().to_string();
        info!("--> {} {}", method, url);

        let start = Instant::now();
        let result = next(request);
        let elapsed = start.elapsed().as_millis();

        match &result {
            Ok(response) => info!(
                "<-- {} {} {} {}ms",
                method,
                url,
                response.status().as_u16(),
                elapsed
            ),
            Err(err) => warn!("<-- {} {} failed after {}ms: {}", method, url, elapsed, err),
        }
        result
    })
}

/// Redirige con 301 `/users/` a `/users` (conservando la query)
///
/// `/` no se redirige.
pub fn remove_trailing_slash() -> Middleware {
    let pattern = match Regex::new(TRAILING_SLASH) {
        Ok(pattern) => pattern,
        Err(err) => {
            error!(error = %err, "trailing slash pattern failed to compile");
            return identity();
        }
    };

    around(move |request, next| {
        if !pattern.is_match(request.path()) {
            return next(request);
        }

        let path = pattern.replace(request.path(), "$1");
        let location = if request.querystring().is_empty() {
            path.into_owned()
        } else {
            format!("{}?{}", path, request.querystring())
        };

        Ok(Response::default().redirect(location, StatusCode::MovedPermanently))
    })
}
