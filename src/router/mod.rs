//! # Sistema de Routing
//! src/router/mod.rs
//!
//! El router es un árbol. Cada `Node` consume un segmento del path y cada
//! `Route` atiende un método cuando ya no quedan segmentos.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → (middleware de los nodos) → Handler → Response
//! ```
//!
//! El path se separa en segmentos con una raíz sintética `/`:
//!
//! ```text
//! /users/42  →  ["/", "/users", "/42"]
//! ```
//!
//! Un segmento `/:nombre` captura cualquier valor. Entre hermanos gana el
//! primero declarado que complete la búsqueda. Si ninguna ruta coincide
//! se responde 404 Not Found.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use mini_http::http::{Method, Request, Response, StatusCode};
//! use mini_http::middleware::handler;
//! use mini_http::router::Router;
//!
//! let router = Router::root(vec![
//!     Router::node("/users", vec![], vec![
//!         Router::node("/:id", vec![], vec![
//!             Router::get(handler(|req| {
//!                 let id = req.param("id").unwrap_or_default().to_string();
//!                 Ok(Response::default().text(id))
//!             })),
//!         ]),
//!     ]),
//! ]);
//!
//! let app = router.into_handler();
//! let response = app(Request::new(Method::GET, "/users/42")).unwrap();
//! assert_eq!(response.status(), StatusCode::Ok);
//!
//! let missing = app(Request::new(Method::GET, "/posts")).unwrap();
//! assert_eq!(missing.status(), StatusCode::NotFound);
//! ```

use crate::http::{Method, Params, Request, Response, StatusCode};
use crate::middleware::{compose, Handler, HandlerResult, Middleware};
use std::sync::Arc;

/// Árbol de rutas
pub enum Router {
    /// Consume un segmento (literal o `/:param`) y sigue por los hijos
    Node {
        segment: String,
        middleware: Vec<Middleware>,
        children: Vec<Router>,
    },

    /// Hoja: atiende `method` si ya se consumió todo el path
    Route { method: Method, handler: Handler },
}

/// Ruta encontrada, con sus parámetros y su handler ya envuelto
struct Match {
    handler: Handler,
    params: Params,
}

impl Router {
    /// Nodo para `segment`. Se agrega el `/` inicial si falta.
    pub fn node(
        segment: impl Into<String>,
        middleware: Vec<Middleware>,
        children: Vec<Router>,
    ) -> Self {
        let segment = segment.into();
        let segment = if segment.starts_with('/') {
            segment
        } else {
            format!("/{}", segment)
        };
        Router::Node {
            segment,
            middleware,
            children,
        }
    }

    /// Nodo raíz (segmento `/`)
    pub fn root(children: Vec<Router>) -> Self {
        Self::node("/", Vec::new(), children)
    }

    pub fn route(method: Method, handler: Handler) -> Self {
        Router::Route { method, handler }
    }

    pub fn get(handler: Handler) -> Self {
        Self::route(Method::GET, handler)
    }

    pub fn post(handler: Handler) -> Self {
        Self::route(Method::POST, handler)
    }

    pub fn put(handler: Handler) -> Self {
        Self::route(Method::PUT, handler)
    }

    pub fn patch(handler: Handler) -> Self {
        Self::route(Method::PATCH, handler)
    }

    pub fn delete(handler: Handler) -> Self {
        Self::route(Method::DELETE, handler)
    }

    /// Convierte el árbol en un único handler
    pub fn into_handler(self) -> Handler {
        let router = Arc::new(self);
        Arc::new(move |request: Request| router.dispatch(request))
    }

    /// Busca la ruta del request y la ejecuta; 404 si no hay
    pub fn dispatch(&self, request: Request) -> HandlerResult {
        let segments = segments(request.path());
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        match self.find(request.method(), &segments, &Params::new(), &[]) {
            Some(found) => (found.handler)(request.set_params(found.params)),
            None => Ok(Response::new(StatusCode::NotFound).text("Not Found")),
        }
    }

    fn find(
        &self,
        method: Method,
        segments: &[&str],
        params: &Params,
        chain: &[Middleware],
    ) -> Option<Match> {
        match self {
            Router::Route {
                method: route_method,
                handler,
            } => {
                if !segments.is_empty() || *route_method != method {
                    return None;
                }
                Some(Match {
                    handler: compose(chain.to_vec())(Arc::clone(handler)),
                    params: params.clone(),
                })
            }

            Router::Node {
                segment,
                middleware,
                children,
            } => {
                let (current, rest) = segments.split_first()?;

                let mut params = params.clone();
                match segment.strip_prefix("/:") {
                    Some(name) => params.insert(name, decode_param(current)),
                    None if segment.as_str() == *current => {}
                    None => return None,
                }

                let mut chain = chain.to_vec();
                chain.extend(middleware.iter().cloned());

                children
                    .iter()
                    .find_map(|child| child.find(method, rest, &params, &chain))
            }
        }
    }
}

/// `/a/b` → `["/", "/a", "/b"]`. Los segmentos vacíos se ignoran.
fn segments(path: &str) -> Vec<String> {
    std::iter::once("/".to_string())
        .chain(
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(|s| format!("/{}", s)),
        )
        .collect()
}

/// Valor de un `/:param`, sin el `/` y decodificado
fn decode_param(segment: &str) -> String {
    let raw = segment.strip_prefix('/').unwrap_or(segment);
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{around, handler};
    use parking_lot::Mutex;

    fn text(value: &'static str) -> Handler {
        handler(move |_| Ok(Response::default().text(value)))
    }

    fn echo_param(name: &'static str) -> Handler {
        handler(move |req| {
            Ok(Response::default().text(req.param(name).unwrap_or("<none>").to_string()))
        })
    }

    fn body(response: Response) -> String {
        String::from_utf8(response.into_parts().2.into_bytes().unwrap()).unwrap()
    }

    fn call(app: &Handler, method: Method, url: &str) -> Response {
        app(Request::new(method, url)).unwrap()
    }

    #[test]
    fn test_segments() {
        assert_eq!(segments("/"), vec!["/"]);
        assert_eq!(segments("/users/42"), vec!["/", "/users", "/42"]);
        assert_eq!(segments("//users///42/"), vec!["/", "/users", "/42"]);
    }

    #[test]
    fn test_exact_match() {
        let app = Router::root(vec![Router::node("/users", vec![], vec![Router::get(text("list"))])])
            .into_handler();

        assert_eq!(body(call(&app, Method::GET, "/users")), "list");
        assert_eq!(call(&app, Method::GET, "/users/1").status(), StatusCode::NotFound);
        assert_eq!(call(&app, Method::POST, "/users").status(), StatusCode::NotFound);
        assert_eq!(call(&app, Method::GET, "/").status(), StatusCode::NotFound);
    }

    #[test]
    fn test_root_route() {
        let app = Router::root(vec![Router::get(text("home"))]).into_handler();
        assert_eq!(body(call(&app, Method::GET, "/")), "home");
        assert_eq!(body(call(&app, Method::GET, "/?x=1")), "home");
    }

    #[test]
    fn test_param_capture_is_decoded() {
        let app = Router::root(vec![Router::node(
            "/users",
            vec![],
            vec![Router::node(":id", vec![], vec![Router::get(echo_param("id"))])],
        )])
        .into_handler();

        assert_eq!(body(call(&app, Method::GET, "/users/42")), "42");
        assert_eq!(body(call(&app, Method::GET, "/users/ana%20mar%C3%ADa")), "ana maría");
    }

    #[test]
    fn test_first_match_wins() {
        let app = Router::root(vec![Router::node(
            "/files",
            vec![],
            vec![
                Router::node("/latest", vec![], vec![Router::get(text("literal"))]),
                Router::node("/:name", vec![], vec![Router::get(echo_param("name"))]),
            ],
        )])
        .into_handler();

        assert_eq!(body(call(&app, Method::GET, "/files/latest")), "literal");
        assert_eq!(body(call(&app, Method::GET, "/files/report")), "report");
    }

    #[test]
    fn test_failed_branch_does_not_leak_params() {
        let app = Router::root(vec![
            Router::node("/:a", vec![], vec![Router::node("/only", vec![], vec![Router::get(text("x"))])]),
            Router::node("/b", vec![], vec![Router::get(echo_param("a"))]),
        ])
        .into_handler();

        assert_eq!(body(call(&app, Method::GET, "/b")), "<none>");
    }

    #[test]
    fn test_node_middleware_order() {
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let tag = |name: &'static str| {
            let log = Arc::clone(&log);
            around(move |req, next| {
                log.lock().push(name.to_string());
                next(req)
            })
        };

        let app = Router::root(vec![Router::node(
            "/api",
            vec![tag("api")],
            vec![Router::node("/v1", vec![tag("v1a"), tag("v1b")], vec![Router::get(text("ok"))])],
        )])
        .into_handler();

        assert_eq!(body(call(&app, Method::GET, "/api/v1")), "ok");
        assert_eq!(*log.lock(), vec!["api", "v1a", "v1b"]);

        // Una ruta que no coincide no ejecuta middleware
        log.lock().clear();
        assert_eq!(call(&app, Method::GET, "/api/v2").status(), StatusCode::NotFound);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_method_routes() {
        let app = Router::root(vec![Router::node(
            "/items",
            vec![],
            vec![
                Router::get(text("get")),
                Router::post(text("post")),
                Router::delete(text("delete")),
            ],
        )])
        .into_handler();

        assert_eq!(body(call(&app, Method::GET, "/items")), "get");
        assert_eq!(body(call(&app, Method::POST, "/items")), "post");
        assert_eq!(body(call(&app, Method::DELETE, "/items")), "delete");
        assert_eq!(call(&app, Method::PUT, "/items").status(), StatusCode::NotFound);
    }
}
