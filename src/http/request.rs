//! # Request HTTP
//! src/http/request.rs
//!
//! Un `Request` se construye una sola vez (lo hace el parser) y después
//! se trata como valor inmutable: cada "setter" consume el request y
//! retorna uno nuevo. Así un middleware nunca ve cambios hechos por
//! otro a sus espaldas.
//!
//! ## Componentes
//!
//! ```text
//! GET /users/42?tab=posts HTTP/1.1\r\n
//! └┬┘ └──────────┬──────┘ └───┬──┘
//! method        url         version
//!     └──path──┘ └query┘
//! ```

use super::{HeaderList, Method, RequestBody, Store};
use crate::error::HandlerError;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;

/// Clave del store donde el router deja los parámetros capturados
pub(crate) const PARAMS_KEY: &str = "mini_http.params";

/// Parámetros capturados por el router (`/users/:id` → `id`)
///
/// Son de solo lectura para los handlers: sólo el router los crea.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Representa un request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// URL tal como vino en la request line (path + query)
    url: String,

    /// Path sin query. No se decodifica el percent-encoding.
    path: String,

    /// Query string cruda (sin el `?`)
    querystring: String,

    version: String,
    headers: HeaderList,
    store: Store,
    body: RequestBody,

    /// IP del peer (resuelta una vez por conexión)
    address: String,

    /// Si es true, `X-Forwarded-For`/`X-Forwarded-Host` reemplazan la
    /// dirección y el host reales
    trust_proxy: bool,
}

impl Request {
    /// Crea un request sin headers ni body
    ///
    /// # Ejemplo
    /// ```
    /// use mini_http::http::{Method, Request};
    ///
    /// let request = Request::new(Method::GET, "/fibonacci?num=10");
    ///
    /// assert_eq!(request.path(), "/fibonacci");
    /// assert_eq!(request.querystring(), "num=10");
    /// ```
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        let (path, querystring) = split_url(&url);
        Self {
            method,
            path,
            querystring,
            url,
            version: "HTTP/1.1".to_string(),
            headers: HeaderList::new(),
            store: Store::new(),
            body: RequestBody::default(),
            address: String::new(),
            trust_proxy: false,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_headers(mut self, headers: HeaderList) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = RequestBody::new(body);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    // === Lectura ===

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path del request, con slash final si lo trae
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn querystring(&self) -> &str {
        &self.querystring
    }

    /// Query parameters decodificados
    ///
    /// `+` se interpreta como espacio. Una clave sin `=` queda con valor
    /// vacío. Si una clave se repite gana la última.
    pub fn query(&self) -> HashMap<String, String> {
        parse_query(&self.querystring)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    /// Obtiene un header (sin importar mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn trust_proxy(&self) -> bool {
        self.trust_proxy
    }

    /// IP del cliente
    ///
    /// Con `trust_proxy` se usa la primera dirección de `X-Forwarded-For`.
    pub fn ip(&self) -> &str {
        if self.trust_proxy {
            if let Some(forwarded) = self.header("X-Forwarded-For") {
                if let Some(client) = forwarded.split(',').next().map(str::trim) {
                    if !client.is_empty() {
                        return client;
                    }
                }
            }
        }
        &self.address
    }

    /// Host del request. Con `trust_proxy` se prefiere `X-Forwarded-Host`.
    pub fn host(&self) -> Option<&str> {
        if self.trust_proxy {
            if let Some(host) = self.header("X-Forwarded-Host") {
                return Some(host);
            }
        }
        self.header("Host")
    }

    /// URL relativa al esquema: `//host/path?query`
    pub fn href(&self) -> String {
        format!("//{}{}", self.host().unwrap_or(""), self.url)
    }

    /// Parámetros capturados por el router, si pasó por uno
    pub fn params(&self) -> Option<&Params> {
        self.store.get::<Params>(PARAMS_KEY)
    }

    /// Un parámetro capturado por el router
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params().and_then(|p| p.get(name))
    }

    // === Conversión del body ===

    pub fn utf8(&self) -> Result<&str, HandlerError> {
        self.body.utf8()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        self.body.json()
    }

    // === Derivar un request nuevo ===

    pub fn set_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn set_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn append_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn delete_header(mut self, name: &str) -> Self {
        self.headers.delete(name);
        self
    }

    pub fn update_header<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(Option<&str>) -> Option<String>,
    {
        self.headers.update(name, f);
        self
    }

    pub fn set_store<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.store.insert(key, value);
        self
    }

    /// Reemplaza el valor de `key` por lo que retorne `f`; `None` lo borra
    pub fn update_store<T, F>(mut self, key: &str, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: FnOnce(Option<&T>) -> Option<T>,
    {
        match f(self.store.get::<T>(key)) {
            Some(value) => self.store.insert(key, value),
            None => self.store.remove(key),
        }
        self
    }

    /// Facilita encadenar transformaciones condicionales
    pub fn tap<F: FnOnce(Self) -> Self>(self, f: F) -> Self {
        f(self)
    }

    pub(crate) fn set_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    pub(crate) fn set_params(mut self, params: Params) -> Self {
        self.store.insert(PARAMS_KEY, params);
        self
    }
}

/// Separa path y query string
fn split_url(url: &str) -> (String, String) {
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    };
    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), query.to_string())
}

/// Parsea `a=1&b=hola+mundo&flag` en un mapa
pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// Decodifica un componente de query (`+` = espacio, luego `%XX`)
fn decode_component(s: &str) -> String {
    let spaced = s.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query() {
        let request = Request::new(Method::GET, "/foo?x=1");
        assert_eq!(request.path(), "/foo");
        assert_eq!(request.querystring(), "x=1");
        assert_eq!(request.url(), "/foo?x=1");
    }

    #[test]
    fn test_path_without_query() {
        let request = Request::new(Method::GET, "/users/");
        assert_eq!(request.path(), "/users/");
        assert_eq!(request.querystring(), "");
        assert!(request.query().is_empty());
    }

    #[test]
    fn test_empty_path_is_root() {
        let request = Request::new(Method::GET, "?a=1");
        assert_eq!(request.path(), "/");
    }

    #[test]
    fn test_query_decoding() {
        let request = Request::new(Method::GET, "/s?text=hello%20world&q=a+b&plus=%2B&debug");
        let query = request.query();
        assert_eq!(query.get("text").map(String::as_str), Some("hello world"));
        assert_eq!(query.get("q").map(String::as_str), Some("a b"));
        assert_eq!(query.get("plus").map(String::as_str), Some("+"));
        assert_eq!(query.get("debug").map(String::as_str), Some(""));
    }

    #[test]
    fn test_setters_return_new_value() {
        let original = Request::new(Method::HEAD, "/");
        let derived = original.clone().set_method(Method::GET).set_header("X-A", "1");

        assert_eq!(original.method(), Method::HEAD);
        assert!(original.header("x-a").is_none());
        assert_eq!(derived.method(), Method::GET);
        assert_eq!(derived.header("x-a"), Some("1"));
    }

    #[test]
    fn test_ip_and_host_without_trust_proxy() {
        let mut headers = HeaderList::new();
        headers.append("Host", "example.com");
        headers.append("X-Forwarded-For", "10.0.0.1");
        headers.append("X-Forwarded-Host", "proxy.example.com");
        let request = Request::new(Method::GET, "/a?b=1")
            .with_headers(headers)
            .with_address("127.0.0.1");

        assert_eq!(request.ip(), "127.0.0.1");
        assert_eq!(request.host(), Some("example.com"));
        assert_eq!(request.href(), "//example.com/a?b=1");
    }

    #[test]
    fn test_ip_and_host_with_trust_proxy() {
        let request = Request::new(Method::GET, "/")
            .set_header("Host", "example.com")
            .set_header("X-Forwarded-For", "10.0.0.1, 10.0.0.2")
            .set_header("X-Forwarded-Host", "proxy.example.com")
            .with_address("127.0.0.1")
            .set_trust_proxy(true);

        assert_eq!(request.ip(), "10.0.0.1");
        assert_eq!(request.host(), Some("proxy.example.com"));
    }

    #[test]
    fn test_trust_proxy_falls_back_to_address() {
        let request = Request::new(Method::GET, "/")
            .with_address("127.0.0.1")
            .set_trust_proxy(true);
        assert_eq!(request.ip(), "127.0.0.1");
        assert_eq!(request.host(), None);
    }

    #[test]
    fn test_params_absent_until_routed() {
        let request = Request::new(Method::GET, "/users/42");
        assert!(request.params().is_none());

        let mut params = Params::new();
        params.insert("id", "42");
        let request = request.set_params(params);
        assert_eq!(request.param("id"), Some("42"));
        assert_eq!(request.param("other"), None);
    }

    #[test]
    fn test_foreign_value_under_params_key_is_absent() {
        let request = Request::new(Method::GET, "/").set_store(PARAMS_KEY, "not params");
        assert!(request.params().is_none());
    }

    #[test]
    fn test_body_conversion() {
        let request = Request::new(Method::POST, "/echo").with_body(b"[1,2,3]".to_vec());
        assert_eq!(request.utf8().unwrap(), "[1,2,3]");
        let nums: Vec<u32> = request.json().unwrap();
        assert_eq!(nums, vec![1, 2, 3]);
    }

    #[test]
    fn test_update_store() {
        let request = Request::new(Method::GET, "/")
            .set_store("visits", 1u32)
            .update_store::<u32, _>("visits", |v| v.map(|n| n + 1));
        assert_eq!(request.store().get::<u32>("visits"), Some(&2));

        let request = request.update_store::<u32, _>("visits", |_| None);
        assert!(!request.store().contains_key("visits"));
    }
}
