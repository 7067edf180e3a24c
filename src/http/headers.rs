//! # Lista de Headers
//! src/http/headers.rs
//!
//! HTTP permite nombres de header repetidos (`Set-Cookie`, por ejemplo),
//! así que los headers se guardan como una lista ordenada de pares
//! `(nombre, valor)` y no como un mapa. El orden de inserción es el
//! orden en que se escriben en el socket.
//!
//! Todas las búsquedas ignoran mayúsculas/minúsculas y tratan `referrer`
//! como alias de `referer`.

/// Un header: `(nombre, valor)`
pub type Header = (String, String);

/// Lista ordenada de headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<Header>,
}

/// Compara dos nombres de header
fn same_name(a: &str, b: &str) -> bool {
    canonical(a).eq_ignore_ascii_case(canonical(b))
}

/// `referrer` es la grafía correcta, pero el header se llama `referer`
fn canonical(name: &str) -> &str {
    if name.eq_ignore_ascii_case("referrer") {
        "referer"
    } else {
        name
    }
}

impl HeaderList {
    /// Crea una lista vacía
    pub fn new() -> Self {
        Self::default()
    }

    /// Primer valor del header `name`
    ///
    /// # Ejemplo
    /// ```
    /// use mini_http::http::HeaderList;
    ///
    /// let mut headers = HeaderList::new();
    /// headers.append("Referer", "/home");
    ///
    /// assert_eq!(headers.get("REFERER"), Some("/home"));
    /// assert_eq!(headers.get("referrer"), Some("/home"));
    /// ```
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| same_name(key, name))
            .map(|(_, value)| value.as_str())
    }

    /// Todos los valores del header `name`, en orden
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| same_name(key, name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Agrega un header sin tocar los existentes
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Reemplaza todas las ocurrencias de `name` por un único header
    ///
    /// Borra primero y agrega al final, así que el header queda en la
    /// última posición.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.delete(&name);
        self.entries.push((name, value.into()));
    }

    /// Borra todas las ocurrencias de `name`
    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(key, _)| !same_name(key, name));
    }

    /// Aplica `f` al valor actual; si `f` retorna `None` no hace nada
    pub fn update<F>(&mut self, name: &str, f: F)
    where
        F: FnOnce(Option<&str>) -> Option<String>,
    {
        if let Some(value) = f(self.get(name)) {
            self.set(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<Header>> for HeaderList {
    fn from(entries: Vec<Header>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_is_case_insensitive() {
        for set_name in ["content-type", "Content-Type", "CONTENT-TYPE"] {
            let mut headers = HeaderList::new();
            headers.set(set_name, "text/plain");
            for get_name in ["content-type", "Content-Type", "CoNtEnT-tYpE"] {
                assert_eq!(headers.get(get_name), Some("text/plain"));
            }
        }
    }

    #[test]
    fn test_referrer_alias() {
        let mut headers = HeaderList::new();
        headers.set("Referrer", "/a");
        assert_eq!(headers.get("referer"), Some("/a"));

        headers.set("Referer", "/b");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("REFERRER"), Some("/b"));

        headers.delete("referrer");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_set_replaces() {
        let mut headers = HeaderList::new();
        headers.append("X", "1");
        headers.append("x", "2");
        headers.set("X", "a");
        headers.set("X", "b");

        let values: Vec<&str> = headers.get_all("x").collect();
        assert_eq!(values, vec!["b"]);
    }

    #[test]
    fn test_append_keeps_duplicates_in_order() {
        let mut headers = HeaderList::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("Host", "x");
        headers.append("set-cookie", "b=2");

        let values: Vec<&str> = headers.get_all("Set-Cookie").collect();
        assert_eq!(values, vec!["a=1", "b=2"]);
        assert_eq!(headers.get("set-cookie"), Some("a=1"));

        let names: Vec<&str> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["Set-Cookie", "Host", "set-cookie"]);
    }

    #[test]
    fn test_delete_removes_all() {
        let mut headers = HeaderList::new();
        headers.append("A", "1");
        headers.append("B", "2");
        headers.append("a", "3");
        headers.delete("A");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("b"), Some("2"));
    }

    #[test]
    fn test_update() {
        let mut headers = HeaderList::new();
        headers.update("Count", |v| v.map(|s| s.to_string()));
        assert!(headers.is_empty());

        headers.set("Count", "1");
        headers.update("count", |v| {
            v.and_then(|s| s.parse::<u32>().ok()).map(|n| (n + 1).to_string())
        });
        assert_eq!(headers.get("Count"), Some("2"));
    }
}
