//! # Store
//! src/http/store.rs
//!
//! Bolsa opaca de valores por request/response. Los middlewares la usan
//! para pasarse datos tipados (cookies parseadas, parámetros del router,
//! etc.) sin agrandar el esquema de `Request`/`Response`.
//!
//! Quien lee debe conocer el tipo esperado. Una clave inexistente o un
//! valor de otro tipo se tratan igual: `None`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Value = Arc<dyn Any + Send + Sync>;

/// Mapa `String -> valor de cualquier tipo`
///
/// Clonar un `Store` es barato: los valores se comparten con `Arc`.
#[derive(Clone, Default)]
pub struct Store {
    values: HashMap<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtiene el valor de `key` si existe y es de tipo `T`
    ///
    /// # Ejemplo
    /// ```
    /// use mini_http::http::Store;
    ///
    /// let mut store = Store::new();
    /// store.insert("user_id", 42u64);
    ///
    /// assert_eq!(store.get::<u64>("user_id"), Some(&42));
    /// assert_eq!(store.get::<String>("user_id"), None);
    /// assert_eq!(store.get::<u64>("missing"), None);
    /// ```
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Arc::new(value));
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Store").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Session {
        user: String,
    }

    #[test]
    fn test_typed_roundtrip() {
        let mut store = Store::new();
        store.insert("session", Session { user: "ana".into() });

        let session = store.get::<Session>("session");
        assert_eq!(session.map(|s| s.user.as_str()), Some("ana"));
    }

    #[test]
    fn test_type_mismatch_is_absent() {
        let mut store = Store::new();
        store.insert("n", 1i32);
        assert!(store.get::<i64>("n").is_none());
        assert!(store.contains_key("n"));
    }

    #[test]
    fn test_clone_shares_values() {
        let mut a = Store::new();
        a.insert("k", String::from("v"));
        let mut b = a.clone();
        b.insert("k2", 2u8);

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
        assert_eq!(b.get::<String>("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_remove() {
        let mut store = Store::new();
        store.insert("k", 1u8);
        store.remove("k");
        assert!(store.is_empty());
    }
}
