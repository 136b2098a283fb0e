use ::serde::ser::{Serialize, SerializeMap, Serializer};

/// Wraps a payload under a single top-level key, e.g. `{"movie": {...}}`.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<T> {
    key: &'static str,
    value: T,
}

impl<T> Envelope<T> {
    pub fn new(key: &'static str, value: T) -> Self {
        Self { key, value }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, &self.value)?;
        map.end()
    }
}
