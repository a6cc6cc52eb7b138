/// One uploaded document. Not `Clone`: passing it to the unit moves it.
#[derive(Debug, PartialEq, Eq)]
pub struct NamedBuffer {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl NamedBuffer {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Uploaded documents awaiting a scan, in insertion order, unique by name.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BufferStore {
    buffers: Vec<NamedBuffer>,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// First write wins: returns `false` and keeps the existing bytes when
    /// `name` is already present.
    pub fn add(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.buffers.push(NamedBuffer { name, bytes });
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.iter().any(|buffer| buffer.name == name)
    }

    pub fn list(&self) -> impl Iterator<Item = &NamedBuffer> {
        self.buffers.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.buffers.iter().map(|buffer| buffer.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.buffers.iter().map(|buffer| buffer.bytes.len() as u64).sum()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    /// Moves every buffer out. The store is empty until the next `add`.
    pub fn take(&mut self) -> Vec<NamedBuffer> {
        std::mem::take(&mut self.buffers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_first_write() {
        let mut store = BufferStore::new();
        assert!(store.add("a.pdf", vec![1]));
        assert!(!store.add("a.pdf", vec![2, 3]));
        assert_eq!(store.len(), 1);
        assert_eq!(store.list().next().unwrap().bytes, vec![1]);
    }

    #[test]
    fn take_empties_store() {
        let mut store = BufferStore::new();
        store.add("a.pdf", vec![1, 2]);
        store.add("b.pdf", vec![3]);
        assert_eq!(store.total_bytes(), 3);

        let taken = store.take();
        assert_eq!(
            taken.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            vec!["a.pdf", "b.pdf"]
        );
        assert!(store.is_empty());
        assert_eq!(store.list().count(), 0);

        store.add("a.pdf", vec![9]);
        assert_eq!(store.names(), vec!["a.pdf".to_string()]);
    }
}
