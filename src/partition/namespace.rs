use indexmap::IndexMap;

use crate::error::Error;

/// Ordered namespace-name ↔ index assignment, shared by the encoder (which
/// assigns indices as namespaces are first seen) and the decoder (which
/// resolves indices back to names from namespace-definition entries).
#[derive(Debug, Default)]
pub(crate) struct NamespaceTable {
    by_name: IndexMap<String, u8>,
    by_index: IndexMap<u8, String>,
}

impl NamespaceTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Assign the next index to `name` if it hasn't been seen before,
    /// otherwise return its existing index.
    pub(crate) fn assign(&mut self, name: &str) -> Result<u8, Error> {
        if let Some(&idx) = self.by_name.get(name) {
            return Ok(idx);
        }

        let next = self.by_name.len() + 1;
        let idx = u8::try_from(next).map_err(|_| Error::TooManyNamespaces)?;
        if idx == 255 {
            return Err(Error::TooManyNamespaces);
        }

        self.by_name.insert(name.to_string(), idx);
        self.by_index.insert(idx, name.to_string());
        Ok(idx)
    }

    /// Record a namespace-definition entry read from the partition during
    /// decode: `index` was read from the entry's data field, `name` from
    /// its key.
    pub(crate) fn record(&mut self, index: u8, name: String) {
        self.by_name.insert(name.clone(), index);
        self.by_index.insert(index, name);
    }

    /// Resolve a namespace index to its name, falling back to a synthetic
    /// `ns_<index>` name when no definition entry was seen for it.
    pub(crate) fn resolve(&self, index: u8) -> String {
        self.by_index
            .get(&index)
            .cloned()
            .unwrap_or_else(|| format!("ns_{index}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_indices_in_first_seen_order() {
        let mut table = NamespaceTable::new();
        assert_eq!(table.assign("a").unwrap(), 1);
        assert_eq!(table.assign("b").unwrap(), 2);
        assert_eq!(table.assign("a").unwrap(), 1);
        assert_eq!(table.assign("c").unwrap(), 3);
    }

    #[test]
    fn rejects_more_than_254_namespaces() {
        let mut table = NamespaceTable::new();
        for i in 0..254 {
            table.assign(&format!("ns{i}")).unwrap();
        }
        assert!(matches!(
            table.assign("one_too_many"),
            Err(Error::TooManyNamespaces)
        ));
    }

    #[test]
    fn resolves_missing_index_to_synthetic_name() {
        let table = NamespaceTable::new();
        assert_eq!(table.resolve(7), "ns_7");
    }

    #[test]
    fn resolves_recorded_index() {
        let mut table = NamespaceTable::new();
        table.record(3, "config".to_string());
        assert_eq!(table.resolve(3), "config");
    }
}
