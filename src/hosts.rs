// Ordered, deduplicated catalog of host/location labels. The catalog index
// is the array dimension for every DP table, so it is built once from the
// leaves (first-seen order) and never mutated afterwards.

use std::collections::HashMap;

use crate::errors::TnetError;

#[derive(Debug, Clone)]
pub struct HostCatalog {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl HostCatalog {
    /// Builds the catalog from leaf host labels in leaf-visit order.
    pub fn build<I, S>(labels: I) -> Result<HostCatalog, TnetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = HostCatalog {
            labels: Vec::new(),
            index: HashMap::new(),
        };
        for label in labels {
            let label = label.as_ref();
            if !catalog.index.contains_key(label) {
                catalog.index.insert(label.to_string(), catalog.labels.len());
                catalog.labels.push(label.to_string());
            }
        }
        if catalog.labels.is_empty() {
            return Err(TnetError::Configuration(
                "no host labels found at the leaves".to_string(),
            ));
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> &str {
        &self.labels[index]
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
