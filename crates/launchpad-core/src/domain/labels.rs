//! Label sets and label inheritance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key/value labels. Ordered so persisted records are stable.
pub type Labels = BTreeMap<String, String>;

/// Label carrying the workspace an operation ran in.
pub const WORKSPACE_LABEL: &str = "launchpad/workspace";

/// The label set handed to plugin functions under the `"labels"` name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    pub labels: Labels,
}

impl LabelSet {
    pub fn new(labels: Labels) -> Self {
        Self { labels }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Merge label sets from the least to the most specific; later sets win.
pub fn merge_labels<'a>(sets: impl IntoIterator<Item = &'a Labels>) -> Labels {
    let mut merged = Labels::new();
    for set in sets {
        for (k, v) in set {
            merged.insert(k.clone(), v.clone());
        }
    }
    merged
}
