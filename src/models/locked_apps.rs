use serde::Deserialize;
use std::collections::BTreeSet;

/// Stored entry shapes. Older builds persisted objects, newer ones bare strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Package(String),
    Object {
        #[serde(rename = "packageName")]
        package_name: String,
    },
}

impl StoredEntry {
    fn into_package(self) -> String {
        match self {
            StoredEntry::Package(name) | StoredEntry::Object { package_name: name } => name,
        }
    }
}

/// Deduplicated set of protected package identifiers.
///
/// Iteration order is sorted so pushes to the detection layer are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockedAppSet {
    packages: BTreeSet<String>,
}

impl LockedAppSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a persisted payload, dropping blank entries and the host's own identifier.
    pub fn from_stored(payload: &str, host_package: &str) -> serde_json::Result<Self> {
        let entries: Vec<StoredEntry> = serde_json::from_str(payload)?;
        let packages = entries.into_iter().map(StoredEntry::into_package);
        Ok(Self::from_packages(packages, host_package))
    }

    pub fn from_packages<I, S>(packages: I, host_package: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packages = packages
            .into_iter()
            .map(|p| {
                let p: String = p.into();
                p.trim().to_string()
            })
            .filter(|p| !p.is_empty() && p != host_package)
            .collect();
        Self { packages }
    }

    /// Canonical persisted form: a JSON list of bare identifiers.
    pub fn to_stored(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.packages)
    }

    pub fn insert(&mut self, package_name: &str) -> bool {
        self.packages.insert(package_name.to_string())
    }

    pub fn remove(&mut self, package_name: &str) -> bool {
        self.packages.remove(package_name)
    }

    pub fn contains(&self, package_name: &str) -> bool {
        self.packages.contains(package_name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.packages.iter().cloned().collect()
    }
}

impl IntoIterator for LockedAppSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.into_iter()
    }
}
