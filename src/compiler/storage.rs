/// Turns a dataset's storage id into a URI the training service can fetch.
///
/// Used only for datasets that carry a `storageId` and no `contentUrl`.
pub trait StorageResolver: Send + Sync {
    fn resolve_uri(&self, storage_id: &str) -> String;
}

/// Resolves storage ids by prepending a fixed prefix.
#[derive(Debug, Clone)]
pub struct PrefixStorageResolver {
    prefix: String,
}

pub const DEFAULT_STORAGE_PREFIX: &str = "storage://";

impl PrefixStorageResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for PrefixStorageResolver {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_PREFIX)
    }
}

impl StorageResolver for PrefixStorageResolver {
    fn resolve_uri(&self, storage_id: &str) -> String {
        format!("{}{}", self.prefix, storage_id)
    }
}
