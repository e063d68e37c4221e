use {
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
};

/// A saved link. Two pages are the same page when both url and owner match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub owner: String,
}

impl Page {
    pub fn new(url: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            owner: owner.into(),
        }
    }

    /// Stable identity of `(url, owner)` as lowercase hex SHA-256.
    #[must_use]
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.url.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.owner.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
