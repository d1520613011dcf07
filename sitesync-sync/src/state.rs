//! Change detection: SHA-256 content hashes of published records.
//!
//! [`SyncState`] maps a document's canonical path to the hash of the record
//! last published for it. It lives only in memory: a restart empties it, and
//! the next pass re-publishes each document once under the same key.
//!
//! Entries are written only after the store accepted the record, so a failed
//! `put` is retried by the next pass.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use sha2::{Digest, Sha256};

use sitesync_core::{BlogPost, CanonicalPath};

/// SHA-256 hex digest over the JSON encoding of `post`.
///
/// `BlogPost` serializes its fields in declaration order, so equal posts
/// always produce equal digests.
pub fn content_hash(post: &BlogPost) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_vec(post)?;
    let mut h = Sha256::new();
    h.update(&encoded);
    Ok(hex::encode(h.finalize()))
}

/// Last-published hash per canonical path.
#[derive(Debug, Default)]
pub struct SyncState {
    hashes: RwLock<HashMap<CanonicalPath, String>>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when `path` has no entry or its entry differs from `hash`.
    pub fn is_changed(&self, path: &CanonicalPath, hash: &str) -> bool {
        let hashes = self.hashes.read().unwrap_or_else(PoisonError::into_inner);
        hashes.get(path).map(String::as_str) != Some(hash)
    }

    /// Record a successful publish. Last writer wins.
    pub fn record(&self, path: CanonicalPath, hash: String) {
        let mut hashes = self.hashes.write().unwrap_or_else(PoisonError::into_inner);
        hashes.insert(path, hash);
    }

    pub fn get(&self, path: &CanonicalPath) -> Option<String> {
        let hashes = self.hashes.read().unwrap_or_else(PoisonError::into_inner);
        hashes.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.hashes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn post(title: &str) -> BlogPost {
        BlogPost {
            title: title.to_string(),
            date: "2024-03-15".to_string(),
            description: "d".to_string(),
            slug: "s".to_string(),
            path: "/blog/s".to_string(),
            excerpt: None,
            author: None,
            tags: Some(vec!["a".to_string(), "b".to_string()]),
            draft: false,
        }
    }

    #[test]
    fn equal_posts_hash_equal() {
        let a = content_hash(&post("Hello")).unwrap();
        let b = content_hash(&post("Hello")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn any_field_change_changes_the_hash() {
        let base = content_hash(&post("Hello")).unwrap();
        assert_ne!(base, content_hash(&post("Hello!")).unwrap());

        let mut reordered = post("Hello");
        reordered.tags = Some(vec!["b".to_string(), "a".to_string()]);
        assert_ne!(base, content_hash(&reordered).unwrap());
    }

    #[test]
    fn missing_entry_counts_as_changed() {
        let state = SyncState::new();
        assert!(state.is_changed(&CanonicalPath::from("a.md"), "abc"));
        assert!(state.is_empty());
    }

    #[test]
    fn recorded_hash_suppresses_until_content_changes() {
        let state = SyncState::new();
        let path = CanonicalPath::from("a.md");
        state.record(path.clone(), "abc".to_string());
        assert!(!state.is_changed(&path, "abc"));
        assert!(state.is_changed(&path, "def"));
        assert_eq!(state.get(&path).as_deref(), Some("abc"));
    }

    #[test]
    fn concurrent_writers_leave_one_entry_per_path() {
        let state = Arc::new(SyncState::new());
        std::thread::scope(|scope| {
            for i in 0..8 {
                let state = state.clone();
                scope.spawn(move || {
                    state.record(CanonicalPath::from("shared.md"), format!("h{i}"));
                    state.record(CanonicalPath(format!("own-{i}.md")), "x".to_string());
                });
            }
        });
        assert_eq!(state.len(), 9);
        assert!(state.get(&CanonicalPath::from("shared.md")).is_some());
    }
}
