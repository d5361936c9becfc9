//! Page cache key definitions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Identifies one cached rendered page.
///
/// The query string is hashed so `/?page=1` and `/?page=2` cache
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub path: String,
    pub query_hash: u64,
}

impl PageKey {
    pub fn new(path: &str, query: &str) -> Self {
        Self {
            path: path.to_owned(),
            query_hash: hash_query(query),
        }
    }
}

fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_and_query_produce_equal_keys() {
        assert_eq!(PageKey::new("/", "page=2"), PageKey::new("/", "page=2"));
    }

    #[test]
    fn different_queries_produce_different_hashes() {
        assert_ne!(hash_query("page=1"), hash_query("page=2"));
    }
}
