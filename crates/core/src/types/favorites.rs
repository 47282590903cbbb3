//! Favorite product set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A deduplicated set of favorited product ids.
///
/// Serializes as a plain JSON array of id strings, which is the shape kept
/// under the `moScentFavourites` local storage key. Duplicates in stored data
/// collapse on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteSet(BTreeSet<ProductId>);

impl FavoriteSet {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.0.contains(id)
    }

    /// Flip membership of `id` and return whether it is now a favorite.
    pub fn toggle(&mut self, id: &ProductId) -> bool {
        if self.0.remove(id) {
            false
        } else {
            self.0.insert(id.clone());
            true
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductId> {
        self.0.iter()
    }
}

impl FromIterator<ProductId> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = ProductId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FavoriteSet {
    type Item = ProductId;
    type IntoIter = std::collections::btree_set::IntoIter<ProductId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FavoriteSet {
    type Item = &'a ProductId;
    type IntoIter = std::collections::btree_set::Iter<'a, ProductId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> FavoriteSet {
        ids.iter().copied().map(ProductId::new).collect()
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut favorites = FavoriteSet::new();
        let id = ProductId::new("7");
        assert!(favorites.toggle(&id));
        assert!(favorites.contains(&id));
        assert!(!favorites.toggle(&id));
        assert!(favorites.is_empty());
    }

    #[test]
    fn test_deserialize_dedupes_stored_array() {
        let favorites: FavoriteSet = serde_json::from_str(r#"["3","1","3"]"#).unwrap();
        assert_eq!(favorites, set(&["1", "3"]));
        assert_eq!(serde_json::to_string(&favorites).unwrap(), r#"["1","3"]"#);
    }
}
