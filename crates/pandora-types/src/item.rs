//! Item identity and content contracts.
//!
//! Two orthogonal relations drive change detection:
//!
//! - *identity* ([`Item::is_same_item`]) answers "is this the same logical
//!   entity across versions?";
//! - *content* ([`ContentHash::content_hash`]) answers "did its payload
//!   change?" and is only consulted for identity-matched pairs.
//!
//! There is no blanket fallback: an element type without a [`ContentHash`]
//! implementation cannot be stored in a tree, so a missing fingerprint is a
//! compile error instead of a silent "never changed".

use crate::hasher::ContentHasher;

/// A stable fingerprint of an element's payload.
pub trait ContentHash {
    /// Digest of the element's content. Equal content must give equal digests.
    fn content_hash(&self) -> u64;
}

/// An element that can live in a collection tree.
///
/// Identity defaults to full equality. Types with a natural key (a database
/// id, a path) override [`is_same_item`](Item::is_same_item) so that an
/// edited row is reported as changed instead of removed and re-inserted.
pub trait Item: Clone + PartialEq + ContentHash {
    /// Whether `self` and `other` are the same logical entity.
    fn is_same_item(&self, other: &Self) -> bool {
        self == other
    }
}

macro_rules! hashed_scalars {
    ($($t:ty),* $(,)?) => {
        $(
            impl ContentHash for $t {
                fn content_hash(&self) -> u64 {
                    ContentHasher::ITEM.hash_value(self)
                }
            }

            impl Item for $t {}
        )*
    };
}

hashed_scalars!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool, char, String,
);

impl ContentHash for f32 {
    fn content_hash(&self) -> u64 {
        ContentHasher::ITEM.hash_value(&self.to_bits())
    }
}

impl Item for f32 {}

impl ContentHash for f64 {
    fn content_hash(&self) -> u64 {
        ContentHasher::ITEM.hash_value(&self.to_bits())
    }
}

impl Item for f64 {}

impl ContentHash for str {
    fn content_hash(&self) -> u64 {
        ContentHasher::ITEM.hash_value(self)
    }
}

impl<T: ContentHash + ?Sized> ContentHash for &T {
    fn content_hash(&self) -> u64 {
        (**self).content_hash()
    }
}

impl<T: ContentHash + ?Sized> ContentHash for Box<T> {
    fn content_hash(&self) -> u64 {
        (**self).content_hash()
    }
}

impl<T: ContentHash> ContentHash for Option<T> {
    fn content_hash(&self) -> u64 {
        match self {
            Some(v) => ContentHasher::ITEM.hash_value(&(1u8, v.content_hash())),
            None => ContentHasher::ITEM.hash_value(&0u8),
        }
    }
}

impl<T: ContentHash> ContentHash for Vec<T> {
    fn content_hash(&self) -> u64 {
        let digests: Vec<u64> = self.iter().map(ContentHash::content_hash).collect();
        ContentHasher::ITEM.hash_value(&digests)
    }
}

impl<A: ContentHash, B: ContentHash> ContentHash for (A, B) {
    fn content_hash(&self) -> u64 {
        ContentHasher::ITEM.hash_value(&(self.0.content_hash(), self.1.content_hash()))
    }
}

impl<A: Item, B: Item> Item for (A, B) {}

impl ContentHash for serde_json::Value {
    fn content_hash(&self) -> u64 {
        // Serializing a `Value` cannot fail; the fallback keeps the trait infallible.
        ContentHasher::JSON
            .hash_json(self)
            .unwrap_or_else(|_| ContentHasher::JSON.hash_value(&self.to_string()))
    }
}

impl Item for serde_json::Value {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: u32,
        body: String,
    }

    impl ContentHash for Row {
        fn content_hash(&self) -> u64 {
            ContentHasher::ITEM.hash_value(&(self.id, &self.body))
        }
    }

    impl Item for Row {
        fn is_same_item(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    #[test]
    fn default_identity_is_equality() {
        assert!(5u32.is_same_item(&5));
        assert!(!5u32.is_same_item(&6));
        assert!(String::from("a").is_same_item(&"a".to_string()));
    }

    #[test]
    fn keyed_identity_separates_from_content() {
        let v1 = Row { id: 1, body: "v1".into() };
        let v2 = Row { id: 1, body: "v2".into() };
        assert!(v1.is_same_item(&v2));
        assert_ne!(v1.content_hash(), v2.content_hash());
    }

    #[test]
    fn option_distinguishes_none_from_some() {
        assert_ne!(None::<u32>.content_hash(), Some(0u32).content_hash());
    }

    #[test]
    fn json_values_fingerprint_by_content() {
        let a = serde_json::json!({"id": 1, "name": "x"});
        let b = serde_json::json!({"id": 1, "name": "y"});
        assert_ne!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash(), a.clone().content_hash());
    }

    proptest! {
        #[test]
        fn equal_strings_have_equal_fingerprints(s in ".{0,32}") {
            prop_assert_eq!(s.content_hash(), s.clone().content_hash());
            prop_assert_eq!(s.as_str().content_hash(), s.content_hash());
        }

        #[test]
        fn vec_fingerprint_is_order_sensitive(a in any::<u16>(), b in any::<u16>()) {
            prop_assume!(a != b);
            prop_assert_ne!(vec![a, b].content_hash(), vec![b, a].content_hash());
        }
    }
}
