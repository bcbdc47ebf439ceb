//! The gateway between the diff engine and the data it compares.
//!
//! The engine never touches elements directly; it asks a [`DiffCallback`]
//! about positions. Predicates must be pure for the duration of a diff call.

use pandora_types::Item;

/// Position-level access to the two lists being compared.
pub trait DiffCallback {
    /// Extra data attached to `Changed` notifications.
    type Payload: Clone + PartialEq;

    /// Size of the old list.
    fn old_len(&self) -> usize;

    /// Size of the new list.
    fn new_len(&self) -> usize;

    /// Whether the two positions hold the same logical item.
    fn are_items_the_same(&self, old_position: usize, new_position: usize) -> bool;

    /// Whether two identity-matched items also carry the same data.
    ///
    /// Only called when [`are_items_the_same`](DiffCallback::are_items_the_same)
    /// returned `true` for the pair.
    fn are_contents_the_same(&self, old_position: usize, new_position: usize) -> bool;

    /// Payload describing the change between two matched items whose
    /// contents differ.
    fn change_payload(&self, _old_position: usize, _new_position: usize) -> Option<Self::Payload> {
        None
    }
}

impl<C: DiffCallback + ?Sized> DiffCallback for &C {
    type Payload = C::Payload;

    fn old_len(&self) -> usize {
        (**self).old_len()
    }

    fn new_len(&self) -> usize {
        (**self).new_len()
    }

    fn are_items_the_same(&self, old_position: usize, new_position: usize) -> bool {
        (**self).are_items_the_same(old_position, new_position)
    }

    fn are_contents_the_same(&self, old_position: usize, new_position: usize) -> bool {
        (**self).are_contents_the_same(old_position, new_position)
    }

    fn change_payload(&self, old_position: usize, new_position: usize) -> Option<Self::Payload> {
        (**self).change_payload(old_position, new_position)
    }
}

/// Element-level comparison, adapted to [`DiffCallback`] by [`SliceCallback`].
pub trait ItemCallback<T: ?Sized> {
    /// Extra data attached to `Changed` notifications.
    type Payload: Clone + PartialEq;

    fn are_items_the_same(&self, old_item: &T, new_item: &T) -> bool;

    fn are_contents_the_same(&self, old_item: &T, new_item: &T) -> bool;

    fn change_payload(&self, _old_item: &T, _new_item: &T) -> Option<Self::Payload> {
        None
    }
}

/// Compares two slices element by element.
pub struct SliceCallback<'a, T, C: ?Sized> {
    old: &'a [T],
    new: &'a [T],
    items: &'a C,
}

impl<'a, T, C: ?Sized> SliceCallback<'a, T, C> {
    pub fn new(old: &'a [T], new: &'a [T], items: &'a C) -> Self {
        Self { old, new, items }
    }
}

impl<T, C> DiffCallback for SliceCallback<'_, T, C>
where
    C: ItemCallback<T> + ?Sized,
{
    type Payload = C::Payload;

    fn old_len(&self) -> usize {
        self.old.len()
    }

    fn new_len(&self) -> usize {
        self.new.len()
    }

    fn are_items_the_same(&self, old_position: usize, new_position: usize) -> bool {
        self.items
            .are_items_the_same(&self.old[old_position], &self.new[new_position])
    }

    fn are_contents_the_same(&self, old_position: usize, new_position: usize) -> bool {
        self.items
            .are_contents_the_same(&self.old[old_position], &self.new[new_position])
    }

    fn change_payload(&self, old_position: usize, new_position: usize) -> Option<C::Payload> {
        self.items
            .change_payload(&self.old[old_position], &self.new[new_position])
    }
}

/// Identity from [`Item::is_same_item`], content from the content hash.
#[derive(Clone, Copy, Debug, Default)]
pub struct ItemIdentity;

impl<T: Item> ItemCallback<T> for ItemIdentity {
    type Payload = ();

    fn are_items_the_same(&self, old_item: &T, new_item: &T) -> bool {
        old_item.is_same_item(new_item)
    }

    fn are_contents_the_same(&self, old_item: &T, new_item: &T) -> bool {
        old_item.content_hash() == new_item.content_hash()
    }
}

/// A [`DiffCallback`] built from two closures over positions.
pub struct FnCallback<S, C> {
    old_len: usize,
    new_len: usize,
    same_item: S,
    same_content: C,
}

impl<S, C> FnCallback<S, C>
where
    S: Fn(usize, usize) -> bool,
    C: Fn(usize, usize) -> bool,
{
    pub fn new(old_len: usize, new_len: usize, same_item: S, same_content: C) -> Self {
        Self {
            old_len,
            new_len,
            same_item,
            same_content,
        }
    }
}

impl<S, C> DiffCallback for FnCallback<S, C>
where
    S: Fn(usize, usize) -> bool,
    C: Fn(usize, usize) -> bool,
{
    type Payload = ();

    fn old_len(&self) -> usize {
        self.old_len
    }

    fn new_len(&self) -> usize {
        self.new_len
    }

    fn are_items_the_same(&self, old_position: usize, new_position: usize) -> bool {
        (self.same_item)(old_position, new_position)
    }

    fn are_contents_the_same(&self, old_position: usize, new_position: usize) -> bool {
        (self.same_content)(old_position, new_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ById;

    impl ItemCallback<(u32, &'static str)> for ById {
        type Payload = &'static str;

        fn are_items_the_same(&self, a: &(u32, &'static str), b: &(u32, &'static str)) -> bool {
            a.0 == b.0
        }

        fn are_contents_the_same(&self, a: &(u32, &'static str), b: &(u32, &'static str)) -> bool {
            a.1 == b.1
        }

        fn change_payload(
            &self,
            _a: &(u32, &'static str),
            b: &(u32, &'static str),
        ) -> Option<&'static str> {
            Some(b.1)
        }
    }

    #[test]
    fn slice_callback_routes_positions() {
        let old = [(1, "a"), (2, "b")];
        let new = [(2, "B"), (1, "a")];
        let cb = SliceCallback::new(&old, &new, &ById);
        assert_eq!(cb.old_len(), 2);
        assert_eq!(cb.new_len(), 2);
        assert!(cb.are_items_the_same(0, 1));
        assert!(cb.are_items_the_same(1, 0));
        assert!(!cb.are_contents_the_same(1, 0));
        assert_eq!(cb.change_payload(1, 0), Some("B"));
    }

    #[test]
    fn item_identity_uses_content_hash() {
        let old = ["a".to_string()];
        let new = ["a".to_string()];
        let cb = SliceCallback::new(&old, &new, &ItemIdentity);
        assert!(cb.are_items_the_same(0, 0));
        assert!(cb.are_contents_the_same(0, 0));
        assert_eq!(cb.change_payload(0, 0), None);
    }

    #[test]
    fn fn_callback_uses_closures() {
        let old = [1, 2, 3];
        let new = [3, 4];
        let cb = FnCallback::new(old.len(), new.len(), |o, n| old[o] == new[n], |_, _| true);
        assert!(cb.are_items_the_same(2, 0));
        assert!(!cb.are_items_the_same(0, 0));
    }
}
