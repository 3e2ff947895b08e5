use std::collections::HashMap;

/// Stable identity of an item across refreshes, e.g. an archive entry name.
pub type ItemId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbStatus {
    #[default]
    Pending,
    Generating,
    Ready,
    Failed,
}

/// Capability the embedding UI layer provides over its item collection.
///
/// Only the consumer context touches the model; workers never see it.
pub trait ModelPort {
    type Thumbnail;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn uid_at(&self, index: usize) -> Option<ItemId>;

    fn status(&self, uid: &str) -> Option<ThumbStatus>;

    /// Updates the status of `uid`. A `None` thumbnail leaves the payload slot untouched.
    fn set(&mut self, uid: &str, status: ThumbStatus, thumbnail: Option<Self::Thumbnail>);
}

#[derive(Debug, Clone, PartialEq)]
struct Item<T> {
    uid: ItemId,
    status: ThumbStatus,
    thumbnail: Option<T>,
}

/// In-memory list model, ordered by insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct VecModel<T> {
    items: Vec<Item<T>>,
    index: HashMap<ItemId, usize>,
}

impl<T> Default for VecModel<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> VecModel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item with status `Pending`. Returns `false` if the id is already present.
    pub fn push(&mut self, uid: impl Into<ItemId>) -> bool {
        let uid = uid.into();
        if self.index.contains_key(&uid) {
            return false;
        }
        self.index.insert(uid.clone(), self.items.len());
        self.items.push(Item {
            uid,
            status: ThumbStatus::Pending,
            thumbnail: None,
        });
        true
    }

    pub fn index_of(&self, uid: &str) -> Option<usize> {
        self.index.get(uid).copied()
    }

    pub fn thumbnail(&self, uid: &str) -> Option<&T> {
        let idx = self.index_of(uid)?;
        self.items[idx].thumbnail.as_ref()
    }

    pub fn count_with_status(&self, status: ThumbStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }

    /// Iterates `(uid, status, thumbnail)` in model order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ThumbStatus, Option<&T>)> {
        self.items
            .iter()
            .map(|item| (item.uid.as_str(), item.status, item.thumbnail.as_ref()))
    }
}

impl<T, S: Into<ItemId>> FromIterator<S> for VecModel<T> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut model = Self::new();
        for uid in iter {
            model.push(uid);
        }
        model
    }
}

impl<T> ModelPort for VecModel<T> {
    type Thumbnail = T;

    fn len(&self) -> usize {
        self.items.len()
    }

    fn uid_at(&self, index: usize) -> Option<ItemId> {
        self.items.get(index).map(|item| item.uid.clone())
    }

    fn status(&self, uid: &str) -> Option<ThumbStatus> {
        self.index_of(uid).map(|idx| self.items[idx].status)
    }

    fn set(&mut self, uid: &str, status: ThumbStatus, thumbnail: Option<T>) {
        let Some(idx) = self.index_of(uid) else {
            return;
        };
        let item = &mut self.items[idx];
        item.status = status;
        if thumbnail.is_some() {
            item.thumbnail = thumbnail;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_are_rejected_and_order_kept() {
        let mut model: VecModel<u32> = ["b", "a"].into_iter().collect();
        assert!(!model.push("a"));
        assert_eq!(model.len(), 2);
        assert_eq!(model.uid_at(0).as_deref(), Some("b"));
        assert_eq!(model.uid_at(2), None);
    }

    #[test]
    fn set_without_payload_keeps_thumbnail() {
        let mut model: VecModel<u32> = ["x"].into_iter().collect();
        model.set("x", ThumbStatus::Ready, Some(9));
        model.set("x", ThumbStatus::Generating, None);

        assert_eq!(model.status("x"), Some(ThumbStatus::Generating));
        assert_eq!(model.thumbnail("x"), Some(&9));
    }

    #[test]
    fn unknown_uid_is_ignored() {
        let mut model: VecModel<u32> = VecModel::new();
        model.set("ghost", ThumbStatus::Ready, Some(1));
        assert!(model.is_empty());
        assert_eq!(model.status("ghost"), None);
    }
}
