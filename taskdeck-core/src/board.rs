//! Kanban board state: the loaded entities of one view, bucketed by a
//! picklist, and the drag-and-drop transitions between buckets.
//!
//! The controller never edits its list in place. A transition sends the
//! update, and only a successful update is followed by a full reload, so a
//! failed move leaves every entity in the bucket it was in.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::gateway::{BoardEntity, Entity, Gateway};
use crate::notify::{Notice, Notifier};
use crate::picklist::Picklist;
use crate::store::RecordId;

/// Entities sharing one key, in the order they were loaded.
#[derive(Debug)]
pub struct Bucket<'a, K, T> {
    pub key: K,
    pub items: Vec<&'a T>,
}

impl<K, T> Bucket<'_, K, T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Partitions `items` into one bucket per value of `K`, in `K::ALL` order.
/// Every bucket is present, empty or not.
pub fn group_by_key<'a, K, T>(items: &'a [T], key_fn: impl Fn(&T) -> K) -> Vec<Bucket<'a, K, T>>
where
    K: Picklist,
{
    let mut buckets: Vec<Bucket<'a, K, T>> = K::ALL
        .iter()
        .map(|&key| Bucket {
            key,
            items: Vec::new(),
        })
        .collect();
    for item in items {
        let key = key_fn(item);
        if let Some(bucket) = buckets.iter_mut().find(|b| b.key == key) {
            bucket.items.push(item);
        }
    }
    buckets
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Ready,
    /// The last load failed; the list is empty until a retry succeeds.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition<K> {
    /// Unknown entity or same bucket; nothing was sent.
    Unchanged,
    Moved { from: K, to: K },
    Failed { message: String },
}

pub struct BoardController<E: BoardEntity> {
    gateway: Gateway<E>,
    notifier: Arc<dyn Notifier>,
    items: Vec<E>,
    state: LoadState,
    dragging: Option<RecordId>,
}

impl<E: BoardEntity> BoardController<E> {
    pub fn new(gateway: Gateway<E>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            notifier,
            items: Vec::new(),
            state: LoadState::default(),
            dragging: None,
        }
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn dragging(&self) -> Option<RecordId> {
        self.dragging
    }

    pub fn find(&self, id: RecordId) -> Option<&E> {
        self.items.iter().find(|e| e.id() == id)
    }

    /// Replaces the list with a fresh fetch. On failure the list is cleared
    /// and the error kept in [`LoadState::Failed`]; calling `load` again is
    /// the retry.
    pub async fn load(&mut self) -> Result<()> {
        match self.gateway.list().await {
            Ok(items) => {
                tracing::debug!(collection = E::COLLECTION, count = items.len(), "board loaded");
                self.items = items;
                self.state = LoadState::Ready;
                Ok(())
            }
            Err(err) => {
                tracing::error!(collection = E::COLLECTION, error = %err, "board load failed");
                self.items.clear();
                self.state = LoadState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    pub fn buckets(&self) -> Vec<Bucket<'_, E::Key, E>> {
        group_by_key(&self.items, E::key)
    }

    pub fn bucket(&self, key: E::Key) -> Vec<&E> {
        self.items.iter().filter(|e| e.key() == key).collect()
    }

    /// Sum of `value` over one bucket, for column headers.
    pub fn bucket_value(&self, key: E::Key, value: impl Fn(&E) -> f64) -> f64 {
        self.items
            .iter()
            .filter(|e| e.key() == key)
            .map(value)
            .sum()
    }

    pub fn begin_drag(&mut self, id: RecordId) {
        self.dragging = Some(id);
    }

    /// Drop `id` on the `target` column.
    pub async fn end_drag(&mut self, id: RecordId, target: E::Key) -> Transition<E::Key> {
        self.dragging = None;
        self.move_to(id, target).await
    }

    /// Moves one entity to `target`, notifying the outcome.
    pub async fn move_to(&mut self, id: RecordId, target: E::Key) -> Transition<E::Key> {
        let Some(from) = self.find(id).map(E::key) else {
            tracing::debug!(id, "drop ignored, entity not on board");
            return Transition::Unchanged;
        };
        if from == target {
            return Transition::Unchanged;
        }

        match self.gateway.set_key(id, target).await {
            Ok(_) => {
                self.notifier.notify(Notice::success(format!(
                    "{} updated to {}",
                    capitalize(E::KEY_NOUN),
                    target.title()
                )));
                // The move already happened; a failed refresh is reported through the load state.
                let _ = self.load().await;
                Transition::Moved { from, to: target }
            }
            Err(err) => {
                tracing::warn!(id, error = %err, "{} change rejected", E::KEY_NOUN);
                self.notifier
                    .notify(Notice::error(format!("Failed to update {}", E::KEY_NOUN)));
                Transition::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    pub async fn create(&mut self, input: &E::Create) -> Result<E> {
        match self.gateway.create(input).await {
            Ok(created) => {
                self.notifier.notify(Notice::success(format!(
                    "{} created successfully!",
                    E::LABEL
                )));
                let _ = self.load().await;
                Ok(created)
            }
            Err(err @ Error::Validation(_)) => {
                self.notifier.notify(Notice::error("Please fix the form errors"));
                Err(err)
            }
            Err(err) => {
                self.notifier.notify(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Saves an edit made in the entity's form, then reloads.
    pub async fn update(&mut self, id: RecordId, input: &E::Update) -> Result<E> {
        match self.gateway.update(id, input).await {
            Ok(updated) => {
                self.notifier.notify(Notice::success(format!(
                    "{} updated successfully!",
                    E::LABEL
                )));
                let _ = self.load().await;
                Ok(updated)
            }
            Err(err) => {
                tracing::warn!(id, error = %err, "{} edit rejected", E::LABEL.to_lowercase());
                self.notifier.notify(Notice::error(format!(
                    "Failed to save {}",
                    E::LABEL.to_lowercase()
                )));
                Err(err)
            }
        }
    }

    pub async fn remove(&mut self, id: RecordId) -> Result<()> {
        match self.gateway.delete(id).await {
            Ok(()) => {
                self.notifier.notify(Notice::success(format!(
                    "{} deleted successfully!",
                    E::LABEL
                )));
                let _ = self.load().await;
                Ok(())
            }
            Err(err) => {
                self.notifier.notify(Notice::error(format!(
                    "Failed to delete {}",
                    E::LABEL.to_lowercase()
                )));
                Err(err)
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactStatus, OpportunityStage};

    #[test]
    fn grouping_keeps_declared_order_and_empty_buckets() {
        let stages = [
            OpportunityStage::ClosedWon,
            OpportunityStage::Lead,
            OpportunityStage::ClosedWon,
        ];
        let buckets = group_by_key(&stages, |s| *s);

        assert_eq!(buckets.len(), OpportunityStage::ALL.len());
        let keys: Vec<_> = buckets.iter().map(|b| b.key).collect();
        assert_eq!(keys, OpportunityStage::ALL);
        assert_eq!(buckets[0].len(), 1);
        assert!(buckets[1].is_empty());
        assert_eq!(buckets[4].len(), 2);
    }

    #[test]
    fn grouping_is_a_partition() {
        let statuses: Vec<ContactStatus> = (0..23)
            .map(|i| ContactStatus::ALL[i % 3])
            .collect();
        let buckets = group_by_key(&statuses, |s| *s);
        let total: usize = buckets.iter().map(Bucket::len).sum();
        assert_eq!(total, statuses.len());
        assert_eq!(buckets.len(), 4);
        assert!(buckets[3].is_empty());
    }

    #[test]
    fn capitalize_noun() {
        assert_eq!(capitalize("stage"), "Stage");
        assert_eq!(capitalize(""), "");
    }
}
