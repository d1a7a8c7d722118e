//! In-memory collaborators for tests and ephemeral runs.

use std::collections::{BTreeMap, HashMap};
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard};

use counterbalance_core::{
    DocId, Document, InteractionEvent, OrderAssignment, OrderKey, Query, QueryId,
};

use crate::traits::{DocumentRepository, EventSink, OrderStore};
use crate::StoreError;

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    m.lock().map_err(|_| StoreError::Poisoned)
}

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<OrderKey, OrderAssignment>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(lock(&self.orders)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(lock(&self.orders)?.is_empty())
    }

    /// All assignments, ordered by key.
    pub fn snapshot(&self) -> Result<Vec<OrderAssignment>, StoreError> {
        let orders = lock(&self.orders)?;
        let mut all: Vec<OrderAssignment> = orders.values().cloned().collect();
        all.sort_by_key(|a| a.key());
        Ok(all)
    }
}

impl OrderStore for MemoryOrderStore {
    fn get(&self, key: &OrderKey) -> Result<Option<OrderAssignment>, StoreError> {
        Ok(lock(&self.orders)?.get(key).cloned())
    }

    fn put_if_absent(&self, assignment: &OrderAssignment) -> Result<bool, StoreError> {
        match lock(&self.orders)?.entry(assignment.key()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(assignment.clone());
                Ok(true)
            }
        }
    }
}

/// Document and query reference data held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryDocuments {
    documents: BTreeMap<DocId, Document>,
    queries: BTreeMap<QueryId, String>,
}

impl MemoryDocuments {
    pub fn new(documents: Vec<Document>, queries: Vec<Query>) -> Self {
        Self {
            documents: documents.into_iter().map(|d| (d.id, d)).collect(),
            queries: queries.into_iter().map(|q| (q.id, q.content)).collect(),
        }
    }

    pub fn insert(&mut self, document: Document) {
        self.documents.insert(document.id, document);
    }
}

impl DocumentRepository for MemoryDocuments {
    fn list_candidate_ids(&self, query_id: QueryId) -> Result<Vec<DocId>, StoreError> {
        let mut docs: Vec<&Document> = self
            .documents
            .values()
            .filter(|d| d.query_id == query_id)
            .collect();
        docs.sort_by_key(|d| (d.display_no, d.id));
        Ok(docs.into_iter().map(|d| d.id).collect())
    }

    fn fetch_by_ids(
        &self,
        query_id: QueryId,
        ids: &[DocId],
    ) -> Result<HashMap<DocId, Document>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.documents.get(id))
            .filter(|d| d.query_id == query_id)
            .map(|d| (d.id, d.clone()))
            .collect())
    }

    fn query_text(&self, query_id: QueryId) -> Result<Option<String>, StoreError> {
        Ok(self.queries.get(&query_id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<InteractionEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Result<Vec<InteractionEvent>, StoreError> {
        Ok(lock(&self.events)?.clone())
    }
}

impl EventSink for MemoryEventLog {
    fn append(&self, event: &InteractionEvent) -> Result<(), StoreError> {
        lock(&self.events)?.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use counterbalance_core::EventType;

    fn doc(id: DocId, query_id: QueryId, display_no: i64) -> Document {
        Document {
            id,
            query_id,
            display_no,
            content: format!("doc {id}"),
        }
    }

    #[test]
    fn put_if_absent_is_write_once() {
        let store = MemoryOrderStore::new();
        let key = OrderKey::new("u", 1);
        let first = OrderAssignment::new(&key, vec![1, 2, 3], Utc::now());
        let second = OrderAssignment::new(&key, vec![3, 2, 1], Utc::now());
        assert!(store.put_if_absent(&first).unwrap());
        assert!(!store.put_if_absent(&second).unwrap());
        assert_eq!(store.get(&key).unwrap().unwrap().doc_ids, vec![1, 2, 3]);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn get_missing_is_none() {
        let store = MemoryOrderStore::new();
        assert!(store.get(&OrderKey::new("nobody", 9)).unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let store = std::sync::Arc::new(MemoryOrderStore::new());
        let holder = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = holder.orders.lock().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(matches!(store.len(), Err(StoreError::Poisoned)));
        assert!(matches!(store.is_empty(), Err(StoreError::Poisoned)));
        assert!(matches!(
            store.get(&OrderKey::new("u", 1)),
            Err(StoreError::Poisoned)
        ));
    }

    #[test]
    fn snapshot_sorted_by_key() {
        let store = MemoryOrderStore::new();
        for (u, q) in [("b", 1), ("a", 2), ("a", 1)] {
            let key = OrderKey::new(u, q);
            store
                .put_if_absent(&OrderAssignment::new(&key, vec![1], Utc::now()))
                .unwrap();
        }
        let keys: Vec<OrderKey> = store.snapshot().unwrap().iter().map(|a| a.key()).collect();
        assert_eq!(
            keys,
            vec![OrderKey::new("a", 1), OrderKey::new("a", 2), OrderKey::new("b", 1)]
        );
    }

    #[test]
    fn candidates_ordered_by_display_number() {
        let repo = MemoryDocuments::new(
            vec![doc(3, 1, 11), doc(1, 1, 13), doc(2, 1, 12), doc(9, 2, 1)],
            vec![],
        );
        assert_eq!(repo.list_candidate_ids(1).unwrap(), vec![3, 2, 1]);
        assert_eq!(repo.list_candidate_ids(2).unwrap(), vec![9]);
        assert!(repo.list_candidate_ids(3).unwrap().is_empty());
    }

    #[test]
    fn display_number_ties_break_by_id() {
        let repo = MemoryDocuments::new(vec![doc(5, 1, 1), doc(4, 1, 1)], vec![]);
        assert_eq!(repo.list_candidate_ids(1).unwrap(), vec![4, 5]);
    }

    #[test]
    fn fetch_skips_unknown_and_foreign_ids() {
        let repo = MemoryDocuments::new(vec![doc(1, 1, 1), doc(2, 2, 1)], vec![]);
        let found = repo.fetch_by_ids(1, &[1, 2, 99]).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&1));
    }

    #[test]
    fn query_text_lookup() {
        let repo = MemoryDocuments::new(
            vec![],
            vec![Query {
                id: 1,
                content: "What causes inflation?".into(),
            }],
        );
        assert_eq!(
            repo.query_text(1).unwrap().as_deref(),
            Some("What causes inflation?")
        );
        assert!(repo.query_text(2).unwrap().is_none());
    }

    #[test]
    fn event_log_appends_in_order() {
        let log = MemoryEventLog::new();
        for (i, kind) in [EventType::OpenDoc, EventType::CloseDoc].into_iter().enumerate() {
            log.append(&InteractionEvent {
                user_id: "u".into(),
                query_id: 1,
                doc_ref: i as i64,
                event_type: kind,
                start_idx: -1,
                end_idx: -1,
                duration: 0,
                pass_flag: false,
                timestamp: Utc::now(),
            })
            .unwrap();
        }
        let events = log.events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::OpenDoc);
        assert_eq!(events[1].doc_ref, 1);
    }
}
