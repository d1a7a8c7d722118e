//! Contracts between the assignment service and its collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use counterbalance_core::{DocId, Document, InteractionEvent, OrderAssignment, OrderKey, QueryId};

use crate::StoreError;

/// Write-once register of presentation orders keyed by (user, query).
pub trait OrderStore: Send + Sync {
    /// The stored assignment for `key`, if any.
    fn get(&self, key: &OrderKey) -> Result<Option<OrderAssignment>, StoreError>;

    /// Store `assignment` unless its key already has a value.
    ///
    /// Returns `true` if this call's value became the stored value and
    /// `false` if another value was already present. Implementations must
    /// guarantee at most one winner under concurrent calls for one key.
    fn put_if_absent(&self, assignment: &OrderAssignment) -> Result<bool, StoreError>;
}

/// Read-only access to queries and their candidate documents.
pub trait DocumentRepository: Send + Sync {
    /// Candidate ids for `query_id`, ascending by display number then id.
    fn list_candidate_ids(&self, query_id: QueryId) -> Result<Vec<DocId>, StoreError>;

    /// Documents of `query_id` whose id is in `ids`. Unknown ids are absent
    /// from the result.
    fn fetch_by_ids(
        &self,
        query_id: QueryId,
        ids: &[DocId],
    ) -> Result<HashMap<DocId, Document>, StoreError>;

    fn query_text(&self, query_id: QueryId) -> Result<Option<String>, StoreError>;
}

/// Append-only destination for interaction events.
pub trait EventSink: Send + Sync {
    fn append(&self, event: &InteractionEvent) -> Result<(), StoreError>;
}

impl<T: OrderStore + ?Sized> OrderStore for &T {
    fn get(&self, key: &OrderKey) -> Result<Option<OrderAssignment>, StoreError> {
        (**self).get(key)
    }

    fn put_if_absent(&self, assignment: &OrderAssignment) -> Result<bool, StoreError> {
        (**self).put_if_absent(assignment)
    }
}

impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    fn get(&self, key: &OrderKey) -> Result<Option<OrderAssignment>, StoreError> {
        (**self).get(key)
    }

    fn put_if_absent(&self, assignment: &OrderAssignment) -> Result<bool, StoreError> {
        (**self).put_if_absent(assignment)
    }
}

impl<T: DocumentRepository + ?Sized> DocumentRepository for &T {
    fn list_candidate_ids(&self, query_id: QueryId) -> Result<Vec<DocId>, StoreError> {
        (**self).list_candidate_ids(query_id)
    }

    fn fetch_by_ids(
        &self,
        query_id: QueryId,
        ids: &[DocId],
    ) -> Result<HashMap<DocId, Document>, StoreError> {
        (**self).fetch_by_ids(query_id, ids)
    }

    fn query_text(&self, query_id: QueryId) -> Result<Option<String>, StoreError> {
        (**self).query_text(query_id)
    }
}

impl<T: DocumentRepository + ?Sized> DocumentRepository for Arc<T> {
    fn list_candidate_ids(&self, query_id: QueryId) -> Result<Vec<DocId>, StoreError> {
        (**self).list_candidate_ids(query_id)
    }

    fn fetch_by_ids(
        &self,
        query_id: QueryId,
        ids: &[DocId],
    ) -> Result<HashMap<DocId, Document>, StoreError> {
        (**self).fetch_by_ids(query_id, ids)
    }

    fn query_text(&self, query_id: QueryId) -> Result<Option<String>, StoreError> {
        (**self).query_text(query_id)
    }
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn append(&self, event: &InteractionEvent) -> Result<(), StoreError> {
        (**self).append(event)
    }
}
