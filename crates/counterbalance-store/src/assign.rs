//! Order assignment: resolve or create the persisted presentation order for
//! a participant and query.
//!
//! 1. A stored order is returned verbatim.
//! 2. Otherwise candidates are listed, the participant's matrix row is
//!    applied (or, with fewer candidates than the matrix dimension, the
//!    candidates are kept in their listed order), and the result is offered
//!    to the store with `put_if_absent`.
//! 3. If another caller stored an order first, the stored order wins and is
//!    re-read.
//!
//! A query with no candidates yields an empty order and nothing is written.

use chrono::Utc;
use counterbalance_core::{
    ConfigError, DocId, Document, EngineConfig, MapperError, OrderAssignment, OrderKey,
    OrderMatrix, Placement, QueryId, place, row_index,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::StoreError;
use crate::traits::{DocumentRepository, OrderStore};

#[derive(Debug, Error)]
pub enum AssignError {
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mapper(#[from] MapperError),
}

/// Where a resolved order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    /// Read back from the store.
    Stored,
    /// Computed from matrix row `row` and stored by this call.
    Generated { row: usize },
    /// Fewer candidates than the matrix dimension; stored unpermuted.
    Fallback,
    /// The query has no candidates; nothing stored.
    NoCandidates,
    /// Computed, but another caller stored first; the stored order was returned.
    ConflictResolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub doc_ids: Vec<DocId>,
    pub source: OrderSource,
}

/// Documents of one query in the participant's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub query_id: QueryId,
    pub query_text: String,
    pub documents: Vec<Document>,
    pub source: OrderSource,
}

pub struct OrderService<S, D> {
    store: S,
    documents: D,
    matrix: OrderMatrix,
}

impl<S: OrderStore, D: DocumentRepository> OrderService<S, D> {
    /// Build the matrix described by `config`. An invalid configuration is
    /// rejected here rather than per request.
    pub fn new(config: &EngineConfig, store: S, documents: D) -> Result<Self, AssignError> {
        let matrix = config.matrix()?;
        info!(
            size = matrix.dimension(),
            construction = ?matrix.construction(),
            column_balanced = matrix.is_column_balanced(),
            "order matrix ready"
        );
        Ok(Self::with_matrix(matrix, store, documents))
    }

    pub fn with_matrix(matrix: OrderMatrix, store: S, documents: D) -> Self {
        Self {
            store,
            documents,
            matrix,
        }
    }

    pub fn matrix(&self) -> &OrderMatrix {
        &self.matrix
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    /// The participant's document order for `query_id`, creating and
    /// persisting it on first access.
    pub fn get_or_generate_order(
        &self,
        user_id: &str,
        query_id: QueryId,
    ) -> Result<Vec<DocId>, AssignError> {
        Ok(self.resolve(user_id, query_id)?.doc_ids)
    }

    /// Like [`get_or_generate_order`](Self::get_or_generate_order), also
    /// reporting how the order was obtained.
    pub fn resolve(&self, user_id: &str, query_id: QueryId) -> Result<Resolution, AssignError> {
        if user_id.trim().is_empty() {
            return Err(AssignError::EmptyUserId);
        }
        let key = OrderKey::new(user_id, query_id);

        if let Some(existing) = self.store.get(&key)? {
            debug!(%key, "order already stored");
            return Ok(Resolution {
                doc_ids: existing.doc_ids,
                source: OrderSource::Stored,
            });
        }

        let candidates = self.documents.list_candidate_ids(query_id)?;
        let n = self.matrix.dimension();
        let row = row_index(user_id, query_id, n)?;
        let (doc_ids, source) = match place(&candidates, &self.matrix, row) {
            Placement::Empty => {
                info!(%key, "query has no candidate documents");
                return Ok(Resolution {
                    doc_ids: Vec::new(),
                    source: OrderSource::NoCandidates,
                });
            }
            Placement::Unpermuted { doc_ids } => {
                warn!(
                    %key,
                    candidates = doc_ids.len(),
                    required = n,
                    "insufficient candidates, keeping listed order"
                );
                (doc_ids, OrderSource::Fallback)
            }
            Placement::Permuted { doc_ids, row } => (doc_ids, OrderSource::Generated { row }),
        };

        let assignment = OrderAssignment::new(&key, doc_ids, Utc::now());
        if self.store.put_if_absent(&assignment)? {
            info!(%key, source = ?source, "stored new order");
            return Ok(Resolution {
                doc_ids: assignment.doc_ids,
                source,
            });
        }

        warn!(%key, "order stored concurrently, using stored value");
        let stored = self
            .store
            .get(&key)?
            .ok_or_else(|| StoreError::LostWrite(key.to_string()))?;
        Ok(Resolution {
            doc_ids: stored.doc_ids,
            source: OrderSource::ConflictResolved,
        })
    }

    /// Resolve the order and load the documents it names, in that order.
    ///
    /// Ids that no longer resolve to a document are skipped. Unknown queries
    /// get a placeholder text.
    pub fn presented_documents(
        &self,
        user_id: &str,
        query_id: QueryId,
    ) -> Result<Presentation, AssignError> {
        let query_text = self
            .documents
            .query_text(query_id)?
            .unwrap_or_else(|| format!("Query {query_id} (No data)"));
        let resolution = self.resolve(user_id, query_id)?;
        let mut by_id = self
            .documents
            .fetch_by_ids(query_id, &resolution.doc_ids)?;
        let documents = resolution
            .doc_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        Ok(Presentation {
            query_id,
            query_text,
            documents,
            source: resolution.source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocuments, MemoryOrderStore};
    use counterbalance_core::{Construction, Query};

    fn docs_for(query_id: QueryId, ids: impl IntoIterator<Item = DocId>) -> Vec<Document> {
        ids.into_iter()
            .enumerate()
            .map(|(i, id)| Document {
                id,
                query_id,
                display_no: i as i64 + 1,
                content: format!("document {id}"),
            })
            .collect()
    }

    fn service(documents: Vec<Document>) -> OrderService<MemoryOrderStore, MemoryDocuments> {
        OrderService::new(
            &EngineConfig::default(),
            MemoryOrderStore::new(),
            MemoryDocuments::new(
                documents,
                vec![Query {
                    id: 1,
                    content: "What are the causes of inflation?".into(),
                }],
            ),
        )
        .unwrap()
    }

    /// A user whose row for `query_id` under a 9-row matrix is `row`.
    fn user_with_row(query_id: QueryId, row: usize) -> String {
        (0..)
            .map(|i| format!("user-{i}"))
            .find(|u| row_index(u, query_id, 9).unwrap() == row)
            .unwrap()
    }

    #[test]
    fn row_zero_keeps_candidate_order() {
        let svc = service(docs_for(1, 11..=19));
        let user = user_with_row(1, 0);
        let r = svc.resolve(&user, 1).unwrap();
        assert_eq!(r.doc_ids, (11..=19).collect::<Vec<_>>());
        assert_eq!(r.source, OrderSource::Generated { row: 0 });
    }

    #[test]
    fn row_one_rotates_candidates() {
        let svc = service(docs_for(1, 11..=19));
        let user = user_with_row(1, 1);
        assert_eq!(
            svc.get_or_generate_order(&user, 1).unwrap(),
            vec![12, 13, 14, 15, 16, 17, 18, 19, 11]
        );
    }

    #[test]
    fn second_call_returns_stored_order() {
        let svc = service(docs_for(1, 11..=19));
        let first = svc.resolve("alice", 1).unwrap();
        let second = svc.resolve("alice", 1).unwrap();
        assert_eq!(first.doc_ids, second.doc_ids);
        assert_eq!(second.source, OrderSource::Stored);
        assert_eq!(svc.store().len().unwrap(), 1);
    }

    #[test]
    fn stored_order_is_never_regenerated() {
        let svc = service(docs_for(1, 11..=19));
        let key = OrderKey::new("alice", 1);
        let pinned = OrderAssignment::new(&key, vec![19, 18, 17], Utc::now());
        svc.store().put_if_absent(&pinned).unwrap();
        assert_eq!(svc.get_or_generate_order("alice", 1).unwrap(), vec![19, 18, 17]);
    }

    #[test]
    fn colliding_users_get_identical_orders() {
        let svc = service(docs_for(1, 11..=19));
        let target = row_index("user-0", 1, 9).unwrap();
        let other = (1..)
            .map(|i| format!("user-{i}"))
            .find(|u| row_index(u, 1, 9).unwrap() == target)
            .unwrap();
        assert_eq!(
            svc.get_or_generate_order("user-0", 1).unwrap(),
            svc.get_or_generate_order(&other, 1).unwrap()
        );
    }

    #[test]
    fn assigned_order_is_permutation_of_first_nine() {
        let svc = service(docs_for(1, 100..112));
        for i in 0..20 {
            let mut ids = svc.get_or_generate_order(&format!("p{i}"), 1).unwrap();
            assert_eq!(ids.len(), 9);
            ids.sort();
            assert_eq!(ids, (100..109).collect::<Vec<_>>());
        }
    }

    #[test]
    fn underflow_falls_back_and_persists() {
        let svc = service(docs_for(1, [5, 3, 8]));
        let r = svc.resolve("bob", 1).unwrap();
        // Listed by display number, which follows insertion order here.
        assert_eq!(r.doc_ids, vec![5, 3, 8]);
        assert_eq!(r.source, OrderSource::Fallback);
        assert!(svc.store().get(&OrderKey::new("bob", 1)).unwrap().is_some());
    }

    #[test]
    fn no_candidates_writes_nothing() {
        let svc = service(Vec::new());
        let r = svc.resolve("carol", 7).unwrap();
        assert!(r.doc_ids.is_empty());
        assert_eq!(r.source, OrderSource::NoCandidates);
        assert!(svc.store().get(&OrderKey::new("carol", 7)).unwrap().is_none());
        assert!(svc.store().is_empty().unwrap());
    }

    #[test]
    fn empty_user_is_rejected() {
        let svc = service(docs_for(1, 11..=19));
        assert!(matches!(svc.resolve("", 1), Err(AssignError::EmptyUserId)));
        assert!(matches!(svc.resolve("   ", 1), Err(AssignError::EmptyUserId)));
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = EngineConfig {
            square_size: 0,
            ..EngineConfig::default()
        };
        let result = OrderService::new(&config, MemoryOrderStore::new(), MemoryDocuments::default());
        assert!(matches!(result, Err(AssignError::Config(_))));
    }

    #[test]
    fn presentation_follows_stored_order() {
        let svc = service(docs_for(1, 11..=19));
        let user = user_with_row(1, 1);
        let p = svc.presented_documents(&user, 1).unwrap();
        assert_eq!(p.query_text, "What are the causes of inflation?");
        let ids: Vec<DocId> = p.documents.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![12, 13, 14, 15, 16, 17, 18, 19, 11]);
        assert_eq!(p.documents[0].content, "document 12");
    }

    #[test]
    fn presentation_skips_vanished_documents() {
        let svc = service(docs_for(2, 11..=19));
        let key = OrderKey::new("dave", 2);
        svc.store()
            .put_if_absent(&OrderAssignment::new(&key, vec![11, 999, 12], Utc::now()))
            .unwrap();
        let p = svc.presented_documents("dave", 2).unwrap();
        assert_eq!(p.documents.len(), 2);
        assert_eq!(p.query_text, "Query 2 (No data)");
        assert_eq!(p.source, OrderSource::Stored);
    }

    #[test]
    fn sampled_matrix_service() {
        let config = EngineConfig {
            square_size: 3,
            construction: Construction::Sampled,
            ..EngineConfig::default()
        };
        let svc = OrderService::new(
            &config,
            MemoryOrderStore::new(),
            MemoryDocuments::new(docs_for(1, [10, 20, 30]), vec![]),
        )
        .unwrap();
        assert!(!svc.matrix().is_column_balanced());
        let user = (0..)
            .map(|i| format!("s{i}"))
            .find(|u| row_index(u, 1, 3).unwrap() == 2)
            .unwrap();
        assert_eq!(svc.get_or_generate_order(&user, 1).unwrap(), vec![30, 10, 20]);
    }

    /// Store that reports every write as lost to a rival whose value it
    /// then serves.
    struct Rival {
        inner: MemoryOrderStore,
        rival_order: Vec<DocId>,
    }

    impl OrderStore for Rival {
        fn get(&self, key: &OrderKey) -> Result<Option<OrderAssignment>, StoreError> {
            self.inner.get(key)
        }

        fn put_if_absent(&self, a: &OrderAssignment) -> Result<bool, StoreError> {
            let rival = OrderAssignment::new(&a.key(), self.rival_order.clone(), Utc::now());
            self.inner.put_if_absent(&rival)?;
            Ok(false)
        }
    }

    #[test]
    fn losing_writer_returns_stored_value() {
        let svc = OrderService::new(
            &EngineConfig::default(),
            Rival {
                inner: MemoryOrderStore::new(),
                rival_order: vec![1, 2, 3],
            },
            MemoryDocuments::new(docs_for(1, 11..=19), vec![]),
        )
        .unwrap();
        let r = svc.resolve("erin", 1).unwrap();
        assert_eq!(r.doc_ids, vec![1, 2, 3]);
        assert_eq!(r.source, OrderSource::ConflictResolved);
    }

    /// Store that rejects writes but never returns a value.
    struct BlackHole;

    impl OrderStore for BlackHole {
        fn get(&self, _key: &OrderKey) -> Result<Option<OrderAssignment>, StoreError> {
            Ok(None)
        }

        fn put_if_absent(&self, _a: &OrderAssignment) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[test]
    fn lost_write_is_an_error() {
        let svc = OrderService::new(
            &EngineConfig::default(),
            BlackHole,
            MemoryDocuments::new(docs_for(1, 11..=19), vec![]),
        )
        .unwrap();
        assert!(matches!(
            svc.resolve("frank", 1),
            Err(AssignError::Store(StoreError::LostWrite(_)))
        ));
    }
}
