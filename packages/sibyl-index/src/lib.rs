mod error;
pub mod models;
pub mod qdrant;

pub use error::{Error, Result};
pub use models::{RecordMetadata, SearchHit, TenantFilter, VectorRecord};
pub use qdrant::QdrantIndex;

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The external similarity-search capability. The Qdrant implementation is
/// the production backend; tests supply an in-memory one. Implementations
/// must honor `filter` as a hard pre-filter: no record outside it may
/// appear in the result, regardless of score.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a TenantFilter,
		candidate_k: u32,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>>;
}

impl VectorIndex for QdrantIndex {
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a TenantFilter,
		candidate_k: u32,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(self.query_filtered(vector, filter, candidate_k))
	}
}
