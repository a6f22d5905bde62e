use std::sync::Arc;

use sibyl_index::{BoxFuture, SearchHit, TenantFilter, VectorIndex};
use sibyl_service::{AnswerRequest, Providers, SibylService};
use sibyl_testkit::MemoryIndex;

use super::{
	FailingEmbedding, StubEmbedding, StubGeneration, StubSummary, VECTOR_DIM, tenant, test_config,
};

struct FailingIndex;
impl VectorIndex for FailingIndex {
	fn search<'a>(
		&'a self,
		_vector: &'a [f32],
		_filter: &'a TenantFilter,
		_candidate_k: u32,
	) -> BoxFuture<'a, sibyl_index::Result<Vec<SearchHit>>> {
		Box::pin(async { Err(sibyl_index::Error::Unavailable("index offline".to_string())) })
	}
}

fn request() -> AnswerRequest {
	AnswerRequest {
		query: "anything new?".to_string(),
		tenant: tenant("acme", "u1", &["finance"]),
		history: Vec::new(),
	}
}

#[tokio::test]
async fn embedding_outage_degrades_instead_of_failing() {
	let providers = Providers::new(
		Arc::new(FailingEmbedding),
		Arc::new(StubGeneration),
		Arc::new(StubSummary),
	);
	let service =
		SibylService::with_providers(test_config(), Arc::new(MemoryIndex::new()), providers);
	let response = service.answer(request()).await.expect("degraded, not an error");

	assert!(response.degraded);
	assert!(response.citations.is_empty());
	assert!(!response.cached);
}

#[tokio::test]
async fn retrieval_outage_degrades_and_is_never_cached() {
	let providers = Providers::new(
		Arc::new(StubEmbedding { vector_dim: VECTOR_DIM }),
		Arc::new(StubGeneration),
		Arc::new(StubSummary),
	);
	let service = SibylService::with_providers(test_config(), Arc::new(FailingIndex), providers);
	let first = service.answer(request()).await.expect("degraded");
	let second = service.answer(request()).await.expect("degraded again");

	assert!(first.degraded);
	// A degraded answer must never be replayed once the backend recovers;
	// the replay recomputes instead of hitting the cache.
	assert!(!second.cached);
	assert!(second.degraded);
}
