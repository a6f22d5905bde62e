use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};

use sibyl_service::{AnswerRequest, Providers, SibylService};
use sibyl_testkit::MemoryIndex;

use super::{SpyEmbedding, StubGeneration, StubSummary, VECTOR_DIM, tenant, test_config};

fn spy_service(calls: Arc<AtomicUsize>) -> SibylService {
	let mut cfg = test_config();

	cfg.quotas.user = sibyl_config::QuotaRule { limit: 1_000, window_secs: 3_600 };

	let providers = Providers::new(
		Arc::new(SpyEmbedding { vector_dim: VECTOR_DIM, calls }),
		Arc::new(StubGeneration),
		Arc::new(StubSummary),
	);

	SibylService::with_providers(cfg, Arc::new(MemoryIndex::new()), providers)
}

fn request(query: &str) -> AnswerRequest {
	AnswerRequest {
		query: query.to_string(),
		tenant: tenant("acme", "u1", &["finance"]),
		history: Vec::new(),
	}
}

#[tokio::test]
async fn concurrent_identical_queries_share_one_embedding_call() {
	let calls = Arc::new(AtomicUsize::new(0));
	let service = Arc::new(spy_service(calls.clone()));
	let mut handles = Vec::new();

	for _ in 0..5 {
		let service = service.clone();

		handles.push(tokio::spawn(async move {
			service.answer(request("what changed today?")).await
		}));
	}

	for handle in handles {
		handle.await.expect("join").expect("answer");
	}

	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn distinct_queries_embed_separately() {
	let calls = Arc::new(AtomicUsize::new(0));
	let service = spy_service(calls.clone());

	service.answer(request("first question?")).await.expect("first");
	service.answer(request("second question?")).await.expect("second");

	assert_eq!(calls.load(Ordering::SeqCst), 2);
}
