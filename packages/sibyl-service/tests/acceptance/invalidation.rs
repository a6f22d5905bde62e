use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};

use sibyl_service::{AnswerRequest, Providers, SibylService};
use sibyl_testkit::MemoryIndex;

use super::{SpyGeneration, StubEmbedding, StubSummary, VECTOR_DIM, stub_vector, tenant, test_config};

#[tokio::test]
async fn tenant_invalidation_forces_recompute_without_touching_others() {
	let calls = Arc::new(AtomicUsize::new(0));
	let index = MemoryIndex::with_records(vec![
		sibyl_testkit::record(
			"acme",
			"doc",
			"D-1",
			&["finance"],
			"Acme quarterly numbers.",
			stub_vector(VECTOR_DIM),
		),
		sibyl_testkit::record(
			"globex",
			"doc",
			"D-9",
			&["finance"],
			"Globex quarterly numbers.",
			stub_vector(VECTOR_DIM),
		),
	]);
	let providers = Providers::new(
		Arc::new(StubEmbedding { vector_dim: VECTOR_DIM }),
		Arc::new(SpyGeneration { calls: calls.clone() }),
		Arc::new(StubSummary),
	);
	let service = SibylService::with_providers(test_config(), Arc::new(index), providers);
	let acme = AnswerRequest {
		query: "quarterly numbers?".to_string(),
		tenant: tenant("acme", "u1", &["finance"]),
		history: Vec::new(),
	};
	let globex = AnswerRequest {
		query: "quarterly numbers?".to_string(),
		tenant: tenant("globex", "u1", &["finance"]),
		history: Vec::new(),
	};

	service.answer(acme.clone()).await.expect("acme warm");
	service.answer(globex.clone()).await.expect("globex warm");
	assert_eq!(calls.load(Ordering::SeqCst), 2);

	let removed = service.invalidate_tenant("acme");

	assert_eq!(removed, 1);

	// Acme recomputes, globex still replays from cache.
	let acme_again = service.answer(acme).await.expect("acme recompute");
	let globex_again = service.answer(globex).await.expect("globex replay");

	assert!(!acme_again.cached);
	assert!(globex_again.cached);
	assert_eq!(calls.load(Ordering::SeqCst), 3);
}
