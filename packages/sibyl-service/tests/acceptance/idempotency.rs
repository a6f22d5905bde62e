use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};

use sibyl_service::{AnswerRequest, Providers, SibylService};
use sibyl_testkit::MemoryIndex;

use super::{SpyGeneration, StubEmbedding, StubSummary, VECTOR_DIM, stub_vector, tenant, test_config};

fn spy_service(calls: Arc<AtomicUsize>) -> SibylService {
	let index = MemoryIndex::with_records(vec![sibyl_testkit::record(
		"acme",
		"policy",
		"POL-1",
		&["finance"],
		"Expense reports are due monthly.",
		stub_vector(VECTOR_DIM),
	)]);
	let providers = Providers::new(
		Arc::new(StubEmbedding { vector_dim: VECTOR_DIM }),
		Arc::new(SpyGeneration { calls }),
		Arc::new(StubSummary),
	);

	SibylService::with_providers(test_config(), Arc::new(index), providers)
}

fn request(query: &str) -> AnswerRequest {
	AnswerRequest {
		query: query.to_string(),
		tenant: tenant("acme", "u1", &["finance"]),
		history: Vec::new(),
	}
}

#[tokio::test]
async fn identical_replay_is_served_from_cache() {
	let calls = Arc::new(AtomicUsize::new(0));
	let service = spy_service(calls.clone());
	let first = service.answer(request("When are expense reports due?")).await.expect("first");
	let second = service.answer(request("When are expense reports due?")).await.expect("second");

	assert!(!first.cached);
	assert!(second.cached);
	assert_eq!(first.answer, second.answer);
	assert_eq!(first.citations.len(), second.citations.len());
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn whitespace_variants_share_one_entry() {
	let calls = Arc::new(AtomicUsize::new(0));
	let service = spy_service(calls.clone());

	service.answer(request("When are expense reports due?")).await.expect("first");

	let replay =
		service.answer(request("  When are   expense reports due? ")).await.expect("replay");

	assert!(replay.cached);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_access_levels_never_share_an_entry() {
	let calls = Arc::new(AtomicUsize::new(0));
	let service = spy_service(calls.clone());

	service.answer(request("When are expense reports due?")).await.expect("first");

	let other_scope = AnswerRequest {
		query: "When are expense reports due?".to_string(),
		tenant: tenant("acme", "u2", &["hr"]),
		history: Vec::new(),
	};
	let response = service.answer(other_scope).await.expect("other scope");

	// A requester with different permissions recomputes; reusing the
	// finance-grounded answer would leak.
	assert!(!response.cached);
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}
