use rand::{Rng, SeedableRng, rngs::StdRng};
use time::OffsetDateTime;

use sibyl_domain::context::{ConversationTurn, Role};
use sibyl_service::AnswerRequest;
use sibyl_testkit::MemoryIndex;

use super::{build_service, stub_vector, tenant, test_config, VECTOR_DIM};

fn seeded_index() -> MemoryIndex {
	MemoryIndex::with_records(vec![
		sibyl_testkit::record(
			"acme",
			"ticket",
			"PR-0012",
			&["finance"],
			"PR-0012 is awaiting CFO approval.",
			stub_vector(VECTOR_DIM),
		),
		sibyl_testkit::record(
			"acme",
			"doc",
			"HR-7",
			&["hr"],
			"Parental leave policy draft.",
			stub_vector(VECTOR_DIM),
		),
		// Same id, different tenant. A decoy that must never surface for
		// acme requesters.
		sibyl_testkit::record(
			"globex",
			"ticket",
			"PR-0012",
			&["finance"],
			"Globex PR-0012 was cancelled.",
			stub_vector(VECTOR_DIM),
		),
	])
}

#[tokio::test]
async fn citations_never_cross_tenant_or_access_level() {
	let service = build_service(test_config(), seeded_index());
	let request = AnswerRequest {
		query: "What is the status of PR-0012?".to_string(),
		tenant: tenant("acme", "u1", &["finance"]),
		history: Vec::new(),
	};
	let response = service.answer(request).await.expect("answer");

	assert!(!response.degraded);
	assert_eq!(response.citations.len(), 1);
	assert_eq!(response.citations[0].source_id, "PR-0012");
	assert!(response.citations[0].snippet.contains("CFO approval"));
}

#[tokio::test]
async fn search_is_hard_filtered_by_access_levels() {
	let service = build_service(test_config(), seeded_index());
	let hits = service
		.search(&stub_vector(VECTOR_DIM), &tenant("acme", "u1", &["finance", "hr"]), 10, 0.25)
		.await
		.expect("search");

	// Both acme records are visible, the globex one never is.
	assert_eq!(hits.len(), 2);
	assert!(hits.iter().all(|hit| hit.record.metadata.tenant_id == "acme"));
}

#[tokio::test]
async fn randomized_fixtures_never_surface_foreign_tenants_or_levels() {
	let mut rng = StdRng::seed_from_u64(0x51BF);
	let tenants = ["acme", "globex", "initech"];
	let levels = ["finance", "hr", "eng", "legal"];

	for round in 0..300 {
		let records = (0..rng.gen_range(5..40))
			.map(|index| {
				let tenant_id = tenants[rng.gen_range(0..tenants.len())];
				let level = levels[rng.gen_range(0..levels.len())];

				sibyl_testkit::record(
					tenant_id,
					"doc",
					&format!("{tenant_id}-D{index}"),
					&[level],
					"fixture text",
					stub_vector(VECTOR_DIM),
				)
			})
			.collect();
		let service = build_service(test_config(), MemoryIndex::with_records(records));
		let requester_tenant = tenants[rng.gen_range(0..tenants.len())];
		let granted: Vec<&str> = levels.iter().copied().filter(|_| rng.gen_bool(0.5)).collect();
		let hits = service
			.search(&stub_vector(VECTOR_DIM), &tenant(requester_tenant, "u1", &granted), 50, 0.0)
			.await
			.expect("search");

		for hit in &hits {
			assert_eq!(
				hit.record.metadata.tenant_id, requester_tenant,
				"round {round}: foreign tenant surfaced"
			);
			assert!(
				hit.record
					.metadata
					.access_levels
					.iter()
					.any(|level| granted.contains(&level.as_str())),
				"round {round}: record surfaced without a granted access level"
			);
		}
	}
}

#[tokio::test]
async fn empty_access_levels_yield_no_passages() {
	let service = build_service(test_config(), seeded_index());
	let request = AnswerRequest {
		query: "What is the status of PR-0012?".to_string(),
		tenant: tenant("acme", "u1", &[]),
		history: vec![ConversationTurn {
			role: Role::User,
			content: "hello".to_string(),
			timestamp: OffsetDateTime::UNIX_EPOCH,
		}],
	};
	let response = service.answer(request).await.expect("answer");

	assert!(response.citations.is_empty());
}
