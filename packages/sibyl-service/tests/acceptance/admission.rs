use sibyl_service::{AnswerRequest, Error};
use sibyl_testkit::MemoryIndex;

use super::{build_service, tenant, test_config};

fn request(tenant_id: &str, user_id: &str, query: &str) -> AnswerRequest {
	AnswerRequest {
		query: query.to_string(),
		tenant: tenant(tenant_id, user_id, &["finance"]),
		history: Vec::new(),
	}
}

#[tokio::test]
async fn tenant_quota_rejects_the_101st_request_in_a_window() {
	let mut cfg = test_config();

	cfg.quotas.tenant = sibyl_config::QuotaRule { limit: 100, window_secs: 3_600 };
	cfg.quotas.user = sibyl_config::QuotaRule { limit: 1_000, window_secs: 3_600 };

	let service = build_service(cfg, MemoryIndex::new());

	for index in 0..100 {
		service
			.answer(request("acme", &format!("user-{index}"), "status?"))
			.await
			.expect("within tenant quota");
	}

	let rejected = service.answer(request("acme", "user-0", "status?")).await;

	assert!(matches!(rejected, Err(Error::QuotaExceeded { .. })));

	// Another tenant's bucket is untouched.
	service.answer(request("globex", "user-0", "status?")).await.expect("other tenant admitted");
}

#[tokio::test]
async fn user_quota_is_scoped_within_the_tenant() {
	let mut cfg = test_config();

	cfg.quotas.tenant = sibyl_config::QuotaRule { limit: 100, window_secs: 3_600 };
	cfg.quotas.user = sibyl_config::QuotaRule { limit: 2, window_secs: 3_600 };

	let service = build_service(cfg, MemoryIndex::new());

	service.answer(request("acme", "u1", "first?")).await.expect("first");
	service.answer(request("acme", "u1", "second?")).await.expect("second");

	let Err(Error::QuotaExceeded { scope, .. }) =
		service.answer(request("acme", "u1", "third?")).await
	else {
		panic!("expected a user-level rejection");
	};

	assert_eq!(scope, "user:acme/u1");

	// The same user id under a different tenant has its own bucket.
	service.answer(request("globex", "u1", "first?")).await.expect("other tenant's u1");
}

#[tokio::test]
async fn cached_responses_still_consume_quota() {
	let mut cfg = test_config();

	cfg.quotas.tenant = sibyl_config::QuotaRule { limit: 2, window_secs: 3_600 };
	cfg.quotas.user = sibyl_config::QuotaRule { limit: 100, window_secs: 3_600 };

	let service = build_service(cfg, MemoryIndex::new());

	service.answer(request("acme", "u1", "same question?")).await.expect("first");

	let second = service.answer(request("acme", "u1", "same question?")).await.expect("second");

	assert!(second.cached);

	// Admission runs before the cache, so the identical third request is
	// still rejected.
	let third = service.answer(request("acme", "u1", "same question?")).await;

	assert!(matches!(third, Err(Error::QuotaExceeded { .. })));
}
