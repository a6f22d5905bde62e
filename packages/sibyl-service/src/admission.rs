//! Per-scope request quotas. Runs before any cache, embedding, or search
//! work, so a rejected request costs a map lookup and nothing else.

use std::{
	collections::HashMap,
	sync::{Arc, Mutex, RwLock},
};

use time::{Duration, OffsetDateTime};

use sibyl_domain::quota::{QuotaBucket, QuotaDecision, check_and_record};

use crate::{Error, Result, TenantContext};

pub struct AdmissionController {
	buckets: RwLock<HashMap<String, Arc<Mutex<QuotaBucket>>>>,
}
impl AdmissionController {
	pub fn new() -> Self {
		Self { buckets: RwLock::new(HashMap::new()) }
	}

	/// Admits or rejects one request for `scope`. Lock granularity is the
	/// scope's own bucket; the shared map is only write-locked when a scope
	/// is seen for the first time.
	pub fn check_and_record_at(
		&self,
		scope: &str,
		rule: sibyl_config::QuotaRule,
		now: OffsetDateTime,
	) -> Result<()> {
		let bucket = self.bucket(scope, now);
		let decision = {
			let mut bucket = bucket.lock().unwrap_or_else(|err| err.into_inner());

			check_and_record(&mut bucket, rule.limit, Duration::seconds(rule.window_secs as i64), now)
		};

		match decision {
			QuotaDecision::Admitted => Ok(()),
			QuotaDecision::Rejected => {
				Err(Error::QuotaExceeded { scope: scope.to_string(), limit: rule.limit })
			},
		}
	}

	fn bucket(&self, scope: &str, now: OffsetDateTime) -> Arc<Mutex<QuotaBucket>> {
		{
			let buckets = self.buckets.read().unwrap_or_else(|err| err.into_inner());

			if let Some(bucket) = buckets.get(scope) {
				return bucket.clone();
			}
		}

		let mut buckets = self.buckets.write().unwrap_or_else(|err| err.into_inner());

		buckets
			.entry(scope.to_string())
			.or_insert_with(|| Arc::new(Mutex::new(QuotaBucket::new(now))))
			.clone()
	}
}

pub fn tenant_scope(tenant: &TenantContext) -> String {
	format!("tenant:{}", tenant.tenant_id)
}

/// Includes the tenant id so identical user ids across tenants never share
/// a bucket.
pub fn user_scope(tenant: &TenantContext) -> String {
	format!("user:{}/{}", tenant.tenant_id, tenant.user_id)
}
