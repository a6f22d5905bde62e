//! Memoized pipeline outputs. Keys bind the tenant, the sorted permission
//! set, the normalized query, and a fingerprint of the conversation state,
//! so no entry can ever be served across a permission boundary. Tenant tags
//! support eager invalidation when a tenant's documents change.

use std::{collections::HashMap, sync::Mutex};

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use sibyl_domain::context::ConversationTurn;

use crate::{Error, Result};

const RESPONSE_CACHE_SCHEMA_VERSION: i32 = 1;
const HISTORY_FINGERPRINT_SCHEMA_VERSION: i32 = 1;

pub(crate) const NAMESPACE_TAG: &str = "namespace:answer";

pub(crate) fn tenant_tag(tenant_id: &str) -> String {
	format!("tenant:{tenant_id}")
}

pub(crate) struct CacheEntry {
	pub(crate) value: Value,
	pub(crate) created_at: OffsetDateTime,
	pub(crate) ttl: Duration,
	pub(crate) tags: Vec<String>,
}
impl CacheEntry {
	fn expired(&self, now: OffsetDateTime) -> bool {
		now >= self.created_at + self.ttl
	}
}

pub(crate) struct ResponseCache {
	entries: Mutex<HashMap<String, CacheEntry>>,
}
impl ResponseCache {
	pub(crate) fn new() -> Self {
		Self { entries: Mutex::new(HashMap::new()) }
	}

	pub(crate) fn get(&self, key: &str, now: OffsetDateTime) -> Option<Value> {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
		let entry = entries.get(key)?;

		if entry.expired(now) {
			entries.remove(key);

			return None;
		}

		Some(entry.value.clone())
	}

	pub(crate) fn set(
		&self,
		key: String,
		value: Value,
		ttl: Duration,
		tags: Vec<String>,
		now: OffsetDateTime,
	) {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		// Opportunistic sweep keeps the map from accumulating dead entries
		// between reads.
		entries.retain(|_, entry| !entry.expired(now));
		entries.insert(key, CacheEntry { value, created_at: now, ttl, tags });
	}

	/// Eagerly removes every entry matching the predicate. Stale citations
	/// are a correctness defect, not a staleness nuisance, so document
	/// changes must not wait for TTL expiry.
	pub(crate) fn invalidate(&self, predicate: impl Fn(&[String]) -> bool) -> usize {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
		let before = entries.len();

		entries.retain(|_, entry| !predicate(&entry.tags));

		before - entries.len()
	}

	pub(crate) fn invalidate_tenant(&self, tenant_id: &str) -> usize {
		let tag = tenant_tag(tenant_id);

		self.invalidate(|tags| tags.iter().any(|entry_tag| *entry_tag == tag))
	}
}

pub(crate) fn build_response_cache_key(
	tenant_id: &str,
	access_levels: &[String],
	query: &str,
	history_fingerprint: &str,
) -> Result<String> {
	let mut sorted_levels: Vec<&str> = access_levels.iter().map(String::as_str).collect();

	sorted_levels.sort_unstable();

	let payload = serde_json::json!({
		"kind": "response",
		"schema_version": RESPONSE_CACHE_SCHEMA_VERSION,
		"tenant_id": tenant_id,
		"access_levels": sorted_levels,
		"query": crate::normalize_text(query),
		"history": history_fingerprint,
	});

	hash_cache_key(&payload)
}

/// Fingerprint of the non-retrieved portion of the context. Two requests
/// with different conversation state never collide on one entry.
pub(crate) fn fingerprint_history(history: &[ConversationTurn]) -> Result<String> {
	let turns: Vec<Value> = history
		.iter()
		.map(|turn| {
			serde_json::json!({
				"role": turn.role,
				"content": turn.content,
			})
		})
		.collect();
	let payload = serde_json::json!({
		"kind": "history",
		"schema_version": HISTORY_FINGERPRINT_SCHEMA_VERSION,
		"turns": turns,
	});

	hash_cache_key(&payload)
}

fn hash_cache_key(payload: &Value) -> Result<String> {
	let raw = serde_json::to_vec(payload).map_err(|err| Error::Cache {
		message: format!("Failed to encode cache key payload: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}
