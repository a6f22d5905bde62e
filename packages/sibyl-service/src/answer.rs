use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use sibyl_domain::context::ConversationTurn;

use crate::{
	Error, Result, SibylService, TenantContext,
	admission::{tenant_scope, user_scope},
	response_cache::{NAMESPACE_TAG, build_response_cache_key, fingerprint_history, tenant_tag},
	retry::with_backoff,
};

const NO_DATA_ANSWER: &str =
	"No data is available to answer this question right now. Please try again later.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
	pub query: String,
	pub tenant: TenantContext,
	#[serde(default)]
	pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
	pub record_id: Uuid,
	pub source_type: String,
	pub source_id: String,
	pub snippet: String,
	pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
	pub trace_id: Uuid,
	pub answer: String,
	pub citations: Vec<Citation>,
	/// True when a backend outage forced the pipeline to answer without
	/// retrieved grounding; callers should show a lower-confidence marker.
	pub degraded: bool,
	pub cached: bool,
}

/// The cacheable part of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedAnswer {
	answer: String,
	citations: Vec<Citation>,
}

impl SibylService {
	/// The full request pipeline: admission, response-cache lookup, query
	/// embedding, permission-filtered search, context assembly, generation,
	/// response-cache store.
	pub async fn answer(&self, req: AnswerRequest) -> Result<AnswerResponse> {
		let trace_id = Uuid::new_v4();
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidInput { message: "query must be non-empty.".to_string() });
		}
		if req.tenant.tenant_id.trim().is_empty() || req.tenant.user_id.trim().is_empty() {
			return Err(Error::InvalidInput {
				message: "tenant_id and user_id are required.".to_string(),
			});
		}

		// Admission runs before any expensive work. Tenant scope first;
		// a tenant-level rejection leaves the user bucket untouched.
		let now = OffsetDateTime::now_utc();

		self.admission.check_and_record_at(
			&tenant_scope(&req.tenant),
			self.cfg.quotas.tenant,
			now,
		)?;
		self.admission.check_and_record_at(&user_scope(&req.tenant), self.cfg.quotas.user, now)?;

		debug!(%trace_id, tenant_id = %req.tenant.tenant_id, "Request admitted.");

		let cache_key = self.response_cache_key(&req, query);

		if let Some(key) = cache_key.as_deref()
			&& let Some(value) = self.response_cache.get(key, now)
		{
			match serde_json::from_value::<CachedAnswer>(value) {
				Ok(cached) => {
					debug!(%trace_id, "Response cache hit.");

					return Ok(AnswerResponse {
						trace_id,
						answer: cached.answer,
						citations: cached.citations,
						degraded: false,
						cached: true,
					});
				},
				// A malformed entry is treated as a miss; the store below
				// will overwrite it.
				Err(err) => warn!(%trace_id, error = %err, "Discarding undecodable cache entry."),
			}
		}

		let query_vector = match with_backoff(&self.cfg.retry, "embedding", || {
			Box::pin(self.embedding_cache.get(
				self.providers.embedding.as_ref(),
				&self.cfg.providers.embedding,
				query,
			))
		})
		.await
		{
			Ok(vector) => vector,
			Err(err) if matches!(err, Error::EmbeddingUnavailable { .. }) => {
				return Ok(self.degraded_response(trace_id, &err));
			},
			Err(err) => return Err(err),
		};

		let hits = match with_backoff(&self.cfg.retry, "search", || {
			Box::pin(self.search(
				&query_vector,
				&req.tenant,
				self.cfg.search.top_k,
				self.cfg.search.score_threshold,
			))
		})
		.await
		{
			Ok(hits) => hits,
			Err(err) if matches!(err, Error::RetrievalUnavailable { .. }) => {
				return Ok(self.degraded_response(trace_id, &err));
			},
			Err(err) => return Err(err),
		};

		let assembled = self.assemble(&req.history, &hits).await;
		let prompt = assembled.render_prompt(query);
		let answer = with_backoff(&self.cfg.retry, "generation", || {
			let prompt = prompt.clone();

			Box::pin(async move {
				self.providers
					.generation
					.generate(&self.cfg.providers.generation, &prompt)
					.await
					.map_err(|err| Error::GenerationUnavailable { message: err.to_string() })
			})
		})
		.await?;

		let citations: Vec<Citation> = assembled
			.passages
			.iter()
			.map(|passage| Citation {
				record_id: passage.record_id,
				source_type: passage.source_type.clone(),
				source_id: passage.source_id.clone(),
				snippet: snippet(&passage.text),
				score: passage.score,
			})
			.collect();

		if let Some(key) = cache_key {
			self.store_response(key, &req.tenant, &answer, &citations);
		}

		info!(%trace_id, citations = citations.len(), "Answer generated.");

		Ok(AnswerResponse { trace_id, answer, citations, degraded: false, cached: false })
	}

	/// Propagates the external document-change notification: every cached
	/// answer for the tenant is dropped eagerly.
	pub fn invalidate_tenant(&self, tenant_id: &str) -> usize {
		let removed = self.response_cache.invalidate_tenant(tenant_id);

		info!(tenant_id, removed, "Invalidated tenant response-cache entries.");

		removed
	}

	fn response_cache_key(&self, req: &AnswerRequest, query: &str) -> Option<String> {
		let fingerprint = match fingerprint_history(&req.history) {
			Ok(fingerprint) => fingerprint,
			// The cache is an optimization, never a correctness
			// dependency; on any cache-side failure the pipeline runs
			// uncached.
			Err(err) => {
				warn!(error = %err, "Failed to fingerprint history; bypassing response cache.");

				return None;
			},
		};

		match build_response_cache_key(
			&req.tenant.tenant_id,
			&req.tenant.access_levels,
			query,
			&fingerprint,
		) {
			Ok(key) => Some(key),
			Err(err) => {
				warn!(error = %err, "Failed to build response cache key; bypassing cache.");

				None
			},
		}
	}

	fn store_response(
		&self,
		key: String,
		tenant: &TenantContext,
		answer: &str,
		citations: &[Citation],
	) {
		let cached =
			CachedAnswer { answer: answer.to_string(), citations: citations.to_vec() };
		let value = match serde_json::to_value(&cached) {
			Ok(value) => value,
			Err(err) => {
				warn!(error = %err, "Failed to encode response for caching; skipping store.");

				return;
			},
		};
		let ttl = self.response_ttl(citations);

		self.response_cache.set(
			key,
			value,
			ttl,
			vec![tenant_tag(&tenant.tenant_id), NAMESPACE_TAG.to_string()],
			OffsetDateTime::now_utc(),
		);
	}

	/// Short TTL for answers grounded in frequently changing sources, long
	/// TTL when the dominant citation source type is configured static.
	fn response_ttl(&self, citations: &[Citation]) -> Duration {
		let response_cfg = &self.cfg.cache.response;
		let Some(dominant) = dominant_source_type(citations) else {
			return Duration::seconds(response_cfg.volatile_ttl_secs as i64);
		};

		if response_cfg.static_source_types.iter().any(|source_type| *source_type == dominant) {
			Duration::seconds(response_cfg.static_ttl_secs as i64)
		} else {
			Duration::seconds(response_cfg.volatile_ttl_secs as i64)
		}
	}

	fn degraded_response(&self, trace_id: Uuid, err: &Error) -> AnswerResponse {
		warn!(%trace_id, error = %err, "Pipeline degraded; answering without retrieval.");

		AnswerResponse {
			trace_id,
			answer: NO_DATA_ANSWER.to_string(),
			citations: Vec::new(),
			degraded: true,
			cached: false,
		}
	}
}

/// Most frequent source type; ties break to the lexicographically smallest
/// so the choice is deterministic.
fn dominant_source_type(citations: &[Citation]) -> Option<String> {
	let mut counts: HashMap<&str, usize> = HashMap::new();

	for citation in citations {
		*counts.entry(citation.source_type.as_str()).or_insert(0) += 1;
	}

	counts
		.into_iter()
		.max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
		.map(|(source_type, _)| source_type.to_string())
}

fn snippet(text: &str) -> String {
	const MAX_SNIPPET_CHARS: usize = 240;

	text.chars().take(MAX_SNIPPET_CHARS).collect()
}
