use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub index: Index,
	pub providers: Providers,
	pub quotas: Quotas,
	pub search: Search,
	pub context: Context,
	pub cache: Cache,
	pub retry: Retry,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Index {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub generation: LlmProviderConfig,
	pub summarizer: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Quotas {
	pub tenant: QuotaRule,
	pub user: QuotaRule,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct QuotaRule {
	pub limit: u32,
	pub window_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	pub top_k: u32,
	pub candidate_k: u32,
	pub score_threshold: f32,
	/// Additive score bump for hits whose source matches the request's page
	/// context. Soft preference only; never excludes off-page records.
	pub page_boost: f32,
}

#[derive(Debug, Deserialize)]
pub struct Context {
	pub token_budget: u32,
	/// Reserved for retrieved passages; the remainder goes to history.
	pub retrieval_budget: u32,
	pub chars_per_token: u32,
	pub summary_target_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct Cache {
	pub embedding_ttl_secs: u64,
	pub response: ResponseCacheConfig,
}

#[derive(Debug, Deserialize)]
pub struct ResponseCacheConfig {
	pub volatile_ttl_secs: u64,
	pub static_ttl_secs: u64,
	/// Source types whose citations earn the long TTL (policy docs and the
	/// like); anything else is treated as volatile.
	pub static_source_types: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Retry {
	pub max_attempts: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}
