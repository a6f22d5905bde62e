pub mod admission;
pub mod answer;
pub mod context;
pub mod search;

mod embedding_cache;
mod error;
mod response_cache;
mod retry;

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};

pub use admission::AdmissionController;
pub use answer::{AnswerRequest, AnswerResponse, Citation};
pub use context::{AssembledContext, ContextPassage, ContextTurn, TurnDisposition};
pub use error::{Error, Result};

use embedding_cache::EmbeddingCache;
use response_cache::ResponseCache;
use sibyl_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use sibyl_index::VectorIndex;
use sibyl_providers::{embedding, generation, summarize};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait SummaryProvider
where
	Self: Send + Sync,
{
	fn summarize<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		text: &'a str,
		target_tokens: u32,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// Who is asking. Every request carries one; the index filter and quota
/// scopes are derived from it, never from the query text.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TenantContext {
	pub tenant_id: String,
	pub user_id: String,
	pub access_levels: Vec<String>,
	#[serde(default)]
	pub page_context: Option<PageContext>,
	#[serde(default)]
	pub attributes: HashMap<String, String>,
}

/// The document the requester is currently viewing, if any.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PageContext {
	pub source_type: String,
	pub source_id: String,
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn GenerationProvider>,
	pub summarizer: Arc<dyn SummaryProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		generation: Arc<dyn GenerationProvider>,
		summarizer: Arc<dyn SummaryProvider>,
	) -> Self {
		Self { embedding, generation, summarizer }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), generation: provider.clone(), summarizer: provider }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(embedding::embed(cfg, text))
	}
}
impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(generation::generate(cfg, prompt))
	}
}
impl SummaryProvider for DefaultProviders {
	fn summarize<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		text: &'a str,
		target_tokens: u32,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(summarize::summarize(cfg, text, target_tokens))
	}
}

pub struct SibylService {
	pub cfg: Config,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
	pub(crate) admission: AdmissionController,
	pub(crate) embedding_cache: EmbeddingCache,
	pub(crate) response_cache: ResponseCache,
}
impl SibylService {
	pub fn new(cfg: Config, index: Arc<dyn VectorIndex>) -> Self {
		Self::with_providers(cfg, index, Providers::default())
	}

	pub fn with_providers(cfg: Config, index: Arc<dyn VectorIndex>, providers: Providers) -> Self {
		let embedding_cache = EmbeddingCache::new(cfg.cache.embedding_ttl_secs);

		Self {
			cfg,
			index,
			providers,
			admission: AdmissionController::new(),
			embedding_cache,
			response_cache: ResponseCache::new(),
		}
	}
}

/// Collapses runs of whitespace and trims, so trivially different spellings
/// of the same query share cache entries.
pub(crate) fn normalize_text(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}
