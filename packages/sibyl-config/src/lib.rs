mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, Context, EmbeddingProviderConfig, Index, LlmProviderConfig, Providers, Qdrant,
	QuotaRule, Quotas, ResponseCacheConfig, Retry, Search, Security, Service,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.index.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "index.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.index.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match index.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.quotas.tenant.limit == 0 {
		return Err(Error::Validation {
			message: "quotas.tenant.limit must be greater than zero.".to_string(),
		});
	}
	if cfg.quotas.tenant.window_secs == 0 {
		return Err(Error::Validation {
			message: "quotas.tenant.window_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.quotas.user.limit == 0 {
		return Err(Error::Validation {
			message: "quotas.user.limit must be greater than zero.".to_string(),
		});
	}
	if cfg.quotas.user.window_secs == 0 {
		return Err(Error::Validation {
			message: "quotas.user.window_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.candidate_k < cfg.search.top_k {
		return Err(Error::Validation {
			message: "search.candidate_k must be at least search.top_k.".to_string(),
		});
	}
	if !cfg.search.score_threshold.is_finite() {
		return Err(Error::Validation {
			message: "search.score_threshold must be a finite number.".to_string(),
		});
	}
	if !cfg.search.page_boost.is_finite() || cfg.search.page_boost < 0.0 {
		return Err(Error::Validation {
			message: "search.page_boost must be a finite number, zero or greater.".to_string(),
		});
	}
	if cfg.context.token_budget == 0 {
		return Err(Error::Validation {
			message: "context.token_budget must be greater than zero.".to_string(),
		});
	}
	if cfg.context.retrieval_budget >= cfg.context.token_budget {
		return Err(Error::Validation {
			message: "context.retrieval_budget must be less than context.token_budget."
				.to_string(),
		});
	}
	if cfg.context.chars_per_token == 0 {
		return Err(Error::Validation {
			message: "context.chars_per_token must be greater than zero.".to_string(),
		});
	}
	if cfg.context.summary_target_tokens == 0 {
		return Err(Error::Validation {
			message: "context.summary_target_tokens must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.embedding_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "cache.embedding_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.response.volatile_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "cache.response.volatile_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.response.static_ttl_secs < cfg.cache.response.volatile_ttl_secs {
		return Err(Error::Validation {
			message: "cache.response.static_ttl_secs must be at least cache.response.volatile_ttl_secs."
				.to_string(),
		});
	}
	if cfg.retry.max_attempts == 0 {
		return Err(Error::Validation {
			message: "retry.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.base_delay_ms == 0 {
		return Err(Error::Validation {
			message: "retry.base_delay_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.max_delay_ms < cfg.retry.base_delay_ms {
		return Err(Error::Validation {
			message: "retry.max_delay_ms must be at least retry.base_delay_ms.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("generation", &cfg.providers.generation.api_key),
		("summarizer", &cfg.providers.summarizer.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for source_type in &mut cfg.cache.response.static_source_types {
		*source_type = source_type.trim().to_string();
	}

	cfg.cache.response.static_source_types.retain(|source_type| !source_type.is_empty());
}
