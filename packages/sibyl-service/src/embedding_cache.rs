//! Memoized text-to-vector lookups. Keys are content hashes of the
//! normalized text, never the raw string; concurrent misses for the same
//! key are coalesced into one provider call.

use std::{collections::HashMap, sync::Mutex};

use time::{Duration, OffsetDateTime};
use tokio::sync::watch;
use tracing::debug;

use crate::{EmbeddingProvider, Error, Result};

const EMBEDDING_CACHE_SCHEMA_VERSION: i32 = 1;

type FlightResult = Option<std::result::Result<Vec<f32>, String>>;

enum Slot {
	Ready { vector: Vec<f32>, expires_at: OffsetDateTime },
	Pending(watch::Receiver<FlightResult>),
}

enum Claim {
	Hit(Vec<f32>),
	Wait(watch::Receiver<FlightResult>),
	Lead(watch::Sender<FlightResult>),
}

pub(crate) struct EmbeddingCache {
	ttl: Duration,
	slots: Mutex<HashMap<String, Slot>>,
}
impl EmbeddingCache {
	pub(crate) fn new(ttl_secs: u64) -> Self {
		Self { ttl: Duration::seconds(ttl_secs as i64), slots: Mutex::new(HashMap::new()) }
	}

	pub(crate) async fn get(
		&self,
		provider: &dyn EmbeddingProvider,
		cfg: &sibyl_config::EmbeddingProviderConfig,
		text: &str,
	) -> Result<Vec<f32>> {
		let normalized = crate::normalize_text(text);
		let key = embedding_cache_key(&normalized, cfg)?;

		loop {
			match self.claim(&key) {
				Claim::Hit(vector) => return Ok(vector),
				Claim::Wait(mut rx) => {
					let outcome = loop {
						if let Some(result) = rx.borrow_and_update().clone() {
							break Some(result);
						}
						if rx.changed().await.is_err() {
							// Leader dropped without reporting; retry the
							// whole claim.
							break None;
						}
					};

					match outcome {
						Some(Ok(vector)) => return Ok(vector),
						Some(Err(message)) => return Err(Error::EmbeddingUnavailable { message }),
						None => continue,
					}
				},
				Claim::Lead(tx) => return self.lead(provider, cfg, &normalized, &key, tx).await,
			}
		}
	}

	/// Decides, under the map lock, whether this caller reads a fresh
	/// entry, waits on an in-flight computation, or becomes the leader.
	fn claim(&self, key: &str) -> Claim {
		let now = OffsetDateTime::now_utc();
		let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());

		match slots.get(key) {
			Some(Slot::Ready { vector, expires_at }) if *expires_at > now => {
				return Claim::Hit(vector.clone());
			},
			// A pending slot whose sender is gone belongs to a cancelled
			// leader; fall through and take the key over.
			Some(Slot::Pending(rx)) if rx.has_changed().is_ok() => return Claim::Wait(rx.clone()),
			_ => {},
		}

		let (tx, rx) = watch::channel(None);

		slots.insert(key.to_string(), Slot::Pending(rx));

		Claim::Lead(tx)
	}

	async fn lead(
		&self,
		provider: &dyn EmbeddingProvider,
		cfg: &sibyl_config::EmbeddingProviderConfig,
		normalized: &str,
		key: &str,
		tx: watch::Sender<FlightResult>,
	) -> Result<Vec<f32>> {
		// If this future is dropped mid-embed, the pending slot must go
		// with it or the key could never elect another leader.
		let mut guard = PendingGuard { cache: self, key, armed: true };
		let result = provider.embed(cfg, normalized).await;

		guard.armed = false;

		{
			let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());

			match &result {
				Ok(vector) => {
					slots.insert(
						key.to_string(),
						Slot::Ready {
							vector: vector.clone(),
							expires_at: OffsetDateTime::now_utc() + self.ttl,
						},
					);
				},
				// Only successful vectors are ever stored; the slot is
				// cleared so a later request can retry.
				Err(_) => {
					slots.remove(key);
				},
			}
		}

		match result {
			Ok(vector) => {
				let _ = tx.send(Some(Ok(vector.clone())));

				Ok(vector)
			},
			Err(err) => {
				let message = err.to_string();

				debug!(error = %message, "Embedding call failed; nothing cached.");

				let _ = tx.send(Some(Err(message.clone())));

				Err(Error::EmbeddingUnavailable { message })
			},
		}
	}
}

/// Clears a leader's pending slot when the leading future is cancelled
/// before it could report, so waiters can elect a new leader.
struct PendingGuard<'a> {
	cache: &'a EmbeddingCache,
	key: &'a str,
	armed: bool,
}
impl Drop for PendingGuard<'_> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}

		let mut slots = self.cache.slots.lock().unwrap_or_else(|err| err.into_inner());

		if let Some(Slot::Pending(_)) = slots.get(self.key) {
			slots.remove(self.key);
		}
	}
}

fn embedding_cache_key(
	normalized_text: &str,
	cfg: &sibyl_config::EmbeddingProviderConfig,
) -> Result<String> {
	let payload = serde_json::json!({
		"kind": "embedding",
		"schema_version": EMBEDDING_CACHE_SCHEMA_VERSION,
		"text": normalized_text,
		"provider_id": cfg.provider_id,
		"model": cfg.model,
		"dimensions": cfg.dimensions,
	});
	let raw = serde_json::to_vec(&payload).map_err(|err| Error::Cache {
		message: format!("Failed to encode embedding cache key payload: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}
