//! In-memory stand-ins for tests that need a vector index without a
//! running Qdrant.

use std::sync::Mutex;

use uuid::Uuid;

use sibyl_index::{BoxFuture, RecordMetadata, SearchHit, TenantFilter, VectorIndex, VectorRecord};

/// Brute-force cosine-similarity index. Honors the same hard pre-filter
/// contract as the Qdrant backend: records outside the tenant filter are
/// never scored, let alone returned.
pub struct MemoryIndex {
	records: Mutex<Vec<VectorRecord>>,
}
impl MemoryIndex {
	pub fn new() -> Self {
		Self { records: Mutex::new(Vec::new()) }
	}

	pub fn with_records(records: Vec<VectorRecord>) -> Self {
		Self { records: Mutex::new(records) }
	}

	pub fn insert(&self, record: VectorRecord) {
		let mut records = self.records.lock().unwrap_or_else(|err| err.into_inner());

		records.push(record);
	}

	pub fn len(&self) -> usize {
		self.records.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl Default for MemoryIndex {
	fn default() -> Self {
		Self::new()
	}
}
impl VectorIndex for MemoryIndex {
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a TenantFilter,
		candidate_k: u32,
	) -> BoxFuture<'a, sibyl_index::Result<Vec<SearchHit>>> {
		Box::pin(async move {
			let records = self.records.lock().unwrap_or_else(|err| err.into_inner());
			let mut hits: Vec<SearchHit> = records
				.iter()
				.filter(|record| filter.allows(&record.metadata))
				.map(|record| SearchHit {
					record: record.clone(),
					score: cosine_similarity(vector, &record.embedding),
				})
				.collect();

			hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
			hits.truncate(candidate_k as usize);

			Ok(hits)
		})
	}
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
	let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) }
}

/// Builds a record with a fresh id. `access_levels` defaults are the
/// caller's problem; pass exactly what the scenario needs.
pub fn record(
	tenant_id: &str,
	source_type: &str,
	source_id: &str,
	access_levels: &[&str],
	text: &str,
	embedding: Vec<f32>,
) -> VectorRecord {
	VectorRecord {
		id: Uuid::new_v4(),
		embedding,
		text: text.to_string(),
		metadata: RecordMetadata {
			tenant_id: tenant_id.to_string(),
			source_type: source_type.to_string(),
			source_id: source_id.to_string(),
			access_levels: access_levels.iter().map(|level| level.to_string()).collect(),
		},
	}
}

/// A unit vector along one axis, handy for making similarity deterministic
/// in scenarios.
pub fn axis_vector(dim: usize, axis: usize) -> Vec<f32> {
	let mut vector = vec![0.0; dim];

	if axis < dim {
		vector[axis] = 1.0;
	}

	vector
}
