use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored embedding plus its source text and metadata. Owned by the
/// external index; the pipeline only ever reads filtered subsets.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VectorRecord {
	pub id: Uuid,
	pub embedding: Vec<f32>,
	pub text: String,
	pub metadata: RecordMetadata,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecordMetadata {
	pub tenant_id: String,
	pub source_type: String,
	pub source_id: String,
	pub access_levels: Vec<String>,
}

/// One ranked result. Score is provider-defined, higher is more relevant.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchHit {
	pub record: VectorRecord,
	pub score: f32,
}

/// The hard pre-filter every index query carries. A record is visible only
/// when its tenant matches exactly and its access levels overlap the
/// requester's. Relevance thresholds are applied downstream, after this
/// filter, so result counts never leak the existence of records the
/// requester cannot see.
#[derive(Clone, Debug)]
pub struct TenantFilter {
	pub tenant_id: String,
	pub access_levels: Vec<String>,
}
impl TenantFilter {
	/// The in-process equivalent of the index-side predicate. Used by the
	/// service as a defense-in-depth re-check and by in-memory indexes.
	pub fn allows(&self, metadata: &RecordMetadata) -> bool {
		if metadata.tenant_id != self.tenant_id {
			return false;
		}

		metadata.access_levels.iter().any(|level| self.access_levels.contains(level))
	}
}
