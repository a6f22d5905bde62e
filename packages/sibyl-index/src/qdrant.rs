use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Filter, MinShould, Query, QueryPointsBuilder, ScoredPoint, Value,
	point_id::PointIdOptions, value::Kind, vectors_output::VectorsOptions,
};
use tracing::warn;

use crate::{
	Result,
	models::{RecordMetadata, SearchHit, TenantFilter, VectorRecord},
};

pub struct QdrantIndex {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantIndex {
	pub fn new(cfg: &sibyl_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub(crate) async fn query_filtered(
		&self,
		vector: &[f32],
		filter: &TenantFilter,
		candidate_k: u32,
	) -> Result<Vec<SearchHit>> {
		if filter.access_levels.is_empty() {
			return Ok(Vec::new());
		}

		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.filter(tenant_filter(filter))
			.limit(candidate_k as u64)
			.with_payload(true)
			.with_vectors(true);
		let response = self.client.query(search).await?;

		Ok(collect_hits(&response.result))
	}
}

/// Tenancy as a `must` clause, permission overlap as a satisfied-at-least-
/// once clause. Both are evaluated inside the index, before any similarity
/// ranking is visible to the caller.
fn tenant_filter(filter: &TenantFilter) -> Filter {
	Filter {
		must: vec![Condition::matches("tenant_id", filter.tenant_id.clone())],
		should: Vec::new(),
		must_not: Vec::new(),
		min_should: Some(MinShould {
			min_count: 1,
			conditions: vec![Condition::matches("access_levels", filter.access_levels.clone())],
		}),
	}
}

fn collect_hits(points: &[ScoredPoint]) -> Vec<SearchHit> {
	let mut out = Vec::with_capacity(points.len());

	for point in points {
		let Some(id) = point.id.as_ref().and_then(point_id_to_uuid) else {
			warn!("Scored point is missing a UUID point id.");

			continue;
		};
		let Some(tenant_id) = payload_str(&point.payload, "tenant_id") else {
			warn!(%id, "Scored point is missing tenant_id.");

			continue;
		};
		let Some(text) = payload_str(&point.payload, "text") else {
			warn!(%id, "Scored point is missing text.");

			continue;
		};
		let source_type = payload_str(&point.payload, "source_type").unwrap_or_default();
		let source_id = payload_str(&point.payload, "source_id").unwrap_or_default();
		let access_levels = payload_str_list(&point.payload, "access_levels");

		out.push(SearchHit {
			record: VectorRecord {
				id,
				embedding: point_vector(point),
				text,
				metadata: RecordMetadata { tenant_id, source_type, source_id, access_levels },
			},
			score: point.score,
		});
	}

	out
}

fn point_id_to_uuid(point_id: &qdrant_client::qdrant::PointId) -> Option<uuid::Uuid> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => uuid::Uuid::parse_str(id).ok(),
		_ => None,
	}
}

fn point_vector(point: &ScoredPoint) -> Vec<f32> {
	match point.vectors.as_ref().and_then(|vectors| vectors.vectors_options.as_ref()) {
		Some(VectorsOptions::Vector(vector)) => vector.data.clone(),
		_ => Vec::new(),
	}
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}

fn payload_str_list(payload: &HashMap<String, Value>, key: &str) -> Vec<String> {
	let Some(value) = payload.get(key) else {
		return Vec::new();
	};
	let Some(Kind::ListValue(list)) = &value.kind else {
		return Vec::new();
	};

	list.values
		.iter()
		.filter_map(|item| match &item.kind {
			Some(Kind::StringValue(text)) => Some(text.clone()),
			_ => None,
		})
		.collect()
}
