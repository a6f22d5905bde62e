use std::cmp::Ordering;

use tracing::warn;

use sibyl_index::{SearchHit, TenantFilter};

use crate::{Error, PageContext, Result, SibylService, TenantContext};

impl SibylService {
	/// Similarity search scoped to the requester. Tenancy and permission
	/// overlap are enforced inside the index as a hard pre-filter; the
	/// score threshold is applied here afterwards, so result counts never
	/// reveal records the requester cannot see.
	pub async fn search(
		&self,
		query_vector: &[f32],
		tenant: &TenantContext,
		top_k: u32,
		score_threshold: f32,
	) -> Result<Vec<SearchHit>> {
		if top_k == 0 {
			return Err(Error::InvalidInput {
				message: "top_k must be greater than zero.".to_string(),
			});
		}

		let expected_dim = self.cfg.index.qdrant.vector_dim as usize;

		if query_vector.len() != expected_dim {
			return Err(Error::InvalidInput {
				message: format!(
					"Query vector has {} dimensions, index expects {expected_dim}.",
					query_vector.len()
				),
			});
		}
		if tenant.tenant_id.trim().is_empty() {
			return Err(Error::InvalidInput { message: "tenant_id is required.".to_string() });
		}
		if tenant.access_levels.is_empty() {
			// No access levels means no visible records; not an error.
			return Ok(Vec::new());
		}

		let filter = TenantFilter {
			tenant_id: tenant.tenant_id.clone(),
			access_levels: tenant.access_levels.clone(),
		};
		let candidate_k = self.cfg.search.candidate_k.max(top_k);
		let candidates = self.index.search(query_vector, &filter, candidate_k).await?;
		let mut hits = enforce_tenant_boundary(candidates, &filter);

		hits.retain(|hit| hit.score >= score_threshold);

		apply_page_boost(&mut hits, tenant.page_context.as_ref(), self.cfg.search.page_boost);
		rank_descending(&mut hits);
		hits.truncate(top_k as usize);

		Ok(hits)
	}
}

/// Re-checks every hit the index returned against the requester. The index
/// already filtered; a mismatch here means the index-side filter is broken,
/// which is worth a warning, and the record is dropped either way.
fn enforce_tenant_boundary(hits: Vec<SearchHit>, filter: &TenantFilter) -> Vec<SearchHit> {
	let mut kept = Vec::with_capacity(hits.len());

	for hit in hits {
		if filter.allows(&hit.record.metadata) {
			kept.push(hit);
		} else {
			warn!(
				record_id = %hit.record.id,
				record_tenant = %hit.record.metadata.tenant_id,
				requested_tenant = %filter.tenant_id,
				"Index returned a record outside the tenant filter; dropping it.",
			);
		}
	}

	kept
}

/// Soft preference for records from the page the user is looking at. A
/// score bump only; off-page records stay eligible, so page-scoped queries
/// cannot come back empty just because the page has no match.
fn apply_page_boost(hits: &mut [SearchHit], page: Option<&PageContext>, boost: f32) {
	let Some(page) = page else {
		return;
	};

	if boost <= 0.0 {
		return;
	}

	for hit in hits {
		if hit.record.metadata.source_type == page.source_type
			&& hit.record.metadata.source_id == page.source_id
		{
			hit.score += boost;
		}
	}
}

fn rank_descending(hits: &mut [SearchHit]) {
	// Stable: ties keep the index's original order.
	hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}
