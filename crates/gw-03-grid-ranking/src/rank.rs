//! Ranking and fixed-arity padding.

use gw_01_transaction_ledger::LedgerService;
use shared_types::{FlowError, FlowResult, GridRecommendation, RECOMMENDATION_SLOTS};

use crate::extract::{extract_candidates, CandidateItem};

/// Result of ranking one catalog.
#[derive(Debug, Clone)]
pub struct RankedCatalog {
    /// All usable candidates, best first. Never empty.
    pub ranked: Vec<CandidateItem>,
    /// Exactly [`RECOMMENDATION_SLOTS`] entries; thin catalogs are padded
    /// by duplicating the lowest-ranked candidate.
    pub recommendations: Vec<GridRecommendation>,
    /// True when the catalog carried fewer distinct items than slots, i.e.
    /// the tail of `recommendations` is padding.
    pub insufficient_options: bool,
}

impl RankedCatalog {
    /// The best candidate, used by orchestrated flows to select.
    pub fn top(&self) -> &CandidateItem {
        // `ranked` is never empty: extraction fails on an empty catalog.
        &self.ranked[0]
    }
}

/// Sort candidates by descending score. The sort is stable, so equal scores
/// keep their catalog order.
pub fn rank_candidates(mut candidates: Vec<CandidateItem>) -> Vec<CandidateItem> {
    candidates.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates
}

/// Ranking facade bound to the zone registry.
#[derive(Clone)]
pub struct RankingService {
    ledger: LedgerService,
}

impl RankingService {
    pub fn new(ledger: LedgerService) -> Self {
        Self { ledger }
    }

    /// Extract, rank, resolve zones, and pad one discover payload.
    pub fn rank_catalog(&self, payload: &serde_json::Value) -> FlowResult<RankedCatalog> {
        let ranked = rank_candidates(extract_candidates(payload)?);

        let distinct = ranked.len().min(RECOMMENDATION_SLOTS);
        let insufficient_options = ranked.len() < RECOMMENDATION_SLOTS;
        if insufficient_options {
            tracing::warn!(
                "[gw-03] Catalog yielded {} items, padding to {}",
                ranked.len(),
                RECOMMENDATION_SLOTS
            );
        }

        let mut recommendations = Vec::with_capacity(RECOMMENDATION_SLOTS);
        for candidate in &ranked[..distinct] {
            recommendations.push(self.to_recommendation(candidate)?);
        }
        while recommendations.len() < RECOMMENDATION_SLOTS {
            // Duplicate the lowest-ranked real entry; arity is fixed.
            let last = recommendations[distinct - 1].clone();
            recommendations.push(last);
        }

        Ok(RankedCatalog {
            ranked,
            recommendations,
            insufficient_options,
        })
    }

    fn to_recommendation(&self, candidate: &CandidateItem) -> FlowResult<GridRecommendation> {
        Ok(GridRecommendation {
            item_id: candidate.item_id.clone(),
            zone_id: self.resolve_zone_id(&candidate.zone_name)?,
            zone_name: candidate.zone_name.clone(),
            locality: candidate.locality.clone(),
            renewable_mix_percent: candidate.renewable_mix_percent,
            carbon_intensity: candidate.carbon_intensity,
            available_capacity_kw: candidate.available_capacity_kw,
            window_start: candidate.window_start.clone(),
            window_end: candidate.window_end.clone(),
            score: candidate.score(),
        })
    }

    /// Resolve a zone name against the registry. Unresolved names fall back
    /// to the first registered zone; an empty registry falls back to the
    /// raw name so the id is never null.
    fn resolve_zone_id(&self, zone_name: &str) -> FlowResult<String> {
        if let Some(zone) = self
            .ledger
            .resolve_zone(zone_name)
            .map_err(|e| FlowError::Downstream(e.to_string()))?
        {
            return Ok(zone.zone_id);
        }
        if let Some(zone) = self
            .ledger
            .first_zone()
            .map_err(|e| FlowError::Downstream(e.to_string()))?
        {
            tracing::warn!(
                "[gw-03] Zone '{}' not registered, falling back to {}",
                zone_name,
                zone.zone_id
            );
            return Ok(zone.zone_id);
        }
        Ok(zone_name.to_string())
    }
}
