//! Catalog extraction.
//!
//! Pulls placement candidates out of an `on_discover` payload. Catalog
//! shape: `message.catalog.providers[].items[]`, with the numeric grid
//! attributes carried in each item's `tags` map (values may arrive as JSON
//! numbers or numeric strings, counterparties differ).

use shared_types::{FlowError, FlowResult};

/// One parsed catalog item, before ranking and zone resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    /// Provider (BPP) offering the item.
    pub provider_id: String,
    /// Provider callback URI, when the catalog carries one.
    pub provider_uri: Option<String>,
    /// Catalog item identifier.
    pub item_id: String,
    /// Human-readable zone name; resolved to an id during ranking.
    pub zone_name: String,
    /// Locality hint, when present.
    pub locality: Option<String>,
    /// Renewable share of the zone's mix, percent.
    pub renewable_mix_percent: f64,
    /// Carbon intensity in gCO2/kWh.
    pub carbon_intensity: f64,
    /// Capacity available in the window, kW.
    pub available_capacity_kw: f64,
    /// Window lower bound (RFC3339), when present.
    pub window_start: Option<String>,
    /// Window upper bound (RFC3339), when present.
    pub window_end: Option<String>,
}

impl CandidateItem {
    /// Rank score: `renewable_mix - carbon_intensity / 10`, higher better.
    pub fn score(&self) -> f64 {
        self.renewable_mix_percent - self.carbon_intensity / 10.0
    }
}

/// Extract every parseable candidate from a discover payload, preserving
/// catalog order.
///
/// Items missing the fields needed to rank are skipped with a warning; the
/// call only fails (`FlowError::Data`) when the catalog yields no usable
/// item at all.
pub fn extract_candidates(payload: &serde_json::Value) -> FlowResult<Vec<CandidateItem>> {
    let providers = payload["message"]["catalog"]["providers"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    let mut candidates = Vec::new();
    for provider in &providers {
        let Some(provider_id) = provider["id"].as_str() else {
            tracing::warn!("[gw-03] Skipping provider without id");
            continue;
        };
        let provider_uri = provider["uri"].as_str().map(str::to_string);

        for item in provider["items"].as_array().into_iter().flatten() {
            match parse_item(provider_id, provider_uri.clone(), item) {
                Some(candidate) => candidates.push(candidate),
                None => {
                    tracing::warn!(
                        "[gw-03] Skipping malformed catalog item {} from {}",
                        item["id"].as_str().unwrap_or("<no id>"),
                        provider_id
                    );
                }
            }
        }
    }

    if candidates.is_empty() {
        return Err(FlowError::Data("catalog contains no usable items".into()));
    }
    Ok(candidates)
}

fn parse_item(
    provider_id: &str,
    provider_uri: Option<String>,
    item: &serde_json::Value,
) -> Option<CandidateItem> {
    let tags = &item["tags"];
    Some(CandidateItem {
        provider_id: provider_id.to_string(),
        provider_uri,
        item_id: item["id"].as_str()?.to_string(),
        zone_name: tags["zone"].as_str()?.to_string(),
        locality: tags["locality"].as_str().map(str::to_string),
        renewable_mix_percent: tag_f64(tags, "renewable_mix_percent")?,
        carbon_intensity: tag_f64(tags, "carbon_intensity")?,
        available_capacity_kw: tag_f64(tags, "available_capacity_kw").unwrap_or(0.0),
        window_start: tags["window_start"].as_str().map(str::to_string),
        window_end: tags["window_end"].as_str().map(str::to_string),
    })
}

fn tag_f64(tags: &serde_json::Value, key: &str) -> Option<f64> {
    match &tags[key] {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
