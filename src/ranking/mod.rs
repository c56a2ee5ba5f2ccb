//! Ranking orchestrator
//!
//! Turns a batch of per-instrument snapshots into a sorted, filtered list of
//! recommendations. Sector medians are computed once per sector up front and
//! reused for every member; scoring itself is delegated to the analysis
//! module. Pure function of its inputs and options.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analysis::{compute_score, RankingInput, SectorBaseline, Signal};

/// Post-scoring filters and their application order: sectors, then minimum
/// score, then maximum volatility.
#[derive(Debug, Clone, Default)]
pub struct RankingOptions {
    /// Keep only these sectors (no-op when empty)
    pub sectors: Option<Vec<String>>,
    /// Drop recommendations scoring below this
    pub min_score: Option<u8>,
    /// Drop recommendations whose ATR percent exceeds this
    pub max_volatility: Option<f64>,
}

/// One ranked recommendation; recomputed every cycle, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub symbol: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub score: u8,
    pub signal: Signal,
    pub price: f64,
    pub change_pct: f64,
    pub factors: Vec<String>,
    /// ATR as percent of last close, when computable
    pub atr_pct: Option<f64>,
}

/// Build recommendations for a batch of instruments.
pub fn build_recommendations(
    inputs: &[RankingInput],
    options: &RankingOptions,
) -> Vec<Recommendation> {
    let baselines = sector_baselines(inputs);

    let mut recommendations: Vec<Recommendation> = inputs
        .iter()
        .map(|input| {
            let sector_key = sector_key(input);
            let baseline = baselines.get(&sector_key).copied().unwrap_or_default();
            let breakdown = compute_score(input, &baseline);

            Recommendation {
                symbol: input.quote.symbol.clone(),
                name: input.quote.name.clone(),
                sector: input.quote.sector.clone(),
                score: breakdown.composite,
                signal: breakdown.signal,
                price: input.quote.price,
                change_pct: input.quote.change_pct,
                factors: breakdown.factors.iter().map(|s| s.to_string()).collect(),
                atr_pct: breakdown.atr_pct,
            }
        })
        .collect();

    if let Some(sectors) = options.sectors.as_ref().filter(|s| !s.is_empty()) {
        recommendations.retain(|rec| {
            rec.sector
                .as_ref()
                .map(|sector| sectors.iter().any(|s| s.eq_ignore_ascii_case(sector)))
                .unwrap_or(false)
        });
    }

    if let Some(min_score) = options.min_score {
        recommendations.retain(|rec| rec.score >= min_score);
    }

    if let Some(max_volatility) = options.max_volatility {
        // Instruments without a defined ATR percent pass the filter.
        recommendations.retain(|rec| rec.atr_pct.map(|pct| pct <= max_volatility).unwrap_or(true));
    }

    recommendations.sort_by(|a, b| b.score.cmp(&a.score).then(a.symbol.cmp(&b.symbol)));
    recommendations
}

fn sector_key(input: &RankingInput) -> String {
    input.quote.sector.clone().unwrap_or_default()
}

/// Compute per-sector median baselines over the batch. All-zero fundamental
/// snapshots carry no information and are left out of the medians.
fn sector_baselines(inputs: &[RankingInput]) -> HashMap<String, SectorBaseline> {
    let mut pe_by_sector: HashMap<String, Vec<f64>> = HashMap::new();
    let mut roe_by_sector: HashMap<String, Vec<f64>> = HashMap::new();

    for input in inputs {
        if input.fundamentals.is_empty() {
            continue;
        }
        let key = sector_key(input);
        pe_by_sector
            .entry(key.clone())
            .or_default()
            .push(input.fundamentals.pe);
        roe_by_sector
            .entry(key)
            .or_default()
            .push(input.fundamentals.roe);
    }

    let mut baselines = HashMap::new();
    for (sector, pe_values) in pe_by_sector {
        let median_roe = roe_by_sector.get(&sector).and_then(|v| median(v));
        baselines.insert(
            sector,
            SectorBaseline {
                median_pe: median(&pe_values),
                median_roe,
            },
        );
    }
    baselines
}

/// The element at index `floor(n / 2)` of the ascending-sorted values
fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted[sorted.len() / 2])
}
