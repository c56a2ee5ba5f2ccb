//! Fundamental sub-scorer
//!
//! Compares an instrument's ratios against its sector's medians from the
//! current batch. A snapshot of all zeros means the upstream had no data;
//! it stays at the neutral baseline instead of trivially passing the
//! below-median comparisons.

use super::{clamp_score, Factor, FactorCategory, SectorBaseline, SubScore};
use crate::providers::types::FundamentalSnapshot;

/// ROE threshold used when no sector baseline exists
const FALLBACK_ROE_THRESHOLD: f64 = 15.0;

/// Score fundamentals against the sector baseline.
pub fn score_fundamentals(
    fundamentals: &FundamentalSnapshot,
    baseline: &SectorBaseline,
) -> SubScore {
    if fundamentals.is_empty() {
        return SubScore::neutral();
    }

    let mut score = 50.0;
    let mut factors = Vec::new();
    let mut push = |label, contribution| {
        factors.push(Factor {
            label,
            contribution,
            category: FactorCategory::Fundamental,
        });
    };

    let pe_threshold = baseline.median_pe.unwrap_or(fundamentals.pe * 1.2);
    if fundamentals.pe < pe_threshold {
        score += 10.0;
        push("P/E below sector median", 10.0);
    }

    let roe_threshold = baseline.median_roe.unwrap_or(FALLBACK_ROE_THRESHOLD);
    if fundamentals.roe > roe_threshold {
        score += 15.0;
        push("ROE above sector median", 15.0);
    }

    if fundamentals.growth_5y > 10.0 {
        score += 10.0;
        push("5-year growth above 10%", 10.0);
    }

    if fundamentals.profit_margin > 15.0 {
        score += 10.0;
        push("Profit margin above 15%", 10.0);
    }

    if fundamentals.dividend_yield >= 3.0 {
        score += 5.0;
        push("Dividend yield at least 3%", 5.0);
    }

    if fundamentals.debt_to_equity > 0.8 {
        score -= 10.0;
        push("High debt-to-equity", -10.0);
    }

    SubScore {
        score: clamp_score(score),
        factors,
    }
}
