//! Scoring engine
//!
//! Combines indicator outputs and fundamental ratios into technical,
//! fundamental and risk sub-scores and a weighted composite per instrument.
//! Everything here is synchronous and pure; the ranking orchestrator feeds it
//! assembled snapshots.

pub mod fundamental;
pub mod risk;
pub mod technical;

use serde::{Deserialize, Serialize};

use crate::providers::types::{Candle, FundamentalSnapshot, Quote};

/// Composite weight of the technical sub-score
const WEIGHT_TECHNICAL: f64 = 0.45;
/// Composite weight of the fundamental sub-score
const WEIGHT_FUNDAMENTAL: f64 = 0.40;
/// Composite weight of the risk sub-score
const WEIGHT_RISK: f64 = 0.15;

/// Score at or above which an instrument is a Buy
const BUY_THRESHOLD: u8 = 70;
/// Score at or below which an instrument is a Sell
const SELL_THRESHOLD: u8 = 45;

/// Maximum number of explanatory factors per recommendation
const MAX_FACTORS: usize = 3;

/// The join of quote, history and fundamentals for one instrument: the
/// atomic unit the scoring engine consumes. History must be chronologically
/// ascending; a short or empty history degrades to neutral sub-scores.
#[derive(Debug, Clone)]
pub struct RankingInput {
    pub quote: Quote,
    pub history: Vec<Candle>,
    pub fundamentals: FundamentalSnapshot,
}

/// Discretized recommendation signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Hold,
    Sell,
}

impl Signal {
    /// Map a composite score to its signal band
    pub fn from_score(score: u8) -> Self {
        if score >= BUY_THRESHOLD {
            Signal::Buy
        } else if score <= SELL_THRESHOLD {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Signal::Buy => "BUY",
            Signal::Hold => "HOLD",
            Signal::Sell => "SELL",
        };
        f.write_str(s)
    }
}

/// Which sub-scorer a factor came from; also the tie-break order when
/// selecting the displayed factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FactorCategory {
    Technical,
    Fundamental,
    Risk,
}

/// One triggered scoring condition with its signed contribution
#[derive(Debug, Clone)]
pub struct Factor {
    pub label: &'static str,
    pub contribution: f64,
    pub category: FactorCategory,
}

/// Result of one sub-scorer: a clamped score plus its triggered factors
#[derive(Debug, Clone)]
pub struct SubScore {
    pub score: f64,
    pub factors: Vec<Factor>,
}

impl SubScore {
    /// Neutral sub-score with no triggered conditions
    pub fn neutral() -> Self {
        Self {
            score: 50.0,
            factors: Vec::new(),
        }
    }
}

/// Sector-relative comparison baselines, computed once per sector over the
/// current batch and reused for every member.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectorBaseline {
    pub median_pe: Option<f64>,
    pub median_roe: Option<f64>,
}

/// Full scoring output for one instrument
#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    pub technical: f64,
    pub fundamental: f64,
    pub risk: f64,
    pub composite: u8,
    pub signal: Signal,
    pub factors: Vec<&'static str>,
    /// ATR as percent of last close, when history allowed computing it
    pub atr_pct: Option<f64>,
}

/// Clamp a running sub-score into [0, 100]
pub(crate) fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Compute the weighted composite score for one instrument.
pub fn compute_score(input: &RankingInput, baseline: &SectorBaseline) -> ScoreBreakdown {
    let technical = technical::score_technical(&input.history);
    let fundamental = fundamental::score_fundamentals(&input.fundamentals, baseline);
    let (risk, atr_pct) = risk::score_risk(&input.history, &input.fundamentals);

    let composite = technical.score * WEIGHT_TECHNICAL
        + fundamental.score * WEIGHT_FUNDAMENTAL
        + risk.score * WEIGHT_RISK;
    let composite = clamp_score(composite).round() as u8;

    let mut all_factors = technical.factors;
    all_factors.extend(fundamental.factors);
    all_factors.extend(risk.factors);

    ScoreBreakdown {
        technical: technical.score,
        fundamental: fundamental.score,
        risk: risk.score,
        composite,
        signal: Signal::from_score(composite),
        factors: select_factors(all_factors),
        atr_pct,
    }
}

/// Pick the most relevant explanations: largest absolute contribution first,
/// ties broken by category order (technical, fundamental, risk).
fn select_factors(mut factors: Vec<Factor>) -> Vec<&'static str> {
    factors.sort_by(|a, b| {
        b.contribution
            .abs()
            .partial_cmp(&a.contribution.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.category.cmp(&b.category))
    });

    factors
        .into_iter()
        .take(MAX_FACTORS)
        .map(|factor| factor.label)
        .collect()
}
