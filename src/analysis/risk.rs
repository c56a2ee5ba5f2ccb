//! Risk sub-scorer
//!
//! Volatility (ATR as percent of last close) and market sensitivity (beta).
//! A beta of exactly zero is treated as unavailable.

use super::{clamp_score, Factor, FactorCategory, SubScore};
use crate::indicators::atr;
use crate::providers::types::{Candle, FundamentalSnapshot};

const ATR_PERIOD: usize = 14;

/// Score volatility and beta. Also returns the computed ATR percent so the
/// ranking layer can filter on it numerically.
pub fn score_risk(
    history: &[Candle],
    fundamentals: &FundamentalSnapshot,
) -> (SubScore, Option<f64>) {
    let mut score = 50.0;
    let mut factors = Vec::new();

    let atr_pct = last_atr_percent(history);
    if let Some(pct) = atr_pct {
        if pct < 2.5 {
            score += 15.0;
            factors.push(Factor {
                label: "Low volatility",
                contribution: 15.0,
                category: FactorCategory::Risk,
            });
        } else if pct > 5.0 {
            score -= 10.0;
            factors.push(Factor {
                label: "High volatility",
                contribution: -10.0,
                category: FactorCategory::Risk,
            });
        }
    }

    let beta = fundamentals.beta;
    if beta != 0.0 {
        if beta < 1.0 {
            score += 10.0;
            factors.push(Factor {
                label: "Beta below 1",
                contribution: 10.0,
                category: FactorCategory::Risk,
            });
        } else if beta > 1.3 {
            score -= 10.0;
            factors.push(Factor {
                label: "Beta above 1.3",
                contribution: -10.0,
                category: FactorCategory::Risk,
            });
        }
    }

    (
        SubScore {
            score: clamp_score(score),
            factors,
        },
        atr_pct,
    )
}

/// Latest ATR expressed as a percentage of the latest close
fn last_atr_percent(history: &[Candle]) -> Option<f64> {
    let last_close = history.last().map(|c| c.close)?;
    if last_close <= 0.0 {
        return None;
    }

    let atr_series = atr(history, ATR_PERIOD);
    let last_atr = *atr_series.last()?;
    if last_atr.is_nan() {
        return None;
    }

    Some(last_atr / last_close * 100.0)
}
