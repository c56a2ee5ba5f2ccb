//! Technical sub-scorer
//!
//! Reads the last close against trailing moving averages plus the latest RSI.
//! Undefined indicator values (short history) contribute nothing.

use super::{clamp_score, Factor, FactorCategory, SubScore};
use crate::indicators::{moving_average, rsi};
use crate::providers::types::Candle;

const RSI_PERIOD: usize = 14;

/// Score price action relative to MA20/MA50/MA200 and RSI.
pub fn score_technical(history: &[Candle]) -> SubScore {
    if history.is_empty() {
        return SubScore::neutral();
    }

    let closes: Vec<f64> = history.iter().map(|c| c.close).collect();
    let last_close = closes[closes.len() - 1];

    let mut score = 50.0;
    let mut factors = Vec::new();

    let ma_rules: [(usize, f64, &'static str); 3] = [
        (20, 10.0, "Price above MA20"),
        (50, 15.0, "Price above MA50"),
        (200, 20.0, "Price above MA200"),
    ];

    for (period, bonus, label) in ma_rules {
        let ma = moving_average(&closes, period);
        let last_ma = *ma.last().unwrap_or(&f64::NAN);
        if !last_ma.is_nan() && last_close > last_ma {
            score += bonus;
            factors.push(Factor {
                label,
                contribution: bonus,
                category: FactorCategory::Technical,
            });
        }
    }

    let rsi_series = rsi(&closes, RSI_PERIOD);
    let last_rsi = *rsi_series.last().unwrap_or(&f64::NAN);
    if !last_rsi.is_nan() {
        if last_rsi > 70.0 {
            score -= 15.0;
            factors.push(Factor {
                label: "Overbought (RSI above 70)",
                contribution: -15.0,
                category: FactorCategory::Technical,
            });
        } else if last_rsi < 30.0 {
            score += 10.0;
            factors.push(Factor {
                label: "Oversold (RSI below 30)",
                contribution: 10.0,
                category: FactorCategory::Technical,
            });
        }
    }

    SubScore {
        score: clamp_score(score),
        factors,
    }
}
