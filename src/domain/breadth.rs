//! Cross-sectional breadth metrics and composite scoring.
//!
//! For every symbol with enough stored history, the engine computes
//! EMA-20/50/200 over its close ledger, then evaluates the whole
//! universe at a single quorum date: the most recent date every eligible
//! symbol has reached. From that cross-section it derives breadth
//! percentages, the advance/decline ratio, the composite score and
//! signal, a blended market-health percentage, and the outlook
//! probability with its alert level and headline band.
//!
//! Every threshold, weight, base probability, bonus, and band comes from
//! `MetricsConfig`. Reference deployments disagree on the exact numbers,
//! so none of them are baked into the engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ema::ema_last;
use super::prices::RollingStore;
use super::snapshot::{AlertLevel, DailySnapshot, Signal, TriggerFlags};
use crate::error::PipelineError;

/// Minimum stored closes for a symbol to enter the cross-section.
/// 210 points give the 200-span EMA enough runway to stabilize.
fn default_min_history() -> usize {
    210
}

/// Composite-score thresholds: each satisfied condition adds one point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreThresholds {
    #[serde(default = "default_pct20_min")]
    pub pct20_min: f64,
    #[serde(default = "default_pct50_min")]
    pub pct50_min: f64,
    #[serde(default = "default_pct200_min")]
    pub pct200_min: f64,
    #[serde(default = "default_ad_ratio_min")]
    pub ad_ratio_min: f64,
}

fn default_pct20_min() -> f64 {
    50.0
}
fn default_pct50_min() -> f64 {
    50.0
}
fn default_pct200_min() -> f64 {
    45.0
}
fn default_ad_ratio_min() -> f64 {
    1.0
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            pct20_min: default_pct20_min(),
            pct50_min: default_pct50_min(),
            pct200_min: default_pct200_min(),
            ad_ratio_min: default_ad_ratio_min(),
        }
    }
}

/// Weights blending pct-above-50 and pct-above-200 into market health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthWeights {
    #[serde(default = "default_pct50_weight")]
    pub pct50_weight: f64,
    #[serde(default = "default_pct200_weight")]
    pub pct200_weight: f64,
}

fn default_pct50_weight() -> f64 {
    0.6
}
fn default_pct200_weight() -> f64 {
    0.4
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            pct50_weight: default_pct50_weight(),
            pct200_weight: default_pct200_weight(),
        }
    }
}

/// Outlook probability model: a base keyed by the current signal plus
/// additive bonuses for three trigger conditions, clamped to a range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlookConfig {
    #[serde(default = "default_base_red")]
    pub base_red: f64,
    #[serde(default = "default_base_caution")]
    pub base_caution: f64,
    #[serde(default = "default_base_watch")]
    pub base_watch: f64,
    #[serde(default = "default_base_green")]
    pub base_green: f64,
    /// pct_above_50 at or above this counts as a breadth-50 thrust.
    #[serde(default = "default_thrust_min")]
    pub p50_thrust_min: f64,
    #[serde(default = "default_thrust_bonus")]
    pub p50_thrust_bonus: f64,
    /// advance/decline ratio at or above this is "strong".
    #[serde(default = "default_ad_strong_min")]
    pub ad_strong_min: f64,
    #[serde(default = "default_ad_strong_bonus")]
    pub ad_strong_bonus: f64,
    /// pct_above_200 at or above this counts as improving.
    #[serde(default = "default_p200_improving_min")]
    pub p200_improving_min: f64,
    #[serde(default = "default_p200_improving_bonus")]
    pub p200_improving_bonus: f64,
    #[serde(default = "default_prob_floor")]
    pub floor: f64,
    #[serde(default = "default_prob_ceiling")]
    pub ceiling: f64,
    /// Probability at or above this maps to a HIGH alert.
    #[serde(default = "default_high_alert_min")]
    pub high_alert_min: f64,
    /// Probability at or above this (but below HIGH) maps to MED.
    #[serde(default = "default_med_alert_min")]
    pub med_alert_min: f64,
}

fn default_base_red() -> f64 {
    28.0
}
fn default_base_caution() -> f64 {
    36.0
}
fn default_base_watch() -> f64 {
    45.0
}
fn default_base_green() -> f64 {
    62.0
}
fn default_thrust_min() -> f64 {
    45.0
}
fn default_thrust_bonus() -> f64 {
    12.0
}
fn default_ad_strong_min() -> f64 {
    1.10
}
fn default_ad_strong_bonus() -> f64 {
    10.0
}
fn default_p200_improving_min() -> f64 {
    40.0
}
fn default_p200_improving_bonus() -> f64 {
    6.0
}
fn default_prob_floor() -> f64 {
    5.0
}
fn default_prob_ceiling() -> f64 {
    90.0
}
fn default_high_alert_min() -> f64 {
    60.0
}
fn default_med_alert_min() -> f64 {
    45.0
}

impl Default for OutlookConfig {
    fn default() -> Self {
        Self {
            base_red: default_base_red(),
            base_caution: default_base_caution(),
            base_watch: default_base_watch(),
            base_green: default_base_green(),
            p50_thrust_min: default_thrust_min(),
            p50_thrust_bonus: default_thrust_bonus(),
            ad_strong_min: default_ad_strong_min(),
            ad_strong_bonus: default_ad_strong_bonus(),
            p200_improving_min: default_p200_improving_min(),
            p200_improving_bonus: default_p200_improving_bonus(),
            floor: default_prob_floor(),
            ceiling: default_prob_ceiling(),
            high_alert_min: default_high_alert_min(),
            med_alert_min: default_med_alert_min(),
        }
    }
}

impl OutlookConfig {
    fn base_for(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Red => self.base_red,
            Signal::Caution => self.base_caution,
            Signal::Watch => self.base_watch,
            Signal::Green => self.base_green,
        }
    }
}

/// One headline/badge band: applies while health is below `below`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBand {
    pub below: f64,
    pub badge: String,
    pub headline: String,
}

fn default_bands() -> Vec<HealthBand> {
    vec![
        HealthBand {
            below: 30.0,
            badge: "DANGER".into(),
            headline: "Danger zone: protect capital, reduce risk.".into(),
        },
        HealthBand {
            below: 40.0,
            badge: "WAIT & WATCH".into(),
            headline: "Wait & watch: early improvement possible, but no confirmation yet.".into(),
        },
        HealthBand {
            below: 60.0,
            badge: "GO GREEN".into(),
            headline: "Go green: participation improving — deploy gradually.".into(),
        },
        HealthBand {
            below: f64::INFINITY,
            badge: "FULL FORCE".into(),
            headline: "Full force: broad participation — trend-following has the edge.".into(),
        },
    ]
}

/// Full metrics-engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_min_history")]
    pub min_history: usize,
    #[serde(default)]
    pub score: ScoreThresholds,
    #[serde(default)]
    pub health: HealthWeights,
    #[serde(default)]
    pub outlook: OutlookConfig,
    #[serde(default = "default_bands")]
    pub bands: Vec<HealthBand>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            min_history: default_min_history(),
            score: ScoreThresholds::default(),
            health: HealthWeights::default(),
            outlook: OutlookConfig::default(),
            bands: default_bands(),
        }
    }
}

/// A single symbol's state at its latest stored date.
struct SymbolRow {
    latest_date: NaiveDate,
    close: f64,
    prev_close: f64,
    ema20: f64,
    ema50: f64,
    ema200: f64,
}

/// Cross-sectional breadth metrics engine.
pub struct MetricsEngine {
    config: MetricsConfig,
}

impl MetricsEngine {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Compute the daily snapshot from the rolling close store.
    ///
    /// # Errors
    /// `PipelineError::InsufficientHistory` when no symbol has enough
    /// stored closes to participate.
    pub fn compute(&self, store: &RollingStore) -> Result<DailySnapshot, PipelineError> {
        let rows = self.eligible_rows(store);
        if rows.is_empty() {
            return Err(PipelineError::InsufficientHistory {
                required: self.config.min_history,
                universe: store.symbol_count(),
            });
        }

        // Evaluate at the quorum date: the minimum of eligible symbols'
        // latest dates. Feeds that are partially lagging would otherwise
        // be counted as if they were current.
        let Some(quorum) = rows.iter().map(|r| r.latest_date).min() else {
            return Err(PipelineError::InsufficientHistory {
                required: self.config.min_history,
                universe: store.symbol_count(),
            });
        };
        let cross: Vec<&SymbolRow> =
            rows.iter().filter(|r| r.latest_date == quorum).collect();
        let n = cross.len();

        debug!(
            eligible = rows.len(),
            at_quorum = n,
            quorum = %quorum,
            "Cross-section assembled"
        );

        let above20 = cross.iter().filter(|r| r.close > r.ema20).count();
        let above50 = cross.iter().filter(|r| r.close > r.ema50).count();
        let above200 = cross.iter().filter(|r| r.close > r.ema200).count();

        let advances = cross.iter().filter(|r| r.close > r.prev_close).count() as u32;
        let declines = cross.iter().filter(|r| r.close < r.prev_close).count() as u32;
        // With zero decliners the ratio degenerates to the advance count
        // ("infinitely bullish"), never to inf or NaN.
        let ad_ratio = if declines > 0 {
            round3(f64::from(advances) / f64::from(declines))
        } else {
            f64::from(advances)
        };

        let pct20 = round1(100.0 * above20 as f64 / n as f64);
        let pct50 = round1(100.0 * above50 as f64 / n as f64);
        let pct200 = round1(100.0 * above200 as f64 / n as f64);

        let thresholds = &self.config.score;
        let mut score = 0u8;
        score += u8::from(pct20 >= thresholds.pct20_min);
        score += u8::from(pct50 >= thresholds.pct50_min);
        score += u8::from(pct200 >= thresholds.pct200_min);
        score += u8::from(ad_ratio >= thresholds.ad_ratio_min);

        let signal = match score {
            4.. => Signal::Green,
            3 => Signal::Watch,
            2 => Signal::Caution,
            _ => Signal::Red,
        };

        let weights = &self.config.health;
        let health = round1(pct50 * weights.pct50_weight + pct200 * weights.pct200_weight)
            .clamp(0.0, 100.0);

        let outlook = &self.config.outlook;
        let flags = TriggerFlags {
            p50_thrust: pct50 >= outlook.p50_thrust_min,
            ad_strong: ad_ratio >= outlook.ad_strong_min,
            p200_improving: pct200 >= outlook.p200_improving_min,
        };
        let mut bonus = 0.0;
        if flags.p50_thrust {
            bonus += outlook.p50_thrust_bonus;
        }
        if flags.ad_strong {
            bonus += outlook.ad_strong_bonus;
        }
        if flags.p200_improving {
            bonus += outlook.p200_improving_bonus;
        }
        let probability =
            round1(outlook.base_for(signal) + bonus).clamp(outlook.floor, outlook.ceiling);
        let alert_level = if probability >= outlook.high_alert_min {
            AlertLevel::High
        } else if probability >= outlook.med_alert_min {
            AlertLevel::Med
        } else {
            AlertLevel::Low
        };

        let (badge, headline) = self.band_for(health);

        let snapshot = DailySnapshot {
            trading_date: quorum,
            date_pretty: quorum.format("%d %b %Y (%A)").to_string(),
            signal,
            score,
            pct_above_20: pct20,
            pct_above_50: pct50,
            pct_above_200: pct200,
            advances,
            declines,
            ad_ratio,
            market_health_pct: health,
            outlook_probability: probability,
            alert_level,
            headline,
            badge,
            flags,
            universe_count: n as u32,
        };

        info!(
            dt = %snapshot.trading_date,
            signal = %snapshot.signal,
            score = snapshot.score,
            health = snapshot.market_health_pct,
            prob = snapshot.outlook_probability,
            universe = snapshot.universe_count,
            "Breadth snapshot computed"
        );

        Ok(snapshot)
    }

    /// Per-symbol EMA rows for symbols with enough stored history.
    fn eligible_rows(&self, store: &RollingStore) -> Vec<SymbolRow> {
        let mut rows = Vec::new();
        for (_, ledger) in store.iter() {
            if ledger.len() < self.config.min_history {
                continue;
            }
            let closes: Vec<f64> = ledger.iter().map(|p| p.close).collect();
            let last = ledger[ledger.len() - 1];
            let prev = ledger[ledger.len() - 2];
            // min_history >= 2 is enforced by config validation, and the
            // seeds below exist because the ledger is non-empty here.
            let (Some(ema20), Some(ema50), Some(ema200)) = (
                ema_last(&closes, 20),
                ema_last(&closes, 50),
                ema_last(&closes, 200),
            ) else {
                continue;
            };
            rows.push(SymbolRow {
                latest_date: last.date,
                close: last.close,
                prev_close: prev.close,
                ema20,
                ema50,
                ema200,
            });
        }
        rows
    }

    /// Badge/headline for a health percentage, from the configured bands.
    fn band_for(&self, health: f64) -> (String, String) {
        for band in &self.config.bands {
            if health < band.below {
                return (band.badge.clone(), band.headline.clone());
            }
        }
        // Bands should always end with an open upper bound; fall back to
        // the last one rather than panic on a misconfigured table.
        self.config
            .bands
            .last()
            .map(|b| (b.badge.clone(), b.headline.clone()))
            .unwrap_or_default()
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
