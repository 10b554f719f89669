//! Engine metrics exported in Prometheus text format

use crate::errors::CasinoResult;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    pub wagers_total: IntCounter,
    pub outcomes_total: IntCounterVec,
    pub rejections_total: IntCounterVec,
    pub sessions_opened_total: IntCounter,
    pub jackpot_wins_total: IntCounter,
    pub jackpot_pool: IntGauge,
    pub pending_wagers: IntGauge,
    pub pending_value: IntGauge,
}

impl EngineMetrics {
    pub fn new() -> CasinoResult<Self> {
        let registry = Registry::new_custom(Some("casino".to_string()), None)?;

        let wagers_total = IntCounter::new("wagers_total", "Stakes accepted and debited")?;
        let outcomes_total = IntCounterVec::new(
            Opts::new("outcomes_total", "Finalized wagers by outcome"),
            &["outcome"],
        )?;
        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Entries and wagers refused before any debit"),
            &["reason"],
        )?;
        let sessions_opened_total = IntCounter::new("sessions_opened_total", "Sessions opened")?;
        let jackpot_wins_total = IntCounter::new("jackpot_wins_total", "Jackpot payouts")?;
        let jackpot_pool = IntGauge::new("jackpot_pool", "Current jackpot pool")?;
        let pending_wagers = IntGauge::new("pending_wagers", "Wagers awaiting take or risk")?;
        let pending_value =
            IntGauge::new("pending_value", "Total value of wagers awaiting take or risk")?;

        registry.register(Box::new(wagers_total.clone()))?;
        registry.register(Box::new(outcomes_total.clone()))?;
        registry.register(Box::new(rejections_total.clone()))?;
        registry.register(Box::new(sessions_opened_total.clone()))?;
        registry.register(Box::new(jackpot_wins_total.clone()))?;
        registry.register(Box::new(jackpot_pool.clone()))?;
        registry.register(Box::new(pending_wagers.clone()))?;
        registry.register(Box::new(pending_value.clone()))?;

        Ok(Self {
            registry,
            wagers_total,
            outcomes_total,
            rejections_total,
            sessions_opened_total,
            jackpot_wins_total,
            jackpot_pool,
            pending_wagers,
            pending_value,
        })
    }

    pub fn record_outcome(&self, tag: &str) {
        self.outcomes_total.with_label_values(&[tag]).inc();
    }

    pub fn record_rejection(&self, reason: &str) {
        self.rejections_total.with_label_values(&[reason]).inc();
    }

    /// Generate Prometheus metrics format
    pub fn to_prometheus_format(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
