//! Execution engine
//!
//! Turns an approved intent into venue orders: sizes the position,
//! enforces the slippage band against the venue quote, splits the
//! notional into chunks, retries transient failures with backoff, and
//! applies confirmed fills to the position book exactly once.

use super::backoff::Backoff;
use super::types::{ExecutionResult, ExecutionStatus, OrderAck, OrderRequest, SubmitError};
use super::OrderVenue;
use crate::aggregator::Intent;
use crate::market::MarketData;
use crate::risk::{Liquidator, RiskState};
use crate::signal::Direction;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Execution engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Fraction of the portfolio allocated at full signal strength
    #[serde(default = "default_base_allocation")]
    pub base_allocation_fraction: Decimal,
    /// Maximum exposure per instrument as a fraction of the portfolio
    #[serde(default = "default_max_exposure")]
    pub max_instrument_exposure_pct: Decimal,
    /// Fraction of the portfolio never deployed
    #[serde(default = "default_cash_buffer")]
    pub cash_buffer_pct: Decimal,
    /// Acceptable relative deviation from the reference price
    #[serde(default = "default_max_slippage")]
    pub max_slippage_pct: Decimal,
    /// Orders are split into chunks of at most this notional
    #[serde(default = "default_max_order_notional")]
    pub max_order_notional: Decimal,
    /// Intents sized below this notional are not submitted
    #[serde(default = "default_min_order_notional")]
    pub min_order_notional: Decimal,
    /// Pause between chunk submissions in milliseconds
    #[serde(default = "default_order_pause_ms")]
    pub order_pause_ms: u64,
    /// Maximum venue submissions per intent
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Initial retry backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff multiplier between retries
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_base_allocation() -> Decimal {
    dec!(0.25)
}
fn default_max_exposure() -> Decimal {
    dec!(0.30)
}
fn default_cash_buffer() -> Decimal {
    dec!(0.20)
}
fn default_max_slippage() -> Decimal {
    dec!(0.01)
}
fn default_max_order_notional() -> Decimal {
    dec!(3)
}
fn default_min_order_notional() -> Decimal {
    dec!(1)
}
fn default_order_pause_ms() -> u64 {
    1000
}
fn default_max_attempts() -> u32 {
    5
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            base_allocation_fraction: default_base_allocation(),
            max_instrument_exposure_pct: default_max_exposure(),
            cash_buffer_pct: default_cash_buffer(),
            max_slippage_pct: default_max_slippage(),
            max_order_notional: default_max_order_notional(),
            min_order_notional: default_min_order_notional(),
            order_pause_ms: default_order_pause_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl ExecutionConfig {
    /// Validate configuration; malformed values are fatal at startup
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_allocation_fraction <= Decimal::ZERO
            || self.base_allocation_fraction > Decimal::ONE
        {
            anyhow::bail!(
                "base_allocation_fraction must be in (0, 1], got {}",
                self.base_allocation_fraction
            );
        }
        if self.cash_buffer_pct < Decimal::ZERO || self.cash_buffer_pct >= Decimal::ONE {
            anyhow::bail!("cash_buffer_pct must be in [0, 1), got {}", self.cash_buffer_pct);
        }
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        if self.max_order_notional <= Decimal::ZERO {
            anyhow::bail!("max_order_notional must be positive");
        }
        Ok(())
    }
}

/// Turns approved intents into confirmed fills
pub struct ExecutionEngine {
    venue: Arc<dyn OrderVenue>,
    market: Arc<dyn MarketData>,
    config: ExecutionConfig,
    /// Submission ids whose fills were already applied
    confirmed: Mutex<HashSet<Uuid>>,
}

impl ExecutionEngine {
    /// Create a new engine
    pub fn new(
        venue: Arc<dyn OrderVenue>,
        market: Arc<dyn MarketData>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            venue,
            market,
            config,
            confirmed: Mutex::new(HashSet::new()),
        }
    }

    /// Target notional for an intent, after exposure and cash clamps
    pub fn position_notional(&self, state: &RiskState, intent: &Intent) -> Decimal {
        let pv = state.portfolio_value;
        let base = pv * self.config.base_allocation_fraction * intent.sizing_basis;

        let existing = state
            .book
            .get(&intent.instrument_id)
            .map(|p| p.current_value)
            .unwrap_or(Decimal::ZERO);
        let instrument_cap =
            (pv * self.config.max_instrument_exposure_pct - existing).max(Decimal::ZERO);

        let deployable = (pv * (Decimal::ONE - self.config.cash_buffer_pct)
            - state.book.total_value())
        .max(Decimal::ZERO);

        base.min(instrument_cap).min(deployable)
    }

    /// Execute an approved intent
    ///
    /// Never returns more submissions than `max_attempts`; every
    /// failure mode resolves to a typed result, not an error.
    pub async fn execute(&self, intent: Intent, state: &mut RiskState) -> ExecutionResult {
        if intent.direction == Direction::Neutral {
            return self.failed(intent, 0, "neutral intent has no execution");
        }

        let reference_price = match self.market.get_price(&intent.instrument_id).await {
            Ok(Some(price)) => price,
            Ok(None) => return self.failed(intent, 0, "price unavailable"),
            Err(e) => {
                tracing::warn!(
                    instrument = %intent.instrument_id,
                    error = %e,
                    "Price feed unavailable, skipping intent"
                );
                return self.failed(intent, 0, "price unavailable");
            }
        };

        let notional = match intent.direction {
            Direction::Buy => self.position_notional(state, &intent),
            // Sells close the full open position
            Direction::Sell => match state.book.get(&intent.instrument_id) {
                Some(position) => position.size * reference_price,
                None => return self.failed(intent, 0, "no open position to sell"),
            },
            Direction::Neutral => Decimal::ZERO,
        };

        if notional < self.config.min_order_notional {
            return self.failed(intent, 0, "sized below minimum notional");
        }

        let mut attempts = 0u32;
        let mut backoff = Backoff::new(
            self.config.max_attempts,
            self.config.initial_backoff_ms,
            self.config.backoff_multiplier,
        );
        let mut remaining = notional;
        let mut filled_notional = Decimal::ZERO;
        let mut slippage_weight = Decimal::ZERO;
        let mut reason: Option<String> = None;

        while remaining > Decimal::ZERO {
            // Band check against the venue quote, before any submission
            match self.check_band(&intent.instrument_id, reference_price).await {
                Ok(()) => {}
                Err(e) => {
                    reason = Some(e);
                    break;
                }
            }

            let chunk = remaining.min(self.config.max_order_notional);
            let request = OrderRequest {
                submission_id: Uuid::new_v4(),
                instrument_id: intent.instrument_id.clone(),
                direction: intent.direction,
                notional: chunk,
                reference_price,
                max_slippage_pct: self.config.max_slippage_pct,
            };

            match self.submit_chunk(&request, &mut attempts, &mut backoff).await {
                Ok(ack) => {
                    if self.apply_confirm(state, &request, &ack).await {
                        filled_notional += ack.fill_notional;
                        if reference_price > Decimal::ZERO {
                            slippage_weight += ack.fill_notional
                                * ((ack.fill_price - reference_price) / reference_price).abs();
                        }
                    }
                    remaining -= ack.fill_notional;
                    if remaining > Decimal::ZERO && self.config.order_pause_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.order_pause_ms))
                            .await;
                    }
                }
                Err(e) => {
                    reason = Some(e);
                    break;
                }
            }
        }

        let realized_slippage = if filled_notional > Decimal::ZERO {
            slippage_weight / filled_notional
        } else {
            Decimal::ZERO
        };

        let status = if filled_notional.is_zero() {
            ExecutionStatus::Failed
        } else if remaining > Decimal::ZERO {
            ExecutionStatus::Partial
        } else {
            ExecutionStatus::Filled
        };

        if status == ExecutionStatus::Filled {
            metrics::counter!("swarmtrader_intents_filled_total").increment(1);
        }
        tracing::info!(
            instrument = %intent.instrument_id,
            direction = ?intent.direction,
            status = ?status,
            attempts,
            filled = %filled_notional,
            slippage = %realized_slippage,
            reason = reason.as_deref().unwrap_or(""),
            "Intent executed"
        );

        ExecutionResult {
            intent,
            status,
            attempts,
            realized_slippage,
            reason,
        }
    }

    /// Reject before submission when the venue quote leaves the band
    async fn check_band(
        &self,
        instrument_id: &str,
        reference_price: Decimal,
    ) -> Result<(), String> {
        let quote = self
            .venue
            .quote(instrument_id)
            .await
            .map_err(|e| format!("quote unavailable: {}", e))?;

        if reference_price <= Decimal::ZERO {
            return Err("invalid reference price".to_string());
        }
        let deviation = ((quote - reference_price) / reference_price).abs();
        if deviation > self.config.max_slippage_pct {
            tracing::warn!(
                instrument = %instrument_id,
                quote = %quote,
                reference = %reference_price,
                deviation = %deviation,
                "Quote outside slippage band, rejecting before submission"
            );
            return Err("slippage exceeded".to_string());
        }
        Ok(())
    }

    /// Submit one chunk, retrying transient failures
    ///
    /// The same submission id is reused across retries so a fill that
    /// landed on a timed-out attempt is not doubled.
    async fn submit_chunk(
        &self,
        request: &OrderRequest,
        attempts: &mut u32,
        backoff: &mut Backoff,
    ) -> Result<OrderAck, String> {
        loop {
            if *attempts >= self.config.max_attempts {
                return Err("submission attempts exhausted".to_string());
            }
            *attempts += 1;
            metrics::counter!("swarmtrader_orders_submitted_total").increment(1);

            match self.venue.submit_order(request).await {
                Ok(ack) => return Ok(ack),
                Err(SubmitError::Transient(e)) => {
                    metrics::counter!("swarmtrader_order_retries_total").increment(1);
                    if *attempts >= self.config.max_attempts {
                        return Err(format!("retries exhausted: {}", e));
                    }
                    let Some(delay) = backoff.next_delay() else {
                        return Err(format!("retries exhausted: {}", e));
                    };
                    tracing::warn!(
                        instrument = %request.instrument_id,
                        submission = %request.submission_id,
                        status = ?ExecutionStatus::Retrying,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient submission failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(SubmitError::Terminal(e)) => return Err(e),
            }
        }
    }

    /// Apply a confirmed fill exactly once
    ///
    /// Returns false when the submission id was already confirmed; the
    /// position book is untouched in that case.
    pub async fn apply_confirm(
        &self,
        state: &mut RiskState,
        request: &OrderRequest,
        ack: &OrderAck,
    ) -> bool {
        {
            let mut confirmed = self.confirmed.lock().await;
            if !confirmed.insert(ack.submission_id) {
                tracing::debug!(
                    submission = %ack.submission_id,
                    "Duplicate confirmation ignored"
                );
                return false;
            }
        }

        state.book.apply_fill(
            &request.instrument_id,
            request.direction,
            ack.fill_notional,
            ack.fill_price,
        );
        metrics::counter!("swarmtrader_fills_total").increment(1);
        true
    }

    fn failed(&self, intent: Intent, attempts: u32, reason: &str) -> ExecutionResult {
        tracing::warn!(
            instrument = %intent.instrument_id,
            reason,
            "Intent not executed"
        );
        ExecutionResult {
            intent,
            status: ExecutionStatus::Failed,
            attempts,
            realized_slippage: Decimal::ZERO,
            reason: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl Liquidator for ExecutionEngine {
    /// Close the full position, bypassing sizing and the slippage band
    async fn close_position(
        &self,
        instrument_id: &str,
        state: &mut RiskState,
    ) -> anyhow::Result<Decimal> {
        let Some(position) = state.book.get(instrument_id) else {
            return Ok(Decimal::ZERO);
        };

        let price = self
            .market
            .get_price(instrument_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no price for {} during liquidation", instrument_id))?;

        let mut remaining = position.size * price;
        let mut closed = Decimal::ZERO;
        let mut attempts = 0u32;
        let mut backoff = Backoff::new(
            self.config.max_attempts,
            self.config.initial_backoff_ms,
            self.config.backoff_multiplier,
        );

        while remaining > Decimal::ZERO {
            let chunk = remaining.min(self.config.max_order_notional);
            let request = OrderRequest {
                submission_id: Uuid::new_v4(),
                instrument_id: instrument_id.to_string(),
                direction: Direction::Sell,
                notional: chunk,
                reference_price: price,
                max_slippage_pct: self.config.max_slippage_pct,
            };

            match self.submit_chunk(&request, &mut attempts, &mut backoff).await {
                Ok(ack) => {
                    self.apply_confirm(state, &request, &ack).await;
                    closed += ack.fill_notional;
                    remaining -= ack.fill_notional;
                }
                Err(e) => {
                    anyhow::bail!(
                        "liquidation of {} stopped after {} closed: {}",
                        instrument_id,
                        closed,
                        e
                    );
                }
            }
        }

        Ok(closed)
    }
}
