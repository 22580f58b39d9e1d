//! Structured logging for pipeline events

use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::observability::CorrelationId;

/// Emits stage events of one pipeline run, keyed by its correlation id
#[derive(Debug, Clone)]
pub struct PipelineLogger {
    context_id: CorrelationId,
    operation: &'static str,
}

impl PipelineLogger {
    pub fn new(operation: &'static str) -> Self {
        Self {
            context_id: CorrelationId::new(),
            operation,
        }
    }

    /// Id of this run, recorded on the pipeline span as `context_id`
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.context_id
    }

    pub fn log_stage(&self, stage: &str) {
        tracing::debug!(
            context_id = %self.context_id,
            operation = self.operation,
            stage = %stage,
            "Pipeline stage"
        );
    }

    pub fn log_content_staged(&self, mint: &Pubkey, uri: &str) {
        tracing::info!(
            context_id = %self.context_id,
            mint = %mint,
            uri = %uri,
            "Content staged"
        );
    }

    pub fn log_batches_ready(&self, batches: usize, instructions: usize) {
        tracing::debug!(
            context_id = %self.context_id,
            batches = %batches,
            instructions = %instructions,
            "Instruction batches built"
        );
    }

    pub fn log_market_created(&self, market: &Pubkey, mint: &Pubkey, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            market = %market,
            mint = %mint,
            latency_ms = %latency_ms,
            "Market created"
        );
    }

    pub fn log_buy_attempt(&self, market: &Pubkey, quantity: u64, quote: u64, maximum_price: u64) {
        tracing::info!(
            context_id = %self.context_id,
            market = %market,
            quantity = %quantity,
            quote = %quote,
            maximum_price = %maximum_price,
            "Attempting buy transaction"
        );
    }

    pub fn log_buy_success(&self, market: &Pubkey, sig: &Signature, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            market = %market,
            signature = %sig,
            latency_ms = %latency_ms,
            "Buy transaction successful"
        );
    }

    pub fn log_failure(&self, category: &str, error: &str, latency_ms: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            operation = self.operation,
            category = %category,
            error = %error,
            latency_ms = %latency_ms,
            "Pipeline failed"
        );
    }
}
