//! Buy pipeline
//!
//! Every surface that buys from a market goes through [`BuyEngine::buy`]:
//! read live market and supply, refuse when the cap is reached, quote, bound
//! the payment by the allowed slippage and submit. The program re-checks cap
//! and price at execution time; its verdicts come back as `SoldOut` and
//! `SlippageExceeded`.

use std::sync::Arc;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::{field, info, instrument, Span};

use crate::address::payment_holding_address;
use crate::chain::{ChainReader, MarketSnapshot, TransactionSubmitter};
use crate::errors::{MarketError, PurchaseContext};
use crate::market_program::{self, BuyAccounts, BuyArgs};
use crate::metrics::{metrics, Timer};
use crate::pricing::{self, Quote};
use crate::structured_logging::PipelineLogger;
use crate::tx_builder::{
    ensure_token_account, submit_batches, unwrap_native, wrap_native, InstructionBatch,
};
use crate::types::{ProgramIds, PurchaseIntent, PurchaseReceipt};

/// Receives every successful purchase
pub trait PurchaseNotifier: Send + Sync {
    fn purchase_completed(&self, receipt: &PurchaseReceipt);
}

/// Default notifier, reports through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl PurchaseNotifier for LogNotifier {
    fn purchase_completed(&self, receipt: &PurchaseReceipt) {
        info!(
            market = %receipt.market,
            quantity = receipt.quantity,
            paid_at_most = receipt.maximum_price,
            "purchase completed"
        );
    }
}

/// Buy pipeline over injected chain seams
#[derive(Clone)]
pub struct BuyEngine {
    reader: Arc<dyn ChainReader>,
    submitter: Arc<dyn TransactionSubmitter>,
    programs: ProgramIds,
    notifier: Arc<dyn PurchaseNotifier>,
}

impl BuyEngine {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        submitter: Arc<dyn TransactionSubmitter>,
        programs: ProgramIds,
    ) -> Self {
        Self {
            reader,
            submitter,
            programs,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn PurchaseNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Current price of `quantity` units and the market's supply position
    pub async fn quote(
        &self,
        market: &Pubkey,
        quantity: u64,
    ) -> Result<(MarketSnapshot, Quote), MarketError> {
        self.reader.get_curve_quote(market, quantity).await
    }

    /// Buy `intent.quantity` units, paying at most the slippage-bounded quote
    #[instrument(
        skip(self, buyer),
        fields(
            buyer = %buyer.pubkey(),
            market = %intent.market,
            quantity = intent.quantity,
            context_id = field::Empty
        )
    )]
    pub async fn buy(
        &self,
        buyer: &Arc<Keypair>,
        intent: PurchaseIntent,
    ) -> Result<PurchaseReceipt, MarketError> {
        let logger = PipelineLogger::new("buy");
        Span::current().record("context_id", logger.correlation_id().as_str());
        let timer = Timer::new();
        metrics().buys_attempted.inc();

        let result = self.run(&logger, buyer, intent).await;

        timer.observe_duration(&metrics().buy_latency);
        match &result {
            Ok(receipt) => {
                metrics().buys_succeeded.inc();
                if let Some(sig) = receipt.signatures.last() {
                    logger.log_buy_success(&receipt.market, sig, timer.elapsed_ms());
                }
                self.notifier.purchase_completed(receipt);
            }
            Err(e) => {
                metrics().buys_failed.with_label_values(&[e.category()]).inc();
                logger.log_failure(e.category(), &e.to_string(), timer.elapsed_ms());
            }
        }
        result
    }

    async fn run(
        &self,
        logger: &PipelineLogger,
        buyer: &Arc<Keypair>,
        intent: PurchaseIntent,
    ) -> Result<PurchaseReceipt, MarketError> {
        if intent.quantity == 0 {
            return Err(MarketError::invalid_input("quantity must be positive"));
        }
        pricing::validate_slippage(intent.max_slippage)?;

        logger.log_stage("read");
        let snapshot = self.reader.market_snapshot(&intent.market).await?;
        let availability = snapshot.availability;
        if availability.is_sold_out() || intent.quantity > availability.remaining() {
            return Err(MarketError::SoldOut {
                requested: intent.quantity,
                remaining: availability.remaining(),
            });
        }

        logger.log_stage("quote");
        let quote = pricing::quote(&snapshot.curve.config, intent.quantity)?;
        let maximum_price = pricing::max_payment(&quote, intent.max_slippage)?;
        logger.log_buy_attempt(&intent.market, intent.quantity, quote.total, maximum_price);

        let owner = buyer.pubkey();
        let market = &snapshot.market;
        let pays_native = market.base_mint == spl_token::native_mint::id();

        let mut instructions = Vec::with_capacity(6);
        if pays_native {
            instructions.extend(wrap_native(&owner, maximum_price)?);
        }
        instructions.push(ensure_token_account(&owner, &owner, &market.target_mint));
        instructions.push(market_program::buy(
            &self.programs.market,
            &BuyAccounts {
                market: intent.market,
                curve: market.curve,
                base_mint: market.base_mint,
                target_mint: market.target_mint,
                base_storage: market.base_storage,
                source: payment_holding_address(&owner, &market.base_mint),
                destination: payment_holding_address(&owner, &market.target_mint),
                buyer: owner,
            },
            BuyArgs {
                desired_target_amount: intent.quantity,
                maximum_price,
            },
        ));
        if pays_native {
            instructions.push(unwrap_native(&owner)?);
        }

        logger.log_stage("submit");
        let report = submit_batches(
            self.submitter.as_ref(),
            buyer,
            vec![InstructionBatch::new(instructions, vec![])],
        )
        .await
        .map_err(|e| {
            e.into_market_error(Some(PurchaseContext {
                requested: intent.quantity,
                maximum_price,
            }))
        })?;

        Ok(PurchaseReceipt {
            market: intent.market,
            target_mint: market.target_mint,
            quantity: intent.quantity,
            quoted_total: quote.total,
            maximum_price,
            signatures: report.signatures,
        })
    }
}
