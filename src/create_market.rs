//! Market creation pipeline
//!
//! Turns a seller's item details into a live market in one submission:
//!
//! 1. stage the off-chain metadata and resolve its URI for the new mint
//! 2. create the zero-decimal item mint
//! 3. attach Metaplex metadata
//! 4. hand mint authority to the market address
//! 5. make sure the creator's payment-holding account exists
//! 6. initialize a fixed-price curve
//! 7. initialize the market binding all of the above under the supply cap
//! 8. submit everything, co-signed by creator, mint and curve keypairs
//!
//! Everything up to step 8 is local or read-only, so any failure before it
//! leaves nothing on chain.

use std::sync::Arc;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::{field, instrument, Span};

use crate::address::{derive_market_address, metadata_address, payment_holding_address};
use crate::chain::{ChainReader, TransactionSubmitter};
use crate::errors::MarketError;
use crate::market_program::{
    initialize_curve, initialize_market, CurveConfig, InitializeMarketAccounts,
    InitializeMarketArgs, RoyaltyConfig, DEFAULT_MARKET_INDEX,
};
use crate::metadata::{create_metadata_account_v3, CreateMetadataAccounts, DataV2};
use crate::metrics::{metrics, Timer};
use crate::storage::{ContentStager, OffChainMetadata};
use crate::structured_logging::PipelineLogger;
use crate::tx_builder::{
    create_mint_instructions, ensure_token_account, mint_account_len, submit_batches,
    transfer_mint_authority, InstructionBatch, ITEM_DECIMALS,
};
use crate::types::{CreatedMarket, ItemDetails, ProgramIds};

/// Orchestrates market creation against injected chain and storage seams
#[derive(Clone)]
pub struct MarketCreator {
    reader: Arc<dyn ChainReader>,
    submitter: Arc<dyn TransactionSubmitter>,
    stager: Arc<dyn ContentStager>,
    programs: ProgramIds,
}

impl MarketCreator {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        submitter: Arc<dyn TransactionSubmitter>,
        stager: Arc<dyn ContentStager>,
        programs: ProgramIds,
    ) -> Self {
        Self {
            reader,
            submitter,
            stager,
            programs,
        }
    }

    /// List `details` for sale against `payment_mint`
    ///
    /// Returns the market address buyers use, plus the addresses created
    /// along with it.
    #[instrument(
        skip(self, creator, details),
        fields(creator = %creator.pubkey(), name = %details.name, context_id = field::Empty)
    )]
    pub async fn create_market(
        &self,
        creator: &Arc<Keypair>,
        payment_mint: &Pubkey,
        details: ItemDetails,
    ) -> Result<CreatedMarket, MarketError> {
        let logger = PipelineLogger::new("create_market");
        Span::current().record("context_id", logger.correlation_id().as_str());
        let timer = Timer::new();

        let result = self.run(&logger, creator, payment_mint, details).await;

        timer.observe_duration(&metrics().create_latency);
        match &result {
            Ok(created) => {
                metrics().markets_created.inc();
                logger.log_market_created(&created.market, &created.target_mint, timer.elapsed_ms());
            }
            Err(e) => {
                metrics()
                    .markets_failed
                    .with_label_values(&[e.category()])
                    .inc();
                logger.log_failure(e.category(), &e.to_string(), timer.elapsed_ms());
            }
        }
        result
    }

    async fn run(
        &self,
        logger: &PipelineLogger,
        creator: &Arc<Keypair>,
        payment_mint: &Pubkey,
        details: ItemDetails,
    ) -> Result<CreatedMarket, MarketError> {
        let owner = creator.pubkey();

        logger.log_stage("validate");
        details.validate()?;
        self.reader.get_mint_state(payment_mint).await?;

        // The mint keypair only co-signs the creation transaction
        let mint_keypair = Arc::new(Keypair::new());
        let curve_keypair = Arc::new(Keypair::new());
        let target_mint = mint_keypair.pubkey();
        let curve = curve_keypair.pubkey();

        logger.log_stage("stage_content");
        let document = OffChainMetadata {
            name: details.name.clone(),
            symbol: String::new(),
            description: details.description.clone(),
            image: details.image.filename.clone(),
        };
        let staged = self
            .stager
            .stage_content(&document, &details.image)
            .await
            .map_err(|e| e.at_stage("stage"))?;
        let uri = self
            .stager
            .resolve_uri(&staged, &target_mint)
            .await
            .map_err(|e| e.at_stage("resolve"))?;
        logger.log_content_staged(&target_mint, &uri);

        logger.log_stage("build");
        let (market, bump_seed) =
            derive_market_address(&self.programs.market, &target_mint, DEFAULT_MARKET_INDEX);
        if self.reader.account_exists(&market).await? {
            return Err(MarketError::AccountAlreadyExists(market));
        }
        let metadata = metadata_address(&self.programs.metadata, &target_mint);
        let base_storage = payment_holding_address(&owner, payment_mint);

        let mint_rent = self.reader.minimum_rent(mint_account_len()).await?;
        let mut token_instructions =
            create_mint_instructions(&owner, &target_mint, &owner, ITEM_DECIMALS, mint_rent)?;
        token_instructions.push(create_metadata_account_v3(
            &self.programs.metadata,
            &CreateMetadataAccounts {
                metadata,
                mint: target_mint,
                mint_authority: owner,
                payer: owner,
                update_authority: owner,
            },
            DataV2::for_item(details.name.clone(), uri.clone()),
        )?);
        token_instructions.push(transfer_mint_authority(&target_mint, &owner, &market)?);

        if !self.reader.account_exists(&base_storage).await? {
            token_instructions.push(ensure_token_account(&owner, &owner, payment_mint));
        }

        token_instructions.push(initialize_curve(
            &self.programs.market,
            &owner,
            &curve,
            CurveConfig::fixed_price(details.unit_price),
        ));

        let market_instruction = initialize_market(
            &self.programs.market,
            &InitializeMarketAccounts {
                payer: owner,
                curve,
                market,
                base_mint: *payment_mint,
                target_mint,
                base_storage,
            },
            InitializeMarketArgs {
                index: DEFAULT_MARKET_INDEX,
                mint_cap: details.quantity_cap,
                royalties: RoyaltyConfig::disabled(),
                bump_seed,
            },
        );

        let batches = vec![
            InstructionBatch::new(token_instructions, vec![mint_keypair, curve_keypair]),
            InstructionBatch::new(vec![market_instruction], vec![]),
        ];
        logger.log_batches_ready(
            batches.len(),
            batches.iter().map(|b| b.instructions.len()).sum(),
        );

        logger.log_stage("submit");
        let report = submit_batches(self.submitter.as_ref(), creator, batches)
            .await
            .map_err(|e| e.into_market_error(None))?;

        Ok(CreatedMarket {
            market,
            target_mint,
            curve,
            base_storage,
            metadata,
            uri,
            signatures: report.signatures,
        })
    }
}
