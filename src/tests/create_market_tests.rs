//! Market creation pipeline against the in-memory ledger

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signer};

use super::test_helpers::Harness;
use crate::address::{derive_market_address, payment_holding_address};
use crate::chain::{ChainReader, MintState};
use crate::create_market::MarketCreator;
use crate::errors::{MarketError, SubmitError};
use crate::market_program::{
    CurveConfig, CurveState, MarketState, RoyaltyConfig, DEFAULT_MARKET_INDEX,
};
use crate::test_utils::{MockLedger, MockStager};

/// Reader over the ledger that reports every address as already taken
struct OccupiedLedger(MockLedger);

#[async_trait]
impl ChainReader for OccupiedLedger {
    async fn get_market(&self, address: &Pubkey) -> Result<MarketState, MarketError> {
        self.0.get_market(address).await
    }

    async fn get_curve(&self, address: &Pubkey) -> Result<CurveState, MarketError> {
        self.0.get_curve(address).await
    }

    async fn get_mint_state(&self, mint: &Pubkey) -> Result<MintState, MarketError> {
        self.0.get_mint_state(mint).await
    }

    async fn account_exists(&self, _address: &Pubkey) -> Result<bool, MarketError> {
        Ok(true)
    }

    async fn minimum_rent(&self, data_len: usize) -> Result<u64, MarketError> {
        self.0.minimum_rent(data_len).await
    }
}

#[tokio::test]
async fn test_created_market_is_empty_and_capped() {
    let h = Harness::new().await;
    let created = h.list(10, 2).await;

    let market = h.ledger.get_market(&created.market).await.unwrap();
    assert_eq!(market.mint_cap, 10);
    assert_eq!(market.target_mint, created.target_mint);
    assert_eq!(market.base_mint, h.payment_mint);
    assert_eq!(market.authority, h.seller.pubkey());
    assert_eq!(market.royalties, RoyaltyConfig::disabled());
    assert_eq!(market.accrued_royalties, 0);

    let item = h.ledger.get_mint_state(&created.target_mint).await.unwrap();
    assert_eq!(item.supply, 0);
    assert_eq!(item.decimals, 0);
    assert_eq!(item.mint_authority, Some(created.market));

    let curve = h.ledger.get_curve(&created.curve).await.unwrap();
    assert_eq!(curve.config, CurveConfig::fixed_price(2));
}

#[tokio::test]
async fn test_market_address_is_derived_from_item_mint() {
    let h = Harness::new().await;
    let created = h.list(5, 1).await;

    let (expected, bump) = derive_market_address(
        &h.ledger.programs().market,
        &created.target_mint,
        DEFAULT_MARKET_INDEX,
    );
    assert_eq!(created.market, expected);
    assert_eq!(h.ledger.get_market(&expected).await.unwrap().bump_seed, bump);
}

#[tokio::test]
async fn test_metadata_points_at_resolved_uri() {
    let h = Harness::new().await;
    let created = h.list(3, 7).await;

    assert_eq!(created.uri, MockStager::uri_for(&created.target_mint));
    assert!(h.stager.was_resolved(&created.target_mint).await);

    let data = h.ledger.metadata_of(&created.target_mint).await.unwrap();
    assert_eq!(data.name, "Enchanted Sword");
    assert_eq!(data.symbol, "");
    assert_eq!(data.uri, created.uri);
    assert_eq!(data.seller_fee_basis_points, 0);

    let staged = h.stager.staged_documents().await;
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].image, "sword.png");
    assert_eq!(staged[0].description, "Glows faintly blue");
}

#[tokio::test]
async fn test_holding_account_created_when_missing() {
    let h = Harness::new().await;
    let holding = payment_holding_address(&h.seller.pubkey(), &h.payment_mint);
    assert!(!h.ledger.account_exists(&holding).await.unwrap());

    let created = h.list(10, 2).await;
    assert_eq!(created.base_storage, holding);
    assert!(h.ledger.account_exists(&holding).await.unwrap());
}

#[tokio::test]
async fn test_existing_holding_account_is_reused() {
    let h = Harness::new().await;
    let holding = h
        .ledger
        .fund(&h.seller.pubkey(), &h.payment_mint, 42)
        .await;

    let first = h.list(10, 2).await;
    let second = h.list(4, 9).await;

    assert_eq!(first.base_storage, holding);
    assert_eq!(second.base_storage, holding);
    assert_ne!(first.market, second.market);
    assert_eq!(h.seller_proceeds().await, 42);
    assert_eq!(h.ledger.market_count().await, 2);
}

#[tokio::test]
async fn test_creation_fits_one_transaction() {
    let h = Harness::new().await;
    let created = h.list(10, 2).await;

    assert_eq!(created.signatures.len(), 1);
    let txs = h.ledger.submitted_transactions().await;
    assert_eq!(txs.len(), 1);
    // creator, item mint and curve
    assert_eq!(txs[0].signatures.len(), 3);
}

#[tokio::test]
async fn test_stage_failure_leaves_nothing_on_chain() {
    let h = Harness::new().await;
    h.stager.set_fail_stage(true).await;

    let err = h
        .creator
        .create_market(&h.seller, &h.payment_mint, Harness::item(10, 2))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MarketError::StorageUnavailable { stage: "stage", .. }
    ));
    assert!(err.is_retryable());
    assert!(h.ledger.submitted_transactions().await.is_empty());
    assert_eq!(h.ledger.market_count().await, 0);
}

#[tokio::test]
async fn test_resolve_failure_leaves_nothing_on_chain() {
    let h = Harness::new().await;
    h.stager.set_fail_resolve(true).await;

    let err = h
        .creator
        .create_market(&h.seller, &h.payment_mint, Harness::item(10, 2))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MarketError::StorageUnavailable { stage: "resolve", .. }
    ));
    assert!(h.ledger.submitted_transactions().await.is_empty());
}

#[tokio::test]
async fn test_invalid_details_rejected_before_staging() {
    let h = Harness::new().await;

    let err = h
        .creator
        .create_market(&h.seller, &h.payment_mint, Harness::item(0, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::InvalidInput(_)));

    let mut long_name = Harness::item(1, 1);
    long_name.name = "a".repeat(40);
    let err = h
        .creator
        .create_market(&h.seller, &h.payment_mint, long_name)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::InvalidInput(_)));

    assert!(h.stager.staged_documents().await.is_empty());
}

#[tokio::test]
async fn test_unknown_payment_mint() {
    let h = Harness::new().await;
    let missing = Pubkey::new_unique();

    let err = h
        .creator
        .create_market(&h.seller, &missing, Harness::item(10, 2))
        .await
        .unwrap_err();

    assert!(matches!(err, MarketError::MintNotFound(m) if m == missing));
    assert!(h.stager.staged_documents().await.is_empty());
}

#[tokio::test]
async fn test_rejected_submission_creates_no_market() {
    let h = Harness::new().await;
    h.ledger
        .fail_next_submit(SubmitError::Transaction("BlockhashNotFound".into()))
        .await;

    let err = h
        .creator
        .create_market(&h.seller, &h.payment_mint, Harness::item(10, 2))
        .await
        .unwrap_err();

    assert!(matches!(err, MarketError::TransactionRejected { reason } if reason.contains("BlockhashNotFound")));
    assert_eq!(h.ledger.market_count().await, 0);
}

#[tokio::test]
async fn test_holding_account_created_concurrently_still_lists() {
    let h = Harness::new().await;
    let seller = h.seller.pubkey();
    let payment_mint = h.payment_mint;
    let holding = payment_holding_address(&seller, &payment_mint);

    // Absent when checked, present by the time the transaction executes
    h.ledger
        .before_next_submit(move |state| {
            state.mint_to(&seller, &payment_mint, 0);
        })
        .await;

    let created = h.list(10, 2).await;

    assert_eq!(created.base_storage, holding);
    assert_eq!(h.ledger.market_count().await, 1);
    let account = h.ledger.token_account(&holding).await.unwrap();
    assert_eq!(account.owner, seller);
    assert_eq!(account.amount, 0);
}

#[tokio::test]
async fn test_taken_market_address_is_reported() {
    let h = Harness::new().await;
    let creator = MarketCreator::new(
        Arc::new(OccupiedLedger(h.ledger.clone())),
        Arc::new(h.ledger.clone()),
        Arc::new(h.stager.clone()),
        h.ledger.programs(),
    );

    let err = creator
        .create_market(&h.seller, &h.payment_mint, Harness::item(10, 2))
        .await
        .unwrap_err();

    assert!(matches!(err, MarketError::AccountAlreadyExists(_)));
    assert!(!err.is_retryable());
    assert_eq!(err.category(), "account_exists");
    // Content is staged before the address is checked, nothing reaches the chain
    assert_eq!(h.stager.staged_documents().await.len(), 1);
    assert!(h.ledger.submitted_transactions().await.is_empty());
    assert_eq!(h.ledger.market_count().await, 0);
}
