//! Shared fixtures for pipeline tests

use std::sync::{Arc, Mutex};

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};

use crate::buy_engine::{BuyEngine, PurchaseNotifier};
use crate::create_market::MarketCreator;
use crate::test_utils::{MockLedger, MockStager};
use crate::types::{CreatedMarket, ImageAsset, ItemDetails, PurchaseReceipt};

/// Notifier that keeps every receipt
#[derive(Default)]
pub struct RecordingNotifier {
    pub receipts: Mutex<Vec<PurchaseReceipt>>,
}

impl PurchaseNotifier for RecordingNotifier {
    fn purchase_completed(&self, receipt: &PurchaseReceipt) {
        self.receipts.lock().unwrap().push(receipt.clone());
    }
}

/// A ledger with a payment mint, a seller and both pipelines wired to it
pub struct Harness {
    pub ledger: MockLedger,
    pub stager: MockStager,
    pub creator: MarketCreator,
    pub engine: BuyEngine,
    pub notifier: Arc<RecordingNotifier>,
    pub payment_mint: Pubkey,
    pub seller: Arc<Keypair>,
}

impl Harness {
    pub async fn new() -> Self {
        let ledger = MockLedger::new();
        let payment_mint = ledger.create_mint(6).await;
        Self::with_payment_mint(ledger, payment_mint)
    }

    /// Markets priced in native SOL
    pub async fn native() -> Self {
        let ledger = MockLedger::new();
        let payment_mint = ledger.create_native_mint().await;
        Self::with_payment_mint(ledger, payment_mint)
    }

    fn with_payment_mint(ledger: MockLedger, payment_mint: Pubkey) -> Self {
        let stager = MockStager::new();
        let notifier = Arc::new(RecordingNotifier::default());

        let creator = MarketCreator::new(
            Arc::new(ledger.clone()),
            Arc::new(ledger.clone()),
            Arc::new(stager.clone()),
            ledger.programs(),
        );
        let engine = BuyEngine::new(
            Arc::new(ledger.clone()),
            Arc::new(ledger.clone()),
            ledger.programs(),
        )
        .with_notifier(notifier.clone());

        Self {
            ledger,
            stager,
            creator,
            engine,
            notifier,
            payment_mint,
            seller: Arc::new(Keypair::new()),
        }
    }

    pub fn item(quantity_cap: u64, unit_price: u64) -> ItemDetails {
        ItemDetails {
            name: "Enchanted Sword".into(),
            description: "Glows faintly blue".into(),
            image: ImageAsset {
                filename: "sword.png".into(),
                content_type: "image/png".into(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            },
            quantity_cap,
            unit_price,
        }
    }

    /// Create a market selling `quantity_cap` units at `unit_price`
    pub async fn list(&self, quantity_cap: u64, unit_price: u64) -> CreatedMarket {
        self.creator
            .create_market(
                &self.seller,
                &self.payment_mint,
                Self::item(quantity_cap, unit_price),
            )
            .await
            .expect("market creation")
    }

    /// A new buyer holding `funds` of the payment token
    pub async fn buyer(&self, funds: u64) -> Arc<Keypair> {
        let buyer = Arc::new(Keypair::new());
        self.ledger
            .fund(&buyer.pubkey(), &self.payment_mint, funds)
            .await;
        buyer
    }

    /// A new buyer holding only native lamports
    pub async fn buyer_with_lamports(&self, lamports: u64) -> Arc<Keypair> {
        let buyer = Arc::new(Keypair::new());
        self.ledger.fund_lamports(&buyer.pubkey(), lamports).await;
        buyer
    }

    pub async fn seller_proceeds(&self) -> u64 {
        self.ledger
            .token_balance(&self.seller.pubkey(), &self.payment_mint)
            .await
    }
}
