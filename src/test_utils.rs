//! Test Utilities Module
//!
//! An in-memory ledger and content stager for deterministic pipeline tests.
//!
//! [`MockLedger`] implements both chain seams. Submitted transactions have
//! their signatures verified, then every instruction is decoded and applied
//! to a copy of the state, which replaces the live state only if all of them
//! succeed. It understands exactly the instructions the pipelines emit:
//! system `create_account`/`transfer`, SPL token `InitializeMint2`,
//! `SetAuthority`, `SyncNative` and `CloseAccount`, associated-token create
//! (plain and idempotent), Metaplex `CreateMetadataAccountV3` and the three
//! market program instructions.
//!
//! Lamports are tracked per address. Rent is not charged, so a wrapped SOL
//! account's token balance after `sync_native` equals the lamports it holds.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    rent::Rent,
    signature::Signature,
    system_instruction::SystemInstruction,
    system_program,
    transaction::VersionedTransaction,
};
use spl_associated_token_account::get_associated_token_address;
use spl_token::{
    instruction::{AuthorityType, TokenInstruction},
    native_mint,
};
use tokio::sync::Mutex;

use crate::address::{derive_market_address, metadata_address};
use crate::chain::{ChainReader, MintState, TransactionSubmitter};
use crate::compat::{get_message_header, get_static_account_keys};
use crate::errors::{MarketError, SubmitError};
use crate::market_program::{
    CurveConfig, CurveState, MarketInstruction, MarketProgramError, MarketState,
};
use crate::metadata::{CreateMetadataAccountArgsV3, DataV2};
use crate::pricing;
use crate::storage::{ContentStager, OffChainMetadata, StagedContent, StagedFile, StorageError};
use crate::types::{ImageAsset, ProgramIds};

/// SPL token `OwnerMismatch`
const TOKEN_OWNER_MISMATCH: u32 = 4;

/// SPL token `NonNativeHasBalance`
const TOKEN_NON_NATIVE_HAS_BALANCE: u32 = 11;

/// SPL token `NonNativeNotSupported`
const TOKEN_NON_NATIVE_NOT_SUPPORTED: u32 = 19;

/// System program `ResultWithNegativeLamports`
const SYSTEM_NEGATIVE_LAMPORTS: u32 = 1;

/// Market program id the ledger answers to unless told otherwise
pub const LOCAL_MARKET_PROGRAM: Pubkey = Pubkey::new_from_array([42u8; 32]);

/// Token account held by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

/// Chain state of the in-memory ledger
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    /// Accounts allocated by `create_account` but not yet initialized, with owner
    allocated: HashMap<Pubkey, Pubkey>,
    mints: HashMap<Pubkey, MintState>,
    token_accounts: HashMap<Pubkey, MockTokenAccount>,
    metadata: HashMap<Pubkey, DataV2>,
    curves: HashMap<Pubkey, CurveState>,
    markets: HashMap<Pubkey, MarketState>,
    lamports: HashMap<Pubkey, u64>,
}

impl LedgerState {
    pub fn exists(&self, address: &Pubkey) -> bool {
        self.allocated.contains_key(address)
            || self.mints.contains_key(address)
            || self.token_accounts.contains_key(address)
            || self.metadata.contains_key(address)
            || self.curves.contains_key(address)
            || self.markets.contains_key(address)
            || self.lamports.get(address).is_some_and(|l| *l > 0)
    }

    /// Replace a curve's configuration, as if repriced by its owner
    pub fn set_curve_config(&mut self, curve: &Pubkey, config: CurveConfig) {
        if let Some(state) = self.curves.get_mut(curve) {
            state.config = config;
        }
    }

    /// Mint `amount` of `mint` into `owner`'s associated account, creating it
    /// if needed
    pub fn mint_to(&mut self, owner: &Pubkey, mint: &Pubkey, amount: u64) -> Pubkey {
        let address = get_associated_token_address(owner, mint);
        if let Some(state) = self.mints.get_mut(mint) {
            state.supply += amount;
        }
        self.token_accounts
            .entry(address)
            .or_insert_with(|| MockTokenAccount {
                mint: *mint,
                owner: *owner,
                amount: 0,
            })
            .amount += amount;
        address
    }

    /// Move `amount` tokens between two accounts of the same mint. Wrapped
    /// SOL carries its lamports along.
    fn move_tokens(&mut self, from: &Pubkey, to: &Pubkey, amount: u64) {
        let mut native = false;
        if let Some(account) = self.token_accounts.get_mut(from) {
            account.amount -= amount;
            native = account.mint == native_mint::id();
        }
        if let Some(account) = self.token_accounts.get_mut(to) {
            account.amount += amount;
        }
        if native {
            self.debit(from, amount);
            *self.lamports.entry(*to).or_default() += amount;
        }
    }

    fn debit(&mut self, address: &Pubkey, amount: u64) {
        if let Some(balance) = self.lamports.get_mut(address) {
            *balance = balance.saturating_sub(amount);
        }
    }
}

type Hook = Box<dyn FnOnce(&mut LedgerState) + Send>;

struct Inner {
    state: LedgerState,
    hooks: VecDeque<Hook>,
    fail_next: Option<SubmitError>,
    submitted: Vec<VersionedTransaction>,
    blockhash_requests: u64,
}

/// In-memory ledger implementing [`ChainReader`] and [`TransactionSubmitter`]
#[derive(Clone)]
pub struct MockLedger {
    inner: Arc<Mutex<Inner>>,
    programs: ProgramIds,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// One decoded instruction of a submitted message
struct Invocation<'a> {
    index: u8,
    program: Pubkey,
    accounts: Vec<(Pubkey, bool)>,
    data: &'a [u8],
}

impl Invocation<'_> {
    fn key(&self, position: usize) -> Result<Pubkey, SubmitError> {
        self.accounts
            .get(position)
            .map(|(key, _)| *key)
            .ok_or_else(|| self.reject("not enough account keys"))
    }

    fn signer(&self, position: usize) -> Result<Pubkey, SubmitError> {
        match self.accounts.get(position) {
            Some((key, true)) => Ok(*key),
            Some((key, false)) => Err(self.reject(&format!("{key} did not sign"))),
            None => Err(self.reject("not enough account keys")),
        }
    }

    fn reject(&self, reason: &str) -> SubmitError {
        SubmitError::Transaction(format!("instruction {}: {}", self.index, reason))
    }

    fn custom(&self, code: u32) -> SubmitError {
        SubmitError::Program {
            index: self.index,
            code,
        }
    }

    fn program_error(&self, err: MarketProgramError) -> SubmitError {
        self.custom(err as u32)
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self::with_programs(ProgramIds::new(LOCAL_MARKET_PROGRAM))
    }

    pub fn with_programs(programs: ProgramIds) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: LedgerState::default(),
                hooks: VecDeque::new(),
                fail_next: None,
                submitted: Vec::new(),
                blockhash_requests: 0,
            })),
            programs,
        }
    }

    pub fn programs(&self) -> ProgramIds {
        self.programs
    }

    /// Create an initialized mint owned by no one in particular
    pub async fn create_mint(&self, decimals: u8) -> Pubkey {
        let mint = Pubkey::new_unique();
        self.inner.lock().await.state.mints.insert(
            mint,
            MintState {
                supply: 0,
                decimals,
                mint_authority: None,
            },
        );
        mint
    }

    /// Register the native SOL mint so wrapped SOL accounts can be created
    pub async fn create_native_mint(&self) -> Pubkey {
        let mint = native_mint::id();
        self.inner.lock().await.state.mints.insert(
            mint,
            MintState {
                supply: 0,
                decimals: native_mint::DECIMALS,
                mint_authority: None,
            },
        );
        mint
    }

    /// Credit `address` with native lamports
    pub async fn fund_lamports(&self, address: &Pubkey, lamports: u64) {
        *self
            .inner
            .lock()
            .await
            .state
            .lamports
            .entry(*address)
            .or_default() += lamports;
    }

    pub async fn lamports_of(&self, address: &Pubkey) -> u64 {
        self.inner
            .lock()
            .await
            .state
            .lamports
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Credit `owner`'s associated account of `mint`
    pub async fn fund(&self, owner: &Pubkey, mint: &Pubkey, amount: u64) -> Pubkey {
        self.inner.lock().await.state.mint_to(owner, mint, amount)
    }

    pub async fn token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> u64 {
        let address = get_associated_token_address(owner, mint);
        self.token_account(&address)
            .await
            .map(|a| a.amount)
            .unwrap_or(0)
    }

    pub async fn token_account(&self, address: &Pubkey) -> Option<MockTokenAccount> {
        self.inner
            .lock()
            .await
            .state
            .token_accounts
            .get(address)
            .cloned()
    }

    pub async fn metadata_of(&self, mint: &Pubkey) -> Option<DataV2> {
        let address = metadata_address(&self.programs.metadata, mint);
        self.inner.lock().await.state.metadata.get(&address).cloned()
    }

    pub async fn market_count(&self) -> usize {
        self.inner.lock().await.state.markets.len()
    }

    /// Run `hook` against the state right before the next transaction executes
    pub async fn before_next_submit<F>(&self, hook: F)
    where
        F: FnOnce(&mut LedgerState) + Send + 'static,
    {
        self.inner.lock().await.hooks.push_back(Box::new(hook));
    }

    /// Reject the next submission with `err` without executing it
    pub async fn fail_next_submit(&self, err: SubmitError) {
        self.inner.lock().await.fail_next = Some(err);
    }

    pub async fn submitted_transactions(&self) -> Vec<VersionedTransaction> {
        self.inner.lock().await.submitted.clone()
    }

    pub async fn blockhash_requests(&self) -> u64 {
        self.inner.lock().await.blockhash_requests
    }

    fn execute(&self, state: &mut LedgerState, tx: &VersionedTransaction) -> Result<(), SubmitError> {
        let header = get_message_header(&tx.message);
        let keys = get_static_account_keys(&tx.message);
        let num_signers = header.num_required_signatures as usize;

        if tx.signatures.len() != num_signers || !tx.verify_with_results().iter().all(|ok| *ok) {
            return Err(SubmitError::Transaction(
                "signature verification failed".into(),
            ));
        }

        for (index, ix) in tx.message.instructions().iter().enumerate() {
            let program = *keys
                .get(ix.program_id_index as usize)
                .ok_or_else(|| SubmitError::Transaction("bad program index".into()))?;
            let accounts = ix
                .accounts
                .iter()
                .map(|&i| {
                    keys.get(i as usize)
                        .map(|key| (*key, (i as usize) < num_signers))
                        .ok_or_else(|| SubmitError::Transaction("bad account index".into()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let invocation = Invocation {
                index: index as u8,
                program,
                accounts,
                data: &ix.data,
            };
            self.dispatch(state, &invocation)?;
        }
        Ok(())
    }

    fn dispatch(&self, state: &mut LedgerState, ix: &Invocation<'_>) -> Result<(), SubmitError> {
        if ix.program == system_program::id() {
            apply_system(state, ix)
        } else if ix.program == spl_token::id() {
            apply_token(state, ix)
        } else if ix.program == spl_associated_token_account::id() {
            apply_associated_token(state, ix)
        } else if ix.program == self.programs.metadata {
            self.apply_metadata(state, ix)
        } else if ix.program == self.programs.market {
            self.apply_market(state, ix)
        } else {
            Err(ix.reject(&format!("unsupported program {}", ix.program)))
        }
    }

    fn apply_metadata(&self, state: &mut LedgerState, ix: &Invocation<'_>) -> Result<(), SubmitError> {
        let args = CreateMetadataAccountArgsV3::unpack(ix.data)
            .ok_or_else(|| ix.reject("unsupported metadata instruction"))?;
        let metadata = ix.key(0)?;
        let mint = ix.key(1)?;
        let authority = ix.signer(2)?;
        ix.signer(3)?;

        if metadata != metadata_address(&self.programs.metadata, &mint) {
            return Err(ix.reject("metadata address mismatch"));
        }
        let mint_state = state.mints.get(&mint).ok_or_else(|| ix.reject("mint missing"))?;
        if mint_state.mint_authority != Some(authority) {
            return Err(ix.reject("mint authority mismatch"));
        }
        args.data
            .validate()
            .map_err(|e| ix.reject(&e.to_string()))?;
        if state.exists(&metadata) {
            return Err(ix.reject("metadata already in use"));
        }
        state.metadata.insert(metadata, args.data);
        Ok(())
    }

    fn apply_market(&self, state: &mut LedgerState, ix: &Invocation<'_>) -> Result<(), SubmitError> {
        match MarketInstruction::unpack(ix.data) {
            Some(MarketInstruction::InitializeCurve(args)) => {
                ix.signer(0)?;
                let curve = ix.signer(1)?;
                if state.exists(&curve) {
                    return Err(ix.reject("curve already in use"));
                }
                state.curves.insert(curve, CurveState { config: args.config });
                Ok(())
            }
            Some(MarketInstruction::InitializeMarket(args)) => {
                let authority = ix.signer(0)?;
                let curve = ix.key(1)?;
                let market = ix.key(2)?;
                let base_mint = ix.key(3)?;
                let target_mint = ix.key(4)?;
                let base_storage = ix.key(5)?;

                if !state.curves.contains_key(&curve) {
                    return Err(ix.program_error(MarketProgramError::InvalidCurve));
                }
                let (expected, bump) =
                    derive_market_address(&self.programs.market, &target_mint, args.index);
                if market != expected || bump != args.bump_seed {
                    return Err(ix.reject("market address mismatch"));
                }
                if state.exists(&market) {
                    return Err(ix.reject("market already in use"));
                }
                if !state.mints.contains_key(&base_mint) {
                    return Err(ix.reject("base mint missing"));
                }
                let target = state
                    .mints
                    .get(&target_mint)
                    .ok_or_else(|| ix.reject("target mint missing"))?;
                if target.mint_authority != Some(market) {
                    return Err(ix.reject("market does not hold mint authority"));
                }
                match state.token_accounts.get(&base_storage) {
                    Some(account) if account.mint == base_mint => {}
                    _ => return Err(ix.reject("base storage is not a payment token account")),
                }

                state.markets.insert(
                    market,
                    MarketState {
                        authority,
                        base_mint,
                        target_mint,
                        base_storage,
                        curve,
                        mint_cap: args.mint_cap,
                        royalties: args.royalties,
                        accrued_royalties: 0,
                        index: args.index,
                        bump_seed: args.bump_seed,
                    },
                );
                Ok(())
            }
            Some(MarketInstruction::Buy(args)) => {
                let market_key = ix.key(0)?;
                let source = ix.key(5)?;
                let destination = ix.key(6)?;
                let buyer = ix.signer(7)?;

                let market = state
                    .markets
                    .get(&market_key)
                    .cloned()
                    .ok_or_else(|| ix.reject("market missing"))?;
                if ix.key(1)? != market.curve
                    || ix.key(2)? != market.base_mint
                    || ix.key(3)? != market.target_mint
                    || ix.key(4)? != market.base_storage
                {
                    return Err(ix.reject("market account mismatch"));
                }
                let curve = state
                    .curves
                    .get(&market.curve)
                    .ok_or_else(|| ix.program_error(MarketProgramError::InvalidCurve))?;

                let supply = state
                    .mints
                    .get(&market.target_mint)
                    .map(|m| m.supply)
                    .ok_or_else(|| ix.reject("target mint missing"))?;
                let new_supply = supply
                    .checked_add(args.desired_target_amount)
                    .ok_or_else(|| ix.program_error(MarketProgramError::ArithmeticError))?;
                if new_supply > market.mint_cap {
                    return Err(ix.program_error(MarketProgramError::PassedMintCap));
                }

                let price = pricing::quote(&curve.config, args.desired_target_amount)
                    .map_err(|_| ix.program_error(MarketProgramError::ArithmeticError))?
                    .total;
                if price > args.maximum_price {
                    return Err(ix.program_error(MarketProgramError::PriceTooHigh));
                }

                let paying = state
                    .token_accounts
                    .get(&source)
                    .cloned()
                    .ok_or_else(|| ix.program_error(MarketProgramError::InsufficientFunds))?;
                if paying.owner != buyer || paying.mint != market.base_mint {
                    return Err(ix.custom(TOKEN_OWNER_MISMATCH));
                }
                if paying.amount < price {
                    return Err(ix.program_error(MarketProgramError::InsufficientFunds));
                }
                match state.token_accounts.get(&destination) {
                    Some(account) if account.mint == market.target_mint => {}
                    _ => return Err(ix.reject("destination is not an item token account")),
                }

                state.move_tokens(&source, &market.base_storage, price);
                if let Some(account) = state.token_accounts.get_mut(&destination) {
                    account.amount += args.desired_target_amount;
                }
                if let Some(mint) = state.mints.get_mut(&market.target_mint) {
                    mint.supply = new_supply;
                }
                Ok(())
            }
            None => Err(ix.reject("unknown market instruction")),
        }
    }
}

fn apply_system(state: &mut LedgerState, ix: &Invocation<'_>) -> Result<(), SubmitError> {
    match bincode::deserialize::<SystemInstruction>(ix.data) {
        Ok(SystemInstruction::CreateAccount { owner, .. }) => {
            ix.signer(0)?;
            let new_account = ix.signer(1)?;
            if state.exists(&new_account) {
                return Err(ix.reject("account already in use"));
            }
            state.allocated.insert(new_account, owner);
            Ok(())
        }
        Ok(SystemInstruction::Transfer { lamports }) => {
            let from = ix.signer(0)?;
            let to = ix.key(1)?;
            let balance = state.lamports.get(&from).copied().unwrap_or(0);
            if balance < lamports {
                return Err(ix.custom(SYSTEM_NEGATIVE_LAMPORTS));
            }
            state.debit(&from, lamports);
            *state.lamports.entry(to).or_default() += lamports;
            Ok(())
        }
        _ => Err(ix.reject("unsupported system instruction")),
    }
}

fn apply_token(state: &mut LedgerState, ix: &Invocation<'_>) -> Result<(), SubmitError> {
    let instruction =
        TokenInstruction::unpack(ix.data).map_err(|e| ix.reject(&e.to_string()))?;
    match instruction {
        TokenInstruction::InitializeMint2 {
            decimals,
            mint_authority,
            ..
        } => {
            let mint = ix.key(0)?;
            if state.allocated.get(&mint) != Some(&spl_token::id()) {
                return Err(ix.reject("mint account not allocated to token program"));
            }
            state.allocated.remove(&mint);
            state.mints.insert(
                mint,
                MintState {
                    supply: 0,
                    decimals,
                    mint_authority: Some(mint_authority),
                },
            );
            Ok(())
        }
        TokenInstruction::SetAuthority {
            authority_type: AuthorityType::MintTokens,
            new_authority,
        } => {
            let mint = ix.key(0)?;
            let current = ix.signer(1)?;
            let state_mint = state
                .mints
                .get_mut(&mint)
                .ok_or_else(|| ix.reject("mint missing"))?;
            if state_mint.mint_authority != Some(current) {
                return Err(ix.custom(TOKEN_OWNER_MISMATCH));
            }
            state_mint.mint_authority = new_authority.into();
            Ok(())
        }
        TokenInstruction::SyncNative => {
            let address = ix.key(0)?;
            let lamports = state.lamports.get(&address).copied().unwrap_or(0);
            let account = state
                .token_accounts
                .get_mut(&address)
                .ok_or_else(|| ix.reject("token account missing"))?;
            if account.mint != native_mint::id() {
                return Err(ix.custom(TOKEN_NON_NATIVE_NOT_SUPPORTED));
            }
            account.amount = lamports;
            Ok(())
        }
        TokenInstruction::CloseAccount => {
            let address = ix.key(0)?;
            let destination = ix.key(1)?;
            let owner = ix.signer(2)?;
            let account = state
                .token_accounts
                .get(&address)
                .ok_or_else(|| ix.reject("token account missing"))?;
            if account.owner != owner {
                return Err(ix.custom(TOKEN_OWNER_MISMATCH));
            }
            if account.mint != native_mint::id() && account.amount != 0 {
                return Err(ix.custom(TOKEN_NON_NATIVE_HAS_BALANCE));
            }
            state.token_accounts.remove(&address);
            let lamports = state.lamports.remove(&address).unwrap_or(0);
            *state.lamports.entry(destination).or_default() += lamports;
            Ok(())
        }
        other => Err(ix.reject(&format!("unsupported token instruction {other:?}"))),
    }
}

fn apply_associated_token(state: &mut LedgerState, ix: &Invocation<'_>) -> Result<(), SubmitError> {
    let idempotent = match ix.data {
        [] | [0] => false,
        [1] => true,
        _ => return Err(ix.reject("unsupported associated token instruction")),
    };
    ix.signer(0)?;
    let address = ix.key(1)?;
    let owner = ix.key(2)?;
    let mint = ix.key(3)?;

    if address != get_associated_token_address(&owner, &mint) {
        return Err(ix.reject("associated address mismatch"));
    }
    if !state.mints.contains_key(&mint) {
        return Err(ix.reject("mint missing"));
    }
    if let Some(existing) = state.token_accounts.get(&address) {
        if idempotent && existing.owner == owner && existing.mint == mint {
            return Ok(());
        }
        return Err(ix.reject("account already in use"));
    }
    state.token_accounts.insert(
        address,
        MockTokenAccount {
            mint,
            owner,
            amount: 0,
        },
    );
    Ok(())
}

#[async_trait]
impl ChainReader for MockLedger {
    async fn get_market(&self, address: &Pubkey) -> Result<MarketState, MarketError> {
        self.inner
            .lock()
            .await
            .state
            .markets
            .get(address)
            .cloned()
            .ok_or(MarketError::MarketNotFound(*address))
    }

    async fn get_curve(&self, address: &Pubkey) -> Result<CurveState, MarketError> {
        self.inner
            .lock()
            .await
            .state
            .curves
            .get(address)
            .cloned()
            .ok_or_else(|| MarketError::invalid_input(format!("curve account {address} not found")))
    }

    async fn get_mint_state(&self, mint: &Pubkey) -> Result<MintState, MarketError> {
        self.inner
            .lock()
            .await
            .state
            .mints
            .get(mint)
            .copied()
            .ok_or(MarketError::MintNotFound(*mint))
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, MarketError> {
        Ok(self.inner.lock().await.state.exists(address))
    }

    async fn minimum_rent(&self, data_len: usize) -> Result<u64, MarketError> {
        Ok(Rent::default().minimum_balance(data_len))
    }
}

#[async_trait]
impl TransactionSubmitter for MockLedger {
    async fn latest_blockhash(&self) -> Result<Hash, SubmitError> {
        self.inner.lock().await.blockhash_requests += 1;
        Ok(Hash::new_unique())
    }

    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, SubmitError> {
        let mut inner = self.inner.lock().await;
        inner.submitted.push(transaction.clone());

        if let Some(err) = inner.fail_next.take() {
            return Err(err);
        }
        if let Some(hook) = inner.hooks.pop_front() {
            hook(&mut inner.state);
        }

        let mut next = inner.state.clone();
        self.execute(&mut next, transaction)?;
        inner.state = next;

        transaction
            .signatures
            .first()
            .copied()
            .ok_or_else(|| SubmitError::Transaction("unsigned transaction".into()))
    }
}

/// [`ContentStager`] that keeps everything in memory
#[derive(Clone, Default)]
pub struct MockStager {
    inner: Arc<Mutex<StagerInner>>,
}

#[derive(Default)]
struct StagerInner {
    fail_stage: bool,
    fail_resolve: bool,
    staged: Vec<OffChainMetadata>,
    resolved: HashSet<Pubkey>,
}

impl MockStager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_stage(&self, fail: bool) {
        self.inner.lock().await.fail_stage = fail;
    }

    pub async fn set_fail_resolve(&self, fail: bool) {
        self.inner.lock().await.fail_resolve = fail;
    }

    pub async fn staged_documents(&self) -> Vec<OffChainMetadata> {
        self.inner.lock().await.staged.clone()
    }

    pub async fn was_resolved(&self, mint: &Pubkey) -> bool {
        self.inner.lock().await.resolved.contains(mint)
    }

    pub fn uri_for(mint: &Pubkey) -> String {
        format!("https://arweave.net/{mint}")
    }
}

#[async_trait]
impl ContentStager for MockStager {
    async fn stage_content(
        &self,
        metadata: &OffChainMetadata,
        image: &ImageAsset,
    ) -> Result<StagedContent, StorageError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_stage {
            return Err(StorageError::Transport("connection refused".into()));
        }
        inner.staged.push(metadata.clone());
        Ok(StagedContent {
            staging_id: format!("stage-{}", inner.staged.len()),
            files: vec![StagedFile {
                name: image.filename.clone(),
                content_type: image.content_type.clone(),
            }],
        })
    }

    async fn resolve_uri(
        &self,
        _staged: &StagedContent,
        target_mint: &Pubkey,
    ) -> Result<String, StorageError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_resolve {
            return Err(StorageError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        inner.resolved.insert(*target_mint);
        Ok(Self::uri_for(target_mint))
    }
}
