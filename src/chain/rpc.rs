//! JSON-RPC implementation of the chain seams

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use solana_client::{client_error::ClientError, nonblocking::rpc_client::RpcClient};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::InstructionError,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{TransactionError, VersionedTransaction},
};
use spl_token::{solana_program::program_pack::Pack, state::Mint};
use tracing::{debug, warn};

use super::{ChainReader, MintState, TransactionSubmitter};
use crate::config::RpcConfig;
use crate::errors::{MarketError, SubmitError};
use crate::market_program::{state::ProgramAccount, CurveState, MarketState};
use crate::metrics::metrics;

/// Chain access over a single RPC endpoint
#[derive(Clone)]
pub struct RpcChain {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcChain {
    pub fn new(url: impl Into<String>, commitment: CommitmentConfig, timeout: Duration) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_timeout_and_commitment(
                url.into(),
                timeout,
                commitment,
            )),
            commitment,
        }
    }

    pub fn from_config(config: &RpcConfig) -> Result<Self, MarketError> {
        Ok(Self::new(
            config.url.clone(),
            config.commitment_config()?,
            Duration::from_millis(config.timeout_ms),
        ))
    }

    async fn fetch(&self, address: &Pubkey) -> Result<Option<Account>, MarketError> {
        self.client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map(|response| response.value)
            .map_err(|e| MarketError::rpc(format!("get_account {address}: {e}")))
    }
}

#[async_trait]
impl ChainReader for RpcChain {
    async fn get_market(&self, address: &Pubkey) -> Result<MarketState, MarketError> {
        let account = self
            .fetch(address)
            .await?
            .ok_or(MarketError::MarketNotFound(*address))?;
        MarketState::try_from_account_data(&account.data)
    }

    async fn get_curve(&self, address: &Pubkey) -> Result<CurveState, MarketError> {
        let account = self.fetch(address).await?.ok_or_else(|| {
            MarketError::invalid_input(format!("curve account {address} not found"))
        })?;
        CurveState::try_from_account_data(&account.data)
    }

    async fn get_mint_state(&self, mint: &Pubkey) -> Result<MintState, MarketError> {
        let account = self
            .fetch(mint)
            .await?
            .ok_or(MarketError::MintNotFound(*mint))?;
        decode_mint(mint, &account)
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, MarketError> {
        Ok(self.fetch(address).await?.is_some())
    }

    async fn minimum_rent(&self, data_len: usize) -> Result<u64, MarketError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(|e| MarketError::rpc(format!("rent exemption: {e}")))
    }
}

#[async_trait]
impl TransactionSubmitter for RpcChain {
    async fn latest_blockhash(&self) -> Result<Hash, SubmitError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))
    }

    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, SubmitError> {
        let started = Instant::now();
        let result = self.client.send_and_confirm_transaction(transaction).await;
        metrics()
            .submission_latency
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(signature) => {
                debug!(%signature, "transaction confirmed");
                Ok(signature)
            }
            Err(e) => {
                let err = classify_client_error(&e);
                warn!(error = %e, classified = %err, "transaction failed");
                Err(err)
            }
        }
    }
}

fn decode_mint(address: &Pubkey, account: &Account) -> Result<MintState, MarketError> {
    if account.owner != spl_token::id() {
        return Err(MarketError::MintNotFound(*address));
    }
    let mint = Mint::unpack(&account.data).map_err(|_| MarketError::MintNotFound(*address))?;
    Ok(MintState {
        supply: mint.supply,
        decimals: mint.decimals,
        mint_authority: mint.mint_authority.into(),
    })
}

/// Map a client error onto the submission taxonomy
///
/// Custom program errors keep their instruction index and code so callers can
/// recognize market program failures.
pub fn classify_client_error(err: &ClientError) -> SubmitError {
    match err.get_transaction_error() {
        Some(TransactionError::InstructionError(index, InstructionError::Custom(code))) => {
            SubmitError::Program { index, code }
        }
        Some(other) => SubmitError::Transaction(other.to_string()),
        None => SubmitError::Network(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_client::client_error::ClientErrorKind;
    use spl_token::solana_program::program_option::COption;

    #[test]
    fn test_custom_program_error_is_classified() {
        let err = ClientError::from(ClientErrorKind::TransactionError(
            TransactionError::InstructionError(1, InstructionError::Custom(6001)),
        ));
        assert_eq!(
            classify_client_error(&err),
            SubmitError::Program {
                index: 1,
                code: 6001
            }
        );
    }

    #[test]
    fn test_runtime_error_is_transaction_error() {
        let err = ClientError::from(ClientErrorKind::TransactionError(
            TransactionError::BlockhashNotFound,
        ));
        assert!(matches!(
            classify_client_error(&err),
            SubmitError::Transaction(_)
        ));
    }

    #[test]
    fn test_transport_error_is_network() {
        let err = ClientError::from(ClientErrorKind::Custom("connection reset".into()));
        assert!(matches!(
            classify_client_error(&err),
            SubmitError::Network(msg) if msg.contains("connection reset")
        ));
    }

    #[test]
    fn test_decode_mint() {
        let authority = Pubkey::new_unique();
        let mut data = vec![0u8; Mint::LEN];
        Mint::pack(
            Mint {
                mint_authority: COption::Some(authority),
                supply: 4,
                decimals: 0,
                is_initialized: true,
                freeze_authority: COption::None,
            },
            &mut data,
        )
        .unwrap();
        let account = Account {
            lamports: 1,
            data,
            owner: spl_token::id(),
            executable: false,
            rent_epoch: 0,
        };

        let state = decode_mint(&Pubkey::new_unique(), &account).unwrap();
        assert_eq!(state.supply, 4);
        assert_eq!(state.mint_authority, Some(authority));
    }

    #[test]
    fn test_decode_mint_wrong_owner() {
        let account = Account {
            lamports: 1,
            data: vec![0u8; Mint::LEN],
            owner: Pubkey::new_unique(),
            executable: false,
            rent_epoch: 0,
        };
        assert!(matches!(
            decode_mint(&Pubkey::new_unique(), &account),
            Err(MarketError::MintNotFound(_))
        ));
    }
}
