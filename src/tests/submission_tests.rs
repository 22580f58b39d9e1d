//! Multi-batch submission ordering, splitting and partial failure

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use tokio::sync::Mutex;

use crate::chain::TransactionSubmitter;
use crate::compat::{get_required_signers, get_static_account_keys};
use crate::errors::{MarketError, SubmitError};
use crate::metrics::metrics;
use crate::test_utils::MockLedger;
use crate::tx_builder::{submit_batches, InstructionBatch, TransactionBuilderError};

/// Accepts everything except the transaction at `fail_at`
#[derive(Default)]
struct RecordingSubmitter {
    fail_at: Option<usize>,
    blockhashes: Mutex<Vec<Hash>>,
    sent: Mutex<Vec<VersionedTransaction>>,
}

impl RecordingSubmitter {
    fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }
}

#[async_trait]
impl TransactionSubmitter for RecordingSubmitter {
    async fn latest_blockhash(&self) -> Result<Hash, SubmitError> {
        let hash = Hash::new_unique();
        self.blockhashes.lock().await.push(hash);
        Ok(hash)
    }

    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, SubmitError> {
        let mut sent = self.sent.lock().await;
        if self.fail_at == Some(sent.len()) {
            return Err(SubmitError::Transaction("AccountInUse".into()));
        }
        sent.push(transaction.clone());
        Ok(transaction.signatures[0])
    }
}

fn memo(program: Pubkey, tag: u8, signer: Option<Pubkey>) -> Instruction {
    let mut accounts: Vec<AccountMeta> = (0..5)
        .map(|_| AccountMeta::new(Pubkey::new_unique(), false))
        .collect();
    if let Some(signer) = signer {
        accounts.push(AccountMeta::new_readonly(signer, true));
    }
    let mut data = vec![tag];
    data.resize(180, tag);
    Instruction::new_with_bytes(program, &data, accounts)
}

fn tags(tx: &VersionedTransaction) -> Vec<u8> {
    tx.message.instructions().iter().map(|ix| ix.data[0]).collect()
}

#[tokio::test]
async fn test_batches_preserve_order_across_transactions() {
    let submitter = RecordingSubmitter::default();
    let payer = Arc::new(Keypair::new());
    let program = Pubkey::new_unique();

    let first: Vec<_> = (0..5).map(|t| memo(program, t, None)).collect();
    let second: Vec<_> = (5..10).map(|t| memo(program, t, None)).collect();
    let report = submit_batches(
        &submitter,
        &payer,
        vec![
            InstructionBatch::new(first, vec![]),
            InstructionBatch::new(second, vec![]),
        ],
    )
    .await
    .unwrap();

    let sent = submitter.sent.lock().await;
    assert!(sent.len() > 1);
    assert_eq!(report.signatures.len(), sent.len());

    let order: Vec<u8> = sent.iter().flat_map(tags).collect();
    assert_eq!(order, (0..10).collect::<Vec<u8>>());
}

#[tokio::test]
async fn test_each_transaction_gets_fresh_blockhash() {
    let submitter = RecordingSubmitter::default();
    let payer = Arc::new(Keypair::new());
    let program = Pubkey::new_unique();
    let ixs: Vec<_> = (0..10).map(|t| memo(program, t, None)).collect();

    submit_batches(&submitter, &payer, vec![InstructionBatch::new(ixs, vec![])])
        .await
        .unwrap();

    let sent = submitter.sent.lock().await;
    let hashes = submitter.blockhashes.lock().await;
    assert_eq!(hashes.len(), sent.len());
    for (tx, hash) in sent.iter().zip(hashes.iter()) {
        assert_eq!(tx.message.recent_blockhash(), hash);
    }
}

#[tokio::test]
async fn test_cosigners_sign_only_where_required() {
    let submitter = RecordingSubmitter::default();
    let payer = Arc::new(Keypair::new());
    let early = Arc::new(Keypair::new());
    let late = Arc::new(Keypair::new());
    let program = Pubkey::new_unique();

    let mut ixs: Vec<_> = (0..10).map(|t| memo(program, t, None)).collect();
    ixs[0] = memo(program, 0, Some(early.pubkey()));
    ixs[9] = memo(program, 9, Some(late.pubkey()));

    submit_batches(
        &submitter,
        &payer,
        vec![InstructionBatch::new(
            ixs,
            vec![Arc::clone(&early), Arc::clone(&late)],
        )],
    )
    .await
    .unwrap();

    let sent = submitter.sent.lock().await;
    assert!(sent.len() > 1);
    for tx in sent.iter() {
        assert!(tx.verify_with_results().iter().all(|ok| *ok));
        let required = get_required_signers(&tx.message);
        assert_eq!(required[0], payer.pubkey());
        assert_eq!(tx.signatures.len(), required.len());
    }
    let first = get_static_account_keys(&sent[0].message);
    let last = get_static_account_keys(&sent[sent.len() - 1].message);
    assert!(first.contains(&early.pubkey()) && !first.contains(&late.pubkey()));
    assert!(last.contains(&late.pubkey()) && !last.contains(&early.pubkey()));
}

#[tokio::test]
async fn test_partial_failure_reports_landed_transactions() {
    let submitter = RecordingSubmitter::failing_at(1);
    let payer = Arc::new(Keypair::new());
    let program = Pubkey::new_unique();
    let ixs: Vec<_> = (0..12).map(|t| memo(program, t, None)).collect();
    let failures = metrics()
        .transactions_failed
        .with_label_values(&["submission"]);
    let before = failures.get();

    let err = submit_batches(&submitter, &payer, vec![InstructionBatch::new(ixs, vec![])])
        .await
        .unwrap_err();

    match &err {
        TransactionBuilderError::Submission {
            index,
            total,
            completed,
            ..
        } => {
            assert_eq!(*index, 1);
            assert!(*total > 1);
            assert_eq!(completed.len(), 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
    // Nothing after the failed transaction is sent
    assert_eq!(submitter.sent.lock().await.len(), 1);
    assert!(err.is_retryable());
    assert!(failures.get() > before);

    let err = err.into_market_error(None);
    assert!(matches!(err, MarketError::TransactionRejected { reason } if reason.contains("AccountInUse")));
}

#[tokio::test]
async fn test_missing_signer_sends_nothing() {
    let submitter = RecordingSubmitter::default();
    let payer = Arc::new(Keypair::new());
    let program = Pubkey::new_unique();

    let mut ixs: Vec<_> = (0..10).map(|t| memo(program, t, None)).collect();
    ixs[9] = memo(program, 9, Some(Pubkey::new_unique()));
    let failures = metrics().transactions_failed.with_label_values(&["signing"]);
    let before = failures.get();

    let err = submit_batches(&submitter, &payer, vec![InstructionBatch::new(ixs, vec![])])
        .await
        .unwrap_err();

    assert!(matches!(err, TransactionBuilderError::Signing(_)));
    assert!(!err.is_retryable());
    assert!(failures.get() > before);
    assert!(submitter.sent.lock().await.is_empty());
    assert!(submitter.blockhashes.lock().await.is_empty());
}

#[tokio::test]
async fn test_empty_batches_are_a_no_op() {
    let ledger = MockLedger::new();
    let payer = Arc::new(Keypair::new());

    let report = submit_batches(&ledger, &payer, vec![InstructionBatch::default()])
        .await
        .unwrap();

    assert!(report.signatures.is_empty());
    assert_eq!(ledger.blockhash_requests().await, 0);
}
