//! Multi-batch transaction packing and submission
//!
//! Batches are flattened into one ordered instruction list and packed into as
//! few v0 transactions as fit the packet limit. Every transaction is signed by
//! exactly the keypairs its message requires, then sent and confirmed in order
//! with a fresh blockhash. The first rejection stops the sequence.
//!
//! When the list needs more than one transaction, the operation is no longer
//! atomic on chain: a failure in transaction `k` leaves transactions `0..k`
//! committed. The returned error reports which ones landed.

use std::collections::HashMap;
use std::sync::Arc;

use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};
use tracing::{debug, info, warn};

use crate::chain::TransactionSubmitter;
use crate::compat::{get_required_signers, signed_transaction_size, MAX_TRANSACTION_SIZE};
use crate::metrics::metrics;
use crate::tx_builder::errors::TransactionBuilderError;

/// Instructions plus the keypairs that must co-sign them
#[derive(Clone, Default)]
pub struct InstructionBatch {
    pub instructions: Vec<Instruction>,
    pub signers: Vec<Arc<Keypair>>,
}

impl InstructionBatch {
    pub fn new(instructions: Vec<Instruction>, signers: Vec<Arc<Keypair>>) -> Self {
        Self {
            instructions,
            signers,
        }
    }
}

impl std::fmt::Debug for InstructionBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstructionBatch")
            .field("instructions", &self.instructions.len())
            .field(
                "signers",
                &self.signers.iter().map(|k| k.pubkey()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Signatures of the submitted transactions, in submission order
#[derive(Debug, Clone, Default)]
pub struct SubmissionReport {
    pub signatures: Vec<Signature>,
}

/// Split `instructions` into the fewest ordered chunks that each fit one
/// transaction paid by `payer`
///
/// Greedy packing is optimal here: instruction order is fixed and the size of
/// a chunk only grows as instructions are appended.
pub fn plan_transactions(
    payer: &Pubkey,
    instructions: &[Instruction],
) -> Result<Vec<Vec<Instruction>>, TransactionBuilderError> {
    let mut chunks: Vec<Vec<Instruction>> = Vec::new();
    let mut current: Vec<Instruction> = Vec::new();

    for (index, ix) in instructions.iter().enumerate() {
        current.push(ix.clone());
        if transaction_size(payer, &current)? <= MAX_TRANSACTION_SIZE {
            continue;
        }

        current.pop();
        if current.is_empty() {
            let size = transaction_size(payer, std::slice::from_ref(ix))?;
            return Err(TransactionBuilderError::Oversized {
                index,
                size,
                limit: MAX_TRANSACTION_SIZE,
            });
        }
        chunks.push(std::mem::take(&mut current));

        current.push(ix.clone());
        let size = transaction_size(payer, &current)?;
        if size > MAX_TRANSACTION_SIZE {
            return Err(TransactionBuilderError::Oversized {
                index,
                size,
                limit: MAX_TRANSACTION_SIZE,
            });
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}

fn compile(
    payer: &Pubkey,
    instructions: &[Instruction],
    blockhash: Hash,
) -> Result<VersionedMessage, TransactionBuilderError> {
    MessageV0::try_compile(payer, instructions, &[], blockhash)
        .map(VersionedMessage::V0)
        .map_err(|e| TransactionBuilderError::Compile(e.to_string()))
}

fn transaction_size(
    payer: &Pubkey,
    instructions: &[Instruction],
) -> Result<usize, TransactionBuilderError> {
    let message = compile(payer, instructions, Hash::default())?;
    signed_transaction_size(&message)
        .ok_or_else(|| TransactionBuilderError::Compile("message is not serializable".into()))
}

/// Keypairs for exactly the required signers of `message`
fn resolve_signers<'a>(
    message: &VersionedMessage,
    keyring: &'a HashMap<Pubkey, Arc<Keypair>>,
) -> Result<Vec<&'a Keypair>, TransactionBuilderError> {
    get_required_signers(message)
        .iter()
        .map(|key| {
            keyring
                .get(key)
                .map(|kp| kp.as_ref())
                .ok_or_else(|| TransactionBuilderError::missing_signer(key))
        })
        .collect()
}

/// Sign `message` with the keyring, using only the signers it requires
pub fn sign_message(
    message: VersionedMessage,
    keyring: &HashMap<Pubkey, Arc<Keypair>>,
) -> Result<VersionedTransaction, TransactionBuilderError> {
    let keypairs = resolve_signers(&message, keyring)?;
    let signers: Vec<&dyn Signer> = keypairs.into_iter().map(|k| k as &dyn Signer).collect();
    VersionedTransaction::try_new(message, &signers)
        .map_err(|e| TransactionBuilderError::Signing(e.to_string()))
}

/// Deduplicate signers by public key, payer first
fn build_keyring(payer: &Arc<Keypair>, batches: &[InstructionBatch]) -> HashMap<Pubkey, Arc<Keypair>> {
    let mut keyring = HashMap::new();
    keyring.insert(payer.pubkey(), Arc::clone(payer));
    for signer in batches.iter().flat_map(|b| b.signers.iter()) {
        keyring
            .entry(signer.pubkey())
            .or_insert_with(|| Arc::clone(signer));
    }
    keyring
}

/// Submit `batches` as one ordered operation paid by `payer`
///
/// Packing and signer resolution are checked for every transaction before
/// anything is sent, so input errors never leave partial state. Failures are
/// counted in `transactions_failed_total` under their category.
pub async fn submit_batches(
    submitter: &dyn TransactionSubmitter,
    payer: &Arc<Keypair>,
    batches: Vec<InstructionBatch>,
) -> Result<SubmissionReport, TransactionBuilderError> {
    let result = submit_in_order(submitter, payer, batches).await;
    if let Err(err) = &result {
        metrics()
            .transactions_failed
            .with_label_values(&[err.category()])
            .inc();
        warn!(
            category = err.category(),
            retryable = err.is_retryable(),
            error = %err,
            "batch submission stopped"
        );
    }
    result
}

async fn submit_in_order(
    submitter: &dyn TransactionSubmitter,
    payer: &Arc<Keypair>,
    batches: Vec<InstructionBatch>,
) -> Result<SubmissionReport, TransactionBuilderError> {
    let payer_key = payer.pubkey();
    let keyring = build_keyring(payer, &batches);
    let instructions: Vec<Instruction> = batches
        .into_iter()
        .flat_map(|b| b.instructions)
        .collect();

    if instructions.is_empty() {
        return Ok(SubmissionReport::default());
    }

    let plan = plan_transactions(&payer_key, &instructions)?;
    for chunk in &plan {
        resolve_signers(&compile(&payer_key, chunk, Hash::default())?, &keyring)?;
    }

    let total = plan.len();
    if total > 1 {
        warn!(
            transactions = total,
            instructions = instructions.len(),
            "instructions exceed one transaction, submission is not atomic"
        );
    } else {
        debug!(instructions = instructions.len(), "submitting single transaction");
    }

    let mut signatures = Vec::with_capacity(total);
    for (index, chunk) in plan.iter().enumerate() {
        let blockhash = submitter.latest_blockhash().await.map_err(|source| {
            TransactionBuilderError::Submission {
                index,
                total,
                completed: signatures.clone(),
                source,
            }
        })?;
        let tx = sign_message(compile(&payer_key, chunk, blockhash)?, &keyring)?;

        metrics().transactions_submitted.inc();
        match submitter.submit_transaction(&tx).await {
            Ok(signature) => {
                info!(%signature, index, total, "transaction confirmed");
                signatures.push(signature);
            }
            Err(source) => {
                warn!(index, total, error = %source, landed = signatures.len(), "transaction rejected");
                return Err(TransactionBuilderError::Submission {
                    index,
                    total,
                    completed: signatures,
                    source,
                });
            }
        }
    }

    Ok(SubmissionReport { signatures })
}
