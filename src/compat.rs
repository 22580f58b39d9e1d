//! Compatibility layer for Solana SDK message types
//!
//! A single interface for reading headers, account keys and signer sets from a
//! `VersionedMessage`, whether it is Legacy or V0. Batches are always compiled
//! to V0, but the in-memory ledger used by tests accepts either.

use solana_sdk::{
    message::{MessageHeader, VersionedMessage},
    packet::PACKET_DATA_SIZE,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};

/// Largest serialized transaction the network accepts
pub const MAX_TRANSACTION_SIZE: usize = PACKET_DATA_SIZE;

/// Get the message header from a `VersionedMessage`.
#[inline]
#[must_use]
pub fn get_message_header(message: &VersionedMessage) -> &MessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Get the static account keys from a `VersionedMessage`.
///
/// For V0 messages this excludes addresses loaded from lookup tables.
#[inline]
#[must_use]
pub fn get_static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

/// Get the required signers from a `VersionedMessage`.
///
/// Required signers are always the first `num_required_signatures` static keys.
#[inline]
#[must_use]
pub fn get_required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let num_signers = get_message_header(message).num_required_signatures as usize;
    let account_keys = get_static_account_keys(message);
    &account_keys[..num_signers.min(account_keys.len())]
}

/// Wire size of `message` once signed by all its required signers
///
/// Returns `None` if the message cannot be serialized.
pub fn signed_transaction_size(message: &VersionedMessage) -> Option<usize> {
    let num_signers = get_message_header(message).num_required_signatures as usize;
    let tx = VersionedTransaction {
        signatures: vec![Signature::default(); num_signers],
        message: message.clone(),
    };
    bincode::serialized_size(&tx).ok().map(|size| size as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        message::{v0, Message},
    };

    fn sample_instruction(signer: Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1, 2, 3],
            vec![
                AccountMeta::new(signer, true),
                AccountMeta::new(Pubkey::new_unique(), false),
            ],
        )
    }

    #[test]
    fn test_legacy_and_v0_agree() {
        let payer = Pubkey::new_unique();
        let cosigner = Pubkey::new_unique();
        let ix = sample_instruction(cosigner);

        let legacy = VersionedMessage::Legacy(Message::new(&[ix.clone()], Some(&payer)));
        let v0 = VersionedMessage::V0(
            v0::Message::try_compile(&payer, &[ix], &[], Hash::default()).unwrap(),
        );

        for message in [legacy, v0] {
            assert_eq!(get_message_header(&message).num_required_signatures, 2);
            let signers = get_required_signers(&message);
            assert_eq!(signers[0], payer);
            assert!(signers.contains(&cosigner));
            assert_eq!(get_static_account_keys(&message).len(), 4);
        }
    }

    #[test]
    fn test_signed_size_counts_signatures() {
        let payer = Pubkey::new_unique();
        let one = VersionedMessage::V0(
            v0::Message::try_compile(&payer, &[sample_instruction(payer)], &[], Hash::default())
                .unwrap(),
        );
        let two = VersionedMessage::V0(
            v0::Message::try_compile(
                &payer,
                &[sample_instruction(Pubkey::new_unique())],
                &[],
                Hash::default(),
            )
            .unwrap(),
        );

        let one_size = signed_transaction_size(&one).unwrap();
        let two_size = signed_transaction_size(&two).unwrap();
        // One more signature and one more account key
        assert_eq!(two_size - one_size, 64 + 32);
        assert!(one_size < MAX_TRANSACTION_SIZE);
    }
}
