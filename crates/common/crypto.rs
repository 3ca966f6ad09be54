//! ECDSA signature recovery and signing over secp256k1.

use ethereum_types::{Address, H256};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SECP256K1, SecretKey};
use thiserror::Error;

use crate::utils::keccak;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid signature recovery id")]
    InvalidRecoveryId,
    #[error("signature recovery failed: {0}")]
    Ecdsa(#[from] secp256k1::Error),
}

fn address_from_public_key(public_key: &PublicKey) -> Address {
    // The address is the low 20 bytes of the keccak of the uncompressed
    // public key, without the 0x04 prefix byte.
    let hash = keccak(&public_key.serialize_uncompressed()[1..]);
    Address::from_slice(&hash.as_bytes()[12..])
}

/// Recovers the signer address from a 64-byte compact signature plus recovery
/// parity bit, over the keccak hash of the signed payload.
pub fn recover_address(
    signature: &[u8; 64],
    parity: bool,
    message_hash: H256,
) -> Result<Address, CryptoError> {
    let recovery_id =
        RecoveryId::try_from(parity as i32).map_err(|_| CryptoError::InvalidRecoveryId)?;
    let signature = RecoverableSignature::from_compact(signature, recovery_id)?;
    let message = Message::from_digest(message_hash.0);
    let public_key = SECP256K1.recover_ecdsa(&message, &signature)?;
    Ok(address_from_public_key(&public_key))
}

/// Signs a 32-byte digest, returning the compact signature and the recovery
/// parity bit.
pub fn sign_hash(message_hash: H256, secret_key: &SecretKey) -> ([u8; 64], bool) {
    let message = Message::from_digest(message_hash.0);
    let signature = SECP256K1.sign_ecdsa_recoverable(&message, secret_key);
    let (recovery_id, bytes) = signature.serialize_compact();
    (bytes, i32::from(recovery_id) != 0)
}

/// Derives the account address controlled by a secret key.
pub fn address_from_secret_key(secret_key: &SecretKey) -> Address {
    address_from_public_key(&secret_key.public_key(SECP256K1))
}
