//! Fee and payment policy.

use bitcoin::TxOut;
use serde::{Deserialize, Serialize};

/// Fee charged by the default policy.
pub const DEFAULT_FEE: u64 = 500;

/// Payment sent to the recipient as proof of delivery.
pub const DEFAULT_PAYMENT: u64 = 1000;

/// Non-witness bytes of a P2WPKH input: outpoint, empty script, sequence.
const P2WPKH_INPUT_BASE: u64 = 32 + 4 + 1 + 4;

/// Witness weight of a P2WPKH input: item count, signature, public key.
const P2WPKH_INPUT_WITNESS: u64 = 1 + 1 + 72 + 1 + 33;

/// How the fee and the recipient payment of a message are sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeePolicy {
    /// Flat fee and payment, regardless of transaction size.
    Fixed {
        /// Fee in satoshis.
        fee: u64,
        /// Recipient payment in satoshis.
        payment: u64,
    },
    /// Fee is the fee rate times the estimated virtual size.
    PerByte {
        /// Recipient payment in satoshis.
        payment: u64,
    },
}

impl FeePolicy {
    /// Amount paid to the recipient.
    pub fn payment(&self) -> u64 {
        match *self {
            FeePolicy::Fixed { payment, .. } | FeePolicy::PerByte { payment } => payment,
        }
    }

    /// Fee for a transaction with `input_count` P2WPKH inputs and `outputs`.
    ///
    /// # Arguments
    /// * `fee_rate` - Satoshis per virtual byte; ignored by `Fixed`.
    pub fn fee(&self, input_count: usize, outputs: &[TxOut], fee_rate: u64) -> u64 {
        match *self {
            FeePolicy::Fixed { fee, .. } => fee,
            FeePolicy::PerByte { .. } => fee_rate.saturating_mul(estimate_vsize(input_count, outputs)),
        }
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicy::Fixed {
            fee: DEFAULT_FEE,
            payment: DEFAULT_PAYMENT,
        }
    }
}

/// Estimate the virtual size of a signed transaction spending
/// `input_count` P2WPKH inputs into `outputs`.
///
/// Signatures are assumed to be 72 bytes, so the estimate is an upper
/// bound for low-S signatures.
pub fn estimate_vsize(input_count: usize, outputs: &[TxOut]) -> u64 {
    let inputs = input_count as u64;

    let mut base = 4 + 4; // version + locktime
    base += varint_len(inputs) + varint_len(outputs.len() as u64);
    base += inputs * P2WPKH_INPUT_BASE;
    for output in outputs {
        let script_len = output.script_pubkey.len() as u64;
        base += 8 + varint_len(script_len) + script_len;
    }

    // Segwit marker and flag count once, as witness data.
    let witness = 2 + inputs * P2WPKH_INPUT_WITNESS;
    let weight = base * 4 + witness;
    weight.div_ceil(4)
}

fn varint_len(n: u64) -> u64 {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}
