//! Witness v0 key-hash (P2WPKH) addresses.
//!
//! Addresses are bech32 strings made of the network's human-readable
//! prefix, witness version 0 and the 20-byte HASH160 of a compressed key.

use std::fmt;

use bech32::{Fe32, Hrp};
use bitcoin::hashes::Hash;
use bitcoin::{ScriptBuf, WPubkeyHash};

use crate::key::PublicKey;
use crate::network::NetworkParams;
use crate::KeyError;

/// Length of a witness v0 key-hash program.
const WPKH_PROGRAM_LEN: usize = 20;

/// A bech32 P2WPKH address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    /// The encoded address string.
    encoded: String,
    /// The 20-byte witness program (HASH160 of the public key).
    program: [u8; WPKH_PROGRAM_LEN],
}

impl Address {
    /// Derive the address paying to `public_key` on `params`.
    pub fn p2wpkh(public_key: &PublicKey, params: &NetworkParams) -> Result<Self, KeyError> {
        let program = public_key.wpubkey_hash().to_byte_array();
        Self::from_program(program, params)
    }

    /// Encode a raw 20-byte witness program.
    pub fn from_program(
        program: [u8; WPKH_PROGRAM_LEN],
        params: &NetworkParams,
    ) -> Result<Self, KeyError> {
        let hrp = parse_hrp(params)?;
        let encoded = bech32::segwit::encode_v0(hrp, &program)
            .map_err(|e| KeyError::InvalidAddress(e.to_string()))?;
        Ok(Address { encoded, program })
    }

    /// Parse an address string, requiring the prefix of `params`.
    ///
    /// Only witness version 0 with a 20-byte program is accepted; script-hash
    /// and taproot addresses cannot receive messages.
    pub fn parse(s: &str, params: &NetworkParams) -> Result<Self, KeyError> {
        let expected_hrp = parse_hrp(params)?;
        let (hrp, version, program) = bech32::segwit::decode(s)
            .map_err(|e| KeyError::InvalidAddress(e.to_string()))?;

        if hrp != expected_hrp {
            return Err(KeyError::InvalidAddress(format!(
                "address prefix {} does not belong to network {}",
                hrp, params.name
            )));
        }
        if version != Fe32::Q {
            return Err(KeyError::InvalidAddress(format!(
                "unsupported witness version {}",
                version.to_u8()
            )));
        }
        let program: [u8; WPKH_PROGRAM_LEN] = program.as_slice().try_into().map_err(|_| {
            KeyError::InvalidAddress(format!(
                "expected a {}-byte key hash, got {} bytes",
                WPKH_PROGRAM_LEN,
                program.len()
            ))
        })?;

        Ok(Address {
            encoded: s.to_lowercase(),
            program,
        })
    }

    /// The encoded address string.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// The 20-byte witness program.
    pub fn program(&self) -> &[u8; WPKH_PROGRAM_LEN] {
        &self.program
    }

    /// Locking script for outputs paying to this address.
    pub fn script_pubkey(&self) -> ScriptBuf {
        ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(self.program))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

fn parse_hrp(params: &NetworkParams) -> Result<Hrp, KeyError> {
    Hrp::parse(&params.bech32_hrp).map_err(|e| {
        KeyError::InvalidAddress(format!("bad bech32 prefix {:?}: {}", params.bech32_hrp, e))
    })
}
