//! Messenger configuration.

use chainmail_keys::NetworkParams;
use chainmail_message::PROTOCOL_TAG;
use chainmail_transaction::FeePolicy;
use serde::{Deserialize, Serialize};

/// Configuration for a [`Messenger`](crate::Messenger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Network whose addresses and WIF keys are used.
    pub network: NetworkParams,
    /// Fee rate in satoshis per virtual byte, used by `FeePolicy::PerByte`.
    pub fee_rate: u64,
    /// Tag marking data outputs that carry messages.
    pub protocol_tag: [u8; 4],
    /// Fee and recipient payment sizing.
    pub fee_policy: FeePolicy,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            network: NetworkParams::default(),
            fee_rate: 1,
            protocol_tag: PROTOCOL_TAG,
            fee_policy: FeePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MessengerConfig::default();
        assert_eq!(config.network, NetworkParams::bitcoin());
        assert_eq!(config.fee_rate, 1);
        assert_eq!(&config.protocol_tag, b"CMSG");
        assert_eq!(
            config.fee_policy,
            FeePolicy::Fixed {
                fee: 500,
                payment: 1000
            }
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: MessengerConfig = serde_json::from_str(
            r#"{"fee_rate": 5, "fee_policy": {"kind": "per_byte", "payment": 600}}"#,
        )
        .unwrap();
        assert_eq!(config.fee_rate, 5);
        assert_eq!(config.fee_policy, FeePolicy::PerByte { payment: 600 });
        assert_eq!(config.protocol_tag, PROTOCOL_TAG);
        assert_eq!(config.network.bech32_hrp, "bc");
    }
}
