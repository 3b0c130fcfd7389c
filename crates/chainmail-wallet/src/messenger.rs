//! The [`Messenger`]: send and read messages for one key.

use std::str::FromStr;

use bitcoin::consensus::encode::deserialize;
use bitcoin::{Transaction, Txid};
use chainmail_electrum::{Balance, ElectrumApi, HistoryItem, ScriptHash, UnspentOutput};
use chainmail_keys::{Address, KeyError, KeyPair, PublicKey};
use chainmail_message::{Envelope, SharedSecret};
use chainmail_transaction::{build_message_transaction, MessageTxConfig, Utxo};
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::config::MessengerConfig;
use crate::inbox::{find_envelope, sender_public_key, InboxMessage};
use crate::WalletError;

/// Outcome of a successful [`Messenger::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Id of the broadcast transaction.
    pub txid: Txid,
    /// Fee paid.
    pub fee: u64,
    /// Amount paid to the recipient.
    pub payment: u64,
    /// Value returned to the sender.
    pub change: u64,
}

/// Sends and reads encrypted messages for one key pair.
pub struct Messenger<C> {
    key: KeyPair,
    /// The same private scalar, in the form the message codec uses.
    codec_secret: k256::SecretKey,
    address: Address,
    script_hash: ScriptHash,
    config: MessengerConfig,
    client: C,
}

impl<C: ElectrumApi> Messenger<C> {
    /// Create a messenger for `key`.
    ///
    /// Fails if the configured network cannot encode addresses.
    pub fn new(key: KeyPair, config: MessengerConfig, client: C) -> Result<Self, WalletError> {
        let address = key.address(&config.network)?;
        let script_hash = ScriptHash::from_script(key.public_key().p2wpkh_script().as_bytes());
        let codec_secret = k256::SecretKey::from_slice(&key.secret_bytes())
            .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
        Ok(Messenger {
            key,
            codec_secret,
            address,
            script_hash,
            config,
            client,
        })
    }

    /// Create a messenger from a WIF private key on the configured network.
    pub fn from_wif(wif: &str, config: MessengerConfig, client: C) -> Result<Self, WalletError> {
        let key = KeyPair::from_wif(wif, &config.network)?;
        Self::new(key, config, client)
    }

    /// The messenger's own address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The messenger's public key; senders encrypt to this.
    pub fn public_key(&self) -> &PublicKey {
        self.key.public_key()
    }

    /// Index key of the messenger's address.
    pub fn script_hash(&self) -> &ScriptHash {
        &self.script_hash
    }

    /// The configuration.
    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    /// The underlying server client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Balance of the messenger's address.
    pub async fn balance(&self) -> Result<Balance, WalletError> {
        Ok(self.client.get_balance(&self.script_hash).await?)
    }

    /// Encrypt `text` to `recipient` and broadcast it in a transaction.
    ///
    /// Every unspent output of the messenger's address is spent. Server and
    /// assembly errors abort the send.
    pub async fn send_message(
        &self,
        recipient: &PublicKey,
        text: &str,
    ) -> Result<SendReceipt, WalletError> {
        let body = SharedSecret::derive(&self.codec_secret, &codec_public_key(recipient)?)
            .encrypt(text);
        let envelope = Envelope::new(self.config.protocol_tag, body);

        let unspent = self.client.list_unspent(&self.script_hash).await?;
        let utxos = unspent
            .iter()
            .map(|output| self.utxo(output))
            .collect::<Result<Vec<_>, _>>()?;

        let tx_config = MessageTxConfig {
            utxos,
            recipient: *recipient,
            envelope: envelope.to_bytes(),
            fee_policy: self.config.fee_policy,
            fee_rate: self.config.fee_rate,
        };
        let (draft, signed) = build_message_transaction(&self.key, &tx_config)?;

        let reported = self.client.broadcast(&signed.raw).await?;
        if reported != signed.txid.to_string() {
            warn!(%reported, computed = %signed.txid, "server reported a different txid");
        }
        info!(txid = %signed.txid, recipient = %recipient, fee = draft.fee, "message sent");

        Ok(SendReceipt {
            txid: signed.txid,
            fee: draft.fee,
            payment: tx_config.fee_policy.payment(),
            change: draft.change(),
        })
    }

    /// Scan the messenger's history for messages addressed to it.
    ///
    /// The history is fetched up front; a failure there is returned. The
    /// stream then fetches each transaction in turn and yields the messages
    /// that decrypt, in history order. Transactions that cannot be fetched,
    /// carry no message, or do not decrypt are skipped. Each call makes a
    /// fresh pass over the server's data.
    pub async fn scan_inbox(
        &self,
    ) -> Result<impl Stream<Item = InboxMessage> + '_, WalletError> {
        let history = self.client.get_history(&self.script_hash).await?;
        debug!(items = history.len(), "scanning inbox");
        Ok(stream::iter(history).filter_map(move |item| async move { self.open(&item).await }))
    }

    /// Collect [`scan_inbox`](Messenger::scan_inbox) into a list.
    pub async fn collect_inbox(&self) -> Result<Vec<InboxMessage>, WalletError> {
        Ok(self.scan_inbox().await?.collect().await)
    }

    /// Read the message carried by `tx`, if it is one for this messenger.
    pub fn read_message(&self, tx: &Transaction) -> Option<InboxMessage> {
        let txid = tx.compute_txid();
        let envelope = find_envelope(tx, &self.config.protocol_tag)?;

        let Some(from) = sender_public_key(tx) else {
            debug!(%txid, "tagged transaction has no recognizable sender");
            return None;
        };
        let secret = SharedSecret::derive(&self.codec_secret, &codec_public_key(&from).ok()?);
        let text = match secret.try_decrypt(&envelope.body) {
            Ok(text) => text,
            Err(e) => {
                debug!(%txid, error = %e, "message is not for this key");
                return None;
            }
        };
        let from_address = from.address(&self.config.network).ok()?;

        Some(InboxMessage {
            from,
            from_address,
            text,
            txid,
        })
    }

    async fn open(&self, item: &HistoryItem) -> Option<InboxMessage> {
        let raw = match self.client.get_transaction(&item.tx_hash).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(txid = %item.tx_hash, error = %e, "skipping history item: fetch failed");
                return None;
            }
        };
        match decode_transaction(&raw) {
            Ok(tx) => self.read_message(&tx),
            Err(e) => {
                warn!(txid = %item.tx_hash, error = %e, "skipping history item");
                None
            }
        }
    }

    fn utxo(&self, output: &UnspentOutput) -> Result<Utxo, WalletError> {
        let txid = Txid::from_str(&output.tx_hash).map_err(|e| WalletError::InvalidUtxo {
            tx_hash: output.tx_hash.clone(),
            reason: e.to_string(),
        })?;
        Ok(Utxo {
            txid,
            vout: output.tx_pos,
            value: output.value,
            script_pubkey: self.key.public_key().p2wpkh_script(),
        })
    }
}

/// Decode a consensus-serialized transaction from hex.
fn decode_transaction(raw: &str) -> Result<Transaction, WalletError> {
    let bytes = hex::decode(raw.trim()).map_err(|e| WalletError::InvalidRawTransaction(e.to_string()))?;
    deserialize(&bytes).map_err(|e| WalletError::InvalidRawTransaction(e.to_string()))
}

fn codec_public_key(key: &PublicKey) -> Result<k256::PublicKey, KeyError> {
    k256::PublicKey::from_sec1_bytes(&key.to_bytes())
        .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))
}
