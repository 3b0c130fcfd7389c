//! Electrum client: lazy connection management and typed method wrappers.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tracing::info;

use crate::connection::Connection;
use crate::error::ElectrumError;
use crate::transport;
use crate::types::{Balance, ElectrumConfig, HistoryItem, ScriptHash, UnspentOutput};

const SERVER_VERSION: &str = "server.version";
const SCRIPTHASH_GET_BALANCE: &str = "blockchain.scripthash.get_balance";
const SCRIPTHASH_LISTUNSPENT: &str = "blockchain.scripthash.listunspent";
const SCRIPTHASH_GET_HISTORY: &str = "blockchain.scripthash.get_history";
const TRANSACTION_GET: &str = "blockchain.transaction.get";
const TRANSACTION_BROADCAST: &str = "blockchain.transaction.broadcast";

/// The indexing-server operations the messaging layer depends on.
pub trait ElectrumApi {
    /// Confirmed and unconfirmed balance of a script.
    fn get_balance(
        &self,
        script_hash: &ScriptHash,
    ) -> impl Future<Output = Result<Balance, ElectrumError>> + Send;

    /// Unspent outputs locked by a script.
    fn list_unspent(
        &self,
        script_hash: &ScriptHash,
    ) -> impl Future<Output = Result<Vec<UnspentOutput>, ElectrumError>> + Send;

    /// Transactions touching a script, oldest first.
    fn get_history(
        &self,
        script_hash: &ScriptHash,
    ) -> impl Future<Output = Result<Vec<HistoryItem>, ElectrumError>> + Send;

    /// Raw transaction hex for a transaction id.
    fn get_transaction(
        &self,
        tx_hash: &str,
    ) -> impl Future<Output = Result<String, ElectrumError>> + Send;

    /// Submit a raw transaction; resolves with its id.
    fn broadcast(
        &self,
        raw_tx_hex: &str,
    ) -> impl Future<Output = Result<String, ElectrumError>> + Send;
}

/// Client for one Electrum-protocol server.
///
/// The connection is opened on first use and reused by every later call,
/// including concurrent ones. After [`close`](ElectrumClient::close) or a
/// server hang-up, the next call dials again, unless the client was built
/// with [`from_stream`](ElectrumClient::from_stream).
#[derive(Debug)]
pub struct ElectrumClient {
    /// Client configuration.
    config: ElectrumConfig,
    /// Whether a lost connection may be replaced by dialing `config`.
    redial: bool,
    /// The live connection, if any.
    connection: Mutex<Option<Connection>>,
}

impl ElectrumClient {
    /// Create a client; no connection is made until the first call.
    pub fn new(config: ElectrumConfig) -> Self {
        Self {
            config,
            redial: true,
            connection: Mutex::new(None),
        }
    }

    /// Create a client over an already-open stream.
    ///
    /// The client never dials on its own: once the stream is closed, every
    /// call fails with [`ElectrumError::ConnectionClosed`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            config: ElectrumConfig::default(),
            redial: false,
            connection: Mutex::new(Some(Connection::spawn(stream))),
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ElectrumConfig {
        &self.config
    }

    /// Establish the connection. Does nothing if it is already open.
    pub async fn connect(&self) -> Result<(), ElectrumError> {
        self.connection().await.map(|_| ())
    }

    /// Close the connection. Outstanding calls fail with
    /// [`ElectrumError::ConnectionClosed`].
    pub async fn close(&self) {
        let connection = self.connection.lock().await.take();
        if let Some(connection) = connection {
            connection.close().await;
        }
    }

    /// Issue one raw call and return the server's `result`.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ElectrumError> {
        let connection = self.connection().await?;
        connection.call(method, params).await
    }

    /// Negotiate the protocol version. Returns `[server_software, protocol]`.
    pub async fn server_version(
        &self,
        client_name: &str,
        protocol_version: &str,
    ) -> Result<Vec<String>, ElectrumError> {
        self.call_as(SERVER_VERSION, vec![json!(client_name), json!(protocol_version)])
            .await
    }

    /// See [`ElectrumApi::get_balance`].
    pub async fn get_balance(&self, script_hash: &ScriptHash) -> Result<Balance, ElectrumError> {
        self.call_as(SCRIPTHASH_GET_BALANCE, vec![json!(script_hash.to_hex())])
            .await
    }

    /// See [`ElectrumApi::list_unspent`].
    pub async fn list_unspent(
        &self,
        script_hash: &ScriptHash,
    ) -> Result<Vec<UnspentOutput>, ElectrumError> {
        self.call_as(SCRIPTHASH_LISTUNSPENT, vec![json!(script_hash.to_hex())])
            .await
    }

    /// See [`ElectrumApi::get_history`].
    pub async fn get_history(
        &self,
        script_hash: &ScriptHash,
    ) -> Result<Vec<HistoryItem>, ElectrumError> {
        self.call_as(SCRIPTHASH_GET_HISTORY, vec![json!(script_hash.to_hex())])
            .await
    }

    /// See [`ElectrumApi::get_transaction`].
    pub async fn get_transaction(&self, tx_hash: &str) -> Result<String, ElectrumError> {
        self.call_as(TRANSACTION_GET, vec![json!(tx_hash), json!(false)])
            .await
    }

    /// See [`ElectrumApi::broadcast`].
    pub async fn broadcast(&self, raw_tx_hex: &str) -> Result<String, ElectrumError> {
        let txid: String = self
            .call_as(TRANSACTION_BROADCAST, vec![json!(raw_tx_hex)])
            .await?;
        info!(%txid, "transaction broadcast");
        Ok(txid)
    }

    /// The live connection, dialing a new one when there is none.
    async fn connection(&self) -> Result<Connection, ElectrumError> {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            if !connection.is_closed() {
                return Ok(connection.clone());
            }
        }
        if !self.redial {
            return Err(ElectrumError::ConnectionClosed);
        }

        let connection = transport::open(&self.config).await?;
        info!(
            host = %self.config.host,
            port = self.config.port,
            transport = ?self.config.transport,
            "connected to indexing server"
        );
        *slot = Some(connection.clone());
        Ok(connection)
    }

    async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, ElectrumError> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result).map_err(|source| ElectrumError::InvalidResponse {
            method: method.to_string(),
            source,
        })
    }
}

impl ElectrumApi for ElectrumClient {
    async fn get_balance(&self, script_hash: &ScriptHash) -> Result<Balance, ElectrumError> {
        ElectrumClient::get_balance(self, script_hash).await
    }

    async fn list_unspent(
        &self,
        script_hash: &ScriptHash,
    ) -> Result<Vec<UnspentOutput>, ElectrumError> {
        ElectrumClient::list_unspent(self, script_hash).await
    }

    async fn get_history(
        &self,
        script_hash: &ScriptHash,
    ) -> Result<Vec<HistoryItem>, ElectrumError> {
        ElectrumClient::get_history(self, script_hash).await
    }

    async fn get_transaction(&self, tx_hash: &str) -> Result<String, ElectrumError> {
        ElectrumClient::get_transaction(self, tx_hash).await
    }

    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String, ElectrumError> {
        ElectrumClient::broadcast(self, raw_tx_hex).await
    }
}
