//! Tests for the Electrum client, run against in-process mock servers.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::{json, Value};
use tokio::io::{
    duplex, split, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream,
    Lines, ReadBuf, ReadHalf, WriteHalf,
};
use tokio::net::TcpListener;

use crate::client::ElectrumClient;
use crate::error::ElectrumError;
use crate::types::{ElectrumConfig, ScriptHash, TransportKind};

/// Server end of an in-memory connection.
struct MockServer {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl MockServer {
    /// Read the next request line as JSON.
    async fn next_request(&mut self) -> Value {
        let line = self
            .lines
            .next_line()
            .await
            .expect("read from client")
            .expect("client sent a request");
        serde_json::from_str(&line).expect("request is JSON")
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn reply(&mut self, id: &Value, result: Value) {
        let line = format!("{}\n", json!({"jsonrpc": "2.0", "id": id, "result": result}));
        self.send_raw(line.as_bytes()).await;
    }
}

fn mock_pair() -> (ElectrumClient, MockServer) {
    let (client_end, server_end) = duplex(64 * 1024);
    let (reader, writer) = split(server_end);
    let server = MockServer {
        lines: BufReader::new(reader).lines(),
        writer,
    };
    (ElectrumClient::from_stream(client_end), server)
}

fn script_hash() -> ScriptHash {
    ScriptHash::from_script(&hex::decode("0014751e76e8199196d454941c45d1b3a323f1433bd6").unwrap())
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_out_of_order_responses_reach_their_callers() {
    let (client, mut server) = mock_pair();

    let serve = async {
        let mut requests = Vec::new();
        for _ in 0..3 {
            requests.push(server.next_request().await);
        }
        // Answer newest first; each result echoes the caller's argument.
        for request in requests.iter().rev() {
            server
                .reply(&request["id"], request["params"][0].clone())
                .await;
        }
    };

    let (a, b, c, ()) = tokio::join!(
        client.call("echo", vec![json!("a")]),
        client.call("echo", vec![json!("b")]),
        client.call("echo", vec![json!("c")]),
        serve,
    );

    assert_eq!(a.unwrap(), json!("a"));
    assert_eq!(b.unwrap(), json!("b"));
    assert_eq!(c.unwrap(), json!("c"));
}

#[tokio::test]
async fn test_request_ids_start_at_one_and_increase() {
    let (client, mut server) = mock_pair();

    let serve = async {
        let mut ids = Vec::new();
        for _ in 0..3 {
            let request = server.next_request().await;
            assert_eq!(request["jsonrpc"], "2.0");
            ids.push(request["id"].as_u64().unwrap());
            server.reply(&request["id"], Value::Null).await;
        }
        ids
    };

    let calls = async {
        for _ in 0..3 {
            assert_eq!(client.call("server.ping", vec![]).await.unwrap(), Value::Null);
        }
    };

    let (ids, ()) = tokio::join!(serve, calls);
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_garbage_and_unknown_ids_are_skipped() {
    let (client, mut server) = mock_pair();

    let serve = async {
        let request = server.next_request().await;
        server.send_raw(b"this is not json\n").await;
        server.send_raw(b"[1,2,3]\n").await;
        server
            .send_raw(b"{\"id\":999,\"result\":\"stray\"}\n")
            .await;
        server
            .send_raw(b"{\"method\":\"blockchain.headers.subscribe\",\"params\":[]}\n")
            .await;
        server.reply(&request["id"], json!("real")).await;
    };

    let (result, ()) = tokio::join!(client.call("echo", vec![]), serve);
    assert_eq!(result.unwrap(), json!("real"));
}

#[tokio::test]
async fn test_response_split_across_writes() {
    let (client, mut server) = mock_pair();

    let serve = async {
        let request = server.next_request().await;
        let line = format!("{}\n", json!({"id": request["id"], "result": {"n": 42}}));
        let (head, tail) = line.as_bytes().split_at(line.len() / 2);
        server.send_raw(head).await;
        tokio::task::yield_now().await;
        server.send_raw(tail).await;
    };

    let (result, ()) = tokio::join!(client.call("echo", vec![]), serve);
    assert_eq!(result.unwrap(), json!({"n": 42}));
}

#[tokio::test]
async fn test_rpc_error_object() {
    let (client, mut server) = mock_pair();

    let serve = async {
        let request = server.next_request().await;
        let line = format!(
            "{}\n",
            json!({"id": request["id"], "error": {"code": -32600, "message": "unknown method"}})
        );
        server.send_raw(line.as_bytes()).await;
    };

    let (result, ()) = tokio::join!(client.call("no.such.method", vec![]), serve);
    match result.unwrap_err() {
        ElectrumError::Rpc { code, message } => {
            assert_eq!(code, -32600);
            assert_eq!(message, "unknown method");
        }
        other => panic!("expected Rpc error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_server_disconnect_fails_outstanding_calls() {
    let (client, mut server) = mock_pair();

    let serve = async move {
        server.next_request().await;
        server.next_request().await;
        drop(server);
    };

    let (a, b, ()) = tokio::join!(
        client.call("slow", vec![]),
        client.call("slow", vec![]),
        serve,
    );

    assert!(matches!(a, Err(ElectrumError::ConnectionClosed)));
    assert!(matches!(b, Err(ElectrumError::ConnectionClosed)));
}

#[tokio::test]
async fn test_close_fails_outstanding_calls() {
    let (client, mut server) = mock_pair();

    let closer = async {
        server.next_request().await;
        server.next_request().await;
        client.close().await;
    };

    let (a, b, ()) = tokio::join!(
        client.call("slow", vec![]),
        client.call("slow", vec![]),
        closer,
    );

    assert!(matches!(a, Err(ElectrumError::ConnectionClosed)));
    assert!(matches!(b, Err(ElectrumError::ConnectionClosed)));
}

#[tokio::test]
async fn test_stream_client_does_not_redial_after_close() {
    let (client, _server) = mock_pair();
    client.close().await;

    let err = client.call("server.ping", vec![]).await.unwrap_err();
    assert!(matches!(err, ElectrumError::ConnectionClosed));
    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ElectrumError::ConnectionClosed));
}

/// Stream that never yields data and accepts a fixed number of writes
/// before every further write fails.
struct BrokenPipe {
    ok_writes: usize,
}

impl AsyncRead for BrokenPipe {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for BrokenPipe {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.ok_writes == 0 {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        self.ok_writes -= 1;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_write_failure_fails_call_and_closes_connection() {
    let client = ElectrumClient::from_stream(BrokenPipe { ok_writes: 1 });

    // Let the first request reach the socket before the second is queued.
    let first = client.call("first", vec![]);
    tokio::pin!(first);
    tokio::select! {
        biased;
        _ = &mut first => panic!("first call finished before the write failure"),
        _ = tokio::task::yield_now() => {}
    }

    let (first, second) = tokio::join!(&mut first, client.call("second", vec![]));
    assert!(matches!(second, Err(ElectrumError::Transport(_))));
    assert!(matches!(first, Err(ElectrumError::ConnectionClosed)));

    // The dead stream is not replaced by a dial to the default server.
    let err = client.call("third", vec![]).await.unwrap_err();
    assert!(matches!(err, ElectrumError::ConnectionClosed));
}

#[tokio::test]
async fn test_first_write_failure_is_transport_error() {
    let client = ElectrumClient::from_stream(BrokenPipe { ok_writes: 0 });

    let err = client.call("server.ping", vec![]).await.unwrap_err();
    assert!(matches!(err, ElectrumError::Transport(_)));
    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ElectrumError::ConnectionClosed));
}

// ---------------------------------------------------------------------------
// Typed helpers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_balance() {
    let (client, mut server) = mock_pair();
    let hash = script_hash();

    let serve = async {
        let request = server.next_request().await;
        assert_eq!(request["method"], "blockchain.scripthash.get_balance");
        assert_eq!(request["params"], json!([hash.to_hex()]));
        server
            .reply(&request["id"], json!({"confirmed": 100000, "unconfirmed": -500}))
            .await;
    };

    let (balance, ()) = tokio::join!(client.get_balance(&hash), serve);
    let balance = balance.unwrap();
    assert_eq!(balance.confirmed, 100_000);
    assert_eq!(balance.unconfirmed, -500);
}

#[tokio::test]
async fn test_list_unspent_and_history() {
    let (client, mut server) = mock_pair();
    let hash = script_hash();

    let serve = async {
        let request = server.next_request().await;
        assert_eq!(request["method"], "blockchain.scripthash.listunspent");
        server
            .reply(
                &request["id"],
                json!([{"tx_hash": "aa".repeat(32), "tx_pos": 1, "value": 2500, "height": 700000}]),
            )
            .await;

        let request = server.next_request().await;
        assert_eq!(request["method"], "blockchain.scripthash.get_history");
        server
            .reply(
                &request["id"],
                json!([
                    {"tx_hash": "bb".repeat(32), "height": 699999},
                    {"tx_hash": "cc".repeat(32), "height": 0, "fee": 500}
                ]),
            )
            .await;
    };

    let calls = async {
        let utxos = client.list_unspent(&hash).await.unwrap();
        let history = client.get_history(&hash).await.unwrap();
        (utxos, history)
    };

    let ((utxos, history), ()) = tokio::join!(calls, serve);
    assert_eq!(utxos.len(), 1);
    assert_eq!(utxos[0].tx_pos, 1);
    assert_eq!(utxos[0].value, 2500);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].tx_hash, "bb".repeat(32));
    assert_eq!(history[0].fee, None);
    assert_eq!(history[1].fee, Some(500));
}

#[tokio::test]
async fn test_get_transaction_requests_raw_hex() {
    let (client, mut server) = mock_pair();
    let txid = "dd".repeat(32);

    let serve = async {
        let request = server.next_request().await;
        assert_eq!(request["method"], "blockchain.transaction.get");
        assert_eq!(request["params"], json!([txid, false]));
        server.reply(&request["id"], json!("0200000000")).await;
    };

    let (raw, ()) = tokio::join!(client.get_transaction(&txid), serve);
    assert_eq!(raw.unwrap(), "0200000000");
}

#[tokio::test]
async fn test_broadcast_and_unexpected_result_shape() {
    let (client, mut server) = mock_pair();

    let serve = async {
        let request = server.next_request().await;
        assert_eq!(request["method"], "blockchain.transaction.broadcast");
        assert_eq!(request["params"], json!(["deadbeef"]));
        server.reply(&request["id"], json!("ee".repeat(32))).await;

        let request = server.next_request().await;
        server.reply(&request["id"], json!({"not": "a list"})).await;
    };

    let calls = async {
        let txid = client.broadcast("deadbeef").await;
        let history = client.get_history(&script_hash()).await;
        (txid, history)
    };

    let ((txid, history), ()) = tokio::join!(calls, serve);
    assert_eq!(txid.unwrap(), "ee".repeat(32));
    let err = history.unwrap_err();
    assert!(matches!(err, ElectrumError::InvalidResponse { .. }));
    assert!(err.to_string().contains("blockchain.scripthash.get_history"));
}

// ---------------------------------------------------------------------------
// TCP transport
// ---------------------------------------------------------------------------

fn tcp_config(port: u16) -> ElectrumConfig {
    ElectrumConfig {
        host: "127.0.0.1".to_string(),
        port,
        transport: TransportKind::Tcp,
        accept_invalid_certs: false,
    }
}

/// Answer every request on `socket` with the protocol version until EOF.
async fn serve_versions(socket: tokio::net::TcpStream) {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let request: Value = serde_json::from_str(&line).unwrap();
        let reply = json!({"id": request["id"], "result": ["MockServer 1.0", "1.4"]});
        writer
            .write_all(format!("{reply}\n").as_bytes())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_tcp_connect_is_lazy_and_reconnects_after_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let client = ElectrumClient::new(tcp_config(port));

    let accepted = Arc::new(AtomicUsize::new(0));
    let acceptor = tokio::spawn({
        let accepted = Arc::clone(&accepted);
        async move {
            loop {
                let (socket, _) = listener.accept().await.unwrap();
                accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve_versions(socket));
            }
        }
    });

    let version = client.server_version("chainmail", "1.4").await.unwrap();
    assert_eq!(version, vec!["MockServer 1.0".to_string(), "1.4".to_string()]);
    assert_eq!(accepted.load(Ordering::SeqCst), 1);

    client.connect().await.unwrap();
    client.server_version("chainmail", "1.4").await.unwrap();
    assert_eq!(accepted.load(Ordering::SeqCst), 1);

    client.close().await;
    let version = client.server_version("chainmail", "1.4").await.unwrap();
    assert_eq!(version[1], "1.4");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);

    client.close().await;
    acceptor.abort();
}

#[tokio::test]
async fn test_tcp_connect_refused_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = ElectrumClient::new(tcp_config(port));
    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ElectrumError::Transport(_)));
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_config_defaults() {
    let config = ElectrumConfig::default();
    assert_eq!(config.host, "localhost");
    assert_eq!(config.port, 50002);
    assert_eq!(config.transport, TransportKind::Tls);
    assert!(!config.accept_invalid_certs);

    let config = ElectrumConfig::new("electrum.example.org", 50002);
    assert_eq!(config.host, "electrum.example.org");
    assert_eq!(config.transport, TransportKind::Tls);
}

#[test]
fn test_config_from_partial_json() {
    let config: ElectrumConfig =
        serde_json::from_str(r#"{"host": "10.0.0.5", "port": 50001, "transport": "tcp"}"#).unwrap();
    assert_eq!(config.host, "10.0.0.5");
    assert_eq!(config.port, 50001);
    assert_eq!(config.transport, TransportKind::Tcp);
    assert!(!config.accept_invalid_certs);
}

#[test]
fn test_script_hash_is_reversed_sha256() {
    // sha256("") reversed.
    let hash = ScriptHash::from_script(&[]);
    assert_eq!(
        hash.to_hex(),
        "55b852781b9995a44c939b64e441ae2724b96f99c8f4fb9a141cfc9842c4b0e3"
    );
}
