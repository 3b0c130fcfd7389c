//! One persistent connection to an indexing server.
//!
//! The socket, the receive buffer and the table of outstanding calls are
//! owned by a single I/O task. Callers talk to that task through a
//! channel, so all connection state is mutated on one path and needs no
//! locking.

use std::collections::HashMap;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::framing::{encode_request, LineBuffer, Response};
use crate::ElectrumError;

/// Size of a single socket read.
const READ_CHUNK: usize = 16 * 1024;

type Reply = oneshot::Sender<Result<Value, ElectrumError>>;

enum Command {
    Call {
        method: String,
        params: Vec<Value>,
        reply: Reply,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

/// Handle to a running connection.
///
/// Cloning the handle is cheap; all clones talk to the same socket. The
/// connection shuts down when [`close`](Connection::close) is called, when
/// the server hangs up, or when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct Connection {
    commands: mpsc::UnboundedSender<Command>,
}

impl Connection {
    /// Start the I/O task for an already-established stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (commands, receiver) = mpsc::unbounded_channel();
        tokio::spawn(drive(stream, receiver));
        Connection { commands }
    }

    /// Send one request and wait for its response.
    ///
    /// Resolves with the server's `result`, fails with
    /// [`ElectrumError::Rpc`] when the server returned an error, with
    /// [`ElectrumError::Transport`] when the request could not be written,
    /// and with [`ElectrumError::ConnectionClosed`] when the connection
    /// went away first.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ElectrumError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Call {
                method: method.to_string(),
                params,
                reply,
            })
            .map_err(|_| ElectrumError::ConnectionClosed)?;
        response.await.map_err(|_| ElectrumError::ConnectionClosed)?
    }

    /// Shut the connection down, failing every outstanding call.
    ///
    /// Returns once the I/O task has released the socket.
    pub async fn close(&self) {
        let (done, closed) = oneshot::channel();
        if self.commands.send(Command::Close { done }).is_ok() {
            let _ = closed.await;
        }
    }

    /// Whether the I/O task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

struct PendingCall {
    method: String,
    reply: Reply,
}

/// Calls written to the socket that have not been answered yet.
#[derive(Default)]
pub(crate) struct Outstanding {
    calls: HashMap<u64, PendingCall>,
}

impl Outstanding {
    pub(crate) fn insert(&mut self, id: u64, method: String, reply: Reply) {
        self.calls.insert(id, PendingCall { method, reply });
    }

    /// Complete the call with this id. Returns `false` if no such call is
    /// outstanding.
    pub(crate) fn resolve(&mut self, id: u64, outcome: Result<Value, ElectrumError>) -> bool {
        match self.calls.remove(&id) {
            Some(call) => {
                debug!(id, method = %call.method, ok = outcome.is_ok(), "response received");
                // The caller may have given up waiting; nothing to do then.
                let _ = call.reply.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Fail every outstanding call with `ConnectionClosed`, leaving the
    /// table empty. Returns how many calls were failed.
    pub(crate) fn fail_all(&mut self) -> usize {
        let count = self.calls.len();
        for (_, call) in self.calls.drain() {
            let _ = call.reply.send(Err(ElectrumError::ConnectionClosed));
        }
        count
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }
}

/// Route one complete line from the server.
pub(crate) fn handle_line(line: &[u8], outstanding: &mut Outstanding) {
    if line.iter().all(u8::is_ascii_whitespace) {
        return;
    }

    let response = match Response::parse(line) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "discarding malformed line from server");
            return;
        }
    };

    match response.id {
        Some(id) => {
            if !outstanding.resolve(id, response.into_result()) {
                warn!(id, "discarding response for unknown request id");
            }
        }
        None => debug!("ignoring server notification"),
    }
}

async fn drive<S>(stream: S, mut commands: mpsc::UnboundedReceiver<Command>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut buffer = LineBuffer::default();
    let mut outstanding = Outstanding::default();
    let mut next_id: u64 = 1;
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut close_requested = None;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Call { method, params, reply }) => {
                    let id = next_id;
                    next_id += 1;

                    let line = match encode_request(id, &method, &params) {
                        Ok(line) => line,
                        Err(e) => {
                            let _ = reply.send(Err(e));
                            continue;
                        }
                    };

                    debug!(id, %method, "sending request");
                    let written = match writer.write_all(&line).await {
                        Ok(()) => writer.flush().await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = written {
                        warn!(id, %method, error = %e, "request write failed");
                        let _ = reply.send(Err(ElectrumError::Transport(e)));
                        break;
                    }
                    outstanding.insert(id, method, reply);
                }
                Some(Command::Close { done }) => {
                    close_requested = Some(done);
                    break;
                }
                // Every handle was dropped.
                None => break,
            },
            read = reader.read(&mut chunk) => match read {
                Ok(0) => {
                    debug!("server closed the connection");
                    break;
                }
                Ok(n) => {
                    buffer.extend(&chunk[..n]);
                    while let Some(line) = buffer.next_line() {
                        handle_line(&line, &mut outstanding);
                    }
                    if let Some(dropped) = buffer.discard_oversized() {
                        warn!(dropped, "discarding oversized line from server");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "connection read failed");
                    break;
                }
            },
        }
    }

    let failed = outstanding.fail_all();
    if failed > 0 {
        warn!(failed, "connection closed with calls outstanding");
    }
    let _ = writer.shutdown().await;

    // Refuse new work, then fail whatever was already queued.
    commands.close();
    while let Ok(command) = commands.try_recv() {
        match command {
            Command::Call { reply, .. } => {
                let _ = reply.send(Err(ElectrumError::ConnectionClosed));
            }
            Command::Close { done } => {
                let _ = done.send(());
            }
        }
    }

    if let Some(done) = close_requested {
        let _ = done.send(());
    }
}
