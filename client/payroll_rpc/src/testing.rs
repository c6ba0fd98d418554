//! Loopback HTTP responders for the adapter tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use payroll_session::{Address, ProviderError, Signer};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Read one HTTP/1.1 request and return its body.
async fn read_body(socket: &mut TcpStream) -> Vec<u8> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return Vec::new();
        }
        request.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&request).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            let start = end + 4;
            if request.len() >= start + length {
                return request[start..start + length].to_vec();
            }
        }
    }
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    let _ = socket.shutdown().await;
}

/// Serve one canned HTTP response and return the base URL.
pub async fn serve_once(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_body(&mut socket).await;
        respond(&mut socket, status, body).await;
    });
    format!("http://{addr}")
}

/// JSON-RPC node answering each method from a script.
///
/// Results for a method are handed out in order and the last one repeats.
/// Unscripted methods get `-32601`.
#[derive(Clone, Default)]
pub struct ScriptedNode {
    script: Arc<Mutex<HashMap<String, VecDeque<Value>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, method: &str, results: impl IntoIterator<Item = Value>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(method.to_string(), results.into_iter().collect());
        self
    }

    /// Methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| *m == method).count()
    }

    fn next(&self, method: &str) -> Option<Value> {
        let mut script = self.script.lock().unwrap();
        let queue = script.get_mut(method)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    /// Start serving; returns the endpoint URL.
    pub async fn serve(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let node = self.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let body = read_body(&mut socket).await;
                let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                let method = request["method"].as_str().unwrap_or_default().to_string();
                node.calls.lock().unwrap().push(method.clone());
                let reply = match node.next(&method) {
                    Some(result) => json!({"jsonrpc": "2.0", "id": request["id"], "result": result}),
                    None => json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "error": {"code": -32601, "message": format!("method {method} not found")},
                    }),
                };
                respond(&mut socket, "200 OK", &reply.to_string()).await;
            }
        });
        format!("http://{addr}")
    }
}

/// Signer that only reports an address.
pub struct FixedSigner(pub Address);

#[async_trait]
impl Signer for FixedSigner {
    fn address(&self) -> Address {
        self.0
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Vec<u8>, ProviderError> {
        Ok(vec![0u8; 65])
    }
}
