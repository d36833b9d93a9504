//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use forward_proxy::config::{KeyMaterial, ProxyConfig};
use forward_proxy::lifecycle::{self, RunningProxy};
use forward_proxy::TransformKey;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub const KEY: &[u8] = b"integration-key";

/// Upper bound for any single wait in a test.
#[allow(dead_code)]
pub const WAIT: Duration = Duration::from_secs(5);

#[allow(dead_code)]
pub fn key() -> TransformKey {
    TransformKey::new(KEY).unwrap()
}

/// Proxy config bound to an ephemeral loopback port.
pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.transform.key = KeyMaterial::Bytes(KEY.to_vec());
    config.lifecycle.shutdown_grace_secs = 1;
    config
}

pub async fn start_proxy() -> RunningProxy {
    lifecycle::start(test_config()).await.unwrap()
}

/// Start a backend that echoes every chunk back and reports what it got.
#[allow(dead_code)]
pub async fn start_echo_backend() -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    let _ = tx.send(buf[..n].to_vec());
                    if socket.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (addr, rx)
}

/// Start a backend that runs `f` on every accepted socket.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = std::sync::Arc::new(f);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move { f(socket).await });
        }
    });

    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Read from `stream` until it has at least `len` bytes.
#[allow(dead_code)]
pub async fn read_at_least(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    while out.len() < len {
        let n = tokio::time::timeout(WAIT, stream.read(&mut buf))
            .await
            .expect("timed out waiting for data")
            .unwrap();
        assert!(n > 0, "stream closed after {} of {} bytes", out.len(), len);
        out.extend_from_slice(&buf[..n]);
    }
    out
}

/// Read until EOF, failing the test if EOF does not come in time.
#[allow(dead_code)]
pub async fn read_to_eof(stream: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    tokio::time::timeout(WAIT, stream.read_to_end(&mut out))
        .await
        .expect("timed out waiting for the proxy to close the connection")
        .unwrap();
    out
}
