//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use portico::config::ProxyConfig;
use portico::discovery::{HostLookup, Resolver, ServiceEnv};
use portico::net::BridgeTracker;
use portico::{HttpServer, Shutdown};

/// A running proxy on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub bridges: BridgeTracker,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

/// Defaults with static serving off, so only service routes answer.
pub fn proxy_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.static_files.enabled = false;
    config
}

pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    start_proxy_with(config, Resolver::system()).await
}

pub async fn start_proxy_with<L, E>(config: ProxyConfig, resolver: Resolver<L, E>) -> TestProxy
where
    L: HostLookup + 'static,
    E: ServiceEnv + 'static,
{
    let server = HttpServer::with_resolver(config, resolver).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let bridges = server.bridges();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    TestProxy {
        addr,
        bridges,
        shutdown,
    }
}

/// Start a backend that answers every request with its name followed by
/// the raw request head it received.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let body = format!("backend={name}\n{head}");
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

async fn read_head<S: AsyncRead + Unpin>(socket: &mut S) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Write `contents` to a fresh file and return it with its directory guard.
pub fn write_temp(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    /// Request target of a completed upgrade handshake.
    Handshake(String),
    /// The upstream side of a connection ended.
    Closed,
}

/// A TLS WebSocket echo server with a self-signed certificate for 127.0.0.1.
///
/// Echoes text and binary messages; on the text message `bye` it closes
/// the connection itself.
pub struct WsUpstream {
    pub addr: SocketAddr,
    pub ca_path: PathBuf,
    pub events: mpsc::UnboundedReceiver<WsEvent>,
    _dir: tempfile::TempDir,
}

/// A TLS acceptor for a fresh self-signed certificate covering localhost and
/// 127.0.0.1, plus the PEM file holding that certificate.
fn self_signed_acceptor() -> (TlsAcceptor, PathBuf, tempfile::TempDir) {
    let key = rcgen::KeyPair::generate().unwrap();
    let cert = rcgen::CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])
        .unwrap()
        .self_signed(&key)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let ca_path = dir.path().join("ca.pem");
    std::fs::write(&ca_path, cert.pem()).unwrap();

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let server_config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(
            vec![cert.der().clone()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der())),
        )
        .unwrap();
    (TlsAcceptor::from(Arc::new(server_config)), ca_path, dir)
}

pub async fn start_tls_ws_upstream() -> WsUpstream {
    let (acceptor, ca_path, dir) = self_signed_acceptor();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, events) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(tls) = acceptor.accept(tcp).await else {
                    return;
                };
                let handshake_tx = tx.clone();
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    let _ = handshake_tx.send(WsEvent::Handshake(req.uri().to_string()));
                    Ok(resp)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(tls, callback).await else {
                    return;
                };

                while let Some(msg) = ws.next().await {
                    match msg {
                        Ok(Message::Text(text)) if text.as_str() == "bye" => {
                            let _ = ws.close(None).await;
                            break;
                        }
                        Ok(msg @ (Message::Text(_) | Message::Binary(_))) => {
                            if ws.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Ok(Message::Close(_)) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
                let _ = tx.send(WsEvent::Closed);
            });
        }
    });

    WsUpstream {
        addr,
        ca_path,
        events,
        _dir: dir,
    }
}

/// A TLS server that answers every request with `200 OK` and a fixed body,
/// never upgrading. Each request head it receives is reported on `requests`.
pub struct TlsHttpUpstream {
    pub addr: SocketAddr,
    pub ca_path: PathBuf,
    pub requests: mpsc::UnboundedReceiver<String>,
    _dir: tempfile::TempDir,
}

pub async fn start_tls_http_upstream(body: &'static str) -> TlsHttpUpstream {
    let (acceptor, ca_path, dir) = self_signed_acceptor();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, requests) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = acceptor.accept(tcp).await else {
                    return;
                };
                let head = read_head(&mut tls).await;
                let _ = tx.send(head);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = tls.write_all(response.as_bytes()).await;
                let _ = tls.shutdown().await;
            });
        }
    });

    TlsHttpUpstream {
        addr,
        ca_path,
        requests,
        _dir: dir,
    }
}
