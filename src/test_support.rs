//! In-process websocket service used by the controller and session tests.

use crate::model::SessionConfig;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// What the fake service does after it has read the request.
pub(crate) enum Step {
    Send(serde_json::Value),
    Raw(String),
    /// Close the channel with a close frame.
    Close,
    /// Keep the channel open and silent.
    Hang,
}

pub(crate) struct TestServer {
    addr: SocketAddr,
    requests: mpsc::UnboundedReceiver<String>,
    extras: mpsc::UnboundedReceiver<Vec<String>>,
}

impl TestServer {
    pub(crate) fn config(&self) -> SessionConfig {
        SessionConfig::from_base_url(&format!("http://{}", self.addr), Duration::from_secs(2))
            .expect("valid test url")
    }

    /// The request message of the next connection.
    pub(crate) async fn next_request(&mut self) -> String {
        self.requests.recv().await.expect("no request received")
    }

    /// Text messages the client sent after its request, until it closed the channel.
    pub(crate) async fn extra_messages(&mut self) -> Vec<String> {
        self.extras.recv().await.expect("channel was not closed by the client")
    }
}

/// Serve one scripted connection per entry of `scripts`, in order.
pub(crate) async fn spawn_server(scripts: Vec<Vec<Step>>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (req_tx, requests) = mpsc::unbounded_channel();
    let (extra_tx, extras) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for script in scripts {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(serve_one(stream, script, req_tx.clone(), extra_tx.clone()));
        }
    });

    TestServer {
        addr,
        requests,
        extras,
    }
}

async fn serve_one(
    stream: TcpStream,
    script: Vec<Step>,
    req_tx: mpsc::UnboundedSender<String>,
    extra_tx: mpsc::UnboundedSender<Vec<String>>,
) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    match ws.next().await {
        Some(Ok(Message::Text(req))) => {
            let _ = req_tx.send(req);
        }
        _ => return,
    }

    for step in script {
        let text = match step {
            Step::Send(value) => value.to_string(),
            Step::Raw(text) => text,
            Step::Close => {
                let _ = ws.close(None).await;
                return;
            }
            Step::Hang => std::future::pending::<String>().await,
        };
        if ws.send(Message::Text(text)).await.is_err() {
            return;
        }
    }

    let mut extra = Vec::new();
    while let Some(Ok(msg)) = ws.next().await {
        match msg {
            Message::Text(text) => extra.push(text),
            Message::Close(_) => break,
            _ => {}
        }
    }
    let _ = extra_tx.send(extra);
}

/// A config pointing at a port nothing listens on.
pub(crate) async fn refused_config() -> SessionConfig {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    SessionConfig::from_base_url(&format!("http://{addr}"), Duration::from_secs(2))
        .expect("valid test url")
}
