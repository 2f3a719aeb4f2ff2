//! In-memory fakes for exercising the pipeline and session without network.

use crate::pipeline::Pipeline;
use crate::protocol::ServerMessage;
use crate::session::SessionTransport;
use futures::{stream, SinkExt, StreamExt};
use sift_core::{AppError, AppResult, Query, Source};
use sift_llm::{Answer, AnswerGenerator, FragmentStream};
use sift_search::{SearchGateway, SourceRanker};
use std::sync::{Arc, Mutex};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

pub fn pipeline(
    search: FakeSearch,
    ranker: impl SourceRanker + 'static,
    generator: Arc<FakeGenerator>,
) -> Pipeline {
    Pipeline::new(Arc::new(search), Arc::new(ranker), generator)
}

pub struct FakeSearch {
    result: Result<Vec<Source>, String>,
    delay: Option<Duration>,
}

impl FakeSearch {
    pub fn returning(sources: Vec<Source>) -> Self {
        Self {
            result: Ok(sources),
            delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err("connection refused".to_string()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait::async_trait]
impl SearchGateway for FakeSearch {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn search(&self, _query: &Query) -> AppResult<Vec<Source>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result
            .clone()
            .map_err(AppError::SearchUnavailable)
    }
}

/// Orders sources by URL.
pub struct UrlOrderRanker;

#[async_trait::async_trait]
impl SourceRanker for UrlOrderRanker {
    fn name(&self) -> &str {
        "url-order"
    }

    async fn rank(&self, _query: &Query, mut sources: Vec<Source>) -> Vec<Source> {
        sources.sort_by(|a, b| a.url.cmp(&b.url));
        sources
    }
}

enum Failure {
    None,
    AtStart,
    AfterFragments,
}

/// Replays scripted fragments and records every call as (query, source urls).
pub struct FakeGenerator {
    fragments: Vec<String>,
    failure: Failure,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeGenerator {
    fn build(fragments: &[&str], failure: Failure) -> Arc<Self> {
        Arc::new(Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            failure,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn fragments(fragments: &[&str]) -> Arc<Self> {
        Self::build(fragments, Failure::None)
    }

    pub fn failing_at_start() -> Arc<Self> {
        Self::build(&[], Failure::AtStart)
    }

    pub fn failing_after(fragments: &[&str]) -> Arc<Self> {
        Self::build(fragments, Failure::AfterFragments)
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, query: &Query, sources: &[Source]) {
        let urls = sources.iter().map(|s| s.url.clone()).collect();
        self.calls
            .lock()
            .unwrap()
            .push((query.as_str().to_string(), urls));
    }
}

#[async_trait::async_trait]
impl AnswerGenerator for FakeGenerator {
    async fn generate_stream(&self, query: &Query, sources: &[Source]) -> AppResult<FragmentStream> {
        self.record(query, sources);
        if matches!(self.failure, Failure::AtStart) {
            return Err(AppError::GenerationFailed("model not loaded".to_string()));
        }

        let mut items: Vec<AppResult<String>> =
            self.fragments.iter().cloned().map(Ok).collect();
        if matches!(self.failure, Failure::AfterFragments) {
            items.push(Err(AppError::MidStreamGeneration(
                "connection reset".to_string(),
            )));
        }
        Ok(Box::pin(stream::iter(items)))
    }

    async fn generate(&self, query: &Query, sources: &[Source]) -> AppResult<Answer> {
        self.record(query, sources);
        match self.failure {
            Failure::None => Ok(Answer {
                text: self.fragments.concat(),
                model: "fake".to_string(),
            }),
            _ => Err(AppError::GenerationFailed("model not loaded".to_string())),
        }
    }
}

/// Transport backed by a channel for input and a vector for output.
///
/// `disconnect_after(n)` simulates the peer leaving once `n` messages have
/// been delivered: later sends fail and receives report end of stream.
pub struct MemoryTransport {
    incoming: mpsc::UnboundedReceiver<String>,
    pub sent: Vec<ServerMessage>,
    pub close_calls: usize,
    disconnect_after: Option<usize>,
    peer_gone: bool,
    closed: bool,
}

impl MemoryTransport {
    pub fn new() -> (Self, mpsc::UnboundedSender<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            incoming: rx,
            sent: Vec::new(),
            close_calls: 0,
            disconnect_after: None,
            peer_gone: false,
            closed: false,
        };
        (transport, tx)
    }

    pub fn disconnect_after(mut self, messages: usize) -> Self {
        self.disconnect_after = Some(messages);
        self
    }

    pub fn contents(&self) -> Vec<&str> {
        self.sent
            .iter()
            .filter_map(|m| match m {
                ServerMessage::Content(text) => Some(text.as_str()),
                ServerMessage::SearchResult(_) => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SessionTransport for MemoryTransport {
    async fn receive(&mut self) -> AppResult<Option<String>> {
        if self.peer_gone {
            return Ok(None);
        }
        let message = self.incoming.recv().await;
        if message.is_none() {
            self.peer_gone = true;
        }
        Ok(message)
    }

    async fn send(&mut self, message: &ServerMessage) -> AppResult<()> {
        if self.peer_gone || self.closed {
            return Err(AppError::PeerDisconnected);
        }
        self.sent.push(message.clone());
        if self.disconnect_after == Some(self.sent.len()) {
            self.peer_gone = true;
        }
        Ok(())
    }

    async fn close(&mut self) -> AppResult<()> {
        self.close_calls += 1;
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.peer_gone || self.closed
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

pub type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub async fn ws_connect(url: &str) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws
}

pub async fn send_query(ws: &mut WsClient, query: &str) {
    let frame = serde_json::json!({ "query": query }).to_string();
    ws.send(Message::Text(frame.into())).await.unwrap();
}

/// Next server message, skipping control frames. `None` on close or end.
pub async fn next_message(ws: &mut WsClient) -> Option<ServerMessage> {
    loop {
        match ws.next().await? {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

/// Read server messages until a close frame (`true`) or the stream ends
/// without one (`false`).
pub async fn read_until_close(ws: &mut WsClient) -> (Vec<ServerMessage>, bool) {
    let mut messages = Vec::new();
    let read = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    messages.push(serde_json::from_str(text.as_str()).unwrap())
                }
                Some(Ok(Message::Close(_))) => return true,
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return false,
            }
        }
    };
    let closed = tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .unwrap_or(false);
    (messages, closed)
}
