//! Streaming chat session state machine.
//!
//! One session serves one query:
//!
//! ```text
//! Accepted -> AwaitingQuery -> Searching -> Ranking -> ResultsSent -> Streaming -> Closed
//!      \___________\______________\___________\____________\____________\-> Aborted
//! ```
//!
//! The handler never returns an error. Faults are logged, the connection is
//! closed best-effort (at most once, and not at all if the peer already left),
//! and the terminal state is reported in a [`SessionOutcome`].

use crate::pipeline::Pipeline;
use crate::protocol::{QueryMessage, ServerMessage};
use futures::StreamExt;
use sift_core::{AppError, AppResult, Query};
use std::future::Future;
use std::time::Duration;
use tracing::Instrument;

/// Bidirectional message channel to one client.
#[async_trait::async_trait]
pub trait SessionTransport: Send {
    /// Next text message from the peer, or `None` once the peer has closed.
    ///
    /// Must be cancel-safe: the handler races it against pipeline stages.
    async fn receive(&mut self) -> AppResult<Option<String>>;

    /// Send one message. Fails with `PeerDisconnected` if the peer is gone.
    async fn send(&mut self, message: &ServerMessage) -> AppResult<()>;

    /// Close the connection from the server side.
    async fn close(&mut self) -> AppResult<()>;

    /// Whether the connection is already closed by either side.
    fn is_closed(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    AwaitingQuery,
    Searching,
    Ranking,
    ResultsSent,
    Streaming,
    Closed,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Aborted)
    }
}

/// How a session ended.
#[derive(Debug)]
pub struct SessionOutcome {
    pub state: SessionState,
    pub fault: Option<AppError>,
    pub fragments_sent: usize,
}

/// Drives sessions against a shared [`Pipeline`].
#[derive(Clone)]
pub struct SessionHandler {
    pipeline: Pipeline,
    pacing: Duration,
}

struct Progress {
    state: SessionState,
    fragments_sent: usize,
}

impl SessionHandler {
    pub fn new(pipeline: Pipeline, pacing: Duration) -> Self {
        Self { pipeline, pacing }
    }

    /// Serve one session to completion.
    pub async fn run<T: SessionTransport>(&self, transport: &mut T) -> SessionOutcome {
        let session_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("session", %session_id);

        async move {
            tracing::debug!("Session accepted");
            let mut progress = Progress {
                state: SessionState::Accepted,
                fragments_sent: 0,
            };

            let result = self.drive(transport, &mut progress).await;

            match result {
                Ok(()) => {
                    close_once(transport).await;
                    tracing::info!(fragments = progress.fragments_sent, "Session complete");
                    SessionOutcome {
                        state: SessionState::Closed,
                        fault: None,
                        fragments_sent: progress.fragments_sent,
                    }
                }
                Err(fault) => {
                    report_fault(&fault, progress.state, progress.fragments_sent);
                    if !matches!(fault, AppError::PeerDisconnected) {
                        close_once(transport).await;
                    }
                    SessionOutcome {
                        state: SessionState::Aborted,
                        fault: Some(fault),
                        fragments_sent: progress.fragments_sent,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive<T: SessionTransport>(
        &self,
        transport: &mut T,
        progress: &mut Progress,
    ) -> AppResult<()> {
        progress.state = SessionState::AwaitingQuery;
        let raw = transport
            .receive()
            .await?
            .ok_or(AppError::PeerDisconnected)?;
        let query = parse_query(&raw)?;
        tracing::debug!(%query, "Received query");

        progress.state = SessionState::Searching;
        let sources = guarded(transport, self.pipeline.search(&query)).await?;

        progress.state = SessionState::Ranking;
        let ranked = guarded(transport, async {
            Ok::<_, AppError>(self.pipeline.rank(&query, sources).await)
        })
        .await?;

        self.pace(transport).await?;
        transport
            .send(&ServerMessage::SearchResult(ranked.clone()))
            .await?;
        progress.state = SessionState::ResultsSent;
        tracing::debug!(count = ranked.len(), "Sent search results");

        let mut fragments = guarded(transport, self.pipeline.stream_answer(&query, &ranked)).await?;
        progress.state = SessionState::Streaming;

        while let Some(fragment) =
            guarded(transport, async { Ok::<_, AppError>(fragments.next().await) }).await?
        {
            let fragment = fragment?;
            tracing::trace!(%fragment, "Sending fragment");
            self.pace(transport).await?;
            transport.send(&ServerMessage::Content(fragment)).await?;
            progress.fragments_sent += 1;
        }

        Ok(())
    }

    /// Wait out the pacing interval, still watching the peer.
    async fn pace<T: SessionTransport>(&self, transport: &mut T) -> AppResult<()> {
        if self.pacing.is_zero() {
            return Ok(());
        }
        guarded(transport, async {
            tokio::time::sleep(self.pacing).await;
            Ok(())
        })
        .await
    }
}

/// Parse the single client message. A missing or blank query is rejected.
fn parse_query(raw: &str) -> AppResult<Query> {
    let message: QueryMessage = serde_json::from_str(raw)?;
    let text = message
        .query
        .ok_or_else(|| AppError::InvalidQuery("missing 'query' field".to_string()))?;
    Query::parse(&text)
}

/// Run `stage` while watching the peer. A close or end of stream during the
/// stage aborts with `PeerDisconnected`; extra client messages are dropped.
async fn guarded<T, F, R>(transport: &mut T, stage: F) -> AppResult<R>
where
    T: SessionTransport,
    F: Future<Output = AppResult<R>>,
{
    tokio::pin!(stage);
    loop {
        tokio::select! {
            biased;
            out = &mut stage => return out,
            incoming = transport.receive() => match incoming? {
                Some(_) => tracing::debug!("Ignoring extra client message"),
                None => return Err(AppError::PeerDisconnected),
            },
        }
    }
}

async fn close_once<T: SessionTransport>(transport: &mut T) {
    if transport.is_closed() {
        tracing::debug!("Connection already closed by peer");
        return;
    }
    if let Err(e) = transport.close().await {
        tracing::debug!(error = %e, "Failed to close connection");
    }
}

fn report_fault(fault: &AppError, state: SessionState, fragments_sent: usize) {
    match fault {
        AppError::PeerDisconnected => {
            tracing::debug!(?state, "Peer disconnected")
        }
        AppError::InvalidQuery(msg) => {
            tracing::warn!(?state, "Rejected query: {}", msg)
        }
        AppError::SearchUnavailable(msg) => {
            tracing::error!(?state, "Search failed: {}", msg)
        }
        AppError::GenerationFailed(msg) => {
            tracing::error!(?state, "Generation failed: {}", msg)
        }
        AppError::MidStreamGeneration(msg) => {
            tracing::error!(?state, fragments_sent, "Generation interrupted: {}", msg)
        }
        other => {
            tracing::error!(?state, code = other.code(), "Unexpected session fault: {}", other)
        }
    }
}
