//! Scripted [`CompletionClient`] for unit tests.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ApiError, CompletionClient, CompletionRequest, DeltaStream};

/// What the next call answers with.
pub(crate) enum Reply {
    /// Streams these deltas, then ends.
    Deltas(Vec<&'static str>),
    /// Streams these deltas, then goes silent forever.
    DeltasThenHang(Vec<&'static str>),
    /// Streams these deltas, then fails.
    DeltasThenError(Vec<&'static str>, ApiError),
    /// Fails before any response arrives.
    Fail(ApiError),
    /// Never responds.
    Hang,
}

/// Answers calls from a queue of [`Reply`] values and records every request.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, request: &CompletionRequest) -> Reply {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left")
    }
}

fn ok_deltas(deltas: Vec<&'static str>) -> Vec<Result<String, ApiError>> {
    deltas.into_iter().map(|d| Ok(d.to_string())).collect()
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ApiError> {
        match self.next_reply(request) {
            Reply::Deltas(deltas) => Ok(deltas.concat()),
            Reply::Fail(e) | Reply::DeltasThenError(_, e) => Err(e),
            Reply::DeltasThenHang(_) | Reply::Hang => futures::future::pending().await,
        }
    }

    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
    ) -> Result<DeltaStream, ApiError> {
        match self.next_reply(request) {
            Reply::Deltas(deltas) => Ok(Box::pin(stream::iter(ok_deltas(deltas)))),
            Reply::DeltasThenHang(deltas) => Ok(Box::pin(
                stream::iter(ok_deltas(deltas)).chain(stream::pending()),
            )),
            Reply::DeltasThenError(deltas, e) => {
                let mut items = ok_deltas(deltas);
                items.push(Err(e));
                Ok(Box::pin(stream::iter(items)))
            }
            Reply::Fail(e) => Err(e),
            Reply::Hang => futures::future::pending().await,
        }
    }
}
