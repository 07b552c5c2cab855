use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use super::base::{CompletionProvider, CompletionReply, CompletionRequest};

/// A mock completion provider that returns pre-configured replies for
/// testing, recording every request it receives.
#[derive(Clone, Default)]
pub struct MockCompletions {
    replies: Arc<Mutex<Vec<CompletionReply>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockCompletions {
    /// Create a new mock provider with a sequence of replies
    pub fn new(replies: Vec<CompletionReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The requests received so far, in call order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletions {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply> {
        self.requests.lock().unwrap().push(request);
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            // Return an empty reply if no more pre-configured replies
            Ok(CompletionReply::text(""))
        } else {
            Ok(replies.remove(0))
        }
    }
}

/// A completion provider that always fails, for error-path tests.
pub struct FailingCompletions;

#[async_trait]
impl CompletionProvider for FailingCompletions {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionReply> {
        Err(anyhow::anyhow!("completion backend unavailable"))
    }
}
