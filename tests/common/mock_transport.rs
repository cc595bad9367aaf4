//! Mock Chat Transport for Testing
//!
//! Returns canned replies and records every exchange.

use async_trait::async_trait;
use avatalk::chat::ChatTransport;
use avatalk::error::{AvaError, AvaResult};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub struct MockTransport {
    pub reply: String,
    /// (message, session_id) pairs seen
    pub seen: Arc<Mutex<Vec<(String, String)>>>,
    pub should_fail: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            seen: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn exchange(&self, message: &str, session_id: &str) -> AvaResult<String> {
        self.seen
            .lock()
            .unwrap()
            .push((message.to_string(), session_id.to_string()));

        if *self.should_fail.lock().unwrap() {
            return Err(AvaError::Transport("mock transport down".to_string()));
        }
        Ok(self.reply.clone())
    }
}
