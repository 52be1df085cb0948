//! Scripted in-memory channel for driving the login automaton in tests.

use std::collections::VecDeque;

use super::Channel;
use crate::error::{ChannelError, Result};

/// One scripted answer to a `read()` call.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Data(String),
    Closed,
}

/// Replays one scripted reply per read; reads past the script return "".
#[derive(Debug)]
pub(crate) struct ScriptedChannel {
    host: String,
    replies: VecDeque<Reply>,
    pub writes: Vec<String>,
    pub reads: usize,
    pub closed: bool,
}

impl ScriptedChannel {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            replies: VecDeque::new(),
            writes: Vec::new(),
            reads: 0,
            closed: false,
        }
    }

    /// Queue text for the next read.
    pub fn then(mut self, data: &str) -> Self {
        self.replies.push_back(Reply::Data(data.to_string()));
        self
    }

    /// Queue `count` empty reads.
    pub fn then_silence(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.replies.push_back(Reply::Data(String::new()));
        }
        self
    }

    /// Queue a stream-closed failure.
    pub fn then_closed(mut self) -> Self {
        self.replies.push_back(Reply::Closed);
        self
    }
}

impl Channel for ScriptedChannel {
    async fn read(&mut self) -> Result<String> {
        self.reads += 1;
        match self.replies.pop_front() {
            Some(Reply::Data(data)) => Ok(data),
            Some(Reply::Closed) => Err(ChannelError::Closed.into()),
            None => Ok(String::new()),
        }
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        if self.closed {
            return Err(ChannelError::Closed.into());
        }
        self.writes.push(data.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn host(&self) -> &str {
        &self.host
    }
}
