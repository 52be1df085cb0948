//! Channel layer: the byte stream the login runs over, plus the
//! text-level helpers that sit between it and the login automaton.
//!
//! This module handles prompt detection, transcript recording with
//! ANSI stripping, and command echo normalization.

mod buffer;
mod echo;
mod patterns;
#[cfg(test)]
pub(crate) mod scripted;

pub use buffer::Transcript;
pub use echo::normalize_echo;
pub use patterns::{Detection, Prompt, PromptDetector, PromptPatterns};

use std::future::Future;

use crate::error::Result;

/// A live, interactive character stream to a device.
///
/// Implementations own the connection; the login automaton only reads,
/// writes and, on a fatal failure, closes it.
pub trait Channel: Send {
    /// Return whatever text is buffered right now.
    ///
    /// Must not wait for data: an empty string means nothing is pending.
    /// A stream that has been closed by the remote end reports
    /// [`ChannelError::Closed`](crate::error::ChannelError::Closed).
    fn read(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Send text to the device.
    fn write(&mut self, data: &str) -> impl Future<Output = Result<()>> + Send;

    /// Close the underlying connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Identity of the remote host, used in error messages.
    fn host(&self) -> &str;
}
