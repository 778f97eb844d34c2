//! Response routing: only answer-channel text reaches the caller.

use super::completion::{Channel, FragmentStream};
use crate::error::Result;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tracing::trace;

/// Ordered stream of answer text.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Forward answer fragments in order and drop every other channel.
///
/// An error is passed through as-is and ends the stream.
pub fn route(fragments: FragmentStream) -> AnswerStream {
    let mut fragments = fragments;

    let stream = async_stream::stream! {
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) if fragment.channel == Channel::Answer => yield Ok(fragment.text),
                Ok(fragment) => trace!(channel = ?fragment.channel, "Dropped non-answer fragment"),
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}
