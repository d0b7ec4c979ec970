//! Asynchronous result channels.
//!
//! A channel decouples "a task finished" from "someone wants to know". The
//! producer writes through an [`AsyncResultChannelSink`], the consumer reads
//! through an [`AsyncResultChannelQuery`]; the two only share a
//! [`AsyncResultChannelSinkLocator`] string and a channel id, each side
//! resolving the locator independently.
//!
//! Delivery is at most once per channel id: the first message wins and any
//! later write for the same id is ignored.

#![warn(missing_docs)]

pub mod factory;
pub mod locator;
pub mod memory;
pub mod message;
pub mod sink;
pub mod source;
pub mod waiter;

pub use factory::{AsyncResultChannelSinkFactory, DefaultAsyncResultChannelSinkFactory};
pub use locator::AsyncResultChannelSinkLocator;
pub use memory::InMemoryAsyncResultChannel;
pub use message::AsyncResultChannelMessage;
pub use sink::{AsyncResultChannelQuery, AsyncResultChannelQueryExt, AsyncResultChannelSink, Delivery};
pub use source::AsyncResultChannelSource;
pub use waiter::{wait_for_result, ResultWaiter};

use taskmill_core::UniqueId;

/// Error type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors that can occur on a result channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The locator scheme is not recognized
    #[error("don't know about locator `{0}`")]
    UnknownLocator(String),

    /// Nothing has been written for the channel yet
    #[error("no result yet for {0}")]
    NoResult(UniqueId),

    /// The stored value does not match the requested type
    #[error("result for {channel_id} is not a {expected}: {source}")]
    Decode {
        /// Channel that was read
        channel_id: UniqueId,
        /// Requested type
        expected: &'static str,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// The value could not be turned into a message
    #[error("cannot encode result: {0}")]
    Encode(#[from] serde_json::Error),
}
