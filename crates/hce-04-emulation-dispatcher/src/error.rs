//! Error types for the emulation dispatcher.

use shared_types::{ComponentName, UserId};
use thiserror::Error;

/// Binding to a service could not be started.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("bind to {component} rejected: {reason}")]
    Rejected {
        component: ComponentName,
        reason: String,
    },

    #[error("user {0} is not running")]
    UserUnavailable(UserId),
}

/// A message could not be delivered to a bound service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel to {0} is closed")]
    Closed(ComponentName),

    #[error("service rejected message: {0}")]
    Rejected(String),
}

/// Posting to the dispatcher queue failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("dispatcher has shut down")]
    Closed,

    #[error("dispatcher queue is full")]
    QueueFull,
}

/// A SELECT APDU could not be built.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SelectError {
    #[error("AID is not hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("AID is {0} bytes; SELECT takes 5 to 16")]
    AidLength(usize),
}
