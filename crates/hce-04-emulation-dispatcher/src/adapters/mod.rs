//! Adapters for the dispatcher's outbound ports.

pub mod recording;

pub use recording::{
    BinderCall, RecordingBinder, RecordingChannel, RecordingObserveMode, RecordingResponder,
};
