//! Conversation core.
//!
//! - [`types`]: transcript entries and turn snapshots
//! - [`reassembler`]: fragment to line reassembly
//! - [`sink`]: append-only conversation and error logs
//! - [`controller`]: turn orchestration

pub mod controller;
pub mod reassembler;
pub mod sink;
pub mod types;

pub use controller::{Conversation, TurnRejection, TurnStream};
pub use reassembler::{LineBuffer, reassemble_lines};
pub use sink::{ConversationRecord, ErrorRecord, FileSink, LogSink, MemorySink, SinkError};
pub use types::{Message, Role, Transcript, TurnState, TurnUpdate};
