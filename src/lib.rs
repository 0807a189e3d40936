//! Client-side streaming session engine for the book-assistant chat widget.
//!
//! Turns the assistant service's line-delimited event stream into a live
//! conversation transcript: [`FrameDecoder`] parses raw body chunks into
//! protocol events, [`ChatSession`] folds them into an observable transcript
//! with cooperative cancellation, [`markdown::render_blocks`] formats a
//! still-growing reply for display, and [`SelectionCapture`] tracks the
//! "ask about this passage" gesture. The hosting shell supplies the network
//! transport and the document-selection source; everything here is plain
//! state that can be driven from tests.

pub mod config;
pub mod decoder;
pub mod errors;
pub mod markdown;
pub mod models;
pub mod selection;
pub mod session;
pub mod transport;

pub use config::SessionConfig;
pub use decoder::FrameDecoder;
pub use errors::TransportError;
pub use markdown::{render_blocks, Block, Span};
pub use models::{ChatStreamRequest, Citation, Message, MessageRole, ProtocolEvent};
pub use selection::{
    AnchorPoint, BoundingRect, RawSelection, SelectionCapture, SelectionSignal, SelectionSource,
};
pub use session::{ChatSession, SessionSnapshot};
pub use transport::{ByteStream, ChatTransport, HttpChatTransport};
