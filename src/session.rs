use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::config::SessionConfig;
use crate::decoder::FrameDecoder;
use crate::errors::TransportError;
use crate::models::{ChatStreamRequest, Citation, Message, ProtocolEvent};
use crate::transport::ChatTransport;

/// Read-only view of the session for the presentation layer.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub transcript: Vec<Message>,
    pub conversation_id: Option<String>,
    pub pending_selection: Option<String>,
    pub in_flight: bool,
}

#[derive(Debug)]
struct SessionState {
    transcript: Vec<Message>,
    conversation_id: Option<String>,
    pending_selection: Option<String>,
    in_flight: bool,
}

struct Inner {
    config: SessionConfig,
    transport: Arc<dyn ChatTransport>,
    state: Mutex<SessionState>,
    // Distinguishes the current turn from superseded ones. Advanced by every
    // accepted send and every clear, always under the state lock, so a fold
    // that re-checks it under the same lock can never race a reset.
    generation: AtomicU64,
    revision: watch::Sender<u64>,
}

/// What a fold decided about the turn it belongs to.
enum Fold {
    Continue,
    Finished,
    Superseded,
}

/// One conversation with the book assistant.
///
/// Owns the transcript, the conversation identity, the pending selection and
/// the in-flight flag, and is the only writer of any of them. Cheap to clone;
/// clones share state. The presentation layer subscribes for change
/// notifications and pulls snapshots:
///
/// ```no_run
/// # use std::sync::Arc;
/// # use bookchat::{ChatSession, HttpChatTransport, SessionConfig};
/// let config = SessionConfig::from_env();
/// let transport = Arc::new(HttpChatTransport::new(config.endpoint.clone()));
/// let session = ChatSession::new(config, transport);
/// let _changes = session.subscribe();
/// ```
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    pub fn new(config: SessionConfig, transport: Arc<dyn ChatTransport>) -> Self {
        let greeting = config.greeting.clone();
        Self::build(config, transport, greeting, None)
    }

    /// Opens the session with a passage already captured, the way the shell
    /// does when the user confirmed a selection before the panel existed.
    pub fn with_initial_selection(
        config: SessionConfig,
        transport: Arc<dyn ChatTransport>,
        selection: impl Into<String>,
    ) -> Self {
        let greeting = config.selection_greeting.clone();
        Self::build(config, transport, greeting, Some(selection.into()))
    }

    fn build(
        config: SessionConfig,
        transport: Arc<dyn ChatTransport>,
        greeting: String,
        pending_selection: Option<String>,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                state: Mutex::new(SessionState {
                    transcript: vec![Message::assistant(greeting)],
                    conversation_id: None,
                    pending_selection,
                    in_flight: false,
                }),
                generation: AtomicU64::new(0),
                revision,
            }),
        }
    }

    // ── Observable surface ──────────────────────────────────────────────────

    /// Change notifications: the receiver's value advances on every state
    /// mutation. Readers re-pull snapshots when it does.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.state().transcript.clone()
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.state().conversation_id.clone()
    }

    pub fn pending_selection(&self) -> Option<String> {
        self.state().pending_selection.clone()
    }

    pub fn in_flight(&self) -> bool {
        self.state().in_flight
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            transcript: state.transcript.clone(),
            conversation_id: state.conversation_id.clone(),
            pending_selection: state.pending_selection.clone(),
            in_flight: state.in_flight,
        }
    }

    // ── Operations ──────────────────────────────────────────────────────────

    /// Runs one turn: appends the user message (consuming any pending
    /// selection), opens the streaming placeholder, and folds the reply
    /// stream until it finishes, fails, or is superseded.
    ///
    /// Returns `false` without touching any state when the input is empty or
    /// over-long, or when a turn is already in flight.
    pub async fn send(&self, text: &str) -> bool {
        let message = text.trim();
        if message.is_empty() {
            debug!("ignoring empty send");
            return false;
        }
        if message.len() > self.inner.config.max_message_length {
            warn!(length = message.len(), "ignoring over-long send");
            return false;
        }

        let (generation, request) = {
            let mut state = self.state();
            if state.in_flight {
                debug!("ignoring send while a turn is in flight");
                return false;
            }
            let selection = state.pending_selection.take();
            state
                .transcript
                .push(Message::user(message.to_string(), selection.clone()));
            state.transcript.push(Message::assistant_streaming());
            state.in_flight = true;
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let request = ChatStreamRequest {
                conversation_id: state.conversation_id.clone(),
                message: message.to_string(),
                selected_text: selection,
            };
            (generation, request)
        };
        self.notify();

        self.run_turn(generation, request).await;
        true
    }

    /// Discards the transcript, the conversation identity, the pending
    /// selection, and any turn still in flight, then reinstalls a fresh
    /// greeting. Callable at any time.
    pub fn clear(&self) {
        let mut state = self.state();
        // Supersede the in-flight turn before its transcript disappears.
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        state.transcript = vec![Message::assistant(self.inner.config.cleared_greeting.clone())];
        state.conversation_id = None;
        state.pending_selection = None;
        state.in_flight = false;
        drop(state);
        self.notify();
    }

    /// Surfaces a confirmed selection for the preview banner; it rides on the
    /// next accepted send. Ignored while a turn is in flight.
    pub fn attach_selection(&self, text: impl Into<String>) -> bool {
        let mut state = self.state();
        if state.in_flight {
            debug!("ignoring selection while a turn is in flight");
            return false;
        }
        state.pending_selection = Some(text.into());
        drop(state);
        self.notify();
        true
    }

    /// The user dismissed the preview banner.
    pub fn dismiss_selection(&self) {
        let mut state = self.state();
        if state.pending_selection.take().is_some() {
            drop(state);
            self.notify();
        }
    }

    // ── Turn internals ──────────────────────────────────────────────────────

    async fn run_turn(&self, generation: u64, request: ChatStreamRequest) {
        let mut body = match self.inner.transport.open_stream(&request).await {
            Ok(body) => body,
            Err(e) => return self.fail_turn(generation, &e),
        };

        let mut decoder = FrameDecoder::new();
        let mut sources: Option<Vec<Citation>> = None;

        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => return self.fail_turn(generation, &e),
            };
            for event in decoder.feed(&bytes) {
                match self.apply_event(generation, event, &mut sources) {
                    Fold::Continue => {}
                    // Dropping the body releases the connection; anything the
                    // service keeps sending is never read.
                    Fold::Finished => return,
                    Fold::Superseded => {
                        debug!("abandoning stream for a superseded turn");
                        return;
                    }
                }
            }
        }

        decoder.finish();
        // The body dried up without a done frame; the reply is incomplete.
        self.fail_turn(
            generation,
            &TransportError::interrupted("stream ended before completion"),
        );
    }

    /// Folds one event into the open streaming message. The generation is
    /// re-checked under the state lock so a fold from a superseded turn can
    /// never touch the transcript that replaced it.
    fn apply_event(
        &self,
        generation: u64,
        event: ProtocolEvent,
        sources: &mut Option<Vec<Citation>>,
    ) -> Fold {
        let mut state = self.state();
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            return Fold::Superseded;
        }

        match event {
            ProtocolEvent::ConversationId { data } => {
                // First write wins; the id only resets with the session.
                if state.conversation_id.is_none() {
                    state.conversation_id = Some(data);
                    drop(state);
                    self.notify();
                }
            }
            ProtocolEvent::Sources { data } => {
                // Held back until finalization: citations belong to a
                // finished reply, never a streaming one.
                *sources = Some(data);
            }
            ProtocolEvent::Text { data } => {
                if let Some(message) = streaming_message(&mut state) {
                    message.content.push_str(&data);
                    drop(state);
                    self.notify();
                }
            }
            ProtocolEvent::Done => {
                if let Some(message) = streaming_message(&mut state) {
                    message.streaming = false;
                    message.sources = sources.take();
                }
                state.in_flight = false;
                drop(state);
                self.notify();
                return Fold::Finished;
            }
        }
        Fold::Continue
    }

    /// Ends the turn with the fixed failure notice. Partial streamed text is
    /// discarded, not kept: a turn either completes or it visibly failed.
    fn fail_turn(&self, generation: u64, cause: &TransportError) {
        let mut state = self.state();
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            debug!("dropping failure report for a superseded turn: {cause}");
            return;
        }
        error!("chat turn failed: {cause}");
        if let Some(message) = streaming_message(&mut state) {
            message.content = self.inner.config.failure_notice.clone();
            message.streaming = false;
            message.sources = None;
        }
        state.in_flight = false;
        drop(state);
        self.notify();
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }
}

/// The single open streaming message, if any. The transcript holds at most
/// one, always at the tail.
fn streaming_message<'a>(state: &'a mut SessionState) -> Option<&'a mut Message> {
    state.transcript.iter_mut().rev().find(|m| m.streaming)
}
