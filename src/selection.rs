use crate::config::MIN_SELECTION_CHARS;

/// Vertical gap between a selection's top edge and the prompt anchored above it.
const ANCHOR_GAP: f64 = 10.0;

/// Snapshot of the live document selection, as reported by the host shell.
/// The rect is in document coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSelection {
    pub text: String,
    pub rect: BoundingRect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Where to place the transient "ask about this" prompt: horizontally
/// centered on the selection, just above its bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionSignal {
    Available { text: String, anchor: AnchorPoint },
    Cleared,
}

/// Handle onto the host document's selection, injected so the capture logic
/// never touches ambient globals and tests can script gestures.
pub trait SelectionSource {
    /// The current selection, or `None` when collapsed.
    fn current(&self) -> Option<RawSelection>;

    /// Drops the live document selection (the gesture is spent).
    fn clear(&self);
}

/// Classifies selection-change signals and hands confirmed selections to the
/// session exactly once per gesture.
pub struct SelectionCapture<S: SelectionSource> {
    source: S,
    min_chars: usize,
}

impl<S: SelectionSource> SelectionCapture<S> {
    pub fn new(source: S) -> Self {
        Self { source, min_chars: MIN_SELECTION_CHARS }
    }

    pub fn with_min_chars(source: S, min_chars: usize) -> Self {
        Self { source, min_chars }
    }

    /// Call on every selection-change signal from the host document.
    pub fn poll(&self) -> SelectionSignal {
        let Some(selection) = self.source.current() else {
            return SelectionSignal::Cleared;
        };
        let text = selection.text.trim();
        if text.chars().count() < self.min_chars {
            return SelectionSignal::Cleared;
        }
        SelectionSignal::Available {
            text: text.to_string(),
            anchor: anchor_for(selection.rect),
        }
    }

    /// The user confirmed "ask about this": takes the selected text and
    /// clears the live selection, so the same gesture cannot fire again.
    /// Returns `None` when nothing is selected.
    pub fn confirm(&self) -> Option<String> {
        let selection = self.source.current()?;
        let text = selection.text.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.source.clear();
        Some(text)
    }
}

fn anchor_for(rect: BoundingRect) -> AnchorPoint {
    AnchorPoint {
        x: rect.left + rect.width / 2.0,
        y: rect.top - ANCHOR_GAP,
    }
}
