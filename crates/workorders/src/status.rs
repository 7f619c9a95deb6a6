//! Work-order status model.
//!
//! Statuses arrive as free text and several historical spellings denote the
//! terminal state. Classification is centralized here; no other module may
//! carry its own vocabulary list.

/// Every spelling that denotes a finished (terminal) work order, lowercase.
const FINISHED_VOCABULARY: [&str; 5] = [
    "finalizado",
    "finalizada",
    "fechada",
    "concluida",
    "concluída",
];

/// Closed two-variant status domain.
///
/// The raw spelling stays on the work order for round-tripping; this type is
/// the single authority on what that spelling *means*.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Open,
    Finished,
}

impl StatusKind {
    /// Classify a raw status string, case-insensitively.
    ///
    /// Anything outside the finished vocabulary counts as open; the original
    /// system never validated status spellings on the open side.
    pub fn classify(raw: &str) -> Self {
        let folded = raw.trim().to_lowercase();
        if FINISHED_VOCABULARY.contains(&folded.as_str()) {
            StatusKind::Finished
        } else {
            StatusKind::Open
        }
    }

    pub fn is_finished(self) -> bool {
        self == StatusKind::Finished
    }
}

/// Convenience wrapper over [`StatusKind::classify`].
pub fn is_finished(raw: &str) -> bool {
    StatusKind::classify(raw).is_finished()
}
