//! Per-formula "warn each distinct condition once" bookkeeping.
//!
//! The source tracks this with a single process-wide singleton (a
//! `warned_free` set). That global is reframed here as a set owned by
//! the formula/parser value being built, so its lifetime is bounded by the
//! formula's rather than the process's.

use crate::reader::Position;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub(crate) struct WarnOnce {
    seen: HashSet<(u32, u32, &'static str)>,
}

impl WarnOnce {
    /// Emits `tracing::warn!` for `(position, kind)` the first time it is
    /// seen, unless `silent`. Subsequent calls with the same `(position,
    /// kind)` pair are suppressed even when not silent.
    pub(crate) fn warn_once(
        &mut self,
        silent: bool,
        position: Position,
        kind: &'static str,
        message: impl std::fmt::Display,
    ) {
        if silent {
            return;
        }
        if self.seen.insert((position.line, position.column, kind)) {
            tracing::warn!(line = position.line, column = position.column, kind, %message);
        }
    }
}
