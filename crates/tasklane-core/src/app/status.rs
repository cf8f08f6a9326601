//! Status - レーンの実行結果

use serde::Serialize;

use crate::domain::ProcessError;
use crate::ports::Position;

/// Per-lane counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LaneStats {
    pub processed: usize,
    pub skipped: usize,
    pub dead_lettered: usize,
}

/// Why a lane stopped.
#[derive(Debug)]
pub enum LaneExit {
    /// The source is closed and every record was acknowledged.
    Drained,

    /// Shutdown was requested.
    Shutdown,

    /// A record failed; it was not acknowledged and the lane stopped on it.
    Halted {
        position: Position,
        error: ProcessError,
    },

    /// Polling or committing failed.
    SourceFailed { error: String },
}

impl LaneExit {
    pub fn is_halted(&self) -> bool {
        matches!(self, LaneExit::Halted { .. } | LaneExit::SourceFailed { .. })
    }
}

#[derive(Debug)]
pub struct LaneReport {
    pub lane: String,
    pub exit: LaneExit,
    pub stats: LaneStats,
}

impl LaneReport {
    /// Short status line for operators.
    pub fn summary(&self) -> String {
        let exit = match &self.exit {
            LaneExit::Drained => "drained".to_string(),
            LaneExit::Shutdown => "shutdown".to_string(),
            LaneExit::Halted { position, error } => {
                format!("halted at {position} ({})", error.kind())
            }
            LaneExit::SourceFailed { error } => format!("source failed: {error}"),
        };
        format!(
            "{}: {exit}, processed={} skipped={} dead_lettered={}",
            self.lane, self.stats.processed, self.stats.skipped, self.stats.dead_lettered
        )
    }
}
