mod eval;
mod negamax;

use cozy_chess::{Board, Move};

pub use negamax::AlphaBetaEngine;

/// Maximum search depth supported by the engine.
pub const MAX_DEPTH: u8 = 64;

/// Score for a mate at the root; mates further down the tree score closer
/// to zero by their distance in plies.
pub const MATE: i16 = 30_000;

/// Node and depth budgets for one search call.
///
/// The soft limit is checked between iterative-deepening iterations, the
/// hard limit inside the tree. Callers that want a stronger "verification"
/// search simply pass larger budgets.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_depth: u8,
    pub soft_nodes: u64,
    pub hard_nodes: u64,
}

impl SearchLimits {
    pub fn nodes(soft_nodes: u64) -> Self {
        Self {
            max_depth: MAX_DEPTH,
            soft_nodes,
            hard_nodes: soft_nodes.saturating_mul(4),
        }
    }
}

/// Result of a completed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchReport {
    /// Best move found for the side to move.
    pub best_move: Move,
    /// Score in centipawns, from the side to move's perspective.
    pub score: i16,
}

/// A search backend usable by the self-play workers.
///
/// Implementations may make and unmake moves on the given board, but must
/// leave it exactly as it was handed in; callers verify this by hash.
/// Returns `None` only when the position has no legal moves.
pub trait Engine {
    /// Reset per-game state (caches, heuristics) between games.
    fn new_game(&mut self);

    fn search(&mut self, board: &mut Board, limits: &SearchLimits) -> Option<SearchReport>;
}
