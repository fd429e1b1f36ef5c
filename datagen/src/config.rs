use search::{SearchLimits, MAX_DEPTH};

/// Tunable thresholds for game generation and adjudication.
///
/// Only the relative contracts are fixed (the verification budget is much
/// larger than the steady-state budget, streak lengths are small positive
/// integers); the absolute numbers here are a workable release profile and
/// can be overridden from the CLI.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Depth cap for every search.
    pub max_depth: u8,
    /// Soft node budget for the first search after the opening, used to
    /// reject openings that are already decided.
    pub verification_nodes: u64,
    /// Soft node budget for every later search.
    pub steady_nodes: u64,

    /// Openings whose verification score exceeds this are abandoned.
    pub opening_max_score: i16,
    /// Scores beyond this magnitude feed the win/loss streaks and exclude
    /// the position from recording.
    pub max_eval_filter: i16,
    /// Scores inside this magnitude feed the draw streak.
    pub max_draw_filter: i16,
    /// Scores at or beyond this magnitude end the game immediately.
    pub decisive_score: i16,

    /// Consecutive decisive plies required for win/loss adjudication.
    pub win_streak: u32,
    /// Consecutive level plies required for draw adjudication.
    pub draw_streak: u32,
    /// Draw adjudication only starts past this ply.
    pub draw_min_ply: u16,

    /// Positions before this ply are never recorded.
    pub min_record_ply: u16,
    /// Base number of random opening plies; the actual count cycles
    /// `base + game % 4`.
    pub opening_ply_base: u16,

    /// Optional per-worker game budget; `None` runs until cancelled.
    pub max_games: Option<u64>,
    /// Queue slots per worker thread.
    pub queue_capacity_per_thread: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            verification_nodes: 100_000,
            steady_nodes: 10_000,

            opening_max_score: 900,
            max_eval_filter: 2_000,
            max_draw_filter: 200,
            decisive_score: 20_000,

            win_streak: 6,
            draw_streak: 10,
            draw_min_ply: 80,

            min_record_ply: 16,
            opening_ply_base: 8,

            max_games: None,
            queue_capacity_per_thread: 512,
        }
    }
}

impl GenerationConfig {
    pub fn verification_limits(&self) -> SearchLimits {
        SearchLimits {
            max_depth: self.max_depth,
            ..SearchLimits::nodes(self.verification_nodes)
        }
    }

    pub fn steady_limits(&self) -> SearchLimits {
        SearchLimits {
            max_depth: self.max_depth,
            ..SearchLimits::nodes(self.steady_nodes)
        }
    }
}
