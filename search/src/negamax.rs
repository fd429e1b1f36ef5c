use cozy_chess::{Board, GameStatus, Move};

use crate::eval::{evaluate, piece_value};
use crate::{Engine, SearchLimits, SearchReport, MATE};

const INFINITY: i16 = 32_000;

/// Plain fixed-depth negamax with alpha-beta, MVV-LVA move ordering and a
/// capture-only quiescence search. No transposition table: every search is
/// self-contained, which keeps the board handed in by the caller untouched.
#[derive(Default)]
pub struct AlphaBetaEngine {
    nodes: u64,
    hard_nodes: u64,
    aborted: bool,
}

impl AlphaBetaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn search_root(&mut self, board: &Board, depth: u8) -> Option<(Move, i16)> {
        let mut alpha = -INFINITY;
        let mut best = None;

        for mv in ordered_moves(board) {
            let mut child = board.clone();
            child.play_unchecked(mv);

            let score = -self.negamax(&child, depth.saturating_sub(1), 1, -INFINITY, -alpha);
            if self.aborted {
                break;
            }

            if score > alpha || best.is_none() {
                alpha = score;
                best = Some((mv, score));
            }
        }

        best
    }

    fn negamax(&mut self, board: &Board, depth: u8, ply: u8, mut alpha: i16, beta: i16) -> i16 {
        self.nodes += 1;
        if self.nodes >= self.hard_nodes {
            self.aborted = true;
            return 0;
        }

        match board.status() {
            GameStatus::Won => return -MATE + ply as i16,
            GameStatus::Drawn => return 0,
            GameStatus::Ongoing => {}
        }

        if depth == 0 {
            return self.quiesce(board, ply, alpha, beta);
        }

        let mut best = -INFINITY;
        for mv in ordered_moves(board) {
            let mut child = board.clone();
            child.play_unchecked(mv);

            let score = -self.negamax(&child, depth - 1, ply + 1, -beta, -alpha);
            if self.aborted {
                return 0;
            }

            best = best.max(score);
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }

        best
    }

    fn quiesce(&mut self, board: &Board, ply: u8, mut alpha: i16, beta: i16) -> i16 {
        self.nodes += 1;
        if self.nodes >= self.hard_nodes {
            self.aborted = true;
            return 0;
        }

        match board.status() {
            GameStatus::Won => return -MATE + ply as i16,
            GameStatus::Drawn => return 0,
            GameStatus::Ongoing => {}
        }

        let stand_pat = evaluate(board);
        if stand_pat >= beta {
            return stand_pat;
        }
        alpha = alpha.max(stand_pat);

        let mut best = stand_pat;
        for mv in ordered_captures(board) {
            let mut child = board.clone();
            child.play_unchecked(mv);

            let score = -self.quiesce(&child, ply + 1, -beta, -alpha);
            if self.aborted {
                return 0;
            }

            best = best.max(score);
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }

        best
    }
}

impl Engine for AlphaBetaEngine {
    fn new_game(&mut self) {
        self.nodes = 0;
        self.aborted = false;
    }

    fn search(&mut self, board: &mut Board, limits: &SearchLimits) -> Option<SearchReport> {
        self.nodes = 0;
        self.hard_nodes = limits.hard_nodes.max(1);

        let root = board.clone();
        let mut report = None;

        for depth in 1..=limits.max_depth {
            self.aborted = false;
            let result = self.search_root(&root, depth);

            if self.aborted {
                // Keep the last fully searched iteration
                break;
            }
            if let Some((best_move, score)) = result {
                report = Some(SearchReport { best_move, score });
            } else {
                // No legal moves: nothing deeper to find either
                break;
            }
            if self.nodes >= limits.soft_nodes {
                break;
            }
        }

        report
    }
}

/// All legal moves, captures first, captures ordered most-valuable-victim.
fn ordered_moves(board: &Board) -> Vec<Move> {
    let mut moves: Vec<Move> = Vec::with_capacity(64);
    board.generate_moves(|batch| {
        moves.extend(batch);
        false
    });

    let them = board.colors(!board.side_to_move());
    moves.sort_by_key(|mv| {
        match board.piece_on(mv.to).filter(|_| them.has(mv.to)) {
            Some(victim) => -piece_value(victim),
            None => 1,
        }
    });

    moves
}

fn ordered_captures(board: &Board) -> Vec<Move> {
    let them = board.colors(!board.side_to_move());
    let mut moves: Vec<Move> = Vec::with_capacity(16);
    board.generate_moves(|batch| {
        moves.extend(batch.into_iter().filter(|mv| them.has(mv.to)));
        false
    });

    moves.sort_by_key(|mv| match board.piece_on(mv.to) {
        Some(victim) => -piece_value(victim),
        None => 0,
    });

    moves
}
