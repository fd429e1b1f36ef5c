use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use cozy_chess::{Board, Color, GameStatus, Move};
use search::{Engine, SearchReport};
use utils::{
    enough_material_to_record, has_insufficient_material, is_quiet, random_opening, recompute_hash,
};

use crate::config::GenerationConfig;
use crate::error::DatagenError;
use crate::queue::RecordQueue;
use crate::record::{TrainingRecord, Wdl};

/// How a self-play game concluded. `Incomplete` games (corruption or a
/// rejected opening) contribute no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    WhiteWin,
    Draw,
    BlackWin,
    Incomplete,
}

impl GameOutcome {
    fn to_wdl(self) -> Option<Wdl> {
        match self {
            GameOutcome::WhiteWin => Some(Wdl::Win),
            GameOutcome::Draw => Some(Wdl::Draw),
            GameOutcome::BlackWin => Some(Wdl::Loss),
            GameOutcome::Incomplete => None,
        }
    }
}

/// Per-game state: the board, adjudication streaks, repetition tracking and
/// the buffer of provisional records. Thrown away when the game ends.
struct GameSession {
    board: Board,
    ply: u16,
    win_plies: u32,
    loss_plies: u32,
    draw_plies: u32,
    seen: AHashMap<u64, u32>,
    buffer: Vec<TrainingRecord>,
}

impl GameSession {
    fn new(board: Board, ply: u16) -> Self {
        Self {
            board,
            ply,
            win_plies: 0,
            loss_plies: 0,
            draw_plies: 0,
            seen: AHashMap::new(),
            buffer: Vec::new(),
        }
    }

    /// Check the chess rules' own endings plus the shortcuts that make
    /// self-play terminate: insufficient material and first repetition,
    /// both labeled as draws.
    fn terminal_outcome(&mut self) -> Option<GameOutcome> {
        match self.board.status() {
            GameStatus::Won => Some(match self.board.side_to_move() {
                // The side to move is the one that got mated
                Color::White => GameOutcome::BlackWin,
                Color::Black => GameOutcome::WhiteWin,
            }),
            GameStatus::Drawn => Some(GameOutcome::Draw),
            GameStatus::Ongoing => {
                if has_insufficient_material(&self.board) {
                    return Some(GameOutcome::Draw);
                }

                let visits = self.seen.entry(self.board.hash()).or_insert(0);
                *visits += 1;
                (*visits >= 2).then_some(GameOutcome::Draw)
            }
        }
    }

    /// Update the consecutive-ply streaks with this ply's White-relative
    /// score and adjudicate if any trigger fires. Decisive scores end the
    /// game on the spot.
    fn adjudicate(&mut self, white_score: i16, config: &GenerationConfig) -> Option<GameOutcome> {
        if white_score >= config.decisive_score {
            return Some(GameOutcome::WhiteWin);
        }
        if white_score <= -config.decisive_score {
            return Some(GameOutcome::BlackWin);
        }

        if white_score > config.max_eval_filter {
            self.win_plies += 1;
        } else {
            self.win_plies = 0;
        }
        if white_score < -config.max_eval_filter {
            self.loss_plies += 1;
        } else {
            self.loss_plies = 0;
        }
        if self.ply > config.draw_min_ply && white_score.abs() < config.max_draw_filter {
            self.draw_plies += 1;
        } else {
            self.draw_plies = 0;
        }

        if self.win_plies >= config.win_streak {
            return Some(GameOutcome::WhiteWin);
        }
        if self.loss_plies >= config.win_streak {
            return Some(GameOutcome::BlackWin);
        }
        if self.draw_plies >= config.draw_streak {
            return Some(GameOutcome::Draw);
        }

        None
    }

    fn play(&mut self, mv: Move) {
        self.board.play(mv);
        self.ply += 1;
    }
}

struct GameReport {
    outcome: GameOutcome,
    final_ply: u16,
    records: Vec<TrainingRecord>,
}

/// One self-play worker. Owns its own engine and board; the only state it
/// shares are the record queue and the accepted-position counter.
pub struct GenerationWorker<E: Engine> {
    id: usize,
    engine: E,
    queue: Arc<RecordQueue>,
    positions: Arc<AtomicU64>,
    config: GenerationConfig,
    games_played: u64,
}

impl<E: Engine> GenerationWorker<E> {
    pub fn new(
        id: usize,
        engine: E,
        queue: Arc<RecordQueue>,
        positions: Arc<AtomicU64>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            id,
            engine,
            queue,
            positions,
            config,
            games_played: 0,
        }
    }

    /// Play games until cancelled or the game budget runs out. The stop
    /// flag is only checked between games; a game in progress always runs
    /// to adjudication or self-abandonment.
    pub fn run(mut self, stop: &AtomicBool) -> Result<(), DatagenError> {
        while !stop.load(Ordering::Relaxed) {
            if let Some(budget) = self.config.max_games {
                if self.games_played >= budget {
                    break;
                }
            }

            let report = self.play_game()?;
            match report.outcome.to_wdl() {
                Some(result) => self.flush_game(report.records, report.final_ply, result)?,
                None => log::debug!("[{}] game {} abandoned", self.id, self.games_played),
            }

            self.games_played += 1;
            self.engine.new_game();
        }

        Ok(())
    }

    fn play_game(&mut self) -> Result<GameReport, DatagenError> {
        // Cycle the opening depth so successive games start from different
        // phases of the opening.
        let opening_plies = self.config.opening_ply_base as usize + (self.games_played % 4) as usize;
        let board = random_opening(&mut rand::thread_rng(), opening_plies);

        match recompute_hash(&board) {
            Some(recomputed) if recomputed == board.hash() => {}
            other => {
                return Err(DatagenError::HashIntegrity {
                    incremental: board.hash(),
                    recomputed: other.unwrap_or(0),
                    fen: board.to_string(),
                })
            }
        }

        let mut session = GameSession::new(board, opening_plies as u16);
        let mut first_search = true;

        let outcome = loop {
            if let Some(outcome) = session.terminal_outcome() {
                break outcome;
            }

            let limits = if first_search {
                // A deeper look at the opening, to throw away lines that
                // are already lost or won before they pollute the data.
                self.config.verification_limits()
            } else {
                self.config.steady_limits()
            };

            let before = session.board.hash();
            let report = self.engine.search(&mut session.board, &limits);

            if session.board.hash() != before {
                log::warn!(
                    "[{}] search did not restore the board at ply {}, abandoning game",
                    self.id,
                    session.ply
                );
                break GameOutcome::Incomplete;
            }

            let Some(SearchReport { best_move, score }) = report else {
                // terminal_outcome() above rules this out for a healthy engine
                log::warn!("[{}] search returned no move at ply {}", self.id, session.ply);
                break GameOutcome::Incomplete;
            };

            // Stored evaluations are always from White's perspective.
            let white_score = match session.board.side_to_move() {
                Color::White => score,
                Color::Black => -score,
            };

            if first_search {
                first_search = false;
                if white_score.unsigned_abs() > self.config.opening_max_score as u16 {
                    log::debug!(
                        "[{}] opening already decided ({:+}), abandoning game",
                        self.id,
                        white_score
                    );
                    break GameOutcome::Incomplete;
                }
            }

            if let Some(outcome) = session.adjudicate(white_score, &self.config) {
                break outcome;
            }

            if self.should_record(&session, best_move, white_score) {
                let record =
                    TrainingRecord::encode(&session.board, session.ply, 0, white_score, Wdl::Draw)?;
                if !self.verify_record(&record, &session.board) {
                    break GameOutcome::Incomplete;
                }
                session.buffer.push(record);
            }

            session.play(best_move);
        };

        Ok(GameReport {
            outcome,
            final_ply: session.ply,
            records: session.buffer,
        })
    }

    /// A position is a candidate only when it is stable: the chosen move is
    /// quiet, the side to move is not in check, the game is out of the
    /// opening, the score is inside the eval filter and enough material
    /// remains for the evaluation to mean anything.
    fn should_record(&self, session: &GameSession, mv: Move, white_score: i16) -> bool {
        session.ply >= self.config.min_record_ply
            && white_score.unsigned_abs() < self.config.max_eval_filter as u16
            && session.board.checkers().is_empty()
            && enough_material_to_record(&session.board)
            && is_quiet(&session.board, mv)
    }

    /// Round-trip self-check: decoding the record must reproduce the board
    /// bit for bit, verified through the zobrist hash.
    fn verify_record(&self, record: &TrainingRecord, board: &Board) -> bool {
        match record.to_board() {
            Ok(decoded) if decoded.hash() == record.hash() && record.hash() == board.hash() => true,
            _ => {
                log::warn!(
                    "[{}] record failed its round-trip self-check ({}), abandoning game",
                    self.id,
                    board
                );
                false
            }
        }
    }

    /// Backfill the buffered records with the final ply count and result,
    /// drop the ones whose evaluation disagrees with the outcome, and hand
    /// the rest to the queue as one batch.
    fn flush_game(
        &mut self,
        mut records: Vec<TrainingRecord>,
        final_ply: u16,
        result: Wdl,
    ) -> Result<(), DatagenError> {
        for record in records.iter_mut() {
            let keep = labels_consistent(record.eval(), result, &self.config);
            record.finalize(final_ply, result, keep);
        }

        let accepted = self
            .queue
            .push_batch(records.into_iter().filter(|r| !r.filtered()))?;
        self.positions.fetch_add(accepted, Ordering::Relaxed);

        log::debug!(
            "[{}] game {} finished as {:?} with {} records",
            self.id,
            self.games_played,
            result,
            accepted
        );

        Ok(())
    }
}

/// Keep only records whose evaluation is broadly consistent with the game's
/// eventual outcome: a won game should not contribute positions the engine
/// already scored as losing, and a drawn game should not contribute
/// positions scored as decisive.
fn labels_consistent(eval: i16, result: Wdl, config: &GenerationConfig) -> bool {
    match result {
        Wdl::Win => eval >= -config.max_draw_filter,
        Wdl::Loss => eval <= config.max_draw_filter,
        Wdl::Draw => eval.abs() <= config.max_eval_filter / 2,
    }
}
