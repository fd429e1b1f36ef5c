use cozy_chess::{Board, GameStatus, Move};
use rand::Rng;

/// Walk a random line of legal moves from the start position.
///
/// Lines that run into a finished game before reaching the requested ply
/// count are thrown away and re-rolled, so the returned board always has at
/// least one legal move.
pub fn random_opening(rng: &mut impl Rng, plies: usize) -> Board {
    'retry: loop {
        let mut board = Board::default();

        for _ in 0..plies {
            if board.status() != GameStatus::Ongoing {
                continue 'retry;
            }

            let mut moves: Vec<Move> = Vec::with_capacity(64);
            board.generate_moves(|batch| {
                moves.extend(batch);
                false
            });
            board.play(moves[rng.gen_range(0..moves.len())]);
        }

        if board.status() == GameStatus::Ongoing {
            return board;
        }
    }
}
