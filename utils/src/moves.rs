use cozy_chess::{Board, Move, Piece, Rank, Square};

/// Check whether a move captures material, including en passant.
pub fn is_capture(board: &Board, mv: Move) -> bool {
    let them = board.colors(!board.side_to_move());
    if them.has(mv.to) {
        return true;
    }

    // En passant: a pawn moving diagonally onto an empty square
    if board.piece_on(mv.from) == Some(Piece::Pawn) {
        if let Some(ep_file) = board.en_passant() {
            let ep_rank = match board.side_to_move() {
                cozy_chess::Color::White => Rank::Sixth,
                cozy_chess::Color::Black => Rank::Third,
            };
            return mv.to == Square::new(ep_file, ep_rank) && mv.from.file() != ep_file;
        }
    }

    false
}

/// Check whether a move gives check to the opponent.
pub fn gives_check(board: &Board, mv: Move) -> bool {
    let mut child = board.clone();
    child.play_unchecked(mv);
    !child.checkers().is_empty()
}

/// A quiet move is neither a capture, a promotion, nor a check. Only quiet
/// moves mark stable positions worth labeling.
pub fn is_quiet(board: &Board, mv: Move) -> bool {
    mv.promotion.is_none() && !is_capture(board, mv) && !gives_check(board, mv)
}
