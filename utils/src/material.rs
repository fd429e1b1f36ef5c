use cozy_chess::{Board, Color, Piece};

/// Check if the position has insufficient material for either side to force
/// checkmate.
///
/// Returns true for dead drawn positions:
/// - K vs K
/// - K+N vs K (either side)
/// - K+B vs K (either side)
/// - K+B vs K+B with same-colored bishops
pub fn has_insufficient_material(board: &Board) -> bool {
    let pawns = board.pieces(Piece::Pawn);
    let rooks = board.pieces(Piece::Rook);
    let queens = board.pieces(Piece::Queen);

    if !(pawns | rooks | queens).is_empty() {
        return false;
    }

    let white = board.colors(Color::White);
    let black = board.colors(Color::Black);
    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);

    let white_minors = (white & (knights | bishops)).len();
    let black_minors = (black & (knights | bishops)).len();

    // K vs K
    if white_minors == 0 && black_minors == 0 {
        return true;
    }

    // Single knight or bishop against a bare king
    if white_minors <= 1 && black_minors == 0 {
        return true;
    }
    if black_minors <= 1 && white_minors == 0 {
        return true;
    }

    // K+B vs K+B with both bishops on the same color complex
    if white_minors == 1 && black_minors == 1 {
        let white_bishop = white & bishops;
        let black_bishop = black & bishops;
        if white_bishop.len() == 1 && black_bishop.len() == 1 {
            const LIGHT_SQUARES: u64 = 0x55AA_55AA_55AA_55AA;
            let on_light = |bb: cozy_chess::BitBoard| bb.0 & LIGHT_SQUARES != 0;
            return on_light(white_bishop) == on_light(black_bishop);
        }
    }

    false
}

/// Positions with a bare king against king plus a single piece (or less) are
/// not worth recording; the outcome is already determined by tablebase-like
/// knowledge rather than evaluation.
pub fn enough_material_to_record(board: &Board) -> bool {
    board.occupied().len() > 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_dead_draws() {
        let dead: &[&str] = &[
            "8/8/4k3/8/8/3K4/8/8 w - - 0 1",          // K vs K
            "8/8/4k3/8/8/3KN3/8/8 w - - 0 1",         // K+N vs K
            "8/8/4k3/8/8/3KB3/8/8 b - - 0 1",         // K+B vs K
            "8/2b5/4k3/8/8/3KB3/8/8 w - - 0 1",       // same-colored bishops
        ];
        for fen in dead {
            let board: Board = fen.parse().unwrap();
            assert!(has_insufficient_material(&board), "{fen}");
        }
    }

    #[test]
    fn detects_live_material() {
        let live: &[&str] = &[
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "8/8/4k3/8/8/3KP3/8/8 w - - 0 1",   // pawn can promote
            "8/8/4k3/8/8/3KR3/8/8 w - - 0 1",   // rook mates
            "8/8/4k3/8/8/2NKN3/8/8 w - - 0 1",  // two knights still count
        ];
        for fen in live {
            let board: Board = fen.parse().unwrap();
            assert!(!has_insufficient_material(&board), "{fen}");
        }
    }

    #[test]
    fn material_floor_for_recording() {
        let sparse: Board = "8/8/4k3/8/8/3KB3/8/8 w - - 0 1".parse().unwrap();
        assert!(!enough_material_to_record(&sparse));

        let four_men: Board = "8/8/4k3/8/8/2QKB3/8/8 w - - 0 1".parse().unwrap();
        assert!(enough_material_to_record(&four_men));
    }
}
