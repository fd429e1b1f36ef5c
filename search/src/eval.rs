use cozy_chess::{Board, Color, Piece, Square};

pub const PIECE_VALUES: [i16; 6] = [100, 320, 330, 500, 900, 0];

/// Small centralization bonus per square, indexed by distance from the
/// board's center files/ranks. Keeps the engine from shuffling on the rim
/// without pretending to be a real evaluation.
const CENTER_BONUS: [i16; 4] = [12, 8, 4, 0];

pub fn piece_value(piece: Piece) -> i16 {
    PIECE_VALUES[piece as usize]
}

fn centralization(square: Square) -> i16 {
    let file = square.file() as i16;
    let rank = square.rank() as i16;
    let file_edge = file.min(7 - file);
    let rank_edge = rank.min(7 - rank);
    CENTER_BONUS[(3 - file_edge.min(rank_edge)) as usize]
}

/// Static evaluation from the side to move's perspective: material plus a
/// centralization nudge for minor pieces and pawns.
pub fn evaluate(board: &Board) -> i16 {
    let mut score = 0i16;

    for &color in &Color::ALL {
        let sign = if color == board.side_to_move() { 1 } else { -1 };
        let ours = board.colors(color);

        for &piece in &Piece::ALL {
            for square in board.pieces(piece) & ours {
                let mut value = piece_value(piece);
                if matches!(piece, Piece::Pawn | Piece::Knight | Piece::Bishop) {
                    value += centralization(square);
                }
                score += sign * value;
            }
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_is_balanced() {
        assert_eq!(evaluate(&Board::default()), 0);
    }

    #[test]
    fn evaluation_is_symmetric_in_side_to_move() {
        let white: Board = "rnbqkbnr/ppp1pppp/8/8/3p4/2N5/PPPPPPPP/R1BQKBNR w KQkq - 0 3"
            .parse()
            .unwrap();
        let black: Board = "rnbqkbnr/ppp1pppp/8/8/3p4/2N5/PPPPPPPP/R1BQKBNR b KQkq - 0 3"
            .parse()
            .unwrap();
        assert_eq!(evaluate(&white), -evaluate(&black));
    }

    #[test]
    fn material_up_means_positive_score() {
        let board: Board = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBN1 b Qkq - 0 1"
            .parse()
            .unwrap();
        // Black to move, White is missing a rook
        assert!(evaluate(&board) > 400);
    }
}
