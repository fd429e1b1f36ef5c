use cozy_chess::Board;

/// Recompute a board's zobrist hash from scratch by rebuilding the position
/// from its FEN description.
///
/// The incrementally maintained hash and this recomputation must always
/// agree; a divergence means the board state itself is corrupt.
pub fn recompute_hash(board: &Board) -> Option<u64> {
    Board::from_fen(&board.to_string(), false)
        .ok()
        .map(|rebuilt| rebuilt.hash())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recomputed_hash_matches_incremental() {
        let mut board = Board::default();
        assert_eq!(recompute_hash(&board), Some(board.hash()));

        for mv in ["e2e4", "c7c5", "g1f3", "d7d6"] {
            board.play(mv.parse().unwrap());
            assert_eq!(recompute_hash(&board), Some(board.hash()));
        }
    }
}
