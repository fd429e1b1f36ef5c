use std::cmp::Ordering;

use cozy_chess::{BitBoard, Board, BoardBuilder, CastleRights, Color, File, Piece, Rank, Square};
use thiserror::Error;

/// Size of one serialized record on disk. The output file is a flat,
/// unframed sequence of these; readers consume 42 bytes at a time until EOF.
pub const RECORD_SIZE: usize = 42;

/// Maximum storable ply value; the packed field is 10 bits wide.
const PLY_MAX: u16 = 0x3FF;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("a record holds at most 32 piece codes")]
    TooManyPieces,
    #[error("truncated record: got {0} bytes, need 42")]
    Truncated(usize),
    #[error("invalid piece code {0:#x}")]
    InvalidPieceCode(u8),
    #[error("record does not describe a valid position: {0:?}")]
    InvalidPosition(cozy_chess::BoardBuilderError),
}

/// Game outcome label, from White's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wdl {
    Loss,
    Draw,
    Win,
}

impl Wdl {
    fn to_bits(self) -> u32 {
        match self {
            Wdl::Loss => 0,
            Wdl::Draw => 1,
            Wdl::Win => 2,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Wdl::Loss,
            1 => Wdl::Draw,
            _ => Wdl::Win,
        }
    }
}

/// 32 piece codes packed two per byte: low nibble for even indices, high
/// nibble for odd. A code is `color << 3 | piece`, consumed in ascending
/// occupancy-bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PieceNibbles([u8; 16]);

impl PieceNibbles {
    pub fn pack(codes: impl IntoIterator<Item = u8>) -> Result<Self, RecordError> {
        let mut nibbles = Self::default();
        let mut index = 0;
        for code in codes {
            if index == 32 {
                return Err(RecordError::TooManyPieces);
            }
            nibbles.set(index, code);
            index += 1;
        }
        Ok(nibbles)
    }

    pub fn get(&self, index: usize) -> u8 {
        let byte = self.0[index / 2];
        if index % 2 == 0 {
            byte & 0x0F
        } else {
            byte >> 4
        }
    }

    fn set(&mut self, index: usize, code: u8) {
        let byte = &mut self.0[index / 2];
        if index % 2 == 0 {
            *byte = (*byte & 0xF0) | (code & 0x0F);
        } else {
            *byte = (*byte & 0x0F) | (code << 4);
        }
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// One labeled training position: a complete board snapshot plus its
/// White-relative evaluation and the outcome of the game it came from.
///
/// Records are constructed mid-game with provisional result/max-ply values
/// and mutated in place by [`TrainingRecord::finalize`] once the game ends;
/// after that they are immutable through serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingRecord {
    hash: u64,
    occupancy: u64,
    pieces: PieceNibbles,
    bits: u32,
    eval: i16,
    move_counter: u16,
    half_move_clock: u8,
    extra: u8,
}

impl TrainingRecord {
    /// Snapshot a board into a record. `eval` must already be normalized to
    /// White's perspective.
    pub fn encode(
        board: &Board,
        ply: u16,
        max_ply: u16,
        eval: i16,
        result: Wdl,
    ) -> Result<Self, RecordError> {
        let occupancy = board.occupied();

        let codes = occupancy.into_iter().map(|square| {
            // piece_on/color_on are Some for every occupied square
            let piece = board.piece_on(square).unwrap_or(Piece::Pawn);
            let color = board.color_on(square).unwrap_or(Color::White);
            ((color as u8) << 3) | piece as u8
        });
        let pieces = PieceNibbles::pack(codes)?;

        let mut bits = 0u32;
        bits |= u32::from(ply.min(PLY_MAX));
        bits |= u32::from(max_ply.min(PLY_MAX)) << 10;
        bits |= u32::from(castling_mask(board)) << 20;
        bits |= board.en_passant().map_or(0, |file| file as u32 + 1) << 24;
        bits |= result.to_bits() << 28;
        bits |= u32::from(board.side_to_move() == Color::Black) << 30;

        Ok(Self {
            hash: board.hash(),
            occupancy: occupancy.0,
            pieces,
            bits,
            eval,
            move_counter: board.fullmove_number(),
            half_move_clock: board.halfmove_clock(),
            extra: 0,
        })
    }

    /// Backfill the fields only known once the owning game has finished.
    /// `keep` clears or sets the filter flag; filtered records must not be
    /// persisted.
    pub fn finalize(&mut self, max_ply: u16, result: Wdl, keep: bool) {
        self.bits = (self.bits & !((PLY_MAX as u32) << 10) & !(0b11 << 28) & !(1 << 31))
            | u32::from(max_ply.min(PLY_MAX)) << 10
            | result.to_bits() << 28
            | u32::from(!keep) << 31;
    }

    /// Rebuild the board this record was encoded from. Decoding walks the
    /// occupancy bits in the same ascending order the encoder used.
    pub fn to_board(&self) -> Result<Board, RecordError> {
        let mut builder = BoardBuilder::empty();

        let mut index = 0;
        for square in BitBoard(self.occupancy) {
            let code = self.pieces.get(index);
            index += 1;

            let piece = match code & 0x7 {
                0 => Piece::Pawn,
                1 => Piece::Knight,
                2 => Piece::Bishop,
                3 => Piece::Rook,
                4 => Piece::Queen,
                5 => Piece::King,
                _ => return Err(RecordError::InvalidPieceCode(code)),
            };
            let color = if code & 0x8 != 0 {
                Color::Black
            } else {
                Color::White
            };
            builder.board[square as usize] = Some((piece, color));
        }

        builder.side_to_move = self.side_to_move();

        let mask = self.castling_mask();
        builder.castle_rights[Color::White as usize] = CastleRights {
            short: (mask & 1 != 0).then_some(File::H),
            long: (mask & 2 != 0).then_some(File::A),
        };
        builder.castle_rights[Color::Black as usize] = CastleRights {
            short: (mask & 4 != 0).then_some(File::H),
            long: (mask & 8 != 0).then_some(File::A),
        };

        builder.en_passant = self
            .en_passant_file()
            .map(|file| Square::new(file, Rank::Third.relative_to(!self.side_to_move())));
        builder.halfmove_clock = self.half_move_clock;
        builder.fullmove_number = self.move_counter;

        builder.build().map_err(RecordError::InvalidPosition)
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..8].copy_from_slice(&self.hash.to_le_bytes());
        buf[8..16].copy_from_slice(&self.occupancy.to_le_bytes());
        buf[16..32].copy_from_slice(self.pieces.as_bytes());
        buf[32..36].copy_from_slice(&self.bits.to_le_bytes());
        buf[36..38].copy_from_slice(&self.eval.to_le_bytes());
        buf[38..40].copy_from_slice(&self.move_counter.to_le_bytes());
        buf[40] = self.half_move_clock;
        buf[41] = self.extra;
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() < RECORD_SIZE {
            return Err(RecordError::Truncated(bytes.len()));
        }

        let mut pieces = [0u8; 16];
        pieces.copy_from_slice(&bytes[16..32]);

        Ok(Self {
            hash: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            occupancy: u64::from_le_bytes(bytes[8..16].try_into().unwrap()),
            pieces: PieceNibbles(pieces),
            bits: u32::from_le_bytes(bytes[32..36].try_into().unwrap()),
            eval: i16::from_le_bytes(bytes[36..38].try_into().unwrap()),
            move_counter: u16::from_le_bytes(bytes[38..40].try_into().unwrap()),
            half_move_clock: bytes[40],
            extra: bytes[41],
        })
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn eval(&self) -> i16 {
        self.eval
    }

    pub fn ply(&self) -> u16 {
        (self.bits & u32::from(PLY_MAX)) as u16
    }

    pub fn max_ply(&self) -> u16 {
        ((self.bits >> 10) & u32::from(PLY_MAX)) as u16
    }

    fn castling_mask(&self) -> u8 {
        ((self.bits >> 20) & 0xF) as u8
    }

    pub fn en_passant_file(&self) -> Option<File> {
        match (self.bits >> 24) & 0xF {
            0 => None,
            biased => Some(File::ALL[(biased - 1) as usize]),
        }
    }

    pub fn result(&self) -> Wdl {
        Wdl::from_bits((self.bits >> 28) & 0b11)
    }

    pub fn side_to_move(&self) -> Color {
        if self.bits & (1 << 30) != 0 {
            Color::Black
        } else {
            Color::White
        }
    }

    /// Records flagged here were judged inconsistent at finalize time and
    /// must be dropped before persisting.
    pub fn filtered(&self) -> bool {
        self.bits & (1 << 31) != 0
    }
}

/// KQkq-style rights: White short = 1, White long = 2, Black short = 4,
/// Black long = 8.
fn castling_mask(board: &Board) -> u8 {
    let white = board.castle_rights(Color::White);
    let black = board.castle_rights(Color::Black);

    u8::from(white.short.is_some())
        | u8::from(white.long.is_some()) << 1
        | u8::from(black.short.is_some()) << 2
        | u8::from(black.long.is_some()) << 3
}

/// Deterministic total order for deduplication and reproducible tests:
/// hash, then occupancy, then side to move, then piece bytes, falling
/// through to the remaining fields so the order agrees with `Eq`.
impl Ord for TrainingRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash
            .cmp(&other.hash)
            .then_with(|| self.occupancy.cmp(&other.occupancy))
            .then_with(|| (self.side_to_move() as u8).cmp(&(other.side_to_move() as u8)))
            .then_with(|| self.pieces.0.cmp(&other.pieces.0))
            .then_with(|| self.bits.cmp(&other.bits))
            .then_with(|| self.eval.cmp(&other.eval))
            .then_with(|| self.move_counter.cmp(&other.move_counter))
            .then_with(|| self.half_move_clock.cmp(&other.half_move_clock))
            .then_with(|| self.extra.cmp(&other.extra))
    }
}

impl PartialOrd for TrainingRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Positions spanning 2..32 men, castling subsets, en passant and both
    // sides to move.
    const TEST_POSITIONS: &[&str] = &[
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        "r1bq1rk1/pp2ppbp/2np1np1/8/2BNP3/2N1BP2/PPPQ2PP/R3K2R b KQ - 4 9",
        "4rrk1/pp3pp1/7p/2p1q3/8/P1P1R3/1P3PPP/3QR1K1 b - - 3 22",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 7 39",
        "8/8/4k3/8/8/3K4/8/8 w - - 20 60",
        "8/8/4k3/8/4P3/3K4/8/8 b - - 0 51",
    ];

    fn encode(board: &Board) -> TrainingRecord {
        TrainingRecord::encode(board, 40, 120, -35, Wdl::Draw).unwrap()
    }

    #[test]
    fn board_round_trip_preserves_hash() {
        for fen in TEST_POSITIONS {
            let board: Board = fen.parse().unwrap();
            let record = encode(&board);
            let decoded = record.to_board().unwrap();

            assert_eq!(decoded.hash(), board.hash(), "{fen}");
            assert_eq!(decoded.hash(), record.hash(), "{fen}");
            assert_eq!(decoded.side_to_move(), board.side_to_move(), "{fen}");
            assert_eq!(decoded.halfmove_clock(), board.halfmove_clock(), "{fen}");
            assert_eq!(decoded.fullmove_number(), board.fullmove_number(), "{fen}");
        }
    }

    #[test]
    fn byte_round_trip_is_identity() {
        for fen in TEST_POSITIONS {
            let board: Board = fen.parse().unwrap();
            let record = encode(&board);

            let bytes = record.to_bytes();
            assert_eq!(bytes.len(), RECORD_SIZE);
            assert_eq!(TrainingRecord::from_bytes(&bytes).unwrap(), record, "{fen}");
        }
    }

    #[test]
    fn truncated_input_is_rejected() {
        let board = Board::default();
        let bytes = encode(&board).to_bytes();

        for len in [0, 1, 16, 41] {
            let err = TrainingRecord::from_bytes(&bytes[..len]).unwrap_err();
            assert!(matches!(err, RecordError::Truncated(l) if l == len));
        }
    }

    #[test]
    fn ply_values_clamp_to_the_field_width() {
        let board = Board::default();
        for raw in [0u16, 1, 512, 1023, 1024, 1500, 2000] {
            let record = TrainingRecord::encode(&board, raw, raw, 0, Wdl::Draw).unwrap();
            let clamped = raw.min(1023);
            assert_eq!(record.ply(), clamped);
            assert_eq!(record.max_ply(), clamped);

            // Clamping is idempotent: re-encoding the stored value changes nothing
            let again =
                TrainingRecord::encode(&board, record.ply(), record.max_ply(), 0, Wdl::Draw)
                    .unwrap();
            assert_eq!(again.ply(), clamped);
            assert_eq!(again.max_ply(), clamped);
        }
    }

    #[test]
    fn packed_metadata_round_trips() {
        let board = Board::default();

        for result in [Wdl::Loss, Wdl::Draw, Wdl::Win] {
            let mut record = TrainingRecord::encode(&board, 10, 0, 0, result).unwrap();
            assert_eq!(record.result(), result);

            for keep in [true, false] {
                record.finalize(200, result, keep);
                assert_eq!(record.result(), result);
                assert_eq!(record.max_ply(), 200);
                assert_eq!(record.ply(), 10);
                assert_eq!(record.filtered(), !keep);
            }
        }
    }

    #[test]
    fn castling_masks_follow_the_rights() {
        let cases: &[(&str, u8)] = &[
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 0b1111),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w Qk - 0 1", 0b0110),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w K - 0 1", 0b0001),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w q - 0 1", 0b1000),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1", 0b0000),
        ];

        for &(fen, mask) in cases {
            let board: Board = fen.parse().unwrap();
            let record = encode(&board);
            assert_eq!(record.castling_mask(), mask, "{fen}");
            assert_eq!(record.to_board().unwrap().hash(), board.hash(), "{fen}");
        }
    }

    #[test]
    fn en_passant_file_is_biased_by_one() {
        let board: Board = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3"
            .parse()
            .unwrap();
        let record = encode(&board);
        assert_eq!(record.en_passant_file(), Some(File::F));
        assert_eq!(record.to_bytes()[35] & 0x0F, File::F as u8 + 1);

        let no_ep = encode(&Board::default());
        assert_eq!(no_ep.en_passant_file(), None);
    }

    #[test]
    fn packed_field_accessors_cover_every_value() {
        let template = encode(&Board::default()).to_bytes();

        for mask in 0u32..16 {
            for ep in 0u32..9 {
                let mut bytes = template;
                let bits = u32::from_le_bytes(bytes[32..36].try_into().unwrap());
                let bits = (bits & !(0xFF << 20)) | mask << 20 | ep << 24;
                bytes[32..36].copy_from_slice(&bits.to_le_bytes());

                let record = TrainingRecord::from_bytes(&bytes).unwrap();
                assert_eq!(record.castling_mask(), mask as u8);
                match ep {
                    0 => assert_eq!(record.en_passant_file(), None),
                    f => assert_eq!(record.en_passant_file(), Some(File::ALL[(f - 1) as usize])),
                }
            }
        }
    }

    #[test]
    fn nibble_packing_bounds() {
        assert!(PieceNibbles::pack((0..32).map(|i| (i % 12) as u8)).is_ok());
        assert!(matches!(
            PieceNibbles::pack((0..33).map(|_| 0u8)),
            Err(RecordError::TooManyPieces)
        ));

        let nibbles = PieceNibbles::pack([0x1, 0xE, 0x5]).unwrap();
        assert_eq!(nibbles.get(0), 0x1);
        assert_eq!(nibbles.get(1), 0xE);
        assert_eq!(nibbles.get(2), 0x5);
        assert_eq!(nibbles.as_bytes()[0], 0xE1);
        assert_eq!(nibbles.as_bytes()[1], 0x05);
    }

    #[test]
    fn invalid_piece_codes_fail_decoding() {
        let board = Board::default();
        let mut bytes = encode(&board).to_bytes();
        bytes[16] = 0x77; // piece type 7 does not exist

        let record = TrainingRecord::from_bytes(&bytes).unwrap();
        assert!(matches!(
            record.to_board(),
            Err(RecordError::InvalidPieceCode(_))
        ));
    }

    #[test]
    fn ordering_is_deterministic() {
        let mut records: Vec<TrainingRecord> = TEST_POSITIONS
            .iter()
            .map(|fen| encode(&fen.parse().unwrap()))
            .collect();

        let mut shuffled = records.clone();
        shuffled.reverse();

        records.sort();
        shuffled.sort();
        assert_eq!(records, shuffled);

        // Primary key is the hash
        for pair in records.windows(2) {
            assert!(pair[0].hash() <= pair[1].hash());
        }
    }
}
