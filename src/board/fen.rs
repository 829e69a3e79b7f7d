//! FEN codec for the byte board.

use std::str::FromStr;

use super::error::FenError;
use super::{
    code_to_fen_char, fen_char_to_code, Board, Position, Square, CASTLE_BLACK_K, CASTLE_BLACK_Q,
    CASTLE_WHITE_K, CASTLE_WHITE_Q,
};

impl Position {
    /// Parse a position from FEN notation.
    ///
    /// Halfmove and fullmove counters are accepted but discarded; the
    /// en-passant field keeps only its file.
    pub fn try_from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(FenError::TooFewFields {
                found: fields.len(),
            });
        }

        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::BadRankCount { found: ranks.len() });
        }

        let mut board = Board::empty();
        for (row, rank_str) in ranks.iter().enumerate() {
            let mut col = 0usize;
            for ch in rank_str.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    col += skip as usize;
                } else {
                    let code =
                        fen_char_to_code(ch).ok_or(FenError::InvalidPiece { ch })?;
                    if col >= 8 {
                        return Err(FenError::BadFileCount {
                            rank: row,
                            files: col + 1,
                        });
                    }
                    board.set(Square(row, col), code);
                    col += 1;
                }
            }
            if col != 8 {
                return Err(FenError::BadFileCount {
                    rank: row,
                    files: col,
                });
            }
        }

        let white_to_move = match fields[1] {
            "w" => true,
            "b" => false,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        };

        let mut castling_rights = 0u8;
        for ch in fields[2].chars() {
            match ch {
                'K' => castling_rights |= CASTLE_WHITE_K,
                'Q' => castling_rights |= CASTLE_WHITE_Q,
                'k' => castling_rights |= CASTLE_BLACK_K,
                'q' => castling_rights |= CASTLE_BLACK_Q,
                '-' => {}
                _ => return Err(FenError::InvalidCastling { ch }),
            }
        }

        let en_passant_file = if fields[3] == "-" {
            None
        } else {
            let chars: Vec<char> = fields[3].chars().collect();
            if chars.len() == 2
                && ('a'..='h').contains(&chars[0])
                && ('1'..='8').contains(&chars[1])
            {
                Some(chars[0] as usize - 'a' as usize)
            } else {
                return Err(FenError::InvalidEnPassant {
                    found: fields[3].to_string(),
                });
            }
        };

        Ok(Position {
            board,
            white_to_move,
            castling_rights,
            en_passant_file,
        })
    }

    /// Render the position as a six-field FEN string.
    ///
    /// Empty runs are run-length encoded per rank, castling letters come
    /// out in `KQkq` order, and the counters are fixed at `0 1`. The
    /// en-passant target rank follows the side to move: rank 6 when
    /// black moves, rank 3 when white does.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for row in 0..8 {
            let mut empty = 0;
            for col in 0..8 {
                let code = self.board.get(Square(row, col));
                if code == 0 {
                    empty += 1;
                    continue;
                }
                if empty != 0 {
                    placement.push_str(&empty.to_string());
                    empty = 0;
                }
                if let Some(c) = code_to_fen_char(code) {
                    placement.push(c);
                }
            }
            if empty != 0 {
                placement.push_str(&empty.to_string());
            }
            if row != 7 {
                placement.push('/');
            }
        }

        let side = if self.white_to_move { "w" } else { "b" };

        let mut castling = String::new();
        if self.castling_rights & CASTLE_WHITE_K != 0 {
            castling.push('K');
        }
        if self.castling_rights & CASTLE_WHITE_Q != 0 {
            castling.push('Q');
        }
        if self.castling_rights & CASTLE_BLACK_K != 0 {
            castling.push('k');
        }
        if self.castling_rights & CASTLE_BLACK_Q != 0 {
            castling.push('q');
        }
        if castling.is_empty() {
            castling.push('-');
        }

        let en_passant = match self.en_passant_file {
            Some(file) => {
                let rank = if self.white_to_move { '3' } else { '6' };
                format!("{}{}", (b'a' + file as u8) as char, rank)
            }
            None => "-".to_string(),
        };

        format!("{placement} {side} {castling} {en_passant} 0 1")
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::try_from_fen(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BLACK_KING, BLACK_PAWN, WHITE_KING, WHITE_ROOK};

    #[test]
    fn parse_and_render_round_trip() {
        let fen = "R3nN2/8/Pk5P/3b4/7P/6r1/2pnN2p/2K5 b - - 0 1";
        let pos = Position::try_from_fen(fen).unwrap();
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn castling_letters_in_stable_order() {
        let pos = Position::try_from_fen("4k3/8/8/8/8/8/8/R3K2R w qkQK - 0 1").unwrap();
        assert_eq!(pos.to_fen(), "4k3/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
    }

    #[test]
    fn parse_extracts_pieces_and_side() {
        let pos = Position::try_from_fen("k7/8/2K5/8/8/8/8/7R w - - 0 1").unwrap();
        assert!(pos.white_to_move);
        assert_eq!(pos.board.get(Square(0, 0)), BLACK_KING);
        assert_eq!(pos.board.get(Square(2, 2)), WHITE_KING);
        assert_eq!(pos.board.get(Square(7, 7)), WHITE_ROOK);
        assert_eq!(pos.board.non_king_count(), 1);
    }

    #[test]
    fn en_passant_file_round_trips_with_side_rank() {
        let pos = Position::try_from_fen("k7/8/8/3P4/8/8/8/K7 b - d6 0 1").unwrap();
        assert_eq!(pos.en_passant_file, Some(3));
        assert!(pos.to_fen().contains(" d6 "));

        let pos = Position::try_from_fen("k7/8/8/8/3p4/8/8/K7 w - d3 0 1").unwrap();
        assert_eq!(pos.en_passant_file, Some(3));
        assert!(pos.to_fen().contains(" d3 "));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Position::try_from_fen("not a fen"),
            Err(FenError::TooFewFields { .. })
        ));
        assert!(matches!(
            Position::try_from_fen("8/8/8/8/8/8/8/7x w - - 0 1"),
            Err(FenError::InvalidPiece { .. })
        ));
        assert!(matches!(
            Position::try_from_fen("8/8/8/8/8/8/8/8 z - - 0 1"),
            Err(FenError::InvalidSideToMove { .. })
        ));
        assert!(matches!(
            Position::try_from_fen("8/8/8/8/8/8/8/8 w - e9 0 1"),
            Err(FenError::InvalidEnPassant { .. })
        ));
    }

    #[test]
    fn black_pawn_parses_with_color_bit() {
        let pos = Position::try_from_fen("8/p7/8/8/8/8/8/8 w - - 0 1").unwrap();
        assert_eq!(pos.board.get(Square(1, 0)), BLACK_PAWN);
    }
}
