//! Mate extraction against scripted engines.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use chess_puzzle_gen::mate::{AnalysisConfig, Extraction, MateExtractor};
use chess_puzzle_gen::pool::EnginePool;

const MATE_IN_TWO: &str = "k7/8/2K5/8/8/8/8/7R w - - 0 1";
const MATE_IN_ONE: &str = "k7/8/1K6/8/8/8/8/7R w - - 0 1";

fn extractor_for(cases: &str) -> MateExtractor {
    let path = common::stub_engine(cases);
    let pool = Arc::new(
        EnginePool::new(
            path.to_str().expect("utf-8 temp path"),
            1,
            1,
            Duration::from_millis(2),
        )
        .expect("stub pool"),
    );
    MateExtractor::new(pool, AnalysisConfig { depth: 12, multi_pv: 2 })
}

#[test]
fn terminated_position_is_rejected() {
    // Back-rank mate already on the board; the engine is never asked.
    let extractor = extractor_for("");
    assert_eq!(
        extractor.extract("R5k1/5ppp/8/8/8/8/8/4K3 b - - 0 1"),
        Extraction::Reject
    );
}

#[test]
fn invalid_fen_is_rejected() {
    let extractor = extractor_for("");
    assert_eq!(extractor.extract("not a fen at all"), Extraction::Reject);
}

#[test]
fn immediate_mate_is_accepted() {
    let cases = r#"        *"k7/8/1K6"*)
          echo "info depth 12 multipv 1 score mate 1 pv h1h8"
          echo "info depth 12 multipv 2 score cp 420 pv h1h7"
          echo "bestmove h1h8" ;;
"#;
    let extractor = extractor_for(cases);
    assert_eq!(
        extractor.extract(MATE_IN_ONE),
        Extraction::Mate {
            solution: vec!["h1h8".to_string()],
            mate_in: 1,
        }
    );
}

#[test]
fn forced_line_is_walked_to_the_mate() {
    // Kb6 forces Kb8 (the only reply), then Rh8 mates.
    let cases = r#"        *"k7/8/2K5"*)
          echo "info depth 12 multipv 1 score mate 2 pv c6b6 a8b8 h1h8"
          echo "info depth 12 multipv 2 score cp 310 pv h1h5"
          echo "bestmove c6b6" ;;
        *"k7/8/1K6"*)
          echo "info depth 12 multipv 1 score mate -1 pv a8b8"
          echo "bestmove a8b8" ;;
        *"1k6/8/1K6"*)
          echo "info depth 12 multipv 1 score mate 1 pv h1h8"
          echo "info depth 12 multipv 2 score cp 250 pv h1h7"
          echo "bestmove h1h8" ;;
"#;
    let extractor = extractor_for(cases);
    assert_eq!(
        extractor.extract(MATE_IN_TWO),
        Extraction::Mate {
            solution: vec![
                "c6b6".to_string(),
                "a8b8".to_string(),
                "h1h8".to_string(),
            ],
            mate_in: 2,
        }
    );
}

#[test]
fn equal_second_mate_is_ambiguous() {
    let cases = r#"        *"k7/8/2K5"*)
          echo "info depth 12 multipv 1 score mate 2 pv c6b6 a8b8 h1h8"
          echo "info depth 12 multipv 2 score mate 2 pv h1h2 a8b8 h2h8"
          echo "bestmove c6b6" ;;
"#;
    let extractor = extractor_for(cases);
    assert_eq!(extractor.extract(MATE_IN_TWO), Extraction::Reject);
}

#[test]
fn longer_second_mate_is_still_unique() {
    let cases = r#"        *"k7/8/1K6"*)
          echo "info depth 12 multipv 1 score mate 1 pv h1h8"
          echo "info depth 12 multipv 2 score mate 3 pv h1h2 a8b8 h2h7 b8a8 h7h8"
          echo "bestmove h1h8" ;;
"#;
    let extractor = extractor_for(cases);
    assert_eq!(
        extractor.extract(MATE_IN_ONE),
        Extraction::Mate {
            solution: vec!["h1h8".to_string()],
            mate_in: 1,
        }
    );
}

#[test]
fn mateless_position_reports_centipawns() {
    let cases = r#"        *"k7/8/2K5"*)
          echo "info depth 12 multipv 1 score cp -42 pv h1h5"
          echo "info depth 12 multipv 2 score cp -80 pv c6b6"
          echo "bestmove h1h5" ;;
"#;
    let extractor = extractor_for(cases);
    assert_eq!(extractor.extract(MATE_IN_TWO), Extraction::Eval { cp: -42 });
}

#[test]
fn committed_line_survives_vanishing_mate() {
    // The engine promises mate in 2, scripts the reply, then walks the
    // claim back; the committed moves are still a puzzle.
    let cases = r#"        *"k7/8/2K5"*)
          echo "info depth 12 multipv 1 score mate 2 pv c6b6 a8b8 h1h8"
          echo "info depth 12 multipv 2 score cp 310 pv h1h5"
          echo "bestmove c6b6" ;;
        *"k7/8/1K6"*)
          echo "info depth 12 multipv 1 score mate -1 pv a8b8"
          echo "bestmove a8b8" ;;
        *"1k6/8/1K6"*)
          echo "info depth 12 multipv 1 score cp 990 pv h1h7"
          echo "info depth 12 multipv 2 score cp 300 pv h1h5"
          echo "bestmove h1h7" ;;
"#;
    let extractor = extractor_for(cases);
    assert_eq!(
        extractor.extract(MATE_IN_TWO),
        Extraction::Mate {
            solution: vec!["c6b6".to_string(), "a8b8".to_string()],
            mate_in: 2,
        }
    );
}

#[test]
fn dead_engine_rejects_candidate() {
    // A script that exits on the first `go` looks like an engine crash.
    let cases = r#"        *) exit 7 ;;
"#;
    let extractor = extractor_for(cases);
    assert_eq!(extractor.extract(MATE_IN_TWO), Extraction::Reject);
}
