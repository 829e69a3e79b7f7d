//! Mate-puzzle extraction: drive an engine through a candidate
//! position and keep only uniquely forced mating lines.
//!
//! The extractor alternates between two analyses. A MultiPV search of
//! the solver's position finds the shortest forced mate and proves it
//! unique (a second variation mating in the same number of moves kills
//! the candidate), then a single-PV search scripts the defender's best
//! reply. Solver moves accumulate into the solution until the game
//! ends or the mate threat evaporates.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use serde::Deserialize;
use shakmaty::{Chess, Position};

use crate::pool::EnginePool;
use crate::rules;
use crate::uci::{Engine, EngineError, PvLine, SearchResults};

/// Per-analysis engine configuration.
///
/// `multi_pv` must be at least 2: uniqueness of the mating move is
/// decided by comparing the best and second-best variations.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct AnalysisConfig {
    pub depth: u32,
    pub multi_pv: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            depth: 14,
            multi_pv: 2,
        }
    }
}

/// Outcome of extracting one candidate position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// A uniquely forced mating line
    Mate { solution: Vec<String>, mate_in: u32 },
    /// No forced mate; the engine's centipawn verdict for the position
    Eval { cp: i32 },
    /// Candidate unusable: ambiguous line, terminated position, or an
    /// engine failure
    Reject,
}

/// Source of puzzle candidates; the seam the annealer and feeder sit
/// on, so tests can substitute a scripted extractor.
pub trait Extract {
    fn extract(&self, fen: &str) -> Extraction;
}

/// States of the per-candidate extraction machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    /// Multi-PV analysis of the solver's position
    MoverAnalysis,
    /// Single-PV analysis scripting the defender's best reply
    OpponentReply,
    Accept,
    Reject,
}

/// Extracts mate puzzles using engines rented from a shared pool.
pub struct MateExtractor {
    pool: Arc<EnginePool>,
    cfg: AnalysisConfig,
}

impl MateExtractor {
    /// A `multi_pv` below 2 cannot prove uniqueness and is raised to 2.
    #[must_use]
    pub fn new(pool: Arc<EnginePool>, cfg: AnalysisConfig) -> MateExtractor {
        let mut cfg = cfg;
        if cfg.multi_pv < 2 {
            warn!("multi_pv {} cannot prove uniqueness, using 2", cfg.multi_pv);
            cfg.multi_pv = 2;
        }
        MateExtractor { pool, cfg }
    }

    /// Analyze one candidate FEN.
    ///
    /// The engine instance is rented for the whole candidate and
    /// released on every exit path; engine failures reject the
    /// candidate rather than bubbling up.
    pub fn extract(&self, fen: &str) -> Extraction {
        let pos = match rules::position_from_fen(fen) {
            Ok(pos) => pos,
            Err(e) => {
                debug!("candidate dropped: {e}");
                return Extraction::Reject;
            }
        };
        if pos.is_game_over() {
            debug!("candidate already terminated: {fen}");
            return Extraction::Reject;
        }

        let mut instance = self.pool.acquire();
        let outcome = self.drive(&mut instance.engine, pos, fen);
        if let Err(e) = self.pool.release(instance) {
            warn!("engine release failed: {e}");
        }
        match outcome {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("engine run failed for '{fen}': {e}");
                Extraction::Reject
            }
        }
    }

    fn drive(
        &self,
        engine: &mut Engine,
        mut pos: Chess,
        start_fen: &str,
    ) -> Result<Extraction, EngineError> {
        let mut current_fen = start_fen.to_string();
        let mut solution: Vec<String> = Vec::new();
        let mut mate_in: Option<u32> = None;
        let mut state = State::MoverAnalysis;

        loop {
            state = match state {
                State::MoverAnalysis => {
                    engine.set_option("MultiPV", &self.cfg.multi_pv.to_string())?;
                    let results = engine.analyze(&current_fen, self.cfg.depth)?;
                    let mates = mating_lines(&results);

                    match mates.first() {
                        None if !solution.is_empty() => State::Accept,
                        None => {
                            return Ok(match first_cp(&results) {
                                Some(cp) => Extraction::Eval { cp },
                                None => Extraction::Reject,
                            });
                        }
                        Some(best) => {
                            let best_mate = best.score.mate().unwrap_or(0);
                            let ambiguous = mates
                                .get(1)
                                .is_some_and(|second| second.score.mate() == Some(best_mate));
                            if ambiguous {
                                debug!("ambiguous mate in {best_mate} at {current_fen}");
                                State::Reject
                            } else {
                                let mv = best.pv[0].clone();
                                if let Err(e) = rules::play_uci(&mut pos, &mv) {
                                    return Err(EngineError::Protocol {
                                        line: format!("pv move {e}"),
                                    });
                                }
                                solution.push(mv);
                                if mate_in.is_none() {
                                    mate_in = Some(best_mate.unsigned_abs());
                                }
                                current_fen = rules::fen_of(&pos);
                                if pos.is_game_over() {
                                    State::Accept
                                } else {
                                    State::OpponentReply
                                }
                            }
                        }
                    }
                }
                State::OpponentReply => {
                    engine.set_option("MultiPV", "1")?;
                    let results = engine.analyze(&current_fen, self.cfg.depth)?;
                    let Some(reply) = results.best_move else {
                        return Err(EngineError::Protocol {
                            line: "bestmove (none) for a live position".to_string(),
                        });
                    };
                    if let Err(e) = rules::play_uci(&mut pos, &reply) {
                        return Err(EngineError::Protocol {
                            line: format!("bestmove {e}"),
                        });
                    }
                    solution.push(reply);
                    current_fen = rules::fen_of(&pos);
                    if pos.is_game_over() {
                        State::Accept
                    } else {
                        State::MoverAnalysis
                    }
                }
                State::Accept => {
                    let mate_in = mate_in.unwrap_or(0);
                    debug!("accepted mate in {mate_in}: {start_fen}");
                    return Ok(Extraction::Mate { solution, mate_in });
                }
                State::Reject => return Ok(Extraction::Reject),
            };
        }
    }
}

impl Extract for MateExtractor {
    fn extract(&self, fen: &str) -> Extraction {
        MateExtractor::extract(self, fen)
    }
}

impl fmt::Debug for MateExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MateExtractor")
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

/// PV lines that announce a forced mate for the mover, shortest first.
fn mating_lines(results: &SearchResults) -> Vec<&PvLine> {
    let mut mates: Vec<&PvLine> = results
        .lines
        .iter()
        .filter(|line| line.score.mate().is_some_and(|m| m > 0) && !line.pv.is_empty())
        .collect();
    mates.sort_by_key(|line| line.score.mate().unwrap_or(i32::MAX));
    mates
}

/// Centipawn score of the best line, if the engine produced one.
fn first_cp(results: &SearchResults) -> Option<i32> {
    results
        .lines
        .iter()
        .min_by_key(|line| line.multipv)
        .and_then(|line| line.score.cp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::Score;

    fn line(multipv: u32, score: Score, pv: &[&str]) -> PvLine {
        PvLine {
            multipv,
            depth: 10,
            score,
            pv: pv.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn mating_lines_sorted_by_distance() {
        let results = SearchResults {
            best_move: Some("a1a2".to_string()),
            lines: vec![
                line(1, Score::Mate(3), &["a1a2"]),
                line(2, Score::Mate(2), &["b1b2"]),
                line(3, Score::Cp(500), &["c1c2"]),
                line(4, Score::Mate(-2), &["d1d2"]),
            ],
        };
        let mates = mating_lines(&results);
        assert_eq!(mates.len(), 2);
        assert_eq!(mates[0].score, Score::Mate(2));
        assert_eq!(mates[1].score, Score::Mate(3));
    }

    #[test]
    fn first_cp_prefers_primary_line() {
        let results = SearchResults {
            best_move: None,
            lines: vec![
                line(2, Score::Cp(-40), &["b1b2"]),
                line(1, Score::Cp(25), &["a1a2"]),
            ],
        };
        assert_eq!(first_cp(&results), Some(25));
    }

    #[test]
    fn first_cp_none_for_mate_primary() {
        let results = SearchResults {
            best_move: None,
            lines: vec![line(1, Score::Mate(-1), &["a1a2"])],
        };
        assert_eq!(first_cp(&results), None);
    }
}
