//! Simulated annealing over puzzle positions.
//!
//! Each inner iteration mutates the current position, extracts a
//! candidate puzzle from it and scores the result. Better candidates
//! are adopted outright; worse ones win with Boltzmann probability
//! `exp((next - current) / T)`, which shrinks as the temperature cools.

use log::{debug, info, warn};
use rand::Rng;
use serde::Deserialize;

use crate::mate::{Extract, Extraction};
use crate::position::mutate_fen;
use crate::puzzle::Puzzle;
use crate::score::score;

/// Cooling schedule applied once per outer tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Linear,
    Geometric,
    Slow,
}

/// Annealing parameters.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct AnnealConfig {
    pub init_temp: f64,
    pub final_temp: f64,
    /// Step (linear) or factor (geometric) of the cooling schedule
    pub alpha: f64,
    /// Damping of the slow schedule
    pub beta: f64,
    pub method: Method,
    /// Inner iterations per temperature
    pub iterations: u32,
    /// Piece-count asymptote the mutation pulls toward
    pub piece_target: u32,
}

impl AnnealConfig {
    fn cool(&self, temperature: f64) -> f64 {
        match self.method {
            Method::Linear => temperature - self.alpha,
            Method::Geometric => temperature * self.alpha,
            Method::Slow => temperature / (1.0 + self.beta * temperature),
        }
    }
}

/// The annealing loop around a candidate source.
pub struct Annealer<E: Extract> {
    cfg: AnnealConfig,
    extractor: E,
}

impl<E: Extract> Annealer<E> {
    #[must_use]
    pub fn new(cfg: AnnealConfig, extractor: E) -> Annealer<E> {
        Annealer { cfg, extractor }
    }

    /// Anneal from `seed` until the temperature drops below the floor
    /// and return the best surviving puzzle.
    ///
    /// Candidates that fail to mutate or extract are dropped and the
    /// loop continues; the seed itself is never discarded without a
    /// replacement.
    pub fn anneal<R: Rng>(&self, seed: &Puzzle, rng: &mut R) -> Puzzle {
        let mut current = seed.clone();
        let mut current_score = score(&current);
        let mut temperature = self.cfg.init_temp;
        info!(
            "annealing from score {current_score:.2}, T={temperature} -> {}",
            self.cfg.final_temp
        );

        while temperature >= self.cfg.final_temp {
            for _ in 0..self.cfg.iterations {
                let candidate_fen =
                    match mutate_fen(&current.position, self.cfg.piece_target, rng) {
                        Ok(fen) => fen,
                        Err(e) => {
                            warn!("mutation failed: {e}");
                            continue;
                        }
                    };

                let candidate = match self.extractor.extract(&candidate_fen) {
                    Extraction::Mate { solution, mate_in } => Puzzle {
                        position: candidate_fen,
                        solution,
                        mate_in,
                        cp: 0,
                    },
                    Extraction::Eval { cp } => Puzzle {
                        position: candidate_fen,
                        solution: Vec::new(),
                        mate_in: 0,
                        cp,
                    },
                    Extraction::Reject => continue,
                };

                let next_score = score(&candidate);
                if accepts(current_score, next_score, temperature, rng) {
                    debug!(
                        "T={temperature:.2}: {current_score:.2} -> {next_score:.2} ({})",
                        candidate.position
                    );
                    current = candidate;
                    current_score = next_score;
                }
            }
            temperature = self.cfg.cool(temperature);
        }

        info!("annealing done at score {current_score:.2}");
        current
    }
}

/// Metropolis acceptance: better always, worse with Boltzmann
/// probability.
fn accepts<R: Rng>(current: f64, next: f64, temperature: f64, rng: &mut R) -> bool {
    if next > current {
        return true;
    }
    ((next - current) / temperature).exp() > rng.gen::<f64>()
}
