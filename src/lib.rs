//! Aesthetic chess-puzzle generation.
//!
//! A pool of external analysis engines ([`pool`]) feeds a mate-line
//! extractor ([`mate`]), and a simulated-annealing loop ([`anneal`])
//! searches the space of synthesized positions ([`position`]) for
//! puzzles that score well on a composite beauty function ([`score`]).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod anneal;
pub mod board;
pub mod config;
pub mod feeder;
pub mod mate;
pub mod pool;
pub mod position;
pub mod puzzle;
pub mod rules;
pub mod score;
pub mod uci;

use anneal::Annealer;
use config::RunConfig;
use mate::{Extraction, MateExtractor};
use pool::EnginePool;
use position::generate_random_fen;
use puzzle::Puzzle;

/// Attempts at synthesizing a seed puzzle before giving up.
const SEED_ATTEMPTS: u32 = 100;

/// Load the configuration at `config_path` and run one full annealing
/// pass, appending the resulting puzzle to the configured output file.
pub fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = RunConfig::from_file(config_path)?;
    let pool = Arc::new(EnginePool::new(
        &cfg.engine.path,
        cfg.engine.pool_size,
        cfg.engine.threads,
        Duration::from_millis(cfg.engine.retry_ms),
    )?);
    let extractor = MateExtractor::new(Arc::clone(&pool), cfg.analysis);

    let mut rng = StdRng::from_entropy();
    let seed = match cfg.seed.clone() {
        Some(seed) => seed,
        None => synthesize_seed(&cfg, &extractor, &mut rng)?,
    };

    let annealer = Annealer::new(cfg.anneal, extractor);
    let best = annealer.anneal(&seed, &mut rng);
    info!(
        "final puzzle: {} (mate in {}, score {:.2})",
        best.position,
        best.mate_in,
        score::score(&best)
    );
    puzzle::append_puzzle(&cfg.output, &best)?;

    pool.close();
    Ok(())
}

/// Build a starting puzzle by generating random positions until the
/// extractor keeps one.
fn synthesize_seed(
    cfg: &RunConfig,
    extractor: &MateExtractor,
    rng: &mut StdRng,
) -> Result<Puzzle, Box<dyn std::error::Error>> {
    for attempt in 1..=SEED_ATTEMPTS {
        let fen = generate_random_fen(&cfg.pieces, rng)?;
        match extractor.extract(&fen) {
            Extraction::Mate { solution, mate_in } => {
                info!("seed found on attempt {attempt}: mate in {mate_in} at {fen}");
                return Ok(Puzzle {
                    position: fen,
                    solution,
                    mate_in,
                    cp: 0,
                });
            }
            Extraction::Eval { cp } => {
                info!("seed found on attempt {attempt}: {cp:+} cp at {fen}");
                return Ok(Puzzle {
                    position: fen,
                    solution: Vec::new(),
                    mate_in: 0,
                    cp,
                });
            }
            Extraction::Reject => warn!("seed attempt {attempt} rejected"),
        }
    }
    Err(Box::new(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("no usable seed after {SEED_ATTEMPTS} attempts"),
    )))
}
