//! Run configuration loaded from a JSON file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::anneal::AnnealConfig;
use crate::mate::AnalysisConfig;
use crate::position::PieceCountConfig;
use crate::puzzle::Puzzle;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {e}"),
            ConfigError::Parse(e) => write!(f, "cannot parse config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

/// Engine pool settings.
#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
    /// Path to the engine binary
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Acquire-retry backoff in milliseconds
    #[serde(default = "default_retry_ms")]
    pub retry_ms: u64,
}

fn default_pool_size() -> usize {
    1
}

fn default_threads() -> u32 {
    8
}

fn default_retry_ms() -> u64 {
    10
}

fn default_output() -> PathBuf {
    PathBuf::from("puzzles.json")
}

/// Everything a run needs.
#[derive(Clone, Debug, Deserialize)]
pub struct RunConfig {
    pub engine: EngineConfig,
    pub analysis: AnalysisConfig,
    pub anneal: AnnealConfig,
    /// Piece counts for seed generation
    pub pieces: PieceCountConfig,
    /// Optional fixed seed puzzle; a random one is synthesized when
    /// absent
    #[serde(default)]
    pub seed: Option<Puzzle>,
    /// Results file
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<RunConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anneal::Method;

    #[test]
    fn parses_full_config() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{
                "engine": {"path": "stockfish", "pool_size": 2, "threads": 4, "retry_ms": 5},
                "analysis": {"depth": 14, "multi_pv": 2},
                "anneal": {
                    "init_temp": 200.0, "final_temp": 0.5,
                    "alpha": 1.0, "beta": 0.02,
                    "method": "linear", "iterations": 1000,
                    "piece_target": 5
                },
                "pieces": {
                    "white_q": 1, "white_r": 1, "white_b": 1, "white_n": 1, "white_p": 1,
                    "black_q": 1, "black_r": 1, "black_b": 1, "black_n": 1, "black_p": 1
                }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.engine.pool_size, 2);
        assert_eq!(cfg.anneal.method, Method::Linear);
        assert_eq!(cfg.analysis.depth, 14);
        assert_eq!(cfg.pieces.total(), 10);
        assert!(cfg.seed.is_none());
        assert_eq!(cfg.output, PathBuf::from("puzzles.json"));
    }

    #[test]
    fn engine_defaults_fill_in() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"path": "stockfish"}"#).unwrap();
        assert_eq!(cfg.pool_size, 1);
        assert_eq!(cfg.threads, 8);
        assert_eq!(cfg.retry_ms, 10);
    }
}
