//! Puzzle records and the JSON results writer.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A finished puzzle: starting position, scripted solution line, and
/// the evaluation that produced it.
///
/// `mate_in` is 0 when no forced mate was found, in which case `cp`
/// carries the engine's centipawn evaluation instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    pub position: String,
    /// Moves in long algebraic notation, solver first
    pub solution: Vec<String>,
    pub mate_in: u32,
    #[serde(default)]
    pub cp: i32,
}

/// On-disk collection of puzzles.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PuzzleFile {
    pub puzzles: Vec<Puzzle>,
}

/// Append one puzzle to the JSON results file at `path`, creating the
/// file if it does not exist yet.
pub fn append_puzzle(path: &Path, puzzle: &Puzzle) -> io::Result<()> {
    let mut file = match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str::<PuzzleFile>(&contents)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => PuzzleFile::default(),
        Err(e) => return Err(e),
    };
    file.puzzles.push(puzzle.clone());
    let rendered = serde_json::to_string_pretty(&file)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, rendered)
}
