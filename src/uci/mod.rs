//! Minimal UCI client for external analysis engines.
//!
//! Speaks the request-response subset the puzzle pipeline needs over a
//! subprocess's stdio: option setting, `position fen`, depth-limited
//! `go`, and structured MultiPV search results. Move strings stay in
//! long algebraic notation exactly as the engine printed them.

use std::fmt;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use log::{debug, trace, warn};

/// Error type for engine communication failures.
#[derive(Debug)]
pub enum EngineError {
    /// Spawning or talking to the subprocess failed
    Io(std::io::Error),
    /// The engine closed its side of the pipe
    Closed,
    /// The engine sent something the protocol does not allow here
    Protocol { line: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Io(e) => write!(f, "engine I/O error: {e}"),
            EngineError::Closed => write!(f, "engine closed its pipe"),
            EngineError::Protocol { line } => write!(f, "unexpected engine output '{line}'"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e)
    }
}

/// An engine evaluation: centipawns or moves-to-mate, as reported on an
/// `info score` token pair.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Score {
    Cp(i32),
    Mate(i32),
}

impl Score {
    /// Mate distance when this is a mate score.
    #[inline]
    #[must_use]
    pub const fn mate(self) -> Option<i32> {
        match self {
            Score::Mate(m) => Some(m),
            Score::Cp(_) => None,
        }
    }

    /// Centipawn value when this is a centipawn score.
    #[inline]
    #[must_use]
    pub const fn cp(self) -> Option<i32> {
        match self {
            Score::Cp(cp) => Some(cp),
            Score::Mate(_) => None,
        }
    }
}

/// One principal variation from a MultiPV search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PvLine {
    /// 1-based MultiPV slot
    pub multipv: u32,
    /// Depth the line was reported at
    pub depth: u32,
    pub score: Score,
    /// Move sequence in long algebraic notation
    pub pv: Vec<String>,
}

/// Structured result of one `go` command.
#[derive(Clone, Debug, Default)]
pub struct SearchResults {
    /// The engine's `bestmove`, absent when it printed `(none)`
    pub best_move: Option<String>,
    /// Final PV lines, ordered by MultiPV slot
    pub lines: Vec<PvLine>,
}

/// A live engine subprocess.
///
/// Commands are serialized by `&mut self`; one `Engine` never has two
/// in-flight requests.
pub struct Engine {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl Engine {
    /// Spawn the engine binary at `path` and complete the UCI
    /// handshake.
    pub fn new(path: &str) -> Result<Engine, EngineError> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdin = child.stdin.take().ok_or(EngineError::Closed)?;
        let stdout = child.stdout.take().ok_or(EngineError::Closed)?;

        let mut engine = Engine {
            child,
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
        };
        engine.send("uci")?;
        engine.wait_for("uciok")?;
        engine.sync()?;
        debug!("engine '{path}' is up");
        Ok(engine)
    }

    fn send(&mut self, command: &str) -> Result<(), EngineError> {
        trace!(">> {command}");
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(EngineError::Closed);
        }
        let line = line.trim_end().to_string();
        trace!("<< {line}");
        Ok(line)
    }

    fn wait_for(&mut self, token: &str) -> Result<(), EngineError> {
        loop {
            if self.read_line()? == token {
                return Ok(());
            }
        }
    }

    /// Block until the engine answers `isready`.
    pub fn sync(&mut self) -> Result<(), EngineError> {
        self.send("isready")?;
        self.wait_for("readyok")
    }

    /// Set a UCI option and wait for the engine to settle.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.send(&format!("setoption name {name} value {value}"))?;
        self.sync()
    }

    /// Run a depth-limited search of `fen` and collect the final PV
    /// lines and best move.
    ///
    /// Later `info` lines for a MultiPV slot replace earlier ones, so
    /// the returned lines are the deepest the engine reported before
    /// `bestmove`.
    pub fn analyze(&mut self, fen: &str, depth: u32) -> Result<SearchResults, EngineError> {
        self.send(&format!("position fen {fen}"))?;
        self.send(&format!("go depth {depth}"))?;

        let mut results = SearchResults::default();
        loop {
            let line = self.read_line()?;
            if let Some(rest) = line.strip_prefix("bestmove") {
                let best = rest.split_whitespace().next();
                match best {
                    Some("(none)") | None => results.best_move = None,
                    Some(mv) => results.best_move = Some(mv.to_string()),
                }
                break;
            }
            if line.starts_with("info") {
                if let Some(pv) = parse_info_line(&line) {
                    match results.lines.iter_mut().find(|l| l.multipv == pv.multipv) {
                        Some(slot) => *slot = pv,
                        None => results.lines.push(pv),
                    }
                }
            }
        }
        results.lines.sort_by_key(|l| l.multipv);
        Ok(results)
    }
}

impl Drop for Engine {
    /// Best-effort teardown: ask for `quit`, give the process a moment,
    /// then kill it if it is still around.
    fn drop(&mut self) {
        if let Err(e) = self.send("quit") {
            warn!("engine quit failed: {e}");
        }
        for _ in 0..50 {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => std::thread::sleep(std::time::Duration::from_millis(10)),
                Err(_) => break,
            }
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Parse one `info` line into a PV entry.
///
/// Lines without both a score and a PV (`info string`, node-count
/// heartbeats) yield `None`. Unknown tokens are skipped, which also
/// covers `lowerbound`/`upperbound` markers.
fn parse_info_line(line: &str) -> Option<PvLine> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut depth = 0u32;
    let mut multipv = 1u32;
    let mut score = None;
    let mut pv = None;

    let mut i = 1;
    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                depth = tokens.get(i + 1)?.parse().ok()?;
                i += 2;
            }
            "multipv" => {
                multipv = tokens.get(i + 1)?.parse().ok()?;
                i += 2;
            }
            "score" => {
                let value: i32 = tokens.get(i + 2)?.parse().ok()?;
                score = match *tokens.get(i + 1)? {
                    "cp" => Some(Score::Cp(value)),
                    "mate" => Some(Score::Mate(value)),
                    _ => return None,
                };
                i += 3;
            }
            "pv" => {
                pv = Some(
                    tokens[i + 1..]
                        .iter()
                        .map(|s| (*s).to_string())
                        .collect::<Vec<_>>(),
                );
                break;
            }
            _ => i += 1,
        }
    }

    let pv = pv?;
    if pv.is_empty() {
        return None;
    }
    Some(PvLine {
        multipv,
        depth,
        score: score?,
        pv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cp_info_line() {
        let pv = parse_info_line(
            "info depth 12 seldepth 18 multipv 1 score cp 35 nodes 123456 pv e2e4 e7e5 g1f3",
        )
        .unwrap();
        assert_eq!(pv.multipv, 1);
        assert_eq!(pv.depth, 12);
        assert_eq!(pv.score, Score::Cp(35));
        assert_eq!(pv.pv, vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn parses_mate_info_line_with_default_multipv() {
        let pv = parse_info_line("info depth 20 score mate 3 pv h1h8 g8h8 a1a8").unwrap();
        assert_eq!(pv.multipv, 1);
        assert_eq!(pv.score, Score::Mate(3));
    }

    #[test]
    fn ignores_lines_without_pv_or_score() {
        assert!(parse_info_line("info string NNUE evaluation enabled").is_none());
        assert!(parse_info_line("info depth 10 nodes 99999 nps 1000000").is_none());
        assert!(parse_info_line("info depth 10 score cp 5").is_none());
    }

    #[test]
    fn negative_mate_scores_parse() {
        let pv = parse_info_line("info depth 9 multipv 2 score mate -4 pv e8d8").unwrap();
        assert_eq!(pv.score, Score::Mate(-4));
        assert_eq!(pv.score.mate(), Some(-4));
        assert_eq!(pv.score.cp(), None);
    }
}
