//! Scripted stand-in engines for hermetic pool and extractor tests.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Write an executable shell script that speaks just enough UCI for the
/// pipeline: handshake, option acknowledgement, and per-position canned
/// `go` replies.
///
/// `cases` holds shell `case` arms matched against the most recent
/// `position` command, e.g.
/// `*"k7/8/2K5"*) echo "info ..."; echo "bestmove c6b6" ;;`.
/// Unmatched positions fall through to a quiet centipawn reply.
pub fn stub_engine(cases: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "puzzle-gen-stub-{}-{}.sh",
        std::process::id(),
        n
    ));

    let script = format!(
        r#"#!/bin/sh
pos=""
while IFS= read -r line; do
  case "$line" in
    uci) echo "id name stub-engine"; echo "uciok" ;;
    isready) echo "readyok" ;;
    setoption*) : ;;
    ucinewgame) : ;;
    position*) pos="$line" ;;
    quit) exit 0 ;;
    go*)
      case "$pos" in
{cases}
        *) echo "info depth 1 multipv 1 score cp 0 pv a2a3"; echo "bestmove a2a3" ;;
      esac ;;
  esac
done
"#
    );

    fs::write(&path, script).expect("write stub engine");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("chmod stub engine");
    }
    path
}
