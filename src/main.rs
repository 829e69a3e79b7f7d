use std::path::PathBuf;

fn main() {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("config.json"), PathBuf::from);

    if let Err(e) = chess_puzzle_gen::run(&config_path) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
