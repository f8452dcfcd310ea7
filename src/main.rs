mod cli;
mod config;
mod model;
mod noise;
mod playback;
mod session;
mod storage;

use std::process;

use config::Config;
use env_logger::Env;
use storage::TaskLog;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let data_dir = config.data_dir().unwrap_or_else(|| {
        eprintln!("Could not determine home directory.");
        process::exit(1);
    });

    let log = match TaskLog::open(&data_dir) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to initialize task log: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(&config, &log, &data_dir) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
