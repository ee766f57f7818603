use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use murmur::params::FlockConfig;
use murmur::{Simulation, SimulationError};

#[derive(Parser, Debug)]
#[command(name = "murmur", version, about = "Boid flocking on a GPU state texture")]
struct Cli {
    /// JSON flock configuration; defaults are used when omitted
    config: Option<PathBuf>,

    /// Step the CPU backend this many frames and print the final state as JSON
    #[arg(long, value_name = "STEPS")]
    headless: Option<u32>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match FlockConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => FlockConfig::default(),
    };
    let simulation = Simulation::from_config(config);

    match cli.headless {
        Some(steps) => {
            let printed = simulation.run_headless(steps).and_then(|snapshot| {
                serde_json::to_string_pretty(&snapshot)
                    .map(|json| println!("{}", json))
                    .map_err(|e| murmur::ConfigError::Parse(e).into())
            });
            if let Err(e) = printed {
                log::error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
        None => match simulation.run() {
            Ok(()) => {}
            Err(SimulationError::EventLoop(e)) => {
                log::error!("{}", e);
                return ExitCode::FAILURE;
            }
            // setup failures were logged inside the event loop
            Err(_) => return ExitCode::FAILURE,
        },
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_arguments_runs_windowed_with_defaults() {
        let cli = Cli::try_parse_from(["murmur"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.headless.is_none());
    }

    #[test]
    fn test_config_and_headless() {
        let cli = Cli::try_parse_from(["murmur", "flock.json", "--headless=10"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("flock.json")));
        assert_eq!(cli.headless, Some(10));

        let cli = Cli::try_parse_from(["murmur", "--headless", "3"]).unwrap();
        assert!(cli.config.is_none());
        assert_eq!(cli.headless, Some(3));
    }

    #[test]
    fn test_bad_arguments_rejected() {
        assert!(Cli::try_parse_from(["murmur", "--headless", "many"]).is_err());
        assert!(Cli::try_parse_from(["murmur", "--headless"]).is_err());
        assert!(Cli::try_parse_from(["murmur", "a.json", "b.json"]).is_err());
        assert!(Cli::try_parse_from(["murmur", "--fast"]).is_err());
    }
}
