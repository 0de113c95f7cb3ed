use std::path::{Path, PathBuf};
use std::process::ExitCode;

use evolution_cars::{
    EvolutionConfig, GenerationController, Simulation, StepOutcome, TerrainConfig,
};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
enum RunnerError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize frame: {0}")]
    SerializeFrame(#[source] serde_json::Error),
    #[error("failed to write {}: {source}", path.display())]
    WriteFrame {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn parse_flag(args: &[String], flag: &str) -> Option<PathBuf> {
    for i in 0..args.len() {
        if args[i] == flag {
            if let Some(value) = args.get(i + 1) {
                return Some(PathBuf::from(value));
            }
        }
    }
    None
}

fn load_config(path: Option<&Path>) -> Result<EvolutionConfig, RunnerError> {
    let Some(path) = path else {
        return Ok(EvolutionConfig::from_env());
    };
    let raw = std::fs::read_to_string(path).map_err(|source| RunnerError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| RunnerError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_frame(sim: &Simulation, path: &Path) -> Result<(), RunnerError> {
    let json = serde_json::to_string_pretty(&sim.frame()).map_err(RunnerError::SerializeFrame)?;
    std::fs::write(path, json).map_err(|source| RunnerError::WriteFrame {
        path: path.to_path_buf(),
        source,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match load_config(parse_flag(&args, "--config").as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let frame_path = parse_flag(&args, "--frame");

    let mut sim = match Simulation::new(&config, TerrainConfig::default()) {
        Ok(sim) => sim,
        Err(err) => {
            error!("failed to build the world: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut controller = GenerationController::new(config);
    let run = controller.config();
    info!(
        "starting run: population={}, mutation_rate={}, max_generations={}",
        run.population_size, run.mutation_rate, run.max_generations
    );

    let status = loop {
        match controller.step(&mut sim) {
            Ok(StepOutcome::Running) | Ok(StepOutcome::GenerationComplete(_)) => {}
            Ok(StepOutcome::Finished) => break ExitCode::SUCCESS,
            Err(err) => {
                error!("run stopped: {err}");
                break ExitCode::FAILURE;
            }
        }
    };
    info!(
        "run ended after {} generations and {} ticks; best distance {:.2}",
        sim.generation(),
        sim.total_ticks(),
        sim.best_distance()
    );
    if let Some(leader) = sim.leading_car() {
        info!(
            "leading car: fitness={:.2}, chassis radius={:.3}m, wheels={:?}",
            leader.fitness,
            leader.genome.chassis_radius(),
            leader.genome.wheel_sizes
        );
    }

    if let Some(path) = frame_path {
        if let Err(err) = write_frame(&sim, &path) {
            error!("{err}");
            return ExitCode::FAILURE;
        }
        info!("wrote final frame to {}", path.display());
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn flag_values_are_found_anywhere() {
        let args = args(&["evolution-cars", "--frame", "out.json", "--config", "run.json"]);
        assert_eq!(parse_flag(&args, "--config"), Some(PathBuf::from("run.json")));
        assert_eq!(parse_flag(&args, "--frame"), Some(PathBuf::from("out.json")));
    }

    #[test]
    fn trailing_flag_without_value_is_ignored() {
        assert_eq!(parse_flag(&args(&["evolution-cars", "--config"]), "--config"), None);
    }

    #[test]
    fn missing_config_file_is_a_read_error() {
        let err = load_config(Some(Path::new("/nonexistent/run.json"))).unwrap_err();
        assert!(matches!(err, RunnerError::Read { .. }));
    }

    #[test]
    fn unwritable_frame_path_is_a_write_error() {
        let config = EvolutionConfig {
            population_size: 2,
            seed: Some(1),
            ..EvolutionConfig::default()
        };
        let sim = Simulation::new(&config, TerrainConfig::default()).unwrap();
        let err = write_frame(&sim, Path::new("/nonexistent/dir/frame.json")).unwrap_err();
        assert!(matches!(err, RunnerError::WriteFrame { .. }));
    }
}
