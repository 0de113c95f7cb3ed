use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_POPULATION_SIZE: usize = 10;
pub const DEFAULT_MUTATION_RATE: f32 = 0.2;
pub const DEFAULT_MAX_GENERATIONS: usize = 100;
pub const DEFAULT_CHASSIS_RADIUS_PX: f32 = 10.0;
pub const DEFAULT_WHEEL_RADIUS_PX: f32 = 10.0;

const ENV_POPULATION_SIZE: &str = "CARS_POPULATION_SIZE";
const ENV_MUTATION_RATE: &str = "CARS_MUTATION_RATE";
const ENV_MAX_GENERATIONS: &str = "CARS_MAX_GENERATIONS";
const ENV_CHASSIS_RADIUS: &str = "CARS_CHASSIS_RADIUS";
const ENV_WHEEL_RADIUS: &str = "CARS_WHEEL_RADIUS";
const ENV_SEED: &str = "CARS_SEED";
const ENV_GENERATION_TICK_LIMIT: &str = "CARS_GENERATION_TICK_LIMIT";

/// Run parameters supplied once at start.
///
/// Values are trusted as given: a zero population or a mutation rate outside
/// `[0, 1]` is not corrected here.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub mutation_rate: f32,
    pub max_generations: usize,
    /// Upper bound of a chassis vertex radius, in screen pixels.
    pub chassis_radius: f32,
    /// Upper bound of a wheel radius, in screen pixels.
    pub wheel_radius: f32,
    pub seed: Option<u64>,
    /// Ticks after which a generation is treated as stalled even if a car is
    /// still rolling forward.
    pub generation_tick_limit: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: DEFAULT_POPULATION_SIZE,
            mutation_rate: DEFAULT_MUTATION_RATE,
            max_generations: DEFAULT_MAX_GENERATIONS,
            chassis_radius: DEFAULT_CHASSIS_RADIUS_PX,
            wheel_radius: DEFAULT_WHEEL_RADIUS_PX,
            seed: None,
            generation_tick_limit: None,
        }
    }
}

impl EvolutionConfig {
    /// Defaults overlaid with any `CARS_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = resolve_env(ENV_POPULATION_SIZE) {
            config.population_size = value;
        }
        if let Some(value) = resolve_env(ENV_MUTATION_RATE) {
            config.mutation_rate = value;
        }
        if let Some(value) = resolve_env(ENV_MAX_GENERATIONS) {
            config.max_generations = value;
        }
        if let Some(value) = resolve_env(ENV_CHASSIS_RADIUS) {
            config.chassis_radius = value;
        }
        if let Some(value) = resolve_env(ENV_WHEEL_RADIUS) {
            config.wheel_radius = value;
        }
        if let Some(value) = resolve_env(ENV_SEED) {
            config.seed = Some(value);
        }
        if let Some(value) = resolve_env(ENV_GENERATION_TICK_LIMIT) {
            config.generation_tick_limit = Some(value);
        }
        config
    }
}

fn resolve_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw_value = std::env::var(name).ok()?;
    match raw_value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("{name} could not be parsed; got '{raw_value}'. Using default");
            None
        }
    }
}

/// Heightfield generation parameters. Lengths are in screen pixels unless
/// the name says otherwise; world metres are pixels / `pixels_per_meter`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TerrainConfig {
    pub pixels_per_meter: f32,
    pub viewport_width: u32,
    pub viewport_height: f32,
    /// Noise coordinate advance per column on flat, early terrain.
    pub noise_increment: f64,
    /// Difficulty gained per metre of terrain already generated.
    pub difficulty_per_meter: f32,
    /// Extra noise frequency per unit of difficulty.
    pub frequency_per_difficulty: f64,
    pub noise_seed: u64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            pixels_per_meter: 30.0,
            viewport_width: 800,
            viewport_height: 400.0,
            noise_increment: 0.0035,
            difficulty_per_meter: 0.004,
            frequency_per_difficulty: 0.0005,
            noise_seed: 0,
        }
    }
}
