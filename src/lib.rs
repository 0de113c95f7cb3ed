//! Genetic search over 2D car designs driven across procedural terrain.
//!
//! A [`Simulation`] owns the physics world, the terrain and the current
//! population. A [`GenerationController`] advances it one tick at a time and
//! breeds the next generation once every car has stopped moving forward.

pub mod car;
pub mod config;
pub mod controller;
pub mod genome;
pub mod physics;
pub mod reproduction;
pub mod selection;
pub mod simulation;
pub mod snapshot;
pub mod terrain;

pub use car::{BuildError, Car, build_car, evaluate_fitness};
pub use config::{EvolutionConfig, TerrainConfig};
pub use controller::{ControllerError, GenerationController, GenerationSummary, Phase, StepOutcome};
pub use genome::{Genome, GenomeBounds, random_genome};
pub use physics::{GroundError, PhysicsWorld};
pub use reproduction::{crossover, mutate};
pub use selection::{breeding_pool, rank_by_fitness};
pub use simulation::{Population, Simulation};
pub use snapshot::{BodyPose, CarFrame, ColliderShape, SimulationFrame};
pub use terrain::{NoiseSource, PerlinNoise, Terrain};
