use rapier2d::prelude::*;
use thiserror::Error;

use crate::genome::Genome;
use crate::physics::{FIXED_SIM_DT, PhysicsWorld, car_collision_groups};
use crate::terrain::Terrain;

pub const SPAWN_X_PX: f32 = 100.0;
pub const SPAWN_CLEARANCE_PX: f32 = 20.0;
pub const CHASSIS_ANGULAR_DAMPING: f32 = 5.0;
pub const CHASSIS_DENSITY: f32 = 1.0;
pub const CHASSIS_FRICTION: f32 = 0.3;
pub const WHEEL_DENSITY: f32 = 1.0;
pub const WHEEL_FRICTION: f32 = 0.9;
pub const WHEEL_RESTITUTION: f32 = 0.1;
pub const DRIVE_FORCE: f32 = 3.0;
/// Matches a 4 N push held for a single timestep.
pub const INITIAL_PUSH_IMPULSE: f32 = 4.0 * FIXED_SIM_DT;
const MIN_CHASSIS_AREA: f32 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("chassis needs at least 3 vertices, got {count}")]
    TooFewVertices { count: usize },
    #[error("chassis polygon is degenerate (area {area})")]
    DegenerateChassis { area: f32 },
    #[error("{sizes} wheel sizes do not match {positions} wheel positions")]
    MismatchedWheels { sizes: usize, positions: usize },
}

/// One live individual: its physics handles, current fitness and genome.
#[derive(Clone, Debug)]
pub struct Car {
    pub chassis: RigidBodyHandle,
    pub wheels: Vec<RigidBodyHandle>,
    pub fitness: f32,
    pub genome: Genome,
}

impl Car {
    /// World position of the chassis origin.
    pub fn position(&self, physics: &PhysicsWorld) -> Option<[f32; 2]> {
        let body = physics.body(self.chassis)?;
        let t = body.translation();
        Some([t.x, t.y])
    }

    pub fn horizontal_velocity(&self, physics: &PhysicsWorld) -> f32 {
        physics
            .body(self.chassis)
            .map(|body| body.linvel().x)
            .unwrap_or(0.0)
    }

    /// Pushes the chassis along its current heading. Replaces the force from
    /// the previous tick rather than accumulating on top of it.
    pub fn apply_drive(&self, physics: &mut PhysicsWorld, force: f32) {
        if let Some(body) = physics.body_mut(self.chassis) {
            let heading = *body.rotation() * vector![1.0, 0.0];
            body.reset_forces(true);
            body.add_force(heading * force, true);
        }
    }

    /// Spins each wheel so its rim speed matches the chassis, clockwise for
    /// forward travel.
    pub fn sync_wheels(&self, physics: &mut PhysicsWorld) {
        let chassis_velocity = self.horizontal_velocity(physics);
        for (handle, radius) in self.wheels.iter().zip(&self.genome.wheel_sizes) {
            if *radius <= 0.0 {
                continue;
            }
            if let Some(wheel) = physics.body_mut(*handle) {
                wheel.set_angvel(-chassis_velocity / radius, true);
            }
        }
    }

    /// Removes the chassis and every wheel from the world.
    pub fn destroy(self, physics: &mut PhysicsWorld) {
        for wheel in self.wheels {
            physics.remove_body(wheel);
        }
        physics.remove_body(self.chassis);
    }
}

/// Instantaneous score: the chassis x scaled to display distance. A car that
/// rolls back loses what it had gained.
pub fn evaluate_fitness(car: &Car, physics: &PhysicsWorld, distance_scale: f32) -> f32 {
    car.position(physics)
        .map(|[x, _]| x * distance_scale)
        .unwrap_or(car.fitness)
}

/// Validates `genome` and, if it describes a buildable car, inserts its
/// chassis, wheels and pin joints at the spawn point above `terrain`.
pub fn build_car(
    genome: Genome,
    physics: &mut PhysicsWorld,
    terrain: &Terrain,
) -> Result<Car, BuildError> {
    let hull = chassis_collider(&genome)?;

    let ppm = terrain.config().pixels_per_meter;
    let spawn_x = SPAWN_X_PX / ppm;
    let spawn_y = terrain.height_at(spawn_x) + SPAWN_CLEARANCE_PX / ppm;

    let chassis = physics.bodies.insert(
        RigidBodyBuilder::dynamic()
            .translation(vector![spawn_x, spawn_y])
            .angular_damping(CHASSIS_ANGULAR_DAMPING)
            .build(),
    );
    physics
        .colliders
        .insert_with_parent(hull, chassis, &mut physics.bodies);

    let mut wheels = Vec::with_capacity(genome.wheel_sizes.len());
    for (&radius, &[dx, dy]) in genome.wheel_sizes.iter().zip(&genome.wheel_positions) {
        let wheel = physics.bodies.insert(
            RigidBodyBuilder::dynamic()
                .translation(vector![spawn_x + dx, spawn_y + dy])
                .build(),
        );
        let collider = ColliderBuilder::ball(radius)
            .density(WHEEL_DENSITY)
            .friction(WHEEL_FRICTION)
            .restitution(WHEEL_RESTITUTION)
            .collision_groups(car_collision_groups())
            .build();
        physics
            .colliders
            .insert_with_parent(collider, wheel, &mut physics.bodies);

        let joint = RevoluteJointBuilder::new()
            .local_anchor1(point![dx, dy])
            .local_anchor2(point![0.0, 0.0])
            .contacts_enabled(false);
        physics.impulse_joints.insert(chassis, wheel, joint, true);
        wheels.push(wheel);
    }

    if let Some(body) = physics.body_mut(chassis) {
        body.apply_impulse(vector![INITIAL_PUSH_IMPULSE, 0.0], true);
    }

    Ok(Car {
        chassis,
        wheels,
        fitness: 0.0,
        genome,
    })
}

fn chassis_collider(genome: &Genome) -> Result<Collider, BuildError> {
    let vertices = &genome.chassis_vertices;
    if vertices.len() < 3 {
        return Err(BuildError::TooFewVertices {
            count: vertices.len(),
        });
    }
    if genome.wheel_sizes.len() != genome.wheel_positions.len() {
        return Err(BuildError::MismatchedWheels {
            sizes: genome.wheel_sizes.len(),
            positions: genome.wheel_positions.len(),
        });
    }
    let area = polygon_area(vertices);
    if !area.is_finite() || area.abs() < MIN_CHASSIS_AREA {
        return Err(BuildError::DegenerateChassis { area });
    }

    let points: Vec<Point<Real>> = vertices.iter().map(|&[x, y]| point![x, y]).collect();
    let builder =
        ColliderBuilder::convex_hull(&points).ok_or(BuildError::DegenerateChassis { area })?;
    Ok(builder
        .density(CHASSIS_DENSITY)
        .friction(CHASSIS_FRICTION)
        .collision_groups(car_collision_groups())
        .build())
}

/// Signed shoelace area of a closed polygon.
fn polygon_area(vertices: &[[f32; 2]]) -> f32 {
    let mut twice_area = 0.0;
    for (i, [x1, y1]) in vertices.iter().enumerate() {
        let [x2, y2] = vertices[(i + 1) % vertices.len()];
        twice_area += x1 * y2 - x2 * y1;
    }
    twice_area * 0.5
}
