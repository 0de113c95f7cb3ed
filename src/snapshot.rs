use serde::Serialize;

use crate::car::Car;
use crate::physics::PhysicsWorld;
use crate::simulation::Simulation;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColliderShape {
    /// Chassis outline in body-local metres.
    Polygon { vertices: Vec<[f32; 2]> },
    Circle { radius: f32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPose {
    pub p: [f32; 2],
    pub angle: f32,
    pub shape: ColliderShape,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarFrame {
    pub fitness: f32,
    pub chassis: BodyPose,
    pub wheels: Vec<BodyPose>,
}

/// Everything a renderer needs to draw one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationFrame {
    pub generation: usize,
    pub tick: u64,
    pub best_distance: f32,
    pub leading_distance: f32,
    pub terrain: Vec<[f32; 2]>,
    pub cars: Vec<CarFrame>,
}

impl Simulation {
    pub fn frame(&self) -> SimulationFrame {
        SimulationFrame {
            generation: self.generation(),
            tick: self.generation_ticks(),
            best_distance: self.best_distance(),
            leading_distance: self.leading_distance(),
            terrain: self.terrain.vertices().to_vec(),
            cars: self
                .population
                .cars
                .iter()
                .filter_map(|car| car_frame(car, &self.physics))
                .collect(),
        }
    }
}

fn car_frame(car: &Car, physics: &PhysicsWorld) -> Option<CarFrame> {
    let chassis = pose(
        physics,
        car.chassis,
        ColliderShape::Polygon {
            vertices: car.genome.chassis_vertices.clone(),
        },
    )?;
    let wheels = car
        .wheels
        .iter()
        .zip(&car.genome.wheel_sizes)
        .filter_map(|(&handle, &radius)| pose(physics, handle, ColliderShape::Circle { radius }))
        .collect();
    Some(CarFrame {
        fitness: car.fitness,
        chassis,
        wheels,
    })
}

fn pose(
    physics: &PhysicsWorld,
    handle: rapier2d::prelude::RigidBodyHandle,
    shape: ColliderShape,
) -> Option<BodyPose> {
    let body = physics.body(handle)?;
    let p = body.translation();
    Some(BodyPose {
        p: [p.x, p.y],
        angle: body.rotation().angle(),
        shape,
    })
}
