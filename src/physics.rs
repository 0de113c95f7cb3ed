use rapier2d::prelude::*;
use thiserror::Error;

pub const FIXED_SIM_DT: f32 = 1.0 / 60.0;
pub const GRAVITY_Y: f32 = -10.0;
pub const GROUND_FRICTION: f32 = 0.6;
pub const CAR_COLLISION_GROUP: Group = Group::GROUP_2;
pub const TERRAIN_COLLISION_GROUP: Group = Group::GROUP_3;

#[derive(Debug, Error, PartialEq)]
pub enum GroundError {
    #[error("ground needs at least 2 terrain vertices, got {count}")]
    TooFewVertices { count: usize },
}

/// Collision filter for every car part: touches terrain only.
pub fn car_collision_groups() -> InteractionGroups {
    InteractionGroups::new(
        CAR_COLLISION_GROUP,
        TERRAIN_COLLISION_GROUP,
        InteractionTestMode::And,
    )
}

fn terrain_collision_groups() -> InteractionGroups {
    InteractionGroups::new(
        TERRAIN_COLLISION_GROUP,
        CAR_COLLISION_GROUP,
        InteractionTestMode::And,
    )
}

/// The single rapier world shared by every car and the ground.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    pub(crate) impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    ground: Option<RigidBodyHandle>,
    steps: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = FIXED_SIM_DT;

        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, GRAVITY_Y],
            integration_parameters,
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            ground: None,
            steps: 0,
        }
    }

    /// Advances every body by one fixed timestep.
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.steps += 1;
    }

    /// Number of completed `step` calls.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Replaces the ground body with one polyline collider through `vertices`.
    pub fn rebuild_ground(&mut self, vertices: &[[f32; 2]]) -> Result<(), GroundError> {
        if vertices.len() < 2 {
            return Err(GroundError::TooFewVertices {
                count: vertices.len(),
            });
        }
        if let Some(previous) = self.ground.take() {
            self.remove_body(previous);
        }

        let points = vertices.iter().map(|&[x, y]| point![x, y]).collect();
        let ground = self.bodies.insert(RigidBodyBuilder::fixed().build());
        let collider = ColliderBuilder::polyline(points, None)
            .friction(GROUND_FRICTION)
            .collision_groups(terrain_collision_groups())
            .build();
        self.colliders.insert_with_parent(collider, ground, &mut self.bodies);
        self.ground = Some(ground);
        Ok(())
    }

    pub fn ground(&self) -> Option<RigidBodyHandle> {
        self.ground
    }

    /// Removes a body along with its colliders and joints.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
