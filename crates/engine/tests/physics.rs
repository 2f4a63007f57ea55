//! Entity physics against a static block layout.

use std::collections::HashSet;

use glam::DVec3;
use uuid::Uuid;
use voxelcraft_engine::entity::physics::{self, MoveInput, MAX_STEP};
use voxelcraft_engine::entity::Entity;
use voxelcraft_engine::world::position::BlockPos;
use voxelcraft_engine::world::BlockSource;
use voxelcraft_engine::StateId;

#[derive(Default)]
struct Layout(HashSet<BlockPos>);

impl Layout {
    fn with_floor(mut self) -> Self {
        for x in -8..8 {
            for z in -8..8 {
                self.0.insert(BlockPos::new(x, 0, z));
            }
        }
        self
    }

    fn with_wall_at_x(mut self, x: i32) -> Self {
        for y in 1..4 {
            for z in -8..8 {
                self.0.insert(BlockPos::new(x, y, z));
            }
        }
        self
    }
}

impl BlockSource for Layout {
    fn block(&self, pos: BlockPos) -> StateId {
        if self.0.contains(&pos) { StateId(1) } else { StateId::AIR }
    }

    fn is_solid(&self, pos: BlockPos) -> bool {
        self.0.contains(&pos)
    }
}

fn grounded_player(at: DVec3) -> Entity {
    let mut e = Entity::player(Uuid::nil(), "steve", at);
    e.physics.as_mut().unwrap().on_ground = true;
    e
}

#[test]
fn resting_entity_stays_put() {
    let blocks = Layout::default().with_floor();
    let mut e = grounded_player(DVec3::new(0.5, 1.0, 0.5));

    physics::apply_input(&mut e, MoveInput::default(), 20, 0.05);
    let moved = physics::step(&mut e, &blocks, 0.05);

    assert!(!moved);
    assert_eq!(e.position().y, 1.0);
    assert!(e.on_ground());
    assert_eq!(e.physics.unwrap().velocity.y, 0.0);
}

#[test]
fn identical_runs_are_identical() {
    let blocks = Layout::default().with_floor().with_wall_at_x(3);
    let run = || {
        let mut e = grounded_player(DVec3::new(0.5, 1.0, 0.5));
        e.transform.yaw = -60.0;
        for tick in 0..60 {
            let input = MoveInput {
                forward: 1.0,
                strafe: if tick % 7 < 3 { 0.5 } else { 0.0 },
                jump: tick % 15 == 0,
                sprint: tick > 20,
            };
            physics::apply_input(&mut e, input, 20, 0.05);
            physics::step(&mut e, &blocks, 0.05);
        }
        (e.position(), e.physics.unwrap().velocity, e.on_ground())
    };
    assert_eq!(run(), run());
}

#[test]
fn oversized_delta_is_clamped() {
    let blocks = Layout::default().with_floor();
    let mut a = Entity::creature(Uuid::nil(), DVec3::new(0.5, 10.0, 0.5));
    let mut b = Entity::creature(Uuid::nil(), DVec3::new(0.5, 10.0, 0.5));
    physics::step(&mut a, &blocks, 2.5);
    physics::step(&mut b, &blocks, MAX_STEP);
    assert_eq!(a.position(), b.position());
    assert_eq!(a.physics.unwrap().velocity, b.physics.unwrap().velocity);
}

#[test]
fn diagonal_motion_slides_along_a_wall() {
    let blocks = Layout::default().with_floor().with_wall_at_x(2);
    let mut e = grounded_player(DVec3::new(1.5, 1.0, 0.5));
    e.physics.as_mut().unwrap().velocity = DVec3::new(10.0, 0.0, 10.0);

    let start = e.position();
    assert!(physics::step(&mut e, &blocks, 0.05));
    let end = e.position();

    // Blocked on x: flush against the wall face, velocity cancelled.
    assert!((end.x - 1.7).abs() < 1e-9, "x = {}", end.x);
    assert_eq!(e.physics.unwrap().velocity.x, 0.0);
    // Free on z.
    assert!(end.z - start.z > 0.4, "z moved {}", end.z - start.z);
    assert!(e.on_ground());
}

#[test]
fn walking_into_a_wall_never_tunnels() {
    let blocks = Layout::default().with_floor().with_wall_at_x(2);
    let mut e = grounded_player(DVec3::new(0.5, 1.0, 0.5));
    // yaw -90 faces +x.
    e.transform.yaw = -90.0;
    let input = MoveInput { forward: 1.0, sprint: true, ..Default::default() };
    for _ in 0..100 {
        physics::apply_input(&mut e, input, 20, 0.05);
        physics::step(&mut e, &blocks, 0.05);
        assert!(e.position().x <= 1.7 + 1e-9);
    }
    assert!(e.position().x > 1.6);
    assert_eq!(e.position().y, 1.0);
}

#[test]
fn jump_leaves_and_returns_to_ground() {
    let blocks = Layout::default().with_floor();
    let mut e = grounded_player(DVec3::new(0.5, 1.0, 0.5));
    physics::apply_input(&mut e, MoveInput { jump: true, ..Default::default() }, 20, 0.05);
    physics::step(&mut e, &blocks, 0.05);
    assert!(!e.on_ground());
    assert!(e.position().y > 1.0);

    let mut peak = e.position().y;
    for _ in 0..40 {
        physics::step(&mut e, &blocks, 0.05);
        peak = peak.max(e.position().y);
    }
    assert!(peak > 1.8);
    assert!(e.on_ground());
    assert!((e.position().y - 1.0).abs() < 1e-9);
}

#[test]
fn ground_friction_stops_a_sliding_entity() {
    let blocks = Layout::default().with_floor();
    let mut e = grounded_player(DVec3::new(0.5, 1.0, 0.5));
    e.physics.as_mut().unwrap().velocity = DVec3::new(4.0, 0.0, 0.0);
    for _ in 0..60 {
        physics::step(&mut e, &blocks, 0.05);
    }
    assert!(e.physics.unwrap().velocity.x.abs() < 1e-6);
    assert!(e.position().x > 0.5);
}
