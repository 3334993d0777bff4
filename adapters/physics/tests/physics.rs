use std::time::Duration;

use glam::Vec2;
use marble_maze_core::{EntityId, TileKind};
use marble_maze_physics::{
    ArcadePhysics, BodyDescriptor, Collider, ContactBegin, PhysicsConfig, PhysicsWorld,
    DEFAULT_GRAVITY,
};

const FRAME: Duration = Duration::from_millis(10);
const EARTH: Vec2 = Vec2::new(0.0, -9.8);

fn body(kind: TileKind, position: Vec2, dynamic: bool) -> BodyDescriptor {
    let collider = match kind {
        TileKind::Wall => Collider::Rectangle {
            half_extents: Vec2::splat(32.0),
        },
        TileKind::Player => Collider::Circle { radius: 30.0 },
        _ => Collider::Circle { radius: 32.0 },
    };
    BodyDescriptor {
        collider,
        position,
        masks: kind.masks().expect("materialised kind"),
        dynamic,
        linear_damping: 0.5,
    }
}

fn run(physics: &mut ArcadePhysics, frames: usize) -> Vec<ContactBegin> {
    let mut contacts = Vec::new();
    for _ in 0..frames {
        physics.step(FRAME, &mut contacts);
    }
    contacts
}

#[test]
fn level_board_leaves_the_ball_in_place() {
    let mut physics = ArcadePhysics::default();
    let ball = EntityId::new(1);
    physics
        .create_body(ball, body(TileKind::Player, Vec2::new(100.0, 500.0), true))
        .expect("ball");

    let _ = run(&mut physics, 30);

    assert_eq!(physics.gravity(), DEFAULT_GRAVITY);
    let position = physics.position(ball).expect("ball position");
    assert!(position.distance(Vec2::new(100.0, 500.0)) < 1e-3, "ball at {position}");
}

#[test]
fn dynamic_body_falls_when_the_board_tips() {
    let mut physics = ArcadePhysics::default();
    let ball = EntityId::new(1);
    physics
        .create_body(ball, body(TileKind::Player, Vec2::new(100.0, 500.0), true))
        .expect("ball");
    physics.set_gravity(EARTH);

    let _ = run(&mut physics, 30);

    let position = physics.position(ball).expect("ball position");
    assert!(position.y < 500.0);
    assert!((position.x - 100.0).abs() < 1e-3);
    assert!(physics.velocity(ball).expect("velocity").y < 0.0);
}

#[test]
fn walls_block_the_ball_and_report_the_contact() {
    let mut physics = ArcadePhysics::new(PhysicsConfig {
        restitution: 0.0,
        ..PhysicsConfig::default()
    });
    let wall = EntityId::new(0);
    let ball = EntityId::new(1);
    physics
        .create_body(wall, body(TileKind::Wall, Vec2::new(32.0, 32.0), false))
        .expect("wall");
    physics
        .create_body(ball, body(TileKind::Player, Vec2::new(32.0, 95.0), true))
        .expect("ball");
    physics.set_gravity(EARTH);

    let contacts = run(&mut physics, 200);

    let resting = physics.position(ball).expect("ball position");
    assert!(resting.y > 90.0 && resting.y < 100.0, "ball at {resting}");
    assert_eq!(contacts.first(), Some(&ContactBegin { a: wall, b: ball }));
    assert!(contacts.iter().all(|contact| contact.other(ball) == Some(wall)));
}

#[test]
fn overlap_reports_contact_once_until_separated() {
    let mut physics = ArcadePhysics::default();
    let ball = EntityId::new(1);
    let star = EntityId::new(2);
    physics
        .create_body(ball, body(TileKind::Player, Vec2::new(100.0, 100.0), true))
        .expect("ball");
    physics
        .create_body(star, body(TileKind::Star, Vec2::new(400.0, 100.0), false))
        .expect("star");

    assert!(run(&mut physics, 1).is_empty());

    physics.set_position(ball, Vec2::new(390.0, 100.0));
    assert_eq!(run(&mut physics, 1), vec![ContactBegin { a: ball, b: star }]);

    physics.set_position(ball, Vec2::new(395.0, 100.0));
    assert!(run(&mut physics, 3).is_empty());

    physics.set_position(ball, Vec2::new(100.0, 100.0));
    assert!(run(&mut physics, 1).is_empty());

    physics.set_position(ball, Vec2::new(400.0, 100.0));
    assert_eq!(run(&mut physics, 1), vec![ContactBegin { a: ball, b: star }]);
}

#[test]
fn frozen_ball_still_reports_the_tiles_it_is_moved_onto() {
    let mut physics = ArcadePhysics::default();
    let ball = EntityId::new(1);
    let pad = EntityId::new(2);
    physics
        .create_body(ball, body(TileKind::Player, Vec2::new(100.0, 100.0), true))
        .expect("ball");
    physics
        .create_body(pad, body(TileKind::Teleport, Vec2::new(300.0, 100.0), false))
        .expect("pad");
    physics.set_dynamic(ball, false);

    physics.set_position(ball, Vec2::new(300.0, 100.0));

    assert_eq!(run(&mut physics, 1), vec![ContactBegin { a: ball, b: pad }]);
}

#[test]
fn marked_overlap_is_not_reported_as_new() {
    let mut physics = ArcadePhysics::default();
    let ball = EntityId::new(1);
    let pad = EntityId::new(2);
    physics
        .create_body(ball, body(TileKind::Player, Vec2::new(100.0, 100.0), true))
        .expect("ball");
    physics
        .create_body(pad, body(TileKind::Teleport, Vec2::new(300.0, 100.0), false))
        .expect("pad");
    assert!(run(&mut physics, 1).is_empty());

    physics.set_position(ball, Vec2::new(300.0, 100.0));
    assert!(physics.mark_touching(ball, pad));
    assert!(run(&mut physics, 3).is_empty());

    physics.set_position(ball, Vec2::new(100.0, 100.0));
    let _ = run(&mut physics, 1);
    physics.set_position(ball, Vec2::new(300.0, 100.0));
    assert_eq!(run(&mut physics, 1), vec![ContactBegin { a: ball, b: pad }]);
}

#[test]
fn tiles_that_do_not_report_each_other_stay_silent() {
    let mut physics = ArcadePhysics::default();
    physics
        .create_body(EntityId::new(0), body(TileKind::Wall, Vec2::new(32.0, 32.0), false))
        .expect("wall");
    physics
        .create_body(EntityId::new(1), body(TileKind::Wall, Vec2::new(96.0, 32.0), false))
        .expect("wall");
    physics
        .create_body(EntityId::new(2), body(TileKind::Star, Vec2::new(64.0, 32.0), false))
        .expect("star");
    physics
        .create_body(EntityId::new(3), body(TileKind::Vortex, Vec2::new(64.0, 40.0), false))
        .expect("vortex");

    assert!(run(&mut physics, 5).is_empty());
}

#[test]
fn removed_bodies_forget_their_contacts() {
    let mut physics = ArcadePhysics::default();
    let star = EntityId::new(0);
    physics
        .create_body(star, body(TileKind::Star, Vec2::new(100.0, 100.0), false))
        .expect("star");
    physics
        .create_body(EntityId::new(1), body(TileKind::Player, Vec2::new(100.0, 100.0), true))
        .expect("first ball");
    assert_eq!(run(&mut physics, 1).len(), 1);

    assert!(physics.remove_body(EntityId::new(1)));
    assert!(!physics.remove_body(EntityId::new(1)));
    physics
        .create_body(EntityId::new(2), body(TileKind::Player, Vec2::new(100.0, 100.0), true))
        .expect("second ball");

    assert_eq!(
        run(&mut physics, 1),
        vec![ContactBegin {
            a: star,
            b: EntityId::new(2)
        }]
    );
    assert_eq!(physics.body_count(), 2);
}

#[test]
fn disabling_dynamics_freezes_the_body() {
    let mut physics = ArcadePhysics::default();
    let ball = EntityId::new(1);
    physics
        .create_body(ball, body(TileKind::Player, Vec2::new(100.0, 500.0), true))
        .expect("ball");
    physics.set_gravity(EARTH);
    let _ = run(&mut physics, 10);

    physics.set_dynamic(ball, false);
    let frozen = physics.position(ball).expect("position");
    let _ = run(&mut physics, 10);

    assert_eq!(physics.position(ball), Some(frozen));
    assert_eq!(physics.velocity(ball), Some(Vec2::ZERO));
}

#[test]
fn gravity_is_scaled_by_points_per_metre() {
    let config = PhysicsConfig {
        points_per_metre: 100.0,
        restitution: 0.0,
    };
    let mut physics = ArcadePhysics::new(config);
    let ball = EntityId::new(1);
    let mut descriptor = body(TileKind::Player, Vec2::ZERO, true);
    descriptor.linear_damping = 0.0;
    physics.create_body(ball, descriptor).expect("ball");
    physics.set_gravity(Vec2::new(1.0, 0.0));
    assert_eq!(physics.gravity(), Vec2::new(1.0, 0.0));

    let mut contacts = Vec::new();
    physics.step(Duration::from_millis(50), &mut contacts);

    let velocity = physics.velocity(ball).expect("velocity");
    assert!(velocity.x > 4.0 && velocity.x < 5.1, "velocity {velocity}");
    assert!(velocity.y.abs() < 1e-4);
}

#[test]
fn long_frames_are_capped() {
    let mut physics = ArcadePhysics::new(PhysicsConfig {
        points_per_metre: 100.0,
        restitution: 0.0,
    });
    let ball = EntityId::new(1);
    let mut descriptor = body(TileKind::Player, Vec2::ZERO, true);
    descriptor.linear_damping = 0.0;
    physics.create_body(ball, descriptor).expect("ball");
    physics.set_gravity(Vec2::new(1.0, 0.0));

    let mut contacts = Vec::new();
    physics.step(Duration::from_secs(2), &mut contacts);

    let velocity = physics.velocity(ball).expect("velocity");
    assert!(velocity.x <= 100.0 * 8.0 / 120.0 + 1e-3, "velocity {velocity}");
}
