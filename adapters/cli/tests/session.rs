use std::time::Duration;

use glam::Vec2;
use marble_maze_cli::{
    simulate::{self, TiltScript},
    Session, SessionConfig, SessionError, SessionEvent,
};
use marble_maze_core::{Event, LevelError, LevelIndex, TileKind};
use marble_maze_physics::{ArcadePhysics, PhysicsWorld};
use marble_maze_system_controller::ControlInput;
use marble_maze_system_level_loader::{LevelLoader, MemorySource};
use marble_maze_world::query;

const FRAME: Duration = Duration::from_millis(10);

const STAR_SHAFT: &str = "xxx\nxpx\nxsx\nxxx\n";
const VORTEX_SHAFT: &str = "xxx\nxpx\nxvx\nxxx\n";
const FINISH_SHAFT: &str = "xxx\nxpx\nxfx\nxxx\n";
const TELEPORT_ROOM: &str = "xxxxx\nxp tx\nxt  x\nxxxxx\n";
const CORRIDOR: &str = "xxxxx\nx p x\nxxxxx\n";
const OPEN_ROOM: &str = "xxxxx\nx   x\nx p x\nx   x\nxxxxx\n";

type TestSession = Session<MemorySource, ArcadePhysics>;

fn start(levels: &[&str]) -> TestSession {
    let source = levels
        .iter()
        .enumerate()
        .fold(MemorySource::new(), |source, (index, text)| {
            source.with_level(LevelIndex::new(index as u32 + 1), *text)
        });
    Session::start(
        LevelLoader::new(source),
        ArcadePhysics::default(),
        SessionConfig::default(),
        LevelIndex::FIRST,
    )
    .expect("session starts")
}

fn run(session: &mut TestSession, seconds: f32, input: ControlInput) -> Vec<SessionEvent> {
    let frames = (seconds * 100.0).round() as usize;
    let mut events = Vec::new();
    for _ in 0..frames {
        events.extend(session.frame(FRAME, input).expect("frame"));
    }
    events
}

/// Board tipped so the marble rolls towards the bottom of the screen at 10 m/s².
fn downhill() -> ControlInput {
    ControlInput::tilt(Vec2::new(-0.2, 0.0))
}

fn position_of(events: &[SessionEvent], wanted: impl Fn(&Event) -> bool) -> Option<usize> {
    events.iter().position(|event| match event {
        SessionEvent::World(event) => wanted(event),
        SessionEvent::CampaignCompleted { .. } => false,
    })
}

#[test]
fn start_materialises_level_and_player() {
    let session = start(&[STAR_SHAFT]);

    let player = query::player(session.world()).expect("player");
    assert_eq!(player.position(), Vec2::new(96.0, 160.0));
    assert!(player.dynamic);
    assert_eq!(query::count(session.world(), TileKind::Wall), 10);
    assert_eq!(session.physics().body_count(), 12);
    assert_eq!(session.state().score, 0);
    assert!(!session.is_completed());
}

#[test]
fn missing_first_level_fails_to_start() {
    let result = Session::start(
        LevelLoader::new(MemorySource::new()),
        ArcadePhysics::default(),
        SessionConfig::default(),
        LevelIndex::FIRST,
    );

    assert!(matches!(
        result,
        Err(SessionError::Level(LevelError::ResourceNotFound { .. }))
    ));
}

#[test]
fn falling_onto_a_star_collects_it_once() {
    let mut session = start(&[STAR_SHAFT]);

    let events = run(&mut session, 0.5, downhill());

    assert_eq!(session.state().score, 1);
    assert_eq!(query::count(session.world(), TileKind::Star), 0);
    assert_eq!(session.physics().body_count(), 11);
    let collected = events
        .iter()
        .filter(|event| {
            matches!(
                event,
                SessionEvent::World(Event::EntityRemoved {
                    kind: TileKind::Star,
                    ..
                })
            )
        })
        .count();
    assert_eq!(collected, 1);
    let resting = session.player_position().expect("player");
    assert!(resting.y > 90.0 && resting.y < 100.0, "marble at {resting}");
}

#[test]
fn vortex_swallows_the_marble_and_respawns_it_at_the_start() {
    let mut session = start(&[VORTEX_SHAFT]);
    let original = session.player().expect("player");

    let early = run(&mut session, 0.3, downhill());
    assert_eq!(session.state().score, -1);
    assert!(session.state().is_game_over);
    assert_eq!(session.player(), Some(original));
    assert!(!query::player(session.world()).expect("player").dynamic);
    assert!(position_of(&early, |event| *event == Event::ScoreChanged { score: -1 }).is_some());

    let late = run(&mut session, 0.4, downhill());
    let removed = position_of(&late, |event| {
        *event
            == Event::EntityRemoved {
                entity: original,
                kind: TileKind::Player,
            }
    })
    .expect("old marble removed");
    let start = Vec2::new(96.0, 160.0);
    let spawned = position_of(&late, |event| {
        matches!(event, Event::PlayerSpawned { entity } if entity.position() == start)
    })
    .expect("new marble spawned");
    let cleared = position_of(&late, |event| {
        *event == Event::GameOverChanged {
            is_game_over: false,
        }
    })
    .expect("gate lifted");

    assert!(removed < spawned && spawned < cleared);
    assert_eq!(query::count(session.world(), TileKind::Player), 1);
    assert_ne!(session.player(), Some(original));
}

#[test]
fn teleport_moves_the_marble_to_the_paired_pad() {
    let mut session = start(&[TELEPORT_ROOM]);
    let pads = query::registry(session.world()).teleports().to_vec();
    assert_eq!(pads[0].position, Vec2::new(96.0, 96.0));
    assert_eq!(pads[1].position, Vec2::new(224.0, 160.0));

    let events = run(&mut session, 1.2, downhill());

    let closed = position_of(&events, |event| *event == Event::TeleportsChanged { open: false })
        .expect("teleports closed");
    let opened = position_of(&events, |event| *event == Event::TeleportsChanged { open: true })
        .expect("teleports reopened");
    assert!(closed < opened);
    let transitions = events
        .iter()
        .filter(|event| matches!(event, SessionEvent::World(Event::TeleportsChanged { .. })))
        .count();
    assert_eq!(transitions, 2);

    let player = query::player(session.world()).expect("player");
    assert!((player.position().x - 224.0).abs() < 1e-3, "marble at {}", player.position());
    assert!(player.position().y < 160.0);
    assert!((player.transform.alpha - 1.0).abs() < 1e-6);
    assert!(player.dynamic);
    assert!(session.state().teleports_open);
    assert_eq!(session.state().score, 0);
}

#[test]
fn finishing_advances_and_respawns_after_a_delay() {
    let mut session = start(&[FINISH_SHAFT, CORRIDOR]);

    let events = run(&mut session, 0.8, downhill());
    assert!(position_of(&events, |event| {
        *event
            == Event::LevelLoaded {
                level: LevelIndex::new(2),
                tiles: 12,
            }
    })
    .is_some());
    assert!(session.state().is_game_over);
    assert!(session.player().is_none());

    let _ = run(&mut session, 0.7, downhill());
    let state = session.state();
    assert_eq!(state.current_level, LevelIndex::new(2));
    assert!(!state.is_game_over);
    let player = session.player_position().expect("player respawned");
    assert!((player.x - 160.0).abs() < 1e-3);
    assert_eq!(session.physics().body_count(), 13);
}

#[test]
fn finishing_the_last_level_completes_the_campaign_and_freezes() {
    let mut session = start(&[FINISH_SHAFT]);

    let events = run(&mut session, 1.0, downhill());

    let completions: Vec<&SessionEvent> = events
        .iter()
        .filter(|event| matches!(event, SessionEvent::CampaignCompleted { .. }))
        .collect();
    assert_eq!(
        completions,
        vec![&SessionEvent::CampaignCompleted {
            score: 0,
            last_level: LevelIndex::FIRST,
        }]
    );
    assert!(session.is_completed());
    assert!(session.state().is_game_over);
    assert!(session.player().is_none());
    assert!(session
        .frame(FRAME, ControlInput::tilt(Vec2::new(1.0, 0.0)))
        .expect("frozen frame")
        .is_empty());
}

#[test]
fn marble_stays_put_on_a_level_board() {
    let mut session = start(&[OPEN_ROOM]);
    let origin = session.player_position().expect("player");

    let events = run(&mut session, 0.5, ControlInput::default());

    assert!(events.is_empty());
    assert_eq!(session.physics().gravity(), Vec2::ZERO);
    let resting = session.player_position().expect("player");
    assert!(resting.distance(origin) < 1e-3, "marble drifted to {resting}");
}

#[test]
fn stalled_frame_does_not_bounce_the_marble_back_through_the_pair() {
    let mut session = start(&[TELEPORT_ROOM]);
    let departed = |events: &[SessionEvent]| {
        position_of(events, |event| *event == Event::TeleportsChanged { open: false }).is_some()
    };
    let mut events = Vec::new();
    for _ in 0..100 {
        if departed(&events) {
            break;
        }
        events.extend(session.frame(FRAME, downhill()).expect("frame"));
    }
    assert!(departed(&events), "marble never reached the teleport");

    events.extend(
        session
            .frame(Duration::from_millis(700), downhill())
            .expect("stalled frame"),
    );
    assert!(session.state().teleports_open);
    events.extend(run(&mut session, 0.05, downhill()));

    let departures = events
        .iter()
        .filter(|event| **event == SessionEvent::World(Event::TeleportsChanged { open: false }))
        .count();
    assert_eq!(departures, 1);
    assert!(session.state().teleports_open);
    let player = session.player_position().expect("player");
    assert!((player.x - 224.0).abs() < 1e-3, "marble at {player}");
}

#[test]
fn pointer_drags_the_marble_towards_it() {
    let mut session = start(&[CORRIDOR]);
    let _ = run(&mut session, 0.3, ControlInput::default());
    let before = session.player_position().expect("player");

    let _ = run(&mut session, 0.5, ControlInput::pointer(Vec2::new(220.0, 96.0)));

    let after = session.player_position().expect("player");
    assert!(after.x > before.x + 5.0, "marble moved from {before} to {after}");
    assert!(session.physics().gravity().x > 0.0);
}

#[test]
fn scripted_runs_replay_identically() {
    let levels = [TELEPORT_ROOM, STAR_SHAFT, VORTEX_SHAFT];
    let script: TiltScript = "0.3,0@0.5 0,-0.3@0.5 -0.3,0@0.5 0,0.3@0.5"
        .parse()
        .expect("script");

    let record = || {
        let mut session = start(&levels);
        let mut log = Vec::new();
        let summary = simulate::run(&mut session, &script, FRAME, 600, |events| {
            log.extend_from_slice(events)
        })
        .expect("run");
        (log, summary, session.state())
    };

    let (first_log, first_summary, first_state) = record();
    let (second_log, second_summary, second_state) = record();

    assert!(!first_log.is_empty());
    assert_eq!(first_log, second_log);
    assert_eq!(first_summary, second_summary);
    assert_eq!(first_state, second_state);
    assert_eq!(first_summary.frames, 600);
}
