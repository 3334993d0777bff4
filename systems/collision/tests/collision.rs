use std::time::Duration;

use glam::Vec2;
use marble_maze_core::{
    Action, CellSize, Command, Completion, Effect, EntitySnapshot, Event, GameState, LevelIndex,
    RegistryError, TileKind,
};
use marble_maze_system_collision::{CollisionResponder, Contact, ResponderConfig, SHRUNK_SCALE};
use marble_maze_system_level_loader::parse_layout;
use marble_maze_world::{self as world, query, EntityRegistry, TeleportPad, World};

const MAZE: &str = "\
xxxxxx
xt s x
x v  x
xp tfx
xxxxxx
";

fn load_world(text: &str) -> World {
    let layout = parse_layout(LevelIndex::FIRST, text, CellSize::DEFAULT).expect("valid level");
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(&mut world, Command::LoadLevel { layout }, &mut events);
    world::apply(&mut world, Command::SpawnPlayer, &mut events);
    assert!(world::rejection(&events).is_none(), "level rejected");
    world
}

fn first_of(world: &World, kind: TileKind) -> EntitySnapshot {
    query::entity_view(world)
        .iter()
        .copied()
        .find(|entity| entity.kind == kind)
        .unwrap_or_else(|| panic!("no {kind:?} in world"))
}

fn contact_with(world: &World, other: EntitySnapshot) -> Contact {
    Contact {
        player: query::player(world).expect("player").id,
        other,
    }
}

fn execute(world: &mut World, response: &marble_maze_system_collision::Response) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::UpdateGameState {
            state: response.state,
        },
        &mut events,
    );
    for effect in &response.effects {
        match effect {
            Effect::RemoveEntity(entity) => {
                world::apply(world, Command::RemoveEntity { entity: *entity }, &mut events)
            }
            Effect::SpawnPlayer => world::apply(world, Command::SpawnPlayer, &mut events),
            Effect::SetPlayerDynamic(dynamic) => world::apply(
                world,
                Command::SetPlayerDynamic { dynamic: *dynamic },
                &mut events,
            ),
            Effect::Animate { entity, action, .. } => {
                if contains_remove(action) {
                    world::apply(world, Command::RemoveEntity { entity: *entity }, &mut events);
                }
            }
            Effect::Delay { .. } | Effect::LoadLevel(_) => {}
        }
    }
    events
}

fn contains_remove(action: &Action) -> bool {
    match action {
        Action::Remove => true,
        Action::Sequence(actions) => actions.iter().any(contains_remove),
        _ => false,
    }
}

fn completions(response: &marble_maze_system_collision::Response) -> Vec<Completion> {
    response
        .effects
        .iter()
        .flat_map(|effect| match effect {
            Effect::Animate { then, .. } | Effect::Delay { then, .. } => then.clone(),
            _ => Vec::new(),
        })
        .collect()
}

#[test]
fn star_is_collected_exactly_once() {
    let mut world = load_world(MAZE);
    let responder = CollisionResponder::default();
    let star = first_of(&world, TileKind::Star);
    let state = query::game_state(&world);

    let response = responder
        .respond(contact_with(&world, star), state, query::registry(&world))
        .expect("star contact");

    assert_eq!(response.state.score, state.score + 1);
    assert_eq!(response.effects, vec![Effect::RemoveEntity(star.id)]);

    let events = execute(&mut world, &response);
    assert!(events.contains(&Event::ScoreChanged { score: 1 }));
    assert_eq!(query::count(&world, TileKind::Star), 0);
    assert!(query::entity(&world, star.id).is_none());
}

#[test]
fn vortex_kills_then_respawns_a_single_player() {
    let mut world = load_world(MAZE);
    let responder = CollisionResponder::default();
    let vortex = first_of(&world, TileKind::Vortex);
    let start = query::player(&world).expect("player").position();

    let response = responder
        .respond(
            contact_with(&world, vortex),
            query::game_state(&world),
            query::registry(&world),
        )
        .expect("vortex contact");

    assert_eq!(response.state.score, -1);
    assert!(response.state.is_game_over);
    assert_eq!(response.effects[0], Effect::SetPlayerDynamic(false));
    match &response.effects[1] {
        Effect::Animate { action, .. } => assert_eq!(
            action,
            &Action::Sequence(vec![
                Action::move_to(vortex.position(), Duration::from_millis(250)),
                Action::scale_to(SHRUNK_SCALE, Duration::from_millis(250)),
                Action::Remove,
            ])
        ),
        other => panic!("unexpected effect: {other:?}"),
    }

    let _ = execute(&mut world, &response);
    assert!(query::game_state(&world).is_game_over);
    assert_eq!(query::count(&world, TileKind::Player), 0);

    let mut state = query::game_state(&world);
    for completion in completions(&response) {
        let resolved = responder.resolve(completion, state);
        let _ = execute(&mut world, &resolved);
        state = query::game_state(&world);
    }

    assert!(!state.is_game_over);
    assert!(state.teleports_open);
    assert_eq!(state.score, -1);
    assert_eq!(query::count(&world, TileKind::Player), 1);
    assert_eq!(query::player(&world).expect("respawned").position(), start);
}

#[test]
fn contacts_during_death_transition_are_ignored() {
    let world = load_world(MAZE);
    let responder = CollisionResponder::default();
    let mut state = query::game_state(&world);
    state.is_game_over = true;

    for kind in [TileKind::Vortex, TileKind::Finish, TileKind::Teleport] {
        let other = first_of(&world, kind);
        let response = responder
            .respond(contact_with(&world, other), state, query::registry(&world))
            .expect("gated contact");
        assert!(response.is_noop(&state), "{kind:?} contact was not gated");
    }
}

#[test]
fn stars_are_collected_during_transitions() {
    let world = load_world(MAZE);
    let responder = CollisionResponder::default();
    let star = first_of(&world, TileKind::Star);
    let mut state = query::game_state(&world);
    state.is_game_over = true;

    let response = responder
        .respond(contact_with(&world, star), state, query::registry(&world))
        .expect("star contact");

    assert_eq!(response.state.score, state.score + 1);
    assert!(response.state.is_game_over);
    assert_eq!(response.effects, vec![Effect::RemoveEntity(star.id)]);
}

#[test]
fn closed_teleports_ignore_contacts() {
    let world = load_world(MAZE);
    let responder = CollisionResponder::default();
    let teleport = first_of(&world, TileKind::Teleport);
    let mut state = query::game_state(&world);
    state.teleports_open = false;

    let response = responder
        .respond(contact_with(&world, teleport), state, query::registry(&world))
        .expect("closed teleport");

    assert!(response.is_noop(&state));
}

#[test]
fn teleport_moves_player_to_paired_pad_and_reopens_after_transition() {
    let world = load_world(MAZE);
    let responder = CollisionResponder::default();
    let pads = query::registry(&world).teleports().to_vec();
    assert_eq!(pads.len(), 2);
    let entry = query::entity(&world, pads[1].id).expect("second pad");
    let state = query::game_state(&world);

    let response = responder
        .respond(contact_with(&world, entry), state, query::registry(&world))
        .expect("teleport contact");

    assert!(!response.state.teleports_open);
    assert!(!response.state.is_game_over);
    assert_eq!(response.state.score, state.score);
    assert_eq!(
        response.effects,
        vec![
            Effect::SetPlayerDynamic(false),
            Effect::Animate {
                entity: query::player(&world).expect("player").id,
                action: Action::Sequence(vec![
                    Action::move_to(entry.position(), Duration::from_millis(200)),
                    Action::fade_to(0.0, Duration::from_millis(200)),
                    Action::move_to(pads[0].position, Duration::ZERO),
                    Action::fade_to(1.0, Duration::from_millis(200)),
                ]),
                then: vec![Completion::EnablePlayerDynamics, Completion::OpenTeleports],
            },
        ]
    );

    let second = responder
        .respond(
            contact_with(&world, first_of(&world, TileKind::Teleport)),
            response.state,
            query::registry(&world),
        )
        .expect("re-entrant contact");
    assert!(second.is_noop(&response.state));

    let enabled = responder.resolve(Completion::EnablePlayerDynamics, response.state);
    assert!(!enabled.state.teleports_open);
    assert_eq!(enabled.effects, vec![Effect::SetPlayerDynamic(true)]);
    let reopened = responder.resolve(Completion::OpenTeleports, enabled.state);
    assert!(reopened.state.teleports_open);
}

#[test]
fn unpaired_teleport_contact_is_an_error() {
    let world = load_world(MAZE);
    let responder = CollisionResponder::default();
    let teleport = first_of(&world, TileKind::Teleport);
    let mut registry = EntityRegistry::new();
    registry
        .register_teleport(TeleportPad {
            id: teleport.id,
            position: teleport.position(),
        })
        .expect("first pad");

    let result = responder.respond(
        contact_with(&world, teleport),
        query::game_state(&world),
        &registry,
    );

    assert_eq!(result, Err(RegistryError::IncompletePair { registered: 1 }));
}

#[test]
fn finish_advances_to_next_level_after_transition() {
    let world = load_world(MAZE);
    let config = ResponderConfig::new(
        Duration::from_millis(250),
        Duration::from_millis(250),
        Duration::from_millis(200),
        Duration::from_millis(200),
        Duration::from_millis(100),
        Duration::from_millis(100),
        Duration::from_secs(1),
    );
    let responder = CollisionResponder::new(config);
    let finish = first_of(&world, TileKind::Finish);

    let response = responder
        .respond(
            contact_with(&world, finish),
            query::game_state(&world),
            query::registry(&world),
        )
        .expect("finish contact");

    assert!(response.state.is_game_over);
    assert_eq!(response.state.current_level, LevelIndex::FIRST);
    assert_eq!(completions(&response), vec![Completion::AdvanceLevel]);

    let advanced = responder.resolve(Completion::AdvanceLevel, response.state);
    assert_eq!(advanced.state.current_level, LevelIndex::new(2));
    assert!(advanced.state.is_game_over);
    assert_eq!(
        advanced.effects,
        vec![
            Effect::LoadLevel(LevelIndex::new(2)),
            Effect::Delay {
                duration: Duration::from_secs(1),
                then: vec![Completion::SpawnPlayer, Completion::ClearGameOver],
            },
        ]
    );
}

#[test]
fn score_may_go_negative() {
    let world = load_world(MAZE);
    let responder = CollisionResponder::default();
    let vortex = first_of(&world, TileKind::Vortex);
    let mut state = GameState::default();

    for expected in [-1, -2, -3] {
        let response = responder
            .respond(contact_with(&world, vortex), state, query::registry(&world))
            .expect("vortex contact");
        assert_eq!(response.state.score, expected);
        state = responder.resolve(Completion::ClearGameOver, response.state).state;
    }
    assert_eq!(vortex.position(), Vec2::new(160.0, 160.0));
}
