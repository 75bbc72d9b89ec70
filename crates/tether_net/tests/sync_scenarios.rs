//! Whole-pipeline scenarios driven through the public API

use std::collections::VecDeque;

use tether_core::ecs::{ComponentStore, World};
use tether_core::math::Vec2;
use tether_net::components::{self, Bullet, Position, Velocity};
use tether_net::input::{InputHistory, PredictedInput};
use tether_net::interpolation::{InterpolationEngine, InterpolationState};
use tether_net::prediction::{MovementModel, PredictionEngine};
use tether_net::reconciliation::{Correction, ReconciliationEngine};
use tether_net::snapshot::SnapshotMapper;
use tether_net::{
    BulletKind, EntityKind, EntityState, InputAck, InputBits, InputPacket, StateUpdate, SyncClient,
    SyncConfig, Transport,
};

const LOCAL: u64 = 0x5EED;

#[derive(Default)]
struct Loopback {
    sent: Vec<InputPacket>,
    inbox: VecDeque<StateUpdate>,
}

impl Transport for Loopback {
    fn send_input(&mut self, packet: InputPacket) {
        self.sent.push(packet);
    }

    fn poll(&mut self) -> Vec<StateUpdate> {
        self.inbox.drain(..).collect()
    }
}

fn entity(id: u32, kind: EntityKind, x: f32, y: f32) -> EntityState {
    EntityState {
        entity_id: id,
        entity_type: kind as u8,
        x,
        y,
        vx: 0.0,
        vy: 0.0,
        flags: 0,
        owner_id: 0,
        health: 100,
        score: 0,
    }
}

fn local_player(x: f32, y: f32) -> EntityState {
    EntityState {
        owner_id: LOCAL,
        ..entity(1, EntityKind::Player, x, y)
    }
}

#[test]
fn test_store_holes_survive_growth() {
    let mut store = ComponentStore::new();
    store.insert(2, 'a');
    store.insert(5, 'b');
    store.remove(5);
    store.insert(900, 'c');

    assert_eq!(store.get(2), Some(&'a'));
    assert_eq!(store.get(900), Some(&'c'));
    for never in [0, 1, 3, 4, 6, 899] {
        assert!(!store.contains(never));
    }
    assert!(!store.contains(5));
    assert!(store.capacity() > 900);
}

#[test]
fn test_prediction_trajectory_is_pure() {
    let script: Vec<(InputBits, f32)> = (0..120)
        .map(|i| {
            let bits = match i % 4 {
                0 => InputBits::RIGHT,
                1 => InputBits::RIGHT | InputBits::DOWN,
                2 => InputBits::UP | InputBits::SHOOT,
                _ => InputBits::NONE,
            };
            (bits, 0.016 + (i % 3) as f32 * 0.001)
        })
        .collect();

    let run = || {
        let mut world = World::new();
        let player = world.create();
        world.add_component(player, Position(Vec2::new(640.0, 360.0))).unwrap();
        let mut engine = PredictionEngine::new(MovementModel::from_config(&SyncConfig::default()));
        script
            .iter()
            .map(|&(bits, dt)| engine.advance(&mut world, player, bits, dt).unwrap())
            .collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}

struct Reconcile {
    world: World,
    player: tether_core::ecs::Entity,
    history: InputHistory,
    prediction: PredictionEngine,
    engine: ReconciliationEngine,
}

impl Reconcile {
    fn new(predicted: Vec2) -> Self {
        let config = SyncConfig::default();
        let mut world = World::new();
        let player = world.create();
        world.add_component(player, Position(predicted)).unwrap();
        let mut prediction = PredictionEngine::new(MovementModel::from_config(&config));
        prediction.set_tracked(predicted);
        let mut history = InputHistory::new(config.history_capacity);
        for sequence in 1..=3 {
            history.push(PredictedInput {
                sequence,
                inputs: InputBits::RIGHT,
                predicted,
                dt: 0.016,
            });
        }
        Self {
            world,
            player,
            history,
            prediction,
            engine: ReconciliationEngine::from_config(&config),
        }
    }

    fn ack(&mut self, seq: u32, server: Vec2) -> Correction {
        let ack = InputAck {
            player_hash: LOCAL,
            last_processed_seq: seq,
            server_pos_x: server.x,
            server_pos_y: server.y,
        };
        self.engine
            .reconcile(&ack, &mut self.world, self.player, &mut self.history, &mut self.prediction)
            .unwrap()
            .unwrap()
            .correction
    }

    fn position(&self) -> Vec2 {
        self.world.get_component::<Position>(self.player).unwrap().0
    }
}

#[test]
fn test_error_below_snap_threshold_keeps_prediction() {
    let predicted = Vec2::new(500.0, 200.0);
    let mut r = Reconcile::new(predicted);

    let correction = r.ack(1, predicted + Vec2::new(1.0, -1.0));

    assert_eq!(correction, Correction::Accepted);
    assert_eq!(r.position(), predicted);
    assert_eq!(r.history.len(), 2);
}

#[test]
fn test_error_above_desync_threshold_lands_on_server() {
    let mut r = Reconcile::new(Vec2::new(500.0, 200.0));
    let server = Vec2::new(100.0, 600.0);

    let correction = r.ack(1, server);

    assert_eq!(correction, Correction::Resynced { discarded: 2 });
    assert_eq!(r.position(), server);
    assert!(r.history.is_empty());
}

#[test]
fn test_snapshot_applied_twice_causes_no_churn() {
    let mut world = World::new();
    let mut mapper = SnapshotMapper::new(LOCAL);
    let interp = InterpolationEngine::new(0.1);
    mapper
        .register_level_obstacle(&mut world, 77, Vec2::new(300.0, 300.0), Vec2::splat(20.0))
        .unwrap();

    let mut bullet = entity(12, EntityKind::Bullet, 50.0, 60.0);
    bullet.flags = BulletKind::Spread as u8;
    let mut wall = entity(13, EntityKind::Obstacle, 300.0, 300.0);
    wall.owner_id = 77;
    let update = StateUpdate {
        tick: 40,
        entities: vec![
            local_player(100.0, 360.0),
            entity(10, EntityKind::Enemy, 400.0, 100.0),
            entity(11, EntityKind::Player, 700.0, 100.0),
            bullet,
            wall,
        ],
        acks: Vec::new(),
    };

    mapper.apply(&mut world, &update, &interp);
    let bindings = [1, 10, 11, 12, 13].map(|id| mapper.entity_for(id));
    let live = world.live_count();

    let again = mapper.apply(&mut world, &update, &interp);

    assert!(!again.churned());
    assert_eq!(again.updated, 5);
    assert_eq!(world.live_count(), live);
    assert_eq!([1, 10, 11, 12, 13].map(|id| mapper.entity_for(id)), bindings);
}

#[test]
fn test_reused_id_does_not_keep_old_components() {
    let mut world = World::new();
    let mut mapper = SnapshotMapper::new(LOCAL);
    let interp = InterpolationEngine::new(0.1);
    mapper
        .register_level_obstacle(&mut world, 9, Vec2::new(200.0, 200.0), Vec2::splat(16.0))
        .unwrap();

    let mut bullet = entity(30, EntityKind::Bullet, 10.0, 10.0);
    bullet.vx = 300.0;
    mapper.apply(
        &mut world,
        &StateUpdate {
            tick: 1,
            entities: vec![bullet],
            acks: Vec::new(),
        },
        &interp,
    );

    let mut obstacle = entity(30, EntityKind::Obstacle, 200.0, 200.0);
    obstacle.owner_id = 9;
    let report = mapper.apply(
        &mut world,
        &StateUpdate {
            tick: 2,
            entities: vec![obstacle],
            acks: Vec::new(),
        },
        &interp,
    );

    assert_eq!(report.evicted, 1);
    let now = mapper.entity_for(30).unwrap();
    assert!(!world.has_component::<Velocity>(now));
    assert!(!world.has_component::<Bullet>(now));
    assert!(!world.has_component::<InterpolationState>(now));
    assert!(components::conforms(&world, now, EntityKind::Obstacle));
    // only the level obstacle remains
    assert_eq!(world.live_count(), 1);
}

#[test]
fn test_interpolation_stays_on_segment() {
    let prev = Vec2::new(-40.0, 10.0);
    let target = Vec2::new(60.0, 210.0);
    let mut state = InterpolationState {
        prev,
        target,
        elapsed: 0.0,
        duration: 0.25,
    };
    assert_eq!(state.sample(), prev);

    for _ in 0..20 {
        let p = state.advance(0.03125);
        let t = state.t();
        assert!((0.0..=1.0).contains(&t));
        let on_line = (target - prev).perp_dot(p - prev);
        assert!(on_line.abs() < 1e-2, "off segment at t={t}: {p}");
        assert!(p.x >= prev.x - 1e-4 && p.x <= target.x + 1e-4);
        assert!(p.y >= prev.y - 1e-4 && p.y <= target.y + 1e-4);
    }
    assert_eq!(state.t(), 1.0);
    assert_eq!(state.sample(), target);
}

#[test]
fn test_exact_ack_accepts_and_empties_history() {
    let mut client = SyncClient::new(SyncConfig::default(), LOCAL);
    let mut net = Loopback::default();

    // steps 1..=3 run before the server has shown us our player
    for _ in 0..3 {
        client.step(InputBits::NONE, 0.016, &mut net);
    }
    net.inbox.push_back(StateUpdate {
        tick: 1,
        entities: vec![local_player(100.0, 360.0)],
        acks: Vec::new(),
    });
    let spawn = client.step(InputBits::NONE, 0.016, &mut net);
    assert_eq!(spawn.sequence, 4);
    assert_eq!(client.local_position(), Some(Vec2::new(100.0, 360.0)));

    net.inbox.push_back(StateUpdate {
        tick: 2,
        entities: vec![local_player(103.2, 360.0)],
        acks: vec![InputAck {
            player_hash: LOCAL,
            last_processed_seq: 5,
            server_pos_x: 103.2,
            server_pos_y: 360.0,
        }],
    });
    let report = client.step(InputBits::RIGHT, 0.016, &mut net);

    assert_eq!(report.sequence, 5);
    let predicted = report.predicted.unwrap();
    assert!((predicted - Vec2::new(103.2, 360.0)).length() < 1e-3);
    assert_eq!(report.correction, Some(Correction::Accepted));
    assert!(client.sequencer().history().is_empty());
    assert_eq!(client.local_position(), Some(predicted));
    assert_eq!(client.last_acked(), Some(5));
    assert_eq!(net.sent.last().map(|p| p.sequence), Some(5));
}

#[test]
fn test_remote_entities_glide_between_snapshots() {
    let mut client = SyncClient::new(SyncConfig::default(), LOCAL);
    let mut net = Loopback::default();
    net.inbox.push_back(StateUpdate {
        tick: 1,
        entities: vec![entity(20, EntityKind::Enemy, 0.0, 0.0)],
        acks: Vec::new(),
    });
    client.step(InputBits::NONE, 0.025, &mut net);
    let enemy = client.mapper().entity_for(20).unwrap();
    let at = |c: &SyncClient| c.world().get_component::<Position>(enemy).unwrap().0;
    assert_eq!(at(&client), Vec2::ZERO);

    net.inbox.push_back(StateUpdate {
        tick: 2,
        entities: vec![entity(20, EntityKind::Enemy, 100.0, 0.0)],
        acks: Vec::new(),
    });
    client.step(InputBits::NONE, 0.025, &mut net);
    let mid = at(&client);
    assert!(mid.x > 0.0 && mid.x < 100.0);

    for _ in 0..4 {
        client.step(InputBits::NONE, 0.025, &mut net);
    }
    assert_eq!(at(&client), Vec2::new(100.0, 0.0));

    // leaving the snapshot destroys it
    net.inbox.push_back(StateUpdate {
        tick: 3,
        entities: Vec::new(),
        acks: Vec::new(),
    });
    client.step(InputBits::NONE, 0.025, &mut net);
    assert!(!client.world().is_alive(enemy));
    assert_eq!(client.stats().counters.entities_despawned, 1);
}
