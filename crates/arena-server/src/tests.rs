//! Unit tests for the server layer: verb parsing, envelopes, and fan-out.

use serde_json::{Value, json};
use tokio::sync::mpsc;

use arena_core::{AgentId, GamePhase, Reject};
use arena_sim::{Arena, ArenaBuilder, NoopHooks, RegisterArgs, WorldCommand};

use crate::bridge::{ClientFrame, ObserverBridge};
use crate::ipc::{envelope_err, envelope_ok, parse_command};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn arena_with(agents: &[(&str, f64, f64)]) -> Arena {
    let mut arena = ArenaBuilder::new().seed(9).build();
    for (id, x, z) in agents {
        arena
            .execute(WorldCommand::Register {
                agent_id: AgentId::from(*id),
                args:     RegisterArgs {
                    wallet_address: Some(format!("0xwallet-{id}-000000")),
                    x:              Some(*x),
                    z:              Some(*z),
                    rotation:       Some(0.0),
                    ..Default::default()
                },
            })
            .unwrap();
        arena.tick(&mut NoopHooks);
    }
    arena
}

fn open_combat(arena: &mut Arena) {
    arena
        .execute(WorldCommand::SurvivalStart { prize_pool_usd: 10.0, duration_ms: None })
        .unwrap();
    let now = arena.clock.stamp();
    arena.phases.force_phase(GamePhase::Battle, now);
    arena.tick(&mut NoopHooks);
}

fn drain(rx: &mut mpsc::Receiver<std::sync::Arc<str>>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(serde_json::from_str(&frame).unwrap());
    }
    frames
}

// ── IPC parsing ───────────────────────────────────────────────────────────────

mod parse_tests {
    use super::*;

    #[test]
    fn move_with_full_coordinates() {
        let cmd = parse_command(
            "world-move",
            &json!({ "agentId": "a", "x": 1.5, "y": 0.0, "z": -2.0, "rotation": 0.7 }),
        )
        .unwrap();
        let WorldCommand::Move { agent_id, x, z, rotation, .. } = cmd else {
            panic!("expected Move");
        };
        assert_eq!(agent_id, AgentId::from("a"));
        assert_eq!((x, z, rotation), (1.5, -2.0, 0.7));
    }

    #[test]
    fn missing_fields_are_bad_args() {
        assert!(matches!(
            parse_command("world-move", &json!({ "agentId": "a" })),
            Err(Reject::BadArgs(_))
        ));
        assert!(matches!(
            parse_command("world-chat", &json!({ "agentId": "a" })),
            Err(Reject::BadArgs(_))
        ));
    }

    #[test]
    fn enums_are_validated_at_the_boundary() {
        assert!(parse_command(
            "world-action",
            &json!({ "agentId": "a", "action": "dance" })
        )
        .is_ok());
        assert!(matches!(
            parse_command("world-action", &json!({ "agentId": "a", "action": "moonwalk" })),
            Err(Reject::BadArgs(_))
        ));
        assert_eq!(
            parse_command(
                "world-battle-intent",
                &json!({ "agentId": "a", "battleId": "b", "intent": "headbutt" })
            )
            .unwrap_err(),
            Reject::InvalidIntent
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(
            parse_command("world-teleport", &json!({})).unwrap_err(),
            Reject::UnknownCommand
        );
    }

    #[test]
    fn refuse_defaults_to_true() {
        let cmd = parse_command("survival-refuse", &json!({ "agentId": "a" })).unwrap();
        assert!(matches!(cmd, WorldCommand::SurvivalRefuse { refuse: true, .. }));
    }
}

// ── Envelopes ─────────────────────────────────────────────────────────────────

mod envelope_tests {
    use super::*;
    use arena_core::TimeMs;

    #[test]
    fn ok_envelope_merges_body() {
        let v = envelope_ok(json!({ "battleId": "battle-000001" }));
        assert_eq!(v["ok"], true);
        assert_eq!(v["battleId"], "battle-000001");
    }

    #[test]
    fn error_envelope_carries_token_and_metadata() {
        let v = envelope_err(&Reject::RateLimited { retry_after_ms: 450 });
        assert_eq!(v["ok"], false);
        assert_eq!(v["error"], "rate_limited");
        assert_eq!(v["retryAfterMs"], 450);

        let v = envelope_err(&Reject::AgentDeadPermanent);
        assert_eq!(v["error"], "agent_dead_permanent");
        assert_eq!(v["permanent"], true);

        let v = envelope_err(&Reject::AgentDead { dead_until: Some(TimeMs(9_000)) });
        assert_eq!(v["deadUntil"], 9_000);

        let v = envelope_err(&Reject::RoomFull);
        assert_eq!(v["error"], "Room is full");
    }
}

// ── Fan-out ───────────────────────────────────────────────────────────────────

mod fanout_tests {
    use super::*;

    #[test]
    fn connect_gets_room_info_battles_then_full_snapshot() {
        let mut arena = arena_with(&[("mover", 0.0, 0.0)]);
        let mut bridge = ObserverBridge::new();
        let (tx, mut rx) = mpsc::channel(64);
        bridge.add(tx, None, &arena);

        let greeting = drain(&mut rx);
        assert_eq!(greeting[0]["type"], "roomInfo");
        assert_eq!(greeting[1]["type"], "battleState");

        let out = arena.tick(&mut NoopHooks);
        bridge.fan_out(&arena, &out);
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["type"], "snapshot");
        assert_eq!(
            frames[0]["agents"].as_array().unwrap().len(),
            1,
            "first snapshot is unfiltered"
        );
    }

    #[test]
    fn aoi_filters_position_but_not_battle_events() {
        let mut arena = arena_with(&[("mover", 0.0, 0.0), ("target", 3.0, 4.0)]);
        open_combat(&mut arena);
        let mut bridge = ObserverBridge::new();

        let (tx_near, mut rx_near) = mpsc::channel(64);
        let (tx_far, mut rx_far) = mpsc::channel(64);
        let near = bridge.add(tx_near, None, &arena);
        let far = bridge.add(tx_far, None, &arena);
        bridge.handle_frame(near, ClientFrame::Viewport { x: 0.0, z: 0.0 }, &mut arena);
        bridge.handle_frame(far, ClientFrame::Viewport { x: 200.0, z: 200.0 }, &mut arena);

        // Ack tick: both get their first snapshot.
        let out = arena.tick(&mut NoopHooks);
        bridge.fan_out(&arena, &out);
        drain(&mut rx_near);
        drain(&mut rx_far);

        // A movement (spatial) and a battle start (global) in one tick.
        arena
            .execute(WorldCommand::Move {
                agent_id: AgentId::from("mover"),
                x: 1.0, y: 0.0, z: 1.0, rotation: 0.0,
            })
            .unwrap();
        arena
            .execute(WorldCommand::BattleStart {
                agent_id:        AgentId::from("mover"),
                target_agent_id: AgentId::from("target"),
            })
            .unwrap();
        let out = arena.tick(&mut NoopHooks);
        bridge.fan_out(&arena, &out);

        let near_kinds: Vec<String> = drain(&mut rx_near)
            .iter()
            .map(|f| f["data"]["worldType"].as_str().unwrap().to_owned())
            .collect();
        assert!(near_kinds.contains(&"position".to_owned()));
        assert!(near_kinds.contains(&"battle".to_owned()));

        let far_kinds: Vec<String> = drain(&mut rx_far)
            .iter()
            .map(|f| f["data"]["worldType"].as_str().unwrap().to_owned())
            .collect();
        assert!(
            !far_kinds.contains(&"position".to_owned()),
            "position leaked outside AOI: {far_kinds:?}"
        );
        assert!(far_kinds.contains(&"battle".to_owned()), "battle events are global");
    }

    #[test]
    fn chat_respects_the_audible_radius() {
        let mut arena = arena_with(&[("speaker", 0.0, 0.0)]);
        let mut bridge = ObserverBridge::new();

        let (tx_close, mut rx_close) = mpsc::channel(64);
        let (tx_edge, mut rx_edge) = mpsc::channel(64);
        let close = bridge.add(tx_close, None, &arena);
        let edge = bridge.add(tx_edge, None, &arena);
        bridge.handle_frame(close, ClientFrame::Viewport { x: 50.0, z: 0.0 }, &mut arena);
        bridge.handle_frame(edge, ClientFrame::Viewport { x: 61.0, z: 0.0 }, &mut arena);

        let out = arena.tick(&mut NoopHooks);
        bridge.fan_out(&arena, &out);
        drain(&mut rx_close);
        drain(&mut rx_edge);

        arena
            .execute(WorldCommand::Chat {
                agent_id: AgentId::from("speaker"),
                text:     "anyone there?".into(),
            })
            .unwrap();
        let out = arena.tick(&mut NoopHooks);
        bridge.fan_out(&arena, &out);

        // CHAT_RANGE + AOI_RADIUS = 60: audible at 50, silent at 61.
        assert_eq!(drain(&mut rx_close).len(), 1);
        assert!(drain(&mut rx_edge).is_empty());
    }

    #[test]
    fn whispers_never_reach_observers() {
        let mut arena = arena_with(&[("a", 0.0, 0.0), ("b", 1.0, 1.0)]);
        let mut bridge = ObserverBridge::new();
        let (tx, mut rx) = mpsc::channel(64);
        let id = bridge.add(tx, None, &arena);
        bridge.handle_frame(id, ClientFrame::Viewport { x: 0.0, z: 0.0 }, &mut arena);

        let out = arena.tick(&mut NoopHooks);
        bridge.fan_out(&arena, &out);
        drain(&mut rx);

        arena
            .execute(WorldCommand::Whisper {
                agent_id:    AgentId::from("a"),
                to_agent_id: AgentId::from("b"),
                text:        "secret".into(),
            })
            .unwrap();
        let out = arena.tick(&mut NoopHooks);
        assert_eq!(out.events.len(), 1, "whisper applied");
        bridge.fan_out(&arena, &out);
        assert!(drain(&mut rx).is_empty(), "whisper must not be broadcast");
    }

    #[test]
    fn subscribe_forces_a_fresh_full_snapshot() {
        let mut arena = arena_with(&[("mover", 0.0, 0.0)]);
        let mut bridge = ObserverBridge::new();
        let (tx, mut rx) = mpsc::channel(64);
        let id = bridge.add(tx, None, &arena);

        let out = arena.tick(&mut NoopHooks);
        bridge.fan_out(&arena, &out);
        drain(&mut rx);

        bridge.handle_frame(id, ClientFrame::Subscribe, &mut arena);
        let out = arena.tick(&mut NoopHooks);
        bridge.fan_out(&arena, &out);
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["type"], "snapshot");
    }

    #[test]
    fn periodic_snapshot_is_viewport_filtered() {
        let mut arena = arena_with(&[("mover", 0.0, 0.0)]);
        let mut bridge = ObserverBridge::new();
        let (tx, mut rx) = mpsc::channel(512);
        let id = bridge.add(tx, None, &arena);
        bridge.handle_frame(id, ClientFrame::Viewport { x: 200.0, z: 200.0 }, &mut arena);

        // Run through a full snapshot interval (100 ticks at 20 Hz).
        let mut snapshots = Vec::new();
        for _ in 0..101 {
            let out = arena.tick(&mut NoopHooks);
            bridge.fan_out(&arena, &out);
            snapshots.extend(
                drain(&mut rx)
                    .into_iter()
                    .filter(|f| f["type"] == "snapshot"),
            );
        }
        assert!(snapshots.len() >= 2, "first + at least one periodic snapshot");
        let periodic = snapshots.last().unwrap();
        assert_eq!(
            periodic["agents"].as_array().unwrap().len(),
            0,
            "far viewport sees nobody in a filtered snapshot"
        );
    }

    #[test]
    fn invalid_viewport_is_rejected_with_command_result() {
        let mut arena = arena_with(&[]);
        let mut bridge = ObserverBridge::new();
        let (tx, mut rx) = mpsc::channel(64);
        let id = bridge.add(tx, None, &arena);
        drain(&mut rx);

        bridge.handle_frame(id, ClientFrame::Viewport { x: f64::NAN, z: 0.0 }, &mut arena);
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["type"], "commandResult");
        assert_eq!(frames[0]["error"], "invalid_position");

        bridge.handle_frame(id, ClientFrame::Viewport { x: 10_001.0, z: 0.0 }, &mut arena);
        assert_eq!(drain(&mut rx)[0]["error"], "invalid_position");
    }

    #[test]
    fn place_bet_replies_with_command_result_and_dedups() {
        let mut arena = arena_with(&[("champ", 0.0, 0.0)]);
        let mut bridge = ObserverBridge::new();
        let (tx, mut rx) = mpsc::channel(64);
        let id = bridge.add(tx, None, &arena);
        drain(&mut rx);

        let bet = ClientFrame::PlaceBet {
            agent_id: AgentId::from("champ"),
            amount:   25.0,
            tx_hash:  "0xdeadbeef".into(),
            wallet:   "0xbettor-wallet-000".into(),
        };
        bridge.handle_frame(id, bet.clone(), &mut arena);
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["type"], "commandResult");
        assert_eq!(frames[0]["ok"], true);

        bridge.handle_frame(id, bet, &mut arena);
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["ok"], false);
        assert_eq!(frames[0]["error"], "duplicate_txHash_in_flight");
    }

    #[test]
    fn dead_observers_are_dropped_on_fan_out() {
        let mut arena = arena_with(&[("mover", 0.0, 0.0)]);
        let mut bridge = ObserverBridge::new();
        let (tx, rx) = mpsc::channel(64);
        bridge.add(tx, None, &arena);
        assert_eq!(bridge.len(), 1);

        drop(rx); // socket gone
        let out = arena.tick(&mut NoopHooks);
        bridge.fan_out(&arena, &out);
        assert_eq!(bridge.len(), 0);
    }

    #[test]
    fn follow_tracks_the_agent_each_tick() {
        let mut arena = arena_with(&[("runner", 10.0, 10.0)]);
        let mut bridge = ObserverBridge::new();
        let (tx, mut rx) = mpsc::channel(64);
        let id = bridge.add(tx, Some(AgentId::from("runner")), &arena);
        let _ = id;

        let out = arena.tick(&mut NoopHooks);
        bridge.update_follows(&arena);
        bridge.fan_out(&arena, &out);
        drain(&mut rx);

        // Move the runner across the island; the follower's AOI moves too,
        // so the position delta still arrives.
        arena
            .execute(WorldCommand::Move {
                agent_id: AgentId::from("runner"),
                x: 120.0, y: 0.0, z: 120.0, rotation: 0.0,
            })
            .unwrap();
        let out = arena.tick(&mut NoopHooks);
        bridge.update_follows(&arena);
        bridge.fan_out(&arena, &out);

        let frames = drain(&mut rx);
        assert!(
            frames
                .iter()
                .any(|f| f["type"] == "world" && f["data"]["worldType"] == "position"),
            "follower should receive the runner's movement: {frames:?}"
        );
    }

    #[test]
    fn client_frames_parse_from_wire_json() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"viewport","x":10.0,"z":-4.0}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Viewport { .. }));

        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"requestProfile","agentId":"bob"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::RequestProfile { .. }));

        let frame: ClientFrame = serde_json::from_str(
            r#"{"type":"placeBet","agentId":"a","amount":5.0,"txHash":"0x1","wallet":"w"}"#,
        )
        .unwrap();
        assert!(matches!(frame, ClientFrame::PlaceBet { .. }));

        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"hack"}"#).is_err());
    }
}
