//! Agent IPC: `POST /ipc` with a `{command, args}` body.
//!
//! Parsing happens entirely here — by the time a [`WorldCommand`] crosses
//! into the simulation, every field is typed and every enum is validated.
//! Responses use the `{ok: true, ...}` / `{ok: false, error, hint?, ...}`
//! envelope with stable error tokens.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};
use tokio::sync::oneshot;

use arena_core::{
    AgentAction, AgentEmote, AgentId, AllianceId, BattleId, BattleIntent, Reject, RejectResult,
    TimeMs,
};
use arena_sim::{RegisterArgs, WorldCommand};

use crate::AppState;
use crate::actor::ArenaCall;

// ── Request shape ─────────────────────────────────────────────────────────────

#[derive(Debug)]
#[derive(serde::Deserialize)]
pub struct IpcRequest {
    pub command: String,
    #[serde(default)]
    pub args: Value,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

fn field<T: serde::de::DeserializeOwned>(args: &Value, name: &str) -> RejectResult<T> {
    let value = args.get(name).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|_| Reject::BadArgs(format!("missing or invalid `{name}`")))
}

fn optional<T: serde::de::DeserializeOwned>(args: &Value, name: &str) -> RejectResult<Option<T>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|_| Reject::BadArgs(format!("invalid `{name}`"))),
    }
}

fn agent_id(args: &Value) -> RejectResult<AgentId> {
    let id: String = field(args, "agentId")?;
    if id.is_empty() {
        return Err(Reject::InvalidAgentId);
    }
    Ok(AgentId::from(id))
}

/// Translate one external verb into a typed command.
pub fn parse_command(command: &str, args: &Value) -> RejectResult<WorldCommand> {
    match command {
        "auto-connect" => Ok(WorldCommand::AutoConnect { args: register_args(args)? }),
        "register" => Ok(WorldCommand::Register {
            agent_id: agent_id(args)?,
            args:     register_args(args)?,
        }),
        "world-leave" => Ok(WorldCommand::Leave { agent_id: agent_id(args)? }),

        "world-move" => Ok(WorldCommand::Move {
            agent_id: agent_id(args)?,
            x:        field(args, "x")?,
            y:        optional(args, "y")?.unwrap_or(0.0),
            z:        field(args, "z")?,
            rotation: optional(args, "rotation")?.unwrap_or(0.0),
        }),

        "world-action" => {
            let action: AgentAction = optional(args, "action")?.ok_or(Reject::BadArgs(
                "action must be one of walk, idle, wave, pinch, talk, dance, backflip, spin".into(),
            ))?;
            Ok(WorldCommand::Action { agent_id: agent_id(args)?, action })
        }

        "world-chat" => Ok(WorldCommand::Chat {
            agent_id: agent_id(args)?,
            text:     field(args, "text")?,
        }),

        "world-emote" => {
            let emote: AgentEmote = optional(args, "emote")?.ok_or(Reject::BadArgs(
                "emote must be one of happy, thinking, surprised, laugh".into(),
            ))?;
            Ok(WorldCommand::Emote { agent_id: agent_id(args)?, emote })
        }

        "world-whisper" => Ok(WorldCommand::Whisper {
            agent_id:    agent_id(args)?,
            to_agent_id: AgentId::from(field::<String>(args, "toAgentId")?),
            text:        field(args, "text")?,
        }),

        "world-territory" => Ok(WorldCommand::Territory {
            agent_id: agent_id(args)?,
            x:        field(args, "x")?,
            z:        field(args, "z")?,
            radius:   field(args, "radius")?,
            label:    optional(args, "label")?,
        }),

        "world-battle-start" => Ok(WorldCommand::BattleStart {
            agent_id:        agent_id(args)?,
            target_agent_id: AgentId::from(field::<String>(args, "targetAgentId")?),
        }),

        "world-battle-intent" => {
            let raw: String = field(args, "intent")?;
            let intent = BattleIntent::parse(&raw).ok_or(Reject::InvalidIntent)?;
            Ok(WorldCommand::BattleIntent {
                agent_id:  agent_id(args)?,
                battle_id: BattleId::from(field::<String>(args, "battleId")?),
                intent,
            })
        }

        "world-battle-surrender" => Ok(WorldCommand::BattleSurrender { agent_id: agent_id(args)? }),
        "world-battle-truce"     => Ok(WorldCommand::BattleTruce { agent_id: agent_id(args)? }),

        "world-alliance-form"  => Ok(WorldCommand::AllianceForm { agent_id: agent_id(args)? }),
        "world-alliance-join"  => Ok(WorldCommand::AllianceJoin {
            agent_id:    agent_id(args)?,
            alliance_id: AllianceId::from(field::<String>(args, "allianceId")?),
        }),
        "world-alliance-leave" => Ok(WorldCommand::AllianceLeave { agent_id: agent_id(args)? }),

        "survival-refuse" => Ok(WorldCommand::SurvivalRefuse {
            agent_id: agent_id(args)?,
            refuse:   optional(args, "refuse")?.unwrap_or(true),
        }),

        "place-bet" => Ok(WorldCommand::PlaceBet {
            agent_id:       agent_id(args)?,
            amount_usd:     field(args, "amount")?,
            tx_hash:        field(args, "txHash")?,
            wallet_address: field(args, "wallet")?,
        }),

        "world-state"     => Ok(WorldCommand::WorldState),
        "world-battles"   => Ok(WorldCommand::Battles),
        "room-info"       => Ok(WorldCommand::RoomInfo),
        "room-events"     => Ok(WorldCommand::RoomEvents {
            since: optional::<u64>(args, "since")?.map(TimeMs),
            limit: optional(args, "limit")?,
        }),
        "room-skills"     => Ok(WorldCommand::RoomSkills),
        "survival-status" => Ok(WorldCommand::SurvivalStatus),
        "profile"         => Ok(WorldCommand::Profile { agent_id: agent_id(args)? }),
        "profiles"        => Ok(WorldCommand::Profiles),
        "describe"        => Ok(WorldCommand::Describe),

        "survival-start" => Ok(WorldCommand::SurvivalStart {
            prize_pool_usd: optional(args, "prizePoolUsd")?.unwrap_or(0.0),
            duration_ms:    optional(args, "durationMs")?,
        }),
        "survival-reset" => Ok(WorldCommand::SurvivalReset),
        "admin-revive"   => Ok(WorldCommand::AdminRevive { agent_id: agent_id(args)? }),

        _ => Err(Reject::UnknownCommand),
    }
}

fn register_args(args: &Value) -> RejectResult<RegisterArgs> {
    serde_json::from_value(args.clone())
        .map_err(|e| Reject::BadArgs(format!("invalid registration args: {e}")))
}

// ── Envelope ──────────────────────────────────────────────────────────────────

pub fn envelope_ok(mut body: Value) -> Value {
    if let Some(object) = body.as_object_mut() {
        object.insert("ok".to_owned(), Value::Bool(true));
        return body;
    }
    json!({ "ok": true, "result": body })
}

pub fn envelope_err(reject: &Reject) -> Value {
    let mut object = serde_json::Map::new();
    object.insert("ok".to_owned(), Value::Bool(false));
    object.insert("error".to_owned(), json!(reject.token()));
    object.insert("hint".to_owned(), json!(reject.to_string()));
    if let Some(retry) = reject.retry_after_ms() {
        object.insert("retryAfterMs".to_owned(), json!(retry));
    }
    if let Some(dead_until) = reject.dead_until() {
        object.insert("deadUntil".to_owned(), json!(dead_until));
    }
    if reject.is_permanent() {
        object.insert("permanent".to_owned(), json!(true));
    }
    Value::Object(object)
}

// ── Handler ───────────────────────────────────────────────────────────────────

/// `POST /ipc`.
pub async fn ipc_handler(
    State(state): State<AppState>,
    Json(request): Json<IpcRequest>,
) -> Json<Value> {
    let is_registration = matches!(request.command.as_str(), "auto-connect" | "register");

    let cmd = match parse_command(&request.command, &request.args) {
        Ok(cmd) => cmd,
        Err(reject) => return Json(envelope_err(&reject)),
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    if state
        .calls
        .send(ArenaCall::Execute { cmd, reply: reply_tx })
        .await
        .is_err()
    {
        return Json(json!({ "ok": false, "error": "server_unavailable" }));
    }
    match reply_rx.await {
        Ok(Ok(mut body)) => {
            if is_registration {
                decorate_registration(&mut body, &state.public_url);
            }
            Json(envelope_ok(body))
        }
        Ok(Err(reject)) => Json(envelope_err(&reject)),
        Err(_) => Json(json!({ "ok": false, "error": "server_unavailable" })),
    }
}

/// Registration replies carry the connection coordinates and a short primer.
fn decorate_registration(body: &mut Value, public_url: &str) {
    let Some(object) = body.as_object_mut() else {
        return;
    };
    let agent = object
        .get("agentId")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    object.insert("ipcUrl".to_owned(), json!(format!("{public_url}/ipc")));
    object.insert(
        "previewUrl".to_owned(),
        json!(format!("{public_url}/ws?agent={agent}")),
    );
    object.insert(
        "instructions".to_owned(),
        json!(
            "POST {command, args} to ipcUrl. Start with `describe` for the verb list; \
             move with world-move, talk with world-chat, and duel with world-battle-start."
        ),
    );
}
