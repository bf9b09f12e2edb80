//! Request handlers and the JSON shapes they exchange.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vacuum_world_core::{
    Direction, Position,
    agent::{Action, StepOutcome},
    session::{AutoCleanReport, WorldState},
};

use crate::SharedSession;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub dirt_count: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveRequest {
    pub direction: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MoveResponse {
    Moved {
        success: bool,
        position: Position,
        cleaned: bool,
    },
    Rejected {
        success: bool,
        message: String,
    },
}

impl MoveResponse {
    fn rejected(message: impl ToString) -> Self {
        MoveResponse::Rejected {
            success: false,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StepResponse {
    Done {
        done: bool,
        message: &'static str,
    },
    Progress {
        done: bool,
        action: Action,
        #[serde(flatten)]
        state: WorldState,
    },
}

pub async fn get_state(State(session): State<SharedSession>) -> Json<WorldState> {
    Json(session.lock().await.state())
}

pub async fn reset(
    State(session): State<SharedSession>,
    Json(request): Json<ResetRequest>,
) -> Json<MessageResponse> {
    info!(dirt_count = ?request.dirt_count, "Reset requested");
    session.lock().await.reset(request.dirt_count);
    Json(MessageResponse {
        message: "Reset successful",
    })
}

pub async fn manual_move(
    State(session): State<SharedSession>,
    Json(request): Json<MoveRequest>,
) -> Json<MoveResponse> {
    let direction: Direction = match request.direction.parse() {
        Ok(direction) => direction,
        Err(err) => {
            debug!(%err, "Rejected manual move");
            return Json(MoveResponse::rejected(err));
        }
    };

    let response = match session.lock().await.manual_move(direction) {
        Ok(moved) => MoveResponse::Moved {
            success: true,
            position: moved.position,
            cleaned: moved.cleaned,
        },
        Err(err) => {
            debug!(%err, "Rejected manual move");
            MoveResponse::rejected(err)
        }
    };
    Json(response)
}

pub async fn auto_clean(State(session): State<SharedSession>) -> Json<AutoCleanReport> {
    let report = session.lock().await.auto_clean();
    info!(actions = report.actions.len(), "Auto-clean completed");
    Json(report)
}

pub async fn step_auto(State(session): State<SharedSession>) -> Json<StepResponse> {
    let mut session = session.lock().await;
    let response = match session.step_auto() {
        StepOutcome::Done(reason) => StepResponse::Done {
            done: true,
            message: reason.message(),
        },
        StepOutcome::Acted(action) => StepResponse::Progress {
            done: false,
            action,
            state: session.state(),
        },
    };
    Json(response)
}
