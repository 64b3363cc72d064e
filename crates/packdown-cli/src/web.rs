//! HTTP surface for the browser UI.
//!
//! The UI itself lives elsewhere; this serves the JSON contract it consumes:
//! the probed volume set, and plan-on-demand returning the full plan plus
//! the audit trail.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use eyre::{Result, WrapErr};
use serde::Serialize;

use packdown_core::audit::WorldViewSnapshot;
use packdown_core::model::{Plan, VolumeState};
use packdown_core::probe::SpaceProbe;
use packdown_core::{packer, PlanOptions};

use crate::cli::WebArgs;
use crate::plan::build_world;

#[derive(Clone)]
struct AppState {
    volumes: Arc<Vec<PathBuf>>,
}

#[derive(Serialize)]
struct PlanResponse {
    plan: Plan,
    audit: Vec<WorldViewSnapshot>,
}

pub async fn run_web(args: &WebArgs) -> Result<()> {
    let state = AppState {
        volumes: Arc::new(args.volumes.clone()),
    };
    let router = Router::new()
        .route("/api/volumes", get(list_volumes))
        .route("/api/plan", post(compute_plan))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("binding {}", addr))?;
    log::info!("planner API listening on http://{}", addr);
    axum::serve(listener, router).await.wrap_err("serving")?;
    Ok(())
}

async fn list_volumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<VolumeState>>, (StatusCode, String)> {
    let volumes = state.volumes.clone();
    let states = tokio::task::spawn_blocking(move || {
        let probe = SpaceProbe::new();
        volumes
            .iter()
            .map(|path| {
                probe
                    .volume_state(path)
                    .ok_or_else(|| format!("no mount hosts volume {}", path.display()))
            })
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(internal)?
    .map_err(|err| (StatusCode::NOT_FOUND, err))?;

    Ok(Json(states))
}

async fn compute_plan(
    State(state): State<AppState>,
    Json(options): Json<PlanOptions>,
) -> Result<Json<PlanResponse>, (StatusCode, String)> {
    let volumes = state.volumes.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let world = build_world(volumes.as_slice()).map_err(|err| err.to_string())?;
        packer::plan_moves(&world, &options).map_err(|err| err.to_string())
    })
    .await
    .map_err(internal)?
    .map_err(|err| (StatusCode::BAD_REQUEST, err))?;

    Ok(Json(PlanResponse {
        plan: outcome.plan,
        audit: outcome.audit,
    }))
}

fn internal(err: tokio::task::JoinError) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
