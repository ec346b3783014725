//! Team formation endpoints
//!
//! All behind the access-claims middleware. CreateTeam and JoinTeam are
//! the two operations legal without a current team; everything else
//! resolves the caller's team from the membership table.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::auth::Access;
use crate::api::types::ApiError;
use crate::domain::TeamService;
use crate::domain::teams::Rank;

#[derive(Clone)]
pub struct TeamRoutesState {
    pub teams: Arc<TeamService>,
}

pub fn routes(teams: Arc<TeamService>) -> Router {
    let state = TeamRoutesState { teams };

    Router::new()
        .route("/CreateTeam", post(create_team))
        .route("/JoinTeam", post(join_team))
        .route("/LeaveTeam", post(leave_team))
        .route("/GetTeamInfo", get(get_team_info))
        .route("/UpdateTeam", post(update_team))
        .route("/DisbandTeam", post(disband_team))
        .route("/ChangeLock", post(change_lock))
        .route("/ChangeCoOwnerStatus", post(change_co_owner_status))
        .route("/KickUser", post(kick_user))
        .route("/GenerateJoinCode", post(generate_join_code))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTeamResponse {
    pub id: String,
    pub join_code: String,
}

pub async fn create_team(
    State(state): State<TeamRoutesState>,
    Access(claims): Access,
    Json(request): Json<CreateTeamRequest>,
) -> Result<Json<CreateTeamResponse>, ApiError> {
    let team = state.teams.create(&claims.user_id, &request.name).await?;
    Ok(Json(CreateTeamResponse {
        id: team.id,
        join_code: team.join_code,
    }))
}

#[derive(Debug, Deserialize)]
pub struct JoinTeamRequest {
    #[serde(default)]
    pub code: String,
}

pub async fn join_team(
    State(state): State<TeamRoutesState>,
    Access(claims): Access,
    Json(request): Json<JoinTeamRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.teams.join(&claims.user_id, &request.code).await?;
    Ok(Json(serde_json::json!({})))
}

pub async fn leave_team(
    State(state): State<TeamRoutesState>,
    Access(claims): Access,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.teams.leave(&claims.user_id).await?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Serialize)]
pub struct TeamMemberDto {
    pub id: String,
    pub name: String,
    pub school: String,
    pub class: i64,
    pub rank: &'static str,
}

#[derive(Debug, Serialize)]
pub struct GetTeamInfoResponse {
    pub id: String,
    pub name: String,
    pub locked: bool,
    pub join_code: String,
    pub members: Vec<TeamMemberDto>,
}

pub async fn get_team_info(
    State(state): State<TeamRoutesState>,
    Access(claims): Access,
) -> Result<Json<GetTeamInfoResponse>, ApiError> {
    let info = state.teams.info(&claims.user_id).await?;

    let members = info
        .members
        .into_iter()
        .map(|m| {
            let rank = match Rank::of(&info.team, &m.user_id) {
                Rank::Owner => "owner",
                Rank::CoOwner => "co_owner",
                Rank::Member => "member",
            };
            TeamMemberDto {
                id: m.user_id,
                name: m.name,
                school: m.school,
                class: m.class,
                rank,
            }
        })
        .collect();

    Ok(Json(GetTeamInfoResponse {
        id: info.team.id,
        name: info.team.name,
        locked: info.team.locked,
        join_code: info.team.join_code,
        members,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRequest {
    #[serde(default)]
    pub name: String,
}

pub async fn update_team(
    State(state): State<TeamRoutesState>,
    Access(claims): Access,
    Json(request): Json<UpdateTeamRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.teams.rename(&claims.user_id, &request.name).await?;
    Ok(Json(serde_json::json!({})))
}

pub async fn disband_team(
    State(state): State<TeamRoutesState>,
    Access(claims): Access,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.teams.disband(&claims.user_id).await?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct ChangeLockRequest {
    #[serde(default)]
    pub locked: bool,
}

pub async fn change_lock(
    State(state): State<TeamRoutesState>,
    Access(claims): Access,
    Json(request): Json<ChangeLockRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .teams
        .change_lock(&claims.user_id, request.locked)
        .await?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct ChangeCoOwnerStatusRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub should_coowner: bool,
}

pub async fn change_co_owner_status(
    State(state): State<TeamRoutesState>,
    Access(claims): Access,
    Json(request): Json<ChangeCoOwnerStatusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.user_id.is_empty() {
        return Err(ApiError::InvalidId);
    }
    state
        .teams
        .change_co_owner(&claims.user_id, &request.user_id, request.should_coowner)
        .await?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Deserialize)]
pub struct KickUserRequest {
    #[serde(default)]
    pub user_id: String,
}

pub async fn kick_user(
    State(state): State<TeamRoutesState>,
    Access(claims): Access,
    Json(request): Json<KickUserRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.user_id.is_empty() {
        return Err(ApiError::InvalidId);
    }
    state.teams.kick(&claims.user_id, &request.user_id).await?;
    Ok(Json(serde_json::json!({})))
}

#[derive(Debug, Serialize)]
pub struct GenerateJoinCodeResponse {
    pub join_code: String,
}

pub async fn generate_join_code(
    State(state): State<TeamRoutesState>,
    Access(claims): Access,
) -> Result<Json<GenerateJoinCodeResponse>, ApiError> {
    let join_code = state.teams.regenerate_join_code(&claims.user_id).await?;
    Ok(Json(GenerateJoinCodeResponse { join_code }))
}
