use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, AppResult},
    membership::Roster,
    models::{Event, EventDraft, UserInfo},
    permissions::{Action, Actor, can_manage_event},
    routes::actor_of,
    utils::{Claims, success_to_api_response},
};

use super::model::{EventPatchRequest, EventRequest, EventResponse};

#[axum::debug_handler]
pub async fn list_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Roster::load(&state.pool, team_id).await?;
    self::check(&actor, &roster, Action::Read)?;

    let events = Event::list_by_team(&state.pool, team_id).await?;
    let ids: Vec<Uuid> = events.iter().map(|e| e.trainer_id).collect();
    let users = UserInfo::find_many(&state.pool, &ids).await?;
    let body: Vec<EventResponse> = events
        .into_iter()
        .map(|e| EventResponse::new(e, &users))
        .collect();
    Ok((StatusCode::OK, success_to_api_response(body)))
}

#[axum::debug_handler]
pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<EventRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Roster::load(&state.pool, team_id).await?;
    self::check(&actor, &roster, Action::Create)?;

    let event = Event::create(&state.pool, team_id, actor.user_id, &EventDraft::from(req)).await?;
    tracing::info!("User {} scheduled event {} in team {}", actor.username, event.id, team_id);
    render(&state, event, StatusCode::CREATED).await
}

#[axum::debug_handler]
pub async fn get_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, event_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Roster::load(&state.pool, team_id).await?;
    self::check(&actor, &roster, Action::Read)?;

    let event = Event::find_in_team(&state.pool, team_id, event_id).await?;
    render(&state, event, StatusCode::OK).await
}

#[axum::debug_handler]
pub async fn update_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, event_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<EventRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Roster::load(&state.pool, team_id).await?;
    self::check(&actor, &roster, Action::Update)?;

    let event = Event::find_in_team(&state.pool, team_id, event_id).await?;
    let event = Event::update(&state.pool, event.id, &EventDraft::from(req)).await?;
    render(&state, event, StatusCode::OK).await
}

#[axum::debug_handler]
pub async fn patch_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, event_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<EventPatchRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Roster::load(&state.pool, team_id).await?;
    self::check(&actor, &roster, Action::Update)?;

    let event = Event::find_in_team(&state.pool, team_id, event_id).await?;
    let draft = event.merged(req.into());
    let event = Event::update(&state.pool, event.id, &draft).await?;
    render(&state, event, StatusCode::OK).await
}

#[axum::debug_handler]
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((team_id, event_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let actor = actor_of(&claims)?;
    let roster = Roster::load(&state.pool, team_id).await?;
    self::check(&actor, &roster, Action::Delete)?;

    let event = Event::find_in_team(&state.pool, team_id, event_id).await?;
    Event::delete(&state.pool, event.id).await?;
    tracing::info!("User {} cancelled event {}", actor.username, event.id);
    Ok(StatusCode::NO_CONTENT)
}

fn check(actor: &Actor, roster: &Roster, action: Action) -> AppResult<()> {
    if can_manage_event(Some(actor), roster, action) {
        return Ok(());
    }
    let msg = match action {
        Action::Read => "only team members can see events",
        _ => "only the trainer of this team can manage events",
    };
    Err(AppError::PermissionDenied(msg.into()))
}

async fn render(
    state: &AppState,
    event: Event,
    status: StatusCode,
) -> AppResult<impl IntoResponse + use<>> {
    let users = UserInfo::find_many(&state.pool, &[event.trainer_id]).await?;
    Ok((status, success_to_api_response(EventResponse::new(event, &users))))
}
