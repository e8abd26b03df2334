use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html,
    },
    routing::{get, post},
    Form, Json, Router,
};
use futures_util::stream::{self, Stream, StreamExt};
use parkwatch_core::SlotId;
use parkwatch_shared::OccupancyUpdate;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};

use crate::error::AppError;
use crate::slots::StatusMessage;
use crate::state::AppState;

const LIVECAR_PAGE: &str = include_str!("../static/livecar.html");

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/livecar.html", get(livecar))
        .route("/live/stream", get(stream_updates))
        .route("/live/snapshot", get(snapshot))
        .route("/find_car_location", post(find_car_location))
        .route("/book_slot", post(book_slot))
}

#[derive(Debug, Deserialize)]
pub struct SlotNumberForm {
    slot_number: Option<String>,
}

#[derive(Debug, Serialize)]
struct CarLocation {
    slot: String,
    position: (u32, u32),
}

async fn livecar() -> Html<&'static str> {
    Html(LIVECAR_PAGE)
}

fn update_event(update: &OccupancyUpdate) -> Option<Event> {
    Event::default().event("update").json_data(update).ok()
}

/// Latest update first so a new viewer is not left blank, then every frame
/// the detector publishes. Lagged messages are skipped.
async fn stream_updates(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.live.subscribe();
    debug!("Live viewer connected");

    let current = stream::iter(state.live.latest());
    let live = BroadcastStream::new(rx).filter_map(|result| async move { result.ok() });

    let events = current
        .chain(live)
        .filter_map(|update: Arc<OccupancyUpdate>| async move { update_event(&update).map(Ok::<_, Infallible>) });

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn snapshot(State(state): State<AppState>) -> Result<Json<OccupancyUpdate>, AppError> {
    state
        .live
        .latest()
        .map(|update| Json(update.as_ref().clone()))
        .ok_or_else(|| AppError::NotFoundError("No frame analysed yet.".to_string()))
}

/// Slot ids that are well formed and have a rectangle in the layout.
fn known_slot(state: &AppState, raw: Option<&str>) -> Option<SlotId> {
    let slot_id: SlotId = raw?.parse().ok()?;
    state.layout.position(&slot_id).map(|_| slot_id)
}

async fn find_car_location(
    State(state): State<AppState>,
    Form(form): Form<SlotNumberForm>,
) -> Result<Json<CarLocation>, AppError> {
    let position = known_slot(&state, form.slot_number.as_deref())
        .and_then(|id| state.layout.position(&id))
        .ok_or_else(|| AppError::ValidationError("Invalid slot number.".to_string()))?;

    Ok(Json(CarLocation {
        slot: position.slot_id.to_string(),
        position: (position.x, position.y),
    }))
}

/// Checks a slot against the latest video snapshot. Nothing is stored.
async fn book_slot(
    State(state): State<AppState>,
    Form(form): Form<SlotNumberForm>,
) -> Result<Json<StatusMessage>, AppError> {
    let slot_id = known_slot(&state, form.slot_number.as_deref())
        .ok_or_else(|| AppError::ValidationError("Slot not available.".to_string()))?;
    let slot = slot_id.to_string();

    if let Some(latest) = state.live.latest() {
        if latest.is_occupied(&slot) {
            return Err(AppError::ConflictError(format!("Slot {} is already occupied.", slot)));
        }
    }

    info!("Video slot {} reported free to caller", slot);
    Ok(Json(StatusMessage::success(format!("Slot {} booked successfully.", slot))))
}
