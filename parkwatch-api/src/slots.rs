use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use parkwatch_core::ParkingSlot;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/book", post(book))
        .route("/unbook", post(unbook))
        .route("/find_car", post(find_car))
        .route("/refresh", get(refresh))
}

// Form fields are optional so a missing field surfaces as the same
// validation message as an empty one.
#[derive(Debug, Deserialize)]
pub struct BookForm {
    slot_id: Option<String>,
    reg_number: Option<String>,
    mob: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnbookForm {
    slot_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FindCarForm {
    reg_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    status: &'static str,
    message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FoundResponse {
    status: &'static str,
    slot_id: String,
    mob: String,
}

#[derive(Debug, Serialize)]
struct SpotView {
    slot_id: String,
    status: &'static str,
    reg_number: Option<String>,
    mob: Option<String>,
}

impl From<ParkingSlot> for SpotView {
    fn from(slot: ParkingSlot) -> Self {
        let status = slot.status().as_str();
        let (reg_number, mob) = match slot.occupant {
            Some(occupant) => (Some(occupant.registration), Some(occupant.phone.into_inner())),
            None => (None, None),
        };
        Self {
            slot_id: slot.slot_id.to_string(),
            status,
            reg_number,
            mob,
        }
    }
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    spots: Vec<SpotView>,
    vacant_count: usize,
    occupied_count: usize,
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let summary = state.bookings.list().await?;

    let rows: String = summary
        .slots
        .into_iter()
        .map(SpotView::from)
        .map(|spot| {
            format!(
                "<tr class=\"{status}\"><td>{id}</td><td>{status}</td><td>{reg}</td><td>{mob}</td></tr>\n",
                id = escape_html(&spot.slot_id),
                status = spot.status,
                reg = escape_html(spot.reg_number.as_deref().unwrap_or("")),
                mob = escape_html(spot.mob.as_deref().unwrap_or("")),
            )
        })
        .collect();

    let page = INDEX_TEMPLATE
        .replace("{{vacant_count}}", &summary.vacant_count.to_string())
        .replace("{{occupied_count}}", &summary.occupied_count.to_string())
        .replace("{{rows}}", &rows);

    Ok(Html(page))
}

async fn book(
    State(state): State<AppState>,
    Form(form): Form<BookForm>,
) -> Result<Json<StatusMessage>, AppError> {
    state
        .bookings
        .book(
            form.slot_id.as_deref().unwrap_or(""),
            form.reg_number.as_deref().unwrap_or(""),
            form.mob.as_deref().unwrap_or(""),
        )
        .await?;

    Ok(Json(StatusMessage::success("Slot booked successfully!")))
}

async fn unbook(
    State(state): State<AppState>,
    Form(form): Form<UnbookForm>,
) -> Result<Json<StatusMessage>, AppError> {
    state
        .bookings
        .unbook(form.slot_id.as_deref().unwrap_or(""))
        .await?;

    Ok(Json(StatusMessage::success("Slot unbooked successfully!")))
}

async fn find_car(
    State(state): State<AppState>,
    Form(form): Form<FindCarForm>,
) -> Result<Json<FoundResponse>, AppError> {
    let location = state
        .bookings
        .find(form.reg_number.as_deref().unwrap_or(""))
        .await?;

    Ok(Json(FoundResponse {
        status: "found",
        slot_id: location.slot_id.to_string(),
        mob: location.phone.into_inner(),
    }))
}

async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    let summary = state.bookings.list().await?;

    Ok(Json(RefreshResponse {
        spots: summary.slots.into_iter().map(SpotView::from).collect(),
        vacant_count: summary.vacant_count,
        occupied_count: summary.occupied_count,
    }))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
        assert_eq!(escape_html("UP32 12345"), "UP32 12345");
    }
}
