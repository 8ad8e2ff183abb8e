use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::Instrument;

use crate::presentation::state::AppState;

use super::principal::Principal;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessResponse {
    pub user_id: String,
    pub status: &'static str,
}

/// Re-categorizes the caller's whole `normalized` stage in the background.
#[tracing::instrument(skip(state, principal), fields(user_id = %principal.user_id))]
pub async fn reprocess_handler(
    State(state): State<AppState>,
    principal: Principal,
) -> (StatusCode, Json<ReprocessResponse>) {
    let categorizer = state.categorizer.clone();
    let user_id = principal.user_id.clone();
    let span = tracing::info_span!("reprocess", user_id = %user_id);

    tokio::spawn(
        async move {
            if let Err(e) = categorizer.categorize_backlog(&user_id).await {
                tracing::error!(error = %e, "Backlog reprocessing failed");
            }
        }
        .instrument(span),
    );

    (
        StatusCode::ACCEPTED,
        Json(ReprocessResponse {
            user_id: principal.user_id,
            status: "accepted",
        }),
    )
}
