use super::auth::CurrentUser;
use super::AppState;
use crate::db::Notification;
use crate::domain::{Account, Version};
use crate::error::AppError;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{self, Stream};
use serde::Serialize;
use std::convert::Infallible;

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    #[serde(flatten)]
    pub account: Account,
    pub version: Version,
}

pub async fn get_account(
    CurrentUser(uid): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AccountResponse>, AppError> {
    let record = state.trading.account(&uid).await?;
    Ok(Json(AccountResponse {
        account: record.account,
        version: record.version,
    }))
}

/// Server-sent events, one per committed write to the caller's account.
///
/// `committed` carries the new version; `lagged` means notifications were
/// dropped and the client should re-read the account.
pub async fn stream_account(
    CurrentUser(uid): CurrentUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.trading.subscribe(&uid);

    let events = stream::unfold(subscription, |mut subscription| async move {
        let event = match subscription.next().await? {
            Notification::Committed(version) => Event::default()
                .event("committed")
                .data(format!("{{\"version\":{}}}", version.as_i64())),
            Notification::Lagged => Event::default().event("lagged").data("{}"),
        };
        Some((Ok(event), subscription))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
