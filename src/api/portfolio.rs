use super::auth::CurrentUser;
use super::AppState;
use crate::engine::PortfolioValuation;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;

/// Open positions marked to the latest quotes, plus cash and realized P&L.
pub async fn get_portfolio(
    CurrentUser(uid): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PortfolioValuation>, AppError> {
    Ok(Json(state.trading.portfolio(&uid).await?))
}
