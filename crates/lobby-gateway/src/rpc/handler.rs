//! Inbound invocation endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use lobby_common::{AppError, ErrorResponse};
use lobby_core::{LobbyError, RpcMessage};
use serde_json::Value;

use crate::server::GatewayState;

/// Error returned by [`rpc_handler`], rendered as an [`ErrorResponse`]
#[derive(Debug)]
pub struct RpcError(pub AppError);

impl From<AppError> for RpcError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<LobbyError> for RpcError {
    fn from(err: LobbyError) -> Self {
        Self(AppError::from(err))
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = ?self.0, "Remote invocation failed");
        }

        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// Serve a `sys.channelRemote.*` call from a peer. Replies with the failed uids.
pub async fn rpc_handler(
    State(state): State<GatewayState>,
    Json(message): Json<RpcMessage>,
) -> Result<Json<Value>, RpcError> {
    tracing::debug!(
        service = %message.service,
        method = %message.method,
        "Inbound remote invocation"
    );

    let reply = state.push_handler().handle(message).await?;
    Ok(Json(reply))
}
