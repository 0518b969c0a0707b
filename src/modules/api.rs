use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::modules::coordinator::{SaveAllReport, SaveAllRequest, save_all};
use crate::modules::errors::{ErrorKind, UpdateError};
use crate::modules::requests::{
    AddRobotRequest, AddUserRequest, DeleteUserRequest, KeywordRequest, UpdateRobotRequest,
};
use crate::modules::service::UpdateService;
use crate::modules::types::{ConfigState, Recipient, Robot, SettingsBlock, SettingsBlockKind};

#[derive(Clone)]
struct AppState {
    service: UpdateService,
}

pub fn router(service: UpdateService) -> Router {
    Router::new()
        .route("/config", get(show_config))
        .route("/update_log_config", post(update_log_config))
        .route("/update_proxy_config", post(update_proxy_config))
        .route("/update_cookies", post(update_cookies))
        .route("/update_wait_time", post(update_wait_time))
        .route("/update_llm_config", post(update_llm_config))
        .route("/save_all", post(save_all_blocks))
        .route("/add_robot", post(add_robot))
        .route("/update_robot", post(update_robot))
        .route("/add_user", post(add_user))
        .route("/delete_user", post(delete_user))
        .route("/add_keyword", post(add_keyword))
        .route("/delete_keyword", post(delete_keyword))
        .with_state(AppState { service })
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    fn success(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            status: Status::Success,
            message: message.into(),
            data: Some(data),
        })
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

async fn show_config(State(state): State<AppState>) -> Json<Envelope<ConfigState>> {
    let snapshot = ConfigState::clone(&state.service.snapshot());
    Envelope::success("Current configuration", snapshot)
}

async fn update_log_config(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<SettingsBlock> {
    update_block(&state, SettingsBlockKind::Log, payload, "Log config updated").await
}

async fn update_proxy_config(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<SettingsBlock> {
    update_block(&state, SettingsBlockKind::Proxy, payload, "Proxy config updated").await
}

async fn update_cookies(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<SettingsBlock> {
    update_block(&state, SettingsBlockKind::Cookies, payload, "Cookies updated").await
}

async fn update_wait_time(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<SettingsBlock> {
    update_block(&state, SettingsBlockKind::WaitTime, payload, "Wait time updated").await
}

async fn update_llm_config(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<SettingsBlock> {
    update_block(&state, SettingsBlockKind::Llm, payload, "LLM config updated").await
}

async fn update_block(
    state: &AppState,
    kind: SettingsBlockKind,
    payload: Result<Json<Value>, JsonRejection>,
    message: &str,
) -> ApiResult<SettingsBlock> {
    let fields = body(payload)?;
    let block = state.service.update_settings_block(kind, fields).await?;
    Ok(Envelope::success(message, block))
}

async fn save_all_blocks(
    State(state): State<AppState>,
    payload: Result<Json<SaveAllRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<SaveAllReport>>), ApiError> {
    let report = save_all(&state.service, body(payload)?).await;
    let (code, status) = if report.is_success() {
        (StatusCode::OK, Status::Success)
    } else {
        (StatusCode::MULTI_STATUS, Status::Error)
    };
    Ok((
        code,
        Json(Envelope {
            status,
            message: report.summary(),
            data: Some(report),
        }),
    ))
}

async fn add_robot(
    State(state): State<AppState>,
    payload: Result<Json<AddRobotRequest>, JsonRejection>,
) -> ApiResult<Robot> {
    let robot = state.service.add_robot(body(payload)?).await?;
    Ok(Envelope::success(format!("Robot {} added", robot.name), robot))
}

async fn update_robot(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRobotRequest>, JsonRejection>,
) -> ApiResult<Robot> {
    let robot = state.service.update_robot(body(payload)?).await?;
    Ok(Envelope::success(format!("Robot {} updated", robot.name), robot))
}

async fn add_user(
    State(state): State<AppState>,
    payload: Result<Json<AddUserRequest>, JsonRejection>,
) -> ApiResult<Recipient> {
    let recipient = state.service.add_user(body(payload)?).await?;
    Ok(Envelope::success(
        format!("User {} added", recipient.phone),
        recipient,
    ))
}

async fn delete_user(
    State(state): State<AppState>,
    payload: Result<Json<DeleteUserRequest>, JsonRejection>,
) -> ApiResult<Robot> {
    let request = body(payload)?;
    let phone = request.phone.trim().to_string();
    let robot = state.service.delete_user(request).await?;
    Ok(Envelope::success(format!("User {phone} deleted"), robot))
}

async fn add_keyword(
    State(state): State<AppState>,
    payload: Result<Json<KeywordRequest>, JsonRejection>,
) -> ApiResult<Recipient> {
    let request = body(payload)?;
    let keyword = request.keyword.trim().to_string();
    let recipient = state.service.add_keyword(request).await?;
    Ok(Envelope::success(
        format!("Keyword {keyword:?} added"),
        recipient,
    ))
}

async fn delete_keyword(
    State(state): State<AppState>,
    payload: Result<Json<KeywordRequest>, JsonRejection>,
) -> ApiResult<Recipient> {
    let request = body(payload)?;
    let keyword = request.keyword.trim().to_string();
    let recipient = state.service.delete_keyword(request).await?;
    Ok(Envelope::success(
        format!("Keyword {keyword:?} deleted"),
        recipient,
    ))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

#[derive(Debug)]
struct ApiError {
    code: StatusCode,
    message: String,
}

impl ApiError {
    fn validation(message: String) -> Self {
        Self {
            code: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<UpdateError> for ApiError {
    fn from(err: UpdateError) -> Self {
        let code = match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            status: Status::Error,
            message: self.message,
            data: None,
        };
        (self.code, Json(body)).into_response()
    }
}
