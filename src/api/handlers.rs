use crate::application::request::{
    RequestFilter, ServiceDependencies, act as execute_act, create_request as execute_create_request,
    describe_request, get_request as execute_get_request, list_requests as execute_list_requests,
};
use crate::domain::{
    Request,
    commands::{ActOnRequest, CreateRequest},
    value_objects::{RequestId, UserId},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{
    auth::AuthenticatedActor,
    error::ApiError,
    types::{ActionBody, ApiResponse, CreateRequestBody, RequestResponse},
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
    pub jwt_secret: String,
}

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn respond<T>(status: StatusCode, message: &str, data: T) -> ApiResult<T> {
    Ok((status, Json(ApiResponse::new(status, message, data))))
}

async fn to_response(deps: &ServiceDependencies, request: Request) -> Result<RequestResponse, ApiError> {
    Ok(RequestResponse::from(describe_request(deps, request).await?))
}

async fn to_responses(
    deps: &ServiceDependencies,
    requests: Vec<Request>,
) -> Result<Vec<RequestResponse>, ApiError> {
    let mut responses = Vec::with_capacity(requests.len());
    for request in requests {
        responses.push(to_response(deps, request).await?);
    }
    Ok(responses)
}

// ============================================================================
// Command handlers
// ============================================================================

/// POST /users/:user_id/requests - 貸出リクエストを作成
///
/// 強制されるビジネスルール:
/// - 利用者が存在すること
/// - 利用者の有効なリクエストが上限（2件）未満であること
/// - 書籍が存在すること
///
/// 貸出可能な蔵書があればbook_preparing、なければqueuedで作成される。
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    actor: AuthenticatedActor,
    Path(user_id): Path<i64>,
    Json(body): Json<CreateRequestBody>,
) -> ApiResult<RequestResponse> {
    let user_id = UserId::new(user_id);
    actor.ensure_can_access(user_id)?;

    let cmd = CreateRequest {
        requester_id: user_id,
        book_id: body.book_id(),
    };

    let request = execute_create_request(&state.service_deps, cmd).await?;
    let response = to_response(&state.service_deps, request).await?;

    respond(StatusCode::CREATED, "success create new request", response)
}

/// PUT /users/:user_id/requests/:request_id - リクエストに操作を適用
///
/// ボディの`action`（または`action_code`）に応じて状態を遷移させる。
/// 会員の操作（cancel, extend）は申請者本人、それ以外は司書・管理者のみ実行できる。
pub async fn act_on_request(
    State(state): State<Arc<AppState>>,
    actor: AuthenticatedActor,
    Path((user_id, request_id)): Path<(i64, i64)>,
    Json(body): Json<ActionBody>,
) -> ApiResult<RequestResponse> {
    let user_id = UserId::new(user_id);
    let request_id = RequestId::new(request_id);
    actor.ensure_can_access(user_id)?;

    let action = body.to_action().map_err(ApiError::BadRequest)?;

    // パスの利用者のリクエストであることを確認
    execute_get_request(&state.service_deps, request_id, Some(user_id)).await?;

    let cmd = ActOnRequest {
        request_id,
        actor: actor.0,
        action,
    };

    let request = execute_act(&state.service_deps, cmd).await?;
    let response = to_response(&state.service_deps, request).await?;

    respond(StatusCode::OK, "success update request", response)
}

// ============================================================================
// Query handlers
// ============================================================================

/// GET /users/:user_id/requests - 利用者のリクエスト一覧
pub async fn list_user_requests(
    State(state): State<Arc<AppState>>,
    actor: AuthenticatedActor,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<RequestResponse>> {
    let user_id = UserId::new(user_id);
    actor.ensure_can_access(user_id)?;

    let requests =
        execute_list_requests(&state.service_deps, RequestFilter::ByUser(user_id)).await?;
    let responses = to_responses(&state.service_deps, requests).await?;

    respond(StatusCode::OK, "success get all requests", responses)
}

/// GET /users/:user_id/requests/:request_id - リクエスト詳細
///
/// 見つからない場合は404、他の利用者のリクエストの場合は403を返す。
pub async fn get_user_request(
    State(state): State<Arc<AppState>>,
    actor: AuthenticatedActor,
    Path((user_id, request_id)): Path<(i64, i64)>,
) -> ApiResult<RequestResponse> {
    let user_id = UserId::new(user_id);
    actor.ensure_can_access(user_id)?;

    let request =
        execute_get_request(&state.service_deps, RequestId::new(request_id), Some(user_id))
            .await?;
    let response = to_response(&state.service_deps, request).await?;

    respond(StatusCode::OK, "success get request", response)
}

/// GET /requests - すべてのリクエスト一覧（司書・管理者のみ）
pub async fn list_all_requests(
    State(state): State<Arc<AppState>>,
    actor: AuthenticatedActor,
) -> ApiResult<Vec<RequestResponse>> {
    actor.ensure_staff()?;

    let requests = execute_list_requests(&state.service_deps, RequestFilter::All).await?;
    let responses = to_responses(&state.service_deps, requests).await?;

    respond(StatusCode::OK, "success get all requests", responses)
}
