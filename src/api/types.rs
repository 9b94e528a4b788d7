use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::request::RequestDetail;
use crate::domain::{BookId, commands::Action};

/// 貸出リクエスト作成のリクエストボディ
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub book_id: i64,
}

impl CreateRequestBody {
    pub fn book_id(&self) -> BookId {
        BookId::new(self.book_id)
    }
}

/// 操作のリクエストボディ
///
/// 操作名（`"hand_over"`）または数値の操作コード（`4`）のどちらかで指定する。
#[derive(Debug, Default, Deserialize)]
pub struct ActionBody {
    pub action: Option<Action>,
    pub action_code: Option<u8>,
}

impl ActionBody {
    pub fn to_action(&self) -> Result<Action, String> {
        match (self.action, self.action_code) {
            (Some(action), None) => Ok(action),
            (None, Some(code)) => Action::try_from(code),
            (Some(action), Some(code)) if action.code() == code => Ok(action),
            (Some(_), Some(_)) => Err("action and action_code do not match".to_string()),
            (None, None) => Err("action is required".to_string()),
        }
    }
}

/// 貸出リクエストのレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestResponse {
    pub request_id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub book_item_id: Option<i64>,
    pub status: String,
    pub description: String,
    pub extended: bool,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RequestDetail> for RequestResponse {
    fn from(detail: RequestDetail) -> Self {
        let request = detail.request;
        Self {
            request_id: request.id.value(),
            user_id: request.requester.value(),
            book_id: detail.book_id.value(),
            book_item_id: request.book_item.map(|item| item.value()),
            status: request.status.as_str().to_string(),
            description: detail.status_description.to_string(),
            extended: request.extended,
            due_at: request.due_at,
            returned_at: request.returned_at,
            cancelled_at: request.cancelled_at,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// 成功レスポンスの共通形式
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            data,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
