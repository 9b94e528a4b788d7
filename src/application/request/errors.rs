use thiserror::Error;

use crate::domain::TransitionError;

/// 貸出リクエスト管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum RequestApplicationError {
    /// 申請者が存在しない
    #[error("user not found")]
    RequesterNotFound,

    /// 書籍がカタログに存在しない
    #[error("book not found")]
    BookNotFound,

    /// リクエストが存在しない
    #[error("request not found")]
    RequestNotFound,

    /// 有効なリクエスト数が上限（2件）に達している
    #[error("requests reached maximum limit (max {max})")]
    LimitExceeded { max: usize },

    /// 操作する権限がない（本人以外、またはロール不一致）
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// 現在の状態からは実行できない操作
    #[error("{0}")]
    InvalidTransition(String),

    /// 既にキャンセル済み
    #[error("request has already been cancelled")]
    AlreadyCancelled,

    /// 既に返却済み
    #[error("book has already been returned")]
    AlreadyReturned,

    /// Loan Ledgerのエラー
    #[error("storage failure")]
    StorageFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// CatalogGatewayのエラー
    #[error("catalog gateway failure")]
    CatalogFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// MemberDirectoryのエラー
    #[error("member directory failure")]
    DirectoryFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<TransitionError> for RequestApplicationError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::AlreadyCancelled => RequestApplicationError::AlreadyCancelled,
            TransitionError::AlreadyReturned => RequestApplicationError::AlreadyReturned,
            TransitionError::NotRequester { .. } | TransitionError::RoleNotPermitted { .. } => {
                RequestApplicationError::Forbidden(err.message())
            }
            TransitionError::InvalidSource { .. } => {
                RequestApplicationError::InvalidTransition(err.message())
            }
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, RequestApplicationError>;
