use crate::domain::{BookId, Request};

use super::dependencies::ServiceDependencies;
use super::errors::{RequestApplicationError, Result};

/// 表示用のリクエスト詳細
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDetail {
    pub request: Request,
    /// 割り当てられた蔵書の書籍（未割当なら申請された書籍）
    pub book_id: BookId,
    pub status_description: &'static str,
}

/// リクエストから表示用の詳細を組み立てる
pub async fn describe_request(deps: &ServiceDependencies, request: Request) -> Result<RequestDetail> {
    let book_id = match request.book_item {
        Some(item) => deps
            .catalog_gateway
            .get_book_item_owner(item)
            .await
            .map_err(RequestApplicationError::CatalogFailure)?
            .unwrap_or(request.book_id),
        None => request.book_id,
    };

    Ok(RequestDetail {
        status_description: request.status.description(),
        book_id,
        request,
    })
}
