use crate::domain::{Request, RequestId, UserId};

use super::dependencies::ServiceDependencies;
use super::errors::{RequestApplicationError, Result};

/// リクエスト一覧の絞り込み条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFilter {
    All,
    ByUser(UserId),
}

/// IDでリクエストを取得する
///
/// `requester_id`が指定された場合、その利用者のリクエストでなければ`Forbidden`。
pub async fn get_request(
    deps: &ServiceDependencies,
    request_id: RequestId,
    requester_id: Option<UserId>,
) -> Result<Request> {
    let request = deps
        .loan_ledger
        .get_by_id(request_id)
        .await
        .map_err(RequestApplicationError::StorageFailure)?
        .ok_or(RequestApplicationError::RequestNotFound)?;

    match requester_id {
        Some(user_id) if user_id != request.requester => Err(RequestApplicationError::Forbidden(
            "request belongs to another user".to_string(),
        )),
        _ => Ok(request),
    }
}

/// リクエストの一覧を取得する
///
/// 利用者で絞り込む場合、存在しない利用者は`RequesterNotFound`。
pub async fn list_requests(deps: &ServiceDependencies, filter: RequestFilter) -> Result<Vec<Request>> {
    match filter {
        RequestFilter::All => deps
            .loan_ledger
            .get_all()
            .await
            .map_err(RequestApplicationError::StorageFailure),
        RequestFilter::ByUser(user_id) => {
            let user_exists = deps
                .member_directory
                .user_exists(user_id)
                .await
                .map_err(RequestApplicationError::DirectoryFailure)?;

            if !user_exists {
                return Err(RequestApplicationError::RequesterNotFound);
            }

            deps.loan_ledger
                .get_by_user(user_id)
                .await
                .map_err(RequestApplicationError::StorageFailure)
        }
    }
}
