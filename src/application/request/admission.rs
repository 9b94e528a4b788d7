use crate::domain::{self, Request, commands::CreateRequest};

use super::dependencies::ServiceDependencies;
use super::errors::{RequestApplicationError, Result};

/// 貸出リクエストを作成する
///
/// ビジネスルール（この順に検査する）：
/// - 申請者が存在すること
/// - 申請者の有効なリクエストが上限（2件）未満であること
/// - 書籍がカタログに存在すること
///
/// 割り当て方針：貸出可能な蔵書のうちIDが最小のものを確保する。
/// 確保できればBookPreparing、できなければ未割当のままQueuedとする。
/// この時点では貸出は始まっていないため、返却期限は設定しない。
///
/// # 一貫性保証
///
/// 上限の確認と作成の間に短い競合の窓がある（同時作成で一時的に上限を超えうる）。
/// 台帳への保存に失敗した場合は確保した蔵書を戻し、部分的な書き込みを残さない。
pub async fn create_request(deps: &ServiceDependencies, cmd: CreateRequest) -> Result<Request> {
    // 1. 申請者の存在確認
    let requester_exists = deps
        .member_directory
        .user_exists(cmd.requester_id)
        .await
        .map_err(RequestApplicationError::DirectoryFailure)?;

    if !requester_exists {
        return Err(RequestApplicationError::RequesterNotFound);
    }

    // 2. リクエスト上限確認（2件まで）
    let active_requests = deps
        .loan_ledger
        .count_active_by_user(cmd.requester_id)
        .await
        .map_err(RequestApplicationError::StorageFailure)?;

    if active_requests >= deps.policy.max_active_requests {
        return Err(RequestApplicationError::LimitExceeded {
            max: deps.policy.max_active_requests,
        });
    }

    // 3. 書籍の存在確認
    let book_exists = deps
        .catalog_gateway
        .book_exists(cmd.book_id)
        .await
        .map_err(RequestApplicationError::CatalogFailure)?;

    if !book_exists {
        return Err(RequestApplicationError::BookNotFound);
    }

    // 4. 蔵書の確保
    let allocated = deps
        .catalog_gateway
        .allocate_available_item(cmd.book_id)
        .await
        .map_err(RequestApplicationError::CatalogFailure)?;

    // 5. ドメイン層の純粋関数を呼び出し
    let new_request = domain::admit(
        cmd.requester_id,
        cmd.book_id,
        allocated,
        deps.clock.ledger_now(),
    );

    // 6. 台帳に保存
    match deps.loan_ledger.create(new_request).await {
        Ok(request) => {
            tracing::info!(
                request_id = %request.id,
                requester = %request.requester,
                book_id = %request.book_id,
                status = request.status.as_str(),
                "Created loan request"
            );
            Ok(request)
        }
        Err(e) => {
            if let Some(item) = allocated {
                if let Err(release_err) = deps.catalog_gateway.release_item(item).await {
                    tracing::error!(
                        book_item_id = %item,
                        "Failed to release book item after storage failure: {}",
                        release_err
                    );
                }
            }
            Err(RequestApplicationError::StorageFailure(e))
        }
    }
}
