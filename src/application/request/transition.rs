use crate::domain::{
    self, Actor, BookId, BookItemId, Performer, Request, RequestStatus,
    commands::{ActOnRequest, Action},
};

use super::dependencies::ServiceDependencies;
use super::errors::{RequestApplicationError, Result};

/// リクエストに操作を適用する
///
/// ビジネスルール：
/// - リクエストが存在すること
/// - キャンセル済み・返却済みでないこと
/// - 会員操作（Cancel, Extend）は申請者本人であること
/// - 司書操作（NotifyPickup, HandOver, ReturnNormal, ReturnWithPenalty）は職員ロールであること
///   （トークン上のロールに加え、会員ディレクトリ上の現在のロールも確認する）
/// - 現在の状態から実行できる操作であること
///
/// 返却期限を設定・更新した場合（HandOver, Extend）は延滞検出の期限タスクを登録する。
/// 登録はブロックせず、この関数はすぐに戻る。
///
/// # 一貫性保証
///
/// 直前に最新の状態を取得し、取得時の状態を条件に更新する（read-modify-write）。
/// 期限タスクとの競合で状態が変わっていた場合は`InvalidTransition`を返し、何も変更しない。
pub async fn act(deps: &ServiceDependencies, cmd: ActOnRequest) -> Result<Request> {
    // 1. 最新の状態を取得
    let current = deps
        .loan_ledger
        .get_by_id(cmd.request_id)
        .await
        .map_err(RequestApplicationError::StorageFailure)?
        .ok_or(RequestApplicationError::RequestNotFound)?;

    // 2. ドメイン層の純粋関数を呼び出し
    // 返却期限は台帳に保存される精度で確定させ、期限タスクと保存値を一致させる
    let now = deps.clock.ledger_now();
    let updated =
        domain::apply_action(&current, cmd.actor, cmd.action, now, deps.policy.loan_period)?;

    // 3. 職員操作は会員ディレクトリ上のロールでも確認
    if cmd.action.performer() == Performer::Staff {
        ensure_staff_role(deps, cmd.actor, cmd.action).await?;
    }

    // 4. 取得時の状態を条件に保存
    let stored = deps
        .loan_ledger
        .update(&updated, current.status)
        .await
        .map_err(RequestApplicationError::StorageFailure)?;

    if !stored {
        return Err(RequestApplicationError::InvalidTransition(format!(
            "cannot {} at this time (request state changed concurrently)",
            cmd.action.verb()
        )));
    }

    tracing::info!(
        request_id = %updated.id,
        actor = %cmd.actor.id,
        role = %cmd.actor.role,
        action = cmd.action.verb(),
        from = current.status.as_str(),
        to = updated.status.as_str(),
        "Applied request transition"
    );

    // 5. 延滞検出の期限タスク
    match (updated.status, updated.due_at) {
        (RequestStatus::Borrowed | RequestStatus::Extended, Some(due_at)) => {
            deps.overdue_scheduler.arm(updated.id, due_at);
        }
        (status, _) if status.is_terminal() => {
            deps.overdue_scheduler.disarm(updated.id);
        }
        _ => {}
    }

    // 6. 蔵書の返却と順番待ちの繰り上げ
    if let Some(item) = domain::released_item(&current, &updated) {
        release_and_promote(deps, updated.book_id, item).await;
    }

    Ok(updated)
}

/// 操作者が現在も職員ロールを持っているか確認する
///
/// トークン発行後にロールが変更・削除された利用者の職員操作を拒否する。
async fn ensure_staff_role(deps: &ServiceDependencies, actor: Actor, action: Action) -> Result<()> {
    let role = deps
        .member_directory
        .get_role(actor.id)
        .await
        .map_err(RequestApplicationError::DirectoryFailure)?;

    match role {
        Some(role) if role.is_staff() => Ok(()),
        Some(role) => Err(RequestApplicationError::Forbidden(format!(
            "only staff can {} (current role: {})",
            action.verb(),
            role
        ))),
        None => Err(RequestApplicationError::Forbidden(format!(
            "only registered staff can {}",
            action.verb()
        ))),
    }
}

/// 蔵書をカタログに戻し、順番待ちのリクエストがあれば割り当てる
///
/// 失敗してもログに記録するだけで、呼び出し元の操作は成功のままとする。
async fn release_and_promote(deps: &ServiceDependencies, book_id: BookId, item: BookItemId) {
    if let Err(e) = deps.catalog_gateway.release_item(item).await {
        tracing::error!(book_item_id = %item, "Failed to release book item: {}", e);
        return;
    }

    if let Err(e) = promote_oldest_queued(deps, book_id).await {
        tracing::warn!(book_id = %book_id, "Failed to promote queued request: {}", e);
    }
}

/// 書籍の最も古い順番待ちリクエストに蔵書を割り当ててBookPreparingにする
async fn promote_oldest_queued(deps: &ServiceDependencies, book_id: BookId) -> Result<Option<Request>> {
    let Some(queued) = deps
        .loan_ledger
        .find_oldest_queued_for_book(book_id)
        .await
        .map_err(RequestApplicationError::StorageFailure)?
    else {
        return Ok(None);
    };

    let Some(item) = deps
        .catalog_gateway
        .allocate_available_item(book_id)
        .await
        .map_err(RequestApplicationError::CatalogFailure)?
    else {
        return Ok(None);
    };

    let promoted = match domain::promote(&queued, item, deps.clock.ledger_now()) {
        Ok(promoted) => promoted,
        Err(e) => {
            tracing::debug!(request_id = %queued.id, ?e, "Skipped promotion");
            give_back(deps, item).await;
            return Ok(None);
        }
    };

    match deps.loan_ledger.update(&promoted, RequestStatus::Queued).await {
        Ok(true) => {
            tracing::info!(
                request_id = %promoted.id,
                book_item_id = %item,
                "Promoted queued request"
            );
            Ok(Some(promoted))
        }
        Ok(false) => {
            give_back(deps, item).await;
            Ok(None)
        }
        Err(e) => {
            give_back(deps, item).await;
            Err(RequestApplicationError::StorageFailure(e))
        }
    }
}

async fn give_back(deps: &ServiceDependencies, item: BookItemId) {
    if let Err(e) = deps.catalog_gateway.release_item(item).await {
        tracing::error!(book_item_id = %item, "Failed to release book item: {}", e);
    }
}
