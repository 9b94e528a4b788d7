//! 延滞検出スケジューラのタイミングのテスト
//!
//! tokioの時間を停止し、ManualClockと同じだけ進めて期限タスクを発火させる。

use chrono::Duration;
use library_loans::application::request::RequestApplicationError;
use library_loans::domain::commands::Action;
use library_loans::domain::value_objects::BookItemId;
use library_loans::domain::{LOAN_PERIOD_DAYS, RequestStatus};

mod common;

use common::*;

/// 起床したタスクを実行させる
async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// 時計とtokioの時間を同じだけ進める
async fn advance(ctx: &TestContext, by: Duration) {
    ctx.clock.advance(by);
    tokio::time::advance(by.to_std().unwrap()).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_unreturned_loan_becomes_overdue_at_due_date() {
    // Arrange: 受け渡し済みのリクエスト
    let ctx = setup();
    let borrowed = ctx.borrowed_request().await;
    let due_at = borrowed.due_at.unwrap();

    // Act: 何も操作せずに返却期限まで進める
    advance(&ctx, Duration::days(LOAN_PERIOD_DAYS)).await;

    // Assert: 外部からの呼び出しなしで延滞になる
    let stored = ctx.stored(&borrowed).await;
    assert_eq!(stored.status, RequestStatus::OverdueUnpaid);
    assert_eq!(stored.updated_at, due_at);
    assert_eq!(stored.due_at, Some(due_at));
    assert_eq!(ctx.deps.overdue_scheduler.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_due_date_with_sub_microsecond_clock_still_becomes_overdue() {
    // Arrange: 時計がナノ秒の端数を持つ（台帳はマイクロ秒までしか保存しない）
    let ctx = setup();
    ctx.clock.set(start_time() + Duration::nanoseconds(467_820_646));
    let borrowed = ctx.borrowed_request().await;
    let due_at = borrowed.due_at.unwrap();

    // 登録された期限は保存される精度に揃っている
    assert_eq!(due_at.timestamp_subsec_nanos(), 467_820_000);
    assert_eq!(ctx.deps.overdue_scheduler.pending_due_at(borrowed.id), Some(due_at));
    assert_eq!(ctx.stored(&borrowed).await.due_at, Some(due_at));

    // Act
    advance(&ctx, Duration::days(LOAN_PERIOD_DAYS)).await;

    // Assert
    let stored = ctx.stored(&borrowed).await;
    assert_eq!(stored.status, RequestStatus::OverdueUnpaid);
    assert_eq!(stored.updated_at, due_at);
    assert_eq!(ctx.deps.overdue_scheduler.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_loan_is_not_overdue_before_due_date() {
    let ctx = setup();
    let borrowed = ctx.borrowed_request().await;

    advance(&ctx, Duration::days(LOAN_PERIOD_DAYS - 1)).await;

    let stored = ctx.stored(&borrowed).await;
    assert_eq!(stored.status, RequestStatus::Borrowed);
    assert_eq!(ctx.deps.overdue_scheduler.pending_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_returned_loan_never_becomes_overdue() {
    // Arrange
    let ctx = setup();
    let borrowed = ctx.borrowed_request().await;

    // Act: 期限前に返却し、期限を大きく過ぎるまで進める
    advance(&ctx, Duration::days(3)).await;
    ctx.perform(&borrowed, librarian(), Action::ReturnNormal)
        .await
        .unwrap();
    advance(&ctx, Duration::days(30)).await;

    // Assert
    let stored = ctx.stored(&borrowed).await;
    assert_eq!(stored.status, RequestStatus::ReturnedNormal);
    assert_eq!(ctx.deps.overdue_scheduler.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_overdue_loan_is_returned_with_penalty() {
    let ctx = setup();
    let borrowed = ctx.borrowed_request().await;
    advance(&ctx, Duration::days(LOAN_PERIOD_DAYS)).await;

    // 延滞中は通常の返却はできない
    let normal = ctx
        .perform(&borrowed, librarian(), Action::ReturnNormal)
        .await;
    assert!(matches!(
        normal,
        Err(RequestApplicationError::InvalidTransition(_))
    ));

    let returned = ctx
        .perform(&borrowed, librarian(), Action::ReturnWithPenalty)
        .await
        .unwrap();

    assert_eq!(returned.status, RequestStatus::ReturnedLate);
    assert!(returned.returned_at.is_some());
    assert!(ctx.catalog.is_available(BookItemId::new(BOOK_ITEM)));
}

#[tokio::test(start_paused = true)]
async fn test_extend_moves_the_overdue_deadline() {
    // Arrange
    let ctx = setup();
    let borrowed = ctx.borrowed_request().await;
    let first_due = borrowed.due_at.unwrap();

    // Act: 期限の前日に延長
    advance(&ctx, Duration::days(LOAN_PERIOD_DAYS - 1)).await;
    let extended = ctx
        .perform(&borrowed, member(), Action::Extend)
        .await
        .unwrap();
    let second_due = extended.due_at.unwrap();
    assert_eq!(second_due, first_due + Duration::days(LOAN_PERIOD_DAYS));

    // Assert: 保留中のタスクは1つで、元の期限では発火しない
    assert_eq!(ctx.deps.overdue_scheduler.pending_count(), 1);
    assert_eq!(
        ctx.deps.overdue_scheduler.pending_due_at(borrowed.id),
        Some(second_due)
    );

    advance(&ctx, Duration::days(2)).await;
    assert_eq!(ctx.stored(&borrowed).await.status, RequestStatus::Extended);

    // Assert: 延長後の期限で延滞になる
    advance(&ctx, Duration::days(LOAN_PERIOD_DAYS - 1)).await;
    let stored = ctx.stored(&borrowed).await;
    assert_eq!(stored.status, RequestStatus::OverdueUnpaid);
    assert_eq!(stored.updated_at, second_due);
}

#[tokio::test(start_paused = true)]
async fn test_restore_rearms_loans_from_ledger() {
    // Arrange: 期限タスクが失われた状態（再起動を模擬）
    let ctx = setup();
    let borrowed = ctx.borrowed_request().await;
    ctx.deps.overdue_scheduler.shutdown();
    assert_eq!(ctx.deps.overdue_scheduler.pending_count(), 0);

    // Act
    let armed = ctx.deps.overdue_scheduler.restore().await.unwrap();

    // Assert
    assert_eq!(armed, 1);
    assert_eq!(
        ctx.deps.overdue_scheduler.pending_due_at(borrowed.id),
        borrowed.due_at
    );

    advance(&ctx, Duration::days(LOAN_PERIOD_DAYS)).await;
    assert_eq!(
        ctx.stored(&borrowed).await.status,
        RequestStatus::OverdueUnpaid
    );
}

#[tokio::test(start_paused = true)]
async fn test_restore_marks_past_due_loans_immediately() {
    let ctx = setup();
    let borrowed = ctx.borrowed_request().await;
    ctx.deps.overdue_scheduler.shutdown();

    // 停止中に返却期限を過ぎる
    advance(&ctx, Duration::days(LOAN_PERIOD_DAYS + 1)).await;
    assert_eq!(ctx.stored(&borrowed).await.status, RequestStatus::Borrowed);

    ctx.deps.overdue_scheduler.restore().await.unwrap();
    settle().await;

    let stored = ctx.stored(&borrowed).await;
    assert_eq!(stored.status, RequestStatus::OverdueUnpaid);
    assert_eq!(stored.updated_at, borrowed.due_at.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_restore_skips_requests_not_on_loan() {
    let ctx = setup();
    ctx.request_book(MEMBER, BOOK).await;
    ctx.request_book(OTHER_MEMBER, OTHER_BOOK).await;

    let armed = ctx.deps.overdue_scheduler.restore().await.unwrap();

    assert_eq!(armed, 0);
    assert_eq!(ctx.deps.overdue_scheduler.pending_count(), 0);
}
