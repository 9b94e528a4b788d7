//! PostgreSQLアダプターのテスト
//!
//! 実際のデータベースが必要なため`#[ignore]`にしている。
//! `DATABASE_URL`を設定して`cargo test -- --ignored`で実行する。

mod common;

use chrono::Duration;
use library_loans::adapters::postgres::{
    PostgresCatalogGateway, PostgresLoanLedger, PostgresMemberDirectory,
};
use library_loans::application::request::{
    LoanPolicy, RetryPolicy, ServiceDependencies, act, create_request,
};
use library_loans::domain::commands::{ActOnRequest, Action, CreateRequest};
use library_loans::domain::value_objects::*;
use library_loans::domain::{RequestStatus, admit};
use library_loans::ports::{CatalogGateway, LoanLedger, MemberDirectory, SystemClock};
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;

use common::start_time;

/// テストデータをクリーンアップし、利用者・書籍・蔵書を登録する
///
/// 書籍1には蔵書が2冊、書籍2には蔵書がない。
async fn reset_database(pool: &PgPool) -> (UserId, BookId, BookId) {
    sqlx::query("TRUNCATE TABLE requests, book_items, books, users RESTART IDENTITY CASCADE")
        .execute(pool)
        .await
        .expect("Failed to truncate tables");

    let user_id: i64 =
        sqlx::query_scalar("INSERT INTO users (role, name) VALUES ('Member', 'Alice') RETURNING id")
            .fetch_one(pool)
            .await
            .expect("Failed to insert user");

    let book_id: i64 =
        sqlx::query_scalar("INSERT INTO books (title) VALUES ('The Rust Book') RETURNING id")
            .fetch_one(pool)
            .await
            .expect("Failed to insert book");

    let empty_book_id: i64 =
        sqlx::query_scalar("INSERT INTO books (title) VALUES ('Out of Stock') RETURNING id")
            .fetch_one(pool)
            .await
            .expect("Failed to insert book");

    sqlx::query("INSERT INTO book_items (book_id) VALUES ($1), ($1)")
        .bind(book_id)
        .execute(pool)
        .await
        .expect("Failed to insert book items");

    (
        UserId::new(user_id),
        BookId::new(book_id),
        BookId::new(empty_book_id),
    )
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_member_directory_reads_roles() {
    let pool = common::create_test_pool().await;
    let (user_id, _, _) = reset_database(&pool).await;
    let directory = PostgresMemberDirectory::new(pool.clone());

    assert!(directory.user_exists(user_id).await.unwrap());
    assert_eq!(directory.get_role(user_id).await.unwrap(), Some(Role::Member));
    assert!(!directory.user_exists(UserId::new(9999)).await.unwrap());
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_catalog_allocates_lowest_available_item() {
    let pool = common::create_test_pool().await;
    let (_, book_id, empty_book_id) = reset_database(&pool).await;
    let catalog = PostgresCatalogGateway::new(pool.clone());

    assert!(catalog.book_exists(book_id).await.unwrap());
    assert!(!catalog.book_exists(BookId::new(9999)).await.unwrap());

    let first = catalog.allocate_available_item(book_id).await.unwrap().unwrap();
    let second = catalog.allocate_available_item(book_id).await.unwrap().unwrap();
    assert!(first < second);
    assert_eq!(catalog.allocate_available_item(book_id).await.unwrap(), None);
    assert_eq!(catalog.allocate_available_item(empty_book_id).await.unwrap(), None);

    catalog.release_item(first).await.unwrap();
    assert_eq!(catalog.allocate_available_item(book_id).await.unwrap(), Some(first));
    assert_eq!(catalog.get_book_item_owner(first).await.unwrap(), Some(book_id));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_ledger_create_and_get_by_id() {
    let pool = common::create_test_pool().await;
    let (user_id, book_id, _) = reset_database(&pool).await;
    let ledger = PostgresLoanLedger::new(pool.clone());

    let created = ledger
        .create(admit(user_id, book_id, None, start_time()))
        .await
        .expect("Failed to create request");

    let fetched = ledger
        .get_by_id(created.id)
        .await
        .expect("Failed to get request")
        .expect("Request not found");

    assert_eq!(fetched, created);
    assert_eq!(fetched.status, RequestStatus::Queued);
    assert_eq!(ledger.count_active_by_user(user_id).await.unwrap(), 1);
    assert_eq!(ledger.get_by_user(user_id).await.unwrap().len(), 1);
    assert_eq!(ledger.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_ledger_update_is_compare_and_set() {
    let pool = common::create_test_pool().await;
    let (user_id, book_id, _) = reset_database(&pool).await;
    let ledger = PostgresLoanLedger::new(pool.clone());

    let created = ledger
        .create(admit(user_id, book_id, Some(BookItemId::new(1)), start_time()))
        .await
        .unwrap();

    let mut borrowed = created.clone();
    borrowed.status = RequestStatus::Borrowed;
    borrowed.due_at = Some(start_time() + Duration::days(7));
    borrowed.updated_at = start_time() + Duration::hours(1);

    // 期待する状態が一致しない場合は更新しない
    assert!(!ledger.update(&borrowed, RequestStatus::Queued).await.unwrap());
    assert!(ledger.update(&borrowed, RequestStatus::BookPreparing).await.unwrap());

    let stored = ledger.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(stored, borrowed);

    let on_loan = ledger.find_on_loan().await.unwrap();
    assert_eq!(on_loan.len(), 1);
    assert_eq!(on_loan[0].id, created.id);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_ledger_finds_oldest_queued_request() {
    let pool = common::create_test_pool().await;
    let (user_id, book_id, _) = reset_database(&pool).await;
    let ledger = PostgresLoanLedger::new(pool.clone());

    let older = ledger
        .create(admit(user_id, book_id, None, start_time()))
        .await
        .unwrap();
    ledger
        .create(admit(user_id, book_id, None, start_time() + Duration::minutes(1)))
        .await
        .unwrap();

    let oldest = ledger
        .find_oldest_queued_for_book(book_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(oldest.id, older.id);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_handed_over_loan_becomes_overdue_with_stored_due_date() {
    // Arrange: PostgreSQLのアダプターと実時間の時計、貸出期間は1秒
    let pool = common::create_test_pool().await;
    let (user_id, book_id, _) = reset_database(&pool).await;
    let librarian_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (role, name) VALUES ('Librarian', 'Bob') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .expect("Failed to insert librarian");

    let ledger = Arc::new(PostgresLoanLedger::new(pool.clone()));
    let deps = ServiceDependencies::new(
        ledger.clone(),
        Arc::new(PostgresCatalogGateway::new(pool.clone())),
        Arc::new(PostgresMemberDirectory::new(pool.clone())),
        Arc::new(SystemClock),
        LoanPolicy {
            loan_period: Duration::seconds(1),
            ..LoanPolicy::default()
        },
        RetryPolicy::default(),
    );
    let librarian = Actor::new(UserId::new(librarian_id), Role::Librarian);

    let request = create_request(
        &deps,
        CreateRequest {
            requester_id: user_id,
            book_id,
        },
    )
    .await
    .expect("Failed to create request");

    let perform = |action: Action| {
        act(
            &deps,
            ActOnRequest {
                request_id: request.id,
                actor: librarian,
                action,
            },
        )
    };
    perform(Action::NotifyPickup)
        .await
        .expect("Failed to notify pickup");
    let handed_over = perform(Action::HandOver)
        .await
        .expect("Failed to hand over");
    let armed_due_at = handed_over.due_at.unwrap();

    // 登録された期限と保存された期限は同じ時刻
    let stored = ledger.get_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(stored.due_at, Some(armed_due_at));

    // Act: 返却期限を過ぎるまで待つ
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;

    // Assert
    let stored = ledger.get_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::OverdueUnpaid);
    assert_eq!(stored.updated_at, armed_due_at);
    assert_eq!(deps.overdue_scheduler.pending_count(), 0);
}
