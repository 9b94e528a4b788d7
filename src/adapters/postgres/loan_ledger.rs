use crate::domain::{
    request::{NewRequest, Request, RequestStatus},
    value_objects::{BookId, BookItemId, RequestId, UserId},
};
use crate::ports::loan_ledger::{LoanLedger as LoanLedgerTrait, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{
    PgPool, Postgres, Row,
    postgres::{PgArguments, PgRow},
    query::Query,
};
use std::str::FromStr;

const SELECT_REQUEST: &str = r#"
    SELECT
        id,
        requester_id,
        book_id,
        book_item_id,
        status,
        extended,
        created_at,
        due_at,
        returned_at,
        cancelled_at,
        updated_at
    FROM requests
"#;

/// PostgreSQLの行データをRequestに変換する
///
/// statusの文字列からの変換でエラーハンドリングを行う。
fn map_row_to_request(row: &PgRow) -> Result<Request> {
    let status_str: &str = row.get("status");
    let status = RequestStatus::from_str(status_str).map_err(|e| {
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            as Box<dyn std::error::Error + Send + Sync>
    })?;

    let book_item_id: Option<i64> = row.get("book_item_id");

    Ok(Request {
        id: RequestId::new(row.get("id")),
        requester: UserId::new(row.get("requester_id")),
        book_id: BookId::new(row.get("book_id")),
        book_item: book_item_id.map(BookItemId::new),
        status,
        extended: row.get("extended"),
        due_at: row.get("due_at"),
        returned_at: row.get("returned_at"),
        cancelled_at: row.get("cancelled_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// LoanLedgerのPostgreSQL実装
///
/// 貸出リクエストの正となるテーブル`requests`を読み書きする。
pub struct LoanLedger {
    pool: PgPool,
}

impl LoanLedger {
    /// PostgreSQLコネクションプールから新しいLoanLedgerを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 行をストリームで読みながらRequestに変換する
    async fn fetch_all(&self, query: Query<'_, Postgres, PgArguments>) -> Result<Vec<Request>> {
        let mut rows = query.fetch(&self.pool);
        let mut requests = Vec::new();

        while let Some(row) = rows.try_next().await? {
            requests.push(map_row_to_request(&row)?);
        }

        Ok(requests)
    }
}

#[async_trait]
impl LoanLedgerTrait for LoanLedger {
    /// 新しいリクエストを挿入し、採番されたIDを付けて返す
    async fn create(&self, new_request: NewRequest) -> Result<Request> {
        let row = sqlx::query(
            r#"
            INSERT INTO requests (
                requester_id,
                book_id,
                book_item_id,
                status,
                extended,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, FALSE, $5, $5)
            RETURNING id
            "#,
        )
        .bind(new_request.requester.value())
        .bind(new_request.book_id.value())
        .bind(new_request.book_item.map(|item| item.value()))
        .bind(new_request.status.as_str())
        .bind(new_request.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(new_request.into_request(RequestId::new(row.get("id"))))
    }

    async fn get_by_id(&self, request_id: RequestId) -> Result<Option<Request>> {
        let row = sqlx::query(&format!("{SELECT_REQUEST} WHERE id = $1"))
            .bind(request_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_request).transpose()
    }

    async fn get_all(&self) -> Result<Vec<Request>> {
        let sql = format!("{SELECT_REQUEST} ORDER BY id");
        self.fetch_all(sqlx::query(&sql)).await
    }

    async fn get_by_user(&self, user_id: UserId) -> Result<Vec<Request>> {
        let sql = format!("{SELECT_REQUEST} WHERE requester_id = $1 ORDER BY id");
        self.fetch_all(sqlx::query(&sql).bind(user_id.value())).await
    }

    /// 有効なリクエスト数（部分インデックスを使用）
    async fn count_active_by_user(&self, user_id: UserId) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(id)
            FROM requests
            WHERE requester_id = $1
              AND cancelled_at IS NULL
              AND returned_at IS NULL
            "#,
        )
        .bind(user_id.value())
        .fetch_one(&self.pool)
        .await?;

        Ok(usize::try_from(count)?)
    }

    /// 取得時の状態を条件に更新する（compare-and-set）
    ///
    /// キャンセル済みの行は更新しない。
    async fn update(&self, request: &Request, expected_status: RequestStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE requests
            SET book_item_id = $2,
                status = $3,
                extended = $4,
                due_at = $5,
                returned_at = $6,
                cancelled_at = $7,
                updated_at = $8
            WHERE id = $1
              AND status = $9
              AND cancelled_at IS NULL
            "#,
        )
        .bind(request.id.value())
        .bind(request.book_item.map(|item| item.value()))
        .bind(request.status.as_str())
        .bind(request.extended)
        .bind(request.due_at)
        .bind(request.returned_at)
        .bind(request.cancelled_at)
        .bind(request.updated_at)
        .bind(expected_status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_oldest_queued_for_book(&self, book_id: BookId) -> Result<Option<Request>> {
        let row = sqlx::query(&format!(
            "{SELECT_REQUEST} WHERE book_id = $1 AND status = 'queued' ORDER BY created_at, id LIMIT 1"
        ))
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_request).transpose()
    }

    async fn find_on_loan(&self) -> Result<Vec<Request>> {
        let sql =
            format!("{SELECT_REQUEST} WHERE status IN ('borrowed', 'extended') ORDER BY due_at");
        self.fetch_all(sqlx::query(&sql)).await
    }
}
