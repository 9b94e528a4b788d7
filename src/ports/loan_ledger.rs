use crate::domain::{
    request::{NewRequest, Request, RequestStatus},
    value_objects::{BookId, RequestId, UserId},
};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出台帳ポート
///
/// 貸出リクエストの永続化を抽象化する。貸出状態の正とするデータ。
/// 行は物理削除されず、終端状態がライフサイクルの終わりとなる。
#[async_trait]
pub trait LoanLedger: Send + Sync {
    /// 新しいリクエストを保存し、採番されたリクエストを返す
    async fn create(&self, new_request: NewRequest) -> Result<Request>;

    /// IDでリクエストを取得する
    async fn get_by_id(&self, request_id: RequestId) -> Result<Option<Request>>;

    /// すべてのリクエストを取得する（ID順）
    async fn get_all(&self) -> Result<Vec<Request>>;

    /// 利用者のリクエストを取得する（ID順）
    async fn get_by_user(&self, user_id: UserId) -> Result<Vec<Request>>;

    /// 利用者の有効な（キャンセル・返却済みでない）リクエスト数を数える
    ///
    /// 貸出上限（利用者ごと最大2件）の確認に使用される。
    async fn count_active_by_user(&self, user_id: UserId) -> Result<usize>;

    /// リクエストを更新する
    ///
    /// 保存されている状態が`expected_status`と一致する場合のみ更新する
    /// （compare-and-set）。一致せず更新しなかった場合は`false`を返す。
    /// 操作による遷移と期限による遷移が競合したとき、永続化された状態が
    /// どちらの更新を有効とするかを決める。
    async fn update(&self, request: &Request, expected_status: RequestStatus) -> Result<bool>;

    /// 書籍の順番待ちリクエストのうち最も古いものを取得する
    async fn find_oldest_queued_for_book(&self, book_id: BookId) -> Result<Option<Request>>;

    /// 貸出中（BorrowedまたはExtended）のリクエストを取得する
    ///
    /// 起動時に延滞検出の期限を再設定するために使用される。
    async fn find_on_loan(&self) -> Result<Vec<Request>>;
}
