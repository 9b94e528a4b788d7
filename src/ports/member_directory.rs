use crate::domain::value_objects::{Role, UserId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 会員ディレクトリポート
///
/// 貸出コンテキストは利用者のIDとロールのみを参照する。
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// 利用者が存在するか確認する（削除済みは存在しない扱い）
    async fn user_exists(&self, user_id: UserId) -> Result<bool>;

    /// 利用者のロールを取得する
    async fn get_role(&self, user_id: UserId) -> Result<Option<Role>>;
}
