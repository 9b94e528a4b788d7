use crate::domain::value_objects::{BookId, BookItemId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// カタログゲートウェイポート
///
/// 貸出コンテキストとカタログコンテキストの境界を維持する。
/// 貸出コンテキストは書籍と蔵書のIDのみを知り、書籍詳細は知らない。
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// 書籍がカタログに存在するか確認する
    async fn book_exists(&self, book_id: BookId) -> Result<bool>;

    /// 貸出可能な蔵書のうちIDが最小のものを確保する
    ///
    /// 確保された蔵書は`release_item`されるまで貸出不可になる。
    /// 貸出可能な蔵書がなければ`None`を返す。
    async fn allocate_available_item(&self, book_id: BookId) -> Result<Option<BookItemId>>;

    /// 確保していた蔵書を貸出可能に戻す
    ///
    /// 返却またはキャンセルで貸出リクエストが終端状態になったときに呼ばれる。
    async fn release_item(&self, book_item_id: BookItemId) -> Result<()>;

    /// 蔵書がどの書籍のものかを取得する（表示用）
    async fn get_book_item_owner(&self, book_item_id: BookItemId) -> Result<Option<BookId>>;
}
