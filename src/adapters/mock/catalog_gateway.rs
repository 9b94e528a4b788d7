use crate::domain::value_objects::{BookId, BookItemId};
use crate::ports::catalog_gateway::{CatalogGateway as CatalogGatewayTrait, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// CatalogGatewayのモック実装
///
/// 書籍と蔵書を登録することで状態を持ったテストをサポート。
/// 蔵書ごとに貸出可能フラグを保持する。
pub struct CatalogGateway {
    books: Mutex<BTreeMap<BookId, BTreeMap<BookItemId, bool>>>,
}

impl CatalogGateway {
    pub fn new() -> Self {
        Self {
            books: Mutex::new(BTreeMap::new()),
        }
    }

    fn books(&self) -> MutexGuard<'_, BTreeMap<BookId, BTreeMap<BookItemId, bool>>> {
        self.books.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// テスト用に蔵書のない書籍を登録
    pub fn add_book(&self, book_id: BookId) {
        self.books().entry(book_id).or_default();
    }

    /// テスト用に貸出可能な蔵書を登録
    pub fn add_item(&self, book_id: BookId, book_item_id: BookItemId) {
        self.books()
            .entry(book_id)
            .or_default()
            .insert(book_item_id, true);
    }

    /// 蔵書が貸出可能か
    pub fn is_available(&self, book_item_id: BookItemId) -> bool {
        self.books()
            .values()
            .find_map(|items| items.get(&book_item_id).copied())
            .unwrap_or(false)
    }
}

impl Default for CatalogGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogGatewayTrait for CatalogGateway {
    async fn book_exists(&self, book_id: BookId) -> Result<bool> {
        Ok(self.books().contains_key(&book_id))
    }

    /// 貸出可能な蔵書のうちIDが最小のものを貸出不可にして返す
    async fn allocate_available_item(&self, book_id: BookId) -> Result<Option<BookItemId>> {
        let mut books = self.books();
        let Some(items) = books.get_mut(&book_id) else {
            return Ok(None);
        };

        let allocated = items
            .iter_mut()
            .find(|(_, available)| **available)
            .map(|(id, available)| {
                *available = false;
                *id
            });

        Ok(allocated)
    }

    async fn release_item(&self, book_item_id: BookItemId) -> Result<()> {
        for items in self.books().values_mut() {
            if let Some(available) = items.get_mut(&book_item_id) {
                *available = true;
            }
        }
        Ok(())
    }

    async fn get_book_item_owner(&self, book_item_id: BookItemId) -> Result<Option<BookId>> {
        Ok(self
            .books()
            .iter()
            .find(|(_, items)| items.contains_key(&book_item_id))
            .map(|(book_id, _)| *book_id))
    }
}
