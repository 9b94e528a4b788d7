use crate::domain::{
    request::{NewRequest, Request, RequestStatus},
    value_objects::{BookId, RequestId, UserId},
};
use crate::ports::loan_ledger::{LoanLedger, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory implementation of LoanLedger
///
/// Rows are kept in id order. Ids are assigned sequentially starting at 1,
/// the same way a BIGSERIAL column would.
pub struct InMemoryLoanLedger {
    state: Mutex<LedgerState>,
}

struct LedgerState {
    next_id: i64,
    rows: BTreeMap<RequestId, Request>,
}

impl InMemoryLoanLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryLoanLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanLedger for InMemoryLoanLedger {
    async fn create(&self, new_request: NewRequest) -> Result<Request> {
        let mut state = self.state();
        let id = RequestId::new(state.next_id);
        state.next_id += 1;

        let request = new_request.into_request(id);
        state.rows.insert(id, request.clone());
        Ok(request)
    }

    async fn get_by_id(&self, request_id: RequestId) -> Result<Option<Request>> {
        Ok(self.state().rows.get(&request_id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Request>> {
        Ok(self.state().rows.values().cloned().collect())
    }

    async fn get_by_user(&self, user_id: UserId) -> Result<Vec<Request>> {
        Ok(self
            .state()
            .rows
            .values()
            .filter(|r| r.requester == user_id)
            .cloned()
            .collect())
    }

    async fn count_active_by_user(&self, user_id: UserId) -> Result<usize> {
        Ok(self
            .state()
            .rows
            .values()
            .filter(|r| r.requester == user_id && r.cancelled_at.is_none() && r.returned_at.is_none())
            .count())
    }

    async fn update(&self, request: &Request, expected_status: RequestStatus) -> Result<bool> {
        let mut state = self.state();
        match state.rows.get_mut(&request.id) {
            Some(row) if row.status == expected_status && row.cancelled_at.is_none() => {
                *row = request.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_oldest_queued_for_book(&self, book_id: BookId) -> Result<Option<Request>> {
        Ok(self
            .state()
            .rows
            .values()
            .filter(|r| r.book_id == book_id && r.status == RequestStatus::Queued)
            .min_by_key(|r| (r.created_at, r.id))
            .cloned())
    }

    async fn find_on_loan(&self) -> Result<Vec<Request>> {
        Ok(self
            .state()
            .rows
            .values()
            .filter(|r| r.status.is_on_loan())
            .cloned()
            .collect())
    }
}
