use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;

use crate::domain::{self, RequestId};
use crate::ports::{Clock, LoanLedger, loan_ledger};

/// `Instant`で表現できないほど先の期限の代わりに使う待ち時間（約30年）
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// 期限タスクの再試行ポリシー
///
/// 期限タスクには結果を返す呼び出し元がないため、Loan Ledgerの一時的な障害は
/// 指数バックオフで再試行する。`max_attempts`回失敗したらログに記録して破棄する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// 期限タスクの実行結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineOutcome {
    /// 延滞状態に遷移した
    MarkedOverdue,
    /// 期限到来前に状態が変わっていた（返却・延長済みなど）
    Stale,
    /// リクエストが存在しない
    Missing,
    /// 再試行を使い切って破棄した
    Dropped,
}

struct PendingDeadline {
    generation: u64,
    due_at: DateTime<Utc>,
    handle: AbortHandle,
}

/// 延滞検出スケジューラ
///
/// 返却期限を設定・更新する遷移（HandOver, Extend）ごとに、リクエストIDを
/// キーとした期限タスクをtokioのタスクとして登録する。登録は呼び出し元を
/// ブロックせず、期限タスクはHTTPリクエストとは独立したタスク上で実行される。
///
/// - リクエストIDごとに保留中のタスクは高々1つ。再登録は既存のタスクを中断して置き換える。
/// - 発火時にはリクエストを再取得し、BorrowedまたはExtendedのままの場合のみ
///   OverdueUnpaidに遷移させる。返却済みなどの場合は何もしない。
pub struct OverdueScheduler {
    loan_ledger: Arc<dyn LoanLedger>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    pending: Arc<Mutex<HashMap<RequestId, PendingDeadline>>>,
    next_generation: AtomicU64,
}

impl OverdueScheduler {
    pub fn new(loan_ledger: Arc<dyn LoanLedger>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            loan_ledger,
            clock,
            retry,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// 返却期限の到来時に延滞判定を行うタスクを登録する
    ///
    /// 同じリクエストIDの保留中タスクは中断され、新しい期限で置き換えられる。
    /// 期限が既に過ぎている場合は直ちに発火する。
    /// tokioランタイム上で呼び出すこと。
    pub fn arm(&self, request_id: RequestId, due_at: DateTime<Utc>) {
        let delay = (due_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        // 締め切りは登録時点で確定させる
        let registered_at = tokio::time::Instant::now();
        let deadline = registered_at
            .checked_add(delay)
            .unwrap_or_else(|| registered_at + FAR_FUTURE);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let loan_ledger = Arc::clone(&self.loan_ledger);
        let pending = Arc::clone(&self.pending);
        let retry = self.retry;

        // 登録が完了するまでタスクが自分自身を取り除けないよう、ロックを保持したまま起動する
        let mut guard = lock(&self.pending);

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            fire(loan_ledger.as_ref(), request_id, due_at, retry).await;

            let mut deadlines = lock(&pending);
            if deadlines.get(&request_id).map(|p| p.generation) == Some(generation) {
                deadlines.remove(&request_id);
            }
        });

        let previous = guard.insert(
            request_id,
            PendingDeadline {
                generation,
                due_at,
                handle: handle.abort_handle(),
            },
        );

        if let Some(previous) = previous {
            previous.handle.abort();
            tracing::debug!(
                request_id = %request_id,
                previous_due_at = %previous.due_at,
                due_at = %due_at,
                "Re-armed overdue deadline"
            );
        } else {
            tracing::debug!(request_id = %request_id, due_at = %due_at, "Armed overdue deadline");
        }
    }

    /// 保留中の期限タスクを中断する
    ///
    /// 発火時の状態確認だけでも正しさは保たれるが、返却済みのタスクを残さないために使う。
    pub fn disarm(&self, request_id: RequestId) {
        if let Some(previous) = lock(&self.pending).remove(&request_id) {
            previous.handle.abort();
            tracing::debug!(request_id = %request_id, "Disarmed overdue deadline");
        }
    }

    /// 台帳上の貸出中リクエストすべてについて期限タスクを再登録する
    ///
    /// タイマーは永続化されないため、プロセス起動時に呼び出す。
    /// 期限が過ぎているものは直ちに延滞判定される。
    pub async fn restore(&self) -> loan_ledger::Result<usize> {
        let on_loan = self.loan_ledger.find_on_loan().await?;
        let mut armed = 0;

        for request in on_loan {
            if let Some(due_at) = request.due_at {
                self.arm(request.id, due_at);
                armed += 1;
            }
        }

        tracing::info!(armed, "Restored overdue deadlines");
        Ok(armed)
    }

    /// 保留中の期限タスクの件数
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// 保留中の期限タスクの返却期限
    pub fn pending_due_at(&self, request_id: RequestId) -> Option<DateTime<Utc>> {
        lock(&self.pending).get(&request_id).map(|p| p.due_at)
    }

    /// すべての保留中タスクを中断する
    pub fn shutdown(&self) {
        let mut pending = lock(&self.pending);
        for (_, deadline) in pending.drain() {
            deadline.handle.abort();
        }
    }
}

impl Drop for OverdueScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(
    pending: &Mutex<HashMap<RequestId, PendingDeadline>>,
) -> MutexGuard<'_, HashMap<RequestId, PendingDeadline>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 期限到来時の処理（再試行付き）
async fn fire(
    loan_ledger: &dyn LoanLedger,
    request_id: RequestId,
    due_at: DateTime<Utc>,
    retry: RetryPolicy,
) -> DeadlineOutcome {
    let mut attempt = 1;
    let mut backoff = retry.initial_backoff;

    loop {
        match mark_overdue(loan_ledger, request_id, due_at).await {
            Ok(outcome) => {
                match outcome {
                    DeadlineOutcome::MarkedOverdue => {
                        tracing::info!(request_id = %request_id, due_at = %due_at, "Loan became overdue")
                    }
                    _ => {
                        tracing::debug!(request_id = %request_id, ?outcome, "Overdue deadline was a no-op")
                    }
                }
                return outcome;
            }
            Err(e) if attempt < retry.max_attempts => {
                tracing::warn!(
                    request_id = %request_id,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Overdue check failed, retrying: {}",
                    e
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(retry.max_backoff);
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    attempts = attempt,
                    "Dropping overdue deadline after repeated failures: {}",
                    e
                );
                return DeadlineOutcome::Dropped;
            }
        }
    }
}

/// 最新の状態を再取得してから延滞遷移を適用する（read-modify-write）
async fn mark_overdue(
    loan_ledger: &dyn LoanLedger,
    request_id: RequestId,
    due_at: DateTime<Utc>,
) -> loan_ledger::Result<DeadlineOutcome> {
    let Some(request) = loan_ledger.get_by_id(request_id).await? else {
        return Ok(DeadlineOutcome::Missing);
    };

    let Some(overdue) = domain::mark_overdue(&request, due_at) else {
        return Ok(DeadlineOutcome::Stale);
    };

    if loan_ledger.update(&overdue, request.status).await? {
        Ok(DeadlineOutcome::MarkedOverdue)
    } else {
        Ok(DeadlineOutcome::Stale)
    }
}
