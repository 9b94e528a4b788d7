use chrono::Duration;
use std::sync::Arc;

use crate::domain::{LOAN_PERIOD_DAYS, MAX_ACTIVE_REQUESTS};
use crate::ports::*;

use super::overdue_scheduler::{OverdueScheduler, RetryPolicy};

/// 貸出の業務ルールのパラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPolicy {
    /// 貸出期間（延長時の延長幅も同じ）
    pub loan_period: Duration,
    /// 利用者ごとの有効なリクエストの上限
    pub max_active_requests: usize,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            loan_period: Duration::days(LOAN_PERIOD_DAYS),
            max_active_requests: MAX_ACTIVE_REQUESTS,
        }
    }
}

/// サービスの依存関係
///
/// データ構造として定義し、振る舞いは持たない。
/// ユースケース関数に依存関係を明示的に渡す。
/// 延滞検出スケジューラはLoan Ledgerと時計を共有するため、`new`で一緒に組み立てる。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub loan_ledger: Arc<dyn LoanLedger>,
    pub catalog_gateway: Arc<dyn CatalogGateway>,
    pub member_directory: Arc<dyn MemberDirectory>,
    pub clock: Arc<dyn Clock>,
    pub overdue_scheduler: Arc<OverdueScheduler>,
    pub policy: LoanPolicy,
}

impl ServiceDependencies {
    pub fn new(
        loan_ledger: Arc<dyn LoanLedger>,
        catalog_gateway: Arc<dyn CatalogGateway>,
        member_directory: Arc<dyn MemberDirectory>,
        clock: Arc<dyn Clock>,
        policy: LoanPolicy,
        retry: RetryPolicy,
    ) -> Self {
        let overdue_scheduler = Arc::new(OverdueScheduler::new(
            Arc::clone(&loan_ledger),
            Arc::clone(&clock),
            retry,
        ));

        Self {
            loan_ledger,
            catalog_gateway,
            member_directory,
            clock,
            overdue_scheduler,
            policy,
        }
    }
}
