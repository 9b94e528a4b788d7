use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Action, Actor, BookId, BookItemId, Performer, PromoteError, RequestId, TransitionError, UserId,
};

/// 貸出期間（日数）。延長時も同じ日数だけ返却期限を延ばす。
pub const LOAN_PERIOD_DAYS: i64 = 7;

/// 利用者1人あたりの有効なリクエストの上限
pub const MAX_ACTIVE_REQUESTS: usize = 2;

// ============================================================================
// リクエストの状態
// ============================================================================

/// 貸出リクエストの状態
///
/// ライフサイクル上の位置を表す唯一のフィールド。
/// ReturnedNormal, ReturnedLate, Cancelled は終端状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Queued,
    BookPreparing,
    ReadyForPickup,
    Borrowed,
    Extended,
    OverdueUnpaid,
    ReturnedNormal,
    ReturnedLate,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 9] = [
        RequestStatus::Queued,
        RequestStatus::BookPreparing,
        RequestStatus::ReadyForPickup,
        RequestStatus::Borrowed,
        RequestStatus::Extended,
        RequestStatus::OverdueUnpaid,
        RequestStatus::ReturnedNormal,
        RequestStatus::ReturnedLate,
        RequestStatus::Cancelled,
    ];

    /// 永続化用の文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Queued => "queued",
            RequestStatus::BookPreparing => "book_preparing",
            RequestStatus::ReadyForPickup => "ready_for_pickup",
            RequestStatus::Borrowed => "borrowed",
            RequestStatus::Extended => "extended",
            RequestStatus::OverdueUnpaid => "overdue_unpaid",
            RequestStatus::ReturnedNormal => "returned_normal",
            RequestStatus::ReturnedLate => "returned_late",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// 利用者向けの説明文
    pub fn description(&self) -> &'static str {
        match self {
            RequestStatus::Queued => "waiting in queue",
            RequestStatus::BookPreparing => "book is being prepared",
            RequestStatus::ReadyForPickup => "book is ready for pickup",
            RequestStatus::Borrowed => "book is borrowed",
            RequestStatus::Extended => "loan has been extended",
            RequestStatus::OverdueUnpaid => "loan is overdue and penalty is unpaid",
            RequestStatus::ReturnedNormal => "book has been returned",
            RequestStatus::ReturnedLate => "book has been returned late",
            RequestStatus::Cancelled => "request has been cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::ReturnedNormal | RequestStatus::ReturnedLate | RequestStatus::Cancelled
        )
    }

    /// 貸出上限の計算対象か（キャンセル・返却済み以外）
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// 返却期限が有効な貸出中の状態か
    pub fn is_on_loan(&self) -> bool {
        matches!(self, RequestStatus::Borrowed | RequestStatus::Extended)
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid request status: {}", s))
    }
}

// ============================================================================
// Request集約
// ============================================================================

/// Request集約 - 1冊の本の1回の貸出ライフサイクル
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    // 識別子
    pub id: RequestId,

    // 他の集約への参照（IDのみ）
    pub requester: UserId,
    pub book_id: BookId,
    /// Noneは順番待ち（未割当）
    pub book_item: Option<BookItemId>,

    // 貸出管理の責務
    pub status: RequestStatus,
    pub extended: bool,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn is_terminal(&self) -> bool {
        self.cancelled_at.is_some() || self.returned_at.is_some() || self.status.is_terminal()
    }
}

/// 採番前のリクエスト
///
/// Loan Ledgerが`id`を割り当てて`Request`にする。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub requester: UserId,
    pub book_id: BookId,
    pub book_item: Option<BookItemId>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl NewRequest {
    pub fn into_request(self, id: RequestId) -> Request {
        Request {
            id,
            requester: self.requester,
            book_id: self.book_id,
            book_item: self.book_item,
            status: self.status,
            extended: false,
            due_at: None,
            returned_at: None,
            cancelled_at: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

// ============================================================================
// 純粋関数
// ============================================================================

/// 純粋関数：新しいリクエストを受け付ける
///
/// ビジネスルール：
/// - 蔵書が割り当てられた場合はBookPreparing
/// - 割り当てられなかった場合はQueued（未割当）
/// - この時点では返却期限を設定しない
pub fn admit(
    requester: UserId,
    book_id: BookId,
    allocated: Option<BookItemId>,
    now: DateTime<Utc>,
) -> NewRequest {
    let status = match allocated {
        Some(_) => RequestStatus::BookPreparing,
        None => RequestStatus::Queued,
    };

    NewRequest {
        requester,
        book_id,
        book_item: allocated,
        status,
        created_at: now,
    }
}

/// 純粋関数：アクターの操作をリクエストに適用する
///
/// 検査の順序：
/// 1. 終端状態（キャンセル済み・返却済み）
/// 2. 権限（会員操作は申請者本人、司書操作は職員ロール）
/// 3. 遷移元の状態
///
/// 副作用なし。成功時は新しいRequestを返し、失敗時は元のRequestは変更されない。
pub fn apply_action(
    request: &Request,
    actor: Actor,
    action: Action,
    now: DateTime<Utc>,
    loan_period: Duration,
) -> Result<Request, TransitionError> {
    if request.cancelled_at.is_some() {
        return Err(TransitionError::AlreadyCancelled);
    }
    if request.returned_at.is_some() {
        return Err(TransitionError::AlreadyReturned);
    }

    match action.performer() {
        Performer::Requester => {
            if actor.id != request.requester {
                return Err(TransitionError::NotRequester { action });
            }
        }
        Performer::Staff => {
            if !actor.role.is_staff() {
                return Err(TransitionError::RoleNotPermitted {
                    action,
                    role: actor.role,
                });
            }
        }
    }

    let invalid = || TransitionError::InvalidSource {
        action,
        status: request.status,
    };

    let updated = match (action, request.status) {
        (Action::Cancel, RequestStatus::Queued | RequestStatus::BookPreparing) => Request {
            status: RequestStatus::Cancelled,
            cancelled_at: Some(now),
            ..request.clone()
        },
        (Action::Extend, RequestStatus::Borrowed) if !request.extended => {
            let due_at = request.due_at.unwrap_or(now) + loan_period;
            Request {
                status: RequestStatus::Extended,
                extended: true,
                due_at: Some(due_at),
                ..request.clone()
            }
        }
        (Action::NotifyPickup, RequestStatus::BookPreparing) => Request {
            status: RequestStatus::ReadyForPickup,
            ..request.clone()
        },
        (Action::HandOver, RequestStatus::ReadyForPickup) => Request {
            status: RequestStatus::Borrowed,
            due_at: Some(now + loan_period),
            ..request.clone()
        },
        (Action::ReturnNormal, RequestStatus::Borrowed | RequestStatus::Extended) => Request {
            status: RequestStatus::ReturnedNormal,
            returned_at: Some(now),
            ..request.clone()
        },
        (Action::ReturnWithPenalty, RequestStatus::OverdueUnpaid) => Request {
            status: RequestStatus::ReturnedLate,
            returned_at: Some(now),
            ..request.clone()
        },
        _ => return Err(invalid()),
    };

    Ok(Request {
        updated_at: now,
        ..updated
    })
}

/// 純粋関数：返却期限の到来による延滞遷移
///
/// ビジネスルール：
/// - BorrowedまたはExtendedの場合のみ延滞にする
/// - 予約時の返却期限と現在の返却期限が一致する場合のみ（延長で置き換えられた期限は無効）
/// - updated_atは発火時刻ではなく返却期限にそろえる
///
/// 遷移しない場合は`None`。
pub fn mark_overdue(request: &Request, armed_due_at: DateTime<Utc>) -> Option<Request> {
    if !request.status.is_on_loan() || request.due_at != Some(armed_due_at) {
        return None;
    }

    Some(Request {
        status: RequestStatus::OverdueUnpaid,
        updated_at: armed_due_at,
        ..request.clone()
    })
}

/// 純粋関数：順番待ちのリクエストに蔵書を割り当てる
pub fn promote(
    request: &Request,
    item: BookItemId,
    now: DateTime<Utc>,
) -> Result<Request, PromoteError> {
    if request.status != RequestStatus::Queued {
        return Err(PromoteError::NotQueued {
            status: request.status,
        });
    }

    Ok(Request {
        status: RequestStatus::BookPreparing,
        book_item: Some(item),
        updated_at: now,
        ..request.clone()
    })
}

/// 遷移によって蔵書の割り当てが解除されるか
///
/// 解除された蔵書はカタログに戻し、順番待ちのリクエストに回す。
pub fn released_item(before: &Request, after: &Request) -> Option<BookItemId> {
    if before.is_terminal() || !after.is_terminal() {
        return None;
    }
    after.book_item
}
