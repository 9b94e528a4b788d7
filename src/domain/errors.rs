use super::{Action, RequestStatus, Role};

/// 状態遷移のエラー
///
/// アプリケーション層でユーザー向けのエラーに変換される。
/// どの前提条件に違反したかを呼び出し側が判別できるよう、
/// 失敗理由ごとにバリアントを分ける。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// 既にキャンセル済み
    AlreadyCancelled,
    /// 既に返却済み
    AlreadyReturned,
    /// 申請者本人以外による会員操作
    NotRequester { action: Action },
    /// ロールが操作に対して不適切
    RoleNotPermitted { action: Action, role: Role },
    /// 現在の状態からは実行できない操作
    InvalidSource {
        action: Action,
        status: RequestStatus,
    },
}

impl TransitionError {
    /// 利用者向けのメッセージ
    ///
    /// ロール別のUIが分岐できるよう、失敗した前提条件を明示する。
    pub fn message(&self) -> String {
        match self {
            TransitionError::AlreadyCancelled => "request has already been cancelled".to_string(),
            TransitionError::AlreadyReturned => "book has already been returned".to_string(),
            TransitionError::NotRequester { action } => {
                format!("only the requester can {}", action.verb())
            }
            TransitionError::RoleNotPermitted { action, role } => {
                format!("{} is not allowed to {}", role, action.verb())
            }
            TransitionError::InvalidSource { action, status } => format!(
                "cannot {} at this time (request is {})",
                action.verb(),
                status.description()
            ),
        }
    }
}

/// 順番待ちリクエストの繰り上げエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoteError {
    /// 順番待ち状態ではない
    NotQueued { status: RequestStatus },
}
