use serde::{Deserialize, Serialize};

use super::{Actor, BookId, RequestId, UserId};

/// リクエストに対する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Cancel,
    Extend,
    NotifyPickup,
    HandOver,
    ReturnNormal,
    ReturnWithPenalty,
}

/// 操作を実行できる立場
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performer {
    /// 申請者本人（会員操作）
    Requester,
    /// 司書または管理者
    Staff,
}

impl Action {
    pub fn performer(&self) -> Performer {
        match self {
            Action::Cancel | Action::Extend => Performer::Requester,
            Action::NotifyPickup
            | Action::HandOver
            | Action::ReturnNormal
            | Action::ReturnWithPenalty => Performer::Staff,
        }
    }

    /// APIで使われる数値の操作コード
    pub fn code(&self) -> u8 {
        match self {
            Action::Cancel => 1,
            Action::Extend => 2,
            Action::NotifyPickup => 3,
            Action::HandOver => 4,
            Action::ReturnNormal => 5,
            Action::ReturnWithPenalty => 6,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Action::Cancel => "cancel request",
            Action::Extend => "extend loan",
            Action::NotifyPickup => "notify pickup",
            Action::HandOver => "hand over book",
            Action::ReturnNormal => "return book",
            Action::ReturnWithPenalty => "return book with penalty",
        }
    }
}

impl TryFrom<u8> for Action {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Action::Cancel),
            2 => Ok(Action::Extend),
            3 => Ok(Action::NotifyPickup),
            4 => Ok(Action::HandOver),
            5 => Ok(Action::ReturnNormal),
            6 => Ok(Action::ReturnWithPenalty),
            _ => Err(format!("Invalid action code: {}", code)),
        }
    }
}

/// コマンド：貸出リクエストを作成する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub requester_id: UserId,
    pub book_id: BookId,
}

/// コマンド：リクエストに操作を適用する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActOnRequest {
    pub request_id: RequestId,
    pub actor: Actor,
    pub action: Action,
}
