//! Closed status/type enums shared by the repositories.
//!
//! All three enums are stored as uppercase TEXT columns. Encode/Decode are
//! implemented by hand against the string representation so an unexpected
//! value in the database surfaces as a decode error instead of a silent
//! free-form string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};

/// Direction of a crypto transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// Status of a crypto transaction.
///
/// Deposits are inserted already `Completed` (the custody service only
/// notifies confirmed inbound transfers). Withdrawal transactions are
/// inserted `Approved` and finalized by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Approved,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(TransactionStatus::Approved),
            "COMPLETED" => Ok(TransactionStatus::Completed),
            "FAILED" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

/// Status of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Completed,
    Rejected,
    Failed,
}

impl WithdrawalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "PENDING",
            WithdrawalStatus::Approved => "APPROVED",
            WithdrawalStatus::Completed => "COMPLETED",
            WithdrawalStatus::Rejected => "REJECTED",
            WithdrawalStatus::Failed => "FAILED",
        }
    }

    /// The complete transition table for the withdrawal lifecycle:
    /// `PENDING -> APPROVED -> {COMPLETED, FAILED}` and
    /// `PENDING -> REJECTED`. Everything else is terminal.
    pub fn can_transition_to(self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Completed) | (Approved, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Completed | WithdrawalStatus::Rejected | WithdrawalStatus::Failed
        )
    }
}

impl FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(WithdrawalStatus::Pending),
            "APPROVED" => Ok(WithdrawalStatus::Approved),
            "COMPLETED" => Ok(WithdrawalStatus::Completed),
            "REJECTED" => Ok(WithdrawalStatus::Rejected),
            "FAILED" => Ok(WithdrawalStatus::Failed),
            other => Err(format!("unknown withdrawal status: {other}")),
        }
    }
}

macro_rules! text_backed_enum {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <&str as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <&str as Type<Postgres>>::compatible(ty)
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
                <&str as Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let text = <&str as Decode<Postgres>>::decode(value)?;
                text.parse::<$name>().map_err(Into::into)
            }
        }
    };
}

text_backed_enum!(TransactionType);
text_backed_enum!(TransactionStatus);
text_backed_enum!(WithdrawalStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_allows_only_legal_edges() {
        use WithdrawalStatus::*;

        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Completed));
        assert!(Approved.can_transition_to(Failed));

        // No other edge is legal.
        for from in [Pending, Approved, Completed, Rejected, Failed] {
            for to in [Pending, Approved, Completed, Rejected, Failed] {
                let allowed = matches!(
                    (from, to),
                    (Pending, Approved)
                        | (Pending, Rejected)
                        | (Approved, Completed)
                        | (Approved, Failed)
                );
                assert_eq!(from.can_transition_to(to), allowed, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(!WithdrawalStatus::Pending.is_terminal());
        assert!(!WithdrawalStatus::Approved.is_terminal());
        assert!(WithdrawalStatus::Completed.is_terminal());
        assert!(WithdrawalStatus::Rejected.is_terminal());
        assert!(WithdrawalStatus::Failed.is_terminal());
    }

    #[test]
    fn round_trips_through_strings() {
        assert_eq!(
            "PENDING".parse::<WithdrawalStatus>().unwrap(),
            WithdrawalStatus::Pending
        );
        assert_eq!(WithdrawalStatus::Rejected.as_str(), "REJECTED");
        assert_eq!(
            "WITHDRAWAL".parse::<TransactionType>().unwrap(),
            TransactionType::Withdrawal
        );
        assert!("pending".parse::<WithdrawalStatus>().is_err());
    }
}
