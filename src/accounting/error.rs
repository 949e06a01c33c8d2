//! Position/account error types.

use crate::types::{OwnerId, SymbolId};
use std::fmt;

#[derive(Debug)]
#[non_exhaustive]
pub enum AccountingError {
    UnknownOwner { owner_id: OwnerId },

    /// Withdrawal or margin reservation would take free balance negative.
    InsufficientFreeBalance {
        owner_id: OwnerId,
        requested: i128,
        available: i128,
    },

    /// A fill would reserve more margin than the account's equity supports.
    InsufficientMargin {
        owner_id: OwnerId,
        symbol: SymbolId,
        required: i128,
        available: i128,
    },

    /// Integrity check found the replayed state diverging from the live one.
    IntegrityViolation { owner_id: OwnerId },
}

impl fmt::Display for AccountingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountingError::UnknownOwner { owner_id } => {
                write!(f, "unknown account owner {owner_id:?}")
            }
            AccountingError::InsufficientFreeBalance {
                owner_id,
                requested,
                available,
            } => write!(
                f,
                "owner {owner_id:?}: insufficient free balance, requested {requested}, available {available}"
            ),
            AccountingError::InsufficientMargin {
                owner_id,
                symbol,
                required,
                available,
            } => write!(
                f,
                "owner {owner_id:?} symbol {symbol:?}: insufficient margin, required {required}, available {available}"
            ),
            AccountingError::IntegrityViolation { owner_id } => write!(
                f,
                "owner {owner_id:?}: ledger integrity check failed"
            ),
        }
    }
}

impl std::error::Error for AccountingError {}
