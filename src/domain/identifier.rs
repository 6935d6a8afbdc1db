//! Account number
//!
//! Public routing identifier for an account: the string another user types
//! to target a transfer. Distinct from the internal primary key. Format is
//! a fixed institution prefix followed by a 16-digit random suffix, 22
//! digits total.
//!
//! Uniqueness is NOT guaranteed by this type; the unique index on
//! `accounts.account_number` is the authority. Registration retries on a
//! storage-level collision (see `RegisterHandler`).

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Institution prefix shared by every account number we issue.
pub const ACCOUNT_NUMBER_PREFIX: &str = "000002";

/// Digits drawn at random after the prefix.
const SUFFIX_LEN: usize = 16;

/// Total length of a well-formed account number.
pub const ACCOUNT_NUMBER_LEN: usize = ACCOUNT_NUMBER_PREFIX.len() + SUFFIX_LEN;

/// Attempts allowed when hunting for an unused account number before the
/// registration fails with `ExhaustedRetries`.
pub const MAX_GENERATION_ATTEMPTS: u32 = 10;

/// A validated account routing number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

/// Errors from parsing an account number supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountNumberError {
    #[error("Account number must be {ACCOUNT_NUMBER_LEN} digits (got {0})")]
    InvalidLength(usize),

    #[error("Account number must contain only digits")]
    NotNumeric,
}

impl AccountNumber {
    /// Validate a caller-supplied account number.
    pub fn parse(s: &str) -> Result<Self, AccountNumberError> {
        if s.len() != ACCOUNT_NUMBER_LEN {
            return Err(AccountNumberError::InvalidLength(s.len()));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AccountNumberError::NotNumeric);
        }
        Ok(Self(s.to_string()))
    }

    /// Draw a fresh candidate: fixed prefix + 16 random digits.
    ///
    /// Collision probability is negligible by construction, but candidates
    /// are still only *candidates* until the insert succeeds against the
    /// unique index.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut number = String::with_capacity(ACCOUNT_NUMBER_LEN);
        number.push_str(ACCOUNT_NUMBER_PREFIX);
        for _ in 0..SUFFIX_LEN {
            let digit: u8 = rng.gen_range(0..10);
            number.push(char::from(b'0' + digit));
        }
        Self(number)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = AccountNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountNumber::parse(s)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = AccountNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AccountNumber::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}
