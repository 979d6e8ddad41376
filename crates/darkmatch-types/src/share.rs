//! Field scalars and Shamir shares.
//!
//! Splitting and joining shares is the job of the secure-computation
//! network. The pipeline only needs the linear part: two shares held at the
//! same index can be subtracted locally to obtain a share of the difference
//! of their secrets.

use std::{
    fmt,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

use crate::constants::FIELD_PRIME;

/// An element of the prime field `Z / FIELD_PRIME`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Scalar(u64);

impl Scalar {
    pub const ZERO: Self = Self(0);

    /// Reduce `value` into the field.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value % FIELD_PRIME)
    }

    /// `-value` in the field, i.e. `FIELD_PRIME - value`.
    #[must_use]
    pub const fn negative(value: u64) -> Self {
        Self::ZERO.sub_const(Self::new(value))
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Signed-residue convention used by the comparison protocol: residues in
    /// `[0, FIELD_PRIME / 2]` are non-negative, the upper half is negative.
    #[must_use]
    pub const fn is_non_negative(self) -> bool {
        self.0 <= FIELD_PRIME / 2
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    const fn sub_const(self, rhs: Self) -> Self {
        if self.0 >= rhs.0 {
            Self(self.0 - rhs.0)
        } else {
            Self(FIELD_PRIME - (rhs.0 - self.0))
        }
    }
}

impl Add for Scalar {
    type Output = Self;

    #[allow(clippy::cast_possible_truncation)]
    fn add(self, rhs: Self) -> Self {
        let sum = (u128::from(self.0) + u128::from(rhs.0)) % u128::from(FIELD_PRIME);
        Self(sum as u64)
    }
}

impl Sub for Scalar {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.sub_const(rhs)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One Shamir share: the evaluation of the sharing polynomial at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Share {
    pub index: u64,
    pub value: Scalar,
}

impl Share {
    #[must_use]
    pub fn new(index: u64, value: Scalar) -> Self {
        Self { index, value }
    }

    /// Share of `secret(self) - secret(rhs)`.
    ///
    /// Returns `None` when the shares were taken at different indices.
    #[must_use]
    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        (self.index == rhs.index).then(|| Self::new(self.index, self.value - rhs.value))
    }
}
