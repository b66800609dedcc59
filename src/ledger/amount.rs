use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// An amount in satoshis, the minimal currency unit.
///
/// All internal arithmetic stays in integer satoshis; nothing is ever
/// implicitly rounded. An amount may be negative as a transaction-level
/// delta. Resting balances are reported as summed, not clamped.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Satoshis(pub i64);

impl Satoshis {
    pub const ZERO: Satoshis = Satoshis(0);

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Satoshis {
        Satoshis(self.0.abs())
    }
}

impl Add for Satoshis {
    type Output = Satoshis;

    fn add(self, rhs: Satoshis) -> Satoshis {
        Satoshis(self.0 + rhs.0)
    }
}

impl AddAssign for Satoshis {
    fn add_assign(&mut self, rhs: Satoshis) {
        self.0 += rhs.0;
    }
}

impl Sub for Satoshis {
    type Output = Satoshis;

    fn sub(self, rhs: Satoshis) -> Satoshis {
        Satoshis(self.0 - rhs.0)
    }
}

impl Neg for Satoshis {
    type Output = Satoshis;

    fn neg(self) -> Satoshis {
        Satoshis(-self.0)
    }
}

impl Sum for Satoshis {
    fn sum<I: Iterator<Item = Satoshis>>(iter: I) -> Satoshis {
        iter.fold(Satoshis::ZERO, Add::add)
    }
}

impl fmt::Display for Satoshis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat", self.0)
    }
}
