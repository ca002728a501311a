//! Monetary amounts in Brazilian reais using decimal arithmetic.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of fractional digits kept for every amount.
const SCALE: u32 = 2;

/// An amount of money in BRL, always held at two decimal places.
///
/// Serializes as a decimal string (`"115.00"`) so no precision is lost
/// between the servers and the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, SCALE));

    /// Largest amount a `NUMERIC(12, 2)` column holds: `9999999999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, SCALE));

    /// Create an amount, rounding half-even to two decimal places.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        let mut amount = amount.round_dp(SCALE);
        amount.rescale(SCALE);
        Self(amount)
    }

    /// Create an amount from integer centavos (`11_500` is `115.00`).
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, SCALE))
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Whether the amount is between zero and [`Money::MAX`].
    #[must_use]
    pub fn is_storable(&self) -> bool {
        !self.is_negative() && *self <= Self::MAX
    }

    /// Multiply a unit price by a quantity, saturating at the decimal range.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// `None` if the product does not fit in a decimal.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self::new)
    }

    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self::new)
    }

    /// Format for display as `R$ 1.234,50`.
    #[must_use]
    pub fn to_brl(&self) -> String {
        let negative = self.is_negative();
        let text = format!("{:.2}", self.0.abs());
        let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, digit) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }

        let sign = if negative { "-" } else { "" };
        format!("{sign}R$ {grouped},{frac_part}")
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    /// Saturates at the decimal range; use [`Money::checked_add`] on
    /// amounts that came from a request.
    fn add(self, rhs: Self) -> Self {
        Self::new(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
