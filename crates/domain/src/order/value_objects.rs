//! Value objects for the order domain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user (the order's owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Product reference (catalog identifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new product ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Invoice identifier issued by the payment provider.
///
/// This is the correlation key between an order and the provider's
/// asynchronous notifications. It is opaque to this system and must be
/// unique across orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(String);

impl InvoiceId {
    /// Creates an invoice ID from the provider's string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the invoice ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for InvoiceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for InvoiceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Money amount in minor currency units (e.g. 1000 = 10.00).
///
/// Currency-agnostic; the currency code travels separately in the
/// gateway request. Minor units avoid floating point on financial values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    minor: i64,
}

impl Money {
    /// Creates a money amount from minor units.
    pub fn from_minor(minor: i64) -> Self {
        Self { minor }
    }

    /// Creates a money amount from major units (e.g. whole hryvnias or dollars).
    pub fn from_major(major: i64) -> Self {
        Self { minor: major * 100 }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { minor: 0 }
    }

    /// Returns the amount in minor units.
    pub fn minor(&self) -> i64 {
        self.minor
    }

    /// Returns true if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    /// Scales the amount by a line quantity.
    pub fn times(&self, quantity: u32) -> Money {
        Money {
            minor: self.minor * quantity as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            minor: self.minor + rhs.minor,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.minor += rhs.minor;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// One priced cart line frozen at checkout time.
///
/// The unit price is captured from the product at checkout and never
/// follows later catalog price edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The product reference.
    pub product_id: ProductId,

    /// Product name as displayed at checkout time.
    pub product_name: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Unit price captured at checkout, in minor units.
    pub unit_price: Money,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total for this line (quantity * unit price).
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}
