//! Debuggee address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Absolute address inside the debuggee's address space
///
/// Symbol tables store module-relative offsets as plain `u64`; anything that
/// has been rebased onto a module's load address is an `Address`. Keeping the
/// two apart stops a relative offset from being shown (or compared against a
/// module base) as if it were absolute.
///
/// ## Display
///
/// Addresses always render pointer-width: `0x` followed by sixteen lowercase
/// hex digits. The module-qualified fallback name produced by
/// [`SymbolInfo::resolve_symbolic_name`](crate::SymbolInfo::resolve_symbolic_name)
/// relies on this format.
///
/// ## Example
///
/// ```rust
/// use symdex_core::types::Address;
///
/// let base = Address::from(0x400000);
/// let entry = base + 0x1000;
/// assert_eq!(entry.value(), 0x401000);
/// assert_eq!(entry.offset_from(base), Some(0x1000));
/// assert_eq!(entry.to_string(), "0x0000000000401000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    ///
    /// Never a valid module base; used as the "no entry point" value by
    /// backends that report entry points as raw integers.
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `Address::from(value)` but can be used in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// `true` for the null address.
    pub const fn is_zero(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use symdex_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Module-relative offset of this address from `base`
    ///
    /// Returns `None` when the address lies below `base`.
    pub fn offset_from(self, base: Address) -> Option<u64>
    {
        self.0.checked_sub(base.0)
    }

    /// Add an offset to this address, saturating at the maximum value
    pub fn saturating_add(self, offset: u64) -> Self
    {
        Address(self.0.saturating_add(offset))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_offset_from_below_base()
    {
        let base = Address::new(0x400000);
        assert_eq!(Address::new(0x3fffff).offset_from(base), None);
        assert_eq!(base.offset_from(base), Some(0));
    }

    #[test]
    fn test_display_is_pointer_width()
    {
        assert_eq!(Address::new(0x1).to_string(), "0x0000000000000001");
        assert_eq!(format!("{:x}", Address::new(0xabc)), "abc");
    }
}
