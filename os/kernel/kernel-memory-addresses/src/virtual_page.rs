use crate::{FRAME_NUMBER_LIMIT, PAGE_SHIFT, VirtualAddress};
use core::fmt;
use core::ops::Add;

/// A 4 KiB page-aligned unit of linear address space.
///
/// The page number is the linear base address shifted right by
/// [`PAGE_SHIFT`]. This is the granularity at which mappings are created and
/// torn down.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualPage(u32);

impl VirtualPage {
    #[inline]
    #[must_use]
    pub const fn from_number(number: u32) -> Self {
        debug_assert!(number < FRAME_NUMBER_LIMIT);
        Self(number)
    }

    /// The linear page containing `addr`.
    #[inline]
    #[must_use]
    pub const fn containing(addr: VirtualAddress) -> Self {
        Self(addr.as_u32() >> PAGE_SHIFT)
    }

    /// Build from a page-aligned linear address.
    ///
    /// ### Debug assertions
    /// - Asserts the address is 4 KiB-aligned.
    #[inline]
    #[must_use]
    pub const fn from_base(addr: VirtualAddress) -> Self {
        debug_assert!(addr.is_page_aligned());
        Self::containing(addr)
    }

    #[inline]
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0
    }

    /// Linear address of the first byte of this page.
    #[inline]
    #[must_use]
    pub const fn base(self) -> VirtualAddress {
        VirtualAddress::new(self.0 << PAGE_SHIFT)
    }
}

impl fmt::Debug for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({} @ {})", self.0, self.base())
    }
}

impl fmt::Display for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base())
    }
}

impl Add<u32> for VirtualPage {
    type Output = Self;

    /// Advance by `rhs` pages.
    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self::from_number(self.0.checked_add(rhs).expect("VirtualPage add"))
    }
}
