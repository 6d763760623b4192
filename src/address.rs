//! Provides the IPv4 address space swept by an `ALL` scan and its
//! partitioning into fixed-size waves.

use std::net::Ipv4Addr;
use std::num::NonZeroU32;

/// An inclusive, non-empty range of IPv4 addresses.
///
/// No address is filtered out: reserved, loopback, multicast and broadcast
/// ranges are all part of [`AddressSpace::full`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace {
    first: u32,
    last: u32,
}

impl AddressSpace {
    /// Every IPv4 address, `0.0.0.0` through `255.255.255.255`.
    pub const fn full() -> Self {
        Self {
            first: u32::MIN,
            last: u32::MAX,
        }
    }

    /// Addresses from `first` to `last` inclusive, or `None` when the range is empty.
    ///
    /// ```rust
    /// # use std::net::Ipv4Addr;
    /// # use wavescan::address::AddressSpace;
    /// let space = AddressSpace::new(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 255)).unwrap();
    /// assert_eq!(space.address_count(), 256);
    /// ```
    pub fn new(first: Ipv4Addr, last: Ipv4Addr) -> Option<Self> {
        let (first, last) = (u32::from(first), u32::from(last));
        (first <= last).then_some(Self { first, last })
    }

    /// Number of addresses in the space. Never zero.
    pub const fn address_count(&self) -> u64 {
        (self.last as u64) - (self.first as u64) + 1
    }

    /// Number of waves [`AddressSpace::waves`] yields for `batch_size`.
    pub const fn wave_count(&self, batch_size: NonZeroU32) -> u64 {
        self.address_count().div_ceil(batch_size.get() as u64)
    }

    /// Splits the space into consecutive waves of at most `batch_size`
    /// addresses, in ascending order. Only the final wave may be shorter.
    pub const fn waves(&self, batch_size: NonZeroU32) -> Waves {
        Waves {
            next: Some(self.first),
            last: self.last,
            batch_size,
        }
    }
}

/// Iterator over the waves of an [`AddressSpace`].
#[derive(Debug, Clone)]
pub struct Waves {
    next: Option<u32>,
    last: u32,
    batch_size: NonZeroU32,
}

impl Iterator for Waves {
    type Item = Vec<Ipv4Addr>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let end = start
            .saturating_add(self.batch_size.get() - 1)
            .min(self.last);

        // Stepping past 255.255.255.255 ends the sweep instead of wrapping.
        self.next = end.checked_add(1).filter(|&next| next <= self.last);

        Some((start..=end).map(Ipv4Addr::from).collect())
    }
}
