//! Set of responding bus addresses

use twinwire_hal::Address;

/// Addresses that acknowledged a probe, one bit per 7-bit address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressSet {
    bits: u128,
}

impl AddressSet {
    /// Empty set
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Add an address
    pub fn insert(&mut self, address: Address) {
        self.bits |= 1u128 << address.get();
    }

    /// Check whether an address is in the set
    pub const fn contains(&self, address: Address) -> bool {
        self.bits & (1u128 << address.get()) != 0
    }

    /// Number of addresses in the set
    pub const fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Check whether the set is empty
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterate addresses in ascending order
    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        (0u8..=0x7F)
            .map(Address::masked)
            .filter(move |a| self.contains(*a))
    }
}

impl FromIterator<Address> for AddressSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        let mut set = Self::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}

/// Addresses probed by a scan: 0x03 to 0x77 inclusive
pub fn scan_range() -> impl Iterator<Item = Address> {
    (Address::SCAN_FIRST..=Address::SCAN_LAST).map(Address::masked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_range_size() {
        assert_eq!(scan_range().count(), 117);
        assert!(scan_range().all(|a| !a.is_reserved()));
    }

    #[test]
    fn test_insert_and_iterate() {
        let mut set = AddressSet::new();
        assert!(set.is_empty());
        set.insert(Address::masked(0x5C));
        set.insert(Address::masked(0x38));
        set.insert(Address::masked(0x38));

        assert_eq!(set.len(), 2);
        assert!(set.contains(Address::masked(0x38)));
        assert!(!set.contains(Address::masked(0x39)));

        let mut it = set.iter();
        assert_eq!(it.next(), Some(Address::masked(0x38)));
        assert_eq!(it.next(), Some(Address::masked(0x5C)));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_edges_of_bitmap() {
        let set: AddressSet = [Address::masked(0x00), Address::masked(0x7F)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Address::masked(0x7F)));
    }
}
