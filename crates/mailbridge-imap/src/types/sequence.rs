//! UID sets for UID commands.

use super::Uid;

/// One element of a UID set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UidRange {
    /// A single UID.
    Single(Uid),
    /// Inclusive range.
    Range(Uid, Uid),
    /// From a UID to the highest UID in the mailbox (`n:*`).
    From(Uid),
}

impl std::fmt::Display for UidRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(uid) => write!(f, "{uid}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::From(start) => write!(f, "{start}:*"),
        }
    }
}

/// A set of UIDs, e.g. `1:3,7,10:*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UidSet {
    ranges: Vec<UidRange>,
}

impl UidSet {
    /// Every message in the mailbox (`1:*`).
    #[must_use]
    pub fn all() -> Self {
        Self {
            ranges: vec![UidRange::From(Uid(std::num::NonZeroU32::MIN))],
        }
    }

    /// Builds a compact set from arbitrary UIDs.
    ///
    /// UIDs are sorted, duplicates dropped and consecutive runs collapsed
    /// into ranges.
    #[must_use]
    pub fn from_uids(uids: impl IntoIterator<Item = Uid>) -> Self {
        let mut sorted: Vec<Uid> = uids.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut ranges = Vec::new();
        let mut iter = sorted.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (mut start, mut end) = (first, first);
        for uid in iter {
            if uid.get() == end.get() + 1 {
                end = uid;
            } else {
                ranges.push(Self::span(start, end));
                start = uid;
                end = uid;
            }
        }
        ranges.push(Self::span(start, end));

        Self { ranges }
    }

    fn span(start: Uid, end: Uid) -> UidRange {
        if start == end {
            UidRange::Single(start)
        } else {
            UidRange::Range(start, end)
        }
    }

    /// Returns true if the set names no message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the ranges in order.
    #[must_use]
    pub fn ranges(&self) -> &[UidRange] {
        &self.ranges
    }
}

impl std::fmt::Display for UidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uids(values: &[u32]) -> Vec<Uid> {
        values.iter().map(|&n| Uid::new(n).unwrap()).collect()
    }

    #[test]
    fn test_all() {
        assert_eq!(UidSet::all().to_string(), "1:*");
    }

    #[test]
    fn test_compression() {
        let set = UidSet::from_uids(uids(&[7, 1, 2, 3, 3, 10, 11]));
        assert_eq!(set.to_string(), "1:3,7,10:11");
    }

    #[test]
    fn test_empty() {
        let set = UidSet::from_uids(Vec::new());
        assert!(set.is_empty());
        assert_eq!(set.to_string(), "");
    }

    proptest! {
        #[test]
        fn prop_ranges_cover_exactly_the_input(values in proptest::collection::vec(1u32..500, 0..60)) {
            let set = UidSet::from_uids(uids(&values));
            let mut covered = Vec::new();
            for range in set.ranges() {
                match *range {
                    UidRange::Single(uid) => covered.push(uid.get()),
                    UidRange::Range(start, end) => covered.extend(start.get()..=end.get()),
                    UidRange::From(_) => prop_assert!(false, "open range from finite input"),
                }
            }
            let mut expected = values.clone();
            expected.sort_unstable();
            expected.dedup();
            prop_assert_eq!(covered, expected);
        }
    }
}
