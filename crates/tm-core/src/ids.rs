use core::fmt;
use core::num::NonZeroU32;

/// Compact identifier handed out to spawned tasks.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<TaskId>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(NonZeroU32);

impl TaskId {
    /// Create an id from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.index())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.index())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn index_round_trips(index in 0_u32..u32::MAX) {
            prop_assert_eq!(TaskId::from_index(index).index(), index);
        }

        #[test]
        fn ordering_follows_index(a in 0_u32..u32::MAX, b in 0_u32..u32::MAX) {
            prop_assert_eq!(TaskId::from_index(a).cmp(&TaskId::from_index(b)), a.cmp(&b));
        }
    }
}
