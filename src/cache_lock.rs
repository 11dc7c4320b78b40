#[cfg(feature = "std")]
use std::sync as impl_;

#[cfg(not(feature = "std"))]
use spin as impl_;

/// A reader-writer lock for process-wide tables.
///
/// Uses `std::sync::RwLock` with the `std` feature and `spin::RwLock`
/// otherwise. Access goes through closures so that no guard outlives a
/// single lookup or insertion.
pub(crate) struct CacheLock<T: Send + Sync>(impl_::RwLock<T>);

impl<T: Send + Sync> CacheLock<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self(impl_::RwLock::new(value))
    }

    pub(crate) fn with_read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        #[cfg(not(feature = "std"))]
        let guard = self.0.read();

        // Tables are only extended with fully built entries, so a poisoned
        // lock still holds a consistent table.
        #[cfg(feature = "std")]
        let guard = self.0.read().unwrap_or_else(std::sync::PoisonError::into_inner);

        f(&guard)
    }

    pub(crate) fn with_write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        #[cfg(not(feature = "std"))]
        let mut guard = self.0.write();

        #[cfg(feature = "std")]
        let mut guard = self
            .0
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_sees_writes() {
        static COUNTER: CacheLock<u32> = CacheLock::new(0);
        COUNTER.with_write(|count| *count += 2);
        assert_eq!(COUNTER.with_read(|count| *count), 2);
    }
}
