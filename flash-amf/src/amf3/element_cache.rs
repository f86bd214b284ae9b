use crate::amf3::length::Length;

/// One of the per-session reference tables
///
/// Entries are addressed by the order they were first seen in and are never removed until the
/// session ends. How two entries are matched is up to the caller.
#[derive(Clone, Debug)]
pub(crate) struct ElementCache<T> {
    cache: Vec<T>,
}

impl<T> Default for ElementCache<T> {
    fn default() -> Self {
        ElementCache { cache: Vec::new() }
    }
}

impl<T> ElementCache<T> {
    /// Append an entry, returning its index
    #[inline]
    pub(crate) fn store(&mut self, val: T) -> usize {
        self.cache.push(val);
        self.cache.len() - 1
    }

    /// The entry at `index`
    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.cache.get(index)
    }

    /// The index of the first entry matching `predicate`
    #[inline]
    pub(crate) fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.cache.iter().position(predicate)
    }

    /// A reference to the first entry matching `predicate`, or `length` when there is none
    pub(crate) fn to_length(&self, predicate: impl FnMut(&T) -> bool, length: u32) -> Length {
        match self.position(predicate) {
            Some(i) => Length::Reference(i),
            None => Length::Size(length),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.cache.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }
}
