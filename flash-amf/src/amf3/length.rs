/// The largest length a ref-or-length header can carry
pub(crate) const MAX_LENGTH: usize = 0x0FFF_FFFF;

/// A decoded ref-or-length header: the low bit tells an inline length from a back-reference
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Length {
    Size(u32),
    Reference(usize),
}

impl Length {
    pub(crate) fn from_header(header: u32) -> Self {
        if header & 0b1 == 0 {
            Length::Reference((header >> 1) as usize)
        } else {
            Length::Size(header >> 1)
        }
    }

    pub(crate) fn to_header(self) -> u32 {
        match self {
            // With the last bit set
            Length::Size(x) => (x << 1) | 0b1,
            Length::Reference(x) => (x as u32) << 1,
        }
    }

    pub(crate) fn is_reference(&self) -> bool {
        matches!(self, Length::Reference(_))
    }
}
