//! `ChecksumMode` (C3): per-packet toggle for the Adler-32 checksum.

/// Whether a packet's `checksum` field is populated with an Adler-32
/// digest or left at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumMode {
    Disabled,
    Enabled,
}

impl Default for ChecksumMode {
    fn default() -> Self {
        ChecksumMode::Enabled
    }
}

impl ChecksumMode {
    pub(crate) fn from_bits(cbit: bool) -> ChecksumMode {
        if cbit {
            ChecksumMode::Enabled
        } else {
            ChecksumMode::Disabled
        }
    }

    pub(crate) fn cbit(self) -> bool {
        matches!(self, ChecksumMode::Enabled)
    }
}
