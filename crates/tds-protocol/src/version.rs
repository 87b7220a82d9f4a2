//! TDS protocol version definitions.

use core::fmt;

/// TDS protocol version.
///
/// Represents the version of the TDS protocol used for communication
/// with SQL Server. The LOGIN7 request carries this value big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TdsVersion(u32);

impl TdsVersion {
    /// TDS 7.0 (SQL Server 7.0)
    pub const V7_0: Self = Self(0x70000000);

    /// TDS 7.1 (SQL Server 2000)
    pub const V7_1: Self = Self(0x71000000);

    /// TDS 7.1 Revision 1 (SQL Server 2000 SP1)
    pub const V7_1_REV1: Self = Self(0x71000001);

    /// TDS 7.2 (SQL Server 2005)
    pub const V7_2: Self = Self(0x72090002);

    /// Create a new TDS version from raw bytes.
    #[must_use]
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    /// Get the raw version value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Major version nibble-pair (e.g. 7 for TDS 7.x).
    #[must_use]
    pub const fn major(self) -> u8 {
        (self.0 >> 28) as u8
    }
}

impl fmt::Display for TdsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::V7_0 => write!(f, "7.0"),
            Self::V7_1 => write!(f, "7.1"),
            Self::V7_1_REV1 => write!(f, "7.1 rev 1"),
            Self::V7_2 => write!(f, "7.2"),
            other => write!(f, "{:#010x}", other.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_values() {
        assert_eq!(TdsVersion::V7_1_REV1.raw(), 0x71000001);
        assert_eq!(TdsVersion::V7_2.raw(), 0x72090002);
    }

    #[test]
    fn test_major() {
        assert_eq!(TdsVersion::V7_1.major(), 7);
    }

    #[test]
    fn test_display() {
        assert_eq!(TdsVersion::V7_1_REV1.to_string(), "7.1 rev 1");
        assert_eq!(TdsVersion::new(0x12345678).to_string(), "0x12345678");
    }
}
