use std::fmt;

/// Numeric status returned by the filesystem service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AfcStatus(pub u64);

impl AfcStatus {
    pub const SUCCESS: Self = Self(0);
    pub const INVALID_ARG: Self = Self(7);
    pub const OBJECT_NOT_FOUND: Self = Self(8);
    pub const PERM_DENIED: Self = Self(10);
    pub const END_OF_DATA: Self = Self(14);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Human-readable name, when the code is known.
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "success",
            1 => "unknown error",
            2 => "operation header invalid",
            3 => "no resources",
            4 => "read error",
            5 => "write error",
            6 => "unknown packet type",
            7 => "invalid argument",
            8 => "object not found",
            9 => "object is a directory",
            10 => "permission denied",
            11 => "service not connected",
            12 => "operation timed out",
            13 => "too much data",
            14 => "end of data",
            15 => "operation not supported",
            16 => "object exists",
            17 => "object busy",
            18 => "no space left",
            19 => "operation would block",
            20 => "I/O error",
            21 => "operation interrupted",
            22 => "operation in progress",
            23 => "internal error",
            30 => "multiplexer error",
            31 => "out of memory",
            32 => "not enough data",
            33 => "directory not empty",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for AfcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "status {}", self.0),
        }
    }
}

impl From<u64> for AfcStatus {
    fn from(code: u64) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_known_codes() {
        assert_eq!(AfcStatus::OBJECT_NOT_FOUND.to_string(), "object not found (8)");
        assert_eq!(AfcStatus(33).to_string(), "directory not empty (33)");
        assert_eq!(AfcStatus(99).to_string(), "status 99");
        assert!(AfcStatus(0).is_success());
        assert!(!AfcStatus(24).is_success());
        assert_eq!(AfcStatus(24).name(), None);
    }
}
