//! VM state implementation.

/// Indicates the status of the VM.
///
/// Every state other than `NONE` is terminal for the current session.
#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VMState {
    /// Indicates that the execution is in progress or has not yet begun.
    NONE = 0,

    /// Indicates that the execution has been completed successfully.
    HALT = 1 << 0,

    /// Indicates that the script faulted.
    FAULT = 1 << 1,

    /// Indicates that the gas budget ran out before the next instruction.
    FAULT_BY_GAS = 1 << 2,
}

impl VMState {
    #[inline]
    pub fn is_none(self) -> bool {
        self == VMState::NONE
    }

    #[inline]
    pub fn is_halt(self) -> bool {
        self == VMState::HALT
    }

    /// True for both `FAULT` and `FAULT_BY_GAS`.
    #[inline]
    pub fn is_fault(self) -> bool {
        matches!(self, VMState::FAULT | VMState::FAULT_BY_GAS)
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        !self.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(VMState::NONE.is_none());
        assert!(!VMState::NONE.is_terminal());
        assert!(VMState::HALT.is_halt());
        assert!(VMState::FAULT_BY_GAS.is_fault());
        assert!(VMState::FAULT.is_terminal());
        assert_eq!(VMState::FAULT_BY_GAS as u8, 4);
    }
}
