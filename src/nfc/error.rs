/// Failures surfaced by the proximity adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NfcError {
    #[error("NFC is not supported on this device")]
    Unsupported,
    #[error("NFC permission denied")]
    PermissionDenied,
    #[error("operation aborted")]
    Aborted,
    #[error("tag removed before the operation finished")]
    TagLost,
    #[error("write collided with another operation")]
    Collision,
    #[error("tag I/O failed: {0}")]
    Io(String),
    #[error("cannot decode {record_type} record: {reason}")]
    Decode { record_type: String, reason: String },
}

/// How the workflow reacts to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The user backed out. Expected, never logged.
    UserCancelled,
    /// Re-presenting the tag may work. Logged as a warning, mode kept.
    Transient,
    /// The capability is missing. Fatal to the mode.
    Unsupported,
}

impl NfcError {
    pub fn class(&self) -> FailureClass {
        match self {
            NfcError::PermissionDenied | NfcError::Aborted => FailureClass::UserCancelled,
            NfcError::Unsupported => FailureClass::Unsupported,
            NfcError::TagLost
            | NfcError::Collision
            | NfcError::Io(_)
            | NfcError::Decode { .. } => FailureClass::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_matches_taxonomy() {
        assert_eq!(NfcError::PermissionDenied.class(), FailureClass::UserCancelled);
        assert_eq!(NfcError::Aborted.class(), FailureClass::UserCancelled);
        assert_eq!(NfcError::TagLost.class(), FailureClass::Transient);
        assert_eq!(NfcError::Collision.class(), FailureClass::Transient);
        assert_eq!(NfcError::Unsupported.class(), FailureClass::Unsupported);
    }
}
