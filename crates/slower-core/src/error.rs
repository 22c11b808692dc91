use thiserror::Error;

use crate::name::NamePath;

/// Errors returned when packing or interpreting names.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    /// Path is declared but has no bit layout.
    #[error("unimplemented path: {0}")]
    UnimplementedPath(NamePath),
    /// Raw path byte does not correspond to a declared path.
    #[error("unknown path byte: {0:#04x}")]
    UnknownPath(u8),
    #[error("org {0} does not fit in 18 bits")]
    OrgOutOfRange(u32),
    #[error("team {0} does not fit in 20 bits")]
    TeamOutOfRange(u32),
    #[error("channel {0} does not fit in 10 bits")]
    ChannelOutOfRange(u16),
    #[error("device {0} does not fit in 20 bits")]
    DeviceOutOfRange(u32),
    #[error("msg number {0} does not fit in 20 bits")]
    MsgNumOutOfRange(u32),
}

#[cfg(test)]
mod tests {
    use super::NameError;
    use crate::name::NamePath;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            NameError::UnimplementedPath(NamePath::Welcome).to_string(),
            "unimplemented path: welcome"
        );
        assert_eq!(
            NameError::UnknownPath(0x7f).to_string(),
            "unknown path byte: 0x7f"
        );
        assert_eq!(
            NameError::OrgOutOfRange(262_144).to_string(),
            "org 262144 does not fit in 18 bits"
        );
    }
}
