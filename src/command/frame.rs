//! Typed inbound frames
//!
//! Byte 0 selects the command class; known classes are parsed into a tagged
//! variant and validated before any handler sees them. Unknown classes are
//! passed through with their raw payload.

use thiserror::Error;

use super::class::{
    CommandClass, DEVICE_RESET_LOCALLY_NOTIFICATION, VERSION_COMMAND_CLASS_GET,
    VERSION_COMMAND_CLASS_REPORT,
};

/// Frame validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// No command class byte
    #[error("empty frame")]
    Empty,

    /// Shorter than the class layout requires
    #[error("class {class} frame truncated: need {expected} bytes, got {actual}")]
    Truncated {
        class: CommandClass,
        expected: usize,
        actual: usize,
    },
}

/// Device Reset Locally commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceResetLocallyCommand {
    /// The device has been reset and left the network
    Notification,
    /// Command byte this class does not define
    Unknown(u8),
}

/// Version command class commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCommand {
    /// Request the version of a command class
    CommandClassGet { requested: CommandClass },
    /// Version of a command class
    CommandClassReport { class: CommandClass, version: u8 },
    /// Command byte not handled here
    Unknown(u8),
}

/// Parsed inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// No Operation (any trailing bytes ignored)
    NoOperation,
    /// Device Reset Locally
    DeviceResetLocally(DeviceResetLocallyCommand),
    /// Version
    Version(VersionCommand),
    /// Class without a typed layout; `payload` follows the class byte
    Other {
        class: CommandClass,
        payload: &'a [u8],
    },
}

fn require(class: CommandClass, bytes: &[u8], expected: usize) -> Result<(), FrameError> {
    if bytes.len() < expected {
        return Err(FrameError::Truncated {
            class,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

impl<'a> Frame<'a> {
    /// Parse and validate a raw frame
    ///
    /// # Errors
    ///
    /// Returns `FrameError` if the frame is empty or shorter than its
    /// class layout
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FrameError> {
        let (&first, rest) = bytes.split_first().ok_or(FrameError::Empty)?;
        let class = CommandClass(first);

        match class {
            CommandClass::NO_OPERATION => Ok(Self::NoOperation),
            CommandClass::DEVICE_RESET_LOCALLY => {
                require(class, bytes, 2)?;
                let command = match rest[0] {
                    DEVICE_RESET_LOCALLY_NOTIFICATION => DeviceResetLocallyCommand::Notification,
                    other => DeviceResetLocallyCommand::Unknown(other),
                };
                Ok(Self::DeviceResetLocally(command))
            }
            CommandClass::VERSION => {
                require(class, bytes, 2)?;
                let command = match rest[0] {
                    VERSION_COMMAND_CLASS_GET => {
                        require(class, bytes, 3)?;
                        VersionCommand::CommandClassGet {
                            requested: CommandClass(rest[1]),
                        }
                    }
                    VERSION_COMMAND_CLASS_REPORT => {
                        require(class, bytes, 4)?;
                        VersionCommand::CommandClassReport {
                            class: CommandClass(rest[1]),
                            version: rest[2],
                        }
                    }
                    other => VersionCommand::Unknown(other),
                };
                Ok(Self::Version(command))
            }
            _ => Ok(Self::Other {
                class,
                payload: rest,
            }),
        }
    }

    /// Command class of the frame
    #[must_use]
    pub const fn class(&self) -> CommandClass {
        match self {
            Self::NoOperation => CommandClass::NO_OPERATION,
            Self::DeviceResetLocally(_) => CommandClass::DEVICE_RESET_LOCALLY,
            Self::Version(_) => CommandClass::VERSION,
            Self::Other { class, .. } => *class,
        }
    }
}

/// Encode a Version Command Class Report
#[must_use]
pub const fn version_report(class: CommandClass, version: u8) -> [u8; 4] {
    [
        CommandClass::VERSION.0,
        VERSION_COMMAND_CLASS_REPORT,
        class.0,
        version,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_is_rejected() {
        assert_eq!(Frame::parse(&[]), Err(FrameError::Empty));
    }

    #[test]
    fn no_operation_probe() {
        assert_eq!(Frame::parse(&[0x00]).unwrap(), Frame::NoOperation);
    }

    #[test]
    fn reset_notification() {
        assert_eq!(
            Frame::parse(&[0x5A, 0x01]).unwrap(),
            Frame::DeviceResetLocally(DeviceResetLocallyCommand::Notification)
        );
        assert_eq!(
            Frame::parse(&[0x5A, 0x07]).unwrap(),
            Frame::DeviceResetLocally(DeviceResetLocallyCommand::Unknown(0x07))
        );
    }

    #[test]
    fn reset_without_command_is_truncated() {
        assert_eq!(
            Frame::parse(&[0x5A]),
            Err(FrameError::Truncated {
                class: CommandClass::DEVICE_RESET_LOCALLY,
                expected: 2,
                actual: 1,
            })
        );
    }

    #[test]
    fn version_get_requires_class_byte() {
        assert!(Frame::parse(&[0x86, 0x13]).is_err());
        assert_eq!(
            Frame::parse(&[0x86, 0x13, 0x5A]).unwrap(),
            Frame::Version(VersionCommand::CommandClassGet {
                requested: CommandClass::DEVICE_RESET_LOCALLY
            })
        );
    }

    #[test]
    fn report_encodes_and_parses() {
        let report = version_report(CommandClass(0x25), 3);
        assert_eq!(
            Frame::parse(&report).unwrap(),
            Frame::Version(VersionCommand::CommandClassReport {
                class: CommandClass(0x25),
                version: 3
            })
        );
    }

    #[test]
    fn unknown_class_keeps_payload() {
        let frame = Frame::parse(&[0x25, 0x01, 0xFF]).unwrap();
        assert_eq!(
            frame,
            Frame::Other {
                class: CommandClass(0x25),
                payload: &[0x01, 0xFF]
            }
        );
        assert_eq!(frame.class(), CommandClass(0x25));
    }
}
