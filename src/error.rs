//! Defines error types.

use super::request::Request;

/// The error type for request operations.
///
/// Besides its [`ErrorKind`], an error may carry the request that is to blame for it.
/// For [`ErrorKind::TriggerFailure`] this is the *trigger*, not the request that was
/// awaited.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
    request: Option<Request>,
    message: String,
}

impl Error {
    pub(crate) fn new<S: ToString>(kind: ErrorKind, request: Option<&Request>, message: S) -> Self {
        Error {
            kind,
            request: request.cloned(),
            message: message.to_string(),
        }
    }

    pub(crate) fn violation<S: ToString>(request: &Request, message: S) -> Self {
        Self::new(ErrorKind::PreconditionViolation, Some(request), message)
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the request that failed, if known.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// Returns the transport status carried by this error, if any.
    pub fn status(&self) -> Option<Status> {
        match self.kind {
            ErrorKind::Timeout => Some(Status::TIMEOUT),
            ErrorKind::DeviceDisconnected => Some(Status::DEVICE_DISCONNECTED),
            ErrorKind::BluetoothUnavailable => Some(Status::BLUETOOTH_DISABLED),
            ErrorKind::InvalidRequest => Some(Status::REQUEST_INVALID),
            ErrorKind::TransportFailure(status) | ErrorKind::TriggerFailure(status) => Some(status),
            ErrorKind::PreconditionViolation => None,
        }
    }

    /// Returns the message for this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            request: None,
            message: String::new(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.message.is_empty(), &self.request) {
            (true, None) => write!(f, "{}", &self.kind),
            (false, None) => write!(f, "{}: {}", &self.kind, &self.message),
            (true, Some(req)) => write!(f, "{} ({})", &self.kind, req),
            (false, Some(req)) => write!(f, "{} ({}): {}", &self.kind, req, &self.message),
        }
    }
}

impl std::error::Error for Error {}

/// A list of general categories of request error.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// the request timed out
    Timeout,
    /// the device disconnected before the request completed
    DeviceDisconnected,
    /// the Bluetooth adapter was disabled
    BluetoothUnavailable,
    /// the request was issued for an unknown device
    InvalidRequest,
    /// the transport reported a failure: {0}
    TransportFailure(Status),
    /// the trigger request failed: {0}
    TriggerFailure(Status),
    /// the request was used incorrectly
    PreconditionViolation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Timeout => f.write_str("the request timed out"),
            ErrorKind::DeviceDisconnected => {
                f.write_str("the device disconnected before the request completed")
            }
            ErrorKind::BluetoothUnavailable => f.write_str("the Bluetooth adapter was disabled"),
            ErrorKind::InvalidRequest => f.write_str("the request was issued for an unknown device"),
            ErrorKind::TransportFailure(st) => write!(f, "the transport reported a failure: {st}"),
            ErrorKind::TriggerFailure(st) => write!(f, "the trigger request failed: {st}"),
            ErrorKind::PreconditionViolation => f.write_str("the request was used incorrectly"),
        }
    }
}

impl From<Status> for ErrorKind {
    /// Classifies a terminal status. `SUCCESS` should not be passed here; it is
    /// reported as a transport failure if it is.
    fn from(status: Status) -> Self {
        match status {
            Status::TIMEOUT => ErrorKind::Timeout,
            Status::DEVICE_DISCONNECTED => ErrorKind::DeviceDisconnected,
            Status::BLUETOOTH_DISABLED => ErrorKind::BluetoothUnavailable,
            Status::REQUEST_INVALID => ErrorKind::InvalidRequest,
            other => ErrorKind::TransportFailure(other),
        }
    }
}

/// Completion status of a request.
///
/// Zero is success. Negative values are reasons produced by the request engine or the
/// scheduler; positive values come from the GATT transport and are passed through as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Status(i32);

impl Status {
    /// The operation completed successfully.
    pub const SUCCESS: Status = Status(0);
    /// The device disconnected before the request completed.
    pub const DEVICE_DISCONNECTED: Status = Status(-1);
    /// The device does not have the required services.
    pub const DEVICE_NOT_SUPPORTED: Status = Status(-2);
    /// The target attribute was not found or not given.
    pub const NULL_ATTRIBUTE: Status = Status(-3);
    /// The transport refused to start the operation.
    pub const REQUEST_FAILED: Status = Status(-4);
    /// No response arrived before the deadline.
    pub const TIMEOUT: Status = Status(-5);
    /// The received value did not pass validation.
    pub const VALIDATION: Status = Status(-6);
    /// The request was cancelled.
    pub const CANCELLED: Status = Status(-7);
    /// Notifications or indications were not enabled.
    pub const NOT_ENABLED: Status = Status(-8);
    /// The Bluetooth adapter was disabled.
    pub const BLUETOOTH_DISABLED: Status = Status(-100);
    /// The request was issued for a device that was never connected.
    pub const REQUEST_INVALID: Status = Status(-1_000_000);

    /// GATT: the attribute cannot be read.
    pub const GATT_READ_NOT_PERMITTED: Status = Status(0x02);
    /// GATT: the attribute cannot be written.
    pub const GATT_WRITE_NOT_PERMITTED: Status = Status(0x03);
    /// GATT: insufficient authentication.
    pub const GATT_INSUFFICIENT_AUTHENTICATION: Status = Status(0x05);
    /// GATT: the request is not supported.
    pub const GATT_REQUEST_NOT_SUPPORTED: Status = Status(0x06);
    /// GATT: invalid offset.
    pub const GATT_INVALID_OFFSET: Status = Status(0x07);
    /// GATT: insufficient authorization.
    pub const GATT_INSUFFICIENT_AUTHORIZATION: Status = Status(0x08);
    /// GATT: the attribute value length is invalid.
    pub const GATT_INVALID_ATTRIBUTE_LENGTH: Status = Status(0x0d);
    /// GATT: insufficient encryption.
    pub const GATT_INSUFFICIENT_ENCRYPTION: Status = Status(0x0f);
    /// GATT: the link is congested.
    pub const GATT_CONNECTION_CONGESTED: Status = Status(0x8f);
    /// GATT: generic failure.
    pub const GATT_FAILURE: Status = Status(0x101);

    /// Wraps a raw status code.
    pub const fn from_i32(code: i32) -> Self {
        Status(code)
    }

    /// Returns the raw status code.
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Checks if this is [`Status::SUCCESS`].
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Status::SUCCESS => f.write_str("success"),
            Status::DEVICE_DISCONNECTED => f.write_str("device disconnected"),
            Status::DEVICE_NOT_SUPPORTED => f.write_str("device not supported"),
            Status::NULL_ATTRIBUTE => f.write_str("attribute not found"),
            Status::REQUEST_FAILED => f.write_str("request failed to start"),
            Status::TIMEOUT => f.write_str("timeout"),
            Status::VALIDATION => f.write_str("validation failed"),
            Status::CANCELLED => f.write_str("cancelled"),
            Status::NOT_ENABLED => f.write_str("notifications not enabled"),
            Status::BLUETOOTH_DISABLED => f.write_str("Bluetooth disabled"),
            Status::REQUEST_INVALID => f.write_str("invalid request"),
            Status::GATT_READ_NOT_PERMITTED => f.write_str("GATT read not permitted"),
            Status::GATT_WRITE_NOT_PERMITTED => f.write_str("GATT write not permitted"),
            Status::GATT_INSUFFICIENT_AUTHENTICATION => {
                f.write_str("GATT insufficient authentication")
            }
            Status::GATT_REQUEST_NOT_SUPPORTED => f.write_str("GATT request not supported"),
            Status::GATT_INVALID_OFFSET => f.write_str("GATT invalid offset"),
            Status::GATT_INSUFFICIENT_AUTHORIZATION => f.write_str("GATT insufficient authorization"),
            Status::GATT_INVALID_ATTRIBUTE_LENGTH => f.write_str("GATT invalid attribute length"),
            Status::GATT_INSUFFICIENT_ENCRYPTION => f.write_str("GATT insufficient encryption"),
            Status::GATT_CONNECTION_CONGESTED => f.write_str("GATT connection congested"),
            Status::GATT_FAILURE => f.write_str("GATT failure"),
            Status(code) => write!(f, "unknown status {code} (0x{code:x})"),
        }
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Status(code)
    }
}

impl From<Status> for i32 {
    fn from(val: Status) -> Self {
        val.0
    }
}
