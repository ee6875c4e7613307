use std::time::Duration;

use super::types::{ConnectOptions, ConnectionPriority, DeviceId, PhyMask, PhyOption, WriteType};

/// Smallest ATT MTU allowed by the Bluetooth specification.
pub const MTU_MIN: u16 = 23;
/// Largest ATT MTU a request may ask for.
pub const MTU_MAX: u16 = 517;

/// The operation a request performs, with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Connect {
        device: DeviceId,
        options: ConnectOptions,
    },
    Disconnect,
    CreateBond,
    RemoveBond,
    Write {
        data: Vec<u8>,
        write_type: WriteType,
    },
    /// Sends a notification as a GATT server.
    Notify {
        data: Vec<u8>,
    },
    /// Sends an indication as a GATT server.
    Indicate {
        data: Vec<u8>,
    },
    Read,
    WriteDescriptor {
        data: Vec<u8>,
    },
    ReadDescriptor,
    BeginReliableWrite,
    ExecuteReliableWrite,
    AbortReliableWrite,
    EnableNotifications,
    EnableIndications,
    DisableNotifications,
    DisableIndications,
    WaitForNotification,
    WaitForIndication,
    /// Waits for the remote device to read a local attribute; `data` is the value to
    /// respond with.
    WaitForRead {
        data: Option<Vec<u8>>,
    },
    WaitForWrite,
    WaitForCondition,
    SetValue {
        data: Vec<u8>,
    },
    SetDescriptorValue {
        data: Vec<u8>,
    },
    EnableServiceChangedIndications,
    RequestMtu {
        mtu: u16,
    },
    RequestConnectionPriority {
        priority: ConnectionPriority,
    },
    SetPreferredPhy {
        tx: PhyMask,
        rx: PhyMask,
        options: PhyOption,
    },
    ReadPhy,
    ReadRssi,
    RefreshCache,
    Sleep {
        delay: Duration,
    },
}

impl RequestKind {
    pub(crate) fn request_mtu(mtu: u16) -> Self {
        RequestKind::RequestMtu {
            mtu: mtu.clamp(MTU_MIN, MTU_MAX),
        }
    }

    /// Checks if requests of this kind accept a timeout.
    pub fn is_timeoutable(&self) -> bool {
        use RequestKind::*;
        matches!(
            self,
            Connect { .. }
                | Disconnect
                | Write { .. }
                | Notify { .. }
                | Indicate { .. }
                | Read
                | WriteDescriptor { .. }
                | ReadDescriptor
                | EnableNotifications
                | EnableIndications
                | DisableNotifications
                | DisableIndications
                | EnableServiceChangedIndications
        ) || self.is_awaiting()
    }

    /// Checks if requests of this kind wait for something caused by another request,
    /// and so may have a trigger.
    pub fn is_awaiting(&self) -> bool {
        use RequestKind::*;
        matches!(
            self,
            WaitForNotification
                | WaitForIndication
                | WaitForRead { .. }
                | WaitForWrite
                | WaitForCondition
        )
    }

    /// A short name of the operation.
    pub fn name(&self) -> &'static str {
        use RequestKind::*;
        match self {
            Connect { .. } => "connect",
            Disconnect => "disconnect",
            CreateBond => "create bond",
            RemoveBond => "remove bond",
            Write { .. } => "write",
            Notify { .. } => "notify",
            Indicate { .. } => "indicate",
            Read => "read",
            WriteDescriptor { .. } => "write descriptor",
            ReadDescriptor => "read descriptor",
            BeginReliableWrite => "begin reliable write",
            ExecuteReliableWrite => "execute reliable write",
            AbortReliableWrite => "abort reliable write",
            EnableNotifications => "enable notifications",
            EnableIndications => "enable indications",
            DisableNotifications => "disable notifications",
            DisableIndications => "disable indications",
            WaitForNotification => "wait for notification",
            WaitForIndication => "wait for indication",
            WaitForRead { .. } => "wait for read",
            WaitForWrite => "wait for write",
            WaitForCondition => "wait for condition",
            SetValue { .. } => "set value",
            SetDescriptorValue { .. } => "set descriptor value",
            EnableServiceChangedIndications => "enable service changed indications",
            RequestMtu { .. } => "request MTU",
            RequestConnectionPriority { .. } => "request connection priority",
            SetPreferredPhy { .. } => "set preferred PHY",
            ReadPhy => "read PHY",
            ReadRssi => "read RSSI",
            RefreshCache => "refresh cache",
            Sleep { .. } => "sleep",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mtu_is_clamped() {
        assert_eq!(RequestKind::request_mtu(1000), RequestKind::RequestMtu { mtu: 517 });
        assert_eq!(RequestKind::request_mtu(0), RequestKind::RequestMtu { mtu: 23 });
        assert_eq!(RequestKind::request_mtu(247), RequestKind::RequestMtu { mtu: 247 });
    }

    #[test]
    fn awaiting_kinds_are_timeoutable() {
        assert!(RequestKind::WaitForCondition.is_awaiting());
        assert!(RequestKind::WaitForCondition.is_timeoutable());
        assert!(RequestKind::Read.is_timeoutable());
        assert!(!RequestKind::Read.is_awaiting());
        assert!(!RequestKind::ReadRssi.is_timeoutable());
        assert!(!RequestKind::Sleep {
            delay: Duration::from_secs(1)
        }
        .is_timeoutable());
    }
}
