//! Constructor functions, one per operation.
//!
//! Every request starts in [`RequestState::Created`](crate::RequestState::Created).
//! Writes copy their data, so callers may reuse their buffers right away.

use std::time::Duration;

use super::characteristic::CharacteristicRef;
use super::condition::{ConditionalWait, PredicateError};
use super::descriptor::{AttributeRef, DescriptorRef};
use super::kind::RequestKind;
use super::request::Request;
use super::types::{
    ConnectOptions, ConnectionPriority, DeviceId, PhyMask, PhyOption, WriteType,
};

impl Request {
    fn on_characteristic(kind: RequestKind, characteristic: CharacteristicRef) -> Self {
        Self::new(kind, Some(characteristic.into()))
    }

    fn on_descriptor(kind: RequestKind, descriptor: DescriptorRef) -> Self {
        Self::new(kind, Some(descriptor.into()))
    }

    /// Connects to `device` with default [`ConnectOptions`].
    pub fn connect(device: impl Into<DeviceId>) -> Self {
        Self::connect_with(device, ConnectOptions::default())
    }

    pub fn connect_with(device: impl Into<DeviceId>, options: ConnectOptions) -> Self {
        Self::new(
            RequestKind::Connect {
                device: device.into(),
                options,
            },
            None,
        )
    }

    pub fn disconnect() -> Self {
        Self::new(RequestKind::Disconnect, None)
    }

    pub fn create_bond() -> Self {
        Self::new(RequestKind::CreateBond, None)
    }

    pub fn remove_bond() -> Self {
        Self::new(RequestKind::RemoveBond, None)
    }

    /// Reads the value of a characteristic; the value is reported as [`crate::Response::Data`].
    pub fn read(characteristic: CharacteristicRef) -> Self {
        Self::on_characteristic(RequestKind::Read, characteristic)
    }

    pub fn read_descriptor(descriptor: DescriptorRef) -> Self {
        Self::on_descriptor(RequestKind::ReadDescriptor, descriptor)
    }

    pub fn write(
        characteristic: CharacteristicRef,
        data: impl Into<Vec<u8>>,
        write_type: WriteType,
    ) -> Self {
        let kind = RequestKind::Write {
            data: data.into(),
            write_type,
        };
        Self::on_characteristic(kind, characteristic)
    }

    pub fn write_descriptor(descriptor: DescriptorRef, data: impl Into<Vec<u8>>) -> Self {
        let kind = RequestKind::WriteDescriptor { data: data.into() };
        Self::on_descriptor(kind, descriptor)
    }

    /// Sends a notification from a local characteristic (server role).
    pub fn send_notification(characteristic: CharacteristicRef, data: impl Into<Vec<u8>>) -> Self {
        let kind = RequestKind::Notify { data: data.into() };
        Self::on_characteristic(kind, characteristic)
    }

    /// Sends an indication from a local characteristic (server role).
    pub fn send_indication(characteristic: CharacteristicRef, data: impl Into<Vec<u8>>) -> Self {
        let kind = RequestKind::Indicate { data: data.into() };
        Self::on_characteristic(kind, characteristic)
    }

    pub fn begin_reliable_write() -> Self {
        Self::new(RequestKind::BeginReliableWrite, None)
    }

    /// Executes the reliable write sub-procedure. At least one write must have been
    /// performed since [`Request::begin_reliable_write`], otherwise the transport
    /// fails it with [`crate::Status::GATT_INVALID_OFFSET`].
    pub fn execute_reliable_write() -> Self {
        Self::new(RequestKind::ExecuteReliableWrite, None)
    }

    pub fn abort_reliable_write() -> Self {
        Self::new(RequestKind::AbortReliableWrite, None)
    }

    pub fn enable_notifications(characteristic: CharacteristicRef) -> Self {
        Self::on_characteristic(RequestKind::EnableNotifications, characteristic)
    }

    pub fn disable_notifications(characteristic: CharacteristicRef) -> Self {
        Self::on_characteristic(RequestKind::DisableNotifications, characteristic)
    }

    pub fn enable_indications(characteristic: CharacteristicRef) -> Self {
        Self::on_characteristic(RequestKind::EnableIndications, characteristic)
    }

    pub fn disable_indications(characteristic: CharacteristicRef) -> Self {
        Self::on_characteristic(RequestKind::DisableIndications, characteristic)
    }

    /// Enables indications on the Service Changed characteristic of the
    /// Generic Attribute service, if the device has one.
    pub fn enable_service_changed_indications() -> Self {
        Self::new(RequestKind::EnableServiceChangedIndications, None)
    }

    /// Waits for a notification on `characteristic`. Notifications must have been
    /// enabled before.
    pub fn wait_for_notification(characteristic: CharacteristicRef) -> Self {
        Self::on_characteristic(RequestKind::WaitForNotification, characteristic)
    }

    pub fn wait_for_indication(characteristic: CharacteristicRef) -> Self {
        Self::on_characteristic(RequestKind::WaitForIndication, characteristic)
    }

    /// Waits until the remote device writes a local characteristic or descriptor
    /// (server role).
    pub fn wait_for_write(attribute: impl Into<AttributeRef>) -> Self {
        Self::new(RequestKind::WaitForWrite, Some(attribute.into()))
    }

    /// Waits until the remote device reads a local characteristic or descriptor
    /// (server role), answering with the attribute's current value.
    pub fn wait_for_read(attribute: impl Into<AttributeRef>) -> Self {
        Self::new(RequestKind::WaitForRead { data: None }, Some(attribute.into()))
    }

    /// Like [`Request::wait_for_read`], answering with `data`.
    pub fn wait_for_read_with(attribute: impl Into<AttributeRef>, data: impl Into<Vec<u8>>) -> Self {
        let kind = RequestKind::WaitForRead {
            data: Some(data.into()),
        };
        Self::new(kind, Some(attribute.into()))
    }

    /// Waits until `predicate(&parameter)` holds.
    ///
    /// The scheduler evaluates the condition with [`Request::is_fulfilled`]; the
    /// request completes as soon as it is fulfilled.
    pub fn wait_until<T, F>(predicate: F, parameter: T) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let condition = ConditionalWait::new(
            move |param: &T| Ok::<_, PredicateError>(predicate(param)),
            parameter,
        );
        Self::build(RequestKind::WaitForCondition, None, Some(condition))
    }

    /// Like [`Request::wait_until`], with a predicate that may fail. How a failure is
    /// treated is set with [`Request::on_predicate_error`].
    pub fn try_wait_until<T, F, E>(predicate: F, parameter: T) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<PredicateError>,
    {
        let condition = ConditionalWait::new(predicate, parameter);
        Self::build(RequestKind::WaitForCondition, None, Some(condition))
    }

    /// Sets the value of a local characteristic (server role) without notifying.
    pub fn set_value(characteristic: CharacteristicRef, data: impl Into<Vec<u8>>) -> Self {
        let kind = RequestKind::SetValue { data: data.into() };
        Self::on_characteristic(kind, characteristic)
    }

    pub fn set_descriptor_value(descriptor: DescriptorRef, data: impl Into<Vec<u8>>) -> Self {
        let kind = RequestKind::SetDescriptorValue { data: data.into() };
        Self::on_descriptor(kind, descriptor)
    }

    /// Requests an ATT MTU, clamped to the range
    /// [`MTU_MIN`](crate::MTU_MIN)`..=`[`MTU_MAX`](crate::MTU_MAX).
    /// The negotiated value is reported as [`crate::Response::Mtu`].
    pub fn request_mtu(mtu: u16) -> Self {
        Self::new(RequestKind::request_mtu(mtu), None)
    }

    pub fn request_connection_priority(priority: ConnectionPriority) -> Self {
        Self::new(RequestKind::RequestConnectionPriority { priority }, None)
    }

    pub fn set_preferred_phy(tx: PhyMask, rx: PhyMask, options: PhyOption) -> Self {
        Self::new(RequestKind::SetPreferredPhy { tx, rx, options }, None)
    }

    pub fn read_phy() -> Self {
        Self::new(RequestKind::ReadPhy, None)
    }

    /// Reads the signal strength; reported as [`crate::Response::Rssi`].
    pub fn read_rssi() -> Self {
        Self::new(RequestKind::ReadRssi, None)
    }

    /// Clears the device's cached services. The scheduler should rediscover them
    /// afterwards.
    pub fn refresh_cache() -> Self {
        Self::new(RequestKind::RefreshCache, None)
    }

    /// Holds the queue for `delay`.
    pub fn sleep(delay: Duration) -> Self {
        Self::new(RequestKind::Sleep { delay }, None)
    }
}
