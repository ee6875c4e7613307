use std::time::Duration;

/// Identifier of a remote device, usually its Bluetooth address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Write type of a characteristic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WriteType {
    /// Write request; the remote device acknowledges the write.
    #[default]
    WithResponse,
    /// Write command; no acknowledgement.
    WithoutResponse,
    /// Authenticated signed write.
    Signed,
}

/// A physical-layer transmission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phy {
    Le1M,
    Le2M,
    LeCoded,
}

/// Set of acceptable PHYs for `set_preferred_phy`, as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhyMask(u8);

impl PhyMask {
    pub const LE_1M: PhyMask = PhyMask(1);
    pub const LE_2M: PhyMask = PhyMask(1 << 1);
    pub const LE_CODED: PhyMask = PhyMask(1 << 2);

    pub const fn from_bits(bits: u8) -> Self {
        PhyMask(bits & 0b111)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn union(self, other: PhyMask) -> Self {
        PhyMask(self.0 | other.0)
    }

    pub fn contains(self, phy: Phy) -> bool {
        let bit = match phy {
            Phy::Le1M => Self::LE_1M,
            Phy::Le2M => Self::LE_2M,
            Phy::LeCoded => Self::LE_CODED,
        };
        self.0 & bit.0 != 0
    }
}

impl std::ops::BitOr for PhyMask {
    type Output = PhyMask;
    fn bitor(self, rhs: PhyMask) -> PhyMask {
        self.union(rhs)
    }
}

/// Coding preference when LE Coded is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhyOption {
    #[default]
    NoPreferred,
    S2,
    S8,
}

/// Connection interval preset requested with `request_connection_priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionPriority {
    #[default]
    Balanced,
    High,
    LowPower,
}

/// Options of a connect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// How many times the scheduler should retry a failed connection attempt.
    pub retries: u8,
    /// Delay between retries.
    pub retry_delay: Duration,
    /// Let the controller connect whenever the device becomes available.
    pub auto_connect: bool,
    /// PHYs to use for the connection.
    pub preferred_phy: PhyMask,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            retries: 0,
            retry_delay: Duration::from_millis(300),
            auto_connect: false,
            preferred_phy: PhyMask::LE_1M,
        }
    }
}

/// A value produced by a request, reported by the scheduler through
/// [`crate::Request::notify_value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Bytes read, received in a notification, or written by the remote device.
    Data(Vec<u8>),
    /// The negotiated MTU.
    Mtu(u16),
    /// Signal strength in dBm.
    Rssi(i8),
    /// The PHYs in use.
    Phy { tx: Phy, rx: Phy },
}

/// Receives the values of a request executed with [`crate::Request::await_with`].
pub trait ResponseSlot: Send + 'static {
    fn on_response(&mut self, device: &DeviceId, response: &Response);
}

impl ResponseSlot for () {
    fn on_response(&mut self, _: &DeviceId, _: &Response) {}
}

/// Keeps the last value.
impl ResponseSlot for Option<Response> {
    fn on_response(&mut self, _: &DeviceId, response: &Response) {
        self.replace(response.clone());
    }
}

/// Keeps every value, in delivery order.
impl ResponseSlot for Vec<Response> {
    fn on_response(&mut self, _: &DeviceId, response: &Response) {
        self.push(response.clone());
    }
}
