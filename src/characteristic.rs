use uuid::Uuid;

use super::descriptor::DescriptorRef;

/// Identity of a remote GATT characteristic.
///
/// The request engine never interprets it; it is only carried as the target of a
/// request and compared by identity. Services may expose several characteristics
/// with the same UUID, so the transport-assigned instance id takes part in equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacteristicRef {
    service_id: Uuid,
    char_id: Uuid,
    instance_id: u16,
}

impl CharacteristicRef {
    /// Creates a reference to the first instance of `char_id` in `service_id`.
    pub fn new(service_id: Uuid, char_id: Uuid) -> Self {
        Self::with_instance(service_id, char_id, 0)
    }

    /// Creates a reference to a specific instance of a characteristic.
    pub fn with_instance(service_id: Uuid, char_id: Uuid, instance_id: u16) -> Self {
        Self {
            service_id,
            char_id,
            instance_id,
        }
    }

    /// The [Uuid] identifying the type of this GATT characteristic.
    pub fn uuid(&self) -> Uuid {
        self.char_id
    }

    /// The [Uuid] of the service containing this characteristic.
    pub fn service_uuid(&self) -> Uuid {
        self.service_id
    }

    /// The transport-assigned instance id.
    pub fn instance_id(&self) -> u16 {
        self.instance_id
    }

    /// Refers to the descriptor `desc_id` of this characteristic.
    pub fn descriptor(&self, desc_id: Uuid) -> DescriptorRef {
        DescriptorRef::new(*self, desc_id)
    }
}

impl std::fmt::Display for CharacteristicRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.service_id, self.char_id)?;
        if self.instance_id != 0 {
            write!(f, "#{}", self.instance_id)?;
        }
        Ok(())
    }
}
