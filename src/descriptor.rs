use uuid::Uuid;

use super::characteristic::CharacteristicRef;

/// Identity of a remote GATT descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DescriptorRef {
    characteristic: CharacteristicRef,
    desc_id: Uuid,
}

impl DescriptorRef {
    pub fn new(characteristic: CharacteristicRef, desc_id: Uuid) -> Self {
        Self {
            characteristic,
            desc_id,
        }
    }

    /// The [Uuid] identifying the type of this GATT descriptor.
    pub fn uuid(&self) -> Uuid {
        self.desc_id
    }

    /// The characteristic this descriptor belongs to.
    pub fn characteristic(&self) -> CharacteristicRef {
        self.characteristic
    }
}

impl std::fmt::Display for DescriptorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.characteristic, self.desc_id)
    }
}

/// Target of a request: a characteristic or a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeRef {
    Characteristic(CharacteristicRef),
    Descriptor(DescriptorRef),
}

impl AttributeRef {
    pub fn as_characteristic(&self) -> Option<&CharacteristicRef> {
        match self {
            AttributeRef::Characteristic(c) => Some(c),
            AttributeRef::Descriptor(_) => None,
        }
    }

    pub fn as_descriptor(&self) -> Option<&DescriptorRef> {
        match self {
            AttributeRef::Characteristic(_) => None,
            AttributeRef::Descriptor(d) => Some(d),
        }
    }
}

impl From<CharacteristicRef> for AttributeRef {
    fn from(c: CharacteristicRef) -> Self {
        AttributeRef::Characteristic(c)
    }
}

impl From<DescriptorRef> for AttributeRef {
    fn from(d: DescriptorRef) -> Self {
        AttributeRef::Descriptor(d)
    }
}

impl std::fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeRef::Characteristic(c) => write!(f, "characteristic {c}"),
            AttributeRef::Descriptor(d) => write!(f, "descriptor {d}"),
        }
    }
}
