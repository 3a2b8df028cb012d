use super::protocol::{ClientPacket, Identity, Property};

/// Outbound half of the client connection.
pub trait PacketSink {
    fn send(&mut self, packet: ClientPacket);
}

impl PacketSink for Vec<ClientPacket> {
    fn send(&mut self, packet: ClientPacket) {
        self.push(packet);
    }
}

/// Source of the connection's own identity.
pub trait ViewerIdentity {
    fn viewer_id(&self) -> Identity;
}

impl ViewerIdentity for Identity {
    fn viewer_id(&self) -> Identity {
        *self
    }
}

/// A row avatar: the profile properties the client renders, plus the real
/// player they were taken from, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Skin {
    #[serde(default)]
    pub owner: Option<Identity>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Skin {
    pub fn new(properties: Vec<Property>) -> Self {
        Self {
            owner: None,
            properties,
        }
    }

    pub fn of_player(owner: Identity, properties: Vec<Property>) -> Self {
        Self {
            owner: Some(owner),
            properties,
        }
    }

    pub fn owner(&self) -> Option<Identity> {
        self.owner
    }

    /// Serialized form as carried by an add-player entry.
    pub fn to_properties(&self) -> Vec<Property> {
        self.properties.clone()
    }
}

pub trait SkinSource {
    fn default_skin(&self) -> Skin;
}

/// Skin source that renders every unconfigured row without textures.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankSkins;

impl SkinSource for BlankSkins {
    fn default_skin(&self) -> Skin {
        Skin::default()
    }
}
