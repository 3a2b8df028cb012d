use crate::net::{Identity, Skin};
use crate::placeholder;

/// Who a row is assigned to in a rebuild plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occupant {
    Placeholder,
    Real { id: Identity, username: String },
}

impl Occupant {
    pub fn real(id: Identity, username: impl Into<String>) -> Self {
        Self::Real {
            id,
            username: username.into(),
        }
    }

    pub fn id_at(&self, index: usize) -> Identity {
        match self {
            Self::Placeholder => placeholder::pool().identity(index),
            Self::Real { id, .. } => *id,
        }
    }
}

/// One client-visible roster position.
///
/// The occupant decides which identity the client sees; text, latency and
/// skin belong to the row and survive any change of occupant.
#[derive(Debug, Clone)]
pub struct Row {
    pub(super) index: usize,
    pub(super) occupant: Identity,
    pub(super) occupant_name: Option<String>,
    pub(super) skin: Skin,
    pub(super) text: String,
    pub(super) latency: i32,
    pub(super) team: Option<String>,
    pub(super) member: Option<String>,
}

impl Row {
    pub(super) fn new(index: usize, skin: Skin) -> Self {
        Self {
            index,
            occupant: placeholder::pool().identity(index),
            occupant_name: None,
            skin,
            text: String::new(),
            latency: 0,
            team: None,
            member: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn occupant(&self) -> Identity {
        self.occupant
    }

    /// Backend username of a real occupant.
    pub fn occupant_name(&self) -> Option<&str> {
        self.occupant_name.as_deref()
    }

    pub fn skin(&self) -> &Skin {
        &self.skin
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn latency(&self) -> i32 {
        self.latency
    }

    /// Backend team whose attributes the row's slot team currently copies.
    pub fn attached_team(&self) -> Option<&str> {
        self.team.as_deref()
    }

    /// Real username the client currently has in this row's slot team.
    pub fn slot_member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    pub fn holds_placeholder(&self) -> bool {
        self.occupant == placeholder::pool().identity(self.index)
    }

    pub fn holds(&self, occupant: &Occupant) -> bool {
        match occupant {
            Occupant::Placeholder => self.holds_placeholder(),
            Occupant::Real { id, .. } => self.occupant == *id,
        }
    }

    pub fn is_pinned_to(&self, id: Identity) -> bool {
        self.skin.owner == Some(id)
    }
}
