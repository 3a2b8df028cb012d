use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::EngineError;
use crate::net::{Identity, PlayerListItem, Property};
use crate::placeholder;

/// A backend player as last reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: Identity,
    pub username: String,
    pub display_name: Option<String>,
    pub latency: i32,
    pub game_mode: i32,
    pub properties: Vec<Property>,
    /// Arrival order; orders rebuilds deterministically.
    pub joined: u64,
}

impl RosterEntry {
    fn from_item(item: &PlayerListItem, joined: u64) -> Self {
        Self {
            id: item.id,
            username: item.username.clone().unwrap_or_default(),
            display_name: item.display_name.clone(),
            latency: item.latency,
            game_mode: item.game_mode,
            properties: item.properties.clone(),
            joined,
        }
    }

    pub fn to_item(&self) -> PlayerListItem {
        PlayerListItem {
            id: self.id,
            username: Some(self.username.clone()),
            display_name: self.display_name.clone(),
            latency: self.latency,
            game_mode: self.game_mode,
            properties: self.properties.clone(),
        }
    }
}

type RosterMap = HashMap<Identity, RosterEntry>;

/// Read-only handle on a connection's roster, safe to hand to other threads.
#[derive(Debug, Clone)]
pub struct RosterView {
    entries: Arc<RwLock<RosterMap>>,
}

impl RosterView {
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.entries.read().contains_key(&id)
    }

    pub fn get(&self, id: Identity) -> Option<RosterEntry> {
        self.entries.read().get(&id).cloned()
    }

    pub fn snapshot(&self) -> Vec<RosterEntry> {
        sorted(&self.entries.read())
    }
}

#[derive(Debug, Default)]
pub struct RosterMirror {
    entries: Arc<RwLock<RosterMap>>,
    next_joined: u64,
}

impl RosterMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> RosterView {
        RosterView {
            entries: Arc::clone(&self.entries),
        }
    }

    /// Inserts or replaces entries. Nothing is applied if any entry collides
    /// with a placeholder.
    pub fn add(&mut self, items: &[PlayerListItem]) -> Result<(), EngineError> {
        let pool = placeholder::pool();
        for item in items {
            let username = item.username.as_deref().unwrap_or_default();
            if pool.is_placeholder_id(item.id) || pool.is_placeholder_name(username) {
                log::error!("backend reported placeholder identity {} ({username:?})", item.id);
                return Err(EngineError::IdentityCollision {
                    id: item.id,
                    username: username.to_string(),
                });
            }
        }

        let mut entries = self.entries.write();
        for item in items {
            let joined = match entries.get(&item.id) {
                Some(existing) => existing.joined,
                None => {
                    self.next_joined += 1;
                    self.next_joined
                }
            };
            entries.insert(item.id, RosterEntry::from_item(item, joined));
        }
        Ok(())
    }

    /// Returns the previous game mode, or `None` for an unknown identity.
    pub fn update_game_mode(&mut self, id: Identity, game_mode: i32) -> Option<i32> {
        self.update(id, |entry| std::mem::replace(&mut entry.game_mode, game_mode))
    }

    pub fn update_latency(&mut self, id: Identity, latency: i32) -> bool {
        self.update(id, |entry| entry.latency = latency).is_some()
    }

    pub fn update_display_name(&mut self, id: Identity, display_name: Option<String>) -> bool {
        self.update(id, |entry| entry.display_name = display_name)
            .is_some()
    }

    fn update<T>(&mut self, id: Identity, f: impl FnOnce(&mut RosterEntry) -> T) -> Option<T> {
        let mut entries = self.entries.write();
        match entries.get_mut(&id) {
            Some(entry) => Some(f(entry)),
            None => {
                log::debug!("ignoring update for unknown identity {id}");
                None
            }
        }
    }

    pub fn remove(&mut self, ids: impl IntoIterator<Item = Identity>) -> Vec<RosterEntry> {
        let mut entries = self.entries.write();
        ids.into_iter()
            .filter_map(|id| {
                let removed = entries.remove(&id);
                if removed.is_none() {
                    log::debug!("ignoring removal of unknown identity {id}");
                }
                removed
            })
            .collect()
    }

    pub fn reset(&mut self) -> Vec<RosterEntry> {
        let drained: RosterMap = std::mem::take(&mut *self.entries.write());
        let mut entries: Vec<RosterEntry> = drained.into_values().collect();
        entries.sort_by_key(|entry| entry.joined);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.entries.read().contains_key(&id)
    }

    pub fn get(&self, id: Identity) -> Option<RosterEntry> {
        self.entries.read().get(&id).cloned()
    }

    pub fn game_mode(&self, id: Identity) -> Option<i32> {
        self.entries.read().get(&id).map(|entry| entry.game_mode)
    }

    pub fn properties(&self, id: Identity) -> Vec<Property> {
        self.entries
            .read()
            .get(&id)
            .map(|entry| entry.properties.clone())
            .unwrap_or_default()
    }

    pub fn contains_username(&self, username: &str) -> bool {
        self.entries
            .read()
            .values()
            .any(|entry| entry.username == username)
    }

    /// All entries in arrival order.
    pub fn entries(&self) -> Vec<RosterEntry> {
        sorted(&self.entries.read())
    }

    pub fn ids(&self) -> Vec<Identity> {
        self.entries().into_iter().map(|entry| entry.id).collect()
    }
}

fn sorted(map: &RosterMap) -> Vec<RosterEntry> {
    let mut entries: Vec<RosterEntry> = map.values().cloned().collect();
    entries.sort_by_key(|entry| entry.joined);
    entries
}
