use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use uuid::Uuid;

use crate::net::Identity;

pub const MAX_ROWS: usize = 80;
pub const COLUMN_HEIGHT: usize = 20;

const NAMESPACE: Uuid = Uuid::from_u128(0x6d1c_4f0e_2b7a_4c55_9e3d_7a10_5f2e_c0de);

/// The synthetic occupant of one row index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub index: usize,
    pub id: Identity,
    /// Starts with a space, which no real account name can.
    pub username: String,
    /// Per-row team; its name fixes the row's sort position on the client.
    pub team: String,
}

#[derive(Debug)]
pub struct PlaceholderPool {
    entries: Vec<Placeholder>,
    by_id: HashMap<Identity, usize>,
    names: HashSet<String>,
    teams: HashSet<String>,
}

impl PlaceholderPool {
    fn build() -> Self {
        let entries: Vec<Placeholder> = (0..MAX_ROWS)
            .map(|index| {
                let username = format!(" ~slot {index:02}");
                let id = Identity::from(Uuid::new_v3(&NAMESPACE, username.as_bytes()));
                Placeholder {
                    index,
                    id,
                    username,
                    team: format!(" ~slot{index:02}"),
                }
            })
            .collect();

        let by_id = entries.iter().map(|p| (p.id, p.index)).collect();
        let names = entries.iter().map(|p| p.username.clone()).collect();
        let teams = entries.iter().map(|p| p.team.clone()).collect();

        Self {
            entries,
            by_id,
            names,
            teams,
        }
    }

    /// Panics if `index >= MAX_ROWS`; row indices are validated at the API edge.
    pub fn get(&self, index: usize) -> &Placeholder {
        &self.entries[index]
    }

    pub fn identity(&self, index: usize) -> Identity {
        self.entries[index].id
    }

    pub fn username(&self, index: usize) -> &str {
        &self.entries[index].username
    }

    pub fn team(&self, index: usize) -> &str {
        &self.entries[index].team
    }

    pub fn index_of(&self, id: Identity) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn is_placeholder_id(&self, id: Identity) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn is_placeholder_name(&self, username: &str) -> bool {
        self.names.contains(username)
    }

    pub fn is_slot_team(&self, team: &str) -> bool {
        self.teams.contains(team)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.iter()
    }
}

/// Shared read-only pool, built on first use.
pub fn pool() -> &'static PlaceholderPool {
    static POOL: OnceLock<PlaceholderPool> = OnceLock::new();
    POOL.get_or_init(PlaceholderPool::build)
}

/// Rows needed to show `count` entries: whole columns, capped at the maximum.
pub fn required_size(count: usize) -> usize {
    count.div_ceil(COLUMN_HEIGHT).saturating_mul(COLUMN_HEIGHT).min(MAX_ROWS)
}
