use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::EngineError;
use crate::net::{Identity, Skin};
use crate::placeholder::{self, MAX_ROWS};
use crate::roster::RosterEntry;

use super::row::{Occupant, Row};

/// The fixed array of rows and its lookup indexes.
///
/// Rows at or beyond the active size are kept on their placeholder while the
/// engine is virtualizing; their skin, text and latency are still stored so
/// the configuration survives resizes.
#[derive(Debug)]
pub struct SlotTable {
    rows: Vec<Row>,
    size: usize,
    by_identity: HashMap<Identity, usize>,
    pinned: HashMap<Identity, BTreeSet<usize>>,
}

impl SlotTable {
    pub fn new(default_skin: Skin) -> Self {
        let rows = (0..MAX_ROWS)
            .map(|index| Row::new(index, default_skin.clone()))
            .collect();

        let mut table = Self {
            rows,
            size: 0,
            by_identity: HashMap::new(),
            pinned: HashMap::new(),
        };
        if let Some(owner) = default_skin.owner {
            table.pinned.insert(owner, (0..MAX_ROWS).collect());
        }
        table
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) {
        debug_assert!(size <= MAX_ROWS);
        self.size = size.min(MAX_ROWS);
    }

    pub fn row(&self, index: usize) -> &Row {
        &self.rows[index]
    }

    /// Rows below the active size.
    pub fn rows(&self) -> &[Row] {
        &self.rows[..self.size]
    }

    pub fn row_of(&self, id: Identity) -> Option<usize> {
        self.by_identity.get(&id).copied()
    }

    pub fn holds_placeholder(&self, index: usize) -> bool {
        self.rows[index].holds_placeholder()
    }

    /// Lowest row below `limit` whose skin is pinned to `id`.
    pub fn pinned_row(&self, id: Identity, limit: usize) -> Option<usize> {
        let limit = limit.min(self.size);
        self.pinned
            .get(&id)
            .and_then(|rows| rows.range(..limit).next().copied())
    }

    pub fn is_pinned_to(&self, index: usize, id: Identity) -> bool {
        self.rows[index].is_pinned_to(id)
    }

    /// Highest row below `limit` still holding its placeholder.
    pub fn free_row(&self, limit: usize) -> Option<usize> {
        let limit = limit.min(self.size);
        (0..limit).rev().find(|&index| self.rows[index].holds_placeholder())
    }

    /// Puts the row back on its placeholder, returning the real occupant it
    /// displaced.
    pub fn assign_placeholder(&mut self, index: usize) -> Option<(Identity, String)> {
        let row = &mut self.rows[index];
        if row.holds_placeholder() {
            return None;
        }

        let previous = row.occupant;
        let name = row.occupant_name.take().unwrap_or_default();
        row.occupant = placeholder::pool().identity(index);

        if self.by_identity.get(&previous) == Some(&index) {
            self.by_identity.remove(&previous);
        }
        Some((previous, name))
    }

    /// Places a real identity in the row. The identity must not occupy any
    /// other row.
    pub fn assign_real(&mut self, index: usize, id: Identity, username: &str) {
        debug_assert!(
            self.row_of(id).is_none_or(|row| row == index),
            "{id} already occupies another row"
        );
        self.assign_placeholder(index);

        let row = &mut self.rows[index];
        row.occupant = id;
        row.occupant_name = Some(username.to_string());
        self.by_identity.insert(id, index);
    }

    /// Refreshes the stored username of a real occupant that was re-announced.
    pub fn rename_occupant(&mut self, index: usize, username: &str) {
        let row = &mut self.rows[index];
        if !row.holds_placeholder() {
            row.occupant_name = Some(username.to_string());
        }
    }

    pub fn set_skin(&mut self, index: usize, skin: Skin) -> Skin {
        let previous = std::mem::replace(&mut self.rows[index].skin, skin);

        if let Some(owner) = previous.owner {
            if let Some(rows) = self.pinned.get_mut(&owner) {
                rows.remove(&index);
                if rows.is_empty() {
                    self.pinned.remove(&owner);
                }
            }
        }
        if let Some(owner) = self.rows[index].skin.owner {
            self.pinned.entry(owner).or_default().insert(index);
        }
        previous
    }

    pub fn set_text(&mut self, index: usize, text: &str) -> bool {
        let row = &mut self.rows[index];
        if row.text == text {
            return false;
        }
        row.text = text.to_string();
        true
    }

    pub fn set_latency(&mut self, index: usize, latency: i32) -> bool {
        let row = &mut self.rows[index];
        if row.latency == latency {
            return false;
        }
        row.latency = latency;
        true
    }

    pub fn set_attached_team(&mut self, index: usize, team: Option<String>) {
        self.rows[index].team = team;
    }

    pub fn set_slot_member(&mut self, index: usize, member: Option<String>) {
        self.rows[index].member = member;
    }

    /// Row whose slot team the client currently lists `username` in.
    pub fn member_row(&self, username: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.member.as_deref() == Some(username))
    }

    /// Derives a fresh assignment for every active row.
    ///
    /// A spectating viewer is reserved the last row, pinned rows take their
    /// connected owner and a row keeps its previous real occupant. Everyone
    /// else fills the highest rows still free, earliest-joined first, so the
    /// low rows stay placeholders.
    pub fn plan_rebuild(
        &self,
        roster: &[RosterEntry],
        spectator: Option<Identity>,
    ) -> Result<Vec<Occupant>, EngineError> {
        let size = self.size;
        let connected: HashMap<Identity, &RosterEntry> =
            roster.iter().map(|entry| (entry.id, entry)).collect();
        let mut plan: Vec<Option<Occupant>> = vec![None; size];
        let mut placed: HashSet<Identity> = HashSet::new();

        let mut body = size;
        if let Some(viewer) = spectator {
            if let (Some(entry), Some(last)) = (connected.get(&viewer), size.checked_sub(1)) {
                plan[last] = Some(Occupant::real(viewer, &entry.username));
                placed.insert(viewer);
                body = last;
            }
        }

        for index in 0..body {
            let Some(owner) = self.rows[index].skin.owner else {
                continue;
            };
            if placed.contains(&owner) {
                continue;
            }
            if let Some(entry) = connected.get(&owner) {
                plan[index] = Some(Occupant::real(owner, &entry.username));
                placed.insert(owner);
            }
        }

        for index in 0..body {
            let row = &self.rows[index];
            if plan[index].is_some() || row.holds_placeholder() || placed.contains(&row.occupant) {
                continue;
            }
            if let Some(entry) = connected.get(&row.occupant) {
                plan[index] = Some(Occupant::real(row.occupant, &entry.username));
                placed.insert(row.occupant);
            }
        }

        let mut remaining = roster.iter().filter(|entry| !placed.contains(&entry.id));
        for index in (0..body).rev() {
            if plan[index].is_some() {
                continue;
            }
            match remaining.next() {
                Some(entry) => plan[index] = Some(Occupant::real(entry.id, &entry.username)),
                None => break,
            }
        }
        if let Some(entry) = remaining.next() {
            log::error!("rebuild cannot place {} in {size} rows", entry.id);
            return Err(EngineError::SlotExhausted { id: entry.id, size });
        }

        Ok(plan
            .into_iter()
            .map(|occupant| occupant.unwrap_or(Occupant::Placeholder))
            .collect())
    }

    /// Applies a plan, resetting every row beyond it to its placeholder.
    /// Returns the rows that changed together with their previous occupant.
    pub fn apply_plan(&mut self, plan: &[Occupant]) -> Vec<(usize, Identity)> {
        let mut changed = Vec::new();
        for index in 0..MAX_ROWS {
            let target = plan.get(index).unwrap_or(&Occupant::Placeholder);
            if !self.rows[index].holds(target) {
                changed.push((index, self.rows[index].occupant));
                self.assign_placeholder(index);
            }
        }

        for &(index, _) in &changed {
            if let Some(Occupant::Real { id, username }) = plan.get(index) {
                self.assign_real(index, *id, username);
            }
        }
        changed
    }

    /// Checks the row invariants; returns a description of the first
    /// violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let pool = placeholder::pool();
        let mut seen = HashSet::new();

        for row in &self.rows {
            if row.member.is_some() && row.member != row.occupant_name {
                return Err(format!("row {} lists a stale slot team member", row.index));
            }
            if row.holds_placeholder() {
                if row.occupant_name.is_some() {
                    return Err(format!("placeholder row {} carries a name", row.index));
                }
                continue;
            }
            if pool.is_placeholder_id(row.occupant) {
                return Err(format!("row {} holds a foreign placeholder", row.index));
            }
            if row.index >= self.size {
                return Err(format!("inactive row {} holds {}", row.index, row.occupant));
            }
            if !seen.insert(row.occupant) {
                return Err(format!("{} occupies two rows", row.occupant));
            }
            if self.by_identity.get(&row.occupant) != Some(&row.index) {
                return Err(format!("identity index out of sync for row {}", row.index));
            }
            if row.occupant_name.is_none() {
                return Err(format!("real row {} has no name", row.index));
            }
        }

        if self.by_identity.len() != seen.len() {
            return Err(String::from("identity index holds stale entries"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u128, name: &str, joined: u64) -> RosterEntry {
        RosterEntry {
            id: Identity::from_u128(n),
            username: name.to_string(),
            display_name: None,
            latency: 0,
            game_mode: 0,
            properties: Vec::new(),
            joined,
        }
    }

    fn table(size: usize) -> SlotTable {
        let mut table = SlotTable::new(Skin::default());
        table.set_size(size);
        table
    }

    #[test]
    fn test_free_row_is_highest_placeholder() {
        let mut table = table(20);
        assert_eq!(table.free_row(20), Some(19));
        table.assign_real(19, Identity::from_u128(1), "a");
        assert_eq!(table.free_row(20), Some(18));
        assert_eq!(table.free_row(5), Some(4));
        assert_eq!(table.row_of(Identity::from_u128(1)), Some(19));
        table.check_invariants().unwrap();
    }

    #[test]
    fn test_assign_placeholder_returns_previous() {
        let mut table = table(20);
        table.assign_real(3, Identity::from_u128(1), "a");
        assert_eq!(
            table.assign_placeholder(3),
            Some((Identity::from_u128(1), "a".to_string()))
        );
        assert_eq!(table.assign_placeholder(3), None);
        assert!(table.row_of(Identity::from_u128(1)).is_none());
        table.check_invariants().unwrap();
    }

    #[test]
    fn test_pinned_rows_follow_skin() {
        let mut table = table(20);
        let owner = Identity::from_u128(9);
        table.set_skin(12, Skin::of_player(owner, Vec::new()));
        table.set_skin(4, Skin::of_player(owner, Vec::new()));
        assert_eq!(table.pinned_row(owner, 20), Some(4));

        table.set_skin(4, Skin::default());
        assert_eq!(table.pinned_row(owner, 20), Some(12));
        assert_eq!(table.pinned_row(owner, 10), None);
        assert!(table.is_pinned_to(12, owner));
    }

    #[test]
    fn test_rebuild_fills_highest_rows_in_arrival_order() {
        let table = table(20);
        let roster = vec![entry(1, "a", 1), entry(2, "b", 2), entry(3, "c", 3)];
        let plan = table.plan_rebuild(&roster, None).unwrap();

        assert_eq!(plan.len(), 20);
        assert_eq!(plan[19], Occupant::real(Identity::from_u128(1), "a"));
        assert_eq!(plan[17], Occupant::real(Identity::from_u128(3), "c"));
        assert!(plan[..17].iter().all(|o| *o == Occupant::Placeholder));
    }

    #[test]
    fn test_rebuild_into_forty_rows_leaves_low_rows_empty() {
        let table = table(40);
        let roster: Vec<RosterEntry> = (1..=21)
            .map(|n| entry(n, &format!("p{n}"), n as u64))
            .collect();
        let plan = table.plan_rebuild(&roster, None).unwrap();

        assert!(plan[..19].iter().all(|o| *o == Occupant::Placeholder));
        for (offset, n) in (1..=21u128).enumerate() {
            assert_eq!(
                plan[39 - offset],
                Occupant::real(Identity::from_u128(n), format!("p{n}"))
            );
        }
    }

    #[test]
    fn test_rebuild_prefers_pins_then_previous_rows() {
        let mut table = table(20);
        let roster = vec![entry(1, "a", 1), entry(2, "b", 2), entry(3, "c", 3)];
        table.assign_real(15, Identity::from_u128(2), "b");
        table.set_skin(7, Skin::of_player(Identity::from_u128(3), Vec::new()));

        let plan = table.plan_rebuild(&roster, None).unwrap();
        assert_eq!(plan[19], Occupant::real(Identity::from_u128(1), "a"));
        assert_eq!(plan[7], Occupant::real(Identity::from_u128(3), "c"));
        assert_eq!(plan[15], Occupant::real(Identity::from_u128(2), "b"));
    }

    #[test]
    fn test_rebuild_reserves_last_row_for_spectator() {
        let table = table(20);
        let roster = vec![entry(1, "viewer", 1), entry(2, "b", 2)];
        let plan = table
            .plan_rebuild(&roster, Some(Identity::from_u128(1)))
            .unwrap();
        assert_eq!(plan[19], Occupant::real(Identity::from_u128(1), "viewer"));
        assert_eq!(plan[18], Occupant::real(Identity::from_u128(2), "b"));
    }

    #[test]
    fn test_rebuild_exhaustion() {
        let table = table(1);
        let roster = vec![entry(1, "a", 1), entry(2, "b", 2)];
        let err = table.plan_rebuild(&roster, None).unwrap_err();
        assert_eq!(
            err,
            EngineError::SlotExhausted {
                id: Identity::from_u128(2),
                size: 1
            }
        );
    }

    #[test]
    fn test_slot_member_must_match_occupant() {
        let mut table = table(20);
        table.assign_real(19, Identity::from_u128(1), "a");
        table.set_slot_member(19, Some("a".to_string()));
        assert_eq!(table.member_row("a"), Some(19));
        table.check_invariants().unwrap();

        table.assign_placeholder(19);
        assert!(table.check_invariants().is_err());
        table.set_slot_member(19, None);
        assert_eq!(table.member_row("a"), None);
        table.check_invariants().unwrap();
    }

    #[test]
    fn test_apply_plan_moves_identity_without_duplicates() {
        let mut table = table(20);
        table.assign_real(3, Identity::from_u128(1), "a");
        let mut plan = vec![Occupant::Placeholder; 20];
        plan[7] = Occupant::real(Identity::from_u128(1), "a");

        let changed = table.apply_plan(&plan);
        assert_eq!(changed.len(), 2);
        assert_eq!(table.row_of(Identity::from_u128(1)), Some(7));
        assert!(table.holds_placeholder(3));
        table.check_invariants().unwrap();
    }
}
