use std::collections::{BTreeMap, HashSet};

use super::TabEngine;
use crate::error::EngineError;
use crate::net::{
    Identity, PacketSink, PlayerListItem, PlayerListPacket, GAME_MODE_SPECTATOR,
    GAME_MODE_SURVIVAL,
};
use crate::placeholder::{self, required_size, MAX_ROWS};
use crate::roster::RosterEntry;
use crate::team;

impl<S: PacketSink> TabEngine<S> {
    pub(super) fn spectating_viewer(&self) -> Option<Identity> {
        let viewer = self.viewer_id();
        (self.roster.game_mode(viewer) == Some(GAME_MODE_SPECTATOR)).then_some(viewer)
    }

    /// Rows open to regular allocation; the last row is kept for a
    /// spectating viewer.
    pub(super) fn open_limit(&self) -> usize {
        let size = self.slots.size();
        match self.spectating_viewer() {
            Some(_) => size.saturating_sub(1),
            None => size,
        }
    }

    /// The client-side entry for an active row.
    pub(super) fn row_item(&self, index: usize) -> PlayerListItem {
        let row = self.slots.row(index);
        let properties = if row.holds_placeholder() {
            row.skin().to_properties()
        } else {
            self.roster.properties(row.occupant())
        };
        let game_mode = if self.spectating_viewer() == Some(row.occupant()) {
            GAME_MODE_SPECTATOR
        } else {
            GAME_MODE_SURVIVAL
        };

        let username = row
            .occupant_name()
            .unwrap_or_else(|| placeholder::pool().username(index));

        PlayerListItem {
            id: row.occupant(),
            username: Some(username.to_string()),
            display_name: Some(row.text().to_string()),
            latency: row.latency(),
            game_mode,
            properties,
        }
    }

    pub(super) fn track_required_size(&mut self) {
        if self.roster.len() > self.slots.size() {
            self.slots.set_size(required_size(self.roster.len()));
        }
    }

    pub(super) fn handle_add(&mut self, items: &[PlayerListItem]) -> Result<(), EngineError> {
        if self.roster.len() > self.slots.size() {
            let target = required_size(self.roster.len());
            log::info!(
                "{} players outgrew {} rows, resizing to {target}",
                self.roster.len(),
                self.slots.size()
            );
            self.resize(target)?;
        } else {
            for item in items {
                self.place_entry(item.id)?;
            }
        }

        self.sync_members();
        Ok(())
    }

    pub(super) fn handle_remove(&mut self, removed: &[RosterEntry]) {
        for entry in removed {
            if let Some(index) = self.slots.row_of(entry.id) {
                self.vacate(index);
            }
        }
        self.sync_members();
    }

    pub(super) fn handle_viewer_game_mode(
        &mut self,
        previous: i32,
        current: i32,
    ) -> Result<(), EngineError> {
        let viewer = self.viewer_id();
        let Some(index) = self.slots.row_of(viewer) else {
            self.place_entry(viewer)?;
            self.sync_members();
            return Ok(());
        };
        let last = self.slots.size().saturating_sub(1);

        if current == GAME_MODE_SPECTATOR {
            if index != last {
                log::debug!("viewer {viewer} spectating, moving from row {index} to {last}");
                self.place_spectator(viewer)?;
            } else if previous != GAME_MODE_SPECTATOR {
                self.send(PlayerListPacket::game_mode(viewer, GAME_MODE_SPECTATOR));
            }
            self.sync_members();
        } else if previous == GAME_MODE_SPECTATOR {
            if index == last {
                log::debug!("viewer {viewer} left spectator mode, releasing row {last}");
                self.vacate(last);
                let target = self.find_row(viewer, self.open_limit())?;
                self.claim(target, viewer)?;
                self.sync_members();
            } else {
                self.send(PlayerListPacket::game_mode(viewer, GAME_MODE_SURVIVAL));
            }
        }
        Ok(())
    }

    /// Gives a freshly announced (or re-announced) entry its row.
    fn place_entry(&mut self, id: Identity) -> Result<(), EngineError> {
        let Some(entry) = self.roster.get(id) else {
            return Ok(());
        };
        if id == self.viewer_id() && entry.game_mode == GAME_MODE_SPECTATOR {
            return self.place_spectator(id);
        }

        let Some(current) = self.slots.row_of(id) else {
            let target = self.find_row(id, self.open_limit())?;
            return self.claim(target, id);
        };

        self.slots.rename_occupant(current, &entry.username);
        match self.slots.pinned_row(id, self.open_limit()) {
            Some(pinned) if !self.slots.is_pinned_to(current, id) => {
                log::debug!("{id} moves from row {current} to its pinned row {pinned}");
                self.vacate(current);
                self.claim(pinned, id)
            }
            _ => {
                self.send(PlayerListPacket::add(vec![self.row_item(current)]));
                self.reconcile_row_team(current, None);
                Ok(())
            }
        }
    }

    /// Puts the spectating viewer into the last row, relocating whoever was
    /// there.
    pub(super) fn place_spectator(&mut self, viewer: Identity) -> Result<(), EngineError> {
        let Some(last) = self.slots.size().checked_sub(1) else {
            return Err(EngineError::SlotExhausted {
                id: viewer,
                size: 0,
            });
        };

        let current = self.slots.row_of(viewer);
        if current == Some(last) {
            self.send(PlayerListPacket::add(vec![self.row_item(last)]));
            return Ok(());
        }

        if let Some(index) = current {
            self.vacate(index);
        }
        if let Some((displaced, _)) = self.vacate(last) {
            let target = self.find_row(displaced, last)?;
            log::debug!("relocating {displaced} from row {last} to {target}");
            self.claim(target, displaced)?;
        }
        self.occupy(last, viewer);
        Ok(())
    }

    /// Preferred row for `id` below `limit`: a row pinned to it, else the
    /// highest free row.
    pub(super) fn find_row(&self, id: Identity, limit: usize) -> Result<usize, EngineError> {
        if let Some(pinned) = self.slots.pinned_row(id, limit) {
            return Ok(pinned);
        }
        self.slots.free_row(limit).ok_or_else(|| {
            log::error!("no free row for {id} among {} rows", self.slots.size());
            EngineError::SlotExhausted {
                id,
                size: self.slots.size(),
            }
        })
    }

    /// Moves `id` into `index`, relocating any real occupant it displaces.
    pub(super) fn claim(&mut self, index: usize, id: Identity) -> Result<(), EngineError> {
        let mut next = Some((index, id));
        while let Some((index, id)) = next.take() {
            let displaced = self.vacate(index);
            self.occupy(index, id);
            if let Some((other, _)) = displaced {
                let target = self.find_row(other, self.open_limit())?;
                log::debug!("relocating {other} from row {index} to {target}");
                next = Some((target, other));
            }
        }
        Ok(())
    }

    /// Reverts a row to its placeholder. Returns the real occupant it held.
    pub(super) fn vacate(&mut self, index: usize) -> Option<(Identity, String)> {
        if self.slots.holds_placeholder(index) {
            return None;
        }
        let previous = self.slots.row(index).occupant();
        self.send(PlayerListPacket::remove([previous]));
        let displaced = self.slots.assign_placeholder(index);
        self.send(PlayerListPacket::add(vec![self.row_item(index)]));
        self.reconcile_row_team(index, None);
        displaced
    }

    /// Shows a connected identity in a row that currently holds its
    /// placeholder.
    pub(super) fn occupy(&mut self, index: usize, id: Identity) {
        let Some(entry) = self.roster.get(id) else {
            return;
        };
        let previous = self.slots.row(index).occupant();
        if previous == id {
            return;
        }
        debug_assert!(self.slots.holds_placeholder(index));

        self.send(PlayerListPacket::remove([previous]));
        self.slots.assign_real(index, id, &entry.username);
        self.send(PlayerListPacket::add(vec![self.row_item(index)]));
        self.reconcile_row_team(index, None);
    }

    /// Changes the active size. Shrinking, or growing under a roster that
    /// already exceeds the old size, rebuilds every row. Reaching the full
    /// 80 rows hands the backend roster back to the client untouched.
    pub(super) fn resize(&mut self, target: usize) -> Result<(), EngineError> {
        let old = self.slots.size();
        if target == old {
            return Ok(());
        }
        self.slots.set_size(target);
        if !self.virtualizing() {
            return Ok(());
        }
        if target == MAX_ROWS {
            self.saturate(old);
            return Ok(());
        }
        if old == MAX_ROWS {
            log::info!("{} players fit {target} rows again", self.roster.len());
            let ids = self.roster.ids();
            if !ids.is_empty() {
                self.send(PlayerListPacket::remove(ids));
            }
            return self.rebuild(old);
        }
        if target < old || self.roster.len() > old {
            return self.rebuild(old);
        }

        let items: Vec<PlayerListItem> = (old..target).map(|index| self.row_item(index)).collect();
        self.send(PlayerListPacket::add(items));

        let viewer = self
            .spectating_viewer()
            .filter(|&viewer| self.slots.row_of(viewer) == old.checked_sub(1));
        if let Some(viewer) = viewer {
            self.place_spectator(viewer)?;
            self.sync_members();
        }
        Ok(())
    }

    /// Fills every row with its placeholder and shows the real players the
    /// way the backend announced them, below the placeholders.
    fn saturate(&mut self, old_size: usize) {
        log::info!(
            "{} players need all {MAX_ROWS} rows, passing the roster through",
            self.roster.len()
        );
        let items: Vec<PlayerListItem> = (old_size..MAX_ROWS)
            .map(|index| self.row_item(index))
            .collect();
        if !items.is_empty() {
            self.send(PlayerListPacket::add(items));
        }

        let mut released = Vec::new();
        for index in 0..old_size {
            if let Some((id, _)) = self.vacate(index) {
                released.push(id);
            }
        }
        self.sync_members();

        let entries: Vec<RosterEntry> = released
            .into_iter()
            .filter_map(|id| self.roster.get(id))
            .collect();
        self.resend_entries(&entries);
    }

    /// Re-derives every row and sends the difference from what the client
    /// was shown with `old_size` rows.
    pub(super) fn rebuild(&mut self, old_size: usize) -> Result<(), EngineError> {
        let plan = self
            .slots
            .plan_rebuild(&self.roster.entries(), self.spectating_viewer())?;
        let previous: Vec<Identity> = (0..old_size)
            .map(|index| self.slots.row(index).occupant())
            .collect();

        let changed = self.slots.apply_plan(&plan);
        let mut is_changed = [false; MAX_ROWS];
        for &(index, _) in &changed {
            is_changed[index] = true;
        }

        let size = self.slots.size();
        let removals: Vec<Identity> = previous
            .iter()
            .enumerate()
            .filter(|&(index, _)| index >= size || is_changed[index])
            .map(|(_, id)| *id)
            .collect();
        let additions: Vec<PlayerListItem> = (0..size)
            .filter(|&index| index >= old_size || is_changed[index])
            .map(|index| self.row_item(index))
            .collect();

        log::info!(
            "rebuilt {size} rows for {}: {} changed",
            self.viewer_id(),
            changed.len()
        );
        if !removals.is_empty() {
            self.send(PlayerListPacket::remove(removals));
        }
        if !additions.is_empty() {
            self.send(PlayerListPacket::add(additions));
        }
        for (index, _) in changed {
            self.reconcile_row_team(index, None);
        }
        self.sync_members();
        Ok(())
    }

    /// Points the row's slot team at its occupant's backend team, or back
    /// to the defaults. `refresh` forces a resend for rows attached to that
    /// team.
    pub(super) fn reconcile_row_team(&mut self, index: usize, refresh: Option<&str>) {
        let row = self.slots.row(index);
        let desired = if !self.rewriting()
            || index >= self.slots.size()
            || row.holds_placeholder()
            || row.occupant().is_npc()
        {
            None
        } else {
            row.occupant_name()
                .and_then(|name| self.teams.team_of(name))
                .map(|team| (team.name.clone(), team.info.clone()))
        };
        let attached = row.attached_team().map(str::to_string);
        let supported = self.config.collision_rule_supported;

        match desired {
            Some((name, info)) => {
                if attached.as_deref() != Some(name.as_str()) || refresh == Some(name.as_str()) {
                    self.send(team::slot_team_update(index, Some(&info), supported));
                    self.slots.set_attached_team(index, Some(name));
                }
            }
            None => {
                if attached.is_some() {
                    self.send(team::slot_team_update(index, None, supported));
                    self.slots.set_attached_team(index, None);
                }
            }
        }
    }

    pub(super) fn reconcile_teams(&mut self, refresh: Option<&str>) {
        for index in 0..MAX_ROWS {
            self.reconcile_row_team(index, refresh);
        }
    }

    /// Lists each row's real occupant in the row's slot team on the client.
    ///
    /// Every removal goes out before any addition, so a name moving between
    /// rows is never removed from a team it already left. A name that leaves
    /// its row while still connected goes back to its backend team.
    pub(super) fn sync_members(&mut self) {
        let rewriting = self.rewriting();
        let size = self.slots.size();
        let desired: Vec<Option<String>> = (0..MAX_ROWS)
            .map(|index| {
                let row = self.slots.row(index);
                if !rewriting || index >= size || row.occupant().is_npc() {
                    return None;
                }
                row.occupant_name().map(str::to_string)
            })
            .collect();

        let mut released = Vec::new();
        for (index, want) in desired.iter().enumerate() {
            let current = self.slots.row(index).slot_member().map(str::to_string);
            if let Some(name) = current.filter(|name| want.as_ref() != Some(name)) {
                let slot_team = placeholder::pool().team(index);
                self.send(team::members_packet(slot_team, vec![name.clone()], false));
                self.slots.set_slot_member(index, None);
                released.push(name);
            }
        }

        for (index, want) in desired.iter().enumerate() {
            let Some(name) = want else {
                continue;
            };
            if self.slots.row(index).slot_member() != Some(name.as_str()) {
                let slot_team = placeholder::pool().team(index);
                self.send(team::members_packet(slot_team, vec![name.clone()], true));
                self.slots.set_slot_member(index, Some(name.clone()));
            }
        }

        let listed: HashSet<&String> = desired.iter().flatten().collect();
        let restore: Vec<String> = released
            .into_iter()
            .filter(|name| !listed.contains(name) && self.roster.contains_username(name))
            .collect();
        self.send_membership(restore, true);
    }

    /// One member add/remove per backend team, for the names that belong to
    /// one.
    pub(super) fn send_membership(&mut self, names: Vec<String>, add: bool) {
        let mut by_team: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in names {
            if let Some(team) = self.teams.team_of(&name) {
                by_team.entry(team.name.clone()).or_default().push(name);
            }
        }
        for (team, mut names) in by_team {
            names.sort();
            self.send(team::members_packet(&team, names, add));
        }
    }
}
