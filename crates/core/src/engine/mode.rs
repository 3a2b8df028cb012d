use super::{ConnectionState, TabEngine};
use crate::error::EngineError;
use crate::net::{
    HeaderFooterPacket, Identity, PacketSink, PlayerListAction, PlayerListItem, PlayerListPacket,
};
use crate::placeholder::{required_size, MAX_ROWS};
use crate::roster::RosterEntry;
use crate::team;

impl<S: PacketSink> TabEngine<S> {
    /// Switches between forwarding the backend roster untouched and showing
    /// the virtualized rows, resynchronizing the client either way.
    pub fn set_passthrough(&mut self, passthrough: bool) -> Result<(), EngineError> {
        if self.passthrough == passthrough {
            return Ok(());
        }
        if self.state != ConnectionState::Connected {
            self.passthrough = passthrough;
            return Ok(());
        }

        if passthrough {
            self.leave_virtualized();
            self.passthrough = true;
            Ok(())
        } else {
            self.passthrough = false;
            self.enter_virtualized()
        }
    }

    /// Sets or clears the custom header/footer. Clearing restores what the
    /// backend last sent.
    pub fn set_header_footer(&mut self, content: Option<HeaderFooterPacket>) {
        let virtualizing = self.virtualizing();
        match content {
            Some(packet) => {
                if virtualizing {
                    self.send(packet.clone());
                }
                self.custom_header_footer = Some(packet);
            }
            None => {
                if self.custom_header_footer.take().is_some() && virtualizing {
                    let backend = self.backend_header_footer.clone().unwrap_or_default();
                    self.send(backend);
                }
            }
        }
    }

    pub fn header_footer(&self) -> Option<&HeaderFooterPacket> {
        self.custom_header_footer.as_ref()
    }

    pub(super) fn enter_virtualized(&mut self) -> Result<(), EngineError> {
        if self.roster.len() > self.slots.size() {
            self.slots.set_size(required_size(self.roster.len()));
        }
        let saturated = self.slots.size() == MAX_ROWS;
        log::info!(
            "virtualizing roster of {} ({} players, {} rows)",
            self.viewer_id(),
            self.roster.len(),
            self.slots.size()
        );

        let ids = self.roster.ids();
        if !saturated && !ids.is_empty() {
            self.send(PlayerListPacket::remove(ids));
        }
        let supported = self.config.collision_rule_supported;
        for index in 0..MAX_ROWS {
            self.send(team::slot_team_create(index, supported));
            self.slots.set_attached_team(index, None);
            self.slots.set_slot_member(index, None);
        }

        if saturated {
            self.slots.apply_plan(&[]);
        } else {
            let plan = self
                .slots
                .plan_rebuild(&self.roster.entries(), self.spectating_viewer())?;
            self.slots.apply_plan(&plan);
        }

        let items: Vec<PlayerListItem> = (0..self.slots.size())
            .map(|index| self.row_item(index))
            .collect();
        if !items.is_empty() {
            self.send(PlayerListPacket::add(items));
        }
        self.reconcile_teams(None);
        self.sync_members();

        if let Some(custom) = self.custom_header_footer.clone() {
            self.send(custom);
        }
        Ok(())
    }

    /// Hands the client back the backend's view. Row occupants are kept so
    /// re-entering restores the same assignment.
    fn leave_virtualized(&mut self) {
        log::info!("passing roster of {} through", self.viewer_id());
        let saturated = self.is_saturated();

        let shown: Vec<Identity> = self.slots.rows().iter().map(|row| row.occupant()).collect();
        if !shown.is_empty() {
            self.send(PlayerListPacket::remove(shown));
        }
        let mut listed = Vec::new();
        for index in 0..MAX_ROWS {
            self.send(team::slot_team_remove(index));
            self.slots.set_attached_team(index, None);
            if let Some(name) = self.slots.row(index).slot_member().map(str::to_string) {
                self.slots.set_slot_member(index, None);
                listed.push(name);
            }
        }

        let restore: Vec<String> = listed
            .into_iter()
            .filter(|name| self.roster.contains_username(name))
            .collect();
        self.send_membership(restore, true);

        if self.custom_header_footer.is_some() {
            let backend = self.backend_header_footer.clone().unwrap_or_default();
            self.send(backend);
        }
        if !saturated {
            let entries = self.roster.entries();
            self.resend_entries(&entries);
        }
    }

    /// Announces entries the way the backend did: add, latency, game mode,
    /// then display name for entries that carry one.
    pub(super) fn resend_entries(&mut self, entries: &[RosterEntry]) {
        if entries.is_empty() {
            return;
        }
        let items: Vec<PlayerListItem> = entries.iter().map(|entry| entry.to_item()).collect();
        let renamed: Vec<PlayerListItem> = items
            .iter()
            .filter(|item| item.display_name.is_some())
            .cloned()
            .collect();

        self.send(PlayerListPacket::new(PlayerListAction::AddPlayer, items.clone()));
        self.send(PlayerListPacket::new(PlayerListAction::UpdateLatency, items.clone()));
        self.send(PlayerListPacket::new(PlayerListAction::UpdateGameMode, items));
        if !renamed.is_empty() {
            self.send(PlayerListPacket::new(PlayerListAction::UpdateDisplayName, renamed));
        }
    }
}
