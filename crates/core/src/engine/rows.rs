use super::TabEngine;
use crate::error::EngineError;
use crate::net::{Identity, PacketSink, PlayerListPacket, Skin};
use crate::placeholder::{required_size, MAX_ROWS};

impl<S: PacketSink> TabEngine<S> {
    fn check_row(index: usize) -> Result<(), EngineError> {
        if index >= MAX_ROWS {
            return Err(EngineError::RowOutOfRange(index));
        }
        Ok(())
    }

    /// Configures a row's skin, text and latency.
    ///
    /// A new skin owned by a connected player moves that player into the
    /// row, swapping with whoever was shown there.
    pub fn set_row(
        &mut self,
        index: usize,
        skin: Skin,
        text: &str,
        latency: i32,
    ) -> Result<(), EngineError> {
        Self::check_row(index)?;

        if !self.virtualizing() || index >= self.slots.size() {
            self.slots.set_skin(index, skin);
            self.slots.set_text(index, text);
            self.slots.set_latency(index, latency);
            return Ok(());
        }

        if self.slots.row(index).skin() == &skin {
            self.update_text(index, text)?;
            return self.update_latency(index, latency);
        }

        let owner = skin.owner();
        self.slots.set_skin(index, skin);

        if let Some(owner) = owner.filter(|&owner| self.should_follow(index, owner)) {
            self.slots.set_text(index, text);
            self.slots.set_latency(index, latency);

            self.follow_player(index, owner)?;
            self.sync_members();
            return Ok(());
        }

        if self.slots.holds_placeholder(index) {
            // The skin is part of the add entry, so the row is re-announced.
            self.slots.set_text(index, text);
            self.slots.set_latency(index, latency);
            let id = self.slots.row(index).occupant();
            self.send(PlayerListPacket::remove([id]));
            self.send(PlayerListPacket::add(vec![self.row_item(index)]));
            Ok(())
        } else {
            self.update_text(index, text)?;
            self.update_latency(index, latency)
        }
    }

    pub fn update_text(&mut self, index: usize, text: &str) -> Result<(), EngineError> {
        Self::check_row(index)?;
        if !self.slots.set_text(index, text) {
            return Ok(());
        }
        if self.virtualizing() && index < self.slots.size() {
            let id = self.slots.row(index).occupant();
            self.send(PlayerListPacket::display_name(id, Some(text.to_string())));
        }
        Ok(())
    }

    pub fn update_latency(&mut self, index: usize, latency: i32) -> Result<(), EngineError> {
        Self::check_row(index)?;
        if !self.slots.set_latency(index, latency) {
            return Ok(());
        }
        if self.virtualizing() && index < self.slots.size() {
            let id = self.slots.row(index).occupant();
            self.send(PlayerListPacket::latency(id, latency));
        }
        Ok(())
    }

    /// Requests an active size. The size never drops below what the
    /// connected players need.
    pub fn set_size(&mut self, size: usize) -> Result<(), EngineError> {
        if size > MAX_ROWS {
            return Err(EngineError::InvalidSize(size));
        }
        let target = size.max(required_size(self.roster.len()));
        if target != size {
            log::warn!(
                "size {size} cannot hold {} players, using {target}",
                self.roster.len()
            );
        }
        self.resize(target)
    }

    fn should_follow(&self, index: usize, owner: Identity) -> bool {
        if !self.rewriting()
            || !self.roster.contains(owner)
            || self.slots.row_of(owner) == Some(index)
        {
            return false;
        }
        match self.spectating_viewer() {
            Some(viewer) => viewer != owner && index + 1 != self.slots.size(),
            None => true,
        }
    }

    /// Moves `owner` into `index`. Whoever the row showed goes to its own
    /// pinned row, else to the row `owner` left.
    fn follow_player(&mut self, index: usize, owner: Identity) -> Result<(), EngineError> {
        let previous = self.slots.row_of(owner);
        let displaced = self.vacate(index);
        if let Some(previous) = previous {
            self.vacate(previous);
        }
        self.occupy(index, owner);

        if let Some((other, _)) = displaced {
            let limit = self.open_limit();
            let target = match (self.slots.pinned_row(other, limit), previous) {
                (Some(pinned), _) => pinned,
                (None, Some(previous))
                    if previous < limit && self.slots.holds_placeholder(previous) =>
                {
                    previous
                }
                _ => self.find_row(other, limit)?,
            };
            log::debug!("{owner} took row {index}, {other} moves to {target}");
            self.claim(target, other)?;
        }
        Ok(())
    }
}
