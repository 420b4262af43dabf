//! Per-frame draw list shared by the render tasks.

use market_core::{DrawCommand, RenderTarget};
use parking_lot::Mutex;

/// Collects draw commands from every partition's render task.
///
/// Commands from one tile arrive contiguously and in painter's order.
/// Commands from different partitions interleave arbitrarily.
#[derive(Debug, Default)]
pub struct DrawList {
    commands: Mutex<Vec<DrawCommand>>,
}

impl DrawList {
    /// Creates an empty list with room for `capacity` commands.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Number of commands collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    /// Whether nothing has been submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }

    /// Removes and returns every command, keeping the allocation.
    #[must_use]
    pub fn take(&self) -> Vec<DrawCommand> {
        let mut commands = self.commands.lock();
        let capacity = commands.capacity();
        std::mem::replace(&mut *commands, Vec::with_capacity(capacity))
    }

    /// Discards every command.
    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}

impl RenderTarget for DrawList {
    fn submit(&self, command: DrawCommand) {
        self.commands.lock().push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::{EntityId, Sprite, TradeState};
    use market_shared::Vec2;

    #[test]
    fn test_take_empties_list() {
        let list = DrawList::with_capacity(4);
        list.submit(DrawCommand {
            entity: EntityId::new(1),
            sprite: Sprite::Npc(TradeState::Lamb),
            position: Vec2::ZERO,
            frame: 2,
        });

        assert_eq!(list.len(), 1);
        let taken = list.take();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].frame, 2);
        assert!(list.is_empty());
    }
}
