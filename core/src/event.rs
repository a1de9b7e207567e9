use futures_channel::mpsc::UnboundedSender;
use serde::{Deserialize, Serialize};

use crate::*;

/// Notification emitted by the engine after each operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Cells whose state changed. Empty when the action was ignored.
    FieldChanged(Vec<Cell>),
    StageChanged { old: Stage, new: Stage },
    /// Seconds elapsed since the first click.
    Tick(u32),
}

impl GameEvent {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::FieldChanged(cells) if cells.is_empty())
    }
}

/// Receiver of [`GameEvent`]s.
///
/// Listeners are invoked one event at a time, in the order the operations
/// happened, after the session lock has been released. They may query the
/// session or act on it; events caused by such actions are delivered once the
/// current one returns.
pub trait EventListener: Send {
    fn on_event(&mut self, event: &GameEvent);
}

impl<F> EventListener for F
where
    F: FnMut(&GameEvent) + Send,
{
    fn on_event(&mut self, event: &GameEvent) {
        self(event)
    }
}

impl EventListener for UnboundedSender<GameEvent> {
    fn on_event(&mut self, event: &GameEvent) {
        if self.unbounded_send(event.clone()).is_err() {
            log::trace!("Event receiver dropped, discarding {:?}", event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_change_is_noop() {
        assert!(GameEvent::FieldChanged(Vec::new()).is_noop());
        assert!(!GameEvent::FieldChanged(vec![Cell::new((0, 0))]).is_noop());
        assert!(!GameEvent::Tick(1).is_noop());
    }

    #[test]
    fn channel_listener_forwards_events() {
        let (mut tx, mut rx) = futures_channel::mpsc::unbounded();

        tx.on_event(&GameEvent::Tick(3));
        tx.on_event(&GameEvent::StageChanged {
            old: Stage::Action,
            new: Stage::Closed,
        });

        assert_eq!(rx.try_next().unwrap(), Some(GameEvent::Tick(3)));
        assert_eq!(
            rx.try_next().unwrap(),
            Some(GameEvent::StageChanged {
                old: Stage::Action,
                new: Stage::Closed
            })
        );
    }
}
