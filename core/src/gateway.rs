use sapper_protocol::{Intent, RawCoord};

use crate::*;

/// What a dispatched intent did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Revealed(RevealOutcome),
    Marked(MarkOutcome),
    ScoreSaved { rank: usize },
    ScoreRemoved,
    LeaderboardPersisted,
    LeaderboardLoaded,
    Closed,
}

/// Entry point for front-ends: one intent in, one session call out.
///
/// Every failure comes back as an error value, malformed input included, so a
/// front-end can report it and keep reading.
#[derive(Clone)]
pub struct Gateway {
    session: Session,
}

impl Gateway {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Parses and dispatches a console line such as `c 3 4`.
    pub fn submit(&self, line: &str) -> Result<Reply> {
        let intent = line.parse::<Intent>().inspect_err(|err| {
            log::debug!("Rejected action {:?}: {}", line, err);
        })?;
        self.dispatch(intent)
    }

    /// Parses and dispatches a JSON intent such as `{"Flag":{"x":0,"y":1}}`.
    pub fn submit_json(&self, json: &str) -> Result<Reply> {
        let intent = Intent::from_json(json)?;
        self.dispatch(intent)
    }

    pub fn dispatch(&self, intent: Intent) -> Result<Reply> {
        log::debug!("Dispatching {:?}", intent);
        match intent {
            Intent::Click { x, y } => self
                .session
                .click_cell(board_coord(x), board_coord(y))
                .map(Reply::Revealed),
            Intent::Flag { x, y } => self
                .session
                .toggle_flag(board_coord(x), board_coord(y))
                .map(Reply::Marked),
            Intent::SaveScore { name } => self
                .session
                .save_score(&name)
                .map(|rank| Reply::ScoreSaved { rank }),
            Intent::RemoveScore { name } => self
                .session
                .remove_score(&name)
                .map(|()| Reply::ScoreRemoved),
            Intent::PersistLeaderboard => self
                .session
                .persist_leaderboard()
                .map(|()| Reply::LeaderboardPersisted),
            Intent::LoadLeaderboard => self
                .session
                .load_leaderboard()
                .map(|()| Reply::LeaderboardLoaded),
            Intent::Exit => self.session.close_game().map(|()| Reply::Closed),
        }
    }
}

/// Maps a typed coordinate onto the board axis.
///
/// Values no board can hold become `Coord::MAX`, which is never a valid index
/// since boards have at most `Coord::MAX` rows and columns, so the engine
/// treats them as an ordinary out-of-bounds click.
fn board_coord(raw: RawCoord) -> Coord {
    Coord::try_from(raw).unwrap_or(Coord::MAX)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    fn gateway() -> Gateway {
        let session = Session::with_leaderboard(
            Leaderboard::new(PathBuf::from("unused.json")),
            Duration::from_secs(3600),
        );
        session.init_with_grid(Grid::from_mine_coords(3, 3, &[(0, 0)]).unwrap());
        Gateway::new(session)
    }

    #[test]
    fn malformed_lines_are_invalid_actions() {
        let gateway = gateway();
        gateway.session().start_game().unwrap();

        for line in ["", "c 1", "c one 2", "f 1 2 3", "dance"] {
            assert!(
                matches!(gateway.submit(line), Err(GameError::InvalidAction(_))),
                "{line:?} should be rejected"
            );
        }
        assert_eq!(gateway.session().stage(), Some(Stage::Action));
    }

    #[test]
    fn clicks_outside_action_are_rejected() {
        let gateway = gateway();

        assert!(matches!(
            gateway.submit("c 1 1"),
            Err(GameError::InactiveStage(Stage::Launched))
        ));

        gateway.session().start_game().unwrap();
        assert_eq!(gateway.submit("e").unwrap(), Reply::Closed);
        assert!(matches!(
            gateway.submit("f 1 1"),
            Err(GameError::InactiveStage(Stage::Closed))
        ));
    }

    #[test]
    fn unreachable_coordinates_are_noops() {
        let gateway = gateway();
        gateway.session().start_game().unwrap();

        assert_eq!(
            gateway.submit("c -1 0").unwrap(),
            Reply::Revealed(RevealOutcome::NoChange)
        );
        assert_eq!(
            gateway.submit("f 0 100000").unwrap(),
            Reply::Marked(MarkOutcome::NoChange)
        );
    }

    #[test]
    fn routes_each_intent() {
        let gateway = gateway();
        gateway.session().start_game().unwrap();

        assert_eq!(
            gateway.submit("c 1 1").unwrap(),
            Reply::Revealed(RevealOutcome::Revealed)
        );
        assert_eq!(
            gateway.submit_json(r#"{"Flag":{"x":0,"y":0}}"#).unwrap(),
            Reply::Marked(MarkOutcome::Changed)
        );
        assert_eq!(
            gateway.submit("s alice").unwrap(),
            Reply::ScoreSaved { rank: 1 }
        );
        assert_eq!(gateway.submit("r alice").unwrap(), Reply::ScoreRemoved);
        assert!(matches!(
            gateway.submit("r alice"),
            Err(GameError::NotFound(_))
        ));
    }
}
