//! Session driver.
//!
//! Every client operation is one atomic read-modify-write of a single room:
//! load it from the [`Directory`], apply the change, save it back, then hand
//! the resulting notifications to the [`EventFanout`]. Operations on the same
//! room are serialized by a per-room lock.
//!
//! When the turn passes to a computer player, an AI chain task is spawned
//! that plays one bot step at a time, pausing between steps, until a human is
//! up again or the game ends.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use monopoly_core::{
    Bot, DiceRoller, GameAction, GameError, GameEvent, GamePhase, GameState, PropertyId,
    RandomDice,
};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::directory::{Directory, DirectoryError};
use crate::fanout::{EventFanout, Notification};
use crate::room::{Room, RoomError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<GameError> for SessionError {
    fn from(err: GameError) -> Self {
        SessionError::Room(RoomError::Game(err))
    }
}

/// Tunables for the session driver
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause before each AI step
    pub ai_turn_delay: Duration,
    /// Seats per room
    pub max_room_players: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ai_turn_delay: Duration::from_millis(1500),
            max_room_players: 8,
        }
    }
}

type SharedDice = Arc<Mutex<Box<dyn DiceRoller + Send>>>;

/// Drives rooms and games on behalf of connected clients.
#[derive(Clone)]
pub struct SessionDriver {
    directory: Arc<dyn Directory>,
    fanout: Arc<dyn EventFanout>,
    dice: SharedDice,
    config: SessionConfig,
    locks: Arc<DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
    ai_tasks: Arc<DashMap<Uuid, JoinHandle<()>>>,
}

impl SessionDriver {
    pub fn new(
        directory: Arc<dyn Directory>,
        fanout: Arc<dyn EventFanout>,
        config: SessionConfig,
    ) -> Self {
        Self::with_dice(directory, fanout, config, RandomDice::new())
    }

    pub fn with_dice(
        directory: Arc<dyn Directory>,
        fanout: Arc<dyn EventFanout>,
        config: SessionConfig,
        dice: impl DiceRoller + Send + 'static,
    ) -> Self {
        Self {
            directory,
            fanout,
            dice: Arc::new(Mutex::new(Box::new(dice))),
            config,
            locks: Arc::new(DashMap::new()),
            ai_tasks: Arc::new(DashMap::new()),
        }
    }

    // ==================== Lobby ====================

    pub fn create_room(&self, host_id: &str, host_name: &str) -> Result<Room, SessionError> {
        let room = Room::new(
            Uuid::new_v4(),
            host_id,
            host_name,
            self.config.max_room_players,
        );
        self.directory.save(&room)?;
        info!(room = %room.id, host = host_id, "Room created");
        Ok(room)
    }

    pub async fn join_room(
        &self,
        room_id: Uuid,
        player_id: &str,
        name: &str,
    ) -> Result<Room, SessionError> {
        let _guard = self.lock_room(room_id).await;
        let (room, ()) = self.update(room_id, |room| room.add_player(player_id, name).map(|_| ()))?;
        info!(room = %room_id, player = player_id, "Player joined");
        Ok(room)
    }

    pub async fn add_ai_player(&self, room_id: Uuid, requester: &str) -> Result<Room, SessionError> {
        let _guard = self.lock_room(room_id).await;
        let (room, ai_id) =
            self.update(room_id, |room| room.add_ai_player(requester).map(|p| p.id.clone()))?;
        info!(room = %room_id, player = %ai_id, "AI player added");
        Ok(room)
    }

    /// Take a player out of a room. Returns `None` when the room was closed
    /// because no human is left in it.
    ///
    /// Leaving a running game forfeits it: the player goes bankrupt to the
    /// bank and, if it was their turn, the next player is up.
    pub async fn leave_room(
        &self,
        room_id: Uuid,
        player_id: &str,
    ) -> Result<Option<Room>, SessionError> {
        let _guard = self.lock_room(room_id).await;
        let mut room = self.load(room_id)?;

        if room.remove_player(player_id)? {
            self.directory.delete(room_id)?;
            self.cancel_ai(room_id);
            self.locks.remove(&room_id);
            info!(room = %room_id, "Room closed");
            return Ok(None);
        }

        let events = room
            .game_state
            .as_mut()
            .map(|game| game.forfeit(player_id))
            .unwrap_or_default();

        self.directory.save(&room)?;
        info!(room = %room_id, player = player_id, "Player left");

        if let Some(game) = room.game_state.as_ref().filter(|_| !events.is_empty()) {
            debug!(room = %room_id, player = player_id, "Player forfeited");
            for notification in Notification::from_events(&events, game) {
                self.fanout.publish(room_id, notification);
            }
            if events.iter().any(|e| matches!(e, GameEvent::TurnEnded { .. })) {
                self.schedule_ai(room_id, game);
            }
        }
        Ok(Some(room))
    }

    pub async fn start_game(&self, room_id: Uuid, requester: &str) -> Result<GameState, SessionError> {
        let game = {
            let _guard = self.lock_room(room_id).await;
            let (_, game) = self.update(room_id, |room| room.start_game(requester).cloned())?;
            info!(room = %room_id, players = game.players.len(), "Game started");
            self.fanout.publish(
                room_id,
                Notification::GameStarted {
                    game_state: game.clone(),
                },
            );
            game
        };

        self.schedule_ai(room_id, &game);
        Ok(game)
    }

    pub fn list_rooms(&self) -> Result<Vec<Room>, SessionError> {
        Ok(self.directory.list()?)
    }

    pub fn valid_actions(&self, room_id: Uuid, player: &str) -> Result<Vec<GameAction>, SessionError> {
        let room = self.load(room_id)?;
        Ok(room.game()?.valid_actions(player))
    }

    // ==================== Game actions ====================

    pub async fn roll_dice(&self, room_id: Uuid, player: &str) -> Result<GameState, SessionError> {
        self.play(room_id, player, GameAction::RollDice).await
    }

    pub async fn buy_property(
        &self,
        room_id: Uuid,
        player: &str,
        property: PropertyId,
    ) -> Result<GameState, SessionError> {
        self.play(room_id, player, GameAction::BuyProperty(property))
            .await
    }

    pub async fn end_turn(&self, room_id: Uuid, player: &str) -> Result<GameState, SessionError> {
        self.play(room_id, player, GameAction::EndTurn).await
    }

    async fn play(
        &self,
        room_id: Uuid,
        player: &str,
        action: GameAction,
    ) -> Result<GameState, SessionError> {
        let game = {
            let _guard = self.lock_room(room_id).await;
            let room = self.load(room_id)?;
            self.apply(room, |game, dice| game.apply_action(player, action, dice))?
        };

        self.schedule_ai(room_id, &game);
        Ok(game)
    }

    // ==================== AI players ====================

    /// Play the current AI player's whole turn at once. Returns `None` when
    /// a human is up or the game is over.
    pub async fn ai_turn(&self, room_id: Uuid) -> Result<Option<GameState>, SessionError> {
        let game = {
            let _guard = self.lock_room(room_id).await;
            let room = self.load(room_id)?;
            let bot = match room.game_state.as_ref().and_then(Bot::for_current_player) {
                Some(bot) => bot,
                None => return Ok(None),
            };
            debug!(room = %room_id, player = %bot.player_id, "AI turn");
            self.apply(room, |game, dice| bot.take_turn(game, dice))?
        };

        self.schedule_ai(room_id, &game);
        Ok(Some(game))
    }

    /// Let the current AI player take a single step (roll, buy or end turn).
    /// Returns `None` when there is nothing for a bot to do, including when
    /// the room no longer exists.
    pub async fn ai_step(&self, room_id: Uuid) -> Result<Option<GameState>, SessionError> {
        let _guard = self.lock_room(room_id).await;
        let room = match self.directory.load(room_id)? {
            Some(room) => room,
            None => return Ok(None),
        };

        let game = match room.game_state.as_ref() {
            Some(game) => game,
            None => return Ok(None),
        };
        let (bot, action) = match Bot::for_current_player(game)
            .and_then(|bot| bot.choose_action(game).map(|action| (bot, action)))
        {
            Some(step) => step,
            None => return Ok(None),
        };

        debug!(room = %room_id, player = %bot.player_id, ?action, "AI step");
        let game = self.apply(room, |game, dice| {
            Ok(bot.step(game, dice)?.unwrap_or_default())
        })?;
        Ok(Some(game))
    }

    async fn run_ai_chain(self, room_id: Uuid) {
        loop {
            tokio::time::sleep(self.config.ai_turn_delay).await;
            match self.ai_step(room_id).await {
                Ok(Some(game)) if Bot::for_current_player(&game).is_some() => {}
                Ok(_) => break,
                Err(e) => {
                    warn!(room = %room_id, "AI step failed: {}", e);
                    break;
                }
            }
        }
        debug!(room = %room_id, "AI chain finished");
    }

    /// Start an AI chain for the room if a computer player is up.
    fn schedule_ai(&self, room_id: Uuid, game: &GameState) {
        if Bot::for_current_player(game).is_none() {
            return;
        }

        let handle = tokio::spawn(self.clone().run_ai_chain(room_id));
        if let Some(previous) = self.ai_tasks.insert(room_id, handle) {
            previous.abort();
        }
    }

    fn cancel_ai(&self, room_id: Uuid) {
        if let Some((_, handle)) = self.ai_tasks.remove(&room_id) {
            handle.abort();
        }
    }

    // ==================== Plumbing ====================

    async fn lock_room(&self, room_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(room_id).or_default().value().clone();
        lock.lock_owned().await
    }

    fn load(&self, room_id: Uuid) -> Result<Room, SessionError> {
        Ok(self
            .directory
            .load(room_id)?
            .ok_or(RoomError::RoomNotFound)?)
    }

    /// Load, change and save a room. Caller holds the room lock.
    fn update<T>(
        &self,
        room_id: Uuid,
        change: impl FnOnce(&mut Room) -> Result<T, RoomError>,
    ) -> Result<(Room, T), SessionError> {
        let mut room = self.load(room_id)?;
        let out = change(&mut room)?;
        self.directory.save(&room)?;
        Ok((room, out))
    }

    /// Run one engine step on a loaded room, save it and publish what
    /// happened. A rejected step saves and publishes nothing.
    fn apply(
        &self,
        mut room: Room,
        step: impl FnOnce(&mut GameState, &mut dyn DiceRoller) -> Result<Vec<GameEvent>, GameError>,
    ) -> Result<GameState, SessionError> {
        let room_id = room.id;

        let events = {
            let mut dice = self
                .dice
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let game = room.game_mut()?;
            let mut events = step(&mut *game, &mut **dice)?;
            events.extend(end_bankrupt_turn(game, &mut **dice)?);
            events
        };

        self.directory.save(&room)?;
        let game = room.game_state.ok_or(RoomError::GameNotStarted)?;

        debug!(room = %room_id, events = events.len(), "Applied game step");
        if let Some(winner) = &game.winner {
            info!(room = %room_id, winner = %winner, "Game over");
        }

        for notification in Notification::from_events(&events, &game) {
            self.fanout.publish(room_id, notification);
        }
        Ok(game)
    }
}

/// A player who went bankrupt on their own roll has nothing left to
/// decide, so their turn is handed on straight away.
fn end_bankrupt_turn(
    game: &mut GameState,
    dice: &mut dyn DiceRoller,
) -> Result<Vec<GameEvent>, GameError> {
    let bankrupt_id = match game.current_player() {
        Some(p) if p.bankrupt && game.game_phase == GamePhase::EndTurn => p.id.clone(),
        _ => return Ok(Vec::new()),
    };
    game.apply_action(&bankrupt_id, GameAction::EndTurn, dice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::fanout::RecordingFanout;
    use monopoly_core::LoadedDice;
    use pretty_assertions::assert_eq;

    struct Harness {
        driver: SessionDriver,
        directory: Arc<InMemoryDirectory>,
        fanout: Arc<RecordingFanout>,
    }

    impl Harness {
        fn new(rolls: &[(u8, u8)], ai_turn_delay: Duration) -> Self {
            let directory = Arc::new(InMemoryDirectory::new());
            let fanout = Arc::new(RecordingFanout::default());
            let config = SessionConfig {
                ai_turn_delay,
                max_room_players: 8,
            };
            let driver = SessionDriver::with_dice(
                directory.clone(),
                fanout.clone(),
                config,
                LoadedDice::new(rolls.iter().copied()),
            );
            Self {
                driver,
                directory,
                fanout,
            }
        }

        /// Started game with Alice hosting and the given extra seats
        async fn started(&self, humans: &[&str], ais: usize) -> Uuid {
            let room = self.driver.create_room("alice", "Alice").unwrap();
            for name in humans {
                self.driver
                    .join_room(room.id, &name.to_lowercase(), name)
                    .await
                    .unwrap();
            }
            for _ in 0..ais {
                self.driver.add_ai_player(room.id, "alice").await.unwrap();
            }
            self.driver.start_game(room.id, "alice").await.unwrap();
            self.fanout.take();
            room.id
        }

        fn stored_game(&self, room_id: Uuid) -> GameState {
            self.directory
                .load(room_id)
                .unwrap()
                .and_then(|room| room.game_state)
                .unwrap()
        }

        fn edit_game(&self, room_id: Uuid, edit: impl FnOnce(&mut GameState)) {
            let mut room = self.directory.load(room_id).unwrap().unwrap();
            edit(room.game_state.as_mut().unwrap());
            self.directory.save(&room).unwrap();
        }

        fn notifications(&self) -> Vec<Notification> {
            self.fanout.take().into_iter().map(|(_, n)| n).collect()
        }

        async fn settle(&self, room_id: Uuid) {
            if let Some((_, handle)) = self.driver.ai_tasks.remove(&room_id) {
                let _ = handle.await;
            }
        }
    }

    fn tail(game: &GameState, n: usize) -> Vec<String> {
        game.action_log[game.action_log.len() - n..].to_vec()
    }

    #[tokio::test]
    async fn test_lobby_rules() {
        let h = Harness::new(&[], Duration::ZERO);
        let id = h.driver.create_room("alice", "Alice").unwrap().id;

        assert!(matches!(
            h.driver.start_game(id, "alice").await,
            Err(SessionError::Room(RoomError::NotEnoughPlayers))
        ));

        h.driver.join_room(id, "bob", "Bob").await.unwrap();
        assert!(matches!(
            h.driver.join_room(id, "bob", "Bob").await,
            Err(SessionError::Room(RoomError::DuplicatePlayer))
        ));
        assert!(matches!(
            h.driver.add_ai_player(id, "bob").await,
            Err(SessionError::Room(RoomError::NotHost))
        ));
        assert!(matches!(
            h.driver.join_room(Uuid::new_v4(), "carol", "Carol").await,
            Err(SessionError::Room(RoomError::RoomNotFound))
        ));

        let room = h.driver.add_ai_player(id, "alice").await.unwrap();
        assert_eq!(room.players.len(), 3);

        let game = h.driver.start_game(id, "alice").await.unwrap();
        assert_eq!(game.action_log, vec!["Game started".to_string()]);
        assert_eq!(h.stored_game(id), game);

        let published = h.notifications();
        assert_eq!(published, vec![Notification::GameStarted { game_state: game }]);
    }

    #[tokio::test]
    async fn test_roll_is_persisted_and_published() {
        let h = Harness::new(&[(1, 2)], Duration::ZERO);
        let id = h.started(&["Bob"], 0).await;

        let game = h.driver.roll_dice(id, "alice").await.unwrap();

        assert_eq!(game.game_phase, GamePhase::PropertyDecision);
        assert_eq!(h.stored_game(id), game);
        assert_eq!(
            h.notifications(),
            vec![
                Notification::DiceRolled {
                    player_id: "alice".into(),
                    dice: [1, 2],
                },
                Notification::PlayerMoved {
                    player_id: "alice".into(),
                    position: 3,
                },
                Notification::GameStateUpdated { game_state: game },
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_action_changes_nothing() {
        let h = Harness::new(&[], Duration::ZERO);
        let id = h.started(&["Bob"], 0).await;
        let before = h.stored_game(id);

        let result = h.driver.roll_dice(id, "bob").await;

        assert!(matches!(
            result,
            Err(SessionError::Room(RoomError::Game(GameError::NotYourTurn)))
        ));
        assert_eq!(h.stored_game(id), before);
        assert!(h.notifications().is_empty());

        assert!(matches!(
            h.driver.buy_property(id, "alice", 3).await,
            Err(SessionError::Room(RoomError::Game(GameError::InvalidPhase)))
        ));
    }

    #[tokio::test]
    async fn test_buy_and_end_turn() {
        let h = Harness::new(&[(1, 2)], Duration::ZERO);
        let id = h.started(&["Bob"], 0).await;

        h.driver.roll_dice(id, "alice").await.unwrap();
        h.fanout.take();

        let game = h.driver.buy_property(id, "alice", 3).await.unwrap();
        assert_eq!(game.players[0].money, 1440);
        assert_eq!(
            h.notifications()[0],
            Notification::PropertyPurchased {
                player_id: "alice".into(),
                property_id: 3,
                price: 60,
            }
        );

        let game = h.driver.end_turn(id, "alice").await.unwrap();
        assert_eq!(game.current_player().unwrap().id, "bob");
        assert_eq!(
            h.notifications()[0],
            Notification::TurnEnded {
                next_player_id: "bob".into()
            }
        );
        assert!(h.driver.ai_tasks.is_empty());
    }

    #[tokio::test]
    async fn test_ai_chain_plays_until_human_is_up() {
        let h = Harness::new(&[(3, 4), (2, 4)], Duration::ZERO);
        let id = h.started(&[], 1).await;

        h.driver.roll_dice(id, "alice").await.unwrap();
        h.driver.end_turn(id, "alice").await.unwrap();
        h.settle(id).await;

        let game = h.stored_game(id);
        assert_eq!(game.current_player().unwrap().id, "alice");
        assert_eq!(game.game_phase, GamePhase::Waiting);
        assert_eq!(
            tail(&game, 3),
            vec![
                "AI Player 2 rolled 2+4 and moved to position 6 and landed on Oriental Avenue",
                "AI Player 2 bought Oriental Avenue for $100",
                "AI Player 2 ended their turn. Alice's turn now.",
            ]
        );
        assert!(game.players[1].owns(6));

        let published = h.notifications();
        assert!(published.contains(&Notification::TurnEnded {
            next_player_id: "alice".into()
        }));
    }

    #[tokio::test]
    async fn test_ai_turn_on_demand() {
        let h = Harness::new(&[(3, 4), (2, 4)], Duration::from_secs(60));
        let id = h.started(&[], 1).await;

        assert_eq!(h.driver.ai_turn(id).await.unwrap(), None);

        h.driver.roll_dice(id, "alice").await.unwrap();
        h.driver.end_turn(id, "alice").await.unwrap();
        assert_eq!(h.driver.ai_tasks.len(), 1);

        let game = h.driver.ai_turn(id).await.unwrap().unwrap();
        assert_eq!(game.current_player().unwrap().id, "alice");
        assert!(game.players[1].owns(6));
        h.driver.cancel_ai(id);
    }

    #[tokio::test]
    async fn test_closing_room_cancels_ai_chain() {
        let h = Harness::new(&[(3, 4)], Duration::from_secs(60));
        let id = h.started(&[], 1).await;

        h.driver.roll_dice(id, "alice").await.unwrap();
        h.driver.end_turn(id, "alice").await.unwrap();
        assert_eq!(h.driver.ai_tasks.len(), 1);

        assert_eq!(h.driver.leave_room(id, "alice").await.unwrap(), None);

        assert!(h.driver.ai_tasks.is_empty());
        assert!(h.directory.load(id).unwrap().is_none());
        assert_eq!(h.driver.ai_step(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bankrupt_player_turn_passes_on() {
        let h = Harness::new(&[(1, 3)], Duration::ZERO);
        let id = h.started(&["Bob", "Carol"], 0).await;
        h.edit_game(id, |game| game.players[0].money = 100);

        let game = h.driver.roll_dice(id, "alice").await.unwrap();

        assert!(game.players[0].bankrupt);
        assert_eq!(game.current_player().unwrap().id, "bob");
        assert_eq!(game.game_phase, GamePhase::Waiting);
        assert_eq!(
            tail(&game, 2),
            vec![
                "Alice rolled 1+3 and moved to position 4 and landed on Income Tax",
                "Alice ended their turn. Bob's turn now.",
            ]
        );
        assert!(h.notifications().contains(&Notification::TurnEnded {
            next_player_id: "bob".into()
        }));
    }

    #[tokio::test]
    async fn test_leaving_on_your_turn_passes_it_on() {
        let h = Harness::new(&[], Duration::ZERO);
        let id = h.started(&["Bob", "Carol"], 0).await;

        let room = h.driver.leave_room(id, "alice").await.unwrap().unwrap();
        assert_eq!(room.host, "bob");

        let game = h.stored_game(id);
        assert!(game.players[0].bankrupt);
        assert_eq!(game.current_player().unwrap().id, "bob");
        assert_eq!(game.game_phase, GamePhase::Waiting);
        assert_eq!(
            tail(&game, 3),
            vec![
                "Alice left the game",
                "Alice went bankrupt to the bank",
                "Alice ended their turn. Bob's turn now.",
            ]
        );
        assert!(h.notifications().contains(&Notification::TurnEnded {
            next_player_id: "bob".into()
        }));

        // Bob can carry on
        assert!(h.driver.roll_dice(id, "bob").await.is_ok());
    }

    #[tokio::test]
    async fn test_leaving_hands_ai_its_turn() {
        let h = Harness::new(&[(2, 4)], Duration::ZERO);
        let id = h.started(&["Bob"], 1).await;
        h.edit_game(id, |game| game.current_player_index = 1);

        h.driver.leave_room(id, "bob").await.unwrap().unwrap();
        h.settle(id).await;

        let game = h.stored_game(id);
        assert_eq!(game.current_player().unwrap().id, "alice");
        assert!(game.players[2].owns(6));
    }

    #[tokio::test]
    async fn test_leaving_two_player_game_ends_it() {
        let h = Harness::new(&[], Duration::ZERO);
        let id = h.started(&["Bob"], 0).await;

        h.driver.leave_room(id, "bob").await.unwrap().unwrap();

        let game = h.stored_game(id);
        assert_eq!(game.winner.as_deref(), Some("alice"));
        assert_eq!(
            h.notifications().last(),
            Some(&Notification::GameEnded {
                winner_id: "alice".into()
            })
        );
    }

    #[tokio::test]
    async fn test_game_end_is_announced() {
        let h = Harness::new(&[(3, 3)], Duration::ZERO);
        let id = h.started(&["Bob"], 0).await;
        h.edit_game(id, |game| {
            for property in game.properties.iter_mut().filter(|p| p.id == 37 || p.id == 39) {
                property.owner = Some("bob".into());
            }
            game.players[1].properties = vec![37, 39];
            game.players[0].money = 40;
            game.players[0].position = 33;
        });

        let game = h.driver.roll_dice(id, "alice").await.unwrap();

        assert_eq!(game.winner.as_deref(), Some("bob"));
        let published = h.notifications();
        assert_eq!(
            published.last(),
            Some(&Notification::GameEnded {
                winner_id: "bob".into()
            })
        );
        assert!(matches!(
            h.driver.end_turn(id, "alice").await,
            Err(SessionError::Room(RoomError::Game(GameError::GameOver)))
        ));
        assert_eq!(
            h.directory.load(id).unwrap().unwrap().status(),
            crate::protocol::RoomStatus::Finished
        );
    }
}
