use log::{debug, error, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::time::SystemTime;
use uuid::Uuid;

use super::history::MoveHistory;
use super::move_engine;
use super::persistence::Storage;
use super::score_tracker::ScoreTracker;
use super::settings::Settings;
use super::stats_manager::StatsManager;
use crate::destroyable::Destroyable;
use crate::events::{EventEmitter, EventObserver, Unsubscriber};
use crate::model::{
    BoardSnapshot, Direction, GameBoard, GameEngineCommand, GameEngineEvent, GameError,
    GameStats, MoveOutcome, TileId, TimerState,
};

const STARTING_TILES: usize = 2;

/// A move whose slide phase has run and which is waiting for the renderer
/// to finish every tile transition before merging.
#[derive(Debug)]
struct PendingMove {
    outcome: MoveOutcome,
    outstanding: HashSet<TileId>,
}

/// One game session. Owns the board and everything derived from it; the
/// caller owns the session, so independent games never share state.
pub struct GameEngine {
    board: GameBoard,
    score: ScoreTracker,
    history: MoveHistory,
    stats: StatsManager,
    settings: Settings,
    storage: Box<dyn Storage>,
    rng: StdRng,
    seed: u64,
    debug_mode: bool,
    pending: Option<PendingMove>,
    is_over: bool,
    moves: u32,
    timer_state: TimerState,
    current_playthrough_id: Uuid,
    subscription: Option<Unsubscriber<GameEngineCommand>>,
    game_engine_event_emitter: EventEmitter<GameEngineEvent>,
}

impl Destroyable for GameEngine {
    fn destroy(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl GameEngine {
    /// Builds a session with an empty board. Call [`GameEngine::start`] or
    /// [`GameEngine::new_game`] before playing.
    pub fn new(
        settings: Settings,
        mut storage: Box<dyn Storage>,
        game_engine_event_emitter: EventEmitter<GameEngineEvent>,
        seed: Option<u64>,
    ) -> Self {
        let seed = seed
            .or_else(Settings::seed_from_env)
            .unwrap_or_else(|| rand::rng().random());
        info!(target: "game_engine", "New session; seed: {}", seed);

        Self {
            board: GameBoard::new(),
            score: ScoreTracker::load(settings.score_policy, storage.as_mut()),
            history: MoveHistory::new(settings.history_depth),
            stats: StatsManager::load(storage.as_ref()),
            settings,
            storage,
            rng: StdRng::seed_from_u64(seed),
            seed,
            debug_mode: Settings::is_debug_mode(),
            pending: None,
            is_over: false,
            moves: 0,
            timer_state: TimerState::default(),
            current_playthrough_id: Uuid::new_v4(),
            subscription: None,
            game_engine_event_emitter,
        }
    }

    /// Shared session driven by commands from `game_engine_command_observer`.
    pub fn new_shared(
        settings: Settings,
        storage: Box<dyn Storage>,
        game_engine_event_emitter: EventEmitter<GameEngineEvent>,
        game_engine_command_observer: EventObserver<GameEngineCommand>,
        seed: Option<u64>,
    ) -> Rc<RefCell<Self>> {
        let engine = Rc::new(RefCell::new(Self::new(
            settings,
            storage,
            game_engine_event_emitter,
            seed,
        )));
        GameEngine::wire_subscription(engine.clone(), game_engine_command_observer);
        engine
    }

    fn wire_subscription(
        game_engine: Rc<RefCell<Self>>,
        game_engine_command_observer: EventObserver<GameEngineCommand>,
    ) {
        let handler = Rc::downgrade(&game_engine);
        // commands emitted by listeners while the engine is busy
        let deferred: Rc<RefCell<VecDeque<GameEngineCommand>>> = Rc::default();
        let subscription = game_engine_command_observer.subscribe(move |command| {
            let Some(engine) = handler.upgrade() else {
                return;
            };
            let Ok(mut guard) = engine.try_borrow_mut() else {
                trace!(target: "game_engine", "Engine busy; deferring {:?}", command);
                deferred.borrow_mut().push_back(command.clone());
                return;
            };
            guard.handle_command(command.clone());
            loop {
                let next = deferred.borrow_mut().pop_front();
                match next {
                    Some(command) => guard.handle_command(command),
                    None => break,
                }
            }
        });
        game_engine.borrow_mut().subscription = Some(subscription);
    }

    pub fn board(&self) -> &GameBoard {
        &self.board
    }

    pub fn score(&self) -> u64 {
        self.score.score()
    }

    pub fn highest_score(&self) -> u64 {
        self.score.highest()
    }

    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    pub fn stats(&self) -> &StatsManager {
        &self.stats
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn into_storage(mut self) -> Box<dyn Storage> {
        self.destroy();
        self.storage
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn is_game_over(&self) -> bool {
        self.is_over
    }

    pub fn is_move_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Input is suspended while a move is in flight and after the game is lost.
    pub fn is_input_suspended(&self) -> bool {
        self.is_move_in_flight() || self.is_over
    }

    pub fn can_move(&self, direction: Direction) -> bool {
        !self.is_input_suspended() && move_engine::can_move_in_direction(&self.board, direction)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::capture(&self.board, self.score.score())
    }

    /// Resumes the persisted game, or starts a new one when there is none.
    /// Corrupt records are discarded.
    pub fn restore(&mut self) -> Result<(), GameError> {
        match MoveHistory::load(self.storage.as_ref(), self.settings.history_depth) {
            Ok(Some(history)) => {
                let snapshots = history.snapshots().cloned().collect();
                match self.load_state(snapshots) {
                    Ok(()) => return Ok(()),
                    Err(err) => self.discard_persisted_game(&err),
                }
            }
            Ok(None) => (),
            Err(err) => self.discard_persisted_game(&err),
        }
        self.new_game()
    }

    fn discard_persisted_game(&mut self, err: &GameError) {
        warn!(target: "game_engine", "Discarding saved game: {}", err);
        self.history.clear();
        if let Err(err) = self.history.save(self.storage.as_mut()) {
            warn!(target: "game_engine", "Could not clear saved game: {}", err);
        }
    }

    pub fn new_game(&mut self) -> Result<(), GameError> {
        self.board.clear();
        self.pending = None;
        self.is_over = false;
        self.moves = 0;
        self.timer_state = TimerState::default();
        self.current_playthrough_id = Uuid::new_v4();
        self.game_engine_event_emitter
            .emit(GameEngineEvent::BoardReset(self.board.clone()));

        for _ in 0..STARTING_TILES {
            let cell = self
                .board
                .spawn_random_tile(&mut self.rng, self.settings.spawn_four_probability)?;
            self.game_engine_event_emitter
                .emit(GameEngineEvent::TileSpawned(cell));
        }
        self.score.reset(&self.board);
        self.history.clear();
        self.history.push(self.snapshot());
        self.persist();

        debug!(target: "game_engine", "New game: {:?}", self.board);
        self.emit_score_changed(0);
        self.sync_history();
        self.game_engine_event_emitter
            .emit(GameEngineEvent::InputSuspended(false));
        Ok(())
    }

    /// Replaces the session state with `snapshots` (most recent first).
    pub fn load_state(&mut self, snapshots: Vec<BoardSnapshot>) -> Result<(), GameError> {
        let current = snapshots.first().ok_or_else(|| {
            GameError::CorruptPersistedState("no snapshot to load".to_string())
        })?;
        let board = current.to_board()?;
        let mut history = MoveHistory::new(self.settings.history_depth);
        for snapshot in snapshots.iter().rev() {
            snapshot.to_board()?;
            history.push(snapshot.clone());
        }

        self.board = board;
        self.score.set_score(current.score);
        self.history = history;
        self.pending = None;
        self.moves = 0;
        self.timer_state = TimerState::default();
        self.current_playthrough_id = Uuid::new_v4();
        self.is_over = move_engine::is_game_over(&self.board);
        trace!(target: "game_engine", "Loaded state {:?}", self.board);

        self.game_engine_event_emitter
            .emit(GameEngineEvent::BoardReset(self.board.clone()));
        self.sync_score(0);
        self.sync_history();
        self.game_engine_event_emitter
            .emit(GameEngineEvent::InputSuspended(self.is_over));
        Ok(())
    }

    /// Slide phase of a move. Rejects the direction without side effects when
    /// it is illegal or another move is still in flight. Unless the session is
    /// animated the move settles before this returns.
    pub fn begin_move(&mut self, direction: Direction) -> Result<MoveOutcome, GameError> {
        if self.pending.is_some() {
            return Err(GameError::MoveInFlight);
        }
        if self.is_over {
            return Err(GameError::GameOver);
        }
        if !move_engine::can_move_in_direction(&self.board, direction) {
            return Err(GameError::IllegalMove(direction));
        }

        let mut outcome = MoveOutcome::new(direction);
        outcome.slides = move_engine::slide_tiles(&mut self.board, direction);
        let outstanding = outcome.slides.iter().map(|slide| slide.tile).collect();

        self.pending = Some(PendingMove {
            outcome: outcome.clone(),
            outstanding,
        });
        self.game_engine_event_emitter
            .emit(GameEngineEvent::InputSuspended(true));
        self.game_engine_event_emitter
            .emit(GameEngineEvent::TilesSlid(outcome.clone()));

        if self.settings.animated {
            Ok(outcome)
        } else {
            self.settle()
        }
    }

    /// The renderer finished moving `tile`. Settles the move once no
    /// transition is outstanding.
    pub fn transition_ended(&mut self, tile: TileId) -> Result<Option<MoveOutcome>, GameError> {
        let pending = self.pending.as_mut().ok_or(GameError::NoMoveInFlight)?;
        pending.outstanding.remove(&tile);
        if pending.outstanding.is_empty() {
            self.settle().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Join point of a move: merge, score, spawn, loss check, snapshot,
    /// persist. Input is re-enabled afterwards unless the game is lost.
    pub fn settle(&mut self) -> Result<MoveOutcome, GameError> {
        let PendingMove { mut outcome, .. } = self.pending.take().ok_or(GameError::NoMoveInFlight)?;

        outcome.merges = move_engine::merge_tiles(&mut self.board);
        outcome.score_delta = move_engine::merge_score(&outcome.merges);
        if !outcome.merges.is_empty() {
            self.game_engine_event_emitter
                .emit(GameEngineEvent::TilesMerged(outcome.merges.clone()));
        }

        let spawned = match self
            .board
            .spawn_random_tile(&mut self.rng, self.settings.spawn_four_probability)
        {
            Ok(cell) => cell,
            Err(err) => {
                error!(target: "game_engine", "Spawn after a legal move failed: {}", err);
                return Err(err);
            }
        };
        self.game_engine_event_emitter
            .emit(GameEngineEvent::TileSpawned(spawned));

        self.moves += 1;
        self.score.apply(outcome.score_delta, &self.board);
        self.sync_score(outcome.score_delta);
        if self.debug_mode {
            debug!(
                target: "game_engine",
                "score {} board sum {} {:?}",
                self.score.score(),
                self.board.tile_sum(),
                self.board
            );
        }

        self.history.push(self.snapshot());
        self.is_over = move_engine::is_game_over(&self.board);
        if self.is_over {
            self.finish_game();
        }
        self.persist();
        self.sync_history();

        if !self.is_over {
            self.game_engine_event_emitter
                .emit(GameEngineEvent::InputSuspended(false));
        }
        Ok(outcome)
    }

    /// Slide and settle in one call, without waiting on the renderer.
    pub fn apply_move(&mut self, direction: Direction) -> Result<MoveOutcome, GameError> {
        let outcome = self.begin_move(direction)?;
        if self.pending.is_some() {
            self.settle()
        } else {
            Ok(outcome)
        }
    }

    pub fn undo(&mut self) -> Result<(), GameError> {
        if self.pending.is_some() {
            return Err(GameError::MoveInFlight);
        }
        let snapshot = self.history.undo()?;
        self.board = snapshot.to_board()?;
        self.score.set_score(snapshot.score);
        self.persist();

        debug!(target: "game_engine", "Undo; score {}", snapshot.score);
        self.game_engine_event_emitter
            .emit(GameEngineEvent::BoardReset(self.board.clone()));
        self.sync_score(0);
        self.sync_history();
        Ok(())
    }

    pub fn handle_command(&mut self, command: GameEngineCommand) {
        trace!(target: "game_engine", "Handling command: {:?}", command);
        let result = match command {
            GameEngineCommand::Move(direction) => {
                if self.is_input_suspended() {
                    debug!(target: "game_engine", "Input suspended; dropping move {}", direction);
                    return;
                }
                self.begin_move(direction).map(|_| ())
            }
            GameEngineCommand::TransitionEnded(tile) => self.transition_ended(tile).map(|_| ()),
            GameEngineCommand::Settle => self.settle().map(|_| ()),
            GameEngineCommand::Undo => self.undo(),
            GameEngineCommand::NewGame => self.new_game(),
            GameEngineCommand::Restore => self.restore(),
            GameEngineCommand::LoadState(snapshots) => self.load_state(snapshots),
        };
        match result {
            Ok(()) => (),
            Err(
                err @ (GameError::IllegalMove(_)
                | GameError::NotAvailable
                | GameError::NoMoveInFlight),
            ) => {
                debug!(target: "game_engine", "Command ignored: {}", err);
            }
            Err(err) => error!(target: "game_engine", "Command failed: {}", err),
        }
    }

    pub fn get_game_stats(&self) -> GameStats {
        GameStats {
            score: self.score.score(),
            highest_tile: self.board.highest_tile(),
            moves: self.moves,
            completion_time: self.timer_state.elapsed(),
            timestamp: chrono::Utc::now().timestamp(),
            playthrough_id: self.current_playthrough_id,
        }
    }

    fn finish_game(&mut self) {
        self.timer_state = self.timer_state.ended(SystemTime::now());
        let stats = self.get_game_stats();
        info!(
            target: "game_engine",
            "Game over; score: {}; highest tile: {}; moves: {}",
            stats.score,
            stats.highest_tile,
            stats.moves
        );
        self.history.clear();
        if let Err(err) = self.stats.record_game(&stats, self.storage.as_mut()) {
            warn!(target: "game_engine", "Could not persist game stats: {}", err);
        }
        self.game_engine_event_emitter
            .emit(GameEngineEvent::GameOver(stats));
    }

    fn persist(&mut self) {
        if let Err(err) = self.history.save(self.storage.as_mut()) {
            warn!(target: "game_engine", "Could not persist board: {}", err);
        }
    }

    fn emit_score_changed(&self, delta: u64) {
        self.game_engine_event_emitter
            .emit(GameEngineEvent::ScoreChanged {
                score: self.score.score(),
                delta,
            });
    }

    fn sync_score(&mut self, delta: u64) {
        self.emit_score_changed(delta);
        if self.score.record_if_highest(self.storage.as_mut()) {
            self.game_engine_event_emitter
                .emit(GameEngineEvent::HighestScoreChanged(self.score.highest()));
        }
    }

    fn sync_history(&mut self) {
        self.game_engine_event_emitter
            .emit(GameEngineEvent::HistoryChanged {
                available_undos: self.history.available_undos(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Channel;
    use crate::game::persistence::{MemoryStorage, GAME_BOARD_KEY, HIGHEST_SCORE_KEY};
    use crate::game::score_tracker::ScorePolicy;
    use crate::tests::UsingLogger;
    use rand::seq::IndexedRandom;
    use std::io;
    use test_context::test_context;

    type EventLog = Rc<RefCell<Vec<GameEngineEvent>>>;

    fn engine_with(settings: Settings, storage: Box<dyn Storage>) -> (GameEngine, EventLog) {
        let (emitter, observer) = Channel::<GameEngineEvent>::new();
        let events: EventLog = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        observer.subscribe(move |event: &GameEngineEvent| sink.borrow_mut().push(event.clone()));
        (GameEngine::new(settings, storage, emitter, Some(42)), events)
    }

    fn engine() -> (GameEngine, EventLog) {
        engine_with(Settings::default(), Box::new(MemoryStorage::new()))
    }

    fn snapshot(rows: [[u32; 4]; 4], score: u64) -> BoardSnapshot {
        BoardSnapshot {
            cells: rows.iter().flatten().copied().collect(),
            score,
        }
    }

    struct FailingStorage;

    impl Storage for FailingStorage {
        fn read(&self, _key: &str) -> Option<String> {
            None
        }

        fn write(&mut self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }

        fn remove(&mut self, _key: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_pair_merges_scores_and_spawns(_: &mut UsingLogger) {
        let (mut engine, _) = engine();
        engine
            .load_state(vec![snapshot([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]], 0)])
            .unwrap();

        let outcome = engine.apply_move(Direction::Left).unwrap();
        assert_eq!(outcome.score_delta, 4);
        assert_eq!(engine.score(), 4);
        assert_eq!(engine.board().cell_at(0, 0).unwrap().value(), Some(4));
        assert_eq!(engine.board().occupied_cells().len(), 2);
        assert_eq!(engine.moves(), 1);
        assert!(!engine.is_input_suspended());
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_illegal_move_changes_nothing(_: &mut UsingLogger) {
        let (mut engine, events) = engine();
        engine
            .load_state(vec![snapshot([[2, 4, 2, 0], [0; 4], [0; 4], [0; 4]], 6)])
            .unwrap();
        let before = engine.snapshot();
        events.borrow_mut().clear();

        assert!(!engine.can_move(Direction::Left));
        assert_eq!(
            engine.apply_move(Direction::Left).unwrap_err(),
            GameError::IllegalMove(Direction::Left)
        );
        assert_eq!(engine.snapshot(), before);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.moves(), 0);
        assert!(events.borrow().is_empty());
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_animated_move_waits_for_every_transition(_: &mut UsingLogger) {
        let settings = Settings {
            animated: true,
            ..Settings::default()
        };
        let (mut engine, _) = engine_with(settings, Box::new(MemoryStorage::new()));
        engine
            .load_state(vec![snapshot([[0, 2, 0, 2], [0; 4], [0; 4], [0; 4]], 0)])
            .unwrap();

        let slid = engine.begin_move(Direction::Left).unwrap();
        assert_eq!(slid.slides.len(), 2);
        assert!(slid.merges.is_empty());
        assert!(engine.is_input_suspended());
        assert!(engine.board().has_pending_merges());

        // input during the move is dropped, not queued
        engine.handle_command(GameEngineCommand::Move(Direction::Right));
        assert_eq!(
            engine.begin_move(Direction::Up).unwrap_err(),
            GameError::MoveInFlight
        );
        assert_eq!(engine.undo().unwrap_err(), GameError::MoveInFlight);

        assert_eq!(engine.transition_ended(slid.slides[0].tile).unwrap(), None);
        let settled = engine
            .transition_ended(slid.slides[1].tile)
            .unwrap()
            .unwrap();
        assert_eq!(settled.merges.len(), 1);
        assert_eq!(settled.score_delta, 4);
        assert!(!engine.is_move_in_flight());
        assert!(!engine.board().has_pending_merges());
        assert_eq!(engine.board().occupied_cells().len(), 2);
        assert_eq!(engine.moves(), 1);
        assert_eq!(
            engine.transition_ended(slid.slides[0].tile).unwrap_err(),
            GameError::NoMoveInFlight
        );
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_undo_chain_respects_history_bound(_: &mut UsingLogger) {
        let (mut engine, _) = engine();
        engine.new_game().unwrap();

        let mut played = vec![engine.snapshot()];
        while played.len() < 6 {
            let direction = move_engine::legal_directions(engine.board())[0];
            engine.apply_move(direction).unwrap();
            played.push(engine.snapshot());
        }

        assert_eq!(engine.history().available_undos(), 2);
        engine.undo().unwrap();
        assert_eq!(engine.snapshot(), played[4]);
        engine.undo().unwrap();
        assert_eq!(engine.snapshot(), played[3]);
        assert_eq!(engine.undo().unwrap_err(), GameError::NotAvailable);
        assert_eq!(engine.snapshot(), played[3]);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_last_move_ends_the_game(_: &mut UsingLogger) {
        let settings = Settings {
            spawn_four_probability: 0.0,
            ..Settings::default()
        };
        let (mut engine, events) = engine_with(settings, Box::new(MemoryStorage::new()));
        engine
            .load_state(vec![snapshot(
                [[8, 8, 2, 4], [4, 8, 2, 4], [2, 4, 8, 2], [4, 2, 4, 8]],
                0,
            )])
            .unwrap();

        engine.apply_move(Direction::Left).unwrap();
        assert_eq!(
            engine.board().values()[..4].to_vec(),
            vec![16, 2, 4, 2]
        );
        assert!(engine.is_game_over());
        assert!(engine.is_input_suspended());
        assert!(engine.history().is_empty());
        assert_eq!(engine.stats().get_global_stats().total_games_played, 1);
        assert_eq!(engine.highest_score(), 16);
        assert_eq!(
            engine.storage().read(HIGHEST_SCORE_KEY).as_deref(),
            Some("16")
        );
        assert!(events
            .borrow()
            .iter()
            .any(|event| matches!(event, GameEngineEvent::GameOver(stats) if stats.score == 16)));

        assert_eq!(
            engine.apply_move(Direction::Right).unwrap_err(),
            GameError::GameOver
        );
        assert_eq!(engine.undo().unwrap_err(), GameError::NotAvailable);

        engine.new_game().unwrap();
        assert!(!engine.is_game_over());
        assert_eq!(engine.board().occupied_cells().len(), 2);
        assert_eq!(engine.highest_score(), 16);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_corrupt_save_starts_fresh_game(_: &mut UsingLogger) {
        let storage = MemoryStorage::new().with_record(GAME_BOARD_KEY, "[[2, 2], oops");
        let (mut engine, _) = engine_with(Settings::default(), Box::new(storage));

        engine.restore().unwrap();
        assert_eq!(engine.board().occupied_cells().len(), 2);
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.history().len(), 1);
        let saved = MoveHistory::load(engine.storage(), 3).unwrap().unwrap();
        assert_eq!(saved.current(), Some(&engine.snapshot()));
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_saved_game_resumes(_: &mut UsingLogger) {
        let (mut engine, _) = engine();
        engine.restore().unwrap();
        for _ in 0..3 {
            let direction = move_engine::legal_directions(engine.board())[0];
            engine.apply_move(direction).unwrap();
        }
        let expected = engine.snapshot();
        let retained = engine.history().len();

        let (emitter, _observer) = Channel::<GameEngineEvent>::new();
        let mut resumed = GameEngine::new(Settings::default(), engine.into_storage(), emitter, Some(7));
        resumed.restore().unwrap();
        assert_eq!(resumed.snapshot(), expected);
        assert_eq!(resumed.history().len(), retained);
        resumed.undo().unwrap();
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_storage_failures_do_not_block_play(_: &mut UsingLogger) {
        let (mut engine, _) = engine_with(Settings::default(), Box::new(FailingStorage));
        engine.restore().unwrap();
        let direction = move_engine::legal_directions(engine.board())[0];
        engine.apply_move(direction).unwrap();
        assert_eq!(engine.moves(), 1);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_move_emits_render_events_in_order(_: &mut UsingLogger) {
        let (mut engine, events) = engine();
        engine
            .load_state(vec![snapshot([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]], 0)])
            .unwrap();
        events.borrow_mut().clear();

        engine.apply_move(Direction::Left).unwrap();
        let names: Vec<&str> = events
            .borrow()
            .iter()
            .map(|event| match event {
                GameEngineEvent::TileSpawned(_) => "spawned",
                GameEngineEvent::TilesSlid(_) => "slid",
                GameEngineEvent::TilesMerged(_) => "merged",
                GameEngineEvent::ScoreChanged { .. } => "score",
                GameEngineEvent::HighestScoreChanged(_) => "highest",
                GameEngineEvent::HistoryChanged { .. } => "history",
                GameEngineEvent::BoardReset(_) => "reset",
                GameEngineEvent::InputSuspended(true) => "suspend",
                GameEngineEvent::InputSuspended(false) => "resume",
                GameEngineEvent::GameOver(_) => "over",
            })
            .collect();
        assert_eq!(
            names,
            vec!["suspend", "slid", "merged", "spawned", "score", "highest", "history", "resume"]
        );
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_commands_drive_shared_engine(_: &mut UsingLogger) {
        let (command_emitter, command_observer) = Channel::<GameEngineCommand>::new();
        let (event_emitter, _event_observer) = Channel::<GameEngineEvent>::new();
        let engine = GameEngine::new_shared(
            Settings::default(),
            Box::new(MemoryStorage::new()),
            event_emitter,
            command_observer,
            Some(5),
        );

        command_emitter.emit(GameEngineCommand::NewGame);
        assert_eq!(engine.borrow().board().occupied_cells().len(), 2);

        let direction = move_engine::legal_directions(engine.borrow().board())[0];
        command_emitter.emit(GameEngineCommand::Move(direction));
        assert_eq!(engine.borrow().moves(), 1);

        command_emitter.emit(GameEngineCommand::Undo);
        assert_eq!(engine.borrow().history().len(), 1);

        engine.borrow_mut().destroy();
        command_emitter.emit(GameEngineCommand::NewGame);
        assert_eq!(engine.borrow().history().len(), 1);
        assert_eq!(command_emitter.listener_count(), 0);
    }

    fn engine_with_eager_renderer(animated: bool) -> Rc<RefCell<GameEngine>> {
        let mut settings = Settings::default();
        settings.animated = animated;
        let (command_emitter, command_observer) = Channel::<GameEngineCommand>::new();
        let (event_emitter, event_observer) = Channel::<GameEngineEvent>::new();

        // answers every slide with its transition end from inside the event
        let renderer = command_emitter.clone();
        event_observer.subscribe(move |event| {
            if let GameEngineEvent::TilesSlid(outcome) = event {
                for slide in &outcome.slides {
                    renderer.emit(GameEngineCommand::TransitionEnded(slide.tile));
                }
            }
        });

        let engine = GameEngine::new_shared(
            settings,
            Box::new(MemoryStorage::new()),
            event_emitter,
            command_observer,
            Some(17),
        );
        command_emitter.emit(GameEngineCommand::NewGame);
        let direction = move_engine::legal_directions(engine.borrow().board())[0];
        command_emitter.emit(GameEngineCommand::Move(direction));
        engine
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_transition_ends_sent_during_slide_settle_the_move(_: &mut UsingLogger) {
        let engine = engine_with_eager_renderer(true);
        let engine = engine.borrow();
        assert_eq!(engine.moves(), 1);
        assert!(!engine.is_move_in_flight());
        assert!(!engine.is_input_suspended());
        assert!(!engine.board().has_pending_merges());
        assert_eq!(engine.history().len(), 2);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_transition_ends_after_synchronous_settle_are_ignored(_: &mut UsingLogger) {
        let engine = engine_with_eager_renderer(false);
        let engine = engine.borrow();
        assert_eq!(engine.moves(), 1);
        assert!(!engine.is_move_in_flight());
        assert_eq!(engine.history().len(), 2);
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_random_play_keeps_invariants(_: &mut UsingLogger) {
        let (mut engine, _) = engine();
        engine.new_game().unwrap();
        let mut chooser = StdRng::seed_from_u64(9);

        for _ in 0..2000 {
            let legal = move_engine::legal_directions(engine.board());
            let Some(&direction) = legal.choose(&mut chooser) else {
                break;
            };
            let sum_before = engine.board().tile_sum();
            let occupied_before = engine.board().occupied_cells().len();
            let score_before = engine.score();

            let outcome = engine.apply_move(direction).unwrap();

            let spawned = engine.board().tile_sum() - sum_before;
            assert!(spawned == 2 || spawned == 4);
            assert!(engine.board().occupied_cells().len() <= occupied_before + 1);
            assert_eq!(engine.score(), score_before + outcome.score_delta);
            assert!(!engine.board().has_pending_merges());
            if engine.is_game_over() {
                break;
            }
        }
        assert!(engine.is_game_over());
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_board_sum_policy(_: &mut UsingLogger) {
        let settings = Settings {
            score_policy: ScorePolicy::BoardSum,
            ..Settings::default()
        };
        let (mut engine, _) = engine_with(settings, Box::new(MemoryStorage::new()));
        engine
            .load_state(vec![snapshot([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]], 4)])
            .unwrap();

        engine.apply_move(Direction::Left).unwrap();
        assert_eq!(engine.score(), engine.board().tile_sum());
    }

    #[test_context(UsingLogger)]
    #[test]
    fn test_opening_tiles_do_not_set_highest_score(_: &mut UsingLogger) {
        let mut settings = Settings::default();
        settings.score_policy = ScorePolicy::BoardSum;
        let (mut engine, events) = engine_with(settings, Box::new(MemoryStorage::new()));

        engine.new_game().unwrap();
        assert!(engine.score() >= 4);
        assert_eq!(engine.highest_score(), 0);
        assert_eq!(engine.storage().read(HIGHEST_SCORE_KEY).as_deref(), Some("0"));
        assert!(!events
            .borrow()
            .iter()
            .any(|event| matches!(event, GameEngineEvent::HighestScoreChanged(_))));

        let direction = move_engine::legal_directions(engine.board())[0];
        engine.apply_move(direction).unwrap();
        assert_eq!(engine.highest_score(), engine.score());
    }
}
