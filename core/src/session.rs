use std::collections::VecDeque;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use std::thread;
use std::time::Duration;

use crate::*;

/// Handle returned by [`Session::subscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Shared handle to one player's game and score table.
///
/// Clones refer to the same session. Every engine operation, timer tick
/// included, runs under a single lock. Its events are queued before that lock
/// is released and delivered after it, so listeners may read the session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

struct Shared {
    game: Mutex<GameSlot>,
    /// Events in the order their operations ran, waiting for delivery.
    pending: Mutex<VecDeque<GameEvent>>,
    /// Held by whichever thread is delivering; never taken under `game`.
    listeners: Mutex<Listeners>,
    leaderboard: Mutex<Leaderboard>,
    tick_interval: Duration,
}

#[derive(Default)]
struct GameSlot {
    engine: Option<Engine>,
    /// Bumped on every new game so that stray ticks of an old timer are ignored.
    generation: u64,
    timer: Option<Timer>,
}

#[derive(Default)]
struct Listeners {
    entries: Vec<(ListenerId, Box<dyn EventListener>)>,
    next_id: u64,
}

/// Running timer thread; dropping it stops the thread.
struct Timer {
    _stop: Sender<()>,
}

impl Listeners {
    fn dispatch(&mut self, event: &GameEvent) {
        for (_, listener) in self.entries.iter_mut() {
            listener.on_event(event);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `None` when another thread, or a listener up the stack, holds the lock.
fn try_lock<T>(mutex: &Mutex<T>) -> Option<MutexGuard<'_, T>> {
    match mutex.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_leaderboard(
            Leaderboard::open_or_empty(config.leaderboard_path),
            config.tick_interval,
        )
    }

    pub fn with_leaderboard(leaderboard: Leaderboard, tick_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                game: Mutex::new(GameSlot::default()),
                pending: Mutex::new(VecDeque::new()),
                listeners: Mutex::new(Listeners::default()),
                leaderboard: Mutex::new(leaderboard),
                tick_interval,
            }),
        }
    }

    /// Replaces the current game with a fresh, randomly mined board.
    pub fn init_game(&self, rows: Coord, cols: Coord, mines: CellCount) -> Result<()> {
        self.init_with(&GameConfig::new(rows, cols, mines))
    }

    pub fn init_with(&self, config: &GameConfig) -> Result<()> {
        let engine = Engine::new(config)?;
        self.install(engine);
        Ok(())
    }

    /// Replaces the current game with one played on `grid`.
    pub fn init_with_grid(&self, grid: Grid) {
        self.install(Engine::from_grid(grid));
    }

    fn install(&self, engine: Engine) {
        let mut slot = lock(&self.shared.game);
        slot.timer = None;
        slot.generation += 1;
        log::debug!(
            "New game {} on a {:?} board",
            slot.generation,
            engine.dimensions()
        );
        slot.engine = Some(engine);
    }

    pub fn start_game(&self) -> Result<()> {
        self.apply(Engine::start)
    }

    pub fn click_cell(&self, x: Coord, y: Coord) -> Result<RevealOutcome> {
        self.apply(|engine| engine.click((x, y)))
    }

    pub fn toggle_flag(&self, x: Coord, y: Coord) -> Result<MarkOutcome> {
        self.apply(|engine| engine.toggle_flag((x, y)))
    }

    pub fn close_game(&self) -> Result<()> {
        self.apply(|engine| {
            engine.close();
            Ok(())
        })
    }

    pub fn stage(&self) -> Option<Stage> {
        self.read(Engine::stage)
    }

    pub fn elapsed_seconds(&self) -> Option<u32> {
        self.read(Engine::elapsed_seconds)
    }

    pub fn score(&self) -> Option<Score> {
        self.read(Engine::score)
    }

    pub fn flags_available(&self) -> Option<CellCount> {
        self.read(Engine::flags_available)
    }

    /// Board dimensions as `(rows, cols)`.
    pub fn dimensions(&self) -> Option<(Coord, Coord)> {
        self.read(Engine::dimensions)
    }

    pub fn cell(&self, x: Coord, y: Coord) -> Result<Cell> {
        self.read(|engine| engine.cell((x, y)))
            .unwrap_or(Err(GameError::NoGame))
    }

    /// Records the current score under `name` and returns its rank.
    pub fn save_score(&self, name: &str) -> Result<usize> {
        let score = self.score().ok_or(GameError::NoGame)?;
        lock(&self.shared.leaderboard).upsert(name, score)
    }

    pub fn remove_score(&self, name: &str) -> Result<()> {
        lock(&self.shared.leaderboard).remove(name).map(drop)
    }

    pub fn persist_leaderboard(&self) -> Result<()> {
        lock(&self.shared.leaderboard).save()
    }

    pub fn load_leaderboard(&self) -> Result<()> {
        lock(&self.shared.leaderboard).load()
    }

    /// Snapshot of the score table.
    pub fn leaderboard(&self) -> Leaderboard {
        lock(&self.shared.leaderboard).clone()
    }

    /// Registers `listener` for every event from now on.
    ///
    /// Must not be called from inside a listener.
    pub fn subscribe(&self, listener: impl EventListener + 'static) -> ListenerId {
        let mut listeners = lock(&self.shared.listeners);
        let id = ListenerId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, Box::new(listener)));
        id
    }

    /// Must not be called from inside a listener.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.shared.listeners);
        let before = listeners.entries.len();
        listeners.entries.retain(|(listener_id, _)| *listener_id != id);
        listeners.entries.len() != before
    }

    fn read<T>(&self, query: impl FnOnce(&Engine) -> T) -> Option<T> {
        lock(&self.shared.game).engine.as_ref().map(query)
    }

    /// Runs `op` on the engine, delivers its events and starts or stops the timer.
    fn apply<T>(&self, op: impl FnOnce(&mut Engine) -> Result<T>) -> Result<T> {
        let mut slot = lock(&self.shared.game);
        let engine = slot.engine.as_mut().ok_or(GameError::NoGame)?;
        let result = op(engine);
        let events = engine.take_events();
        let timing = engine.is_timing();
        self.sync_timer(&mut slot, timing);
        self.shared.enqueue(events);
        drop(slot);

        self.shared.deliver();
        result
    }

    fn sync_timer(&self, slot: &mut GameSlot, timing: bool) {
        match (timing, slot.timer.is_some()) {
            (true, false) => {
                slot.timer = spawn_timer(
                    Arc::downgrade(&self.shared),
                    slot.generation,
                    self.shared.tick_interval,
                );
            }
            (false, true) => {
                log::debug!("Stopping timer of game {}", slot.generation);
                slot.timer = None;
            }
            _ => {}
        }
    }
}

impl Shared {
    /// Performs one timer tick; returns whether the timer should keep going.
    fn tick(&self, generation: u64) -> bool {
        let mut slot = lock(&self.game);
        if slot.generation != generation {
            return false;
        }
        let Some(engine) = slot.engine.as_mut() else {
            return false;
        };
        engine.tick();
        let events = engine.take_events();
        let timing = engine.is_timing();
        self.enqueue(events);
        drop(slot);

        self.deliver();
        timing
    }

    /// Called with `game` held, so the queue follows operation order.
    fn enqueue(&self, events: Vec<GameEvent>) {
        if !events.is_empty() {
            lock(&self.pending).extend(events);
        }
    }

    /// Hands queued events to listeners, unless someone else already does.
    ///
    /// Whoever holds `listeners` keeps draining until the queue is empty, so
    /// events queued by a listener or by another thread meanwhile are not lost.
    fn deliver(&self) {
        loop {
            let Some(mut listeners) = try_lock(&self.listeners) else {
                return;
            };
            loop {
                let next = lock(&self.pending).pop_front();
                let Some(event) = next else {
                    break;
                };
                listeners.dispatch(&event);
            }
            drop(listeners);

            if lock(&self.pending).is_empty() {
                return;
            }
        }
    }
}

fn spawn_timer(shared: Weak<Shared>, generation: u64, interval: Duration) -> Option<Timer> {
    let (stop, stopped) = mpsc::channel::<()>();
    let spawned = thread::Builder::new()
        .name(format!("sapper-timer-{generation}"))
        .spawn(move || {
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => break,
                }
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                if !shared.tick(generation) {
                    break;
                }
            }
            log::trace!("Timer of game {} finished", generation);
        });

    match spawned {
        Ok(_) => {
            log::debug!("Started timer of game {}", generation);
            Some(Timer { _stop: stop })
        }
        Err(err) => {
            log::error!("Could not start game timer: {}", err);
            None
        }
    }
}
