use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// What a callback wants after it ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationControl {
    Continue,
    Stop,
}

/// One timer firing. Stale ticks (from an animation that has since been
/// stopped or restarted) carry an old generation and are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationTick {
    pub id: String,
    pub generation: u64,
}

struct Entry<C> {
    generation: u64,
    interval: Duration,
    task: JoinHandle<()>,
    callback: C,
}

/// Named periodic timers. Timers only post ticks; the owner runs the
/// callback so it gets exclusive access to whatever it animates.
pub struct AnimationManager<C> {
    entries: HashMap<String, Entry<C>>,
    next_generation: u64,
    tx: UnboundedSender<AnimationTick>,
    rx: UnboundedReceiver<AnimationTick>,
}

impl<C> Default for AnimationManager<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> AnimationManager<C> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            entries: HashMap::new(),
            next_generation: 0,
            tx,
            rx,
        }
    }

    /// Start `id`, replacing any animation already running under that name.
    /// Must be called inside a tokio runtime.
    pub fn start_animation(&mut self, id: impl Into<String>, interval: Duration, callback: C) {
        let id = id.into();
        self.stop_animation(&id);
        self.next_generation += 1;
        let generation = self.next_generation;

        let tx = self.tx.clone();
        let tick_id = id.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let tick = AnimationTick {
                    id: tick_id.clone(),
                    generation,
                };
                if tx.send(tick).is_err() {
                    break;
                }
            }
        });

        tracing::debug!(animation = %id, interval_ms = interval.as_millis() as u64, "animation started");
        self.entries.insert(
            id,
            Entry {
                generation,
                interval,
                task,
                callback,
            },
        );
    }

    pub fn stop_animation(&mut self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                entry.task.abort();
                tracing::debug!(animation = %id, "animation stopped");
                true
            }
            None => false,
        }
    }

    pub fn stop_all_animations(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.task.abort();
        }
    }

    pub fn has_animation(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn interval(&self, id: &str) -> Option<Duration> {
        self.entries.get(id).map(|entry| entry.interval)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wait for the next tick. Pends forever while nothing is animating.
    pub async fn next_tick(&mut self) -> AnimationTick {
        loop {
            if self.entries.is_empty() {
                // Drain ticks left behind by stopped animations, then park.
                while self.rx.try_recv().is_ok() {}
                std::future::pending::<()>().await;
            }
            // The manager holds a sender, so the channel never closes.
            if let Some(tick) = self.rx.recv().await {
                return tick;
            }
        }
    }

    /// A tick that is already queued, if any.
    pub fn try_next_tick(&mut self) -> Option<AnimationTick> {
        self.rx.try_recv().ok()
    }

    /// The callback for a live tick; `None` for stale ones.
    pub fn callback_for(&mut self, tick: &AnimationTick) -> Option<&mut C> {
        self.entries
            .get_mut(&tick.id)
            .filter(|entry| entry.generation == tick.generation)
            .map(|entry| &mut entry.callback)
    }

    /// Stop `tick`'s animation if it is still the one that produced it.
    pub fn finish(&mut self, tick: &AnimationTick) {
        let live = self
            .entries
            .get(&tick.id)
            .is_some_and(|entry| entry.generation == tick.generation);
        if live {
            self.stop_animation(&tick.id);
        }
    }
}

impl<C> Drop for AnimationManager<C> {
    fn drop(&mut self) {
        self.stop_all_animations();
    }
}
