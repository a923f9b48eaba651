//! Dice sources.
//!
//! The engine never samples randomness itself; it asks a [`DiceRoller`] for the
//! committed value. The rolling animation is cosmetic: [`animation_frames`]
//! produces faces to flash before the committed one.

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Number of faces shown while the dice rolls
pub const ROLL_TICKS: usize = 10;

/// Delay between two animation faces, in milliseconds
pub const ROLL_TICK_MS: u64 = 100;

/// Something that produces dice values in 1..=6
pub trait DiceRoller {
    fn roll(&mut self) -> u8;
}

/// Uniform dice backed by any `rand` generator
#[derive(Debug, Clone)]
pub struct RandomDice<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomDice<StdRng> {
    /// Deterministic dice for replays
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl RandomDice<ThreadRng> {
    pub fn thread() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<R: Rng> DiceRoller for RandomDice<R> {
    fn roll(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }
}

/// Scripted dice: returns queued values in order, then cycles through them again
#[derive(Debug, Clone, Default)]
pub struct FixedDice {
    queue: VecDeque<u8>,
    played: Vec<u8>,
}

impl FixedDice {
    pub fn new(values: impl IntoIterator<Item = u8>) -> Self {
        Self {
            queue: values.into_iter().map(|v| v.clamp(1, 6)).collect(),
            played: Vec::new(),
        }
    }

    /// Queue more values
    pub fn push(&mut self, value: u8) {
        self.queue.push_back(value.clamp(1, 6));
    }
}

impl DiceRoller for FixedDice {
    fn roll(&mut self) -> u8 {
        if self.queue.is_empty() {
            if self.played.is_empty() {
                return 1;
            }
            self.queue.extend(self.played.drain(..));
        }
        let value = self.queue.pop_front().unwrap_or(1);
        self.played.push(value);
        value
    }
}

/// Faces to show while rolling. The last face is always `committed`.
pub fn animation_frames<R: Rng>(rng: &mut R, committed: u8) -> Vec<u8> {
    let mut frames: Vec<u8> = (1..ROLL_TICKS).map(|_| rng.gen_range(1..=6)).collect();
    frames.push(committed);
    frames
}
