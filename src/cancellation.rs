//! Eviction deadlines: CancellationToken + generation guard per cache cell.
//! Ensures a superseded timer can never clear a newer write.

use tokio_util::sync::CancellationToken;

/// Deadline generation of one cell. Each write advances the generation,
/// cancels the timer armed by the previous write, and issues a fresh token.
/// Owned by the cell and only touched under the cell's lock.
#[derive(Debug)]
pub struct DeadlineGeneration {
    current_token: Option<CancellationToken>,
    generation: u64,
}

impl DeadlineGeneration {
    pub fn new() -> Self {
        Self {
            current_token: None,
            generation: 0,
        }
    }

    /// Cancel the pending timer, advance the generation, return a guard for
    /// the new timer.
    pub fn cancel_and_advance(&mut self) -> DeadlineGuard {
        self.cancel();
        let token = CancellationToken::new();
        self.current_token = Some(token.clone());
        self.generation += 1;
        DeadlineGuard {
            generation: self.generation,
            token,
        }
    }

    /// Cancel the pending timer without arming a new one.
    pub fn cancel(&mut self) {
        if let Some(token) = self.current_token.take() {
            token.cancel();
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    /// Returns true if `generation` was armed by the latest write and is still pending.
    #[inline]
    pub fn is_current(&self, generation: u64) -> bool {
        self.current_token.is_some() && self.generation == generation
    }
}

impl Default for DeadlineGeneration {
    fn default() -> Self {
        Self::new()
    }
}

/// Handed to the timer task armed by one write.
#[derive(Debug, Clone)]
pub struct DeadlineGuard {
    generation: u64,
    token: CancellationToken,
}

impl DeadlineGuard {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
