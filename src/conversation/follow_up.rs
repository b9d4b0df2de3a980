use rand::{Rng as _, SeedableRng as _, rngs::StdRng};

/// Chooses which follow-up question is asked when several evaluators offer one
pub trait FollowUpPicker: Send + std::fmt::Debug {
    /// Index of the chosen candidate, `candidates` is never zero
    fn pick(&mut self, candidates: usize) -> usize;
}

/// Picks uniformly at random
///
/// Without a seed every run picks differently.
#[derive(Debug)]
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self { rng }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FollowUpPicker for RandomPicker {
    fn pick(&mut self, candidates: usize) -> usize {
        self.rng.gen_range(0..candidates)
    }
}
