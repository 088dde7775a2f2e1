pub mod store_tests;

use crate::event::Event;

/// Deterministic pseudo-random sequence (LCG) so property tests are repeatable.
pub(crate) struct Lcg(u64);

impl Lcg {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub(crate) fn next_below(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }

    /// A small-domain event so collisions on id and ordering key are common.
    pub(crate) fn event(&mut self) -> Event {
        let actors = ["", "kid", "twin"];
        let categories = ["", "Formula", "Sleep", "Diaper"];
        let mut e = Event::at(self.next_below(20) as i64)
            .with_actor(actors[self.next_below(3) as usize])
            .with_category(categories[self.next_below(4) as usize])
            .with_quantity(self.next_below(200) as i64, "ml");
        if self.next_below(4) == 0 {
            e = e.with_id(format!("custom-{}", self.next_below(10)));
        }
        e
    }
}
