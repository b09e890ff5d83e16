use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Stable string hash used to derive seeds. FxHasher has no per-process
/// random state, so the same name always yields the same seed.
pub fn simple_hash(s: &str) -> u64 {
    let mut hasher = FxHasher::default();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Deterministic per-agent random stream.
#[derive(Debug, Clone)]
pub struct PseudoRandom {
    rng: Xoshiro256PlusPlus,
}

impl PseudoRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Stream for one nation in one game.
    pub fn for_nation(nation_name: &str, game_id: &str) -> Self {
        Self::new(simple_hash(nation_name).wrapping_add(simple_hash(game_id)))
    }

    /// Uniform integer in `[min, max)`. Returns `min` for an empty range.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// True with probability `1 / odds`. `odds == 0` never fires.
    pub fn chance(&mut self, odds: u32) -> bool {
        match odds {
            0 => false,
            1 => true,
            n => self.rng.gen_range(0..n) == 0,
        }
    }

    pub fn rand_element<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..items.len());
        items.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = PseudoRandom::for_nation("Spain", "game-1");
        let mut b = PseudoRandom::for_nation("Spain", "game-1");
        for _ in 0..32 {
            assert_eq!(a.next_int(0, 1000), b.next_int(0, 1000));
        }
    }

    #[test]
    fn test_different_games_diverge() {
        let mut a = PseudoRandom::for_nation("Spain", "game-1");
        let mut b = PseudoRandom::for_nation("Spain", "game-2");
        let xs: Vec<i64> = (0..16).map(|_| a.next_int(0, 1_000_000)).collect();
        let ys: Vec<i64> = (0..16).map(|_| b.next_int(0, 1_000_000)).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn test_next_int_bounds() {
        let mut rng = PseudoRandom::new(7);
        for _ in 0..1000 {
            let v = rng.next_int(-5, 5);
            assert!((-5..5).contains(&v));
        }
        assert_eq!(rng.next_int(3, 3), 3);
        assert_eq!(rng.next_int(4, 1), 4);
    }

    #[test]
    fn test_chance_edges() {
        let mut rng = PseudoRandom::new(1);
        assert!((0..100).all(|_| rng.chance(1)));
        assert!((0..100).all(|_| !rng.chance(0)));
    }

    #[test]
    fn test_rand_element() {
        let mut rng = PseudoRandom::new(3);
        let empty: [u8; 0] = [];
        assert!(rng.rand_element(&empty).is_none());
        let items = [1, 2, 3];
        let picked = rng.rand_element(&items).copied();
        assert!(matches!(picked, Some(1..=3)));
    }
}
