use super::{Advisor, AdvisorContext, AdvisorKind, Priority, Recommendation};
use crate::config::StrategicConfig;
use crate::error::Result;
use crate::game::{Execution, GameView, Gold, PlayerId, Tick, TileRef, UnitType};
use crate::targeting::{
    select_strategic_target, territory_centroid, StrategicTarget, StrikeMemory, StrikeReason,
    TargetCache,
};
use tracing::{debug, trace};

/// Gold to hold back given opponents' treasuries.
///
/// Tracks the richest opponents (so a rival saving up is matched) and the
/// field average, scales up as the richest approaches a strike's price,
/// and never drops far below the richest treasury.
pub fn compute_reserve(opponent_gold: &[Gold], strike_cost: Gold, cfg: &StrategicConfig) -> Gold {
    let mut sorted = opponent_gold.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let mean = |xs: &[Gold]| {
        if xs.is_empty() {
            0.0
        } else {
            xs.iter().map(|&g| g as f64).sum::<f64>() / xs.len() as f64
        }
    };
    let top = &sorted[..sorted.len().min(3)];
    let benchmark = cfg.reserve_top_weight * mean(top) + cfg.reserve_average_weight * mean(&sorted);
    let base = benchmark.max(cfg.reserve_floor as f64);

    let richest = sorted.first().copied().unwrap_or(0);
    let pressure = if strike_cost == 0 {
        1.0
    } else {
        (richest as f64 / strike_cost as f64).clamp(0.0, 1.0)
    };
    let multiplier = 1.0 + (cfg.reserve_max_multiplier - 1.0) * pressure;

    let scaled = (base * multiplier) as Gold;
    scaled
        .max(richest.saturating_sub(cfg.reserve_safety_margin))
        .min(cfg.reserve_hard_cap)
}

/// Reserve for `me`; nothing is held back until we own a silo.
pub fn reserve_threshold<G: GameView>(game: &G, me: PlayerId, cfg: &StrategicConfig) -> Gold {
    if game.unit_count(me, UnitType::MissileSilo) == 0 {
        return 0;
    }
    let opponents: Vec<Gold> = game
        .players()
        .into_iter()
        .filter(|&p| p != me && !game.is_friendly(me, p))
        .map(|p| game.gold(p))
        .collect();
    compute_reserve(&opponents, game.unit_cost(me, UnitType::Mirv), cfg)
}

/// Without a silo of our own: someone else has one, a strategic threat is
/// live, or the match has gone long.
pub fn silo_urgency<G: GameView>(
    game: &G,
    me: PlayerId,
    threat: bool,
    cfg: &StrategicConfig,
) -> bool {
    if game.unit_count(me, UnitType::MissileSilo) > 0 {
        return false;
    }
    let rival_silo = game
        .players()
        .into_iter()
        .any(|p| p != me && game.unit_count(p, UnitType::MissileSilo) > 0);
    rival_silo || threat || game.ticks() > cfg.silo_urgency_tick
}

#[derive(Debug, Clone)]
pub struct StrategicAdvisor {
    /// Last strike or hesitation; both start the cooldown.
    last_attempt: Option<Tick>,
    memory: StrikeMemory,
    cache: TargetCache,
}

impl StrategicAdvisor {
    pub fn new(cache_ticks: Tick, memory_ticks: Tick) -> Self {
        Self {
            last_attempt: None,
            memory: StrikeMemory::new(memory_ticks),
            cache: TargetCache::new(cache_ticks),
        }
    }

    pub fn last_attempt(&self) -> Option<Tick> {
        self.last_attempt
    }

    pub fn memory(&self) -> &StrikeMemory {
        &self.memory
    }

    pub fn in_cooldown(&self, now: Tick, cooldown: Tick) -> bool {
        self.last_attempt
            .is_some_and(|last| now < last.saturating_add(cooldown))
    }

    /// Current strategic target, if any, from the cached target list.
    pub fn threat<G: GameView>(
        &mut self,
        game: &G,
        me: PlayerId,
        cfg: &StrategicConfig,
    ) -> Option<StrategicTarget> {
        let targets = self.cache.targets(game, me).to_vec();
        select_strategic_target(game, me, &targets, cfg)
    }

    /// Centroid when launchable and clear of remembered impacts, else the
    /// first launchable owned tile clear of them. Falls back to the centroid
    /// or any launchable tile when every candidate was hit recently.
    pub fn aim_point<G: GameView>(
        &self,
        game: &G,
        me: PlayerId,
        target: PlayerId,
        impact_radius: u32,
    ) -> Option<TileRef> {
        let r2 = (impact_radius as u64).pow(2);
        let launchable = |t: &TileRef| game.can_build(me, UnitType::Mirv, *t);
        let clear = |t: &TileRef| {
            self.memory
                .tiles()
                .all(|hit| game.euclidean_dist_squared(hit, *t) > r2)
        };

        let centroid = territory_centroid(game, target).filter(launchable);
        if let Some(c) = centroid.filter(clear) {
            return Some(c);
        }
        let territory = game.territory(target);
        territory
            .iter()
            .copied()
            .find(|t| launchable(t) && clear(t))
            .or(centroid)
            .or_else(|| territory.iter().copied().find(launchable))
    }
}

impl<G: GameView> Advisor<G> for StrategicAdvisor {
    fn kind(&self) -> AdvisorKind {
        AdvisorKind::Strategic
    }

    fn recommend(&mut self, ctx: &mut AdvisorContext<'_, G>) -> Result<Option<Recommendation>> {
        let config = ctx.config;
        let cfg = &config.strategic;
        let (game, me, now) = (ctx.game, ctx.player, ctx.tick());
        self.memory.evict(now);

        if game.unit_count(me, UnitType::MissileSilo) == 0 {
            return Ok(None);
        }
        let cost = ctx.cost(UnitType::Mirv);
        if ctx.gold() < cost {
            trace!(player = %me, gold = ctx.gold(), cost, "cannot afford MIRV");
            return Ok(None);
        }
        if self.in_cooldown(now, cfg.cooldown_ticks) {
            return Ok(None);
        }
        if ctx.rng.chance(cfg.hesitation_odds) {
            debug!(player = %me, "hesitating on MIRV");
            self.last_attempt = Some(now);
            return Ok(None);
        }

        let Some(target) = self.threat(game, me, cfg) else {
            return Ok(None);
        };
        let radius = config.targeting.damage_radius(UnitType::Mirv);
        let Some(tile) = self.aim_point(game, me, target.player, radius) else {
            return Ok(None);
        };

        self.memory.record(now, tile);
        self.last_attempt = Some(now);
        let priority = match target.reason {
            StrikeReason::CounterStrike | StrikeReason::VictoryDenial => Priority::Critical,
            StrikeReason::SteamrollPrevention => Priority::High,
        };
        debug!(player = %me, target = %target.player, reason = target.reason.name(), "MIRV launch");
        Ok(Some(Recommendation::single(
            AdvisorKind::Strategic,
            Execution::Strike {
                weapon: UnitType::Mirv,
                tile,
            },
            target.weight,
            priority,
            format!("MIRV on {} ({})", target.player, target.reason.name()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::testing;
    use crate::config::AiConfig;
    use crate::game::{Owner, PlayerType, Terrain};
    use crate::rng::PseudoRandom;
    use crate::sim::GridWorld;
    use proptest::prelude::*;

    /// `them` holds 700 of 1000 land tiles; we have a silo and MIRV money.
    fn dominant_rival() -> (GridWorld, PlayerId, PlayerId) {
        let mut world = GridWorld::filled(50, 20, Terrain::Plains);
        let me = world.add_player("Me", PlayerType::FakeHuman, None);
        let them = world.add_player("Them", PlayerType::Human, None);
        world.claim_rect(me, 0, 0, 14, 19);
        world.claim_rect(them, 15, 0, 49, 19);
        world.add_unit(me, UnitType::MissileSilo, world.tile_ref(2, 2));
        world.set_gold(me, 40_000_000);
        (world, me, them)
    }

    fn no_hesitation() -> AiConfig {
        let mut config = AiConfig::default();
        config.strategic.hesitation_odds = 0;
        config
    }

    #[test]
    fn test_victory_denial_strike_on_first_query() {
        let (world, me, them) = dominant_rival();
        let config = no_hesitation();
        let mut rng = PseudoRandom::new(1);
        let mut advisor = StrategicAdvisor::new(20, 500);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        let rec = advisor.recommend(&mut ctx).unwrap().unwrap();
        assert_eq!(rec.priority, Priority::Critical);
        let [Execution::Strike { weapon, tile }] = rec.executions.as_slice() else {
            panic!("expected one strike");
        };
        assert_eq!(*weapon, UnitType::Mirv);
        assert_eq!(world.owner(*tile), Owner::Player(them));
        assert_eq!(advisor.memory().len(), 1);
    }

    #[test]
    fn test_cooldown_blocks_second_strike() {
        let (mut world, me, _) = dominant_rival();
        let config = no_hesitation();
        let mut rng = PseudoRandom::new(1);
        let mut advisor = StrategicAdvisor::new(20, 500);

        world.set_tick(1_000);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        assert!(advisor.recommend(&mut ctx).unwrap().is_some());

        world.set_tick(1_599);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        assert!(advisor.recommend(&mut ctx).unwrap().is_none());

        world.set_tick(1_600);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        assert!(advisor.recommend(&mut ctx).unwrap().is_some());
    }

    #[test]
    fn test_hesitation_consumes_cooldown() {
        let (mut world, me, _) = dominant_rival();
        let mut config = AiConfig::default();
        config.strategic.hesitation_odds = 1;
        let mut rng = PseudoRandom::new(1);
        let mut advisor = StrategicAdvisor::new(20, 500);
        world.set_tick(50);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        assert!(advisor.recommend(&mut ctx).unwrap().is_none());
        assert_eq!(advisor.last_attempt(), Some(50));
        assert!(advisor.in_cooldown(649, 600));
        assert!(!advisor.in_cooldown(650, 600));
    }

    #[test]
    fn test_gates_without_silo_or_gold() {
        let (mut world, me, _) = dominant_rival();
        let config = no_hesitation();
        let mut rng = PseudoRandom::new(1);
        let mut advisor = StrategicAdvisor::new(20, 500);

        world.set_gold(me, 1_000);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        assert!(advisor.recommend(&mut ctx).unwrap().is_none());

        let mut bare = GridWorld::filled(10, 10, Terrain::Plains);
        let lonely = bare.add_player("Lonely", PlayerType::FakeHuman, None);
        bare.set_gold(lonely, 40_000_000);
        let mut ctx = testing::context(&bare, lonely, &mut rng, &config);
        assert!(advisor.recommend(&mut ctx).unwrap().is_none());
        assert_eq!(advisor.last_attempt(), None);
    }

    #[test]
    fn test_no_target_no_strike() {
        let (mut world, me, them) = dominant_rival();
        world.claim_rect(me, 15, 0, 29, 19);
        assert!(world.tiles_owned(them) < 650);
        let config = no_hesitation();
        let mut rng = PseudoRandom::new(1);
        let mut advisor = StrategicAdvisor::new(20, 500);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        assert!(advisor.recommend(&mut ctx).unwrap().is_none());
    }

    #[test]
    fn test_reserve_is_zero_without_silo() {
        let mut world = GridWorld::filled(10, 10, Terrain::Plains);
        let me = world.add_player("Me", PlayerType::FakeHuman, None);
        let rich = world.add_player("Rich", PlayerType::Human, None);
        world.set_gold(rich, 50_000_000);
        let cfg = StrategicConfig::default();
        assert_eq!(reserve_threshold(&world, me, &cfg), 0);
        world.add_unit(me, UnitType::MissileSilo, world.tile_ref(0, 0));
        assert!(reserve_threshold(&world, me, &cfg) >= 40_000_000);
    }

    #[test]
    fn test_reserve_formula() {
        let cfg = StrategicConfig::default();
        // Poor field: the floor wins, with no pressure multiplier.
        assert_eq!(compute_reserve(&[], 35_000_000, &cfg), 1_000_000);
        assert_eq!(compute_reserve(&[0, 0], 35_000_000, &cfg), 1_000_000);

        // 0.6 * 10M + 0.4 * 10M = 10M, multiplier 1 + 0.4 * 10/35.
        let got = compute_reserve(&[10_000_000], 35_000_000, &cfg);
        let expected = (10_000_000.0 * (1.0 + 0.4 * (10.0 / 35.0))) as Gold;
        assert!(got.abs_diff(expected) <= 1);

        // Capped.
        assert_eq!(compute_reserve(&[500_000_000], 35_000_000, &cfg), 60_000_000);
    }

    #[test]
    fn test_silo_urgency() {
        let mut world = GridWorld::filled(10, 10, Terrain::Plains);
        let me = world.add_player("Me", PlayerType::FakeHuman, None);
        let other = world.add_player("Other", PlayerType::Human, None);
        let cfg = StrategicConfig::default();
        assert!(!silo_urgency(&world, me, false, &cfg));
        assert!(silo_urgency(&world, me, true, &cfg));
        world.add_unit(other, UnitType::MissileSilo, world.tile_ref(5, 5));
        assert!(silo_urgency(&world, me, false, &cfg));
        world.add_unit(me, UnitType::MissileSilo, world.tile_ref(1, 1));
        assert!(!silo_urgency(&world, me, true, &cfg));
    }

    #[test]
    fn test_next_mirv_avoids_previous_impact() {
        let (mut world, me, them) = dominant_rival();
        let mut config = no_hesitation();
        config.targeting.mirv_damage_radius = 10;
        let mut rng = PseudoRandom::new(1);
        let mut advisor = StrategicAdvisor::new(20, 3_000);

        world.set_tick(1_000);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        let first = advisor.recommend(&mut ctx).unwrap().unwrap();
        let [Execution::Strike { tile: first, .. }] = first.executions.as_slice() else {
            panic!("expected one strike");
        };
        assert_eq!(Some(*first), territory_centroid(&world, them));

        world.set_tick(1_600);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        let second = advisor.recommend(&mut ctx).unwrap().unwrap();
        let [Execution::Strike { tile: second, .. }] = second.executions.as_slice() else {
            panic!("expected one strike");
        };
        assert_eq!(world.owner(*second), Owner::Player(them));
        assert!(world.euclidean_dist_squared(*first, *second) > 100);
        assert_eq!(advisor.memory().len(), 2);
    }

    #[test]
    fn test_aim_falls_back_when_everything_was_hit() {
        let (world, me, them) = dominant_rival();
        let mut advisor = StrategicAdvisor::new(20, 3_000);
        let centroid = territory_centroid(&world, them).unwrap();
        advisor.memory.record(0, centroid);
        assert_eq!(advisor.aim_point(&world, me, them, 1_000), Some(centroid));
        assert_eq!(advisor.aim_point(&world, me, them, 0), world.territory(them).first().copied());
    }

    proptest! {
        #[test]
        fn prop_reserve_monotone_in_opponent_gold(
            gold in prop::collection::vec(0u64..200_000_000, 1..8),
            idx in any::<prop::sample::Index>(),
            bump in 0u64..100_000_000,
        ) {
            let cfg = StrategicConfig::default();
            let before = compute_reserve(&gold, 35_000_000, &cfg);
            let mut richer = gold.clone();
            let i = idx.index(richer.len());
            richer[i] += bump;
            let after = compute_reserve(&richer, 35_000_000, &cfg);
            prop_assert!(after >= before);
            prop_assert!(after <= cfg.reserve_hard_cap);
            prop_assert!(before >= cfg.reserve_floor);
        }
    }
}
