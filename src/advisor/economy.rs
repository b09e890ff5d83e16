use super::{Advisor, AdvisorContext, AdvisorKind, Priority, Recommendation};
use crate::error::Result;
use crate::game::{Execution, GameView, Gold, TileRef, UnitType};
use crate::sampler::{random_ocean_tile_near, sample_coastline, sample_territory};
use tracing::{trace, warn};

/// How much more the n-th copy of a structure "feels" like it costs.
/// Economic buildings scale linearly, defensive and strategic ones
/// quadratically.
pub fn cost_multiplier(unit_type: UnitType, owned: usize) -> u64 {
    let n = owned as u64 + 1;
    match unit_type {
        UnitType::City | UnitType::Port | UnitType::Factory => n,
        UnitType::DefensePost | UnitType::SamLauncher | UnitType::MissileSilo => n.saturating_mul(n),
        _ => 1,
    }
}

pub fn perceived_cost(base: Gold, unit_type: UnitType, owned: usize) -> Gold {
    base.saturating_mul(cost_multiplier(unit_type, owned))
}

/// The configured plan, with missile silos first when they are urgent.
pub fn build_order(plan: &[UnitType], silo_urgent: bool) -> Vec<UnitType> {
    let mut order = plan.to_vec();
    if silo_urgent {
        if let Some(pos) = order.iter().position(|&u| u == UnitType::MissileSilo) {
            let silo = order.remove(pos);
            order.insert(0, silo);
        }
    }
    order
}

#[derive(Debug, Default, Clone)]
pub struct EconomyAdvisor;

impl EconomyAdvisor {
    pub fn new() -> Self {
        Self
    }

    /// Highest non-negative placement score among sampled tiles that the
    /// engine would accept. Ties keep the first.
    pub fn best_tile<G: GameView>(
        &self,
        ctx: &mut AdvisorContext<'_, G>,
        unit_type: UnitType,
    ) -> Option<TileRef> {
        let (game, me) = (ctx.game, ctx.player);
        let samples = ctx.config.economy.placement_samples;
        let candidates = if unit_type == UnitType::Port {
            sample_coastline(game, ctx.rng, me, samples)
        } else {
            sample_territory(game, ctx.rng, me, samples)
        };

        let mut best: Option<(TileRef, f64)> = None;
        for tile in candidates {
            let value = game.placement_value(me, unit_type, tile);
            if value < 0.0 || !game.can_build(me, unit_type, tile) {
                continue;
            }
            if best.map_or(true, |(_, b)| value > b) {
                best = Some((tile, value));
            }
        }
        best.map(|(tile, _)| tile)
    }

    fn warship<G: GameView>(&self, ctx: &mut AdvisorContext<'_, G>) -> Option<Recommendation> {
        let config = ctx.config;
        let cfg = &config.economy;
        let (game, me) = (ctx.game, ctx.player);
        if !ctx.rng.chance(cfg.warship_odds) {
            return None;
        }
        let ports = game.units(me, &[UnitType::Port]);
        if ports.is_empty() || game.unit_count(me, UnitType::Warship) > 0 {
            return None;
        }
        if ctx.cost(UnitType::Warship) > ctx.spendable_gold() {
            return None;
        }
        let port = ctx.rng.rand_element(&ports)?.tile;
        let tile = random_ocean_tile_near(
            game,
            ctx.rng,
            port,
            cfg.warship_search_radius,
            cfg.warship_search_attempts,
        );
        match tile {
            Some(tile) if game.can_build(me, UnitType::Warship, tile) => {
                Some(Recommendation::single(
                    AdvisorKind::Economy,
                    Execution::Construct {
                        unit_type: UnitType::Warship,
                        tile,
                    },
                    1.0,
                    Priority::Normal,
                    "first warship",
                ))
            }
            _ => {
                warn!(player = %me, port = port.0, "no buildable ocean tile for warship");
                None
            }
        }
    }
}

impl<G: GameView> Advisor<G> for EconomyAdvisor {
    fn kind(&self) -> AdvisorKind {
        AdvisorKind::Economy
    }

    fn recommend(&mut self, ctx: &mut AdvisorContext<'_, G>) -> Result<Option<Recommendation>> {
        let order = build_order(&ctx.config.economy.build_plan, ctx.silo_urgent);
        let spendable = ctx.spendable_gold();

        for unit_type in order {
            if unit_type == UnitType::Warship {
                if let Some(rec) = self.warship(ctx) {
                    return Ok(Some(rec));
                }
                continue;
            }

            let owned = ctx.game.unit_count(ctx.player, unit_type);
            let cost = perceived_cost(ctx.cost(unit_type), unit_type, owned);
            if cost > spendable {
                trace!(player = %ctx.player, unit = unit_type.name(), cost, spendable, "cannot afford");
                continue;
            }
            let Some(tile) = self.best_tile(ctx, unit_type) else {
                continue;
            };
            let priority = if unit_type == UnitType::MissileSilo && ctx.silo_urgent {
                Priority::High
            } else {
                Priority::Normal
            };
            return Ok(Some(Recommendation::single(
                AdvisorKind::Economy,
                Execution::Construct { unit_type, tile },
                spendable as f64 / cost.max(1) as f64,
                priority,
                format!("build {} #{}", unit_type.name(), owned + 1),
            )));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::testing;
    use crate::config::AiConfig;
    use crate::game::{PlayerId, PlayerType, Terrain};
    use crate::rng::PseudoRandom;
    use crate::sim::GridWorld;

    fn coastal() -> (GridWorld, PlayerId) {
        let mut rows = vec!["~~~~~~~~~~~~~~~~~~~~"; 4];
        rows.extend(vec!["~~~~................"; 16]);
        let mut world = GridWorld::from_ascii(&rows);
        let me = world.add_player("Me", PlayerType::FakeHuman, None);
        world.claim_rect(me, 0, 0, 19, 19);
        (world, me)
    }

    #[test]
    fn test_cost_multipliers() {
        assert_eq!(cost_multiplier(UnitType::City, 0), 1);
        assert_eq!(cost_multiplier(UnitType::City, 3), 4);
        assert_eq!(cost_multiplier(UnitType::MissileSilo, 2), 9);
        assert_eq!(cost_multiplier(UnitType::Warship, 5), 1);
        assert_eq!(perceived_cost(u64::MAX, UnitType::SamLauncher, 4), u64::MAX);
    }

    #[test]
    fn test_build_order_moves_silo_first_when_urgent() {
        let plan = AiConfig::default().economy.build_plan;
        let calm = build_order(&plan, false);
        assert_eq!(calm, plan);
        let urgent = build_order(&plan, true);
        assert_eq!(urgent[0], UnitType::MissileSilo);
        assert_eq!(urgent[1], UnitType::City);
        assert_eq!(urgent.len(), plan.len());
    }

    #[test]
    fn test_builds_city_first_when_affordable() {
        let (mut world, me) = coastal();
        world.set_gold(me, 200_000);
        let config = AiConfig::default();
        let mut rng = PseudoRandom::new(5);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        let rec = EconomyAdvisor::new().recommend(&mut ctx).unwrap().unwrap();
        match rec.executions.as_slice() {
            [Execution::Construct { unit_type, tile }] => {
                assert_eq!(*unit_type, UnitType::City);
                assert!(world.can_build(me, UnitType::City, *tile));
            }
            _ => panic!("unexpected executions {:?}", rec.executions),
        }
    }

    #[test]
    fn test_urgent_silo_preempts_city() {
        let (mut world, me) = coastal();
        world.set_gold(me, 2_000_000);
        let config = AiConfig::default();
        let mut rng = PseudoRandom::new(5);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        ctx.silo_urgent = true;
        let rec = EconomyAdvisor::new().recommend(&mut ctx).unwrap().unwrap();
        assert!(matches!(
            rec.executions.as_slice(),
            [Execution::Construct { unit_type: UnitType::MissileSilo, .. }]
        ));
        assert_eq!(rec.priority, Priority::High);
    }

    #[test]
    fn test_reserve_blocks_spending() {
        let (mut world, me) = coastal();
        world.set_gold(me, 200_000);
        let config = AiConfig::default();
        let mut rng = PseudoRandom::new(5);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        ctx.reserve = 160_000;
        assert!(EconomyAdvisor::new().recommend(&mut ctx).unwrap().is_none());
    }

    #[test]
    fn test_second_city_costs_double() {
        let (mut world, me) = coastal();
        world.add_unit(me, UnitType::City, world.tile_ref(10, 10));
        world.set_gold(me, 200_000);
        let mut config = AiConfig::default();
        config.economy.build_plan = vec![UnitType::City];
        let mut rng = PseudoRandom::new(5);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        assert!(EconomyAdvisor::new().recommend(&mut ctx).unwrap().is_none());
    }

    #[test]
    fn test_port_goes_on_the_coast() {
        let (mut world, me) = coastal();
        world.set_gold(me, 200_000);
        let mut config = AiConfig::default();
        config.economy.build_plan = vec![UnitType::Port];
        let mut rng = PseudoRandom::new(8);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        let rec = EconomyAdvisor::new().recommend(&mut ctx).unwrap().unwrap();
        let [Execution::Construct { tile, .. }] = rec.executions.as_slice() else {
            panic!("expected one construction");
        };
        assert!(world.is_ocean_shore(*tile));
    }

    #[test]
    fn test_warship_near_port() {
        let (mut world, me) = coastal();
        world.add_unit(me, UnitType::Port, world.tile_ref(4, 4));
        world.set_gold(me, 300_000);
        let mut config = AiConfig::default();
        config.economy.build_plan = vec![UnitType::Warship];
        config.economy.warship_odds = 1;
        config.economy.warship_search_radius = 10;
        let mut rng = PseudoRandom::new(2);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        let rec = EconomyAdvisor::new().recommend(&mut ctx).unwrap().unwrap();
        let [Execution::Construct { unit_type, tile }] = rec.executions.as_slice() else {
            panic!("expected one construction");
        };
        assert_eq!(*unit_type, UnitType::Warship);
        assert!(world.is_ocean(*tile));

        world.add_unit(me, UnitType::Warship, *tile);
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        assert!(EconomyAdvisor::new().recommend(&mut ctx).unwrap().is_none());
    }

    #[test]
    fn test_plan_order_after_city_is_priced_out() {
        let (mut world, me) = coastal();
        for (x, y) in [(10, 10), (15, 15), (8, 17)] {
            world.add_unit(me, UnitType::City, world.tile_ref(x, y));
        }
        world.set_gold(me, 300_000);
        let config = AiConfig::default();
        let mut rng = PseudoRandom::new(5);

        // City now feels like 500k: the port comes next.
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        let rec = EconomyAdvisor::new().recommend(&mut ctx).unwrap().unwrap();
        assert!(matches!(
            rec.executions.as_slice(),
            [Execution::Construct { unit_type: UnitType::Port, .. }]
        ));

        // Ports priced out too and a warship already afloat: factory before
        // the defensive structures.
        world.add_unit(me, UnitType::Port, world.tile_ref(4, 6));
        world.add_unit(me, UnitType::Port, world.tile_ref(4, 12));
        world.add_unit(me, UnitType::Warship, world.tile_ref(1, 1));
        let mut ctx = testing::context(&world, me, &mut rng, &config);
        let rec = EconomyAdvisor::new().recommend(&mut ctx).unwrap().unwrap();
        assert!(matches!(
            rec.executions.as_slice(),
            [Execution::Construct { unit_type: UnitType::Factory, .. }]
        ));
    }
}
