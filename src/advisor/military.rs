use super::{Advisor, AdvisorContext, AdvisorKind, Priority, Recommendation};
use crate::error::Result;
use crate::game::{Execution, GameView, Owner, PlayerId, PlayerType, Relation, Tick, TileRef, Troops, UnitType};
use crate::sampler::{random_ocean_shore_tile, sample_coastline};
use crate::targeting::{select_strike_tile, StrikeMemory};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

/// Land tiles next to our border that we don't own.
pub fn enemy_frontier<G: GameView>(game: &G, me: PlayerId) -> Vec<TileRef> {
    let mut seen = FxHashSet::default();
    game.border_tiles(me)
        .into_iter()
        .flat_map(|t| game.neighbors(t))
        .filter(|&n| game.is_land(n) && game.owner(n) != Owner::Player(me))
        .filter(|n| seen.insert(*n))
        .collect()
}

/// Troops above `ratio` of max troops, if any.
fn surplus<G: GameView>(game: &G, me: PlayerId, ratio: f64) -> Troops {
    let keep = (game.max_troops(me) as f64 * ratio) as Troops;
    game.troops(me).saturating_sub(keep)
}

/// Attack unclaimed land with everything above the expansion reserve.
pub fn expansion_attack<G: GameView>(game: &G, me: PlayerId, expand_ratio: f64) -> Option<Execution> {
    let troops = surplus(game, me, expand_ratio);
    (troops > 0).then_some(Execution::Attack {
        target: Owner::Nobody,
        troops,
    })
}

#[derive(Debug, Clone)]
pub struct MilitaryAdvisor {
    enemy: Option<PlayerId>,
    enemy_updated: Tick,
    /// Conventional nukes only.
    memory: StrikeMemory,
}

impl MilitaryAdvisor {
    pub fn new(memory_ticks: Tick) -> Self {
        Self {
            enemy: None,
            enemy_updated: 0,
            memory: StrikeMemory::new(memory_ticks),
        }
    }

    pub fn enemy(&self) -> Option<PlayerId> {
        self.enemy
    }

    fn set_enemy(&mut self, enemy: PlayerId, now: Tick) {
        if self.enemy != Some(enemy) {
            debug!(enemy = %enemy, "new enemy");
        }
        self.enemy = Some(enemy);
        self.enemy_updated = now;
    }

    /// Biggest current attacker becomes the enemy; stale, dead or
    /// befriended enemies are dropped.
    pub fn refresh_enemy<G: GameView>(&mut self, game: &G, me: PlayerId, memory_ticks: Tick) {
        let now = game.ticks();
        let mut biggest: Option<(PlayerId, Troops)> = None;
        for attack in game.incoming_attacks(me) {
            if game.is_friendly(me, attack.attacker) {
                continue;
            }
            if biggest.map_or(true, |(_, t)| attack.troops > t) {
                biggest = Some((attack.attacker, attack.troops));
            }
        }
        if let Some((attacker, _)) = biggest {
            self.set_enemy(attacker, now);
        }

        if let Some(enemy) = self.enemy {
            let stale = now.saturating_sub(self.enemy_updated) > memory_ticks;
            if stale || !game.is_alive(enemy) || game.is_friendly(me, enemy) {
                self.enemy = None;
            }
        }
    }

    /// Bots by density, then the hostile player (neighbors first), then
    /// the weakest clearly-outmatched neighbor.
    pub fn select_enemy<G: GameView>(
        &mut self,
        game: &G,
        me: PlayerId,
        trigger_ratio: f64,
        strength_ratio: f64,
    ) -> Option<PlayerId> {
        if self.enemy.is_some() {
            return self.enemy;
        }
        let troops = game.troops(me);
        if (troops as f64) < game.max_troops(me) as f64 * trigger_ratio {
            return None;
        }

        let neighbors: Vec<PlayerId> = game
            .neighbor_players(me)
            .into_iter()
            .filter(|&p| !game.is_friendly(me, p))
            .collect();

        let density = |p: PlayerId| game.troops(p) as f64 / game.tiles_owned(p).max(1) as f64;
        let mut choice: Option<(PlayerId, f64)> = None;
        for &p in &neighbors {
            if game.player_type(p) != PlayerType::Bot {
                continue;
            }
            let d = density(p);
            if choice.map_or(true, |(_, best)| d < best) {
                choice = Some((p, d));
            }
        }
        let mut pick = choice.map(|(p, _)| p);

        if pick.is_none() {
            let hostile = |p: &PlayerId| {
                *p != me && !game.is_friendly(me, *p) && game.relation(me, *p) <= Relation::Hostile
            };
            pick = neighbors
                .iter()
                .copied()
                .find(hostile)
                .or_else(|| game.players().into_iter().find(hostile));
        }

        if pick.is_none() {
            let mut weakest: Option<(PlayerId, Troops)> = None;
            for &p in &neighbors {
                let theirs = game.troops(p);
                if theirs as f64 * strength_ratio >= troops as f64 {
                    continue;
                }
                if weakest.map_or(true, |(_, t)| theirs < t) {
                    weakest = Some((p, theirs));
                }
            }
            pick = weakest.map(|(p, _)| p);
        }

        if let Some(enemy) = pick {
            self.set_enemy(enemy, game.ticks());
        }
        pick
    }

    /// Boat from one of our shores to any reachable foreign shore.
    fn random_boat<G: GameView>(&self, ctx: &mut AdvisorContext<'_, G>) -> Option<Recommendation> {
        let config = ctx.config;
        let cfg = &config.military;
        let (game, me) = (ctx.game, ctx.player);
        let troops = game.troops(me) / cfg.boat_troop_divisor;
        if troops == 0 {
            return None;
        }
        let origin = *sample_coastline(game, ctx.rng, me, 1).first()?;
        let destination = random_ocean_shore_tile(
            game,
            ctx.rng,
            me,
            origin,
            cfg.boat_search_radius,
            cfg.boat_search_attempts,
        )?;
        Some(Recommendation::single(
            AdvisorKind::Military,
            Execution::TransportShip {
                destination,
                troops,
            },
            troops as f64,
            Priority::Low,
            "random boat",
        ))
    }

    fn nuke<G: GameView>(
        &mut self,
        ctx: &mut AdvisorContext<'_, G>,
        enemy: PlayerId,
    ) -> Result<Option<Recommendation>> {
        let (game, me) = (ctx.game, ctx.player);
        if game.player_type(enemy) == PlayerType::Bot
            || game.unit_count(me, UnitType::MissileSilo) == 0
        {
            return Ok(None);
        }
        let spendable = ctx.spendable_gold();
        let weapon = if spendable > ctx.cost(UnitType::HydrogenBomb) {
            UnitType::HydrogenBomb
        } else if spendable >= ctx.cost(UnitType::AtomBomb) {
            UnitType::AtomBomb
        } else {
            return Ok(None);
        };

        let now = ctx.tick();
        self.memory.evict(now);
        let plan = select_strike_tile(
            game,
            ctx.rng,
            me,
            enemy,
            weapon,
            &self.memory,
            &ctx.config.targeting,
        )?;
        let Some(plan) = plan else {
            trace!(player = %me, enemy = %enemy, "no admissible strike tile");
            return Ok(None);
        };
        self.memory.record(now, plan.tile);
        Ok(Some(Recommendation::single(
            AdvisorKind::Military,
            Execution::Strike {
                weapon,
                tile: plan.tile,
            },
            plan.score,
            Priority::High,
            format!("{} on {}", weapon.name(), enemy),
        )))
    }

    fn attack<G: GameView>(&self, ctx: &mut AdvisorContext<'_, G>, enemy: PlayerId) -> Option<Recommendation> {
        let (game, me) = (ctx.game, ctx.player);
        if game.shares_border_with(me, enemy) {
            let troops = surplus(game, me, ctx.ratios.reserve);
            if troops == 0 {
                return None;
            }
            return Some(Recommendation::single(
                AdvisorKind::Military,
                Execution::Attack {
                    target: Owner::Player(enemy),
                    troops,
                },
                troops as f64,
                Priority::High,
                format!("attack {enemy}"),
            ));
        }

        let troops = game.troops(me) / ctx.config.military.boat_troop_divisor;
        if troops == 0 || sample_coastline(game, ctx.rng, me, 1).is_empty() {
            return None;
        }
        let destination = *sample_coastline(game, ctx.rng, enemy, 1).first()?;
        Some(Recommendation::single(
            AdvisorKind::Military,
            Execution::TransportShip {
                destination,
                troops,
            },
            troops as f64,
            Priority::Normal,
            format!("naval attack on {enemy}"),
        ))
    }
}

impl<G: GameView> Advisor<G> for MilitaryAdvisor {
    fn kind(&self) -> AdvisorKind {
        AdvisorKind::Military
    }

    fn recommend(&mut self, ctx: &mut AdvisorContext<'_, G>) -> Result<Option<Recommendation>> {
        let config = ctx.config;
        let cfg = &config.military;
        let (game, me) = (ctx.game, ctx.player);
        self.refresh_enemy(game, me, cfg.enemy_memory_ticks);

        let frontier = enemy_frontier(game, me);
        if frontier.is_empty() {
            if ctx.rng.chance(cfg.landlocked_boat_odds) {
                return Ok(self.random_boat(ctx));
            }
            return Ok(None);
        }

        if ctx.rng.chance(cfg.boat_odds) {
            if let Some(rec) = self.random_boat(ctx) {
                return Ok(Some(rec));
            }
        }

        if frontier.iter().any(|&t| !game.owner(t).is_player()) {
            if let Some(execution) = expansion_attack(game, me, ctx.ratios.expand) {
                let troops = match execution {
                    Execution::Attack { troops, .. } => troops,
                    _ => 0,
                };
                return Ok(Some(Recommendation::single(
                    AdvisorKind::Military,
                    execution,
                    troops as f64,
                    Priority::Normal,
                    "expand into unclaimed land",
                )));
            }
            return Ok(None);
        }

        let Some(enemy) = self.select_enemy(game, me, ctx.ratios.trigger, cfg.strength_ratio) else {
            return Ok(None);
        };
        if let Some(rec) = self.nuke(ctx, enemy)? {
            return Ok(Some(rec));
        }
        Ok(self.attack(ctx, enemy))
    }
}
