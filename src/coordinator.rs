use crate::advisor::{
    strategic, Advisor, AdvisorContext, AdvisorKind, DiplomacyAdvisor, EconomyAdvisor,
    MilitaryAdvisor, Priority, Ratios, Recommendation, StrategicAdvisor,
};
use crate::advisor::military::expansion_attack;
use crate::config::AiConfig;
use crate::error::{AiError, Result};
use crate::game::{Execution, ExecutionSink, GameView, Gold, Nation, PlayerId, Tick, UnitType};
use crate::rng::PseudoRandom;
use crate::sampler::random_spawn_tile;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Not yet bound to a player in the game.
    Dormant,
    /// Choosing (and re-choosing) a spawn tile.
    Spawning,
    /// Spawned; waiting for the match proper to start.
    Uninitialized,
    /// First active tick: expansion only.
    Warming,
    Active,
    Dead,
}

/// What one eligible tick produced.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: Tick,
    pub executed: Vec<Recommendation>,
}

/// A computer-controlled nation.
pub struct FakeHuman {
    nation: Nation,
    config: AiConfig,
    rng: PseudoRandom,
    attack_rate: Tick,
    attack_tick: Tick,
    ratios: Ratios,
    phase: Phase,
    player: Option<PlayerId>,
    diplomacy: DiplomacyAdvisor,
    economy: EconomyAdvisor,
    strategic: StrategicAdvisor,
    military: MilitaryAdvisor,
}

fn percent(rng: &mut PseudoRandom, min: u32, max: u32) -> f64 {
    rng.next_int(min as i64, max as i64) as f64 / 100.0
}

impl FakeHuman {
    pub fn new(game_id: &str, nation: Nation, config: AiConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = PseudoRandom::for_nation(&nation.name, game_id);
        let c = &config.cadence;
        let attack_rate = rng.next_int(c.attack_rate_min as i64, c.attack_rate_max as i64) as Tick;
        let attack_tick = rng.next_int(0, attack_rate as i64) as Tick;
        let ratios = Ratios {
            trigger: percent(&mut rng, c.trigger_ratio_min, c.trigger_ratio_max),
            reserve: percent(&mut rng, c.reserve_ratio_min, c.reserve_ratio_max),
            expand: percent(&mut rng, c.expand_ratio_min, c.expand_ratio_max),
        };
        let strategic = StrategicAdvisor::new(
            config.strategic.target_cache_ticks,
            config.strategic.strike_memory_ticks,
        );
        let military = MilitaryAdvisor::new(config.targeting.strike_memory_ticks);

        Ok(Self {
            nation,
            config,
            rng,
            attack_rate,
            attack_tick,
            ratios,
            phase: Phase::Dormant,
            player: None,
            diplomacy: DiplomacyAdvisor::new(),
            economy: EconomyAdvisor::new(),
            strategic,
            military,
        })
    }

    pub fn nation(&self) -> &Nation {
        &self.nation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn attack_rate(&self) -> Tick {
        self.attack_rate
    }

    pub fn attack_tick(&self) -> Tick {
        self.attack_tick
    }

    pub fn ratios(&self) -> Ratios {
        self.ratios
    }

    pub fn player(&self) -> Result<PlayerId> {
        self.player.ok_or(AiError::PlayerNotBound)
    }

    pub fn is_eligible_tick(&self, tick: Tick) -> bool {
        tick % self.attack_rate == self.attack_tick
    }

    pub fn reserve_threshold<G: GameView>(&self, game: &G) -> Result<Gold> {
        let me = self.player()?;
        Ok(strategic::reserve_threshold(game, me, &self.config.strategic))
    }

    fn bind<G: GameView>(&mut self, game: &G) -> bool {
        if game.players().contains(&self.nation.id) {
            self.player = Some(self.nation.id);
            debug!(nation = %self.nation.name, player = %self.nation.id, "bound");
            true
        } else {
            false
        }
    }

    /// Run one tick. Ineligible ticks do nothing.
    pub fn tick<G: GameView, S: ExecutionSink>(&mut self, game: &G, sink: &mut S) -> TickReport {
        let tick = game.ticks();
        let mut report = TickReport {
            tick,
            executed: Vec::new(),
        };
        if self.phase == Phase::Dead || !self.is_eligible_tick(tick) {
            return report;
        }

        if self.phase == Phase::Dormant {
            if !self.bind(game) {
                return report;
            }
            self.phase = if game.in_spawn_phase() {
                Phase::Spawning
            } else {
                Phase::Uninitialized
            };
        }
        let Ok(me) = self.player() else {
            return report;
        };
        if !game.is_alive(me) {
            info!(nation = %self.nation.name, "eliminated");
            self.phase = Phase::Dead;
            return report;
        }

        match self.phase {
            Phase::Spawning => {
                if game.in_spawn_phase() {
                    self.spawn(game, me, sink);
                    return report;
                }
                self.phase = Phase::Uninitialized;
                self.warm_up(game, me, sink, &mut report);
            }
            Phase::Uninitialized => self.warm_up(game, me, sink, &mut report),
            Phase::Warming | Phase::Active => {
                self.phase = Phase::Active;
                self.consult_advisors(game, me, sink, &mut report);
            }
            Phase::Dormant | Phase::Dead => {}
        }
        report
    }

    fn spawn<G: GameView, S: ExecutionSink>(&mut self, game: &G, me: PlayerId, sink: &mut S) {
        let cadence = &self.config.cadence;
        match random_spawn_tile(
            game,
            &mut self.rng,
            self.nation.spawn_cell,
            cadence.spawn_search_delta,
            cadence.spawn_attempts,
        ) {
            Some(tile) => sink.add_execution(me, Execution::Spawn { tile }),
            None => warn!(nation = %self.nation.name, "no spawn tile found"),
        }
    }

    /// First tick after spawning: grab unclaimed land and nothing else.
    fn warm_up<G: GameView, S: ExecutionSink>(
        &mut self,
        game: &G,
        me: PlayerId,
        sink: &mut S,
        report: &mut TickReport,
    ) {
        if game.in_spawn_phase() || game.tiles_owned(me) == 0 {
            self.phase = Phase::Uninitialized;
            return;
        }
        self.phase = Phase::Warming;
        if let Some(execution) = expansion_attack(game, me, self.ratios.expand) {
            let rec = Recommendation::single(
                AdvisorKind::Military,
                execution,
                0.0,
                Priority::Normal,
                "initial expansion",
            );
            for execution in &rec.executions {
                sink.add_execution(me, execution.clone());
            }
            report.executed.push(rec);
        }
    }

    /// Diplomacy, economy, strategic, military; every recommendation runs.
    fn consult_advisors<G: GameView, S: ExecutionSink>(
        &mut self,
        game: &G,
        me: PlayerId,
        sink: &mut S,
        report: &mut TickReport,
    ) {
        let threat = self
            .strategic
            .threat(game, me, &self.config.strategic)
            .is_some();
        let mut reserve = strategic::reserve_threshold(game, me, &self.config.strategic);
        if threat && game.unit_count(me, UnitType::MissileSilo) > 0 {
            // Strike funds stay untouched while a strategic target is live.
            reserve = reserve.max(game.unit_cost(me, UnitType::Mirv));
        }
        let mut ctx = AdvisorContext {
            game,
            player: me,
            rng: &mut self.rng,
            config: &self.config,
            ratios: self.ratios,
            reserve,
            committed: 0,
            silo_urgent: strategic::silo_urgency(game, me, threat, &self.config.strategic),
        };

        let advisors: [&mut dyn Advisor<G>; 4] = [
            &mut self.diplomacy,
            &mut self.economy,
            &mut self.strategic,
            &mut self.military,
        ];
        for advisor in advisors {
            match advisor.recommend(&mut ctx) {
                Ok(Some(rec)) => {
                    ctx.commit(rec.gold_cost(game, me));
                    debug!(
                        player = %me,
                        advisor = rec.advisor.name(),
                        priority = rec.priority.name(),
                        reason = %rec.reason,
                        "executing"
                    );
                    for execution in &rec.executions {
                        sink.add_execution(me, execution.clone());
                    }
                    report.executed.push(rec);
                }
                Ok(None) => {}
                Err(err) => {
                    error!(player = %me, advisor = advisor.kind().name(), %err, "advisor failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Cell, PlayerType, Terrain};
    use crate::sim::GridWorld;
    use proptest::prelude::*;

    fn nation(id: PlayerId, name: &str, cell: Cell) -> Nation {
        Nation {
            id,
            name: name.to_owned(),
            spawn_cell: cell,
            player_type: PlayerType::FakeHuman,
        }
    }

    /// Advance the world until the agent's next eligible tick.
    fn to_next_eligible(world: &mut GridWorld, agent: &FakeHuman) {
        while !agent.is_eligible_tick(world.ticks()) {
            world.step();
        }
    }

    fn run_eligible(world: &mut GridWorld, agent: &mut FakeHuman) -> TickReport {
        to_next_eligible(world, agent);
        let mut sink: Vec<(PlayerId, Execution)> = Vec::new();
        let report = agent.tick(&*world, &mut sink);
        for (actor, execution) in &sink {
            world.apply(*actor, execution);
        }
        world.step();
        report
    }

    #[test]
    fn test_cadence_is_deterministic() {
        let a = FakeHuman::new("g1", nation(PlayerId(0), "Spain", Cell::new(0, 0)), AiConfig::default()).unwrap();
        let b = FakeHuman::new("g1", nation(PlayerId(0), "Spain", Cell::new(0, 0)), AiConfig::default()).unwrap();
        assert_eq!(a.attack_rate(), b.attack_rate());
        assert_eq!(a.attack_tick(), b.attack_tick());
        assert_eq!(a.ratios(), b.ratios());
    }

    #[test]
    fn test_ineligible_ticks_do_nothing() {
        let mut world = GridWorld::filled(30, 30, Terrain::Plains);
        let me = world.add_player("Spain", PlayerType::FakeHuman, None);
        let mut agent = FakeHuman::new("g", nation(me, "Spain", Cell::new(15, 15)), AiConfig::default()).unwrap();
        world.set_tick(agent.attack_tick() + 1);
        let mut sink: Vec<(PlayerId, Execution)> = Vec::new();
        let report = agent.tick(&world, &mut sink);
        assert!(sink.is_empty() && report.executed.is_empty());
        assert_eq!(agent.phase(), Phase::Dormant);
        assert!(matches!(agent.player(), Err(AiError::PlayerNotBound)));
    }

    #[test]
    fn test_lifecycle_spawn_warm_active() {
        let mut world = GridWorld::filled(40, 40, Terrain::Plains);
        world.set_spawn_phase_ticks(200);
        let me = world.add_player("Spain", PlayerType::FakeHuman, None);
        let mut agent = FakeHuman::new("g", nation(me, "Spain", Cell::new(20, 20)), AiConfig::default()).unwrap();

        run_eligible(&mut world, &mut agent);
        assert_eq!(agent.phase(), Phase::Spawning);
        assert!(world.tiles_owned(me) > 0);

        world.set_tick(200);
        world.set_troops(me, 5_000);
        let report = run_eligible(&mut world, &mut agent);
        assert_eq!(agent.phase(), Phase::Warming);
        assert_eq!(report.executed.len(), 1);
        assert_eq!(report.executed[0].reason, "initial expansion");

        run_eligible(&mut world, &mut agent);
        assert_eq!(agent.phase(), Phase::Active);
    }

    #[test]
    fn test_dead_agent_stops() {
        let mut world = GridWorld::filled(10, 10, Terrain::Plains);
        let me = world.add_player("Spain", PlayerType::FakeHuman, None);
        world.claim_rect(me, 0, 0, 2, 2);
        let mut agent = FakeHuman::new("g", nation(me, "Spain", Cell::new(5, 5)), AiConfig::default()).unwrap();

        // Not in the game yet: stays dormant.
        world.player_mut(me).unwrap().alive = false;
        let report = run_eligible(&mut world, &mut agent);
        assert!(report.executed.is_empty());
        assert_eq!(agent.phase(), Phase::Dormant);

        world.player_mut(me).unwrap().alive = true;
        run_eligible(&mut world, &mut agent);
        assert_eq!(agent.phase(), Phase::Warming);

        world.player_mut(me).unwrap().alive = false;
        run_eligible(&mut world, &mut agent);
        assert_eq!(agent.phase(), Phase::Dead);
    }

    #[test]
    fn test_reserve_gates_economy_in_same_tick() {
        // Rich rival with a silo; we own a silo too, so a reserve applies.
        let mut world = GridWorld::filled(40, 20, Terrain::Plains);
        let me = world.add_player("Spain", PlayerType::FakeHuman, None);
        let rival = world.add_player("Rival", PlayerType::Human, None);
        world.claim_rect(me, 0, 0, 19, 19);
        world.claim_rect(rival, 20, 0, 39, 19);
        world.add_unit(me, UnitType::MissileSilo, world.tile_ref(2, 2));
        world.set_gold(rival, 20_000_000);
        world.set_gold(me, 2_000_000);
        let mut agent = FakeHuman::new("g", nation(me, "Spain", Cell::new(5, 5)), AiConfig::default()).unwrap();
        assert!(agent.reserve_threshold(&world).is_err());

        run_eligible(&mut world, &mut agent); // bind + warm up
        let report = run_eligible(&mut world, &mut agent);
        assert_eq!(agent.phase(), Phase::Active);
        assert!(agent.reserve_threshold(&world).unwrap() > 2_000_000);
        assert!(report
            .executed
            .iter()
            .all(|r| r.advisor != AdvisorKind::Economy));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = AiConfig::default();
        config.cadence.attack_rate_min = 0;
        config.cadence.attack_rate_max = 1;
        let result = FakeHuman::new("g", nation(PlayerId(0), "Spain", Cell::new(0, 0)), config);
        assert!(matches!(
            result,
            Err(AiError::InvalidConfig { field: "cadence.attack_rate_min", .. })
        ));
    }

    #[test]
    fn test_active_agent_is_silent_off_cadence() {
        let mut world = GridWorld::filled(40, 40, Terrain::Plains);
        let me = world.add_player("Spain", PlayerType::FakeHuman, None);
        let rival = world.add_player("Rival", PlayerType::Human, None);
        world.claim_rect(me, 0, 0, 9, 39);
        world.claim_rect(rival, 30, 0, 39, 39);
        let mut agent = FakeHuman::new("g", nation(me, "Spain", Cell::new(5, 5)), AiConfig::default()).unwrap();
        run_eligible(&mut world, &mut agent);
        run_eligible(&mut world, &mut agent);
        assert_eq!(agent.phase(), Phase::Active);

        for _ in 0..agent.attack_rate() * 2 {
            world.set_gold(me, 5_000_000);
            world.set_troops(me, world.max_troops(me));
            let tick = world.ticks();
            let mut sink: Vec<(PlayerId, Execution)> = Vec::new();
            let report = agent.tick(&world, &mut sink);
            if tick % agent.attack_rate() != agent.attack_tick() {
                assert!(sink.is_empty(), "acted on tick {tick}");
                assert!(report.executed.is_empty());
            } else {
                assert_eq!(report.tick, tick);
            }
            for (actor, execution) in &sink {
                world.apply(*actor, execution);
            }
            world.step();
        }
        assert_eq!(agent.phase(), Phase::Active);
    }

    #[test]
    fn test_victory_denial_survives_same_tick_spending() {
        // Rival holds 700 of 1000 tiles; we hold the rest, a silo and
        // barely more than a MIRV.
        let mut world = GridWorld::filled(50, 20, Terrain::Plains);
        let me = world.add_player("Spain", PlayerType::FakeHuman, None);
        let rival = world.add_player("Rival", PlayerType::Human, None);
        world.claim_rect(me, 0, 0, 14, 19);
        world.claim_rect(rival, 15, 0, 49, 19);
        world.add_unit(me, UnitType::MissileSilo, world.tile_ref(2, 2));
        let mut config = AiConfig::default();
        config.strategic.hesitation_odds = 0;
        let mut agent = FakeHuman::new("g", nation(me, "Spain", Cell::new(5, 5)), config).unwrap();

        run_eligible(&mut world, &mut agent);
        assert_eq!(agent.phase(), Phase::Warming);

        to_next_eligible(&mut world, &agent);
        world.set_gold(me, 35_100_000);
        world.set_gold(rival, 0);
        let mut sink: Vec<(PlayerId, Execution)> = Vec::new();
        let report = agent.tick(&world, &mut sink);
        assert_eq!(agent.phase(), Phase::Active);

        let strike = report
            .executed
            .iter()
            .find(|r| r.advisor == AdvisorKind::Strategic)
            .expect("MIRV launched");
        assert_eq!(strike.priority, Priority::Critical);
        let spent: Gold = report.executed.iter().map(|r| r.gold_cost(&world, me)).sum();
        assert!(spent <= 35_100_000);
        assert!(sink.iter().any(|(_, e)| matches!(
            e,
            Execution::Strike { weapon: UnitType::Mirv, .. }
        )));
    }

    proptest! {
        #[test]
        fn prop_cadence_in_range(name in "[A-Za-z]{1,12}", game in "[a-z0-9]{1,8}") {
            let agent = FakeHuman::new(&game, nation(PlayerId(1), &name, Cell::new(0, 0)), AiConfig::default()).unwrap();
            prop_assert!((40..80).contains(&agent.attack_rate()));
            prop_assert!(agent.attack_tick() < agent.attack_rate());
            let r = agent.ratios();
            prop_assert!((0.60..0.90).contains(&r.trigger));
            prop_assert!((0.30..0.60).contains(&r.reserve));
            prop_assert!((0.15..0.25).contains(&r.expand));
            let eligible = (0..agent.attack_rate() * 3).filter(|&t| agent.is_eligible_tick(t)).count();
            prop_assert_eq!(eligible, 3);
        }
    }
}
