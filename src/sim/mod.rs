mod rules;
pub mod world;

pub use world::{base_cost, GridWorld, PlayerState, Unit};

use crate::config::AiConfig;
use crate::coordinator::{FakeHuman, Phase};
use crate::csv_export::DecisionRecord;
use crate::error::Result;
use crate::game::{Cell, Execution, GameView, Nation, PlayerId, PlayerType, Terrain, Tick};
use rayon::prelude::*;
use std::time::Instant;

impl GridWorld {
    /// A single continent: ocean margin, a lake in the middle and a
    /// mountain ridge along one diagonal.
    pub fn continent(width: u32, height: u32, margin: u32) -> Self {
        let (w, h) = (width as i64, height as i64);
        let m = margin as i64;
        let (cx, cy) = (w / 2, h / 2);
        let lake = (w.min(h) / 10).max(1);
        let mut terrain = Vec::with_capacity((width * height) as usize);
        for y in 0..h {
            for x in 0..w {
                let t = if x < m || y < m || x >= w - m || y >= h - m {
                    Terrain::Ocean
                } else if (x - cx).pow(2) + (y - cy).pow(2) <= lake * lake {
                    Terrain::Lake
                } else if (x - y).abs() <= 1 && x % 4 != 0 {
                    Terrain::Mountain
                } else if (x + y) % 7 == 0 {
                    Terrain::Highland
                } else {
                    Terrain::Plains
                };
                terrain.push(t);
            }
        }
        Self::new(width, height, terrain)
    }
}

/// Timing and counts for one match tick.
#[derive(Debug, Default, Clone)]
pub struct PassStatistics {
    pub num_decisions: usize,
    pub num_executions: usize,
    pub decision_time: u128,
    pub apply_time: u128,
    pub step_time: u128,
}

impl PassStatistics {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of the match after a tick.
#[derive(Debug, Default, Clone)]
pub struct MatchStatistics {
    pub tick: Tick,
    pub alive_players: usize,
    pub active_agents: usize,
    pub land_tiles: usize,
    pub claimed_tiles: usize,
    pub leader: Option<(PlayerId, usize)>,
    pub pass_stats: PassStatistics,
}

impl MatchStatistics {
    pub fn claimed_share(&self) -> f64 {
        if self.land_tiles > 0 {
            self.claimed_tiles as f64 / self.land_tiles as f64
        } else {
            0.0
        }
    }

    pub fn leader_share(&self) -> f64 {
        match self.leader {
            Some((_, tiles)) if self.land_tiles > 0 => tiles as f64 / self.land_tiles as f64,
            _ => 0.0,
        }
    }
}

/// A world plus the agents playing in it.
pub struct Match {
    pub world: GridWorld,
    pub agents: Vec<FakeHuman>,
    pub pass_stats: PassStatistics,
}

impl Match {
    /// `nations` agents spread on a grid of spawn cells, plus `bots` static
    /// bot players each holding a small disk of land.
    pub fn setup(
        mut world: GridWorld,
        game_id: &str,
        nations: usize,
        bots: usize,
        spawn_phase_ticks: Tick,
        config: &AiConfig,
    ) -> Result<Self> {
        world.set_spawn_phase_ticks(spawn_phase_ticks);
        let cells = spread_cells(world.width(), world.height(), nations + bots);

        let mut agents = Vec::with_capacity(nations);
        for (i, cell) in cells.iter().take(nations).enumerate() {
            let name = format!("Nation {}", i + 1);
            let id = world.add_player(&name, PlayerType::FakeHuman, None);
            let nation = Nation {
                id,
                name,
                spawn_cell: *cell,
                player_type: PlayerType::FakeHuman,
            };
            agents.push(FakeHuman::new(game_id, nation, config.clone())?);
        }
        for (i, cell) in cells.iter().skip(nations).enumerate() {
            let id = world.add_player(&format!("Bot {}", i + 1), PlayerType::Bot, None);
            if world.is_valid_coord(cell.x, cell.y) {
                let center = world.tile_ref(cell.x, cell.y);
                world.claim_disk(id, center, 4, true);
            }
            world.set_troops(id, 2_000);
        }

        Ok(Self {
            world,
            agents,
            pass_stats: PassStatistics::default(),
        })
    }

    /// Decide in parallel over a frozen world, apply in agent order, then
    /// advance the world.
    pub fn step(&mut self) -> Vec<DecisionRecord> {
        self.pass_stats.reset();

        let start = Instant::now();
        let world = &self.world;
        let outcomes: Vec<(Vec<(PlayerId, Execution)>, Vec<DecisionRecord>)> = self
            .agents
            .par_iter_mut()
            .map(|agent| {
                let mut sink: Vec<(PlayerId, Execution)> = Vec::new();
                let report = agent.tick(world, &mut sink);
                let records = match agent.player() {
                    Ok(player) => report
                        .executed
                        .iter()
                        .map(|rec| DecisionRecord::new(report.tick, player, rec))
                        .collect(),
                    Err(_) => Vec::new(),
                };
                (sink, records)
            })
            .collect();
        self.pass_stats.decision_time = start.elapsed().as_micros();

        let start = Instant::now();
        let mut records = Vec::new();
        for (sink, decided) in outcomes {
            self.pass_stats.num_executions += sink.len();
            for (actor, execution) in &sink {
                self.world.apply(*actor, execution);
            }
            records.extend(decided);
        }
        self.pass_stats.num_decisions = records.len();
        self.pass_stats.apply_time = start.elapsed().as_micros();

        let start = Instant::now();
        self.world.step();
        self.pass_stats.step_time = start.elapsed().as_micros();

        records
    }

    pub fn get_statistics(&self) -> MatchStatistics {
        let players = self.world.players();
        let leader = players
            .iter()
            .map(|&p| (p, self.world.tiles_owned(p)))
            .fold(None, |best: Option<(PlayerId, usize)>, (p, t)| match best {
                Some((_, b)) if b >= t => best,
                _ => Some((p, t)),
            });
        MatchStatistics {
            tick: self.world.ticks(),
            alive_players: players.len(),
            active_agents: self
                .agents
                .iter()
                .filter(|a| a.phase() == Phase::Active)
                .count(),
            land_tiles: self.world.num_land_tiles(),
            claimed_tiles: players.iter().map(|&p| self.world.tiles_owned(p)).sum(),
            leader,
            pass_stats: self.pass_stats.clone(),
        }
    }
}

/// Evenly spaced cells on a near-square lattice inside the map.
fn spread_cells(width: u32, height: u32, n: usize) -> Vec<Cell> {
    if n == 0 {
        return Vec::new();
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);
    let (w, h) = (width as usize, height as usize);
    (0..n)
        .map(|i| {
            let (col, row) = (i % cols, i / cols);
            let x = (2 * col + 1) * w / (2 * cols);
            let y = (2 * row + 1) * h / (2 * rows);
            Cell::new(x as i32, y as i32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continent_has_ocean_margin() {
        let world = GridWorld::continent(40, 30, 3);
        assert!(world.is_ocean(world.tile_ref(0, 0)));
        assert!(world.is_ocean(world.tile_ref(39, 29)));
        assert_eq!(world.terrain(world.tile_ref(20, 15)), Terrain::Lake);
        assert!(world.is_land(world.tile_ref(5, 20)));
        assert!(world.num_land_tiles() > 500);
    }

    #[test]
    fn test_spread_cells() {
        let cells = spread_cells(100, 100, 4);
        assert_eq!(
            cells,
            vec![Cell::new(25, 25), Cell::new(75, 25), Cell::new(25, 75), Cell::new(75, 75)]
        );
        assert!(spread_cells(100, 100, 0).is_empty());
    }

    #[test]
    fn test_match_runs_and_agents_claim_land() {
        let world = GridWorld::continent(80, 60, 4);
        let mut game = Match::setup(world, "test", 3, 2, 100, &AiConfig::default()).unwrap();
        for _ in 0..400 {
            game.step();
        }
        let stats = game.get_statistics();
        assert_eq!(stats.tick, 400);
        assert!(stats.active_agents > 0);
        assert!(game
            .agents
            .iter()
            .filter_map(|a| a.player().ok())
            .any(|me| game.world.tiles_owned(me) > 0));
        assert!(stats.claimed_share() > 0.0 && stats.claimed_share() <= 1.0);
    }

    #[test]
    fn test_setup_rejects_invalid_config() {
        let mut config = AiConfig::default();
        config.cadence.attack_rate_min = 0;
        let world = GridWorld::continent(40, 30, 3);
        assert!(Match::setup(world, "bad", 2, 0, 50, &config).is_err());
    }

    #[test]
    fn test_match_is_deterministic() {
        let run = || {
            let world = GridWorld::continent(60, 40, 3);
            let mut game = Match::setup(world, "same", 2, 1, 80, &AiConfig::default()).unwrap();
            let mut log = Vec::new();
            for _ in 0..300 {
                log.extend(game.step().into_iter().map(|r| (r.tick, r.player, r.reason)));
            }
            (log, game.get_statistics().claimed_tiles)
        };
        assert_eq!(run(), run());
    }
}
