use crate::config::{SteamrollMetric, StrategicConfig, TargetingConfig};
use crate::error::{AiError, Result};
use crate::game::{GameView, Owner, PlayerId, PlayerType, Tick, TileRef, UnitType};
use crate::rng::PseudoRandom;
use crate::sampler::sample_territory;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Sliding window of recent strikes, oldest first.
#[derive(Debug, Clone)]
pub struct StrikeMemory {
    max_age: Tick,
    entries: VecDeque<(Tick, TileRef)>,
}

impl StrikeMemory {
    pub fn new(max_age: Tick) -> Self {
        Self {
            max_age,
            entries: VecDeque::new(),
        }
    }

    pub fn record(&mut self, tick: Tick, tile: TileRef) {
        self.entries.push_back((tick, tile));
    }

    /// Drop entries older than `max_age` relative to `now`.
    pub fn evict(&mut self, now: Tick) {
        while let Some(&(tick, _)) = self.entries.front() {
            if tick + self.max_age < now {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.entries.back().map(|&(tick, _)| tick)
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileRef> + '_ {
        self.entries.iter().map(|&(_, tile)| tile)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// True when every on-map tile within euclidean `radius` of `center` is
/// owned by `target`.
pub fn footprint_owned_by<G: GameView>(
    game: &G,
    center: TileRef,
    radius: u32,
    target: PlayerId,
) -> bool {
    let c = game.cell(center);
    let r = radius as i32;
    let r2 = (radius as i64) * (radius as i64);
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx as i64) * (dx as i64) + (dy as i64) * (dy as i64) > r2 {
                continue;
            }
            let (x, y) = (c.x + dx, c.y + dy);
            if !game.is_valid_coord(x, y) {
                continue;
            }
            if game.owner(game.tile_ref(x, y)) != Owner::Player(target) {
                return false;
            }
        }
    }
    true
}

/// Full and half radius must both be clean; the half-radius pass rejects
/// enclaves near the center cheaply before the full scan.
pub fn is_admissible_strike<G: GameView>(
    game: &G,
    center: TileRef,
    radius: u32,
    target: PlayerId,
) -> bool {
    footprint_owned_by(game, center, radius / 2, target)
        && footprint_owned_by(game, center, radius, target)
}

/// Heuristic value of striking `tile`.
pub fn strike_tile_score<G: GameView>(
    game: &G,
    attacker: PlayerId,
    tile: TileRef,
    silos: &[TileRef],
    structures: &[(UnitType, TileRef)],
    memory: &StrikeMemory,
    cfg: &TargetingConfig,
) -> Result<f64> {
    let value_r2 = (cfg.value_radius as u64).pow(2);
    let sam_r2 = (cfg.sam_radius as u64).pow(2);

    let mut value: f64 = structures
        .iter()
        .filter(|(_, t)| game.euclidean_dist_squared(tile, *t) <= value_r2)
        .map(|(unit_type, _)| cfg.structure_value(*unit_type))
        .sum();

    let sams = structures
        .iter()
        .filter(|(unit_type, t)| {
            *unit_type == UnitType::SamLauncher && game.euclidean_dist_squared(tile, *t) <= sam_r2
        })
        .count();
    value -= cfg.sam_penalty * sams as f64;

    let closest_silo = silos
        .iter()
        .map(|&s| game.euclidean_dist_squared(tile, s))
        .min()
        .ok_or(AiError::MissingSilo(attacker))?;
    value -= (closest_silo as f64).sqrt() * cfg.silo_distance_weight;

    let recent = memory
        .tiles()
        .filter(|&t| game.euclidean_dist_squared(tile, t) <= value_r2)
        .count();
    value -= cfg.recent_strike_penalty * recent as f64;

    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikePlan {
    pub tile: TileRef,
    pub score: f64,
}

/// Best admissible tile to hit `target` with `weapon`, if any beats the
/// configured minimum.
pub fn select_strike_tile<G: GameView>(
    game: &G,
    rng: &mut PseudoRandom,
    attacker: PlayerId,
    target: PlayerId,
    weapon: UnitType,
    memory: &StrikeMemory,
    cfg: &TargetingConfig,
) -> Result<Option<StrikePlan>> {
    let silos: Vec<TileRef> = game
        .units(attacker, &[UnitType::MissileSilo])
        .into_iter()
        .map(|u| u.tile)
        .collect();
    if silos.is_empty() {
        return Err(AiError::MissingSilo(attacker));
    }

    let structures: Vec<(UnitType, TileRef)> = game
        .units(target, &UnitType::STRIKE_RELEVANT)
        .into_iter()
        .map(|u| (u.unit_type, u.tile))
        .collect();

    let mut candidates = sample_territory(game, rng, target, cfg.territory_samples);
    candidates.extend(structures.iter().map(|&(_, t)| t));
    let mut seen = FxHashSet::default();
    candidates.retain(|t| seen.insert(*t));

    let radius = cfg.damage_radius(weapon);
    let mut best: Option<StrikePlan> = None;
    for tile in candidates {
        if !is_admissible_strike(game, tile, radius, target) {
            continue;
        }
        if !game.can_build(attacker, weapon, tile) {
            continue;
        }
        let score = strike_tile_score(game, attacker, tile, &silos, &structures, memory, cfg)?;
        if score <= cfg.min_strike_score {
            continue;
        }
        if best.map_or(true, |b| score > b.score) {
            best = Some(StrikePlan { tile, score });
        }
    }
    Ok(best)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrikeReason {
    CounterStrike,
    VictoryDenial,
    SteamrollPrevention,
}

impl StrikeReason {
    pub fn name(self) -> &'static str {
        match self {
            StrikeReason::CounterStrike => "counter-strike",
            StrikeReason::VictoryDenial => "victory denial",
            StrikeReason::SteamrollPrevention => "steamroll prevention",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategicTarget {
    pub player: PlayerId,
    pub reason: StrikeReason,
    /// Territory share, structure count or threat size, depending on reason.
    pub weight: f64,
}

/// Alive, not us, not friendly, not a bot.
pub fn is_valid_strategic_target<G: GameView>(game: &G, me: PlayerId, other: PlayerId) -> bool {
    other != me
        && game.is_alive(other)
        && game.player_type(other) != PlayerType::Bot
        && !game.is_friendly(me, other)
}

/// Short-lived list of valid strategic targets.
#[derive(Debug, Clone)]
pub struct TargetCache {
    ttl: Tick,
    computed_at: Option<Tick>,
    targets: Vec<PlayerId>,
}

impl TargetCache {
    pub fn new(ttl: Tick) -> Self {
        Self {
            ttl,
            computed_at: None,
            targets: Vec::new(),
        }
    }

    pub fn targets<G: GameView>(&mut self, game: &G, me: PlayerId) -> &[PlayerId] {
        let now = game.ticks();
        let stale = match self.computed_at {
            None => true,
            Some(at) => now < at || now >= at + self.ttl,
        };
        if stale {
            self.targets = game
                .players()
                .into_iter()
                .filter(|&p| is_valid_strategic_target(game, me, p))
                .collect();
            self.computed_at = Some(now);
        }
        &self.targets
    }

    pub fn invalidate(&mut self) {
        self.computed_at = None;
    }
}

/// First element with the maximum key; later ties lose.
fn first_max_by<T: Copy, F: Fn(T) -> f64>(items: impl IntoIterator<Item = T>, key: F) -> Option<(T, f64)> {
    let mut best: Option<(T, f64)> = None;
    for item in items {
        let k = key(item);
        if best.map_or(true, |(_, b)| k > b) {
            best = Some((item, k));
        }
    }
    best
}

/// A target currently flying a MIRV at our land; the largest one wins.
pub fn counter_strike_target<G: GameView>(
    game: &G,
    me: PlayerId,
    targets: &[PlayerId],
) -> Option<StrategicTarget> {
    let attackers = targets.iter().copied().filter(|&p| {
        game.is_alive(p)
            && game
                .units(p, &[UnitType::Mirv])
                .iter()
                .any(|u| u.target.is_some_and(|t| game.owner(t) == Owner::Player(me)))
    });
    first_max_by(attackers, |p| game.tiles_owned(p) as f64).map(|(player, weight)| StrategicTarget {
        player,
        reason: StrikeReason::CounterStrike,
        weight,
    })
}

/// A team or individual close to owning the map.
pub fn victory_denial_target<G: GameView>(
    game: &G,
    targets: &[PlayerId],
    cfg: &StrategicConfig,
) -> Option<StrategicTarget> {
    let total = game.num_land_tiles();
    if total == 0 {
        return None;
    }
    let share = |tiles: usize| tiles as f64 / total as f64;

    let mut team_tiles: FxHashMap<_, usize> = FxHashMap::default();
    for p in game.players() {
        if let Some(team) = game.team(p) {
            *team_tiles.entry(team).or_default() += game.tiles_owned(p);
        }
    }

    let mut candidates: Vec<(PlayerId, f64)> = Vec::new();
    let mut qualifying_teams = FxHashSet::default();
    let mut teams: Vec<_> = team_tiles.into_iter().collect();
    teams.sort_unstable_by_key(|(team, _)| *team);
    for (team, tiles) in teams {
        let team_share = share(tiles);
        if team_share < cfg.team_victory_share {
            continue;
        }
        qualifying_teams.insert(team);
        let members = targets
            .iter()
            .copied()
            .filter(|&p| game.is_alive(p) && game.team(p) == Some(team));
        if let Some((largest, _)) = first_max_by(members, |p| game.tiles_owned(p) as f64) {
            candidates.push((largest, team_share));
        }
    }

    for &p in targets {
        if !game.is_alive(p) {
            continue;
        }
        if game.team(p).is_some_and(|t| qualifying_teams.contains(&t)) {
            continue;
        }
        let individual = share(game.tiles_owned(p));
        if individual >= cfg.individual_victory_share {
            candidates.push((p, individual));
        }
    }

    first_max_by(candidates, |(_, s)| s).map(|((player, _), weight)| StrategicTarget {
        player,
        reason: StrikeReason::VictoryDenial,
        weight,
    })
}

pub fn structure_count<G: GameView>(game: &G, player: PlayerId, metric: SteamrollMetric) -> usize {
    match metric {
        SteamrollMetric::KeyStructures => game.units(player, &UnitType::KEY_STRUCTURES).len(),
        SteamrollMetric::CitiesOnly => game.unit_count(player, UnitType::City),
    }
}

/// The structural leader, if it is far enough ahead of the runner-up.
pub fn steamroll_target<G: GameView>(
    game: &G,
    targets: &[PlayerId],
    cfg: &StrategicConfig,
) -> Option<StrategicTarget> {
    let counts: Vec<(PlayerId, usize)> = game
        .players()
        .into_iter()
        .map(|p| (p, structure_count(game, p, cfg.steamroll_metric)))
        .collect();
    let ((leader, leader_count), _) = first_max_by(counts.iter().copied(), |(_, c)| c as f64)?;
    let runner_up = counts
        .iter()
        .filter(|(p, _)| *p != leader)
        .map(|&(_, c)| c)
        .max()
        .unwrap_or(0);

    if leader_count < cfg.steamroll_floor {
        return None;
    }
    if (leader_count as f64) <= cfg.steamroll_gap * runner_up as f64 {
        return None;
    }
    if !targets.contains(&leader) {
        return None;
    }
    Some(StrategicTarget {
        player: leader,
        reason: StrikeReason::SteamrollPrevention,
        weight: leader_count as f64,
    })
}

/// Counter-strike, then victory denial, then steamroll prevention.
pub fn select_strategic_target<G: GameView>(
    game: &G,
    me: PlayerId,
    targets: &[PlayerId],
    cfg: &StrategicConfig,
) -> Option<StrategicTarget> {
    counter_strike_target(game, me, targets)
        .or_else(|| victory_denial_target(game, targets, cfg))
        .or_else(|| steamroll_target(game, targets, cfg))
}

/// Mean of owned-tile coordinates, snapped to the nearest owned tile.
pub fn territory_centroid<G: GameView>(game: &G, player: PlayerId) -> Option<TileRef> {
    let tiles = game.territory(player);
    if tiles.is_empty() {
        return None;
    }
    let n = tiles.len() as f64;
    let (sx, sy) = tiles.iter().fold((0.0, 0.0), |(sx, sy), &t| {
        let c = game.cell(t);
        (sx + c.x as f64, sy + c.y as f64)
    });
    let (mx, my) = (sx / n, sy / n);
    first_max_by(tiles, |t| {
        let c = game.cell(t);
        let (dx, dy) = (c.x as f64 - mx, c.y as f64 - my);
        -(dx * dx + dy * dy)
    })
    .map(|(t, _)| t)
}
