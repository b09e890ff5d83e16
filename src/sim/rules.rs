use super::world::{base_cost, GridWorld};
use crate::game::{Execution, GameView, Owner, PlayerId, TileRef, Troops, UnitType};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

/// Troops spent per captured tile.
const UNCLAIMED_TILE_COST: Troops = 5;
const CONTESTED_TILE_COST: Troops = 20;
const MAX_CAPTURE_WAVES: usize = 10;
const STRIKE_FLIGHT_TICKS: u64 = 10;
const ATTACK_MEMORY_TICKS: u64 = 50;
const SPAWN_RADIUS: i32 = 3;
const BOAT_LANDING_RADIUS: i32 = 2;

// No pathfinding and no unit combat: territory changes hands in
// proportional chunks.
impl GridWorld {
    /// Apply one execution. Invalid requests are dropped with a log line.
    pub fn apply(&mut self, actor: PlayerId, execution: &Execution) {
        if !self.is_alive(actor) {
            return;
        }
        match *execution {
            Execution::Spawn { tile } => self.apply_spawn(actor, tile),
            Execution::Attack { target, troops } => self.apply_attack(actor, target, troops),
            Execution::TransportShip { destination, troops } => {
                self.apply_boat(actor, destination, troops)
            }
            Execution::Construct { unit_type, tile } => {
                if !self.can_build(actor, unit_type, tile) {
                    warn!(player = %actor, unit = unit_type.name(), tile = tile.0, "construction rejected");
                    return;
                }
                self.spend(actor, base_cost(unit_type));
                self.add_unit(actor, unit_type, tile);
            }
            Execution::Strike { weapon, tile } => {
                if !weapon.is_nuke() || !self.can_build(actor, weapon, tile) {
                    warn!(player = %actor, weapon = weapon.name(), "strike rejected");
                    return;
                }
                let Some(silo) = self
                    .units(actor, &[UnitType::MissileSilo])
                    .first()
                    .map(|u| u.tile)
                else {
                    return;
                };
                self.spend(actor, base_cost(weapon));
                self.launch(actor, weapon, silo, tile);
            }
            Execution::UpdateRelation { other, delta } => {
                let score = self.relation_score(actor, other).saturating_add(delta);
                self.set_relation(actor, other, score);
            }
            Execution::Embargo { other } => self.set_embargo(actor, other, true),
            Execution::StopEmbargo { other } => self.set_embargo(actor, other, false),
            Execution::AllianceRequest { recipient } => {
                if self.can_send_alliance_request(actor, recipient) {
                    if let Some(p) = self.player_mut(recipient) {
                        p.alliance_requests.push(actor);
                    }
                }
            }
            Execution::AllianceReply { requestor, accept } => {
                let pending = self
                    .player_mut(actor)
                    .map(|p| {
                        let before = p.alliance_requests.len();
                        p.alliance_requests.retain(|&r| r != requestor);
                        before != p.alliance_requests.len()
                    })
                    .unwrap_or(false);
                if pending && accept {
                    self.set_allied(actor, requestor);
                }
            }
        }
    }

    fn spend(&mut self, player: PlayerId, cost: u64) {
        if let Some(p) = self.player_mut(player) {
            p.gold = p.gold.saturating_sub(cost);
        }
    }

    fn take_troops(&mut self, player: PlayerId, wanted: Troops) -> Troops {
        let Some(p) = self.player_mut(player) else {
            return 0;
        };
        let sent = wanted.min(p.troops);
        p.troops -= sent;
        sent
    }

    fn apply_spawn(&mut self, actor: PlayerId, tile: TileRef) {
        if !self.in_spawn_phase() || !self.is_land(tile) || self.owner(tile).is_player() {
            return;
        }
        // Re-spawning moves the player.
        for t in self.territory(actor) {
            self.set_owner(t, None);
        }
        self.claim_disk(actor, tile, SPAWN_RADIUS, true);
        debug!(player = %actor, tile = tile.0, "spawned");
    }

    fn apply_attack(&mut self, actor: PlayerId, target: Owner, troops: Troops) {
        if let Owner::Player(defender) = target {
            if defender == actor || self.is_friendly(actor, defender) {
                return;
            }
        }
        let sent = self.take_troops(actor, troops);
        if sent == 0 {
            return;
        }
        let tile_cost = match target {
            Owner::Nobody => UNCLAIMED_TILE_COST,
            Owner::Player(defender) => {
                self.add_incoming_attack(defender, actor, sent);
                if let Some(p) = self.player_mut(defender) {
                    p.troops = p.troops.saturating_sub(sent / 2);
                }
                CONTESTED_TILE_COST
            }
        };
        let mut budget = sent / tile_cost;
        for _ in 0..MAX_CAPTURE_WAVES {
            if budget == 0 {
                break;
            }
            let frontier = self.frontier(actor, target);
            if frontier.is_empty() {
                break;
            }
            for tile in frontier.into_iter().take(budget as usize) {
                self.set_owner(tile, Some(actor));
                budget -= 1;
            }
        }
    }

    /// Land tiles owned by `target` adjacent to `actor`, in tile order.
    fn frontier(&self, actor: PlayerId, target: Owner) -> Vec<TileRef> {
        let mut seen = FxHashSet::default();
        let mut tiles: Vec<TileRef> = self
            .border_tiles(actor)
            .into_iter()
            .flat_map(|t| self.neighbors(t))
            .filter(|&n| self.is_land(n) && self.owner(n) == target)
            .filter(|n| seen.insert(*n))
            .collect();
        tiles.sort_unstable();
        tiles
    }

    fn apply_boat(&mut self, actor: PlayerId, destination: TileRef, troops: Troops) {
        if !self.is_land(destination) {
            return;
        }
        let defender = self.owner(destination);
        if let Owner::Player(p) = defender {
            if p == actor || self.is_friendly(actor, p) {
                return;
            }
            self.add_incoming_attack(p, actor, troops);
        }
        if self.take_troops(actor, troops) == 0 {
            return;
        }
        for tile in self.disk(destination, BOAT_LANDING_RADIUS) {
            if self.is_land(tile) && self.owner(tile) == defender {
                self.set_owner(tile, Some(actor));
            }
        }
    }

    fn detonate(&mut self, owner: PlayerId, weapon: UnitType, tile: TileRef) {
        let radius = match weapon {
            UnitType::HydrogenBomb => 50,
            UnitType::Mirv => 30,
            _ => 12,
        };
        let blast: FxHashSet<TileRef> = self.disk(tile, radius).into_iter().collect();
        let mut victims = FxHashSet::default();
        for &t in &blast {
            if let Owner::Player(p) = self.owner(t) {
                if p != owner {
                    victims.insert(p);
                    self.set_owner(t, None);
                }
            }
        }
        self.units
            .retain(|u| !(u.unit_type.is_structure() && u.owner != owner && blast.contains(&u.tile)));
        for victim in victims {
            let score = self.relation_score(victim, owner).saturating_sub(40);
            self.set_relation(victim, owner, score);
        }
    }

    /// Advance one tick: resolve strikes, pay income, grow troops, retire
    /// dead players.
    pub fn step(&mut self) {
        self.tick += 1;
        let now = self.tick;

        let (landed, flying): (Vec<_>, Vec<_>) = std::mem::take(&mut self.units)
            .into_iter()
            .partition(|u| u.target.is_some() && u.launched_at + STRIKE_FLIGHT_TICKS <= now);
        self.units = flying;
        for unit in landed {
            if let Some(target) = unit.target {
                self.detonate(unit.owner, unit.unit_type, target);
            }
        }

        let in_spawn = self.in_spawn_phase();
        let income: Vec<(u64, u64, u64)> = self
            .players
            .iter()
            .map(|p| {
                let cities = self.unit_count(p.id, UnitType::City) as u64;
                let ports = self.unit_count(p.id, UnitType::Port) as u64;
                let factories = self.unit_count(p.id, UnitType::Factory) as u64;
                let gold = p.tiles_owned as u64 * 10 + cities * 1_000 + (ports + factories) * 500;
                (gold, self.max_troops(p.id), p.tiles_owned as u64)
            })
            .collect();

        for (p, (gold, max_troops, tiles)) in self.players.iter_mut().zip(income) {
            if !p.alive {
                continue;
            }
            p.gold = p.gold.saturating_add(gold);
            let growth = (max_troops.saturating_sub(p.troops)) / 20 + 10;
            p.troops = (p.troops + growth).min(max_troops);
            p.incoming_attacks
                .retain(|(tick, _)| tick + ATTACK_MEMORY_TICKS > now);
            if !in_spawn && tiles == 0 {
                p.alive = false;
                debug!(player = %p.id, "eliminated");
            }
        }
    }
}
