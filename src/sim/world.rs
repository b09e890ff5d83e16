use crate::game::{
    Cell, GameView, Gold, IncomingAttack, Owner, PlayerId, PlayerType, Relation, TeamId, Terrain,
    Tick, TileRef, Troops, UnitType, UnitView,
};
use bitvec::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

/// Per-player state kept by the reference world.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub player_type: PlayerType,
    pub alive: bool,
    pub gold: Gold,
    pub troops: Troops,
    pub team: Option<TeamId>,
    pub allies: FxHashSet<PlayerId>,
    /// Embargoes this player imposes.
    pub embargoes: FxHashSet<PlayerId>,
    /// Raw relation scores toward others, `[-100, 100]`.
    pub relations: FxHashMap<PlayerId, i32>,
    pub alliance_requests: Vec<PlayerId>,
    pub incoming_attacks: Vec<(Tick, IncomingAttack)>,
    pub(crate) tiles_owned: usize,
}

impl PlayerState {
    fn new(id: PlayerId, name: String, player_type: PlayerType, team: Option<TeamId>) -> Self {
        Self {
            id,
            name,
            player_type,
            alive: true,
            gold: 0,
            troops: 0,
            team,
            allies: FxHashSet::default(),
            embargoes: FxHashSet::default(),
            relations: FxHashMap::default(),
            alliance_requests: Vec::new(),
            incoming_attacks: Vec::new(),
            tiles_owned: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub owner: PlayerId,
    pub unit_type: UnitType,
    pub tile: TileRef,
    pub target: Option<TileRef>,
    pub launched_at: Tick,
}

/// Base prices, loosely matching the live game's economy.
pub fn base_cost(unit_type: UnitType) -> Gold {
    match unit_type {
        UnitType::City => 125_000,
        UnitType::Port => 125_000,
        UnitType::Factory => 125_000,
        UnitType::DefensePost => 50_000,
        UnitType::SamLauncher => 1_500_000,
        UnitType::MissileSilo => 1_000_000,
        UnitType::Warship => 250_000,
        UnitType::TransportShip => 0,
        UnitType::AtomBomb => 750_000,
        UnitType::HydrogenBomb => 5_000_000,
        UnitType::Mirv => 35_000_000,
    }
}

/// Minimal in-memory game used by tests and the demo binary.
///
/// Tiles are stored row-major; neighbors are 4-connected.
#[derive(Debug, Clone)]
pub struct GridWorld {
    width: u32,
    height: u32,
    terrain: Vec<Terrain>,
    land: BitVec,
    owners: Vec<Option<PlayerId>>,
    pub(crate) players: Vec<PlayerState>,
    pub(crate) units: Vec<Unit>,
    pub(crate) tick: Tick,
    spawn_phase_ticks: Tick,
    num_land: usize,
}

impl GridWorld {
    pub fn new(width: u32, height: u32, mut terrain: Vec<Terrain>) -> Self {
        let total = (width * height) as usize;
        terrain.resize(total, Terrain::Ocean);
        let land: BitVec = terrain.iter().map(|t| t.is_land()).collect();
        let num_land = land.count_ones();

        Self {
            width,
            height,
            terrain,
            land,
            owners: vec![None; total],
            players: Vec::new(),
            units: Vec::new(),
            tick: 0,
            spawn_phase_ticks: 0,
            num_land,
        }
    }

    pub fn filled(width: u32, height: u32, terrain: Terrain) -> Self {
        Self::new(width, height, vec![terrain; (width * height) as usize])
    }

    /// `.` plains, `h` highland, `^` mountain, `l` lake, `~` ocean.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let mut terrain = Vec::with_capacity((width * height) as usize);
        for row in rows {
            let mut n = 0;
            for ch in row.chars() {
                terrain.push(match ch {
                    'h' => Terrain::Highland,
                    '^' => Terrain::Mountain,
                    'l' => Terrain::Lake,
                    '~' => Terrain::Ocean,
                    _ => Terrain::Plains,
                });
                n += 1;
            }
            for _ in n..width {
                terrain.push(Terrain::Ocean);
            }
        }
        Self::new(width, height, terrain)
    }

    pub fn add_player(
        &mut self,
        name: &str,
        player_type: PlayerType,
        team: Option<TeamId>,
    ) -> PlayerId {
        let id = PlayerId(self.players.len() as u16);
        self.players
            .push(PlayerState::new(id, name.to_owned(), player_type, team));
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(id.0 as usize)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.get_mut(id.0 as usize)
    }

    pub fn all_players(&self) -> &[PlayerState] {
        &self.players
    }

    pub fn all_units(&self) -> &[Unit] {
        &self.units
    }

    pub fn set_tick(&mut self, tick: Tick) {
        self.tick = tick;
    }

    pub fn set_spawn_phase_ticks(&mut self, ticks: Tick) {
        self.spawn_phase_ticks = ticks;
    }

    pub(crate) fn idx(&self, tile: TileRef) -> usize {
        tile.0 as usize
    }

    pub fn tile_count(&self) -> usize {
        self.owners.len()
    }

    pub fn set_owner(&mut self, tile: TileRef, owner: Option<PlayerId>) {
        let idx = self.idx(tile);
        let Some(slot) = self.owners.get_mut(idx) else {
            return;
        };
        let previous = std::mem::replace(slot, owner);
        if previous == owner {
            return;
        }
        if let Some(p) = previous.and_then(|p| self.players.get_mut(p.0 as usize)) {
            p.tiles_owned = p.tiles_owned.saturating_sub(1);
        }
        if let Some(p) = owner.and_then(|p| self.players.get_mut(p.0 as usize)) {
            p.tiles_owned += 1;
        }
    }

    /// Give every land tile in the inclusive rectangle to `player`.
    pub fn claim_rect(&mut self, player: PlayerId, x0: i32, y0: i32, x1: i32, y1: i32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                if !self.is_valid_coord(x, y) {
                    continue;
                }
                let tile = self.tile_ref(x, y);
                if self.is_land(tile) {
                    self.set_owner(tile, Some(player));
                }
            }
        }
    }

    /// Give land within euclidean `radius` of `center` to `player`.
    pub fn claim_disk(&mut self, player: PlayerId, center: TileRef, radius: i32, only_unowned: bool) {
        for tile in self.disk(center, radius) {
            if !self.is_land(tile) {
                continue;
            }
            if only_unowned && self.owners[self.idx(tile)].is_some() {
                continue;
            }
            self.set_owner(tile, Some(player));
        }
    }

    pub(crate) fn disk(&self, center: TileRef, radius: i32) -> Vec<TileRef> {
        let c = self.cell(center);
        let r2 = (radius as i64) * (radius as i64);
        let mut tiles = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if (dx as i64 * dx as i64 + dy as i64 * dy as i64) > r2 {
                    continue;
                }
                let (x, y) = (c.x + dx, c.y + dy);
                if self.is_valid_coord(x, y) {
                    tiles.push(self.tile_ref(x, y));
                }
            }
        }
        tiles
    }

    pub fn add_unit(&mut self, owner: PlayerId, unit_type: UnitType, tile: TileRef) {
        self.units.push(Unit {
            owner,
            unit_type,
            tile,
            target: None,
            launched_at: self.tick,
        });
    }

    /// Put a weapon in flight from `from` toward `target`.
    pub fn launch(&mut self, owner: PlayerId, weapon: UnitType, from: TileRef, target: TileRef) {
        self.units.push(Unit {
            owner,
            unit_type: weapon,
            tile: from,
            target: Some(target),
            launched_at: self.tick,
        });
    }

    pub fn set_relation(&mut self, from: PlayerId, toward: PlayerId, score: i32) {
        if let Some(p) = self.player_mut(from) {
            p.relations.insert(toward, score.clamp(-100, 100));
        }
    }

    pub fn relation_score(&self, from: PlayerId, toward: PlayerId) -> i32 {
        self.player(from)
            .and_then(|p| p.relations.get(&toward).copied())
            .unwrap_or(0)
    }

    pub fn set_allied(&mut self, a: PlayerId, b: PlayerId) {
        if let Some(p) = self.player_mut(a) {
            p.allies.insert(b);
        }
        if let Some(p) = self.player_mut(b) {
            p.allies.insert(a);
        }
    }

    pub fn set_embargo(&mut self, from: PlayerId, toward: PlayerId, active: bool) {
        if let Some(p) = self.player_mut(from) {
            if active {
                p.embargoes.insert(toward);
            } else {
                p.embargoes.remove(&toward);
            }
        }
    }

    pub fn set_gold(&mut self, player: PlayerId, gold: Gold) {
        if let Some(p) = self.player_mut(player) {
            p.gold = gold;
        }
    }

    pub fn set_troops(&mut self, player: PlayerId, troops: Troops) {
        if let Some(p) = self.player_mut(player) {
            p.troops = troops;
        }
    }

    pub fn add_incoming_attack(&mut self, target: PlayerId, attacker: PlayerId, troops: Troops) {
        let tick = self.tick;
        if let Some(p) = self.player_mut(target) {
            p.incoming_attacks
                .push((tick, IncomingAttack { attacker, troops }));
        }
    }

    fn owned_by(&self, tile: TileRef, player: PlayerId) -> bool {
        self.owners.get(self.idx(tile)).copied().flatten() == Some(player)
    }

    fn count_units(&self, player: PlayerId, unit_type: UnitType) -> usize {
        self.units
            .iter()
            .filter(|u| u.owner == player && u.unit_type == unit_type)
            .count()
    }

    fn structure_at(&self, tile: TileRef) -> bool {
        self.units
            .iter()
            .any(|u| u.tile == tile && u.unit_type.is_structure())
    }
}

impl GameView for GridWorld {
    fn ticks(&self) -> Tick {
        self.tick
    }

    fn in_spawn_phase(&self) -> bool {
        self.tick < self.spawn_phase_ticks
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn terrain(&self, tile: TileRef) -> Terrain {
        self.terrain
            .get(self.idx(tile))
            .copied()
            .unwrap_or(Terrain::Ocean)
    }

    fn is_land(&self, tile: TileRef) -> bool {
        self.land.get(self.idx(tile)).map(|b| *b).unwrap_or(false)
    }

    fn owner(&self, tile: TileRef) -> Owner {
        match self.owners.get(self.idx(tile)).copied().flatten() {
            Some(p) => Owner::Player(p),
            None => Owner::Nobody,
        }
    }

    /// 4-connected neighbors.
    fn neighbors(&self, tile: TileRef) -> Vec<TileRef> {
        let Cell { x, y } = self.cell(tile);
        let mut neighbors = Vec::with_capacity(4);

        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if (dx == 0) == (dy == 0) {
                    continue;
                }

                let nx = x + dx;
                let ny = y + dy;

                if self.is_valid_coord(nx, ny) {
                    neighbors.push(self.tile_ref(nx, ny));
                }
            }
        }

        neighbors
    }

    fn num_land_tiles(&self) -> usize {
        self.num_land
    }

    fn players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.alive)
            .map(|p| p.id)
            .collect()
    }

    fn player_type(&self, player: PlayerId) -> PlayerType {
        self.player(player)
            .map(|p| p.player_type)
            .unwrap_or(PlayerType::Bot)
    }

    fn is_alive(&self, player: PlayerId) -> bool {
        self.player(player).is_some_and(|p| p.alive)
    }

    fn tiles_owned(&self, player: PlayerId) -> usize {
        self.player(player).map_or(0, |p| p.tiles_owned)
    }

    fn territory(&self, player: PlayerId) -> Vec<TileRef> {
        self.owners
            .iter()
            .enumerate()
            .filter(|(_, o)| **o == Some(player))
            .map(|(i, _)| TileRef(i as u32))
            .collect()
    }

    fn border_tiles(&self, player: PlayerId) -> Vec<TileRef> {
        self.territory(player)
            .into_iter()
            .filter(|&t| {
                self.neighbors(t)
                    .into_iter()
                    .any(|n| !self.owned_by(n, player))
            })
            .collect()
    }

    fn units(&self, player: PlayerId, types: &[UnitType]) -> Vec<UnitView> {
        self.units
            .iter()
            .filter(|u| u.owner == player && types.contains(&u.unit_type))
            .map(|u| UnitView {
                unit_type: u.unit_type,
                tile: u.tile,
                target: u.target,
            })
            .collect()
    }

    fn unit_count(&self, player: PlayerId, unit_type: UnitType) -> usize {
        self.count_units(player, unit_type)
    }

    fn gold(&self, player: PlayerId) -> Gold {
        self.player(player).map_or(0, |p| p.gold)
    }

    fn troops(&self, player: PlayerId) -> Troops {
        self.player(player).map_or(0, |p| p.troops)
    }

    fn max_troops(&self, player: PlayerId) -> Troops {
        let tiles = self.tiles_owned(player) as u64;
        let cities = self.count_units(player, UnitType::City) as u64;
        1_000 + tiles * 150 + cities * 25_000
    }

    fn team(&self, player: PlayerId) -> Option<TeamId> {
        self.player(player).and_then(|p| p.team)
    }

    fn is_allied_with(&self, a: PlayerId, b: PlayerId) -> bool {
        self.player(a).is_some_and(|p| p.allies.contains(&b))
    }

    fn relation(&self, from: PlayerId, toward: PlayerId) -> Relation {
        Relation::from_score(self.relation_score(from, toward))
    }

    fn has_embargo_against(&self, from: PlayerId, toward: PlayerId) -> bool {
        self.player(from).is_some_and(|p| p.embargoes.contains(&toward))
    }

    fn incoming_alliance_requests(&self, player: PlayerId) -> Vec<PlayerId> {
        self.player(player)
            .map(|p| p.alliance_requests.clone())
            .unwrap_or_default()
    }

    fn can_send_alliance_request(&self, from: PlayerId, to: PlayerId) -> bool {
        from != to
            && self.is_alive(from)
            && self.is_alive(to)
            && !self.is_allied_with(from, to)
            && !self
                .player(to)
                .is_some_and(|p| p.alliance_requests.contains(&from))
            && !self
                .player(from)
                .is_some_and(|p| p.alliance_requests.contains(&to))
    }

    fn incoming_attacks(&self, player: PlayerId) -> Vec<IncomingAttack> {
        self.player(player)
            .map(|p| p.incoming_attacks.iter().map(|(_, a)| *a).collect())
            .unwrap_or_default()
    }

    fn shares_border_with(&self, a: PlayerId, b: PlayerId) -> bool {
        self.border_tiles(a).into_iter().any(|t| {
            self.neighbors(t)
                .into_iter()
                .any(|n| self.owned_by(n, b))
        })
    }

    fn neighbor_players(&self, player: PlayerId) -> Vec<PlayerId> {
        let mut seen: Vec<PlayerId> = self
            .border_tiles(player)
            .into_iter()
            .flat_map(|t| self.neighbors(t))
            .filter_map(|n| self.owner(n).player())
            .filter(|&p| p != player)
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen
    }

    fn unit_cost(&self, _player: PlayerId, unit_type: UnitType) -> Gold {
        base_cost(unit_type)
    }

    fn can_build(&self, player: PlayerId, unit_type: UnitType, tile: TileRef) -> bool {
        if self.idx(tile) >= self.tile_count() || !self.is_alive(player) {
            return false;
        }
        if self.gold(player) < base_cost(unit_type) {
            return false;
        }
        match unit_type {
            UnitType::Port => {
                self.owned_by(tile, player) && self.is_ocean_shore(tile) && !self.structure_at(tile)
            }
            UnitType::Warship => {
                self.is_ocean(tile) && self.count_units(player, UnitType::Port) > 0
            }
            UnitType::AtomBomb | UnitType::HydrogenBomb | UnitType::Mirv => {
                self.count_units(player, UnitType::MissileSilo) > 0
            }
            UnitType::TransportShip => self.is_ocean_shore(tile),
            _ => self.owned_by(tile, player) && self.is_land(tile) && !self.structure_at(tile),
        }
    }

    /// Interior tiles score higher; crowding with the same structure type
    /// lowers the score.
    fn placement_value(&self, player: PlayerId, unit_type: UnitType, tile: TileRef) -> f64 {
        if !self.owned_by(tile, player) {
            return -1.0;
        }
        let interior = self
            .disk(tile, 2)
            .into_iter()
            .filter(|&t| self.owned_by(t, player))
            .count() as f64;
        let crowding = self
            .units
            .iter()
            .filter(|u| u.owner == player && u.unit_type == unit_type)
            .filter(|u| self.euclidean_dist_squared(u.tile, tile) <= 64)
            .count() as f64;
        interior - 3.0 * crowding
    }
}
