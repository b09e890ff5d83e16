use serde::{Deserialize, Serialize};
use std::fmt;

pub type Tick = u64;
pub type Gold = u64;
pub type Troops = u64;

/// Index of a tile in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u16);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u16);

/// Tile ownership. `Nobody` is unclaimed land ("terra nullius").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    Nobody,
    Player(PlayerId),
}

impl Owner {
    pub fn player(self) -> Option<PlayerId> {
        match self {
            Owner::Nobody => None,
            Owner::Player(id) => Some(id),
        }
    }

    pub fn is_player(self) -> bool {
        matches!(self, Owner::Player(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerType {
    Human,
    Bot,
    FakeHuman,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Plains,
    Highland,
    Mountain,
    Lake,
    Ocean,
}

impl Terrain {
    pub fn is_land(self) -> bool {
        !matches!(self, Terrain::Lake | Terrain::Ocean)
    }
}

/// Discrete hostility scale, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Relation {
    Hostile = 0,
    Distrustful = 1,
    Neutral = 2,
    Friendly = 3,
}

impl Relation {
    /// Bucket a raw relation score in `[-100, 100]`.
    pub fn from_score(score: i32) -> Self {
        if score <= -50 {
            Relation::Hostile
        } else if score < 0 {
            Relation::Distrustful
        } else if score < 50 {
            Relation::Neutral
        } else {
            Relation::Friendly
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitType {
    City,
    Port,
    Factory,
    DefensePost,
    SamLauncher,
    MissileSilo,
    Warship,
    TransportShip,
    AtomBomb,
    HydrogenBomb,
    Mirv,
}

impl UnitType {
    /// Structures counted by the steamroll heuristic.
    pub const KEY_STRUCTURES: [UnitType; 6] = [
        UnitType::City,
        UnitType::Factory,
        UnitType::Port,
        UnitType::DefensePost,
        UnitType::SamLauncher,
        UnitType::MissileSilo,
    ];

    /// Structures that carry value (or danger) for area-strike scoring.
    pub const STRIKE_RELEVANT: [UnitType; 5] = [
        UnitType::City,
        UnitType::DefensePost,
        UnitType::MissileSilo,
        UnitType::Port,
        UnitType::SamLauncher,
    ];

    pub fn is_structure(self) -> bool {
        matches!(
            self,
            UnitType::City
                | UnitType::Port
                | UnitType::Factory
                | UnitType::DefensePost
                | UnitType::SamLauncher
                | UnitType::MissileSilo
        )
    }

    pub fn is_nuke(self) -> bool {
        matches!(
            self,
            UnitType::AtomBomb | UnitType::HydrogenBomb | UnitType::Mirv
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            UnitType::City => "City",
            UnitType::Port => "Port",
            UnitType::Factory => "Factory",
            UnitType::DefensePost => "Defense Post",
            UnitType::SamLauncher => "SAM Launcher",
            UnitType::MissileSilo => "Missile Silo",
            UnitType::Warship => "Warship",
            UnitType::TransportShip => "Transport Ship",
            UnitType::AtomBomb => "Atom Bomb",
            UnitType::HydrogenBomb => "Hydrogen Bomb",
            UnitType::Mirv => "MIRV",
        }
    }
}

/// Read-only snapshot of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitView {
    pub unit_type: UnitType,
    pub tile: TileRef,
    /// Destination of an in-flight weapon or ship.
    pub target: Option<TileRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingAttack {
    pub attacker: PlayerId,
    pub troops: Troops,
}

/// Setup-time description of a computer-controlled nation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nation {
    pub id: PlayerId,
    pub name: String,
    pub spawn_cell: Cell,
    pub player_type: PlayerType,
}

/// Effects the decision layer asks the engine to carry out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Execution {
    Spawn { tile: TileRef },
    Attack { target: Owner, troops: Troops },
    TransportShip { destination: TileRef, troops: Troops },
    Construct { unit_type: UnitType, tile: TileRef },
    Strike { weapon: UnitType, tile: TileRef },
    UpdateRelation { other: PlayerId, delta: i32 },
    Embargo { other: PlayerId },
    StopEmbargo { other: PlayerId },
    AllianceRequest { recipient: PlayerId },
    AllianceReply { requestor: PlayerId, accept: bool },
}

impl fmt::Display for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Execution::Spawn { tile } => write!(f, "spawn@{}", tile.0),
            Execution::Attack { target, troops } => match target {
                Owner::Nobody => write!(f, "expand({troops})"),
                Owner::Player(p) => write!(f, "attack({p},{troops})"),
            },
            Execution::TransportShip { destination, troops } => {
                write!(f, "boat@{}({troops})", destination.0)
            }
            Execution::Construct { unit_type, tile } => {
                write!(f, "build({})@{}", unit_type.name(), tile.0)
            }
            Execution::Strike { weapon, tile } => write!(f, "strike({})@{}", weapon.name(), tile.0),
            Execution::UpdateRelation { other, delta } => write!(f, "relation({other},{delta})"),
            Execution::Embargo { other } => write!(f, "embargo({other})"),
            Execution::StopEmbargo { other } => write!(f, "stop_embargo({other})"),
            Execution::AllianceRequest { recipient } => write!(f, "ally_request({recipient})"),
            Execution::AllianceReply { requestor, accept } => {
                write!(f, "ally_reply({requestor},{accept})")
            }
        }
    }
}

/// Effect submission. The engine serializes application.
pub trait ExecutionSink {
    fn add_execution(&mut self, actor: PlayerId, execution: Execution);
}

impl ExecutionSink for Vec<(PlayerId, Execution)> {
    fn add_execution(&mut self, actor: PlayerId, execution: Execution) {
        self.push((actor, execution));
    }
}

/// Queries the decision layer needs from the game-state engine.
///
/// Relations and embargoes are directional: `relation(a, b)` is how `a`
/// feels about `b`, `has_embargo_against(a, b)` is an embargo imposed by `a`.
pub trait GameView {
    fn ticks(&self) -> Tick;
    fn in_spawn_phase(&self) -> bool;

    // Geometry
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn is_valid_coord(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    /// Caller guarantees `is_valid_coord(x, y)`.
    fn tile_ref(&self, x: i32, y: i32) -> TileRef {
        TileRef(y as u32 * self.width() + x as u32)
    }

    fn cell(&self, tile: TileRef) -> Cell {
        let w = self.width();
        Cell::new((tile.0 % w) as i32, (tile.0 / w) as i32)
    }

    fn terrain(&self, tile: TileRef) -> Terrain;

    fn is_land(&self, tile: TileRef) -> bool {
        self.terrain(tile).is_land()
    }

    fn is_ocean(&self, tile: TileRef) -> bool {
        self.terrain(tile) == Terrain::Ocean
    }

    fn is_ocean_shore(&self, tile: TileRef) -> bool {
        self.is_land(tile) && self.neighbors(tile).into_iter().any(|n| self.is_ocean(n))
    }

    fn owner(&self, tile: TileRef) -> Owner;
    fn neighbors(&self, tile: TileRef) -> Vec<TileRef>;

    fn manhattan_dist(&self, a: TileRef, b: TileRef) -> u32 {
        let (ca, cb) = (self.cell(a), self.cell(b));
        ca.x.abs_diff(cb.x) + ca.y.abs_diff(cb.y)
    }

    fn euclidean_dist_squared(&self, a: TileRef, b: TileRef) -> u64 {
        let (ca, cb) = (self.cell(a), self.cell(b));
        let dx = ca.x.abs_diff(cb.x) as u64;
        let dy = ca.y.abs_diff(cb.y) as u64;
        dx * dx + dy * dy
    }

    fn num_land_tiles(&self) -> usize;

    // Players
    /// Live players, in stable order.
    fn players(&self) -> Vec<PlayerId>;
    fn player_type(&self, player: PlayerId) -> PlayerType;
    fn is_alive(&self, player: PlayerId) -> bool;
    fn tiles_owned(&self, player: PlayerId) -> usize;
    fn territory(&self, player: PlayerId) -> Vec<TileRef>;
    fn border_tiles(&self, player: PlayerId) -> Vec<TileRef>;
    fn units(&self, player: PlayerId, types: &[UnitType]) -> Vec<UnitView>;

    fn unit_count(&self, player: PlayerId, unit_type: UnitType) -> usize {
        self.units(player, &[unit_type]).len()
    }

    fn gold(&self, player: PlayerId) -> Gold;
    fn troops(&self, player: PlayerId) -> Troops;
    fn max_troops(&self, player: PlayerId) -> Troops;

    fn team(&self, player: PlayerId) -> Option<TeamId>;
    fn is_allied_with(&self, a: PlayerId, b: PlayerId) -> bool;

    fn is_on_same_team(&self, a: PlayerId, b: PlayerId) -> bool {
        a != b && self.team(a).is_some() && self.team(a) == self.team(b)
    }

    /// Allied or teammate.
    fn is_friendly(&self, a: PlayerId, b: PlayerId) -> bool {
        self.is_allied_with(a, b) || self.is_on_same_team(a, b)
    }

    fn relation(&self, from: PlayerId, toward: PlayerId) -> Relation;
    fn has_embargo_against(&self, from: PlayerId, toward: PlayerId) -> bool;
    fn incoming_alliance_requests(&self, player: PlayerId) -> Vec<PlayerId>;
    fn can_send_alliance_request(&self, from: PlayerId, to: PlayerId) -> bool;
    fn incoming_attacks(&self, player: PlayerId) -> Vec<IncomingAttack>;
    fn shares_border_with(&self, a: PlayerId, b: PlayerId) -> bool;
    /// Players owning land adjacent to `player`'s border.
    fn neighbor_players(&self, player: PlayerId) -> Vec<PlayerId>;

    // Economy
    fn unit_cost(&self, player: PlayerId, unit_type: UnitType) -> Gold;
    /// Whether the engine would accept building or launching `unit_type` at `tile`.
    fn can_build(&self, player: PlayerId, unit_type: UnitType, tile: TileRef) -> bool;
    /// Desirability of placing a structure at `tile`. Negative means unsuitable.
    fn placement_value(&self, player: PlayerId, unit_type: UnitType, tile: TileRef) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_buckets() {
        assert_eq!(Relation::from_score(-100), Relation::Hostile);
        assert_eq!(Relation::from_score(-50), Relation::Hostile);
        assert_eq!(Relation::from_score(-1), Relation::Distrustful);
        assert_eq!(Relation::from_score(0), Relation::Neutral);
        assert_eq!(Relation::from_score(75), Relation::Friendly);
        assert!(Relation::Hostile < Relation::Neutral);
    }

    #[test]
    fn test_vec_sink_keeps_order() {
        let mut sink: Vec<(PlayerId, Execution)> = Vec::new();
        sink.add_execution(PlayerId(1), Execution::Embargo { other: PlayerId(2) });
        sink.add_execution(PlayerId(1), Execution::StopEmbargo { other: PlayerId(3) });
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].1, Execution::Embargo { other: PlayerId(2) });
    }
}
