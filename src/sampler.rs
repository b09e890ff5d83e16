use crate::game::{Cell, GameView, Owner, PlayerId, Terrain, TileRef};
use crate::rng::PseudoRandom;
use rustc_hash::FxHashSet;

pub const MAX_ATTEMPTS_PER_TILE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min: Cell,
    pub max: Cell,
}

pub fn bounding_box<G: GameView>(game: &G, tiles: &[TileRef]) -> Option<BoundingBox> {
    let first = game.cell(*tiles.first()?);
    let mut bbox = BoundingBox {
        min: first,
        max: first,
    };
    for &tile in &tiles[1..] {
        let c = game.cell(tile);
        bbox.min.x = bbox.min.x.min(c.x);
        bbox.min.y = bbox.min.y.min(c.y);
        bbox.max.x = bbox.max.x.max(c.x);
        bbox.max.y = bbox.max.y.max(c.y);
    }
    Some(bbox)
}

fn draw<G, F>(
    game: &G,
    rng: &mut PseudoRandom,
    bbox: &BoundingBox,
    attempts: u32,
    accept: F,
) -> Option<TileRef>
where
    G: GameView,
    F: Fn(TileRef) -> bool,
{
    for _ in 0..attempts {
        let x = rng.next_int(bbox.min.x as i64, bbox.max.x as i64 + 1) as i32;
        let y = rng.next_int(bbox.min.y as i64, bbox.max.y as i64 + 1) as i32;
        if !game.is_valid_coord(x, y) {
            continue;
        }
        let tile = game.tile_ref(x, y);
        if accept(tile) {
            return Some(tile);
        }
    }
    None
}

fn rejection_sample<G, F>(
    game: &G,
    rng: &mut PseudoRandom,
    bbox: &BoundingBox,
    n: usize,
    accept: F,
) -> Vec<TileRef>
where
    G: GameView,
    F: Fn(TileRef) -> bool,
{
    let mut seen = FxHashSet::default();
    let mut tiles = Vec::with_capacity(n);
    for _ in 0..n {
        if let Some(tile) = draw(game, rng, bbox, MAX_ATTEMPTS_PER_TILE, &accept) {
            if seen.insert(tile) {
                tiles.push(tile);
            }
        }
    }
    tiles
}

/// One random tile owned by `player`.
pub fn random_territory_tile<G: GameView>(
    game: &G,
    rng: &mut PseudoRandom,
    player: PlayerId,
) -> Option<TileRef> {
    let bbox = bounding_box(game, &game.border_tiles(player))?;
    draw(game, rng, &bbox, MAX_ATTEMPTS_PER_TILE, |t| {
        game.owner(t) == Owner::Player(player)
    })
}

/// Up to `n` distinct tiles owned by `player`. Small territories are
/// returned whole.
pub fn sample_territory<G: GameView>(
    game: &G,
    rng: &mut PseudoRandom,
    player: PlayerId,
    n: usize,
) -> Vec<TileRef> {
    if n == 0 {
        return Vec::new();
    }
    if game.tiles_owned(player) <= n {
        return game.territory(player);
    }
    let Some(bbox) = bounding_box(game, &game.border_tiles(player)) else {
        return Vec::new();
    };
    rejection_sample(game, rng, &bbox, n, |t| {
        game.owner(t) == Owner::Player(player)
    })
}

/// Up to `n` distinct owned tiles that touch the ocean.
pub fn sample_coastline<G: GameView>(
    game: &G,
    rng: &mut PseudoRandom,
    player: PlayerId,
    n: usize,
) -> Vec<TileRef> {
    if n == 0 {
        return Vec::new();
    }
    let coast: Vec<TileRef> = game
        .border_tiles(player)
        .into_iter()
        .filter(|&t| game.is_ocean_shore(t))
        .collect();
    if coast.len() <= n {
        return coast;
    }
    let Some(bbox) = bounding_box(game, &coast) else {
        return Vec::new();
    };
    rejection_sample(game, rng, &bbox, n, |t| {
        game.owner(t) == Owner::Player(player) && game.is_ocean_shore(t)
    })
}

/// Unowned land near a spawn cell. Mountains are skipped half the time.
pub fn random_spawn_tile<G: GameView>(
    game: &G,
    rng: &mut PseudoRandom,
    cell: Cell,
    delta: i32,
    attempts: u32,
) -> Option<TileRef> {
    for _ in 0..attempts {
        let x = rng.next_int((cell.x - delta) as i64, (cell.x + delta + 1) as i64) as i32;
        let y = rng.next_int((cell.y - delta) as i64, (cell.y + delta + 1) as i64) as i32;
        if !game.is_valid_coord(x, y) {
            continue;
        }
        let tile = game.tile_ref(x, y);
        if game.is_land(tile) && !game.owner(tile).is_player() {
            if game.terrain(tile) == Terrain::Mountain && rng.chance(2) {
                continue;
            }
            return Some(tile);
        }
    }
    None
}

/// Uniform draw from the square around `c`, kept only when it falls inside
/// the euclidean disk of `radius` (both inclusive).
fn draw_in_disk(rng: &mut PseudoRandom, c: Cell, radius: i32) -> Option<Cell> {
    let r = radius.max(0) as i64;
    let dx = rng.next_int(-r, r + 1);
    let dy = rng.next_int(-r, r + 1);
    if dx * dx + dy * dy > r * r {
        return None;
    }
    Some(Cell::new(c.x + dx as i32, c.y + dy as i32))
}

/// Ocean tile within `radius` of `center` (warship placement).
pub fn random_ocean_tile_near<G: GameView>(
    game: &G,
    rng: &mut PseudoRandom,
    center: TileRef,
    radius: i32,
    attempts: u32,
) -> Option<TileRef> {
    let c = game.cell(center);
    for _ in 0..attempts {
        let Some(Cell { x, y }) = draw_in_disk(rng, c, radius) else {
            continue;
        };
        if !game.is_valid_coord(x, y) {
            continue;
        }
        let tile = game.tile_ref(x, y);
        if game.is_ocean(tile) {
            return Some(tile);
        }
    }
    None
}

/// Ocean-shore tile near `center` that is unclaimed or held by a
/// non-friendly player (boat destinations).
pub fn random_ocean_shore_tile<G: GameView>(
    game: &G,
    rng: &mut PseudoRandom,
    me: PlayerId,
    center: TileRef,
    radius: i32,
    attempts: u32,
) -> Option<TileRef> {
    let c = game.cell(center);
    for _ in 0..attempts {
        let Some(Cell { x, y }) = draw_in_disk(rng, c, radius) else {
            continue;
        };
        if !game.is_valid_coord(x, y) {
            continue;
        }
        let tile = game.tile_ref(x, y);
        if !game.is_ocean_shore(tile) {
            continue;
        }
        match game.owner(tile) {
            Owner::Nobody => return Some(tile),
            Owner::Player(p) if p != me && !game.is_friendly(me, p) => return Some(tile),
            Owner::Player(_) => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::PlayerType;
    use crate::sim::GridWorld;

    fn world_with_square(side: i32) -> (GridWorld, PlayerId) {
        let mut world = GridWorld::filled(64, 64, Terrain::Plains);
        let p = world.add_player("A", PlayerType::FakeHuman, None);
        world.claim_rect(p, 10, 10, 10 + side - 1, 10 + side - 1);
        (world, p)
    }

    #[test]
    fn test_bounding_box() {
        let (world, p) = world_with_square(5);
        let bbox = bounding_box(&world, &world.border_tiles(p)).unwrap();
        assert_eq!(bbox.min, Cell::new(10, 10));
        assert_eq!(bbox.max, Cell::new(14, 14));
        assert!(bounding_box(&world, &[]).is_none());
    }

    #[test]
    fn test_exhaustive_when_territory_is_small() {
        let (world, p) = world_with_square(3);
        let mut rng = PseudoRandom::new(11);
        let mut tiles = sample_territory(&world, &mut rng, p, 50);
        let mut expected = world.territory(p);
        tiles.sort();
        expected.sort();
        assert_eq!(tiles, expected);
        assert_eq!(tiles.len(), 9);
    }

    #[test]
    fn test_exhaustive_does_not_touch_rng() {
        let (world, p) = world_with_square(3);
        let mut rng = PseudoRandom::new(11);
        let mut untouched = PseudoRandom::new(11);
        let _ = sample_territory(&world, &mut rng, p, 9);
        assert_eq!(rng.next_int(0, 1 << 30), untouched.next_int(0, 1 << 30));
    }

    #[test]
    fn test_rejection_sample_is_owned_and_distinct() {
        let (world, p) = world_with_square(20);
        let mut rng = PseudoRandom::new(5);
        let tiles = sample_territory(&world, &mut rng, p, 10);
        assert!(!tiles.is_empty() && tiles.len() <= 10);
        let unique: FxHashSet<_> = tiles.iter().copied().collect();
        assert_eq!(unique.len(), tiles.len());
        assert!(tiles.iter().all(|&t| world.owner(t) == Owner::Player(p)));
    }

    #[test]
    fn test_unmet_quota_returns_fewer() {
        // A thin diagonal leaves most of its bounding box unowned.
        let mut world = GridWorld::filled(200, 200, Terrain::Plains);
        let p = world.add_player("A", PlayerType::FakeHuman, None);
        for i in 0..200 {
            let t = world.tile_ref(i, i);
            world.set_owner(t, Some(p));
        }
        let mut rng = PseudoRandom::new(9);
        let tiles = sample_territory(&world, &mut rng, p, 150);
        assert!(tiles.len() < 150);
        assert!(tiles.iter().all(|&t| world.owner(t) == Owner::Player(p)));
    }

    #[test]
    fn test_coastline_only_shore_tiles() {
        let mut world = GridWorld::from_ascii(&["~~~~~~", "~.....", "~.....", "~....."]);
        let p = world.add_player("A", PlayerType::FakeHuman, None);
        world.claim_rect(p, 0, 0, 5, 3);
        let mut rng = PseudoRandom::new(2);
        let coast = sample_coastline(&world, &mut rng, p, 20);
        assert!(!coast.is_empty());
        assert!(coast.iter().all(|&t| world.is_ocean_shore(t)));
    }

    #[test]
    fn test_spawn_tile_is_unowned_land() {
        let mut world = GridWorld::from_ascii(&["~~~~~~~~", "~......~", "~......~", "~~~~~~~~"]);
        let p = world.add_player("A", PlayerType::Human, None);
        world.claim_rect(p, 1, 1, 3, 2);
        let mut rng = PseudoRandom::new(4);
        for _ in 0..20 {
            if let Some(t) = random_spawn_tile(&world, &mut rng, Cell::new(4, 2), 3, 50) {
                assert!(world.is_land(t));
                assert_eq!(world.owner(t), Owner::Nobody);
            }
        }
    }

    #[test]
    fn test_boat_destination_skips_own_shore() {
        let mut world = GridWorld::from_ascii(&["......", "~~~~~~", "......"]);
        let me = world.add_player("A", PlayerType::FakeHuman, None);
        let other = world.add_player("B", PlayerType::Human, None);
        world.claim_rect(me, 0, 0, 5, 0);
        world.claim_rect(other, 0, 2, 5, 2);
        let mut rng = PseudoRandom::new(8);
        let center = world.tile_ref(2, 0);
        let dst = random_ocean_shore_tile(&world, &mut rng, me, center, 4, 500).unwrap();
        assert_eq!(world.owner(dst), Owner::Player(other));
    }

    #[test]
    fn test_ocean_draws_stay_inside_radius() {
        let world = GridWorld::filled(21, 21, Terrain::Ocean);
        let center = world.tile_ref(10, 10);
        let edge = world.tile_ref(13, 10);
        let mut rng = PseudoRandom::new(17);
        let mut hit_edge = false;
        for _ in 0..2_000 {
            if let Some(tile) = random_ocean_tile_near(&world, &mut rng, center, 3, 1) {
                assert!(world.euclidean_dist_squared(center, tile) <= 9);
                hit_edge |= tile == edge;
            }
        }
        assert!(hit_edge);
    }
}
