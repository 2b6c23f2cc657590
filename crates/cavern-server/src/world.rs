//! The authoritative tile grid.

use std::collections::HashMap;
use std::f64::consts::PI;

use cavern_net::ConnectionId;
use cavern_protocol::catalogue::{ActorKind, DataResponse, Object, Tile};
use rand::Rng;

/// Tile kinds are drawn from `0..=MAX_TILE_KIND`.
pub const MAX_TILE_KIND: u32 = 2;

/// Chance that a generated tile carries an item.
pub const ITEM_CHANCE: f64 = 0.2;

/// Things lying around the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    FruitGreen,
    FruitRed,
    Stone,
}

impl Item {
    pub const ALL: [Item; 3] = [Item::FruitGreen, Item::FruitRed, Item::Stone];

    /// Display form sent to clients.
    pub fn repr(self) -> &'static str {
        match self {
            Self::FruitGreen => "fruit_green",
            Self::FruitRed => "fruit_red",
            Self::Stone => "stone",
        }
    }
}

/// Whatever occupies a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Item(Item),
    Actor { owner: ConnectionId, kind: ActorKind },
}

impl Occupant {
    pub fn repr(&self) -> &'static str {
        match self {
            Self::Item(item) => item.repr(),
            Self::Actor { kind, .. } => kind.as_str(),
        }
    }
}

/// One grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub kind: u32,
    pub z: f64,
    pub occupant: Option<Occupant>,
}

impl Cell {
    fn to_tile(&self) -> Tile {
        Tile {
            kind: self.kind,
            z: self.z,
            object: self.occupant.map(|o| Object {
                repr: o.repr().to_string(),
            }),
        }
    }
}

/// Errors from placing actors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("({0}, {1}) is outside the world")]
    OutOfBounds(u32, u32),

    #[error("({0}, {1}) is occupied")]
    Occupied(u32, u32),

    #[error("{0} already has an actor in the world")]
    AlreadyPlaced(ConnectionId),

    #[error("no free tile left")]
    Full,
}

/// A `width × height` grid of cells, stored column by column.
///
/// Each connection owns at most one actor, which occupies exactly one cell.
#[derive(Debug, Clone)]
pub struct GridWorld {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    actors: HashMap<ConnectionId, (u32, u32)>,
}

impl GridWorld {
    /// A flat, empty world.
    pub fn new(width: u32, height: u32) -> Self {
        let cell = Cell {
            kind: 0,
            z: 0.0,
            occupant: None,
        };
        Self {
            width,
            height,
            cells: vec![cell; width as usize * height as usize],
            actors: HashMap::new(),
        }
    }

    /// A world with rolling terrain and items scattered over a fifth of it.
    pub fn generate(width: u32, height: u32, rng: &mut impl Rng) -> Self {
        let mut world = Self::new(width, height);
        let phase = rng.random::<f64>() * 2.0 * PI;

        for x in 0..width {
            for y in 0..height {
                let t = f64::from(x + y) / PI / 2.0 + phase;
                let item = rng
                    .random_bool(ITEM_CHANCE)
                    .then(|| Item::ALL[rng.random_range(0..Item::ALL.len())]);
                let cell = Cell {
                    kind: rng.random_range(0..=MAX_TILE_KIND),
                    z: (t.sin() * 8.0).round(),
                    occupant: item.map(Occupant::Item),
                };
                if let Some(slot) = world.cell_mut(x, y) {
                    *slot = cell;
                }
            }
        }

        tracing::info!(width, height, "world generated");
        world
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn cell_mut(&mut self, x: u32, y: u32) -> Option<&mut Cell> {
        self.index(x, y).map(|i| &mut self.cells[i])
    }

    /// Every cell with its coordinates, column by column.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &Cell)> {
        let height = self.height.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i as u32) / height, (i as u32) % height, cell))
    }

    /// The whole map as sent to clients.
    pub fn data_response(&self) -> DataResponse {
        let tiles = (0..self.width)
            .map(|x| {
                (0..self.height)
                    .filter_map(|y| self.cell(x, y).map(Cell::to_tile))
                    .collect()
            })
            .collect();
        DataResponse {
            width: self.width,
            height: self.height,
            tiles,
        }
    }

    /// A uniformly chosen tile with nothing on it.
    pub fn random_free_tile(&self, rng: &mut impl Rng) -> Option<(u32, u32)> {
        let free: Vec<_> = self
            .cells()
            .filter(|(_, _, cell)| cell.occupant.is_none())
            .map(|(x, y, _)| (x, y))
            .collect();
        if free.is_empty() {
            return None;
        }
        Some(free[rng.random_range(0..free.len())])
    }

    /// Puts `owner`'s actor on a free tile.
    pub fn place_actor(
        &mut self,
        owner: ConnectionId,
        kind: ActorKind,
        x: u32,
        y: u32,
    ) -> Result<(), WorldError> {
        if self.actors.contains_key(&owner) {
            return Err(WorldError::AlreadyPlaced(owner));
        }
        let cell = self.cell_mut(x, y).ok_or(WorldError::OutOfBounds(x, y))?;
        if cell.occupant.is_some() {
            return Err(WorldError::Occupied(x, y));
        }
        cell.occupant = Some(Occupant::Actor { owner, kind });
        self.actors.insert(owner, (x, y));
        tracing::debug!(%owner, x, y, "actor placed");
        Ok(())
    }

    /// Places `owner`'s actor on a random free tile and returns where.
    pub fn spawn_actor(
        &mut self,
        owner: ConnectionId,
        kind: ActorKind,
        rng: &mut impl Rng,
    ) -> Result<(u32, u32), WorldError> {
        let (x, y) = self.random_free_tile(rng).ok_or(WorldError::Full)?;
        self.place_actor(owner, kind, x, y)?;
        Ok((x, y))
    }

    /// Takes `owner`'s actor off the grid. Returns where it stood.
    pub fn remove_actor(&mut self, owner: ConnectionId) -> Option<(u32, u32)> {
        let (x, y) = self.actors.remove(&owner)?;
        if let Some(cell) = self.cell_mut(x, y) {
            if matches!(cell.occupant, Some(Occupant::Actor { owner: o, .. }) if o == owner) {
                cell.occupant = None;
            }
        }
        tracing::debug!(%owner, x, y, "actor removed");
        Some((x, y))
    }

    pub fn actor_position(&self, owner: ConnectionId) -> Option<(u32, u32)> {
        self.actors.get(&owner).copied()
    }

    pub fn actor_kind(&self, owner: ConnectionId) -> Option<ActorKind> {
        let (x, y) = self.actor_position(owner)?;
        match self.cell(x, y)?.occupant {
            Some(Occupant::Actor { kind, .. }) => Some(kind),
            _ => None,
        }
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| x as usize * self.height as usize + y as usize)
    }
}
