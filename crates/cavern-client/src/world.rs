//! The client's copy of the server's map.

use cavern_protocol::catalogue::{DataResponse, Tile};

/// Last map received from the server, indexed `[x][y]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalWorld {
    width: u32,
    height: u32,
    tiles: Vec<Vec<Tile>>,
}

impl LocalWorld {
    /// Replaces the whole map.
    pub fn apply(&mut self, data: &DataResponse) {
        self.width = data.width;
        self.height = data.height;
        self.tiles = data.tiles.clone();
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        self.tiles.get(x).and_then(|column| column.get(y))
    }

    /// Coordinates of every tile showing `repr`.
    pub fn find(&self, repr: &str) -> Vec<(usize, usize)> {
        self.tiles
            .iter()
            .enumerate()
            .flat_map(|(x, column)| {
                column.iter().enumerate().filter_map(move |(y, tile)| {
                    tile.object
                        .as_ref()
                        .is_some_and(|o| o.repr == repr)
                        .then_some((x, y))
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
