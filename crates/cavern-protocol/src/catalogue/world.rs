//! World data: the tile grid and whatever sits on it.

use serde::{Deserialize, Serialize};

use crate::schema::{Field, MessageSchema, Primitive, Validator};

static DATA_REQUEST: MessageSchema = MessageSchema { name: "DataRequest", fields: &[] };

static OBJECT: MessageSchema = MessageSchema {
    name: "Object",
    fields: &[Field { name: "repr", validator: Validator::Typed(Primitive::Str) }],
};

static OBJECT_ITEM: Validator = Validator::Nested(&OBJECT);

static TILE: MessageSchema = MessageSchema {
    name: "Tile",
    fields: &[
        Field { name: "type", validator: Validator::Typed(Primitive::Int) },
        Field { name: "z", validator: Validator::Typed(Primitive::Float) },
        Field { name: "object", validator: Validator::Option(&OBJECT_ITEM) },
    ],
};

static TILE_ITEM: Validator = Validator::Nested(&TILE);
static TILE_COLUMN: Validator = Validator::ListOf(&TILE_ITEM);

static DATA_RESPONSE: MessageSchema = MessageSchema {
    name: "DataResponse",
    fields: &[
        Field { name: "width", validator: Validator::Typed(Primitive::Int) },
        Field { name: "height", validator: Validator::Typed(Primitive::Int) },
        Field { name: "tiles", validator: Validator::ListOf(&TILE_COLUMN) },
    ],
};

/// Asks the server for the whole map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {}

message!(DataRequest => DATA_REQUEST);

/// The display form of whatever occupies a tile (`"fruit_red"`, `"caveman"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub repr: String,
}

model!(Object => OBJECT);

/// One grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    #[serde(rename = "type")]
    pub kind: u32,
    pub z: f64,
    pub object: Option<Object>,
}

model!(Tile => TILE);

/// The whole map, column-major: `tiles[x][y]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<Vec<Tile>>,
}

impl DataResponse {
    /// The tile at `(x, y)`, if inside the grid.
    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        self.tiles.get(x).and_then(|column| column.get(y))
    }
}

message!(DataResponse => DATA_RESPONSE);
