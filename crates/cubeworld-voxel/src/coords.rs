//! World, chunk, and local coordinate spaces.
//!
//! A world is a horizontal grid of vertical chunk columns. World X/Z map to a
//! [`ChunkCoord`] by floor division and to a local offset by floor modulo, so
//! negative world coordinates never produce negative local indices. World Y is
//! shared by both spaces and bounded by [`MIN_Y`] and [`MAX_Y`].

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Chunk width along X in voxels.
pub const CHUNK_SIZE_X: usize = 16;
/// Chunk height along Y in voxels.
pub const CHUNK_HEIGHT: usize = 128;
/// Chunk depth along Z in voxels.
pub const CHUNK_SIZE_Z: usize = 16;
/// Number of voxels stored by one chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE_X * CHUNK_HEIGHT * CHUNK_SIZE_Z;

/// Lowest storable world Y. Anything below reads as solid ground.
pub const MIN_Y: i32 = 0;
/// One past the highest storable world Y. Anything at or above reads as air.
pub const MAX_Y: i32 = CHUNK_HEIGHT as i32;

/// Errors produced when parsing `"x,y,z"` or `"cx,cz"` keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    /// The key did not contain the expected number of comma-separated parts.
    #[error("expected {expected} comma-separated integers, got {key:?}")]
    WrongArity {
        /// Number of integers the key type needs.
        expected: usize,
        /// The offending key.
        key: String,
    },
    /// One of the parts was not a valid `i32`.
    #[error("invalid integer {0:?} in key")]
    InvalidInteger(String),
}

fn parse_parts<const N: usize>(key: &str) -> Result<[i32; N], KeyParseError> {
    let mut out = [0i32; N];
    let mut parts = key.split(',');
    for slot in out.iter_mut() {
        let part = parts.next().ok_or_else(|| KeyParseError::WrongArity {
            expected: N,
            key: key.to_string(),
        })?;
        *slot = part
            .parse()
            .map_err(|_| KeyParseError::InvalidInteger(part.to_string()))?;
    }
    if parts.next().is_some() {
        return Err(KeyParseError::WrongArity {
            expected: N,
            key: key.to_string(),
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// World space
// ---------------------------------------------------------------------------

/// Addresses a single voxel in the whole world. `y` is vertical.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The chunk column containing this position.
    pub fn chunk(self) -> ChunkCoord {
        world_to_chunk(self.x, self.z).chunk
    }

    /// Splits this position into its chunk and local coordinate.
    ///
    /// Returns `None` when `y` lies outside `[MIN_Y, MAX_Y)`.
    pub fn to_chunk_local(self) -> Option<(ChunkCoord, LocalPos)> {
        if !(MIN_Y..MAX_Y).contains(&self.y) {
            return None;
        }
        let split = world_to_chunk(self.x, self.z);
        let local = LocalPos::new(split.local_x, (self.y - MIN_Y) as usize, split.local_z);
        Some((split.chunk, local))
    }
}

impl fmt::Display for WorldPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

impl FromStr for WorldPos {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y, z] = parse_parts::<3>(s)?;
        Ok(Self { x, y, z })
    }
}

impl Serialize for WorldPos {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WorldPos {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Chunk space
// ---------------------------------------------------------------------------

/// Identifies one vertical chunk column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the neighbouring coordinate offset by `(dx, dz)`.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Square (Chebyshev) distance in chunks.
    pub fn chebyshev_distance(self, other: ChunkCoord) -> u32 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dz = (self.z as i64 - other.z as i64).unsigned_abs();
        dx.max(dz).min(u32::MAX as u64) as u32
    }

    /// World X/Z of this chunk's local `(0, 0)` column.
    pub fn origin(self) -> (i32, i32) {
        (
            self.x.wrapping_mul(CHUNK_SIZE_X as i32),
            self.z.wrapping_mul(CHUNK_SIZE_Z as i32),
        )
    }

    /// Whether the world column `(x, z)` lies inside this chunk's footprint.
    pub fn contains_column(self, x: i32, z: i32) -> bool {
        world_to_chunk(x, z).chunk == self
    }

    /// Converts a local position in this chunk back to world space.
    pub fn world_pos(self, local: LocalPos) -> WorldPos {
        let (ox, oz) = self.origin();
        WorldPos::new(
            ox + local.x as i32,
            MIN_Y + local.y as i32,
            oz + local.z as i32,
        )
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.z)
    }
}

impl FromStr for ChunkCoord {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, z] = parse_parts::<2>(s)?;
        Ok(Self { x, z })
    }
}

impl Serialize for ChunkCoord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChunkCoord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Local space
// ---------------------------------------------------------------------------

/// Position inside a chunk. Valid when each axis is below its chunk extent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl LocalPos {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Whether every axis is inside the chunk.
    pub fn in_bounds(self) -> bool {
        self.x < CHUNK_SIZE_X && self.y < CHUNK_HEIGHT && self.z < CHUNK_SIZE_Z
    }

    /// Flat index into chunk storage: `x + z·SX + y·SX·SZ`.
    ///
    /// Returns `None` when out of bounds.
    pub fn index(self) -> Option<usize> {
        self.in_bounds()
            .then(|| self.x + self.z * CHUNK_SIZE_X + self.y * CHUNK_SIZE_X * CHUNK_SIZE_Z)
    }

    /// Inverse of [`LocalPos::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= CHUNK_VOLUME {
            return None;
        }
        let layer = CHUNK_SIZE_X * CHUNK_SIZE_Z;
        Some(Self {
            x: index % CHUNK_SIZE_X,
            z: (index % layer) / CHUNK_SIZE_X,
            y: index / layer,
        })
    }
}

/// Result of splitting a world column into chunk and local parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkLocal {
    pub chunk: ChunkCoord,
    pub local_x: usize,
    pub local_z: usize,
}

/// Maps a world column to its chunk and local offset.
///
/// Uses floor division and floor modulo, so `world_to_chunk(-1, 0)` yields
/// chunk `-1` with `local_x == CHUNK_SIZE_X - 1`.
pub fn world_to_chunk(world_x: i32, world_z: i32) -> ChunkLocal {
    let sx = CHUNK_SIZE_X as i32;
    let sz = CHUNK_SIZE_Z as i32;
    ChunkLocal {
        chunk: ChunkCoord::new(world_x.div_euclid(sx), world_z.div_euclid(sz)),
        local_x: world_x.rem_euclid(sx) as usize,
        local_z: world_z.rem_euclid(sz) as usize,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
