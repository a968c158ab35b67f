//! Tile-based dungeon traversal.
//!
//! Coordinates: `(0, 0)` is the bottom-left cell, `x` grows east and `y` grows
//! north. Floor maps are authored as text with the top row first (as they read
//! on screen) and converted once into a [`Grid`] indexed by `(x, y)`.
//!
//! [`attempt_move`] is a pure function of position, direction, grid and the
//! player's key/chest progress. Applying the resulting [`CellEffect`] (granting
//! the key, opening the chest) is the caller's job.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Wall,
    Floor,
    Door,
    Key,
    Chest,
    Stairs,
}

impl Cell {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '#' => Some(Cell::Wall),
            '.' | '@' => Some(Cell::Floor),
            'D' => Some(Cell::Door),
            'K' => Some(Cell::Key),
            'C' => Some(Cell::Chest),
            'S' => Some(Cell::Stairs),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Cell::Wall => '#',
            Cell::Floor => '.',
            Cell::Door => 'D',
            Cell::Key => 'K',
            Cell::Chest => 'C',
            Cell::Stairs => 'S',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "north" | "up" => Some(Direction::North),
            "s" | "south" | "down" => Some(Direction::South),
            "e" | "east" | "right" => Some(Direction::East),
            "w" | "west" | "left" => Some(Direction::West),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub floor: u32,
}

impl Position {
    pub fn new(x: i32, y: i32, floor: u32) -> Self {
        Self { x, y, floor }
    }

    pub fn step(&self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
            floor: self.floor,
        }
    }
}

/// Static floor layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    /// Row-major from the bottom row: index `y * width + x`.
    cells: Vec<Cell>,
    start: (i32, i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    Empty,
    Ragged { row: usize },
    UnknownCell { row: usize, col: usize, found: char },
    MissingStart,
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::Empty => write!(f, "map has no rows"),
            GridError::Ragged { row } => write!(f, "map row {} has a different width", row),
            GridError::UnknownCell { row, col, found } => {
                write!(f, "unknown cell '{}' at row {} col {}", found, row, col)
            }
            GridError::MissingStart => write!(f, "map has no '@' start cell"),
        }
    }
}

impl std::error::Error for GridError {}

impl Grid {
    /// Parse rows written top row first. `@` marks the start cell (a floor tile).
    pub fn parse(rows: &[&str]) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().ok_or(GridError::Empty)?.chars().count();
        if width == 0 {
            return Err(GridError::Empty);
        }
        let mut cells = vec![Cell::Wall; width * height];
        let mut start = None;
        for (row, line) in rows.iter().enumerate() {
            if line.chars().count() != width {
                return Err(GridError::Ragged { row });
            }
            let y = height - 1 - row;
            for (x, c) in line.chars().enumerate() {
                let cell = Cell::from_char(c).ok_or(GridError::UnknownCell {
                    row,
                    col: x,
                    found: c,
                })?;
                if c == '@' {
                    start = Some((x as i32, y as i32));
                }
                cells[y * width + x] = cell;
            }
        }
        Ok(Self {
            width,
            height,
            cells,
            start: start.ok_or(GridError::MissingStart)?,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn start(&self) -> (i32, i32) {
        self.start
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.cells[y as usize * self.width + x as usize])
    }

    pub fn is_traversable(&self, x: i32, y: i32) -> bool {
        matches!(self.get(x, y), Some(c) if c != Cell::Wall)
    }

    /// Render top row first, marking the player with `@`.
    pub fn render(&self, player: Option<(i32, i32)>) -> Vec<String> {
        (0..self.height)
            .rev()
            .map(|y| {
                (0..self.width)
                    .map(|x| {
                        if player == Some((x as i32, y as i32)) {
                            '@'
                        } else {
                            self.cells[y * self.width + x].symbol()
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// What the player has collected so far in the dungeon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonProgress {
    pub has_key: bool,
    pub collected_chests: BTreeSet<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellEffect {
    None,
    /// Stepped on the key. `already_held` when it was picked up before.
    Key { already_held: bool },
    /// Stepped on a chest. `already_collected` chests give nothing.
    Chest { at: Position, already_collected: bool },
    /// Walked through a door (key held).
    DoorOpened,
    /// Stairs lead nowhere yet.
    Stairs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub position: Position,
    pub effect: CellEffect,
    /// Legal directions from the new position.
    pub exits: Vec<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveRejection {
    OutOfBounds,
    Wall,
    KeyRequired,
}

impl MoveRejection {
    pub fn message(&self) -> &'static str {
        match self {
            MoveRejection::OutOfBounds => "You can't go that way.",
            MoveRejection::Wall => "A wall blocks your path.",
            MoveRejection::KeyRequired => "The door is locked. You need a key to pass.",
        }
    }
}

impl std::fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Directions leading to an in-bounds, non-wall cell.
pub fn legal_directions(pos: Position, grid: &Grid) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|d| {
            let next = pos.step(*d);
            grid.is_traversable(next.x, next.y)
        })
        .collect()
}

/// Try to move one cell. Deterministic; never mutates anything.
pub fn attempt_move(
    pos: Position,
    dir: Direction,
    grid: &Grid,
    progress: &DungeonProgress,
) -> Result<MoveResult, MoveRejection> {
    let next = pos.step(dir);
    let cell = grid.get(next.x, next.y).ok_or(MoveRejection::OutOfBounds)?;
    let effect = match cell {
        Cell::Wall => return Err(MoveRejection::Wall),
        Cell::Door if !progress.has_key => return Err(MoveRejection::KeyRequired),
        Cell::Door => CellEffect::DoorOpened,
        Cell::Floor => CellEffect::None,
        Cell::Key => CellEffect::Key {
            already_held: progress.has_key,
        },
        Cell::Chest => CellEffect::Chest {
            at: next,
            already_collected: progress.collected_chests.contains(&next),
        },
        Cell::Stairs => CellEffect::Stairs,
    };
    Ok(MoveResult {
        position: next,
        effect,
        exits: legal_directions(next, grid),
    })
}

// ============================================================================
// Floors
// ============================================================================

const FLOOR_1: &[&str] = &[
    "#########",
    "#C..#..S#",
    "#.#.#.#.#",
    "#.#...#.#",
    "#.#D###.#",
    "#...K#..#",
    "#.#.##C.#",
    "#@.....##",
    "#########",
];

/// Floors currently defined, indexed from 1.
pub const FLOOR_COUNT: u32 = 1;

static FLOORS: OnceLock<Vec<Grid>> = OnceLock::new();

/// Parsed floor map, built on first use.
pub fn floor(n: u32) -> Option<&'static Grid> {
    let floors = FLOORS.get_or_init(|| {
        [FLOOR_1]
            .iter()
            .filter_map(|rows| match Grid::parse(rows) {
                Ok(grid) => Some(grid),
                Err(e) => {
                    log::error!("dungeon floor failed to parse: {}", e);
                    None
                }
            })
            .collect()
    });
    floors.get((n as usize).checked_sub(1)?)
}

/// Where a new player enters the dungeon.
pub fn entrance() -> Option<Position> {
    let grid = floor(1)?;
    let (x, y) = grid.start();
    Some(Position::new(x, y, 1))
}
