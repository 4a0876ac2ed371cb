//! The static board catalog.
//!
//! This module contains:
//! - Property colour groups and the purchasable property record
//! - Special (non-purchasable) spaces: GO, taxes, jail, cards, parking
//! - The standard 40-space board and lookup helpers

use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

/// Property identifier (equal to the property's board position)
pub type PropertyId = u8;

/// Number of spaces around the board
pub const BOARD_SIZE: u8 = 40;

/// Where the jail sits on the board
pub const JAIL_POSITION: u8 = 10;

/// Salary collected for passing GO
pub const GO_SALARY: i64 = 200;

/// Colour group (or category) of a purchasable property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyGroup {
    Brown,
    LightBlue,
    Pink,
    Orange,
    Red,
    Yellow,
    Green,
    DarkBlue,
    Railroad,
    Utility,
}

impl PropertyGroup {
    /// All property groups
    pub const ALL: [PropertyGroup; 10] = [
        PropertyGroup::Brown,
        PropertyGroup::LightBlue,
        PropertyGroup::Pink,
        PropertyGroup::Orange,
        PropertyGroup::Red,
        PropertyGroup::Yellow,
        PropertyGroup::Green,
        PropertyGroup::DarkBlue,
        PropertyGroup::Railroad,
        PropertyGroup::Utility,
    ];
}

/// A purchasable board space together with its per-game ownership state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub name: String,
    pub price: i64,
    /// Rent table; see [`crate::rent`] for how each group indexes it
    pub rent: Vec<i64>,
    pub group: PropertyGroup,
    pub position: u8,
    pub owner: Option<PlayerId>,
    /// Houses built (5 = hotel)
    pub houses: u8,
    pub mortgaged: bool,
}

impl Property {
    fn new(position: u8, name: &str, price: i64, rent: &[i64], group: PropertyGroup) -> Self {
        Self {
            id: position,
            name: name.to_string(),
            price,
            rent: rent.to_vec(),
            group,
            position,
            owner: None,
            houses: 0,
            mortgaged: false,
        }
    }

    /// Whether the property is owned by the given player
    pub fn is_owned_by(&self, player: &str) -> bool {
        self.owner.as_deref() == Some(player)
    }
}

/// Non-purchasable spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SpecialSpace {
    Go,
    Tax { amount: i64 },
    Jail,
    GoToJail,
    Chance,
    CommunityChest,
    FreeParking,
}

/// What sits on a given board position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Space<'a> {
    Property(&'a Property),
    Special {
        name: &'static str,
        kind: SpecialSpace,
    },
}

impl Space<'_> {
    /// Display name of the space
    pub fn name(&self) -> &str {
        match self {
            Space::Property(property) => property.name.as_str(),
            Space::Special { name, .. } => *name,
        }
    }
}

/// The twelve special spaces, by position
const SPECIAL_SPACES: [(u8, &str, SpecialSpace); 12] = [
    (0, "GO", SpecialSpace::Go),
    (2, "Community Chest", SpecialSpace::CommunityChest),
    (4, "Income Tax", SpecialSpace::Tax { amount: 200 }),
    (7, "Chance", SpecialSpace::Chance),
    (10, "Jail", SpecialSpace::Jail),
    (17, "Community Chest", SpecialSpace::CommunityChest),
    (20, "Free Parking", SpecialSpace::FreeParking),
    (22, "Chance", SpecialSpace::Chance),
    (30, "Go To Jail", SpecialSpace::GoToJail),
    (33, "Community Chest", SpecialSpace::CommunityChest),
    (36, "Chance", SpecialSpace::Chance),
    (38, "Luxury Tax", SpecialSpace::Tax { amount: 100 }),
];

/// Look up the special space at a board position, if any
pub fn special_space(position: u8) -> Option<(&'static str, SpecialSpace)> {
    SPECIAL_SPACES
        .iter()
        .find(|(pos, _, _)| *pos == position)
        .map(|&(_, name, kind)| (name, kind))
}

/// Fresh, unowned copies of all 28 purchasable properties, ordered by position.
///
/// Each game gets its own copy so ownership never leaks between games.
pub fn standard_properties() -> Vec<Property> {
    use PropertyGroup::*;

    const STREET_RENTS: [(u8, &str, i64, [i64; 6], PropertyGroup); 22] = [
        (1, "Mediterranean Avenue", 60, [2, 10, 30, 90, 160, 250], Brown),
        (3, "Baltic Avenue", 60, [4, 20, 60, 180, 320, 450], Brown),
        (6, "Oriental Avenue", 100, [6, 30, 90, 270, 400, 550], LightBlue),
        (8, "Vermont Avenue", 100, [6, 30, 90, 270, 400, 550], LightBlue),
        (9, "Connecticut Avenue", 120, [8, 40, 100, 300, 450, 600], LightBlue),
        (11, "St. Charles Place", 140, [10, 50, 150, 450, 625, 750], Pink),
        (13, "States Avenue", 140, [10, 50, 150, 450, 625, 750], Pink),
        (14, "Virginia Avenue", 160, [12, 60, 180, 500, 700, 900], Pink),
        (16, "St. James Place", 180, [14, 70, 200, 550, 750, 950], Orange),
        (18, "Tennessee Avenue", 180, [14, 70, 200, 550, 750, 950], Orange),
        (19, "New York Avenue", 200, [16, 80, 220, 600, 800, 1000], Orange),
        (21, "Kentucky Avenue", 220, [18, 90, 250, 700, 875, 1050], Red),
        (23, "Indiana Avenue", 220, [18, 90, 250, 700, 875, 1050], Red),
        (24, "Illinois Avenue", 240, [20, 100, 300, 750, 925, 1100], Red),
        (26, "Atlantic Avenue", 260, [22, 110, 330, 800, 975, 1150], Yellow),
        (27, "Ventnor Avenue", 260, [22, 110, 330, 800, 975, 1150], Yellow),
        (29, "Marvin Gardens", 280, [24, 120, 360, 850, 1025, 1200], Yellow),
        (31, "Pacific Avenue", 300, [26, 130, 390, 900, 1100, 1275], Green),
        (32, "North Carolina Avenue", 300, [26, 130, 390, 900, 1100, 1275], Green),
        (34, "Pennsylvania Avenue", 320, [28, 150, 450, 1000, 1200, 1400], Green),
        (37, "Park Place", 350, [35, 175, 500, 1100, 1300, 1500], DarkBlue),
        (39, "Boardwalk", 400, [50, 200, 600, 1400, 1700, 2000], DarkBlue),
    ];
    const RAILROADS: [(u8, &str); 4] = [
        (5, "Reading Railroad"),
        (15, "Pennsylvania Railroad"),
        (25, "B&O Railroad"),
        (35, "Short Line"),
    ];
    const UTILITIES: [(u8, &str); 2] = [(12, "Electric Company"), (28, "Water Works")];

    let mut properties: Vec<Property> = STREET_RENTS
        .iter()
        .map(|(pos, name, price, rent, group)| Property::new(*pos, name, *price, rent, *group))
        .collect();

    properties.extend(
        RAILROADS
            .iter()
            .map(|(pos, name)| Property::new(*pos, name, 200, &[25, 50, 100, 200], Railroad)),
    );
    properties.extend(
        UTILITIES
            .iter()
            .map(|(pos, name)| Property::new(*pos, name, 150, &[4, 10], Utility)),
    );

    properties.sort_by_key(|p| p.position);
    properties
}

/// Find the property at a board position
pub fn property_at(properties: &[Property], position: u8) -> Option<&Property> {
    properties.iter().find(|p| p.position == position)
}

/// Find a property by id
pub fn property_by_id(properties: &[Property], id: PropertyId) -> Option<&Property> {
    properties.iter().find(|p| p.id == id)
}

/// Resolve what occupies a board position.
///
/// Returns `None` only for positions outside the board or missing catalog
/// entries; callers treat that as an empty space.
pub fn space_at(properties: &[Property], position: u8) -> Option<Space<'_>> {
    if let Some(property) = property_at(properties, position) {
        return Some(Space::Property(property));
    }
    special_space(position).map(|(name, kind)| Space::Special { name, kind })
}
