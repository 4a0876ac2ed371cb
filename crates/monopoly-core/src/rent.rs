//! Rent calculation.
//!
//! Rent tables are indexed differently per group:
//! - colour groups by house count (0-5, 5 = hotel); an unimproved property
//!   whose owner holds the whole group charges double
//! - railroads by how many railroads the owner holds (1-4)
//! - utilities by how many utilities the owner holds (1-2), multiplied by
//!   the dice total

use crate::board::{Property, PropertyGroup};

/// Rent owed for landing on `property`, given every property in the game
/// and the dice that were just rolled.
///
/// Unowned and mortgaged properties charge nothing. Lookups outside the
/// rent table also charge nothing.
pub fn calculate_rent(properties: &[Property], property: &Property, dice: [u8; 2]) -> i64 {
    let owner = match property.owner.as_deref() {
        Some(owner) => owner,
        None => return 0,
    };
    if property.mortgaged {
        return 0;
    }

    let owned_in_group = properties
        .iter()
        .filter(|p| p.group == property.group && p.is_owned_by(owner))
        .count();
    let table = |index: usize| property.rent.get(index).copied().unwrap_or(0);

    match property.group {
        PropertyGroup::Railroad => owned_in_group.checked_sub(1).map_or(0, table),
        PropertyGroup::Utility => {
            let dice_total = i64::from(dice[0]) + i64::from(dice[1]);
            owned_in_group.checked_sub(1).map_or(0, table) * dice_total
        }
        _ => {
            if property.houses == 0 && owns_whole_group(properties, property.group, owner) {
                table(0) * 2
            } else {
                table(usize::from(property.houses))
            }
        }
    }
}

/// Whether `owner` holds every property of `group`
pub fn owns_whole_group(properties: &[Property], group: PropertyGroup, owner: &str) -> bool {
    let mut in_group = properties.iter().filter(|p| p.group == group).peekable();
    in_group.peek().is_some() && in_group.all(|p| p.is_owned_by(owner))
}
