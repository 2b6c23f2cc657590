//! What an actor perceives of the world around it.

use cavern_net::ConnectionId;
use cavern_protocol::catalogue::{Actor, Condition, Sensation, Senses};
use cavern_turn::Perception;

use crate::world::{GridWorld, Item, Occupant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Sight,
    Hearing,
    Smell,
}

impl Sense {
    pub const ALL: [Sense; 3] = [Sense::Sight, Sense::Hearing, Sense::Smell];
}

/// How far each sense reaches, in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseRanges {
    pub sight: u32,
    pub hearing: u32,
    pub smell: u32,
}

impl SenseRanges {
    pub fn get(&self, sense: Sense) -> u32 {
        match sense {
            Sense::Sight => self.sight,
            Sense::Hearing => self.hearing,
            Sense::Smell => self.smell,
        }
    }
}

impl Default for SenseRanges {
    /// A caveman's senses.
    fn default() -> Self {
        Self {
            sight: 10,
            hearing: 30,
            smell: 5,
        }
    }
}

/// The traits an occupant exposes to a sense. Actors expose none.
pub fn traits(occupant: &Occupant, sense: Sense) -> &'static [&'static str] {
    let Occupant::Item(item) = occupant else {
        return &[];
    };
    match (item, sense) {
        (Item::FruitGreen, Sense::Sight) => &["small", "round", "green"],
        (Item::FruitGreen, Sense::Smell) => &["sweet", "fresh"],
        (Item::FruitRed, Sense::Sight) => &["small", "round", "red"],
        (Item::FruitRed, Sense::Smell) => &["bitter", "rotten"],
        (Item::Stone, Sense::Sight) => &["small", "rough", "gray"],
        _ => &[],
    }
}

/// Circular-range sensing over a [`GridWorld`].
///
/// A tile is sensed when its squared distance to the observer is at most
/// the squared range of the sense and its occupant has traits for that
/// sense.
#[derive(Debug, Clone, Default)]
pub struct RangeSensing {
    ranges: SenseRanges,
}

impl RangeSensing {
    pub fn new(ranges: SenseRanges) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> SenseRanges {
        self.ranges
    }

    /// Everything sensed from `(x, y)`.
    pub fn sense(&self, world: &GridWorld, x: u32, y: u32) -> Senses {
        let mut senses = Senses::default();
        for (tx, ty, cell) in world.cells() {
            let Some(occupant) = &cell.occupant else {
                continue;
            };
            let dx = u64::from(tx.abs_diff(x));
            let dy = u64::from(ty.abs_diff(y));
            let distance = (dx * dx).saturating_add(dy * dy);

            for sense in Sense::ALL {
                let range = u64::from(self.ranges.get(sense));
                if distance > range * range {
                    continue;
                }
                let traits = traits(occupant, sense);
                if traits.is_empty() {
                    continue;
                }
                let sensation = Sensation {
                    traits: traits.iter().map(|t| t.to_string()).collect(),
                    x: tx as i32,
                    y: ty as i32,
                };
                match sense {
                    Sense::Sight => senses.sight.push(sensation),
                    Sense::Hearing => senses.hearing.push(sensation),
                    Sense::Smell => senses.smell.push(sensation),
                }
            }
        }
        senses
    }

    /// A borrowed [`Perception`] over `world`.
    pub fn over<'a>(&'a self, world: &'a GridWorld) -> WorldPerception<'a> {
        WorldPerception {
            world,
            sensing: self,
        }
    }
}

/// Builds a connection's actor view from the world it stands in.
#[derive(Debug, Clone, Copy)]
pub struct WorldPerception<'a> {
    world: &'a GridWorld,
    sensing: &'a RangeSensing,
}

impl Perception<ConnectionId> for WorldPerception<'_> {
    fn perceive(&self, owner: &ConnectionId) -> Option<Actor> {
        let (x, y) = self.world.actor_position(*owner)?;
        let kind = self.world.actor_kind(*owner)?;
        Some(Actor {
            kind: kind.as_str().to_string(),
            x: x as i32,
            y: y as i32,
            senses: self.sensing.sense(self.world, x, y),
            condition: Condition::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use cavern_protocol::catalogue::ActorKind;

    use super::*;

    fn world_with(items: &[(u32, u32, Item)]) -> GridWorld {
        let mut world = GridWorld::new(40, 40);
        for &(x, y, item) in items {
            world.cell_mut(x, y).unwrap().occupant = Some(Occupant::Item(item));
        }
        world
    }

    #[test]
    fn test_traits_per_sense() {
        let stone = Occupant::Item(Item::Stone);
        assert_eq!(traits(&stone, Sense::Sight), ["small", "rough", "gray"]);
        assert!(traits(&stone, Sense::Smell).is_empty());

        let fruit = Occupant::Item(Item::FruitGreen);
        assert_eq!(traits(&fruit, Sense::Smell), ["sweet", "fresh"]);
        assert!(traits(&fruit, Sense::Hearing).is_empty());

        let caveman = Occupant::Actor {
            owner: ConnectionId(0),
            kind: ActorKind::Caveman,
        };
        assert!(traits(&caveman, Sense::Sight).is_empty());
    }

    #[test]
    fn test_range_is_inclusive_and_circular() {
        // Sight reaches 10: (10, 0) away is seen, (8, 7) is not (113 > 100).
        let world = world_with(&[(10, 0, Item::Stone), (8, 7, Item::Stone)]);
        let senses = RangeSensing::default().sense(&world, 0, 0);
        assert_eq!(senses.sight.len(), 1);
        assert_eq!((senses.sight[0].x, senses.sight[0].y), (10, 0));
    }

    #[test]
    fn test_smell_is_shorter_than_sight() {
        let world = world_with(&[(23, 20, Item::FruitRed), (27, 20, Item::FruitGreen)]);
        let senses = RangeSensing::default().sense(&world, 20, 20);

        assert_eq!(senses.sight.len(), 2);
        assert_eq!(senses.smell.len(), 1);
        assert_eq!(senses.smell[0].traits, ["bitter", "rotten"]);
        assert!(senses.hearing.is_empty());
    }

    #[test]
    fn test_custom_ranges() {
        let world = world_with(&[(0, 3, Item::FruitGreen)]);
        let blind = RangeSensing::new(SenseRanges {
            sight: 0,
            hearing: 0,
            smell: 3,
        });
        let senses = blind.sense(&world, 0, 0);
        assert!(senses.sight.is_empty());
        assert_eq!(senses.smell.len(), 1);
    }

    #[test]
    fn test_unbounded_ranges_sense_the_whole_world() {
        let world = world_with(&[(0, 0, Item::Stone), (39, 39, Item::FruitRed)]);
        let keen = RangeSensing::new(SenseRanges {
            sight: u32::MAX,
            hearing: u32::MAX,
            smell: u32::MAX,
        });
        let senses = keen.sense(&world, 39, 0);
        assert_eq!(senses.sight.len(), 2);
        assert_eq!(senses.smell.len(), 1);
    }

    #[test]
    fn test_perception_of_placed_actor() {
        let mut world = world_with(&[(6, 5, Item::Stone)]);
        world.place_actor(ConnectionId(1), ActorKind::Caveman, 5, 5).unwrap();
        let sensing = RangeSensing::default();

        let actor = sensing.over(&world).perceive(&ConnectionId(1)).unwrap();
        assert_eq!(actor.kind, "caveman");
        assert_eq!((actor.x, actor.y), (5, 5));
        assert_eq!(actor.senses.sight.len(), 1);
        assert_eq!(actor.condition, Condition::default());

        assert!(sensing.over(&world).perceive(&ConnectionId(2)).is_none());
    }
}
