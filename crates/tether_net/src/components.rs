//! Gameplay components and the component signature of each entity kind
//!
//! Every replicated entity carries a `Position`. Beyond that, the set of
//! kind-specific components an entity holds must match its declared
//! [`EntityKind`]; [`conforms`] checks that and [`scrub`] strips whatever
//! does not belong.

use tether_core::define_component;
use tether_core::ecs::{Entity, World};
use tether_core::math::{Aabb, Vec2};

use crate::interpolation::InterpolationState;
use crate::protocol::{BulletKind, EntityKind};

/// Rendered world position. For the local player this is the predicted
/// position; for remote entities it is the interpolated one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec2);
define_component!(Position, "Position");

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec2);
define_component!(Velocity, "Velocity");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health(pub u16);
define_component!(Health, "Health");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score(pub u32);
define_component!(Score, "Score");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    pub hash: u64,
    pub flags: u8,
}
define_component!(Player, "Player");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enemy {
    pub flags: u8,
}
define_component!(Enemy, "Enemy");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boss {
    pub flags: u8,
}
define_component!(Boss, "Boss");

/// Bullet sub-type is fixed at creation; a different sub-type under the same
/// wire id means the id was reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bullet {
    pub kind: BulletKind,
    pub owner: u64,
}
define_component!(Bullet, "Bullet");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Powerup {
    pub flags: u8,
}
define_component!(Powerup, "Powerup");

/// Level-authored obstacle, identified by its stable level uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    pub uid: u64,
}
define_component!(Obstacle, "Obstacle");

/// Static box collider centred on the entity's `Position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub half_extents: Vec2,
}
define_component!(Collider, "Collider");

impl Collider {
    pub fn bounds_at(&self, center: Vec2) -> Aabb {
        Aabb::from_center(center, self.half_extents)
    }
}

/// Marks the player driven by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalPlayer;
define_component!(LocalPlayer, "LocalPlayer");

/// Floating label owned by a player entity; destroyed along with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nameplate {
    pub owner: Entity,
    pub text: String,
}
define_component!(Nameplate, "Nameplate");

/// Kind-specific components, as a closed set the mapper can reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Velocity,
    Health,
    Score,
    Player,
    Enemy,
    Boss,
    Bullet,
    Powerup,
    Obstacle,
    Collider,
    LocalPlayer,
    Interpolation,
}

const ALL_PARTS: [Part; 12] = [
    Part::Velocity,
    Part::Health,
    Part::Score,
    Part::Player,
    Part::Enemy,
    Part::Boss,
    Part::Bullet,
    Part::Powerup,
    Part::Obstacle,
    Part::Collider,
    Part::LocalPlayer,
    Part::Interpolation,
];

impl Part {
    fn present(self, world: &World, e: Entity) -> bool {
        match self {
            Part::Velocity => world.has_component::<Velocity>(e),
            Part::Health => world.has_component::<Health>(e),
            Part::Score => world.has_component::<Score>(e),
            Part::Player => world.has_component::<Player>(e),
            Part::Enemy => world.has_component::<Enemy>(e),
            Part::Boss => world.has_component::<Boss>(e),
            Part::Bullet => world.has_component::<Bullet>(e),
            Part::Powerup => world.has_component::<Powerup>(e),
            Part::Obstacle => world.has_component::<Obstacle>(e),
            Part::Collider => world.has_component::<Collider>(e),
            Part::LocalPlayer => world.has_component::<LocalPlayer>(e),
            Part::Interpolation => world.has_component::<InterpolationState>(e),
        }
    }

    fn strip(self, world: &mut World, e: Entity) -> bool {
        match self {
            Part::Velocity => world.remove_component::<Velocity>(e).is_some(),
            Part::Health => world.remove_component::<Health>(e).is_some(),
            Part::Score => world.remove_component::<Score>(e).is_some(),
            Part::Player => world.remove_component::<Player>(e).is_some(),
            Part::Enemy => world.remove_component::<Enemy>(e).is_some(),
            Part::Boss => world.remove_component::<Boss>(e).is_some(),
            Part::Bullet => world.remove_component::<Bullet>(e).is_some(),
            Part::Powerup => world.remove_component::<Powerup>(e).is_some(),
            Part::Obstacle => world.remove_component::<Obstacle>(e).is_some(),
            Part::Collider => world.remove_component::<Collider>(e).is_some(),
            Part::LocalPlayer => world.remove_component::<LocalPlayer>(e).is_some(),
            Part::Interpolation => world.remove_component::<InterpolationState>(e).is_some(),
        }
    }
}

fn required(kind: EntityKind) -> &'static [Part] {
    match kind {
        EntityKind::Player => &[Part::Player, Part::Velocity, Part::Health, Part::Score],
        EntityKind::Enemy => &[Part::Enemy, Part::Velocity, Part::Health],
        EntityKind::Boss => &[Part::Boss, Part::Velocity, Part::Health],
        EntityKind::Bullet => &[Part::Bullet, Part::Velocity],
        EntityKind::Powerup => &[Part::Powerup],
        EntityKind::Obstacle => &[Part::Obstacle, Part::Collider, Part::Health],
    }
}

fn optional(kind: EntityKind) -> &'static [Part] {
    match kind {
        EntityKind::Player => &[Part::LocalPlayer, Part::Interpolation],
        EntityKind::Obstacle => &[],
        _ => &[Part::Interpolation],
    }
}

fn allowed(kind: EntityKind, part: Part) -> bool {
    required(kind).contains(&part) || optional(kind).contains(&part)
}

/// Whether `e` is alive and holds exactly the component set of `kind`:
/// every required component present, nothing belonging only to other kinds.
pub fn conforms(world: &World, e: Entity, kind: EntityKind) -> bool {
    world.is_alive(e)
        && world.has_component::<Position>(e)
        && required(kind).iter().all(|part| part.present(world, e))
        && ALL_PARTS
            .iter()
            .filter(|&&part| !allowed(kind, part))
            .all(|part| !part.present(world, e))
}

/// Remove every kind-specific component that `kind` does not allow.
/// Returns how many components were stripped.
pub fn scrub(world: &mut World, e: Entity, kind: EntityKind) -> usize {
    ALL_PARTS
        .iter()
        .filter(|&&part| !allowed(kind, part))
        .filter(|&&part| part.strip(world, e))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_bullet(world: &mut World) -> Entity {
        let e = world.create();
        world.add_component(e, Position(Vec2::ZERO)).unwrap();
        world.add_component(e, Velocity(Vec2::X)).unwrap();
        world
            .add_component(
                e,
                Bullet {
                    kind: BulletKind::Standard,
                    owner: 1,
                },
            )
            .unwrap();
        e
    }

    #[test]
    fn test_bullet_conforms_only_as_bullet() {
        let mut world = World::new();
        let e = spawn_bullet(&mut world);
        assert!(conforms(&world, e, EntityKind::Bullet));
        assert!(!conforms(&world, e, EntityKind::Obstacle));
        assert!(!conforms(&world, e, EntityKind::Enemy));
    }

    #[test]
    fn test_optional_parts_do_not_break_conformance() {
        let mut world = World::new();
        let e = spawn_bullet(&mut world);
        world
            .add_component(e, InterpolationState::settled(Vec2::ZERO, 0.1))
            .unwrap();
        assert!(conforms(&world, e, EntityKind::Bullet));
    }

    #[test]
    fn test_scrub_strips_foreign_components() {
        let mut world = World::new();
        let e = spawn_bullet(&mut world);
        world
            .add_component(
                e,
                Collider {
                    half_extents: Vec2::ONE,
                },
            )
            .unwrap();

        let stripped = scrub(&mut world, e, EntityKind::Obstacle);

        assert_eq!(stripped, 2);
        assert!(!world.has_component::<Velocity>(e));
        assert!(!world.has_component::<Bullet>(e));
        assert!(world.has_component::<Collider>(e));
        assert!(world.has_component::<Position>(e));
    }

    #[test]
    fn test_missing_required_part_does_not_conform() {
        let mut world = World::new();
        let e = spawn_bullet(&mut world);
        world.remove_component::<Velocity>(e);
        assert!(!conforms(&world, e, EntityKind::Bullet));
    }
}
