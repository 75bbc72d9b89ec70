//! Entity handle with generational index
//!
//! Entities are lightweight handles (8 bytes) with no payload of their own.
//! The index addresses a slot in every component store; the generation
//! distinguishes a recycled slot from the handle that used to own it.

/// Entity handle (generation-indexed for safety)
///
/// - Index: Slot in the registry and in every component store
/// - Generation: Incremented on destruction (stale handles stop resolving)
///
/// Example:
/// ```ignore
/// let entity = world.create();
/// world.destroy(entity);
/// assert!(!world.is_alive(entity));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_order() {
        let e = Entity::new(42, 7);
        assert_eq!(e.to_string(), "42v7");
        assert!(Entity::new(3, 9) < Entity::new(4, 0));
    }
}
