// component.rs - Component marker trait
//
// Components are keyed by their Rust type; each type gets its own sparse
// store inside the World. NAME is only used for diagnostics.

/// Trait for types that can be attached to an entity.
///
/// Implementors are plain data: `'static` and owned, so a store can hold
/// them behind a type-erased box.
pub trait Component: 'static + Sized {
    /// Human-readable name for errors and logs.
    const NAME: &'static str;
}

/// Helper macro to implement Component trait.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Copy)]
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position, "Position");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = $name;
        }
    };
}
