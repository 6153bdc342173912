pub mod hull;
pub mod module;
#[allow(clippy::module_inception)]
pub mod ship;

pub use hull::{generate_hull, HullControlPoints, HULL_POINT_COUNT};
pub use module::{Module, ModuleFlags, ModuleKind, ModuleRecord, CANNON_MAGAZINE_CAPACITY, CANNON_RELOAD_TIME_S};
pub use ship::{DeckAabb, Ship, ShipPhysicsParams};
