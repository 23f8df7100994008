mod entity;
mod level;
pub mod notify;
pub mod serialization;
mod transform;

pub use entity::{Behavior, Entity, EntityChange, EntityId, MaterialKey, SpinMode};
pub use level::Level;
pub use notify::{ChangeNotifier, SubscriptionId};
pub use transform::Transform;
