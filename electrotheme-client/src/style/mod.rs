//! Style payload storage and delivery.
//!
//! - [`StyleStore`]: latest payload, broadcast on every update
//! - [`ConsumerRegistry`]: where consumers come from
//! - [`FileSurface`]: consumer that writes the stylesheet to disk

mod registry;
mod store;
mod surface;

pub use registry::{Consumer, ConsumerId, ConsumerRegistry, InMemoryRegistry};
pub use store::{StylePayload, StyleStore};
pub use surface::{FileSurface, SurfaceConfig};
