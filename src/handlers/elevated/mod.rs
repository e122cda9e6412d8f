// handlers/elevated/mod.rs - Elevated handlers (administrator required)
//
// Catalog writes. Every route here sits behind `require_administrator`.

pub mod resources;

pub use resources::{batch_create_points, create_resource, delete_resource, update_resource};
