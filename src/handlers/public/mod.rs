// handlers/public/mod.rs - Public handlers (no session required)
//
// Catalog reads, account creation, sign-in, and the alias-based recovery flows.

pub mod resources;
pub mod system;
pub mod user;

pub use resources::{get_resource, list_resources};
pub use system::{health, root};
