//! `oficina-catalog` — the material catalog domain.
//!
//! Materials are named, priced items available for consumption by work
//! orders. They are leaf entities: nothing here depends on work orders.

pub mod material;

pub use material::{MAX_NAME_LEN, Material};
