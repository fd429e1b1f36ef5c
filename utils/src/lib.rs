mod hashing;
mod material;
mod moves;
mod openings;

pub use hashing::recompute_hash;
pub use material::{enough_material_to_record, has_insufficient_material};
pub use moves::{gives_check, is_capture, is_quiet};
pub use openings::random_opening;
