//! Input/output helpers.
//!
//! - trajectory CSV export (`trajectory`)
//! - inversion result JSON read/write (`results`)

pub mod results;
pub mod trajectory;

pub use results::*;
pub use trajectory::*;
