mod capability;
mod key_material;
mod requirement;
mod verification;

pub use capability::*;
pub use key_material::*;
pub use requirement::*;
pub use verification::*;
