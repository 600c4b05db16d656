pub mod common;
pub mod gacha;
pub mod points;

pub use common::*;
pub use gacha::*;
pub use points::*;
