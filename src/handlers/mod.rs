pub mod gacha;
pub mod points;

pub use gacha::gacha_config;
pub use points::points_config;
