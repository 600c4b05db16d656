//! 抽卡核心：加权抽取、概率公示与持久化接口

#[cfg(test)]
pub mod memory_store;
pub mod rates;
pub mod sea_store;
pub mod selector;
pub mod store;

#[cfg(test)]
pub use memory_store::{FailPoint, MemoryGachaStore};
pub use rates::current_rates;
pub use sea_store::SeaOrmGachaStore;
pub use selector::{CumulativeTable, RARITY_WEIGHTS, effective_weight, sort_for_draw};
pub use store::{DrawWithItem, GachaStore, GachaUnit};

/// 抽卡历史单次返回上限
pub const HISTORY_PAGE_SIZE: u64 = 50;

/// 未指定次数时的多连抽次数
pub const DEFAULT_BATCH_COUNT: i64 = 10;

/// 首次抽卡成就
pub const FIRST_GACHA_ACHIEVEMENT: &str = "FIRST_GACHA";
