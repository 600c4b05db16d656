pub mod achievements;
pub mod audit_logs;
pub mod draw_records;
pub mod gacha_batches;
pub mod inventory_items;
pub mod items;
pub mod notifications;
pub mod user_achievements;
pub mod users;

pub use achievements as achievement_entity;
pub use audit_logs as audit_log_entity;
pub use draw_records as draw_record_entity;
pub use gacha_batches as gacha_batch_entity;
pub use inventory_items as inventory_item_entity;
pub use items::Rarity;
pub use items as item_entity;
pub use notifications as notification_entity;
pub use user_achievements as user_achievement_entity;
pub use users as user_entity;
