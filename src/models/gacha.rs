use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::entities::{
    Rarity, draw_record_entity as draw_records, inventory_item_entity as inventory_items,
    item_entity as items,
};

/// 概率公示
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GachaRatesResponse {
    /// 稀有度 -> 权重
    pub weights: BTreeMap<String, i64>,
    /// 稀有度 -> 概率 (weight / total)
    pub probabilities: BTreeMap<String, f64>,
    /// 单抽价格
    pub cost_per_draw: i64,
    /// 多连抽次数上限
    pub max_batch: i64,
}

/// 物品基础信息
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemSummary {
    pub id: i64,
    pub name: String,
    pub rarity: Rarity,
    pub power: Option<i32>,
}

impl From<items::Model> for ItemSummary {
    fn from(m: items::Model) -> Self {
        ItemSummary {
            id: m.id,
            name: m.name,
            rarity: m.rarity,
            power: m.power,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DrawRecordResponse {
    pub id: i64,
    pub item_id: i64,
    pub batch_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<draw_records::Model> for DrawRecordResponse {
    fn from(m: draw_records::Model) -> Self {
        DrawRecordResponse {
            id: m.id,
            item_id: m.item_id,
            batch_id: m.batch_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryEntryResponse {
    pub id: i64,
    pub item_id: i64,
    pub source: String,
    pub acquired_at: DateTime<Utc>,
}

impl From<inventory_items::Model> for InventoryEntryResponse {
    fn from(m: inventory_items::Model) -> Self {
        InventoryEntryResponse {
            id: m.id,
            item_id: m.item_id,
            source: m.source,
            acquired_at: m.acquired_at,
        }
    }
}

/// 一次抽取的结果
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpinResult {
    pub item: ItemSummary,
    pub record: DrawRecordResponse,
    pub inventory_entry: InventoryEntryResponse,
}

/// 单抽响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpinResponse {
    pub item: ItemSummary,
    pub record: DrawRecordResponse,
    pub inventory_entry: InventoryEntryResponse,
    /// 扣费后余额
    pub remaining_balance: i64,
}

/// 多连抽请求
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BatchSpinRequest {
    /// 抽取次数 (默认 10，截断到 [1, max_batch])
    pub count: Option<i64>,
}

/// 多连抽响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchSpinResponse {
    /// 分组 ID；分组表不可用时为 null
    pub batch_id: Option<i64>,
    /// 实际抽取次数
    pub count: i64,
    /// 实际扣除积分
    pub total_cost: i64,
    pub results: Vec<SpinResult>,
    pub remaining_balance: i64,
}

/// 抽卡历史条目
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DrawHistoryEntry {
    pub id: i64,
    /// 物品已不存在时为 null
    pub item: Option<ItemSummary>,
    pub created_at: DateTime<Utc>,
    pub batch_id: Option<i64>,
}

impl From<(draw_records::Model, Option<items::Model>)> for DrawHistoryEntry {
    fn from((record, item): (draw_records::Model, Option<items::Model>)) -> Self {
        DrawHistoryEntry {
            id: record.id,
            item: item.map(ItemSummary::from),
            created_at: record.created_at,
            batch_id: record.batch_id,
        }
    }
}
