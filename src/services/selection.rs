//! 按层合并可抽取 ticket, 生成今天新增的抽取列表

use std::collections::HashSet;
use uuid::Uuid;

use crate::entities::ticket_entity as tickets;
use crate::services::eligibility_service::{Tier, TierLists};

/// 合并四层结果:
/// - 已到期 / 必抽两层全部加入, 不受 quota 限制
/// - 即将到期 / 可抽两层只在 (今天已抽 + 本次新增) < quota 时加入
///
/// `taken` 预先放入今天已抽取的 ticket, 每加入一个立即写入, 避免跨层重复
pub fn assemble_selection(
    tiers: &TierLists,
    taken: &mut HashSet<Uuid>,
    quota: usize,
) -> Vec<tickets::Model> {
    let mut selected = Vec::new();

    for (tier, list) in tiers.iter() {
        for ticket in list {
            if taken.contains(&ticket.id) {
                continue;
            }
            if tier.counts_against_quota() && taken.len() >= quota {
                break;
            }
            taken.insert(ticket.id);
            selected.push(ticket.clone());
        }
    }

    log::debug!(
        "Selected {} new tickets (quota {quota}, taken {})",
        selected.len(),
        taken.len()
    );
    selected
}

/// 某个 ticket 在合并结果中属于哪一层 (第一次出现的层)
pub fn tier_of(tiers: &TierLists, ticket_id: Uuid) -> Option<Tier> {
    tiers
        .iter()
        .find(|(_, list)| list.iter().any(|t| t.id == ticket_id))
        .map(|(tier, _)| tier)
}
