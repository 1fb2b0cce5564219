//! 库存阈值评估器
//!
//! 边沿触发：只有写入前后的水平分类发生**变化**才产出事件，
//! 同水平内的反复写入不重复告警（避免通知风暴）。
//!
//! 恢复到 Sufficient 的越界被压制，只对恶化方向告警。
//! （产品决策见 DESIGN.md：降噪优先，恢复不打扰。）

use shared::util::now_millis;
use shared::{DomainEvent, StockLevel};

/// 评估一次数量变更
///
/// 返回 `Some(StockLevelCrossed)` 当且仅当：
/// - 新旧数量的水平分类不同（边沿触发），且
/// - 新水平是 `Depleted` 或 `Low`（恶化方向）。
pub fn evaluate(
    product_id: &str,
    product_name: &str,
    previous_qty: i64,
    new_qty: i64,
) -> Option<DomainEvent> {
    let previous_level = StockLevel::classify(previous_qty);
    let new_level = StockLevel::classify(new_qty);

    if previous_level == new_level {
        return None;
    }

    if new_level == StockLevel::Sufficient {
        // 恢复告警压制
        tracing::debug!(
            product_id = %product_id,
            from = %previous_level,
            "Stock recovered to sufficient, notification suppressed"
        );
        return None;
    }

    Some(DomainEvent::StockLevelCrossed {
        product_id: product_id.to_string(),
        product_name: product_name.to_string(),
        level: new_level,
        quantity: new_qty,
        at: now_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_of(event: &DomainEvent) -> StockLevel {
        match event {
            DomainEvent::StockLevelCrossed { level, .. } => *level,
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_same_level_change_is_silent() {
        assert!(evaluate("p", "n", 5, 3).is_none()); // Sufficient → Sufficient
        assert!(evaluate("p", "n", 2, 1).is_none()); // Low → Low
        assert!(evaluate("p", "n", 0, 0).is_none()); // Depleted → Depleted
    }

    #[test]
    fn test_degrading_sequence_emits_one_event_per_crossing() {
        let event = evaluate("p", "n", 3, 2).expect("Sufficient → Low must emit");
        assert_eq!(level_of(&event), StockLevel::Low);

        // 3→2 再 2→0：Depleted 事件恰好一个，不重复
        let event = evaluate("p", "n", 2, 0).expect("Low → Depleted must emit");
        assert_eq!(level_of(&event), StockLevel::Depleted);

        // 越界之后同水平内继续写，不再告警
        assert!(evaluate("p", "n", 0, 0).is_none());
        assert!(evaluate("p", "n", 2, 1).is_none());
    }

    #[test]
    fn test_skip_level_crossing_reports_final_level() {
        let event = evaluate("p", "n", 10, 0).expect("Sufficient → Depleted must emit");
        assert_eq!(level_of(&event), StockLevel::Depleted);
    }

    #[test]
    fn test_recovery_is_suppressed() {
        assert!(evaluate("p", "n", 0, 10).is_none()); // Depleted → Sufficient
        assert!(evaluate("p", "n", 1, 5).is_none()); // Low → Sufficient
    }

    #[test]
    fn test_depleted_to_low_still_emits() {
        // 补了一点但仍然偏低：是水平变化且非恢复到充足，照常告警
        let event = evaluate("p", "n", 0, 1).expect("Depleted → Low must emit");
        assert_eq!(level_of(&event), StockLevel::Low);
    }
}
