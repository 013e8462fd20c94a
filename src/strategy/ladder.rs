use std::collections::HashSet;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::{Order, OrderSide};

/// Cap on cancels queued in a single tick's far-orders phase (§4.4 step 5).
pub const MAX_CANCELS_PER_TICK: usize = 10;

/// Buy/sell ratio pair after inventory-aware adjustment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InventoryRatios {
    pub buy_ratio: Decimal,
    pub sell_ratio: Decimal,
}

/// Applies the hard cap / proportional skew / clamp rules of §4.4 step 2.
/// `signed_position` is the position's signed quantity in base units;
/// positive is long.
pub fn adjust_ratios(
    base_buy: Decimal,
    base_sell: Decimal,
    signed_position: Decimal,
    order_size: Decimal,
    max_multiplier: Decimal,
) -> InventoryRatios {
    if order_size.is_zero() {
        return InventoryRatios {
            buy_ratio: base_buy,
            sell_ratio: base_sell,
        };
    }

    let m = (signed_position / order_size).abs();

    if m >= max_multiplier {
        return if signed_position > Decimal::ZERO {
            InventoryRatios {
                buy_ratio: Decimal::ZERO,
                sell_ratio: Decimal::ONE,
            }
        } else {
            InventoryRatios {
                buy_ratio: Decimal::ONE,
                sell_ratio: Decimal::ZERO,
            }
        };
    }

    if m.is_zero() {
        return InventoryRatios {
            buy_ratio: clamp_ratio(base_buy),
            sell_ratio: clamp_ratio(base_sell),
        };
    }

    let skew = Decimal::ONE - (m / max_multiplier);
    let (buy_ratio, sell_ratio) = if signed_position > Decimal::ZERO {
        let buy = base_buy * skew;
        (buy, Decimal::ONE - buy)
    } else {
        let sell = base_sell * skew;
        (Decimal::ONE - sell, sell)
    };

    InventoryRatios {
        buy_ratio: clamp_ratio(buy_ratio),
        sell_ratio: clamp_ratio(sell_ratio),
    }
}

fn clamp_ratio(r: Decimal) -> Decimal {
    r.clamp(Decimal::new(1, 1), Decimal::new(9, 1))
}

/// `(sell_count, buy_count)` splitting `total_orders` by `sell_ratio`.
pub fn count_split(total_orders: u32, sell_ratio: Decimal) -> (u32, u32) {
    let sell_count = (Decimal::from(total_orders) * sell_ratio)
        .round()
        .to_i64()
        .unwrap_or(0)
        .clamp(0, total_orders as i64) as u32;
    (sell_count, total_orders - sell_count)
}

/// The validated ideal price ladder for one tick (§4.4 step 4).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LadderPrices {
    pub sells: Vec<Decimal>,
    pub buys: Vec<Decimal>,
}

fn floor_to_multiple(value: Decimal, interval: Decimal) -> Decimal {
    (value / interval).floor() * interval
}

fn ceil_to_multiple(value: Decimal, interval: Decimal) -> Decimal {
    (value / interval).ceil() * interval
}

#[allow(clippy::too_many_arguments)]
pub fn build_ladder(
    mid: Decimal,
    bid: Decimal,
    ask: Decimal,
    half_window: Decimal,
    interval: Decimal,
    safe_gap: Decimal,
    max_drift_buffer: Decimal,
    min_valid_price: Decimal,
    sell_count: u32,
    buy_count: u32,
) -> LadderPrices {
    let sell_ceiling = mid + half_window + max_drift_buffer;
    let buy_floor_window = mid - half_window - max_drift_buffer;

    let sell_floor = ask + safe_gap;
    let mut sell_start = ceil_to_multiple(sell_floor, interval);
    if sell_start == sell_floor {
        sell_start += interval;
    }

    let mut sells = Vec::with_capacity(sell_count as usize);
    let mut price = sell_start;
    for _ in 0..sell_count {
        if price > sell_ceiling {
            break;
        }
        sells.push(price);
        price += interval;
    }

    let buy_ceiling = bid - safe_gap;
    let mut buy_start = floor_to_multiple(buy_ceiling, interval);
    if buy_start == buy_ceiling {
        buy_start -= interval;
    }

    let mut buys = Vec::with_capacity(buy_count as usize);
    let mut price = buy_start;
    for _ in 0..buy_count {
        if price < buy_floor_window || price < min_valid_price {
            break;
        }
        buys.push(price);
        price -= interval;
    }

    sells.retain(|p| *p >= ask + safe_gap);
    buys.retain(|p| *p <= bid - safe_gap);

    LadderPrices { sells, buys }
}

/// A set of one or more live orders resting at the same `(side, price)`.
/// `orders` is assumed oldest-first when ordering data is available.
#[derive(Clone, Debug)]
pub struct OrderGroup {
    pub side: OrderSide,
    pub price: Decimal,
    pub orders: Vec<Order>,
}

/// Groups open orders by `(side, price)`, preserving submission order
/// within each group (§4.4 step 1).
pub fn group_open_orders(orders: &[Order]) -> Vec<OrderGroup> {
    let mut groups: Vec<OrderGroup> = Vec::new();
    for order in orders {
        let Some(price) = order.limit_price else {
            continue;
        };
        if let Some(group) = groups
            .iter_mut()
            .find(|g| g.side == order.side && g.price == price)
        {
            group.orders.push(order.clone());
        } else {
            groups.push(OrderGroup {
                side: order.side,
                price,
                orders: vec![order.clone()],
            });
        }
    }
    for group in &mut groups {
        group.orders.sort_by_key(|o| o.created_at);
    }
    groups
}

/// One queued cancellation. `order_id` is set for the duplicate-collapse
/// phase (cancel by id); `None` means "locate the first live order at
/// `(side, price)` and cancel that" (far-orders phase).
#[derive(Clone, Debug, PartialEq)]
pub struct CancelTarget {
    pub order_id: Option<String>,
    pub side: OrderSide,
    pub price: Decimal,
}

#[derive(Clone, Debug, Default)]
pub struct ReconciliationPlan {
    pub to_place_sells: Vec<Decimal>,
    pub to_place_buys: Vec<Decimal>,
    pub to_cancel: Vec<CancelTarget>,
}

/// Builds the diff of §4.4 step 5 from the validated ladder and the
/// existing order groups.
pub fn plan_diff(
    ladder: &LadderPrices,
    sell_target: usize,
    buy_target: usize,
    groups: &[OrderGroup],
    mid: Decimal,
    safe_gap: Decimal,
    total_orders: usize,
) -> ReconciliationPlan {
    let mut to_cancel = Vec::new();

    for group in groups {
        for dup in group.orders.iter().skip(1) {
            to_cancel.push(CancelTarget {
                order_id: Some(dup.venue_order_id.clone()),
                side: group.side,
                price: group.price,
            });
        }
    }

    let existing_sell_prices: HashSet<Decimal> = groups
        .iter()
        .filter(|g| g.side == OrderSide::Sell)
        .map(|g| g.price)
        .collect();
    let existing_buy_prices: HashSet<Decimal> = groups
        .iter()
        .filter(|g| g.side == OrderSide::Buy)
        .map(|g| g.price)
        .collect();

    let unique_existing_set: HashSet<Decimal> = existing_sell_prices
        .union(&existing_buy_prices)
        .cloned()
        .collect();
    let mut unique_existing = unique_existing_set.len();

    let ideal_sell_set: HashSet<Decimal> = ladder.sells.iter().cloned().collect();
    let ideal_buy_set: HashSet<Decimal> = ladder.buys.iter().cloned().collect();

    let far_phase_needed = unique_existing > total_orders
        || existing_sell_prices.len() > sell_target
        || existing_buy_prices.len() > buy_target;

    if far_phase_needed {
        let two_gap = safe_gap * Decimal::from(2);
        let mut candidates: Vec<&OrderGroup> = groups
            .iter()
            .filter(|g| {
                let in_ideal = if g.side == OrderSide::Sell {
                    ideal_sell_set.contains(&g.price)
                } else {
                    ideal_buy_set.contains(&g.price)
                };
                !in_ideal && (g.price - mid).abs() >= two_gap
            })
            .collect();
        candidates.sort_by(|a, b| (b.price - mid).abs().cmp(&(a.price - mid).abs()));

        for group in candidates {
            if unique_existing <= total_orders || to_cancel.len() >= MAX_CANCELS_PER_TICK {
                break;
            }
            to_cancel.push(CancelTarget {
                order_id: None,
                side: group.side,
                price: group.price,
            });
            unique_existing -= 1;
        }
    }

    let to_place_sells = ladder
        .sells
        .iter()
        .filter(|p| !existing_sell_prices.contains(p))
        .cloned()
        .collect();
    let to_place_buys = ladder
        .buys
        .iter()
        .filter(|p| !existing_buy_prices.contains(p))
        .cloned()
        .collect();

    ReconciliationPlan {
        to_place_sells,
        to_place_buys,
        to_cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn hard_cap_zeroes_buy_ratio_when_long_and_over_multiplier() {
        let r = adjust_ratios(dec!(0.5), dec!(0.5), dec!(16), dec!(1), dec!(15));
        assert_eq!(r.buy_ratio, Decimal::ZERO);
        assert_eq!(r.sell_ratio, Decimal::ONE);
    }

    #[test]
    fn hard_cap_mirrors_when_short_and_over_multiplier() {
        let r = adjust_ratios(dec!(0.5), dec!(0.5), dec!(-16), dec!(1), dec!(15));
        assert_eq!(r.buy_ratio, Decimal::ONE);
        assert_eq!(r.sell_ratio, Decimal::ZERO);
    }

    #[test]
    fn flat_position_leaves_base_ratios_after_clamp() {
        let r = adjust_ratios(dec!(0.5), dec!(0.5), Decimal::ZERO, dec!(1), dec!(15));
        assert_eq!(r.buy_ratio, dec!(0.5));
        assert_eq!(r.sell_ratio, dec!(0.5));
    }

    #[test]
    fn partial_long_inventory_skews_buy_ratio_down() {
        let r = adjust_ratios(dec!(0.5), dec!(0.5), dec!(5), dec!(1), dec!(10));
        assert!(r.buy_ratio < dec!(0.5));
        assert!(r.sell_ratio > dec!(0.5));
        assert!(r.buy_ratio >= dec!(0.1));
    }

    #[test]
    fn count_split_rounds_and_complements() {
        let (sell, buy) = count_split(18, dec!(0.5));
        assert_eq!(sell + buy, 18);
    }

    #[test]
    fn sell_start_steps_past_exact_multiple() {
        // ask + safe_gap = 1020, already a multiple of 10 -> must step to 1030.
        let ladder = build_ladder(
            dec!(1000),
            dec!(995),
            dec!(1005),
            dec!(120),
            dec!(10),
            dec!(15),
            dec!(2000),
            dec!(0),
            1,
            0,
        );
        assert_eq!(ladder.sells.first().copied(), Some(dec!(1030)));
    }

    #[test]
    fn buy_side_respects_min_valid_price_floor() {
        let ladder = build_ladder(
            dec!(10000),
            dec!(9950),
            dec!(10050),
            dec!(1200),
            dec!(10),
            dec!(20),
            dec!(2000),
            dec!(9920),
            0,
            20,
        );
        assert!(ladder.buys.iter().all(|p| *p >= dec!(9920)));
    }

    #[test]
    fn duplicate_orders_queue_all_but_oldest_for_cancel() {
        let base = sample_order(OrderSide::Buy, dec!(100), "a");
        let mut dup1 = sample_order(OrderSide::Buy, dec!(100), "b");
        dup1.created_at = base.created_at + chrono::Duration::seconds(1);
        let groups = group_open_orders(&[base.clone(), dup1.clone()]);
        let plan = plan_diff(
            &LadderPrices::default(),
            0,
            0,
            &groups,
            dec!(100),
            dec!(20),
            18,
        );
        assert_eq!(plan.to_cancel.len(), 1);
        assert_eq!(plan.to_cancel[0].order_id, Some("b".to_string()));
    }

    #[test]
    fn far_orders_beyond_two_safe_gap_are_cancelled_when_over_budget() {
        let mut groups = Vec::new();
        for i in 0..20 {
            groups.push(OrderGroup {
                side: OrderSide::Buy,
                price: dec!(100) - Decimal::from(i * 100),
                orders: vec![sample_order(OrderSide::Buy, dec!(100) - Decimal::from(i * 100), &format!("o{i}"))],
            });
        }
        let plan = plan_diff(
            &LadderPrices::default(),
            0,
            0,
            &groups,
            dec!(100),
            dec!(20),
            5,
        );
        assert!(plan.to_cancel.len() <= MAX_CANCELS_PER_TICK);
        assert!(!plan.to_cancel.is_empty());
    }

    fn sample_order(side: OrderSide, price: Decimal, id: &str) -> Order {
        use crate::domain::{OrderStatus, OrderType};
        Order {
            venue_order_id: id.to_string(),
            client_order_id: None,
            symbol: "BTC-USD".to_string(),
            side,
            order_type: OrderType::Limit,
            quantity: dec!(1),
            limit_price: Some(price),
            status: OrderStatus::New,
            filled_quantity: Decimal::ZERO,
            average_fill_price: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            post_only: true,
            reduce_only: false,
        }
    }
}
