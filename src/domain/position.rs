use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
    None,
}

/// A per-(account, symbol) position snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub side: PositionSide,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            side: PositionSide::None,
        }
    }

    /// Signed quantity, honoring the invariant that a `Short` side always
    /// reports a negative magnitude regardless of how the venue encoded
    /// the raw quantity field.
    pub fn signed_quantity(&self) -> Decimal {
        match self.side {
            PositionSide::Short => -self.quantity.abs(),
            PositionSide::Long => self.quantity.abs(),
            PositionSide::None => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn short_side_forces_negative_signed_quantity() {
        let p = Position {
            symbol: "BTC-USD".into(),
            quantity: dec!(5),
            entry_price: dec!(50000),
            unrealized_pnl: dec!(0),
            side: PositionSide::Short,
        };
        assert_eq!(p.signed_quantity(), dec!(-5));
    }

    #[test]
    fn flat_position_has_zero_signed_quantity() {
        let p = Position::flat("BTC-USD");
        assert_eq!(p.signed_quantity(), Decimal::ZERO);
    }
}
