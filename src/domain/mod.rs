pub mod account;
pub mod order;
pub mod position;
pub mod ticker;

pub use account::{Account, VenueKind};
pub use order::{Order, OrderSide, OrderStatus, OrderType};
pub use position::{Position, PositionSide};
pub use ticker::{Depth, DepthLevel, Ticker};
