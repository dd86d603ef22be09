pub mod dao_registry;
pub mod otc_order;
pub mod reward_pool;
pub mod swap_tracker;
pub mod user_claim;
pub mod vesting_escrow;

pub use dao_registry::*;
pub use otc_order::*;
pub use reward_pool::*;
pub use swap_tracker::*;
pub use user_claim::*;
pub use vesting_escrow::*;
