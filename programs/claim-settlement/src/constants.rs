// PDA seeds
pub const REWARD_POOL_SEED: &[u8] = b"reward_pool";
pub const USER_CLAIM_SEED: &[u8] = b"user_claim";
pub const VESTING_ESCROW_SEED: &[u8] = b"vesting_escrow";
pub const OTC_ORDER_SEED: &[u8] = b"otc_order";
pub const SWAP_TRACKER_SEED: &[u8] = b"swap_tracker";
pub const DAO_REGISTRY_SEED: &[u8] = b"dao_registry";

// Time
pub const SECONDS_PER_MONTH: i64 = 30 * 86_400;
pub const SECONDS_PER_YEAR: i64 = 365 * 86_400;

// Lock durations (months)
pub const STAKER_LOCK_MONTHS: u8 = 3;
pub const PATRON_LOCK_MONTHS: u8 = 6;

// Yield rates (annualized, basis points)
pub const STAKER_YIELD_BPS: u64 = 500; // 5%
pub const PATRON_YIELD_BPS: u64 = 1_000; // 10%

// Early exit burn penalty
pub const EARLY_EXIT_PENALTY_BPS: u64 = 2_000; // 20%

pub const BPS_DENOMINATOR: u64 = 10_000;

// Patron qualification scoring (score clamped to 0-100)
pub const QUALIFICATION_MAX_SCORE: u8 = 100;
pub const WALLET_AGE_POINT_CAP: u64 = 40; // 1 point per 30 days of wallet age
pub const WALLET_AGE_DAYS_PER_POINT: u64 = 30;
pub const COMMUNITY_POINT_CAP: u64 = 40; // 0-100 input scaled down to 0-40
pub const MINING_POINT_CAP: u64 = 20; // 1 point per 1000 tokens mined
pub const MINED_TOKENS_PER_POINT: u64 = 1_000;
