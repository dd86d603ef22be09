use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::constants::*;
use crate::error::SettlementError;

/// Economic role a participant converts their mined allocation into.
///
/// Transitions form a DAG: None -> Staker, None -> Patron, Staker -> Patron.
/// A patron can never step back down.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    None,
    Staker,
    Patron,
}

impl Role {
    /// Lock duration this role commits to when locking tokens.
    pub fn default_lock_duration(&self) -> u8 {
        match self {
            Role::None => 0,
            Role::Staker => STAKER_LOCK_MONTHS,
            Role::Patron => PATRON_LOCK_MONTHS,
        }
    }

    /// Annualized yield rate in basis points.
    pub fn yield_rate_bps(&self) -> u64 {
        match self {
            Role::None => 0,
            Role::Staker => STAKER_YIELD_BPS,
            Role::Patron => PATRON_YIELD_BPS,
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatronStatus {
    None,
    Applied,
    Approved,
    Revoked,
}

/// Per-participant claim record. Created once by InitializeUserClaim and
/// never deleted; it is the permanent ledger of a participant's history.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct UserClaim {
    pub is_initialized: bool,
    pub participant: Pubkey,
    pub role: Role,
    pub patron_status: PatronStatus,

    /// Cumulative mined totals, posted by the operator-gated stats update.
    /// Only ever increase.
    pub mined_phase1: u64,
    pub mined_phase2: u64,

    pub wallet_age_days: u32,
    pub community_score: u8,
    pub patron_qualification_score: u8,

    /// Claimed, unlocked token balance in the engine's ledger.
    pub spendable_balance: u64,

    pub locked_amount: u64,
    pub lock_start: i64,
    pub lock_end: i64,
    pub lock_duration_months: u8,

    pub last_yield_claim: i64,
    pub total_yield_claimed: u64,

    pub sold_early: bool,
    pub mined_in_phase2: bool,
    pub dao_eligible: bool,
    pub dao_seat_holder: bool,

    pub bump: u8,
}

impl UserClaim {
    pub const LEN: usize = 1 + // is_initialized
        32 + // participant
        1 + // role
        1 + // patron_status
        8 + // mined_phase1
        8 + // mined_phase2
        4 + // wallet_age_days
        1 + // community_score
        1 + // patron_qualification_score
        8 + // spendable_balance
        8 + // locked_amount
        8 + // lock_start
        8 + // lock_end
        1 + // lock_duration_months
        8 + // last_yield_claim
        8 + // total_yield_claimed
        1 + // sold_early
        1 + // mined_in_phase2
        1 + // dao_eligible
        1 + // dao_seat_holder
        1; // bump

    pub fn new(participant: Pubkey, bump: u8) -> Self {
        Self {
            is_initialized: true,
            participant,
            role: Role::None,
            patron_status: PatronStatus::None,
            mined_phase1: 0,
            mined_phase2: 0,
            wallet_age_days: 0,
            community_score: 0,
            patron_qualification_score: 0,
            spendable_balance: 0,
            locked_amount: 0,
            lock_start: 0,
            lock_end: 0,
            lock_duration_months: 0,
            last_yield_claim: 0,
            total_yield_claimed: 0,
            sold_early: false,
            mined_in_phase2: false,
            dao_eligible: false,
            dao_seat_holder: false,
            bump,
        }
    }

    pub fn mined_total(&self) -> u64 {
        self.mined_phase1.saturating_add(self.mined_phase2)
    }

    /// Validate a role transition without applying it.
    ///
    /// Leaving None requires mining history; either edge into Patron requires
    /// an approved application. Everything outside the DAG (including
    /// re-selecting the current role) is rejected.
    pub fn validate_role_transition(&self, new_role: Role) -> Result<(), SettlementError> {
        match (self.role, new_role) {
            (Role::None, Role::Staker) => {
                if self.mined_total() == 0 {
                    return Err(SettlementError::NoMiningHistory);
                }
                Ok(())
            }
            (Role::None, Role::Patron) => {
                if self.mined_total() == 0 {
                    return Err(SettlementError::NoMiningHistory);
                }
                if self.patron_status != PatronStatus::Approved {
                    return Err(SettlementError::PatronNotApproved);
                }
                Ok(())
            }
            (Role::Staker, Role::Patron) => {
                if self.patron_status != PatronStatus::Approved {
                    return Err(SettlementError::PatronNotApproved);
                }
                Ok(())
            }
            _ => Err(SettlementError::InvalidRoleTransition),
        }
    }

    /// Apply a validated role transition.
    pub fn select_role(&mut self, new_role: Role) -> Result<(), SettlementError> {
        self.validate_role_transition(new_role)?;
        self.role = new_role;
        Ok(())
    }

    /// Deterministic, clamped patron qualification score.
    ///
    /// Wallet age earns up to 40 points (1 per 30 days), community score up
    /// to 40 (scaled from its 0-100 input), mining up to 20 (1 per 1000
    /// tokens). The sum is clamped to 100.
    pub fn compute_qualification_score(
        wallet_age_days: u32,
        community_score: u8,
        mined_total: u64,
    ) -> u8 {
        let age_points = (wallet_age_days as u64 / WALLET_AGE_DAYS_PER_POINT).min(WALLET_AGE_POINT_CAP);
        let community_points =
            (community_score.min(100) as u64 * COMMUNITY_POINT_CAP) / 100;
        let mining_points = (mined_total / MINED_TOKENS_PER_POINT).min(MINING_POINT_CAP);

        (age_points + community_points + mining_points).min(QUALIFICATION_MAX_SCORE as u64) as u8
    }

    /// Yield accrued since the last claim, as a pure function of stored
    /// timestamps and the supplied clock. There is no background accrual;
    /// this is recomputed on every call.
    pub fn pending_yield(&self, now: i64) -> Result<u64, SettlementError> {
        if self.locked_amount == 0 {
            return Ok(0);
        }
        let elapsed = now.saturating_sub(self.last_yield_claim);
        if elapsed <= 0 {
            return Ok(0);
        }

        let accrued = (self.locked_amount as u128)
            .checked_mul(self.role.yield_rate_bps() as u128)
            .and_then(|v| v.checked_mul(elapsed as u128))
            .ok_or(SettlementError::ArithmeticOverflow)?
            / (BPS_DENOMINATOR as u128 * SECONDS_PER_YEAR as u128);

        u64::try_from(accrued).map_err(|_| SettlementError::ArithmeticOverflow)
    }

    /// DAO seat eligibility: an approved patron with enough at stake, past the
    /// six-month mark, who has never exited early.
    pub fn dao_eligibility(
        &self,
        min_stake: u64,
        month6_timestamp: i64,
        has_early_exit: bool,
        now: i64,
    ) -> bool {
        let six_months_locked =
            self.locked_amount > 0 && self.lock_start + 6 * SECONDS_PER_MONTH <= now;

        self.role == Role::Patron
            && self.locked_amount >= min_stake
            && (now >= month6_timestamp || six_months_locked)
            && !has_early_exit
    }
}
