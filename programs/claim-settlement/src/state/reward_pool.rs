use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::SettlementError;

/// Global treasury and distribution parameters. One instance, created by the
/// operator; every token that enters or leaves the shared pool moves through
/// this balance inside the same instruction that adjusts the counterpart
/// participant record.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct RewardPool {
    pub is_initialized: bool,
    /// Operator identity; gates stats updates, approvals, and force exits.
    pub authority: Pubkey,
    pub treasury_balance: u64,
    pub total_rewards: u64,
    pub rewards_per_second: u64,
    pub start_time: i64,
    pub end_time: i64,
    /// Cumulative burned amount across all early exits, for audit.
    pub total_burned: u64,
    pub bump: u8,
}

impl RewardPool {
    pub const LEN: usize = 1 + 32 + 8 + 8 + 8 + 8 + 8 + 8 + 1;

    pub fn new(
        authority: Pubkey,
        total_rewards: u64,
        rewards_per_second: u64,
        start_time: i64,
        end_time: i64,
        bump: u8,
    ) -> Self {
        Self {
            is_initialized: true,
            authority,
            treasury_balance: total_rewards,
            total_rewards,
            rewards_per_second,
            start_time,
            end_time,
            total_burned: 0,
            bump,
        }
    }

    pub fn debit(&mut self, amount: u64) -> Result<(), SettlementError> {
        self.treasury_balance = self
            .treasury_balance
            .checked_sub(amount)
            .ok_or(SettlementError::InsufficientTreasury)?;
        Ok(())
    }

    pub fn credit(&mut self, amount: u64) -> Result<(), SettlementError> {
        self.treasury_balance = self
            .treasury_balance
            .checked_add(amount)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn record_burn(&mut self, amount: u64) -> Result<(), SettlementError> {
        self.total_burned = self
            .total_burned
            .checked_add(amount)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        Ok(())
    }
}
