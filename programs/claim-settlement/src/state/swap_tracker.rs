use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::SettlementError;

/// Per-participant swap and exit history. Created lazily on the first
/// swap/exit event. Everything accumulates monotonically except
/// `is_dao_eligible`, which is a one-way trapdoor: once an early exit clears
/// it, no later activity sets it again.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct OtcSwapTracker {
    pub is_initialized: bool,
    pub participant: Pubkey,
    pub total_swapped: u64,
    pub swap_count: u64,
    pub total_burned: u64,
    pub has_early_exit: bool,
    pub is_dao_eligible: bool,
    pub bump: u8,
}

impl OtcSwapTracker {
    pub const LEN: usize = 1 + 32 + 8 + 8 + 8 + 1 + 1 + 1;

    pub fn new(participant: Pubkey, bump: u8) -> Self {
        Self {
            is_initialized: true,
            participant,
            total_swapped: 0,
            swap_count: 0,
            total_burned: 0,
            has_early_exit: false,
            is_dao_eligible: true,
            bump,
        }
    }

    pub fn record_swap(&mut self, amount: u64) -> Result<(), SettlementError> {
        self.total_swapped = self
            .total_swapped
            .checked_add(amount)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        self.swap_count = self
            .swap_count
            .checked_add(1)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Record an early exit. The flag effect is idempotent; the burn amount
    /// accumulates only when the caller actually burned (once per lock).
    pub fn record_early_exit(&mut self, burned: u64) -> Result<(), SettlementError> {
        self.total_burned = self
            .total_burned
            .checked_add(burned)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        self.has_early_exit = true;
        self.is_dao_eligible = false;
        Ok(())
    }
}
