use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

/// Custody sub-account for a participant's active lock. Logically owned by
/// the engine, not the participant, while `is_active`. Created on the first
/// lock and re-armed on later ones; drained and deactivated on unlock or
/// force exit.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct VestingEscrow {
    pub is_initialized: bool,
    pub participant: Pubkey,
    pub amount: u64,
    pub locked_at: i64,
    pub unlock_at: i64,
    pub is_active: bool,
    /// Set when the early-exit burn is taken for this lock; the burn is
    /// applied at most once per lock however many times the penalty path runs.
    pub penalty_applied: bool,
    pub bump: u8,
}

impl VestingEscrow {
    pub const LEN: usize = 1 + 32 + 8 + 8 + 8 + 1 + 1 + 1;

    pub fn new(participant: Pubkey, bump: u8) -> Self {
        Self {
            is_initialized: true,
            participant,
            amount: 0,
            locked_at: 0,
            unlock_at: 0,
            is_active: false,
            penalty_applied: false,
            bump,
        }
    }

    /// Arm the escrow for a new lock.
    pub fn arm(&mut self, amount: u64, locked_at: i64, unlock_at: i64) {
        self.amount = amount;
        self.locked_at = locked_at;
        self.unlock_at = unlock_at;
        self.is_active = true;
        self.penalty_applied = false;
    }

    /// Drain the escrow, returning the held amount.
    pub fn close(&mut self) -> u64 {
        let held = self.amount;
        self.amount = 0;
        self.is_active = false;
        held
    }
}
