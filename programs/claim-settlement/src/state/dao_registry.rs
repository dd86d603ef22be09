use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::SettlementError;

/// Bounded governance seat registry. Seat holders are recorded on their own
/// UserClaim; the registry tracks occupancy. Seats are never reclaimed
/// automatically.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct DaoRegistry {
    pub is_initialized: bool,
    pub authority: Pubkey,
    pub max_seats: u32,
    pub occupied_seats: u32,
    pub min_stake: u64,
    pub month6_timestamp: i64,
    pub bump: u8,
}

impl DaoRegistry {
    pub const LEN: usize = 1 + 32 + 4 + 4 + 8 + 8 + 1;

    pub fn new(
        authority: Pubkey,
        max_seats: u32,
        min_stake: u64,
        month6_timestamp: i64,
        bump: u8,
    ) -> Self {
        Self {
            is_initialized: true,
            authority,
            max_seats,
            occupied_seats: 0,
            min_stake,
            month6_timestamp,
            bump,
        }
    }

    pub fn assign_seat(&mut self) -> Result<(), SettlementError> {
        if self.occupied_seats >= self.max_seats {
            return Err(SettlementError::NoSeatsAvailable);
        }
        self.occupied_seats += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seats_are_bounded() {
        let mut registry = DaoRegistry::new(Pubkey::new_unique(), 2, 1_000, 0, 255);
        assert!(registry.assign_seat().is_ok());
        assert!(registry.assign_seat().is_ok());
        assert_eq!(
            registry.assign_seat(),
            Err(SettlementError::NoSeatsAvailable)
        );
        assert_eq!(registry.occupied_seats, 2);
    }
}
