use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::SettlementError;
use crate::state::{Role, UserClaim};

/// Which seller role an order is sourced from. The seller's current role must
/// match the declared type at creation time.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapType {
    /// Unconverted allocation sold by a participant who never picked a role.
    ExitSale,
    /// Spendable balance sold by a staker.
    StakerSale,
    /// Spendable balance sold by a patron.
    PatronSale,
}

impl SwapType {
    pub fn allowed_for(&self, role: Role) -> bool {
        matches!(
            (self, role),
            (SwapType::ExitSale, Role::None)
                | (SwapType::StakerSale, Role::Staker)
                | (SwapType::PatronSale, Role::Patron)
        )
    }
}

/// A seller-posted fixed-price offer. At most one live order per seller;
/// consumed whole by a single ExecuteOrder, never partially filled. The
/// offered amount is held on the order (debited from the seller's spendable
/// balance at creation) so a fill can never overdraw the seller.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct OtcOrder {
    pub is_initialized: bool,
    pub seller: Pubkey,
    pub amount: u64,
    /// Lamports per token.
    pub price: u64,
    pub is_active: bool,
    pub created_at: i64,
    pub patrons_only: bool,
    pub treasury_only: bool,
    pub min_patron_score: u8,
    /// Token rebate credited to the buyer from the treasury on execution.
    pub buyer_rebate: u64,
    pub swap_type: SwapType,
    pub bump: u8,
}

impl OtcOrder {
    pub const LEN: usize = 1 + 32 + 8 + 8 + 1 + 8 + 1 + 1 + 1 + 8 + 1 + 1;

    /// Evaluate every buyer restriction against the buyer's record. Any
    /// unmet restriction rejects the whole fill.
    pub fn check_buyer(
        &self,
        buyer: &Pubkey,
        buyer_claim: &UserClaim,
        treasury_authority: &Pubkey,
    ) -> Result<(), SettlementError> {
        if self.patrons_only && buyer_claim.role != Role::Patron {
            return Err(SettlementError::BuyerNotEligible);
        }
        if self.treasury_only && buyer != treasury_authority {
            return Err(SettlementError::BuyerNotEligible);
        }
        if buyer_claim.patron_qualification_score < self.min_patron_score {
            return Err(SettlementError::BuyerNotEligible);
        }
        Ok(())
    }

    pub fn payment_lamports(&self) -> Result<u64, SettlementError> {
        self.price
            .checked_mul(self.amount)
            .ok_or(SettlementError::ArithmeticOverflow)
    }
}
