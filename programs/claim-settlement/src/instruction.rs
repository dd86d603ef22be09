use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::constants::*;
use crate::error::SettlementError;
use crate::state::{Role, SwapType};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub enum SettlementInstruction {
    /// Create the global reward pool. One-time; the signer becomes the
    /// operator authority and the treasury starts at `total_rewards`.
    /// Accounts:
    /// 0. `[signer, writable]` Authority (payer)
    /// 1. `[writable]` Reward pool PDA
    /// 2. `[]` System program
    InitializeRewardPool {
        total_rewards: u64,
        rewards_per_second: u64,
        start_time: i64,
        end_time: i64,
    },

    /// Create a participant's claim record. Fails if it already exists.
    /// Accounts:
    /// 0. `[signer, writable]` Participant (payer)
    /// 1. `[writable]` User claim PDA
    /// 2. `[]` System program
    InitializeUserClaim,

    /// Operator-only: post verified mining totals. Deltas only ever add.
    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[]` Reward pool PDA
    /// 2. `[writable]` User claim PDA
    UpdateStats {
        participant: Pubkey,
        mined_phase1_delta: u64,
        mined_phase2_delta: u64,
        wallet_age_days: u32,
        community_score: u8,
        phase2_completed: bool,
    },

    /// Apply for patron status; computes the qualification score.
    /// Accounts:
    /// 0. `[signer]` Participant
    /// 1. `[writable]` User claim PDA
    ApplyForPatron {
        wallet_age_days: u32,
        community_score: u8,
    },

    /// Operator-only: approve a pending patron application.
    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[]` Reward pool PDA
    /// 2. `[writable]` User claim PDA
    ApprovePatron {
        participant: Pubkey,
        min_qualification_score: u8,
    },

    /// Operator-only: revoke patron status.
    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[]` Reward pool PDA
    /// 2. `[writable]` User claim PDA
    RevokePatron { participant: Pubkey },

    /// Pick or upgrade the participant's role. Moves no tokens.
    /// Accounts:
    /// 0. `[signer]` Participant
    /// 1. `[writable]` User claim PDA
    SelectRole { new_role: Role },

    /// Combined first-claim path: apply the role transition, then pay
    /// `amount` out of the treasury into the spendable balance.
    /// Accounts:
    /// 0. `[signer]` Participant
    /// 1. `[writable]` User claim PDA
    /// 2. `[writable]` Reward pool PDA
    ClaimTokensWithRole { amount: u64, role: Role },

    /// Move spendable tokens into the vesting escrow for the role's
    /// mandatory duration (3 months staker, 6 months patron).
    /// Accounts:
    /// 0. `[signer, writable]` Participant (payer)
    /// 1. `[writable]` User claim PDA
    /// 2. `[writable]` Vesting escrow PDA
    /// 3. `[]` System program
    LockTokens { amount: u64, duration_months: u8 },

    /// Pay out yield accrued since the last claim, from the treasury.
    /// Accounts:
    /// 0. `[signer]` Participant
    /// 1. `[writable]` User claim PDA
    /// 2. `[writable]` Reward pool PDA
    ClaimYield,

    /// Release an expired lock back to the spendable balance.
    /// Accounts:
    /// 0. `[signer]` Participant
    /// 1. `[writable]` User claim PDA
    /// 2. `[writable]` Vesting escrow PDA
    UnlockTokens,

    /// Operator-only emergency release before lock expiry. Burns the 20%
    /// penalty, permanently clears DAO eligibility, returns the remainder.
    /// Accounts:
    /// 0. `[signer, writable]` Operator (payer for a lazily created tracker)
    /// 1. `[writable]` Reward pool PDA
    /// 2. `[writable]` User claim PDA
    /// 3. `[writable]` Vesting escrow PDA
    /// 4. `[writable]` Swap tracker PDA
    /// 5. `[]` System program
    AdminForceExit { participant: Pubkey },

    /// Post a fixed-price OTC order. The offered amount is reserved from the
    /// seller's spendable balance. One active order per seller.
    /// Accounts:
    /// 0. `[signer, writable]` Seller (payer)
    /// 1. `[writable]` Seller's user claim PDA
    /// 2. `[writable]` OTC order PDA
    /// 3. `[]` System program
    CreateOrder {
        amount: u64,
        price: u64,
        patrons_only: bool,
        treasury_only: bool,
        min_patron_score: u8,
        buyer_rebate: u64,
        swap_type: SwapType,
    },

    /// Fill an order whole: tokens to the buyer's ledger balance, lamport
    /// payment to the seller's wallet, optional token rebate from the
    /// treasury. All-or-nothing.
    /// Accounts:
    /// 0. `[signer, writable]` Buyer (pays the lamport leg)
    /// 1. `[writable]` Seller wallet (receives payment)
    /// 2. `[writable]` OTC order PDA
    /// 3. `[writable]` Buyer's user claim PDA
    /// 4. `[writable]` Reward pool PDA
    /// 5. `[]` System program
    ExecuteOrder,

    /// Seller-only: deactivate an open order and return the reserved amount.
    /// Accounts:
    /// 0. `[signer]` Seller
    /// 1. `[writable]` Seller's user claim PDA
    /// 2. `[writable]` OTC order PDA
    CancelOrder,

    /// Operator-only: record a swap on a participant's tracker, creating the
    /// tracker lazily.
    /// Accounts:
    /// 0. `[signer, writable]` Operator (payer)
    /// 1. `[]` Reward pool PDA
    /// 2. `[writable]` Swap tracker PDA
    /// 3. `[]` System program
    RecordSwap {
        participant: Pubkey,
        amount: u64,
        is_sale: bool,
    },

    /// Operator-only: burn 20% of `exit_amount` from the active escrow and
    /// permanently mark the participant as an early exiter. Burns at most
    /// once per lock; the flag effect is idempotent.
    /// Accounts:
    /// 0. `[signer, writable]` Operator (payer)
    /// 1. `[writable]` Reward pool PDA
    /// 2. `[writable]` User claim PDA
    /// 3. `[writable]` Vesting escrow PDA
    /// 4. `[writable]` Swap tracker PDA
    /// 5. `[]` System program
    ApplyExitPenalty {
        participant: Pubkey,
        exit_amount: u64,
    },

    /// Operator-only one-time DAO registry setup.
    /// Accounts:
    /// 0. `[signer, writable]` Operator (payer)
    /// 1. `[]` Reward pool PDA
    /// 2. `[writable]` DAO registry PDA
    /// 3. `[]` System program
    InitializeRegistry {
        max_seats: u32,
        min_stake: u64,
        month6_timestamp: i64,
    },

    /// Claim a governance seat if eligible and seats remain.
    /// Accounts:
    /// 0. `[signer]` Participant
    /// 1. `[writable]` User claim PDA
    /// 2. `[]` Swap tracker PDA (may be uncreated; treated as clean history)
    /// 3. `[writable]` DAO registry PDA
    ClaimSeat,
}

impl SettlementInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| SettlementError::InvalidInstruction.into())
    }

    pub fn pack(&self) -> Vec<u8> {
        self.try_to_vec().unwrap()
    }
}

// PDA derivation, shared by the processor, builders, and tests.

pub fn find_reward_pool_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[REWARD_POOL_SEED], program_id)
}

pub fn find_user_claim_address(program_id: &Pubkey, participant: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[USER_CLAIM_SEED, participant.as_ref()], program_id)
}

pub fn find_vesting_escrow_address(program_id: &Pubkey, participant: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VESTING_ESCROW_SEED, participant.as_ref()], program_id)
}

pub fn find_otc_order_address(program_id: &Pubkey, seller: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[OTC_ORDER_SEED, seller.as_ref()], program_id)
}

pub fn find_swap_tracker_address(program_id: &Pubkey, participant: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SWAP_TRACKER_SEED, participant.as_ref()], program_id)
}

pub fn find_dao_registry_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[DAO_REGISTRY_SEED], program_id)
}

// Instruction builders.

pub fn initialize_reward_pool(
    program_id: &Pubkey,
    authority: &Pubkey,
    total_rewards: u64,
    rewards_per_second: u64,
    start_time: i64,
    end_time: i64,
) -> Instruction {
    let (pool, _) = find_reward_pool_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(pool, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: SettlementInstruction::InitializeRewardPool {
            total_rewards,
            rewards_per_second,
            start_time,
            end_time,
        }
        .pack(),
    }
}

pub fn initialize_user_claim(program_id: &Pubkey, participant: &Pubkey) -> Instruction {
    let (claim, _) = find_user_claim_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*participant, true),
            AccountMeta::new(claim, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: SettlementInstruction::InitializeUserClaim.pack(),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn update_stats(
    program_id: &Pubkey,
    operator: &Pubkey,
    participant: &Pubkey,
    mined_phase1_delta: u64,
    mined_phase2_delta: u64,
    wallet_age_days: u32,
    community_score: u8,
    phase2_completed: bool,
) -> Instruction {
    let (pool, _) = find_reward_pool_address(program_id);
    let (claim, _) = find_user_claim_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*operator, true),
            AccountMeta::new_readonly(pool, false),
            AccountMeta::new(claim, false),
        ],
        data: SettlementInstruction::UpdateStats {
            participant: *participant,
            mined_phase1_delta,
            mined_phase2_delta,
            wallet_age_days,
            community_score,
            phase2_completed,
        }
        .pack(),
    }
}

pub fn apply_for_patron(
    program_id: &Pubkey,
    participant: &Pubkey,
    wallet_age_days: u32,
    community_score: u8,
) -> Instruction {
    let (claim, _) = find_user_claim_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*participant, true),
            AccountMeta::new(claim, false),
        ],
        data: SettlementInstruction::ApplyForPatron {
            wallet_age_days,
            community_score,
        }
        .pack(),
    }
}

pub fn approve_patron(
    program_id: &Pubkey,
    operator: &Pubkey,
    participant: &Pubkey,
    min_qualification_score: u8,
) -> Instruction {
    let (pool, _) = find_reward_pool_address(program_id);
    let (claim, _) = find_user_claim_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*operator, true),
            AccountMeta::new_readonly(pool, false),
            AccountMeta::new(claim, false),
        ],
        data: SettlementInstruction::ApprovePatron {
            participant: *participant,
            min_qualification_score,
        }
        .pack(),
    }
}

pub fn revoke_patron(program_id: &Pubkey, operator: &Pubkey, participant: &Pubkey) -> Instruction {
    let (pool, _) = find_reward_pool_address(program_id);
    let (claim, _) = find_user_claim_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*operator, true),
            AccountMeta::new_readonly(pool, false),
            AccountMeta::new(claim, false),
        ],
        data: SettlementInstruction::RevokePatron {
            participant: *participant,
        }
        .pack(),
    }
}

pub fn select_role(program_id: &Pubkey, participant: &Pubkey, new_role: Role) -> Instruction {
    let (claim, _) = find_user_claim_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*participant, true),
            AccountMeta::new(claim, false),
        ],
        data: SettlementInstruction::SelectRole { new_role }.pack(),
    }
}

pub fn claim_tokens_with_role(
    program_id: &Pubkey,
    participant: &Pubkey,
    amount: u64,
    role: Role,
) -> Instruction {
    let (claim, _) = find_user_claim_address(program_id, participant);
    let (pool, _) = find_reward_pool_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*participant, true),
            AccountMeta::new(claim, false),
            AccountMeta::new(pool, false),
        ],
        data: SettlementInstruction::ClaimTokensWithRole { amount, role }.pack(),
    }
}

pub fn lock_tokens(
    program_id: &Pubkey,
    participant: &Pubkey,
    amount: u64,
    duration_months: u8,
) -> Instruction {
    let (claim, _) = find_user_claim_address(program_id, participant);
    let (escrow, _) = find_vesting_escrow_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*participant, true),
            AccountMeta::new(claim, false),
            AccountMeta::new(escrow, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: SettlementInstruction::LockTokens {
            amount,
            duration_months,
        }
        .pack(),
    }
}

pub fn claim_yield(program_id: &Pubkey, participant: &Pubkey) -> Instruction {
    let (claim, _) = find_user_claim_address(program_id, participant);
    let (pool, _) = find_reward_pool_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*participant, true),
            AccountMeta::new(claim, false),
            AccountMeta::new(pool, false),
        ],
        data: SettlementInstruction::ClaimYield.pack(),
    }
}

pub fn unlock_tokens(program_id: &Pubkey, participant: &Pubkey) -> Instruction {
    let (claim, _) = find_user_claim_address(program_id, participant);
    let (escrow, _) = find_vesting_escrow_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*participant, true),
            AccountMeta::new(claim, false),
            AccountMeta::new(escrow, false),
        ],
        data: SettlementInstruction::UnlockTokens.pack(),
    }
}

pub fn admin_force_exit(
    program_id: &Pubkey,
    operator: &Pubkey,
    participant: &Pubkey,
) -> Instruction {
    let (pool, _) = find_reward_pool_address(program_id);
    let (claim, _) = find_user_claim_address(program_id, participant);
    let (escrow, _) = find_vesting_escrow_address(program_id, participant);
    let (tracker, _) = find_swap_tracker_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*operator, true),
            AccountMeta::new(pool, false),
            AccountMeta::new(claim, false),
            AccountMeta::new(escrow, false),
            AccountMeta::new(tracker, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: SettlementInstruction::AdminForceExit {
            participant: *participant,
        }
        .pack(),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn create_order(
    program_id: &Pubkey,
    seller: &Pubkey,
    amount: u64,
    price: u64,
    patrons_only: bool,
    treasury_only: bool,
    min_patron_score: u8,
    buyer_rebate: u64,
    swap_type: SwapType,
) -> Instruction {
    let (claim, _) = find_user_claim_address(program_id, seller);
    let (order, _) = find_otc_order_address(program_id, seller);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*seller, true),
            AccountMeta::new(claim, false),
            AccountMeta::new(order, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: SettlementInstruction::CreateOrder {
            amount,
            price,
            patrons_only,
            treasury_only,
            min_patron_score,
            buyer_rebate,
            swap_type,
        }
        .pack(),
    }
}

pub fn execute_order(program_id: &Pubkey, buyer: &Pubkey, seller: &Pubkey) -> Instruction {
    let (order, _) = find_otc_order_address(program_id, seller);
    let (buyer_claim, _) = find_user_claim_address(program_id, buyer);
    let (pool, _) = find_reward_pool_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*buyer, true),
            AccountMeta::new(*seller, false),
            AccountMeta::new(order, false),
            AccountMeta::new(buyer_claim, false),
            AccountMeta::new(pool, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: SettlementInstruction::ExecuteOrder.pack(),
    }
}

pub fn cancel_order(program_id: &Pubkey, seller: &Pubkey) -> Instruction {
    let (claim, _) = find_user_claim_address(program_id, seller);
    let (order, _) = find_otc_order_address(program_id, seller);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*seller, true),
            AccountMeta::new(claim, false),
            AccountMeta::new(order, false),
        ],
        data: SettlementInstruction::CancelOrder.pack(),
    }
}

pub fn record_swap(
    program_id: &Pubkey,
    operator: &Pubkey,
    participant: &Pubkey,
    amount: u64,
    is_sale: bool,
) -> Instruction {
    let (pool, _) = find_reward_pool_address(program_id);
    let (tracker, _) = find_swap_tracker_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*operator, true),
            AccountMeta::new_readonly(pool, false),
            AccountMeta::new(tracker, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: SettlementInstruction::RecordSwap {
            participant: *participant,
            amount,
            is_sale,
        }
        .pack(),
    }
}

pub fn apply_exit_penalty(
    program_id: &Pubkey,
    operator: &Pubkey,
    participant: &Pubkey,
    exit_amount: u64,
) -> Instruction {
    let (pool, _) = find_reward_pool_address(program_id);
    let (claim, _) = find_user_claim_address(program_id, participant);
    let (escrow, _) = find_vesting_escrow_address(program_id, participant);
    let (tracker, _) = find_swap_tracker_address(program_id, participant);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*operator, true),
            AccountMeta::new(pool, false),
            AccountMeta::new(claim, false),
            AccountMeta::new(escrow, false),
            AccountMeta::new(tracker, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: SettlementInstruction::ApplyExitPenalty {
            participant: *participant,
            exit_amount,
        }
        .pack(),
    }
}

pub fn initialize_registry(
    program_id: &Pubkey,
    operator: &Pubkey,
    max_seats: u32,
    min_stake: u64,
    month6_timestamp: i64,
) -> Instruction {
    let (pool, _) = find_reward_pool_address(program_id);
    let (registry, _) = find_dao_registry_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*operator, true),
            AccountMeta::new_readonly(pool, false),
            AccountMeta::new(registry, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: SettlementInstruction::InitializeRegistry {
            max_seats,
            min_stake,
            month6_timestamp,
        }
        .pack(),
    }
}

pub fn claim_seat(program_id: &Pubkey, participant: &Pubkey) -> Instruction {
    let (claim, _) = find_user_claim_address(program_id, participant);
    let (tracker, _) = find_swap_tracker_address(program_id, participant);
    let (registry, _) = find_dao_registry_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*participant, true),
            AccountMeta::new(claim, false),
            AccountMeta::new_readonly(tracker, false),
            AccountMeta::new(registry, false),
        ],
        data: SettlementInstruction::ClaimSeat.pack(),
    }
}
