use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    constants::*,
    error::SettlementError,
    instruction::{
        find_dao_registry_address, find_otc_order_address, find_reward_pool_address,
        find_swap_tracker_address, find_user_claim_address, find_vesting_escrow_address,
        SettlementInstruction,
    },
    state::{
        DaoRegistry, OtcOrder, OtcSwapTracker, RewardPool, Role, SwapType, UserClaim,
        VestingEscrow,
    },
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = SettlementInstruction::unpack(instruction_data)?;

        match instruction {
            SettlementInstruction::InitializeRewardPool {
                total_rewards,
                rewards_per_second,
                start_time,
                end_time,
            } => {
                msg!("Instruction: InitializeRewardPool");
                Self::process_initialize_reward_pool(
                    accounts,
                    program_id,
                    total_rewards,
                    rewards_per_second,
                    start_time,
                    end_time,
                )
            }
            SettlementInstruction::InitializeUserClaim => {
                msg!("Instruction: InitializeUserClaim");
                Self::process_initialize_user_claim(accounts, program_id)
            }
            SettlementInstruction::UpdateStats {
                participant,
                mined_phase1_delta,
                mined_phase2_delta,
                wallet_age_days,
                community_score,
                phase2_completed,
            } => {
                msg!("Instruction: UpdateStats");
                Self::process_update_stats(
                    accounts,
                    program_id,
                    participant,
                    mined_phase1_delta,
                    mined_phase2_delta,
                    wallet_age_days,
                    community_score,
                    phase2_completed,
                )
            }
            SettlementInstruction::ApplyForPatron {
                wallet_age_days,
                community_score,
            } => {
                msg!("Instruction: ApplyForPatron");
                Self::process_apply_for_patron(accounts, program_id, wallet_age_days, community_score)
            }
            SettlementInstruction::ApprovePatron {
                participant,
                min_qualification_score,
            } => {
                msg!("Instruction: ApprovePatron");
                Self::process_approve_patron(
                    accounts,
                    program_id,
                    participant,
                    min_qualification_score,
                )
            }
            SettlementInstruction::RevokePatron { participant } => {
                msg!("Instruction: RevokePatron");
                Self::process_revoke_patron(accounts, program_id, participant)
            }
            SettlementInstruction::SelectRole { new_role } => {
                msg!("Instruction: SelectRole");
                Self::process_select_role(accounts, program_id, new_role)
            }
            SettlementInstruction::ClaimTokensWithRole { amount, role } => {
                msg!("Instruction: ClaimTokensWithRole");
                Self::process_claim_tokens_with_role(accounts, program_id, amount, role)
            }
            SettlementInstruction::LockTokens {
                amount,
                duration_months,
            } => {
                msg!("Instruction: LockTokens");
                Self::process_lock_tokens(accounts, program_id, amount, duration_months)
            }
            SettlementInstruction::ClaimYield => {
                msg!("Instruction: ClaimYield");
                Self::process_claim_yield(accounts, program_id)
            }
            SettlementInstruction::UnlockTokens => {
                msg!("Instruction: UnlockTokens");
                Self::process_unlock_tokens(accounts, program_id)
            }
            SettlementInstruction::AdminForceExit { participant } => {
                msg!("Instruction: AdminForceExit");
                Self::process_admin_force_exit(accounts, program_id, participant)
            }
            SettlementInstruction::CreateOrder {
                amount,
                price,
                patrons_only,
                treasury_only,
                min_patron_score,
                buyer_rebate,
                swap_type,
            } => {
                msg!("Instruction: CreateOrder");
                Self::process_create_order(
                    accounts,
                    program_id,
                    amount,
                    price,
                    patrons_only,
                    treasury_only,
                    min_patron_score,
                    buyer_rebate,
                    swap_type,
                )
            }
            SettlementInstruction::ExecuteOrder => {
                msg!("Instruction: ExecuteOrder");
                Self::process_execute_order(accounts, program_id)
            }
            SettlementInstruction::CancelOrder => {
                msg!("Instruction: CancelOrder");
                Self::process_cancel_order(accounts, program_id)
            }
            SettlementInstruction::RecordSwap {
                participant,
                amount,
                is_sale,
            } => {
                msg!("Instruction: RecordSwap");
                Self::process_record_swap(accounts, program_id, participant, amount, is_sale)
            }
            SettlementInstruction::ApplyExitPenalty {
                participant,
                exit_amount,
            } => {
                msg!("Instruction: ApplyExitPenalty");
                Self::process_apply_exit_penalty(accounts, program_id, participant, exit_amount)
            }
            SettlementInstruction::InitializeRegistry {
                max_seats,
                min_stake,
                month6_timestamp,
            } => {
                msg!("Instruction: InitializeRegistry");
                Self::process_initialize_registry(
                    accounts,
                    program_id,
                    max_seats,
                    min_stake,
                    month6_timestamp,
                )
            }
            SettlementInstruction::ClaimSeat => {
                msg!("Instruction: ClaimSeat");
                Self::process_claim_seat(accounts, program_id)
            }
        }
    }

    fn process_initialize_reward_pool(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        total_rewards: u64,
        rewards_per_second: u64,
        start_time: i64,
        end_time: i64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(authority_info)?;
        let (pool_pda, bump) = find_reward_pool_address(program_id);
        assert_pda(&pool_pda, pool_info)?;
        if !pool_info.data_is_empty() {
            return Err(SettlementError::AlreadyInitialized.into());
        }

        create_pda_account(
            authority_info,
            pool_info,
            system_program_info,
            program_id,
            RewardPool::LEN,
            &[REWARD_POOL_SEED, &[bump]],
        )?;

        let pool = RewardPool::new(
            *authority_info.key,
            total_rewards,
            rewards_per_second,
            start_time,
            end_time,
            bump,
        );
        store(&pool, pool_info)?;

        msg!("Reward pool initialized with treasury of {}", total_rewards);
        Ok(())
    }

    fn process_initialize_user_claim(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(participant_info)?;
        let (claim_pda, bump) = find_user_claim_address(program_id, participant_info.key);
        assert_pda(&claim_pda, claim_info)?;
        if !claim_info.data_is_empty() {
            return Err(SettlementError::AlreadyInitialized.into());
        }

        create_pda_account(
            participant_info,
            claim_info,
            system_program_info,
            program_id,
            UserClaim::LEN,
            &[USER_CLAIM_SEED, participant_info.key.as_ref(), &[bump]],
        )?;

        store(&UserClaim::new(*participant_info.key, bump), claim_info)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_update_stats(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        participant: Pubkey,
        mined_phase1_delta: u64,
        mined_phase2_delta: u64,
        wallet_age_days: u32,
        community_score: u8,
        phase2_completed: bool,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;

        assert_signer(operator_info)?;
        let pool = load_pool(pool_info, program_id)?;
        assert_operator(&pool, operator_info)?;

        let (claim_pda, _) = find_user_claim_address(program_id, &participant);
        assert_pda(&claim_pda, claim_info)?;
        let mut claim = load_claim(claim_info)?;

        // Mined totals only ever grow; scalar fields are overwritten with the
        // pipeline's latest verified figures.
        claim.mined_phase1 = claim
            .mined_phase1
            .checked_add(mined_phase1_delta)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        claim.mined_phase2 = claim
            .mined_phase2
            .checked_add(mined_phase2_delta)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        claim.wallet_age_days = wallet_age_days;
        claim.community_score = community_score.min(100);
        if phase2_completed {
            claim.mined_in_phase2 = true;
        }

        store(&claim, claim_info)
    }

    fn process_apply_for_patron(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        wallet_age_days: u32,
        community_score: u8,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;

        assert_signer(participant_info)?;
        let (claim_pda, _) = find_user_claim_address(program_id, participant_info.key);
        assert_pda(&claim_pda, claim_info)?;
        let mut claim = load_claim(claim_info)?;

        if claim.mined_phase1 == 0 {
            return Err(SettlementError::NoMiningHistory.into());
        }

        claim.wallet_age_days = wallet_age_days;
        claim.community_score = community_score.min(100);
        claim.patron_qualification_score = UserClaim::compute_qualification_score(
            wallet_age_days,
            community_score,
            claim.mined_total(),
        );
        claim.patron_status = crate::state::PatronStatus::Applied;

        msg!(
            "Patron application scored {}",
            claim.patron_qualification_score
        );
        store(&claim, claim_info)
    }

    fn process_approve_patron(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        participant: Pubkey,
        min_qualification_score: u8,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;

        assert_signer(operator_info)?;
        let pool = load_pool(pool_info, program_id)?;
        assert_operator(&pool, operator_info)?;

        let (claim_pda, _) = find_user_claim_address(program_id, &participant);
        assert_pda(&claim_pda, claim_info)?;
        let mut claim = load_claim(claim_info)?;

        if claim.patron_qualification_score < min_qualification_score {
            return Err(SettlementError::QualificationTooLow.into());
        }
        claim.patron_status = crate::state::PatronStatus::Approved;

        store(&claim, claim_info)
    }

    fn process_revoke_patron(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        participant: Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;

        assert_signer(operator_info)?;
        let pool = load_pool(pool_info, program_id)?;
        assert_operator(&pool, operator_info)?;

        let (claim_pda, _) = find_user_claim_address(program_id, &participant);
        assert_pda(&claim_pda, claim_info)?;
        let mut claim = load_claim(claim_info)?;

        claim.patron_status = crate::state::PatronStatus::Revoked;
        store(&claim, claim_info)
    }

    fn process_select_role(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        new_role: Role,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;

        assert_signer(participant_info)?;
        let (claim_pda, _) = find_user_claim_address(program_id, participant_info.key);
        assert_pda(&claim_pda, claim_info)?;
        let mut claim = load_claim(claim_info)?;

        claim.select_role(new_role)?;
        store(&claim, claim_info)
    }

    fn process_claim_tokens_with_role(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        amount: u64,
        role: Role,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;

        assert_signer(participant_info)?;
        let (claim_pda, _) = find_user_claim_address(program_id, participant_info.key);
        assert_pda(&claim_pda, claim_info)?;
        let mut claim = load_claim(claim_info)?;
        let mut pool = load_pool(pool_info, program_id)?;

        // Role is immutable on this path once set; upgrades go through
        // SelectRole.
        if claim.role == Role::None {
            claim.select_role(role)?;
        } else if claim.role != role {
            return Err(SettlementError::InvalidRoleTransition.into());
        }

        pool.debit(amount)?;
        claim.spendable_balance = claim
            .spendable_balance
            .checked_add(amount)
            .ok_or(SettlementError::ArithmeticOverflow)?;

        store(&pool, pool_info)?;
        store(&claim, claim_info)?;

        msg!("Claimed {} tokens from treasury", amount);
        Ok(())
    }

    fn process_lock_tokens(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        amount: u64,
        duration_months: u8,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(participant_info)?;
        let (claim_pda, _) = find_user_claim_address(program_id, participant_info.key);
        assert_pda(&claim_pda, claim_info)?;
        let mut claim = load_claim(claim_info)?;

        if amount == 0 {
            return Err(ProgramError::InvalidArgument);
        }
        match duration_months {
            STAKER_LOCK_MONTHS => {
                if claim.role != Role::Staker {
                    return Err(SettlementError::InvalidLockDuration.into());
                }
            }
            PATRON_LOCK_MONTHS => {
                if claim.role != Role::Patron {
                    return Err(SettlementError::InvalidLockDuration.into());
                }
                if claim.patron_status != crate::state::PatronStatus::Approved {
                    return Err(SettlementError::PatronNotApproved.into());
                }
            }
            _ => return Err(SettlementError::InvalidLockDuration.into()),
        }
        if claim.locked_amount != 0 {
            return Err(SettlementError::LockAlreadyActive.into());
        }
        claim.spendable_balance = claim
            .spendable_balance
            .checked_sub(amount)
            .ok_or(SettlementError::InsufficientSpendableBalance)?;

        let now = Clock::get()?.unix_timestamp;
        let lock_end = now
            .checked_add(duration_months as i64 * SECONDS_PER_MONTH)
            .ok_or(SettlementError::ArithmeticOverflow)?;

        let (escrow_pda, escrow_bump) =
            find_vesting_escrow_address(program_id, participant_info.key);
        assert_pda(&escrow_pda, escrow_info)?;
        let mut escrow = if escrow_info.data_is_empty() {
            create_pda_account(
                participant_info,
                escrow_info,
                system_program_info,
                program_id,
                VestingEscrow::LEN,
                &[
                    VESTING_ESCROW_SEED,
                    participant_info.key.as_ref(),
                    &[escrow_bump],
                ],
            )?;
            VestingEscrow::new(*participant_info.key, escrow_bump)
        } else {
            let escrow: VestingEscrow = load(escrow_info)?;
            if escrow.is_active {
                return Err(SettlementError::LockAlreadyActive.into());
            }
            escrow
        };

        escrow.arm(amount, now, lock_end);

        claim.locked_amount = amount;
        claim.lock_start = now;
        claim.lock_end = lock_end;
        claim.lock_duration_months = duration_months;
        claim.last_yield_claim = now;

        store(&escrow, escrow_info)?;
        store(&claim, claim_info)?;

        msg!("Locked {} tokens for {} months", amount, duration_months);
        Ok(())
    }

    fn process_claim_yield(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;

        assert_signer(participant_info)?;
        let (claim_pda, _) = find_user_claim_address(program_id, participant_info.key);
        assert_pda(&claim_pda, claim_info)?;
        let mut claim = load_claim(claim_info)?;
        let mut pool = load_pool(pool_info, program_id)?;

        if claim.locked_amount == 0 {
            return Err(SettlementError::NothingLocked.into());
        }

        let now = Clock::get()?.unix_timestamp;
        let amount = claim.pending_yield(now)?;

        pool.debit(amount)?;
        claim.spendable_balance = claim
            .spendable_balance
            .checked_add(amount)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        claim.total_yield_claimed = claim
            .total_yield_claimed
            .checked_add(amount)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        claim.last_yield_claim = now;

        store(&pool, pool_info)?;
        store(&claim, claim_info)?;

        msg!("Yield of {} paid from treasury", amount);
        Ok(())
    }

    fn process_unlock_tokens(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;

        assert_signer(participant_info)?;
        let (claim_pda, _) = find_user_claim_address(program_id, participant_info.key);
        assert_pda(&claim_pda, claim_info)?;
        let (escrow_pda, _) = find_vesting_escrow_address(program_id, participant_info.key);
        assert_pda(&escrow_pda, escrow_info)?;

        let mut claim = load_claim(claim_info)?;
        let mut escrow: VestingEscrow = load(escrow_info)?;
        if !escrow.is_active {
            return Err(SettlementError::NothingLocked.into());
        }

        let now = Clock::get()?.unix_timestamp;
        if now < escrow.unlock_at {
            return Err(SettlementError::VestingNotUnlocked.into());
        }

        let held = escrow.close();
        claim.spendable_balance = claim
            .spendable_balance
            .checked_add(held)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        claim.locked_amount = 0;
        claim.lock_duration_months = 0;

        store(&escrow, escrow_info)?;
        store(&claim, claim_info)?;

        msg!("Unlocked {} tokens", held);
        Ok(())
    }

    fn process_admin_force_exit(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        participant: Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let tracker_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(operator_info)?;
        let mut pool = load_pool(pool_info, program_id)?;
        assert_operator(&pool, operator_info)?;

        let (claim_pda, _) = find_user_claim_address(program_id, &participant);
        assert_pda(&claim_pda, claim_info)?;
        let (escrow_pda, _) = find_vesting_escrow_address(program_id, &participant);
        assert_pda(&escrow_pda, escrow_info)?;

        let mut claim = load_claim(claim_info)?;
        let mut escrow: VestingEscrow = load(escrow_info)?;
        if !escrow.is_active {
            return Err(SettlementError::NothingLocked.into());
        }

        let mut tracker = load_or_create_tracker(
            tracker_info,
            operator_info,
            system_program_info,
            program_id,
            &participant,
        )?;

        let exit_amount = escrow.amount;
        let burned = settle_early_exit(&mut pool, &mut claim, &mut escrow, &mut tracker, exit_amount)?;

        let remainder = escrow.close();
        claim.spendable_balance = claim
            .spendable_balance
            .checked_add(remainder)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        claim.locked_amount = 0;
        claim.lock_duration_months = 0;

        store(&pool, pool_info)?;
        store(&claim, claim_info)?;
        store(&escrow, escrow_info)?;
        store(&tracker, tracker_info)?;

        msg!("Force exit: burned {}, released {}", burned, remainder);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn process_create_order(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        amount: u64,
        price: u64,
        patrons_only: bool,
        treasury_only: bool,
        min_patron_score: u8,
        buyer_rebate: u64,
        swap_type: SwapType,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let seller_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let order_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(seller_info)?;
        let (claim_pda, _) = find_user_claim_address(program_id, seller_info.key);
        assert_pda(&claim_pda, claim_info)?;
        let mut claim = load_claim(claim_info)?;

        if amount == 0 {
            return Err(ProgramError::InvalidArgument);
        }
        if !swap_type.allowed_for(claim.role) {
            return Err(SettlementError::InvalidSwapType.into());
        }

        let (order_pda, order_bump) = find_otc_order_address(program_id, seller_info.key);
        assert_pda(&order_pda, order_info)?;
        let mut order = if order_info.data_is_empty() {
            create_pda_account(
                seller_info,
                order_info,
                system_program_info,
                program_id,
                OtcOrder::LEN,
                &[OTC_ORDER_SEED, seller_info.key.as_ref(), &[order_bump]],
            )?;
            OtcOrder {
                is_initialized: true,
                seller: *seller_info.key,
                amount: 0,
                price: 0,
                is_active: false,
                created_at: 0,
                patrons_only: false,
                treasury_only: false,
                min_patron_score: 0,
                buyer_rebate: 0,
                swap_type,
                bump: order_bump,
            }
        } else {
            let order: OtcOrder = load(order_info)?;
            if order.is_active {
                return Err(SettlementError::OrderAlreadyActive.into());
            }
            order
        };

        // Reserve the offered amount on the order so a fill can never
        // overdraw the seller.
        claim.spendable_balance = claim
            .spendable_balance
            .checked_sub(amount)
            .ok_or(SettlementError::InsufficientSpendableBalance)?;

        order.amount = amount;
        order.price = price;
        order.is_active = true;
        order.created_at = Clock::get()?.unix_timestamp;
        order.patrons_only = patrons_only;
        order.treasury_only = treasury_only;
        order.min_patron_score = min_patron_score;
        order.buyer_rebate = buyer_rebate;
        order.swap_type = swap_type;

        store(&order, order_info)?;
        store(&claim, claim_info)?;

        msg!("Order posted: {} tokens at {} lamports each", amount, price);
        Ok(())
    }

    fn process_execute_order(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let buyer_info = next_account_info(account_info_iter)?;
        let seller_wallet_info = next_account_info(account_info_iter)?;
        let order_info = next_account_info(account_info_iter)?;
        let buyer_claim_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(buyer_info)?;
        let (order_pda, _) = find_otc_order_address(program_id, seller_wallet_info.key);
        assert_pda(&order_pda, order_info)?;
        let (buyer_claim_pda, _) = find_user_claim_address(program_id, buyer_info.key);
        assert_pda(&buyer_claim_pda, buyer_claim_info)?;

        let mut order: OtcOrder = load(order_info)?;
        if !order.is_active {
            return Err(SettlementError::OrderInactive.into());
        }
        let mut buyer_claim = load_claim(buyer_claim_info)?;
        let mut pool = load_pool(pool_info, program_id)?;

        // Every precondition is checked before any balance moves; a failure
        // here leaves seller, buyer, and order untouched.
        order.check_buyer(buyer_info.key, &buyer_claim, &pool.authority)?;
        let payment = order.payment_lamports()?;

        if order.buyer_rebate > 0 {
            pool.debit(order.buyer_rebate)?;
            buyer_claim.spendable_balance = buyer_claim
                .spendable_balance
                .checked_add(order.buyer_rebate)
                .ok_or(SettlementError::ArithmeticOverflow)?;
        }

        invoke(
            &system_instruction::transfer(buyer_info.key, seller_wallet_info.key, payment),
            &[
                buyer_info.clone(),
                seller_wallet_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        buyer_claim.spendable_balance = buyer_claim
            .spendable_balance
            .checked_add(order.amount)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        order.is_active = false;

        store(&order, order_info)?;
        store(&buyer_claim, buyer_claim_info)?;
        store(&pool, pool_info)?;

        msg!(
            "Order filled: {} tokens for {} lamports",
            order.amount,
            payment
        );
        Ok(())
    }

    fn process_cancel_order(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let seller_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let order_info = next_account_info(account_info_iter)?;

        assert_signer(seller_info)?;
        let (claim_pda, _) = find_user_claim_address(program_id, seller_info.key);
        assert_pda(&claim_pda, claim_info)?;
        let (order_pda, _) = find_otc_order_address(program_id, seller_info.key);
        assert_pda(&order_pda, order_info)?;

        let mut order: OtcOrder = load(order_info)?;
        if !order.is_active {
            return Err(SettlementError::OrderInactive.into());
        }
        let mut claim = load_claim(claim_info)?;

        claim.spendable_balance = claim
            .spendable_balance
            .checked_add(order.amount)
            .ok_or(SettlementError::ArithmeticOverflow)?;
        order.is_active = false;

        store(&order, order_info)?;
        store(&claim, claim_info)
    }

    fn process_record_swap(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        participant: Pubkey,
        amount: u64,
        is_sale: bool,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;
        let tracker_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(operator_info)?;
        let pool = load_pool(pool_info, program_id)?;
        assert_operator(&pool, operator_info)?;

        let mut tracker = load_or_create_tracker(
            tracker_info,
            operator_info,
            system_program_info,
            program_id,
            &participant,
        )?;
        tracker.record_swap(amount)?;
        store(&tracker, tracker_info)?;

        msg!("Swap of {} recorded (sale: {})", amount, is_sale);
        Ok(())
    }

    fn process_apply_exit_penalty(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        participant: Pubkey,
        exit_amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let tracker_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(operator_info)?;
        let mut pool = load_pool(pool_info, program_id)?;
        assert_operator(&pool, operator_info)?;

        let (claim_pda, _) = find_user_claim_address(program_id, &participant);
        assert_pda(&claim_pda, claim_info)?;
        let (escrow_pda, _) = find_vesting_escrow_address(program_id, &participant);
        assert_pda(&escrow_pda, escrow_info)?;

        let mut claim = load_claim(claim_info)?;
        let mut escrow: VestingEscrow = load(escrow_info)?;
        if !escrow.is_active {
            return Err(SettlementError::NothingLocked.into());
        }

        let mut tracker = load_or_create_tracker(
            tracker_info,
            operator_info,
            system_program_info,
            program_id,
            &participant,
        )?;

        let burned = settle_early_exit(&mut pool, &mut claim, &mut escrow, &mut tracker, exit_amount)?;

        store(&pool, pool_info)?;
        store(&claim, claim_info)?;
        store(&escrow, escrow_info)?;
        store(&tracker, tracker_info)?;

        msg!("Exit penalty applied, burned {}", burned);
        Ok(())
    }

    fn process_initialize_registry(
        accounts: &[AccountInfo],
        program_id: &Pubkey,
        max_seats: u32,
        min_stake: u64,
        month6_timestamp: i64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let operator_info = next_account_info(account_info_iter)?;
        let pool_info = next_account_info(account_info_iter)?;
        let registry_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(operator_info)?;
        let pool = load_pool(pool_info, program_id)?;
        assert_operator(&pool, operator_info)?;

        let (registry_pda, bump) = find_dao_registry_address(program_id);
        assert_pda(&registry_pda, registry_info)?;
        if !registry_info.data_is_empty() {
            return Err(SettlementError::AlreadyInitialized.into());
        }

        create_pda_account(
            operator_info,
            registry_info,
            system_program_info,
            program_id,
            DaoRegistry::LEN,
            &[DAO_REGISTRY_SEED, &[bump]],
        )?;

        store(
            &DaoRegistry::new(
                *operator_info.key,
                max_seats,
                min_stake,
                month6_timestamp,
                bump,
            ),
            registry_info,
        )
    }

    fn process_claim_seat(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let claim_info = next_account_info(account_info_iter)?;
        let tracker_info = next_account_info(account_info_iter)?;
        let registry_info = next_account_info(account_info_iter)?;

        assert_signer(participant_info)?;
        let (claim_pda, _) = find_user_claim_address(program_id, participant_info.key);
        assert_pda(&claim_pda, claim_info)?;
        let (tracker_pda, _) = find_swap_tracker_address(program_id, participant_info.key);
        assert_pda(&tracker_pda, tracker_info)?;
        let (registry_pda, _) = find_dao_registry_address(program_id);
        assert_pda(&registry_pda, registry_info)?;

        let mut claim = load_claim(claim_info)?;
        let mut registry: DaoRegistry = load(registry_info)?;
        if !registry.is_initialized {
            return Err(SettlementError::NotInitialized.into());
        }
        if claim.dao_seat_holder {
            return Err(SettlementError::SeatAlreadyHeld.into());
        }

        // An uncreated tracker means no swap/exit history at all.
        let has_early_exit = if tracker_info.data_is_empty() {
            claim.sold_early
        } else {
            let tracker: OtcSwapTracker = load(tracker_info)?;
            tracker.has_early_exit || claim.sold_early
        };

        registry.assign_seat()?;

        let now = Clock::get()?.unix_timestamp;
        if !claim.dao_eligibility(registry.min_stake, registry.month6_timestamp, has_early_exit, now)
        {
            return Err(SettlementError::NotEligible.into());
        }

        claim.dao_eligible = true;
        claim.dao_seat_holder = true;

        store(&registry, registry_info)?;
        store(&claim, claim_info)?;

        msg!(
            "DAO seat {} of {} assigned",
            registry.occupied_seats,
            registry.max_seats
        );
        Ok(())
    }
}

/// Burn the early-exit penalty (at most once per lock) and record the
/// permanent disqualification. Returns the burned amount, zero when the burn
/// was already taken for this lock.
fn settle_early_exit(
    pool: &mut RewardPool,
    claim: &mut UserClaim,
    escrow: &mut VestingEscrow,
    tracker: &mut OtcSwapTracker,
    exit_amount: u64,
) -> Result<u64, ProgramError> {
    let mut burned = 0u64;
    if !escrow.penalty_applied {
        burned = u64::try_from(
            (exit_amount as u128 * EARLY_EXIT_PENALTY_BPS as u128) / BPS_DENOMINATOR as u128,
        )
        .map_err(|_| SettlementError::ArithmeticOverflow)?;
        escrow.amount = escrow
            .amount
            .checked_sub(burned)
            .ok_or(SettlementError::InsufficientSpendableBalance)?;
        // Keep the participant record in step with custody: the escrow must
        // hold exactly locked_amount, and yield accrues on what remains.
        claim.locked_amount = claim
            .locked_amount
            .checked_sub(burned)
            .ok_or(SettlementError::InsufficientSpendableBalance)?;
        escrow.penalty_applied = true;
        pool.record_burn(burned)?;
    }

    tracker.record_early_exit(burned)?;
    claim.sold_early = true;
    claim.dao_eligible = false;
    Ok(burned)
}

fn assert_signer(info: &AccountInfo) -> ProgramResult {
    if !info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    Ok(())
}

fn assert_pda(expected: &Pubkey, info: &AccountInfo) -> ProgramResult {
    if expected != info.key {
        return Err(SettlementError::InvalidPda.into());
    }
    Ok(())
}

fn assert_operator(pool: &RewardPool, operator: &AccountInfo) -> ProgramResult {
    if pool.authority != *operator.key {
        return Err(SettlementError::Unauthorized.into());
    }
    Ok(())
}

fn load<T: BorshDeserialize>(info: &AccountInfo) -> Result<T, ProgramError> {
    if info.data_is_empty() {
        return Err(SettlementError::NotInitialized.into());
    }
    T::try_from_slice(&info.data.borrow())
        .map_err(|_| SettlementError::InvalidAccountData.into())
}

fn load_claim(info: &AccountInfo) -> Result<UserClaim, ProgramError> {
    let claim: UserClaim = load(info)?;
    if !claim.is_initialized {
        return Err(SettlementError::NotInitialized.into());
    }
    Ok(claim)
}

fn load_pool(info: &AccountInfo, _program_id: &Pubkey) -> Result<RewardPool, ProgramError> {
    let pool: RewardPool = load(info)?;
    if !pool.is_initialized {
        return Err(SettlementError::NotInitialized.into());
    }
    Ok(pool)
}

fn load_or_create_tracker<'a>(
    tracker_info: &AccountInfo<'a>,
    payer_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    program_id: &Pubkey,
    participant: &Pubkey,
) -> Result<OtcSwapTracker, ProgramError> {
    let (tracker_pda, bump) = find_swap_tracker_address(program_id, participant);
    assert_pda(&tracker_pda, tracker_info)?;

    if tracker_info.data_is_empty() {
        create_pda_account(
            payer_info,
            tracker_info,
            system_program_info,
            program_id,
            OtcSwapTracker::LEN,
            &[SWAP_TRACKER_SEED, participant.as_ref(), &[bump]],
        )?;
        Ok(OtcSwapTracker::new(*participant, bump))
    } else {
        load(tracker_info)
    }
}

fn create_pda_account<'a>(
    payer: &AccountInfo<'a>,
    new_account: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    program_id: &Pubkey,
    space: usize,
    seeds: &[&[u8]],
) -> ProgramResult {
    let rent = Rent::get()?;
    let lamports = rent.minimum_balance(space);

    invoke_signed(
        &system_instruction::create_account(
            payer.key,
            new_account.key,
            lamports,
            space as u64,
            program_id,
        ),
        &[payer.clone(), new_account.clone(), system_program.clone()],
        &[seeds],
    )
}

fn store<T: BorshSerialize>(value: &T, info: &AccountInfo) -> ProgramResult {
    value
        .serialize(&mut &mut info.data.borrow_mut()[..])
        .map_err(|_| ProgramError::AccountDataTooSmall)
}
