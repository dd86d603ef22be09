use borsh::BorshDeserialize;
use solana_program::{clock::Clock, instruction::InstructionError, pubkey::Pubkey, system_program};
use solana_program_test::{processor, BanksClientError, ProgramTest, ProgramTestContext};
use solana_sdk::{
    account::Account,
    instruction::Instruction,
    signature::{Keypair, Signer},
    transaction::{Transaction, TransactionError},
};

use claim_settlement::{
    constants::{SECONDS_PER_MONTH, SECONDS_PER_YEAR},
    error::SettlementError,
    instruction as ix,
    state::{OtcOrder, OtcSwapTracker, RewardPool, Role, SwapType, UserClaim, VestingEscrow},
};

const TREASURY: u64 = 1_000_000;
const FUNDING: u64 = 10_000_000_000;

struct Env {
    context: ProgramTestContext,
    program_id: Pubkey,
    operator: Keypair,
    users: Vec<Keypair>,
}

/// Spin up the program with a funded operator, `n` funded participants, and
/// an initialized reward pool.
async fn setup(n_users: usize) -> Env {
    let program_id = claim_settlement::id();
    let mut program_test = ProgramTest::new(
        "claim_settlement",
        program_id,
        processor!(claim_settlement::process),
    );

    let operator = Keypair::new();
    let users: Vec<Keypair> = (0..n_users).map(|_| Keypair::new()).collect();
    for key in std::iter::once(&operator).chain(users.iter()) {
        program_test.add_account(
            key.pubkey(),
            Account {
                lamports: FUNDING,
                data: vec![],
                owner: system_program::id(),
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    let context = program_test.start_with_context().await;
    let mut env = Env {
        context,
        program_id,
        operator,
        users,
    };

    let operator = env.operator.insecure_clone();
    let init = ix::initialize_reward_pool(
        &program_id,
        &operator.pubkey(),
        TREASURY,
        0,
        0,
        i64::MAX,
    );
    send(&mut env, &[init], &[&operator]).await.unwrap();
    env
}

async fn send(
    env: &mut Env,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let blockhash = env.context.get_new_latest_blockhash().await.unwrap();
    let mut all_signers: Vec<&Keypair> = vec![&env.context.payer];
    all_signers.extend_from_slice(signers);
    let tx = Transaction::new_signed_with_payer(
        instructions,
        Some(&env.context.payer.pubkey()),
        &all_signers,
        blockhash,
    );
    env.context.banks_client.process_transaction(tx).await
}

async fn read_account<T: BorshDeserialize>(env: &mut Env, address: &Pubkey) -> T {
    let account = env
        .context
        .banks_client
        .get_account(*address)
        .await
        .unwrap()
        .expect("account should exist");
    T::try_from_slice(&account.data).unwrap()
}

async fn read_claim(env: &mut Env, participant: &Pubkey) -> UserClaim {
    let (address, _) = ix::find_user_claim_address(&env.program_id, participant);
    read_account(env, &address).await
}

async fn read_pool(env: &mut Env) -> RewardPool {
    let (address, _) = ix::find_reward_pool_address(&env.program_id);
    read_account(env, &address).await
}

async fn lamports_of(env: &mut Env, address: &Pubkey) -> u64 {
    env.context
        .banks_client
        .get_account(*address)
        .await
        .unwrap()
        .unwrap()
        .lamports
}

async fn warp_seconds(env: &mut Env, seconds: i64) {
    let mut clock: Clock = env.context.banks_client.get_sysvar().await.unwrap();
    clock.unix_timestamp += seconds;
    env.context.set_sysvar(&clock);
}

fn assert_settlement_error(err: BanksClientError, expected: SettlementError) {
    match err {
        BanksClientError::TransactionError(TransactionError::InstructionError(
            _,
            InstructionError::Custom(code),
        )) => assert_eq!(code, expected as u32, "expected {:?}", expected),
        other => panic!("expected {:?}, got {:?}", expected, other),
    }
}

/// Initialize a claim, post mining stats, and take `claim_amount` out of the
/// treasury under `role` (patron approval included when needed).
async fn onboard(env: &mut Env, user_index: usize, role: Role, claim_amount: u64) {
    let program_id = env.program_id;
    let user = env.users[user_index].insecure_clone();
    let operator = env.operator.insecure_clone();
    let pubkey = user.pubkey();

    let init = ix::initialize_user_claim(&program_id, &pubkey);
    send(env, &[init], &[&user]).await.unwrap();

    let stats = ix::update_stats(
        &program_id,
        &operator.pubkey(),
        &pubkey,
        50_000,
        0,
        400,
        80,
        false,
    );
    send(env, &[stats], &[&operator]).await.unwrap();

    if role == Role::Patron {
        let apply = ix::apply_for_patron(&program_id, &pubkey, 400, 80);
        let approve = ix::approve_patron(&program_id, &operator.pubkey(), &pubkey, 40);
        send(env, &[apply, approve], &[&user, &operator])
            .await
            .unwrap();
    }

    let claim = ix::claim_tokens_with_role(&program_id, &pubkey, claim_amount, role);
    send(env, &[claim], &[&user]).await.unwrap();
}

#[tokio::test]
async fn test_claim_lock_unlock_lifecycle() {
    let mut env = setup(1).await;
    let program_id = env.program_id;
    let user = env.users[0].insecure_clone();
    let pubkey = user.pubkey();

    onboard(&mut env, 0, Role::Staker, 5_000).await;

    let claim = read_claim(&mut env, &pubkey).await;
    assert_eq!(claim.role, Role::Staker);
    assert_eq!(claim.spendable_balance, 5_000);
    assert_eq!(claim.lock_duration_months, 0);
    let pool = read_pool(&mut env).await;
    assert_eq!(pool.treasury_balance, TREASURY - 5_000);

    let lock = ix::lock_tokens(&program_id, &pubkey, 5_000, 3);
    send(&mut env, &[lock], &[&user]).await.unwrap();

    let claim = read_claim(&mut env, &pubkey).await;
    assert_eq!(claim.spendable_balance, 0);
    assert_eq!(claim.locked_amount, 5_000);
    assert_eq!(claim.lock_duration_months, 3);
    assert_eq!(claim.lock_end, claim.lock_start + 3 * SECONDS_PER_MONTH);

    // Too early
    let unlock = ix::unlock_tokens(&program_id, &pubkey);
    let err = send(&mut env, &[unlock], &[&user]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::VestingNotUnlocked);

    // Stacking a second lock is rejected
    let second_lock = ix::lock_tokens(&program_id, &pubkey, 1, 3);
    let err = send(&mut env, &[second_lock], &[&user]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::LockAlreadyActive);

    warp_seconds(&mut env, 3 * SECONDS_PER_MONTH + 1).await;

    let unlock = ix::unlock_tokens(&program_id, &pubkey);
    send(&mut env, &[unlock], &[&user]).await.unwrap();

    let claim = read_claim(&mut env, &pubkey).await;
    assert_eq!(claim.spendable_balance, 5_000);
    assert_eq!(claim.locked_amount, 0);
    assert_eq!(claim.lock_duration_months, 0);
}

#[tokio::test]
async fn test_select_role_requires_mining_history() {
    let mut env = setup(1).await;
    let program_id = env.program_id;
    let user = env.users[0].insecure_clone();
    let pubkey = user.pubkey();

    let init = ix::initialize_user_claim(&program_id, &pubkey);
    send(&mut env, &[init], &[&user]).await.unwrap();

    let select = ix::select_role(&program_id, &pubkey, Role::Staker);
    let err = send(&mut env, &[select], &[&user]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::NoMiningHistory);
}

#[tokio::test]
async fn test_patron_cannot_step_down() {
    let mut env = setup(1).await;
    let program_id = env.program_id;
    let user = env.users[0].insecure_clone();
    let pubkey = user.pubkey();

    onboard(&mut env, 0, Role::Patron, 1_000).await;
    let claim = read_claim(&mut env, &pubkey).await;
    assert_eq!(claim.role, Role::Patron);

    let select = ix::select_role(&program_id, &pubkey, Role::Staker);
    let err = send(&mut env, &[select], &[&user]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::InvalidRoleTransition);

    // Role is also immutable on the combined claim path
    let claim_as_staker = ix::claim_tokens_with_role(&program_id, &pubkey, 100, Role::Staker);
    let err = send(&mut env, &[claim_as_staker], &[&user])
        .await
        .unwrap_err();
    assert_settlement_error(err, SettlementError::InvalidRoleTransition);
}

#[tokio::test]
async fn test_yield_accrues_with_time() {
    let mut env = setup(1).await;
    let program_id = env.program_id;
    let user = env.users[0].insecure_clone();
    let pubkey = user.pubkey();

    onboard(&mut env, 0, Role::Staker, 10_000).await;
    let lock = ix::lock_tokens(&program_id, &pubkey, 10_000, 3);
    send(&mut env, &[lock], &[&user]).await.unwrap();

    let pool_before = read_pool(&mut env).await;

    warp_seconds(&mut env, SECONDS_PER_YEAR).await;

    let claim_yield = ix::claim_yield(&program_id, &pubkey);
    send(&mut env, &[claim_yield], &[&user]).await.unwrap();

    // 5% APR on 10_000 for one year
    let claim = read_claim(&mut env, &pubkey).await;
    assert_eq!(claim.spendable_balance, 500);
    assert_eq!(claim.total_yield_claimed, 500);
    let pool = read_pool(&mut env).await;
    assert_eq!(pool.treasury_balance, pool_before.treasury_balance - 500);

    // Yield without a lock is rejected
    let unlock = ix::unlock_tokens(&program_id, &pubkey);
    send(&mut env, &[unlock], &[&user]).await.unwrap();
    let claim_yield = ix::claim_yield(&program_id, &pubkey);
    let err = send(&mut env, &[claim_yield], &[&user]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::NothingLocked);
}

#[tokio::test]
async fn test_otc_order_restrictions_and_fill() {
    let mut env = setup(3).await;
    let program_id = env.program_id;
    let seller = env.users[0].insecure_clone();
    let staker_buyer = env.users[1].insecure_clone();
    let patron_buyer = env.users[2].insecure_clone();

    onboard(&mut env, 0, Role::Staker, 1_000).await;
    onboard(&mut env, 1, Role::Staker, 0).await;
    onboard(&mut env, 2, Role::Patron, 0).await;

    // Seller role must match the declared swap type
    let mismatched = ix::create_order(
        &program_id,
        &seller.pubkey(),
        500,
        2,
        false,
        false,
        0,
        0,
        SwapType::ExitSale,
    );
    let err = send(&mut env, &[mismatched], &[&seller]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::InvalidSwapType);

    let create = ix::create_order(
        &program_id,
        &seller.pubkey(),
        500,
        2,
        true,
        false,
        0,
        0,
        SwapType::StakerSale,
    );
    send(&mut env, &[create], &[&seller]).await.unwrap();

    let claim = read_claim(&mut env, &seller.pubkey()).await;
    assert_eq!(claim.spendable_balance, 500, "offered amount is reserved");

    // A second order while one is active is rejected
    let second = ix::create_order(
        &program_id,
        &seller.pubkey(),
        100,
        1,
        false,
        false,
        0,
        0,
        SwapType::StakerSale,
    );
    let err = send(&mut env, &[second], &[&seller]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::OrderAlreadyActive);

    // Staker buyer fails patrons_only; nothing moves
    let fill = ix::execute_order(&program_id, &staker_buyer.pubkey(), &seller.pubkey());
    let err = send(&mut env, &[fill], &[&staker_buyer]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::BuyerNotEligible);

    let (order_address, _) = ix::find_otc_order_address(&program_id, &seller.pubkey());
    let order: OtcOrder = read_account(&mut env, &order_address).await;
    assert!(order.is_active);
    let buyer_claim = read_claim(&mut env, &staker_buyer.pubkey()).await;
    assert_eq!(buyer_claim.spendable_balance, 0);

    // Patron buyer fills the order whole
    let seller_lamports_before = lamports_of(&mut env, &seller.pubkey()).await;

    let fill = ix::execute_order(&program_id, &patron_buyer.pubkey(), &seller.pubkey());
    send(&mut env, &[fill], &[&patron_buyer]).await.unwrap();

    let order: OtcOrder = read_account(&mut env, &order_address).await;
    assert!(!order.is_active);
    let buyer_claim = read_claim(&mut env, &patron_buyer.pubkey()).await;
    assert_eq!(buyer_claim.spendable_balance, 500);
    let seller_lamports = lamports_of(&mut env, &seller.pubkey()).await;
    assert_eq!(seller_lamports, seller_lamports_before + 1_000);

    // Filling again fails
    let fill = ix::execute_order(&program_id, &patron_buyer.pubkey(), &seller.pubkey());
    let err = send(&mut env, &[fill], &[&patron_buyer]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::OrderInactive);
}

#[tokio::test]
async fn test_cancel_order_returns_reserved_amount() {
    let mut env = setup(1).await;
    let program_id = env.program_id;
    let seller = env.users[0].insecure_clone();

    onboard(&mut env, 0, Role::Staker, 1_000).await;
    let create = ix::create_order(
        &program_id,
        &seller.pubkey(),
        400,
        5,
        false,
        false,
        0,
        0,
        SwapType::StakerSale,
    );
    send(&mut env, &[create], &[&seller]).await.unwrap();

    let cancel = ix::cancel_order(&program_id, &seller.pubkey());
    send(&mut env, &[cancel], &[&seller]).await.unwrap();

    let claim = read_claim(&mut env, &seller.pubkey()).await;
    assert_eq!(claim.spendable_balance, 1_000);

    // The slot can be reused for a fresh order once the old one is inactive
    let fresh = ix::create_order(
        &program_id,
        &seller.pubkey(),
        100,
        5,
        false,
        false,
        0,
        0,
        SwapType::StakerSale,
    );
    send(&mut env, &[fresh], &[&seller]).await.unwrap();
}

#[tokio::test]
async fn test_force_exit_burns_and_disqualifies() {
    let mut env = setup(1).await;
    let program_id = env.program_id;
    let user = env.users[0].insecure_clone();
    let operator = env.operator.insecure_clone();
    let pubkey = user.pubkey();

    onboard(&mut env, 0, Role::Staker, 10_000).await;
    let lock = ix::lock_tokens(&program_id, &pubkey, 10_000, 3);
    send(&mut env, &[lock], &[&user]).await.unwrap();

    // Only the operator may force exit
    let rogue = ix::admin_force_exit(&program_id, &pubkey, &pubkey);
    let err = send(&mut env, &[rogue], &[&user]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::Unauthorized);

    let force = ix::admin_force_exit(&program_id, &operator.pubkey(), &pubkey);
    send(&mut env, &[force], &[&operator]).await.unwrap();

    // 20% burned, 80% released
    let claim = read_claim(&mut env, &pubkey).await;
    assert_eq!(claim.spendable_balance, 8_000);
    assert_eq!(claim.locked_amount, 0);
    assert!(claim.sold_early);
    assert!(!claim.dao_eligible);

    let (tracker_address, _) = ix::find_swap_tracker_address(&program_id, &pubkey);
    let tracker: OtcSwapTracker = read_account(&mut env, &tracker_address).await;
    assert!(tracker.has_early_exit);
    assert!(!tracker.is_dao_eligible);
    assert_eq!(tracker.total_burned, 2_000);

    let pool = read_pool(&mut env).await;
    assert_eq!(pool.total_burned, 2_000);

    // With no active lock left there is nothing to penalize again
    let penalty = ix::apply_exit_penalty(&program_id, &operator.pubkey(), &pubkey, 1_000);
    let err = send(&mut env, &[penalty], &[&operator]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::NothingLocked);
}

#[tokio::test]
async fn test_exit_penalty_burns_once_and_keeps_custody_in_sync() {
    let mut env = setup(1).await;
    let program_id = env.program_id;
    let user = env.users[0].insecure_clone();
    let operator = env.operator.insecure_clone();
    let pubkey = user.pubkey();

    onboard(&mut env, 0, Role::Staker, 10_000).await;
    let lock = ix::lock_tokens(&program_id, &pubkey, 10_000, 3);
    send(&mut env, &[lock], &[&user]).await.unwrap();

    let penalty = ix::apply_exit_penalty(&program_id, &operator.pubkey(), &pubkey, 10_000);
    send(&mut env, &[penalty], &[&operator]).await.unwrap();

    // The lock stays live but both custody views drop by the burned 20%
    let claim = read_claim(&mut env, &pubkey).await;
    assert_eq!(claim.locked_amount, 8_000);
    assert!(claim.sold_early);
    assert!(!claim.dao_eligible);
    let (escrow_address, _) = ix::find_vesting_escrow_address(&program_id, &pubkey);
    let escrow: VestingEscrow = read_account(&mut env, &escrow_address).await;
    assert!(escrow.is_active);
    assert_eq!(escrow.amount, claim.locked_amount);
    assert!(escrow.penalty_applied);

    // A second pass must not burn again
    let repeat = ix::apply_exit_penalty(&program_id, &operator.pubkey(), &pubkey, 8_000);
    send(&mut env, &[repeat], &[&operator]).await.unwrap();

    let claim = read_claim(&mut env, &pubkey).await;
    assert_eq!(claim.locked_amount, 8_000);
    let (tracker_address, _) = ix::find_swap_tracker_address(&program_id, &pubkey);
    let tracker: OtcSwapTracker = read_account(&mut env, &tracker_address).await;
    assert_eq!(tracker.total_burned, 2_000);
    assert!(tracker.has_early_exit);
    assert!(!tracker.is_dao_eligible);
    let pool = read_pool(&mut env).await;
    assert_eq!(pool.total_burned, 2_000);

    // Yield accrues on the post-burn remainder only
    warp_seconds(&mut env, SECONDS_PER_YEAR).await;
    let claim_yield = ix::claim_yield(&program_id, &pubkey);
    send(&mut env, &[claim_yield], &[&user]).await.unwrap();
    let claim = read_claim(&mut env, &pubkey).await;
    assert_eq!(claim.total_yield_claimed, 400);

    // Unlock returns the remainder; every token is accounted for
    let unlock = ix::unlock_tokens(&program_id, &pubkey);
    send(&mut env, &[unlock], &[&user]).await.unwrap();
    let claim = read_claim(&mut env, &pubkey).await;
    assert_eq!(claim.spendable_balance, 8_400);
    assert_eq!(claim.locked_amount, 0);
    let pool = read_pool(&mut env).await;
    assert_eq!(
        pool.treasury_balance + claim.spendable_balance + pool.total_burned,
        TREASURY
    );
}

#[tokio::test]
async fn test_dao_seats_are_gated_and_bounded() {
    let mut env = setup(3).await;
    let program_id = env.program_id;
    let operator = env.operator.insecure_clone();
    let patron_a = env.users[0].insecure_clone();
    let patron_b = env.users[1].insecure_clone();
    let exited = env.users[2].insecure_clone();

    for i in 0..3 {
        onboard(&mut env, i, Role::Patron, 10_000).await;
        let user = env.users[i].insecure_clone();
        let lock = ix::lock_tokens(&program_id, &user.pubkey(), 10_000, 6);
        send(&mut env, &[lock], &[&user]).await.unwrap();
    }

    // The third patron is forced out early and permanently disqualified
    let force = ix::admin_force_exit(&program_id, &operator.pubkey(), &exited.pubkey());
    send(&mut env, &[force], &[&operator]).await.unwrap();

    let clock: Clock = env.context.banks_client.get_sysvar().await.unwrap();
    let init = ix::initialize_registry(
        &program_id,
        &operator.pubkey(),
        1,
        5_000,
        clock.unix_timestamp + 6 * SECONDS_PER_MONTH,
    );
    send(&mut env, &[init], &[&operator]).await.unwrap();

    // Too early: neither the global month-6 mark nor six months of lock
    let early = ix::claim_seat(&program_id, &patron_a.pubkey());
    let err = send(&mut env, &[early], &[&patron_a]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::NotEligible);

    warp_seconds(&mut env, 6 * SECONDS_PER_MONTH + 1).await;

    // Early exiter stays out regardless of time and stake history
    let barred = ix::claim_seat(&program_id, &exited.pubkey());
    let err = send(&mut env, &[barred], &[&exited]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::NotEligible);

    let seat = ix::claim_seat(&program_id, &patron_a.pubkey());
    send(&mut env, &[seat], &[&patron_a]).await.unwrap();
    let claim = read_claim(&mut env, &patron_a.pubkey()).await;
    assert!(claim.dao_seat_holder);
    assert!(claim.dao_eligible);

    // One seat only
    let overflow = ix::claim_seat(&program_id, &patron_b.pubkey());
    let err = send(&mut env, &[overflow], &[&patron_b]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::NoSeatsAvailable);

    // A holder cannot double-claim even when seats run out
    let double = ix::claim_seat(&program_id, &patron_a.pubkey());
    let err = send(&mut env, &[double], &[&patron_a]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::SeatAlreadyHeld);
}

#[tokio::test]
async fn test_record_swap_is_operator_gated() {
    let mut env = setup(1).await;
    let program_id = env.program_id;
    let user = env.users[0].insecure_clone();
    let operator = env.operator.insecure_clone();

    let rogue = ix::record_swap(&program_id, &user.pubkey(), &user.pubkey(), 100, true);
    let err = send(&mut env, &[rogue], &[&user]).await.unwrap_err();
    assert_settlement_error(err, SettlementError::Unauthorized);

    let record = ix::record_swap(&program_id, &operator.pubkey(), &user.pubkey(), 100, true);
    send(&mut env, &[record], &[&operator]).await.unwrap();

    let (tracker_address, _) = ix::find_swap_tracker_address(&program_id, &user.pubkey());
    let tracker: OtcSwapTracker = read_account(&mut env, &tracker_address).await;
    assert_eq!(tracker.total_swapped, 100);
    assert_eq!(tracker.swap_count, 1);
    assert!(tracker.is_dao_eligible);
}
