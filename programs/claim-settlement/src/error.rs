use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq)]
pub enum SettlementError {
    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    #[error("Invalid account data")]
    InvalidAccountData = 1,

    #[error("Invalid PDA")]
    InvalidPda = 2,

    #[error("Already initialized")]
    AlreadyInitialized = 3,

    #[error("Not initialized")]
    NotInitialized = 4,

    #[error("Unauthorized")]
    Unauthorized = 5,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 6,

    #[error("No mining history")]
    NoMiningHistory = 7,

    #[error("Invalid role transition")]
    InvalidRoleTransition = 8,

    #[error("Qualification score too low")]
    QualificationTooLow = 9,

    #[error("Patron application not approved")]
    PatronNotApproved = 10,

    #[error("Invalid lock duration for role")]
    InvalidLockDuration = 11,

    #[error("Vesting lock has not expired")]
    VestingNotUnlocked = 12,

    #[error("Insufficient treasury balance")]
    InsufficientTreasury = 13,

    #[error("Insufficient spendable balance")]
    InsufficientSpendableBalance = 14,

    #[error("An order is already active for this seller")]
    OrderAlreadyActive = 15,

    #[error("Order is not active")]
    OrderInactive = 16,

    #[error("Swap type not allowed for seller role")]
    InvalidSwapType = 17,

    #[error("Buyer does not meet order restrictions")]
    BuyerNotEligible = 18,

    #[error("No DAO seats available")]
    NoSeatsAvailable = 19,

    #[error("Participant not eligible for a DAO seat")]
    NotEligible = 20,

    #[error("No tokens locked")]
    NothingLocked = 21,

    #[error("A lock is already active")]
    LockAlreadyActive = 22,

    #[error("Participant already holds a DAO seat")]
    SeatAlreadyHeld = 23,
}

impl PrintProgramError for SettlementError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("SettlementError: {}", self);
    }
}

impl From<SettlementError> for ProgramError {
    fn from(e: SettlementError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for SettlementError {
    fn type_of() -> &'static str {
        "SettlementError"
    }
}
