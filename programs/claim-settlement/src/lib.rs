use solana_program::{
    account_info::AccountInfo,
    entrypoint,
    entrypoint::ProgramResult,
    pubkey::Pubkey,
};

pub mod constants;
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;

use crate::processor::Processor;

solana_program::declare_id!("7Vz9C5PWjXMyZ3MyjPBCgNXMfz4GHyTkLTNbYiC2zfZ7");

#[cfg(not(feature = "no-entrypoint"))]
entrypoint!(process);

pub fn process(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    Processor::process(program_id, accounts, instruction_data)
}
