//! Accounts module - tracked game accounts and their sync state.

mod accounts_model;
mod accounts_traits;

#[cfg(test)]
mod accounts_model_tests;

// Re-export the public interface
pub use accounts_model::{Account, NewAccount, SyncStatus};
pub use accounts_traits::AccountRepositoryTrait;
