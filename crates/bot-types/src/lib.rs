//! Common types shared by the USDC wallet bot crates.
//!
//! Networks and their on-chain constants, orders, conversation sessions,
//! typed callback payloads, Telegram wire types, and the schema validation
//! helpers used by both configuration and order checks.

pub mod account;
pub mod balance;
pub mod callback;
pub mod delivery;
pub mod format;
pub mod network;
pub mod order;
pub mod session;
pub mod telegram;
pub mod validation;

pub use account::*;
pub use balance::*;
pub use callback::*;
pub use delivery::*;
pub use format::*;
pub use network::*;
pub use order::*;
pub use session::*;
pub use telegram::*;
pub use validation::*;
