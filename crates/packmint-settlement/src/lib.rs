//! # packmint-settlement
//!
//! **Order Settlement Engine** and the serialized execution environment it
//! runs in.
//!
//! ## Settlement pipeline
//!
//! A buyer submits an [`Order`](packmint_types::Order) endorsed by the
//! engine's verifier. The engine:
//! 1. Validates the order (`fee <= amount`, attached native value covers `amount`)
//! 2. Verifies the verifier's signature over the order's signing digest
//! 3. Finalizes the order hash (replay guard), before any transfer
//! 4. Routes payment: project payout and optional fee leg
//! 5. Mints one token through the target registry's `mint_to`
//!
//! Every operation runs inside [`Chain::transact`]: on any failure the whole
//! world state is restored, including the finalized-order insertion.

pub mod chain;
pub mod engine;
pub mod finalized;
pub mod payout;
pub mod telemetry;

pub use chain::{Chain, WorldState};
pub use engine::SettlementEngine;
pub use finalized::FinalizedOrderSet;
pub use payout::{PayoutLeg, PayoutPlan, PayoutRole};
pub use telemetry::{LogFormat, init_tracing};
