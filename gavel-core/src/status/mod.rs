//! The auto-status state machine.
//!
//! This module implements the rules by which a trackable record's workflow
//! status moves in response to what changed in one persistence unit. The
//! design separates:
//! - **State**: the declared status enums (`state`)
//! - **Change descriptor**: what changed in this unit (`change`)
//! - **Rules**: which changes qualify, per record kind (`rules`)
//! - **Engine**: pure function `(kind, status, descriptor) -> decision` (`engine`)
//! - **Review**: the satellite `Unreviewed`/`Reviewed` machine (`review`)
//!
//! The server's transaction boundary builds a descriptor per mutation,
//! asks the engine for a decision, and persists the result.

pub mod change;
pub mod engine;
pub mod observer;
pub mod review;
pub mod rules;
pub mod state;
