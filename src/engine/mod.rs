//! Execution engine for crmform
//!
//! The engine orchestrates:
//! 1. Planning - Order declarations and recorded resources into steps
//! 2. Diffing - Show what each step changes
//! 3. Executing - Run steps one at a time, saving state after each

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, Execution, TerminalConfirm, ensure_success, execute};
pub use planner::{ExecutionPlan, Operation, Step};
