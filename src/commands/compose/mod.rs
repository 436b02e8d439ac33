//! Events, rounds and round slots, plus the read-side normalized view.
//!
//! Every write that touches a round slot validates the exclusive question
//! reference before it reaches storage; the table's CHECK constraint backs it up.

mod error;
mod events;
mod rounds;
mod run;
mod slots;
#[cfg(test)]
mod tests;
mod user_questions;
mod view;

pub use run::{run_event, run_round, run_slot, run_user_question, run_view};
