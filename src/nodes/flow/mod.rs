//! Iteration: the LOOP node and its state machine.
//!
//! The processor only initialises a loop. Running the body and advancing
//! the [`LoopState`](loop_controller::LoopState) is up to the embedding
//! engine, through the functions in [`loop_controller`].

pub mod loop_controller;
pub mod loop_node;

pub use loop_controller::{
    advance_for_loop, advance_while_loop, aggregate_loop_results, apply_loop_variables,
    get_loop_context_variables, initialize_for_loop, initialize_loop, initialize_while_loop,
    should_loop_continue, LoopAggregate, LoopState, DEFAULT_MAX_ITERATIONS,
};
pub use loop_node::LoopProcessor;
