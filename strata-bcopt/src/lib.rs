pub mod common;
pub mod reg_acc_alloc;

pub use reg_acc_alloc::{is_acc_write_between, RegAccAlloc};

/// An optimization pass over one instruction graph.
///
/// `run` returns `false` when the pass could not be applied to this method;
/// the pipeline then falls back to the general register allocator. This is a
/// per-method condition, never a compilation failure.
pub trait Optimization {
    fn name(&self) -> &'static str;
    fn run(&mut self) -> bool;
}
