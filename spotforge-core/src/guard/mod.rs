//! Guard / auto-trigger evaluation

pub mod evaluator;

pub use evaluator::GuardEvaluator;
