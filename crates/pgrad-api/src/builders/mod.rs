pub mod distribution;
pub mod learning_module;
pub mod on_policy_algo;
