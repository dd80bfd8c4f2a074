pub mod batch;
pub mod distributions;
pub mod learning_module;
pub mod objectives;
pub mod optimizer;
pub mod sequential;
pub mod tensors;
pub mod value_function;
