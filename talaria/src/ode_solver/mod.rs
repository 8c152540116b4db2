pub mod builder;
pub mod equations;
pub mod taylor;
pub mod test_models;
