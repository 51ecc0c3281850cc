pub mod classifier;
pub mod models;
pub mod preprocess;
pub mod service;
pub mod task;
