pub mod config;
pub mod errors;
pub mod generator;
pub mod llm;
pub mod logging;
pub mod sandbox;
pub mod studio;
