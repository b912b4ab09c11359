pub mod config;
pub mod imaging;
pub mod recipes;
pub mod recognizer;
pub mod routes;
pub mod training;
