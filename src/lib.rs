pub mod assets;
pub mod broadcast;
pub mod config;
pub mod database;
pub mod enrichment;
pub mod errors;
pub mod models;
pub mod profile_images;
pub mod tasks;
pub mod utils;
pub mod web;
