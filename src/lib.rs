pub mod cli;
pub mod config;
pub mod confluence;
pub mod db;
pub mod global;
pub mod publication;
pub mod vault;
