pub mod config;
pub mod db;
pub mod docstore;
pub mod domain;
pub mod error;
pub mod forms;
