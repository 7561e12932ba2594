pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod poller;
pub mod tally;
pub mod web;
