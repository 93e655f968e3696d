//! Binary bootstrap: logging, config and fixer wiring

pub mod init;
