// src/lexer/mod.rs
pub mod emit;
pub mod scanner;
pub mod tables;
