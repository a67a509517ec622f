//! Aklla Soap Formulator Library
//!
//! Formulation engine, ingredient catalog and batch records for
//! melt-and-pour and cold-process soap.

pub mod build_info;
pub mod db;
pub mod formulation;
pub mod mcp;
pub mod models;
pub mod tools;
