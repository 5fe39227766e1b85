//! CLI commands

pub mod cog;
pub mod findcog;
pub mod pip;
pub mod repo;
