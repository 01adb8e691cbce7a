//! Unit tests for the postgres module.
//!
//! The suite is split across focused submodules: version parsing, the
//! install/cluster lifecycle, role and database statements, and dumps.

mod access;
mod dump;
