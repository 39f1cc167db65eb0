//! Key layout and small pure helpers shared by both adapters.

pub mod keys;
