//! Infrastructure layer - network handles shared by the domain

pub mod blockchain;
