//! Request middleware

pub mod signature;
