pub mod connection;
pub mod legacy;
pub mod models;
