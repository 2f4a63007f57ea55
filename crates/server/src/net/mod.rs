//! TCP front end: one accept loop, one actor per connection.

pub mod connection;
pub mod listener;
