pub mod connection;
pub mod reviews;

pub use connection::*;
pub use reviews::*;
