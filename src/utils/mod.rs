pub mod connection_guard;

pub use connection_guard::ConnectionGuard;
