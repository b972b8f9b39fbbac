pub mod auth;
pub mod cors;

mod limiter;

pub use limiter::Limiter;
