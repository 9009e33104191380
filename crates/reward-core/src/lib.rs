pub mod clock;
pub mod config;
pub mod types;


pub use clock::*;
pub use config::*;
pub use types::*;
