pub mod error;
pub mod metrics;
pub mod traits;
pub mod types;

pub use error::*;
pub use traits::*;
pub use types::*;
