//! External service integrations.

pub mod analysis_client {
    pub use crate::analysis_client::*;
}

pub mod analysis_models {
    pub use crate::analysis_models::*;
}
