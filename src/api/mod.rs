// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod analysis_tracker {
    pub use crate::analysis_tracker::*;
}
