// Domain-layer modules and shared errors/models
pub mod engine {
    pub use crate::engine::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}

pub mod affordability {
    pub use crate::affordability::*;
}

pub mod decision {
    pub use crate::decision::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod normalizer {
    pub use crate::normalizer::*;
}

pub mod errors {
    pub use crate::errors::*;
}
