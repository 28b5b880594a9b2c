//! Insurer integrations.

pub mod insurers {
    pub use crate::insurers::*;
}

pub mod pottencial_client {
    pub use crate::pottencial_client::*;
}

pub mod token_cache {
    pub use crate::token_cache::*;
}
