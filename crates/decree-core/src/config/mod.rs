pub mod settings;

pub use settings::{
    configure_remote, ensure_initialized, initialize, is_initialized, Settings, VALID_POLICIES,
};
