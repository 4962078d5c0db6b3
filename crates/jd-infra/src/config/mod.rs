mod loader;

pub use loader::{load_app_config, load_with_env, ENV_PREFIX};
