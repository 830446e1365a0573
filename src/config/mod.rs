mod config;

pub use config::{CheckoutSettings, Config, GitSettings, Limits, REPOS_ROOT_ENV_VARS};
