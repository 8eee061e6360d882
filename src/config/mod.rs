//! User credentials/provider settings and optional per-repository settings.

pub mod repo;
pub mod user;

pub use repo::{
    CommitTypes, DEFAULT_TYPES, REPO_CONFIG_FILE, RepoConfig, ScopeRule, TypeMode, allowed_types,
    load_repo_config,
};
pub use user::{
    CommitMode, ProviderKind, UserConfig, default_config_path, init_user_config, load_user_config,
    parse_env_file,
};
