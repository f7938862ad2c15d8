use std::io::Write;
use std::sync::Mutex;

use holdfast_config::ConfigLoader;

/// `std::env::set_var` mutates process-global state; serialize the tests
/// that touch it so they don't race each other's env vars.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const REQUIRED_VARS: &[(&str, &str)] = &[
    ("TMDB_API_KEY", "test-tmdb-key"),
    ("INDEXER_PROWLARR_BASE_URL", "http://localhost:9696"),
    ("INDEXER_PROWLARR_API_KEY", "test-indexer-key"),
    ("LIBRARY_MOVIES_ROOT", "/library/movies"),
    ("LIBRARY_TV_ROOT", "/library/tv"),
    ("STORAGE_DATABASE_URL", "postgresql://localhost/holdfast"),
];

fn clear_all_vars() {
    for (name, _) in REQUIRED_VARS {
        std::env::remove_var(name);
    }
    for name in [
        "SERVER_BIND_ADDR",
        "INDEXER_MOVIE_CATEGORIES",
        "INDEXER_EPISODE_CATEGORIES",
        "MANAGER_JOBS_MOVIE_INDEX_INTERVAL",
        "HOLDFAST_CONFIG_FILE",
    ] {
        std::env::remove_var(name);
    }
}

fn set_required_vars() {
    for (name, value) in REQUIRED_VARS {
        std::env::set_var(name, value);
    }
}

#[test]
fn missing_required_field_is_a_clear_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_all_vars();

    let err = ConfigLoader::load().expect_err("no TMDB_API_KEY should fail to load");
    assert!(err.to_string().contains("TMDB_API_KEY"));
}

#[test]
fn env_vars_alone_resolve_a_complete_config_with_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_all_vars();
    set_required_vars();

    let config = ConfigLoader::load().expect("env-only config should resolve");
    assert_eq!(config.tmdb.api_key, "test-tmdb-key");
    assert_eq!(config.server.bind_addr.port(), 8787);
    assert_eq!(config.indexer.movie_categories, vec![2000]);
    assert_eq!(config.manager_jobs.movie_index_interval.as_secs(), 600);

    clear_all_vars();
}

#[test]
fn env_vars_override_file_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_all_vars();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [tmdb]
        api_key = "from-file"

        [indexer]
        prowlarr_base_url = "http://file-indexer:9696"
        prowlarr_api_key = "file-indexer-key"

        [library]
        movies_root = "/file/movies"
        tv_root = "/file/tv"

        [storage]
        database_url = "postgresql://file/db"
        "#
    )
    .unwrap();

    std::env::set_var("HOLDFAST_CONFIG_FILE", file.path());
    std::env::set_var("TMDB_API_KEY", "from-env");

    let config = ConfigLoader::load().expect("file-backed config should resolve");
    assert_eq!(config.tmdb.api_key, "from-env");
    assert_eq!(config.indexer.prowlarr_base_url, "http://file-indexer:9696");
    assert_eq!(config.library.movies_root.to_str().unwrap(), "/file/movies");

    clear_all_vars();
}

#[test]
fn invalid_duration_override_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_all_vars();
    set_required_vars();
    std::env::set_var("MANAGER_JOBS_MOVIE_INDEX_INTERVAL", "not-a-duration");

    let err = ConfigLoader::load().expect_err("malformed duration should fail to load");
    assert!(err.to_string().contains("MANAGER_JOBS_MOVIE_INDEX_INTERVAL"));

    clear_all_vars();
}
