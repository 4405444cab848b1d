//! Integration tests for config

#[cfg(test)]
mod tests {
    use libstage_config::*;
    use libstage_types::{ColorChoice, OutputFormat};
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 4] = [
        "LIBSTAGE_COLOR",
        "LIBSTAGE_SCRATCH_ROOT",
        "LIBSTAGE_PROJECT_ROOT",
        "LIBSTAGE_HASH_JOBS",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
default_output = "plain"
color = "never"

[staging]
scratch_root = "/tmp/scratch"
project_root = "/src/app"
hash_jobs = 4
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.default_output, OutputFormat::Plain);
        assert_eq!(config.general.color, ColorChoice::Never);
        assert_eq!(config.scratch_root(), Path::new("/tmp/scratch"));
        assert_eq!(config.project_root(), PathBuf::from("/src/app"));
        assert_eq!(config.hash_jobs(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let err = Config::load_or_default(Some(Path::new("/definitely/not/here.toml")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            libstage_errors::Error::Config(libstage_errors::ConfigError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_toml_is_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[staging\nhash_jobs = ").unwrap();

        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(matches!(
            err,
            libstage_errors::Error::Config(libstage_errors::ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("LIBSTAGE_COLOR", "always");
        std::env::set_var("LIBSTAGE_SCRATCH_ROOT", "/scratch");
        std::env::set_var("LIBSTAGE_PROJECT_ROOT", "/project");
        std::env::set_var("LIBSTAGE_HASH_JOBS", "2");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.general.color, ColorChoice::Always);
        assert_eq!(config.scratch_root(), Path::new("/scratch"));
        assert_eq!(config.project_root(), PathBuf::from("/project"));
        assert_eq!(config.staging.hash_jobs, 2);

        clear_env();
    }

    #[test]
    fn test_merge_env_rejects_bad_values() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("LIBSTAGE_HASH_JOBS", "many");
        let mut config = Config::default();
        let err = config.merge_env().unwrap_err();
        assert!(err.to_string().contains("LIBSTAGE_HASH_JOBS"));

        clear_env();
        std::env::set_var("LIBSTAGE_COLOR", "sometimes");
        assert!(Config::default().merge_env().is_err());

        clear_env();
    }
}
