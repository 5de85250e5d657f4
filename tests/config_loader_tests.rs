use invoicing::config::{ConfigError, ConfigLoader};
use invoicing::locale::Locale;
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const SECRET: &str = "integration-test-secret-0123456789abcdef";

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    unsafe {
        for key in [
            "INVOICING_PROFILE",
            "INVOICING_API_BIND_ADDR",
            "INVOICING_LOG_LEVEL",
            "INVOICING_JWT_SECRET",
            "INVOICING_DEFAULT_LOCALE",
            "INVOICING_ADMIN_EMAIL",
            "INVOICING_ADMIN_PASSWORD",
            "INVOICING_SCHEDULER_ENABLED",
            "INVOICING_SCHEDULER_TICK_INTERVAL_SECONDS",
            "INVOICING_CORS_ALLOWED_ORIGINS",
        ] {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_only_secret_present() {
    let _guard = env_guard();
    clear_env();
    unsafe {
        env::set_var("INVOICING_JWT_SECRET", SECRET);
    }

    let temp_dir = TempDir::new().unwrap();
    let cfg = loader(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.locale(), Locale::Cs);
    assert!(cfg.scheduler.enabled);
    assert_eq!(cfg.scheduler.tick_interval_seconds, 60);
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn missing_secret_is_rejected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let err = loader(&temp_dir).load().expect_err("secret is required");

    assert!(matches!(err, ConfigError::MissingJwtSecret));
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "INVOICING_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "INVOICING_API_BIND_ADDR=192.168.0.10:5000\nINVOICING_DEFAULT_LOCALE=SK\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "INVOICING_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        &format!(
            "INVOICING_PROFILE=test\nINVOICING_API_BIND_ADDR=127.0.0.1:4000\nINVOICING_JWT_SECRET={SECRET}\n"
        ),
    );

    let cfg = loader(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.locale(), Locale::Sk);
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        &format!("INVOICING_API_BIND_ADDR=127.0.0.1:3000\nINVOICING_JWT_SECRET={SECRET}\n"),
    );

    unsafe {
        env::set_var("INVOICING_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var("INVOICING_SCHEDULER_ENABLED", "off");
        env::set_var(
            "INVOICING_CORS_ALLOWED_ORIGINS",
            "https://app.example.cz, https://admin.example.cz",
        );
    }

    let cfg = loader(&temp_dir)
        .load()
        .expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert!(!cfg.scheduler.enabled);
    assert_eq!(
        cfg.cors_allowed_origins,
        vec!["https://app.example.cz", "https://admin.example.cz"]
    );

    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("INVOICING_API_BIND_ADDR", "not-an-addr");
        env::set_var("INVOICING_JWT_SECRET", SECRET);
    }
    let temp_dir = TempDir::new().unwrap();
    let err = loader(&temp_dir)
        .load()
        .expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));

    clear_env();
}

#[test]
fn admin_bootstrap_requires_both_settings() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("INVOICING_JWT_SECRET", SECRET);
        env::set_var("INVOICING_ADMIN_EMAIL", "admin@example.cz");
    }
    let temp_dir = TempDir::new().unwrap();
    let err = loader(&temp_dir)
        .load()
        .expect_err("password is required with email");
    assert!(matches!(err, ConfigError::IncompleteAdminBootstrap));

    unsafe {
        env::set_var("INVOICING_ADMIN_PASSWORD", "long-enough-password");
    }
    let cfg = loader(&temp_dir).load().expect("complete bootstrap loads");
    assert_eq!(cfg.admin_email.as_deref(), Some("admin@example.cz"));
    assert!(!cfg.redacted_json().unwrap().contains("long-enough-password"));

    clear_env();
}

#[test]
fn out_of_range_tick_interval_is_rejected() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("INVOICING_JWT_SECRET", SECRET);
        env::set_var("INVOICING_SCHEDULER_TICK_INTERVAL_SECONDS", "5");
    }
    let temp_dir = TempDir::new().unwrap();
    let err = loader(&temp_dir).load().expect_err("tick too short");
    assert!(matches!(
        err,
        ConfigError::InvalidSchedulerTickInterval { value: 5 }
    ));

    clear_env();
}
