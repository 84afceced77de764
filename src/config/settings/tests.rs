use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.service.protocol, "http");
    assert_eq!(config.service.host, "localhost");
    assert_eq!(config.service.port, 5000);
    assert!(config.service.include_embeddings);
    assert_eq!(config.highlight.leave_debounce_ms, 100);
    assert_eq!(config.highlight.similar_words, 5);
    assert_eq!(config.highlight.default_mode, HighlightMode::CoOccurrence);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.service.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.service.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.service.timeout_seconds = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.highlight.leave_debounce_ms = 5;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.highlight.similar_words = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.highlight.similar_words = 6;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn service_url_generation() {
    let config = Config::default();
    let url = config
        .service_url()
        .expect("should generate service_url successfully");
    assert_eq!(url.as_str(), "http://localhost:5000/");
}

#[test]
fn https_url_generation() {
    let mut config = Config::default();
    config.service.protocol = "https".to_string();
    config.service.host = "secure.example.com".to_string();
    config.service.port = 443;

    let url = config
        .service_url()
        .expect("should generate https url successfully");
    assert_eq!(url.as_str(), "https://secure.example.com/");
}

#[test]
fn toml_serialization() {
    let mut config = Config::default();
    config.highlight.default_mode = HighlightMode::Similarity;

    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    assert!(toml_str.contains("default_mode = \"similarity\""), "{}", toml_str);

    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn setter_validation() {
    let mut service = ServiceConfig::default();

    assert!(service.set_protocol("https".to_string()).is_ok());
    assert!(service.set_host("example.com".to_string()).is_ok());
    assert!(service.set_port(8080).is_ok());
    assert!(service.set_timeout_seconds(600).is_ok());

    assert!(service.set_protocol("ftp".to_string()).is_err());
    assert!(service.set_protocol("HTTP".to_string()).is_err());
    assert!(service.set_host(String::new()).is_err());
    assert!(service.set_port(0).is_err());
    assert!(service.set_timeout_seconds(601).is_err());
    assert_eq!(service.host, "example.com");

    let mut highlight = HighlightConfig::default();
    assert!(highlight.set_leave_debounce_ms(10).is_ok());
    assert!(highlight.set_leave_debounce_ms(2001).is_err());
    assert!(highlight.set_similar_words(1).is_ok());
    assert!(highlight.set_similar_words(6).is_err());
    assert_eq!(highlight.leave_debounce(), Duration::from_millis(10));
    assert_eq!(highlight.similar_words, 1);
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing config falls back to defaults");
    assert_eq!(config.service, ServiceConfig::default());
    assert_eq!(config.highlight, HighlightConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().join("nested"),
        ..Config::default()
    };
    config.service.port = 8123;
    config.highlight.similar_words = 3;

    config.save().expect("config should save");
    assert!(config.config_file_path().exists());

    let loaded = Config::load(temp_dir.path().join("nested")).expect("config should load");
    assert_eq!(loaded, config);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[highlight]\nsimilar_words = 9\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn save_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.service.protocol = "gopher".to_string();

    assert!(config.save().is_err());
    assert!(!config.config_file_path().exists());
}
