use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "greenvision.toml";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_url: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            log_filter: "info".into(),
        }
    }
}

pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("server_url") {
                settings.server_url = v.clone();
            }
            if let Some(v) = file_cfg.get("log_filter") {
                settings.log_filter = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("GREENVISION_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("GREENVISION_LOG") {
        settings.log_filter = v;
    }

    settings
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    #[test]
    fn defaults_when_no_config_file_exists() {
        let settings = load_settings(Some(Path::new("/nonexistent/greenvision.toml")));
        assert_eq!(settings.server_url, "http://127.0.0.1:8000");
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn config_file_overrides_defaults() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();

        let path = env::temp_dir().join(format!("greenvision_gui_test_{suffix}.toml"));
        fs::write(&path, "server_url = \"http://10.0.0.5:9000\"\n").expect("write config");

        let settings = load_settings(Some(&path));
        assert_eq!(settings.server_url, "http://10.0.0.5:9000");
        assert_eq!(settings.log_filter, "info");

        fs::remove_file(path).expect("cleanup");
    }
}
