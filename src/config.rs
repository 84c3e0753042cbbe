//! Layered settings: optional file, then REVERIE__* environment variables

use crate::error::{ReverieError, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub clova: ClovaSettings,
    pub kakao: KakaoSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClovaSettings {
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub default_speaker: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KakaoSettings {
    pub auth_endpoint: String,
    pub api_endpoint: String,
    pub rest_api_key: String,
    pub redirect_uri: String,
}

impl Settings {
    /// Load settings from an optional file with environment overrides.
    /// `REVERIE__CLOVA__CLIENT_ID=...` overrides `clova.client_id`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("server.bind", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("storage.data_dir", "./reverie_data")?
            .set_default("clova.endpoint", "https://naveropenapi.apigw.ntruss.com/tts-premium/v1/tts")?
            .set_default("clova.client_id", "")?
            .set_default("clova.client_secret", "")?
            .set_default("clova.default_speaker", "nara")?
            .set_default("kakao.auth_endpoint", "https://kauth.kakao.com")?
            .set_default("kakao.api_endpoint", "https://kapi.kakao.com")?
            .set_default("kakao.rest_api_key", "")?
            .set_default("kakao.redirect_uri", "")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("REVERIE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl From<config::ConfigError> for ReverieError {
    fn from(err: config::ConfigError) -> Self {
        ReverieError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let settings = Settings::load("does-not-exist").unwrap();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.clova.default_speaker, "nara");
        assert!(settings.kakao.auth_endpoint.starts_with("https://kauth"));
    }
}
