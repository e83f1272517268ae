use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Vr,
    Psp,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Vr, Platform::Psp];
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Vr => f.write_str("VR"),
            Platform::Psp => f.write_str("PSP"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vr" => Ok(Platform::Vr),
            "psp" => Ok(Platform::Psp),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    // Gift API roots, without `/by_month`.
    pub vr_base: String,
    pub psp_base: String,
    pub timeout_secs: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            vr_base: "https://vr.qianqiuzy.cn/gift".to_string(),
            psp_base: "https://psp.qianqiuzy.cn/gift".to_string(),
            timeout_secs: 5.0,
        }
    }
}

impl ApiConfig {
    pub fn base(&self, platform: Platform) -> &str {
        match platform {
            Platform::Vr => &self.vr_base,
            Platform::Psp => &self.psp_base,
        }
    }

    pub fn timeout(&self) -> Duration {
        if self.timeout_secs.is_finite() && self.timeout_secs > 0.0 {
            Duration::from_secs_f64(self.timeout_secs)
        } else {
            Duration::from_secs(5)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub vr_ranking: String,
    pub psp_ranking: String,
    pub vr_live: String,
    pub psp_live: String,
    pub brawl: String,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            vr_ranking: "VR斗虫".to_string(),
            psp_ranking: "PSP斗虫".to_string(),
            vr_live: "VR开播".to_string(),
            psp_live: "PSP开播".to_string(),
            brawl: "VRPSP大乱斗".to_string(),
        }
    }
}

impl TitleConfig {
    pub fn ranking(&self, platform: Platform) -> &str {
        match platform {
            Platform::Vr => &self.vr_ranking,
            Platform::Psp => &self.psp_ranking,
        }
    }

    pub fn live(&self, platform: Platform) -> &str {
        match platform {
            Platform::Vr => &self.vr_live,
            Platform::Psp => &self.psp_live,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub resource_dir: PathBuf,
    pub normal_font: String,
    pub bold_font: String,
    pub emoji_font: String,
    pub footer: String,
    pub sc_max_page_height: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resource_dir: PathBuf::from("resource"),
            normal_font: "NotoSansSC.ttf".to_string(),
            bold_font: "NotoSansSC.ttf".to_string(),
            emoji_font: "NotoEmoji.ttf".to_string(),
            footer: "Designed by QianQiuZy".to_string(),
            sc_max_page_height: 16_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub titles: TitleConfig,
    pub render: RenderConfig,
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

// No path means built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let content = fs::read_to_string(path)?;
    let config: Config = content.parse()?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_deployment() {
        let config = Config::default();
        assert_eq!(config.api.base(Platform::Vr), "https://vr.qianqiuzy.cn/gift");
        assert_eq!(config.api.base(Platform::Psp), "https://psp.qianqiuzy.cn/gift");
        assert_eq!(config.api.timeout(), Duration::from_secs(5));
        assert_eq!(config.titles.ranking(Platform::Psp), "PSP斗虫");
        assert_eq!(config.titles.live(Platform::Vr), "VR开播");
        assert_eq!(config.titles.brawl, "VRPSP大乱斗");
        assert_eq!(config.render.sc_max_page_height, 16_000);
        assert_eq!(config.render.footer, "Designed by QianQiuZy");
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config: Config = r#"
            [api]
            vr_base = "http://127.0.0.1:9000/gift"
            timeout_secs = 1.5

            [render]
            resource_dir = "/opt/fonts"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.api.vr_base, "http://127.0.0.1:9000/gift");
        assert_eq!(config.api.psp_base, ApiConfig::default().psp_base);
        assert_eq!(config.api.timeout(), Duration::from_millis(1500));
        assert_eq!(config.render.resource_dir, PathBuf::from("/opt/fonts"));
        assert_eq!(config.render.emoji_font, "NotoEmoji.ttf");
        assert_eq!(config.titles, TitleConfig::default());
    }

    #[test]
    fn bad_timeout_falls_back() {
        let api = ApiConfig {
            timeout_secs: -1.0,
            ..ApiConfig::default()
        };
        assert_eq!(api.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[titles]\nbrawl = \"大乱斗\"").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.titles.brawl, "大乱斗");
        assert_eq!(load_config(None).unwrap(), Config::default());
    }

    #[test]
    fn load_errors_are_typed() {
        let missing = load_config(Some(Path::new("/nonexistent/giftboard.toml")));
        assert!(matches!(missing, Err(ConfigError::Io(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\ntimeout_secs = ").unwrap();
        assert!(matches!(load_config(Some(file.path())), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn platform_parsing() {
        assert_eq!("VR".parse::<Platform>(), Ok(Platform::Vr));
        assert_eq!("psp".parse::<Platform>(), Ok(Platform::Psp));
        assert!("tv".parse::<Platform>().is_err());
        assert_eq!(Platform::Psp.to_string(), "PSP");
    }
}
