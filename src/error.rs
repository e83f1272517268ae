use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("font file missing: {}", .0.display())]
    MissingFont(PathBuf),
    #[error("invalid font data: {0}")]
    InvalidFont(String),
    #[error("canvas error: {0}")]
    Canvas(String),
    #[error("png encode failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("{0}")]
    Validation(String),
    #[error("{context}：{source}")]
    Fetch {
        context: &'static str,
        #[source]
        source: FetchError,
    },
    #[error("未找到用户")]
    NotFound,
    #[error("{0}")]
    NoData(String),
    #[error("生成图片失败：{0}")]
    Render(#[from] RenderError),
}

impl ReportError {
    pub(crate) fn fetch(context: &'static str) -> impl FnOnce(FetchError) -> ReportError {
        move |source| ReportError::Fetch { context, source }
    }

    // Every variant maps to exactly one reply line for the caller.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, ReportError::Fetch { .. } | ReportError::Render(_))
    }
}
