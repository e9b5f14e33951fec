//! Failures that can end a board request.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoardError {
    /// The upstream call could not complete, or its body could not be read.
    #[error("buddybuild request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("buddybuild returned HTTP {status}")]
    UpstreamStatus { status: reqwest::StatusCode },

    /// The body was not a JSON array of builds.
    #[error("failed to decode buddybuild builds: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to read template {}: {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse template {}: {source}", path.display())]
    TemplateParse {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to render template: {0}")]
    Render(#[source] minijinja::Error),
}

impl BoardError {
    /// Pipeline stage that produced the error, used as a log field and metric label.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Transport(_) | Self::UpstreamStatus { .. } => "transport",
            Self::Decode(_) => "decode",
            Self::TemplateRead { .. } | Self::TemplateParse { .. } => "template_load",
            Self::Render(_) => "render",
        }
    }
}
