//! Report rendering. A renderer turns a [`Summary`](crate::aggregate::Summary) into an [`Artifact`]; callers never
//! look inside the bytes.
pub mod html;
pub mod json;
pub mod text;

use std::fmt::Display;

use chrono::DateTime;
use chrono::Utc;

use crate::traits::ReportRenderer;

pub const DEFAULT_TITLE: &str = "Cleaning products inventory summary";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes:        Vec<u8>,
    pub content_type: &'static str,
    pub extension:    &'static str,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Html,
    Json,
}

impl ReportFormat {
    pub fn renderer(&self, title: &str) -> Box<dyn ReportRenderer> {
        match self {
            Self::Text => Box::new(text::TextRenderer::new(title)),
            Self::Html => Box::new(html::HtmlRenderer::new(title)),
            Self::Json => Box::new(json::JsonRenderer),
        }
    }
}

impl Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::Json => "json",
        })
    }
}

pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M UTC").to_string()
}
