//! # Command Layer
//!
//! One module per operation. Each `run` takes the store (and, for covers, the
//! coordinator), does the work, and reports back through [`CmdResult`]. No
//! module here prints or knows which client called it.

use crate::model::DocumentRecord;

pub mod cover;
pub mod create;
pub mod delete;
pub mod doctor;
pub mod file;
pub mod get;
pub mod list;

pub use cover::CoverSource;
pub use doctor::DoctorReport;
pub use file::DocumentFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub documents: Vec<DocumentRecord>,
    pub cover: Option<CoverSource>,
    pub file: Option<DocumentFile>,
    pub report: Option<DoctorReport>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_documents(mut self, documents: Vec<DocumentRecord>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_cover(mut self, cover: CoverSource) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn with_file(mut self, file: DocumentFile) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_report(mut self, report: DoctorReport) -> Self {
        self.report = Some(report);
        self
    }
}
