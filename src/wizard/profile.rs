use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

/// The only media type accepted for a resume.
pub const RESUME_MEDIA_TYPE: &str = "application/pdf";

/// Largest resume accepted, in bytes (5 MiB).
pub const RESUME_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Roles a candidate can apply for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    TestEngineer,
    SoftwareDeveloper,
    BackendDeveloper,
    FrontendDeveloper,
    AiEngineer,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::TestEngineer,
        Position::SoftwareDeveloper,
        Position::BackendDeveloper,
        Position::FrontendDeveloper,
        Position::AiEngineer,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Position::TestEngineer => "Test Engineer",
            Position::SoftwareDeveloper => "Software Developer",
            Position::BackendDeveloper => "Backend Developer",
            Position::FrontendDeveloper => "Frontend Developer",
            Position::AiEngineer => "AI Engineer",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown position: {0:?}")]
pub struct UnknownPosition(pub String);

impl FromStr for Position {
    type Err = UnknownPosition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|p| p.title() == s.trim())
            .ok_or_else(|| UnknownPosition(s.to_string()))
    }
}

/// A file picked by the user. Only the name, declared media type, size and
/// content cross the file selection boundary, never the full path.
#[derive(Clone, PartialEq, Eq)]
pub struct ResumeFile {
    name: String,
    media_type: String,
    size: u64,
    content: Arc<[u8]>,
}

impl ResumeFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        content: impl Into<Arc<[u8]>>,
    ) -> Self {
        let content: Arc<[u8]> = content.into();
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size: content.len() as u64,
            content,
        }
    }

    /// A file known only by its declared type and size. Used when those
    /// already rule it out, so the content is never read.
    pub fn declared(name: impl Into<String>, media_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size,
            content: Arc::from(Vec::<u8>::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The first constraint this file violates, as a user-facing message.
    /// Type is checked before size, so a large non-PDF reports the type.
    pub fn problem(&self) -> Option<&'static str> {
        Self::check(&self.media_type, self.size)
    }

    /// [`ResumeFile::problem`] for a file that has not been read yet.
    pub fn check(media_type: &str, size: u64) -> Option<&'static str> {
        if media_type != RESUME_MEDIA_TYPE {
            Some("Only PDF files are allowed")
        } else if size > RESUME_MAX_BYTES {
            Some("File size must be less than or equal to 5 MB")
        } else {
            None
        }
    }
}

impl fmt::Debug for ResumeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.size())
            .finish()
    }
}

/// A validated applicant. Only produced by a successful form submit and
/// shared read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateProfile {
    pub first_name: String,
    pub last_name: String,
    pub position: Position,
    pub current_position: String,
    pub experience: String,
    pub resume: ResumeFile,
}

impl CandidateProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Suggested file name when saving the resume back out.
    pub fn resume_download_name(&self) -> String {
        format!("{}_{}_Resume.pdf", self.first_name, self.last_name)
    }
}
