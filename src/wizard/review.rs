use std::sync::Arc;

use super::navigation::StepPayload;
use super::profile::CandidateProfile;
use crate::media::Artifact;

/// What the review step shows. Only exists when there is a profile.
#[derive(Debug, Clone)]
pub struct ReviewSummary {
    pub profile: Arc<CandidateProfile>,
    pub video: Option<Arc<Artifact>>,
}

impl ReviewSummary {
    pub fn from_payload(payload: &StepPayload) -> Option<Self> {
        let profile = payload.profile()?.clone();
        Some(Self {
            profile,
            video: payload.video().cloned(),
        })
    }

    /// Label/value rows for the candidate details.
    pub fn details(&self) -> Vec<(&'static str, String)> {
        let p = &self.profile;
        vec![
            ("First Name", p.first_name.clone()),
            ("Last Name", p.last_name.clone()),
            ("Position Applied For", p.position.to_string()),
            ("Current Position", p.current_position.clone()),
            ("Experience (Years)", p.experience.clone()),
        ]
    }

    pub fn resume_download_name(&self) -> String {
        self.profile.resume_download_name()
    }

    pub fn video_caption(&self) -> Option<String> {
        self.video.as_ref().map(|v| {
            let mut caption = format!(
                "{}s recorded at {}",
                v.duration_secs(),
                v.recorded_at().format("%H:%M:%S")
            );
            if !v.has_audio() {
                caption.push_str(" (no audio)");
            }
            caption
        })
    }
}
