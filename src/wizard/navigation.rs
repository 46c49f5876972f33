use std::sync::Arc;

use super::profile::CandidateProfile;
use crate::media::Artifact;

/// The three wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    #[default]
    Form,
    Recording,
    Review,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Form => "/",
            Route::Recording => "/instructions",
            Route::Review => "/review",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        [Route::Form, Route::Recording, Route::Review]
            .into_iter()
            .find(|r| r.path() == normalized)
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Form => "Candidate Information",
            Route::Recording => "Video Recording",
            Route::Review => "Review Candidate Information",
        }
    }

    /// Whether a step can be entered with this payload.
    fn admits(self, payload: &StepPayload) -> bool {
        match self {
            Route::Form => true,
            Route::Recording | Route::Review => payload.profile().is_some(),
        }
    }
}

/// Data handed from one step to the next. Everything in it is shared
/// read-only, so a later step cannot change what an earlier one produced.
#[derive(Debug, Clone, Default)]
pub enum StepPayload {
    #[default]
    Empty,
    Profile(Arc<CandidateProfile>),
    Recorded {
        profile: Arc<CandidateProfile>,
        video: Option<Arc<Artifact>>,
    },
}

impl StepPayload {
    pub fn profile(&self) -> Option<&Arc<CandidateProfile>> {
        match self {
            StepPayload::Empty => None,
            StepPayload::Profile(profile) | StepPayload::Recorded { profile, .. } => Some(profile),
        }
    }

    pub fn video(&self) -> Option<&Arc<Artifact>> {
        match self {
            StepPayload::Recorded { video, .. } => video.as_ref(),
            _ => None,
        }
    }
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub from: Route,
    pub to: Route,
    /// The requested step refused the payload and the wizard went back
    /// to the form instead.
    pub redirected: bool,
}

/// Form → Recording → Review, with a reset back to the form.
#[derive(Debug, Default)]
pub struct Wizard {
    route: Route,
    payload: StepPayload,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn payload(&self) -> &StepPayload {
        &self.payload
    }

    /// Enter `target` with `payload`. Every entry goes through here, so a
    /// step that needs a profile can never be shown without one.
    pub fn navigate(&mut self, target: Route, payload: StepPayload) -> Navigation {
        let from = self.route;
        let (to, payload, redirected) = if target.admits(&payload) {
            (target, payload, false)
        } else {
            log::warn!("{} needs a candidate profile; redirecting to the form", target.path());
            (Route::Form, StepPayload::Empty, true)
        };

        // the form always starts from scratch
        self.payload = match to {
            Route::Form => StepPayload::Empty,
            _ => payload,
        };
        self.route = to;
        log::info!("Navigated {} -> {}", from.path(), to.path());
        Navigation {
            from,
            to,
            redirected,
        }
    }

    /// Direct address entry. Unknown paths land on the form.
    pub fn open_path(&mut self, path: &str) -> Navigation {
        match Route::from_path(path) {
            Some(route) => self.navigate(route, StepPayload::Empty),
            None => {
                log::warn!("Unknown path {path:?}");
                let mut nav = self.navigate(Route::Form, StepPayload::Empty);
                nav.redirected = true;
                nav
            }
        }
    }

    pub fn complete_form(&mut self, profile: CandidateProfile) -> Navigation {
        self.navigate(Route::Recording, StepPayload::Profile(Arc::new(profile)))
    }

    /// Advance from the recording step with its artifact.
    pub fn complete_recording(&mut self, video: Arc<Artifact>) -> Navigation {
        let payload = match self.payload.profile() {
            Some(profile) => StepPayload::Recorded {
                profile: profile.clone(),
                video: Some(video),
            },
            None => StepPayload::Empty,
        };
        self.navigate(Route::Review, payload)
    }

    /// Discard everything and return to the form.
    pub fn restart(&mut self) -> Navigation {
        self.navigate(Route::Form, StepPayload::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::tests::recorded_file;
    use crate::wizard::profile::{Position, ResumeFile, RESUME_MEDIA_TYPE};

    fn profile() -> CandidateProfile {
        CandidateProfile {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            position: Position::SoftwareDeveloper,
            current_position: "Rear Admiral".into(),
            experience: "40".into(),
            resume: ResumeFile::new("cv.pdf", RESUME_MEDIA_TYPE, b"%PDF".to_vec()),
        }
    }

    fn video() -> Arc<Artifact> {
        Arc::new(Artifact::new(recorded_file(&[7; 4]), 12))
    }

    #[test]
    fn direct_review_without_profile_redirects() {
        let mut wizard = Wizard::new();
        let nav = wizard.open_path("/review");

        assert_eq!(
            nav,
            Navigation {
                from: Route::Form,
                to: Route::Form,
                redirected: true
            }
        );
        assert_eq!(wizard.route(), Route::Form);
        assert!(wizard.payload().profile().is_none());
    }

    #[test]
    fn every_guarded_step_redirects_without_profile() {
        for route in [Route::Recording, Route::Review] {
            let mut wizard = Wizard::new();
            let nav = wizard.navigate(route, StepPayload::Empty);
            assert!(nav.redirected, "{route:?}");
            assert_eq!(wizard.route(), Route::Form);
        }
    }

    #[test]
    fn happy_path_carries_payload_forward() {
        let mut wizard = Wizard::new();

        let nav = wizard.complete_form(profile());
        assert_eq!((nav.to, nav.redirected), (Route::Recording, false));
        assert_eq!(wizard.payload().profile().unwrap().first_name, "Grace");

        let recorded = video();
        let nav = wizard.complete_recording(recorded.clone());
        assert_eq!(nav.from, Route::Recording);
        assert_eq!(nav.to, Route::Review);
        assert_eq!(wizard.payload().profile().unwrap().last_name, "Hopper");
        assert!(Arc::ptr_eq(wizard.payload().video().unwrap(), &recorded));
    }

    #[test]
    fn restart_discards_everything() {
        let mut wizard = Wizard::new();
        wizard.complete_form(profile());
        wizard.complete_recording(video());

        let nav = wizard.restart();
        assert_eq!(nav.to, Route::Form);
        assert!(!nav.redirected);
        assert!(matches!(wizard.payload(), StepPayload::Empty));

        // the old payload cannot be used to jump back in
        assert!(wizard.open_path("/review").redirected);
    }

    #[test]
    fn review_accepts_profile_without_video() {
        let mut wizard = Wizard::new();
        let nav = wizard.navigate(Route::Review, StepPayload::Profile(Arc::new(profile())));
        assert_eq!(nav.to, Route::Review);
        assert!(wizard.payload().video().is_none());
    }

    #[test]
    fn completing_recording_without_profile_redirects() {
        let mut wizard = Wizard::new();
        let nav = wizard.complete_recording(video());
        assert!(nav.redirected);
        assert_eq!(wizard.route(), Route::Form);
    }

    #[test]
    fn paths_resolve() {
        assert_eq!(Route::from_path("/"), Some(Route::Form));
        assert_eq!(Route::from_path(""), Some(Route::Form));
        assert_eq!(Route::from_path("/instructions"), Some(Route::Recording));
        assert_eq!(Route::from_path("/review/"), Some(Route::Review));
        assert_eq!(Route::from_path("/elsewhere"), None);

        let mut wizard = Wizard::new();
        let nav = wizard.open_path("/elsewhere");
        assert!(nav.redirected);
        assert_eq!(nav.to, Route::Form);
    }
}
