use std::collections::BTreeMap;

use super::profile::{CandidateProfile, Position, ResumeFile};

/// Fields of the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    FirstName,
    LastName,
    Position,
    CurrentPosition,
    Experience,
    Resume,
}

impl FormField {
    pub const ALL: [FormField; 6] = [
        FormField::FirstName,
        FormField::LastName,
        FormField::Position,
        FormField::CurrentPosition,
        FormField::Experience,
        FormField::Resume,
    ];

    /// Human-readable label, also used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            FormField::FirstName => "First Name",
            FormField::LastName => "Last Name",
            FormField::Position => "Position Applied For",
            FormField::CurrentPosition => "Current Position",
            FormField::Experience => "Experience (Years)",
            FormField::Resume => "Resume",
        }
    }
}

/// A new value for exactly one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    FirstName(String),
    LastName(String),
    Position(Option<Position>),
    CurrentPosition(String),
    Experience(String),
    Resume(Option<ResumeFile>),
}

impl FieldUpdate {
    pub fn field(&self) -> FormField {
        match self {
            FieldUpdate::FirstName(_) => FormField::FirstName,
            FieldUpdate::LastName(_) => FormField::LastName,
            FieldUpdate::Position(_) => FormField::Position,
            FieldUpdate::CurrentPosition(_) => FormField::CurrentPosition,
            FieldUpdate::Experience(_) => FormField::Experience,
            FieldUpdate::Resume(_) => FormField::Resume,
        }
    }
}

/// Failing fields mapped to their message. Every failing field is present.
pub type ValidationErrors = BTreeMap<FormField, String>;

/// Values and errors of the intake form while it is being edited.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    first_name: String,
    last_name: String,
    position: Option<Position>,
    current_position: String,
    experience: String,
    resume: Option<ResumeFile>,
    errors: ValidationErrors,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value of one field. Does not validate and does not
    /// touch errors from the last submit.
    pub fn update_field(&mut self, update: FieldUpdate) {
        log::debug!("{} changed", update.field().label());
        match update {
            FieldUpdate::FirstName(v) => self.first_name = v,
            FieldUpdate::LastName(v) => self.last_name = v,
            FieldUpdate::Position(v) => self.position = v,
            FieldUpdate::CurrentPosition(v) => self.current_position = v,
            FieldUpdate::Experience(v) => self.experience = v,
            FieldUpdate::Resume(v) => self.resume = v,
        }
    }

    pub fn resume(&self) -> Option<&ResumeFile> {
        self.resume.as_ref()
    }

    /// Errors from the last submit.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Validate every field and build the profile. The errors are kept
    /// for display whether or not the submit succeeds.
    pub fn submit(&mut self) -> Result<CandidateProfile, ValidationErrors> {
        let result = self.build();
        self.errors = match &result {
            Ok(_) => ValidationErrors::new(),
            Err(errors) => errors.clone(),
        };
        match &result {
            Ok(profile) => log::info!(
                "Form submitted for {} ({})",
                profile.full_name(),
                profile.position
            ),
            Err(errors) => log::info!(
                "Form validation failed on {:?}",
                errors.keys().collect::<Vec<_>>()
            ),
        }
        result
    }

    fn build(&self) -> Result<CandidateProfile, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let first_name = required(&self.first_name, FormField::FirstName, &mut errors);
        let last_name = required(&self.last_name, FormField::LastName, &mut errors);
        let current_position =
            required(&self.current_position, FormField::CurrentPosition, &mut errors);
        let experience = numeric(&self.experience, FormField::Experience, &mut errors);

        if self.position.is_none() {
            errors.insert(FormField::Position, required_message(FormField::Position));
        }

        let resume = match &self.resume {
            None => {
                errors.insert(FormField::Resume, "Resume file is required".to_string());
                None
            }
            Some(file) => match file.problem() {
                Some(message) => {
                    errors.insert(FormField::Resume, message.to_string());
                    None
                }
                None => Some(file.clone()),
            },
        };

        match (first_name, last_name, self.position, current_position, experience, resume) {
            (
                Some(first_name),
                Some(last_name),
                Some(position),
                Some(current_position),
                Some(experience),
                Some(resume),
            ) => Ok(CandidateProfile {
                first_name,
                last_name,
                position,
                current_position,
                experience,
                resume,
            }),
            _ => Err(errors),
        }
    }
}

fn required(value: &str, field: FormField, errors: &mut ValidationErrors) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert(field, required_message(field));
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A number input holds no value unless its text parses as a number.
fn numeric(value: &str, field: FormField, errors: &mut ValidationErrors) -> Option<String> {
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(trimmed.to_string()),
        _ => {
            errors.insert(field, required_message(field));
            None
        }
    }
}

fn required_message(field: FormField) -> String {
    format!("{} is required", field.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::profile::{RESUME_MAX_BYTES, RESUME_MEDIA_TYPE};

    const MB: usize = 1024 * 1024;

    fn pdf(size: usize) -> ResumeFile {
        ResumeFile::new("resume.pdf", RESUME_MEDIA_TYPE, vec![b'%'; size])
    }

    fn filled() -> FormState {
        let mut form = FormState::new();
        form.update_field(FieldUpdate::FirstName("Ada".into()));
        form.update_field(FieldUpdate::LastName("Lovelace".into()));
        form.update_field(FieldUpdate::Position(Some(Position::BackendDeveloper)));
        form.update_field(FieldUpdate::CurrentPosition("Analyst".into()));
        form.update_field(FieldUpdate::Experience("7".into()));
        form.update_field(FieldUpdate::Resume(Some(pdf(2 * MB))));
        form
    }

    #[test]
    fn valid_form_produces_profile() {
        let mut form = filled();
        let profile = form.submit().expect("valid form");

        assert_eq!(profile.full_name(), "Ada Lovelace");
        assert_eq!(profile.position, Position::BackendDeveloper);
        assert_eq!(profile.experience, "7");
        assert_eq!(profile.resume.size(), 2 * MB as u64);
        assert!(form.errors().is_empty());
    }

    #[test]
    fn oversized_pdf_is_the_only_error() {
        let mut form = filled();
        form.update_field(FieldUpdate::Resume(Some(pdf(6 * MB))));

        let errors = form.submit().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get(&FormField::Resume).map(String::as_str),
            Some("File size must be less than or equal to 5 MB")
        );
    }

    #[test]
    fn text_fields_fail_exactly_when_empty() {
        let fields = [
            FormField::FirstName,
            FormField::LastName,
            FormField::Position,
            FormField::CurrentPosition,
            FormField::Experience,
        ];

        for mask in 0u32..(1 << fields.len()) {
            let mut form = filled();
            for (bit, field) in fields.iter().enumerate() {
                if mask & (1 << bit) == 0 {
                    continue;
                }
                form.update_field(match field {
                    FormField::FirstName => FieldUpdate::FirstName(String::new()),
                    FormField::LastName => FieldUpdate::LastName("   ".into()),
                    FormField::Position => FieldUpdate::Position(None),
                    FormField::CurrentPosition => FieldUpdate::CurrentPosition(String::new()),
                    FormField::Experience => FieldUpdate::Experience(String::new()),
                    FormField::Resume => unreachable!(),
                });
            }

            let errors = match form.submit() {
                Ok(_) => ValidationErrors::new(),
                Err(errors) => errors,
            };
            for (bit, field) in fields.iter().enumerate() {
                let emptied = mask & (1 << bit) != 0;
                assert_eq!(
                    errors.contains_key(field),
                    emptied,
                    "mask {mask:#07b}, field {field:?}"
                );
            }
            assert!(!errors.contains_key(&FormField::Resume));
        }
    }

    #[test]
    fn non_numeric_experience_counts_as_empty() {
        for text in ["about ten", "7 years", "NaN", "inf"] {
            let mut form = filled();
            form.update_field(FieldUpdate::Experience(text.into()));
            let errors = form.submit().unwrap_err();
            assert_eq!(errors.len(), 1, "{text}");
            assert_eq!(errors[&FormField::Experience], "Experience (Years) is required");
        }
    }

    #[test]
    fn numeric_experience_is_kept_as_entered() {
        for text in ["0", " 2.5 ", "-1", "12"] {
            let mut form = filled();
            form.update_field(FieldUpdate::Experience(text.into()));
            let profile = form.submit().expect("numeric experience");
            assert_eq!(profile.experience, text.trim());
        }
    }

    #[test]
    fn unread_oversized_resume_is_rejected() {
        let mut form = filled();
        form.update_field(FieldUpdate::Resume(Some(ResumeFile::declared(
            "scan.pdf",
            RESUME_MEDIA_TYPE,
            RESUME_MAX_BYTES + 1,
        ))));
        assert_eq!(
            form.submit().unwrap_err()[&FormField::Resume],
            "File size must be less than or equal to 5 MB"
        );
    }

    #[test]
    fn resume_reports_one_problem() {
        let mut form = filled();
        form.update_field(FieldUpdate::Resume(None));
        assert_eq!(form.submit().unwrap_err()[&FormField::Resume], "Resume file is required");

        form.update_field(FieldUpdate::Resume(Some(ResumeFile::new(
            "resume.png",
            "image/png",
            vec![0u8; 10 * MB],
        ))));
        assert_eq!(form.submit().unwrap_err()[&FormField::Resume], "Only PDF files are allowed");

        form.update_field(FieldUpdate::Resume(Some(pdf(RESUME_MAX_BYTES as usize))));
        assert!(form.submit().is_ok());
    }

    #[test]
    fn every_failing_field_is_reported() {
        let mut form = FormState::new();
        let errors = form.submit().unwrap_err();

        assert_eq!(errors.len(), FormField::ALL.len());
        assert_eq!(errors[&FormField::FirstName], "First Name is required");
        assert_eq!(errors[&FormField::Position], "Position Applied For is required");
        assert_eq!(errors[&FormField::Experience], "Experience (Years) is required");
        assert_eq!(
            form.errors().get(&FormField::LastName).map(String::as_str),
            Some("Last Name is required")
        );
    }

    #[test]
    fn repeated_update_changes_nothing() {
        let mut form = filled();
        form.update_field(FieldUpdate::FirstName(String::new()));
        let _ = form.submit();
        let errors_before = form.errors().clone();

        form.update_field(FieldUpdate::CurrentPosition("Analyst".into()));
        form.update_field(FieldUpdate::CurrentPosition("Analyst".into()));

        assert_eq!(form.errors(), &errors_before);
        let errors_after = form.submit().unwrap_err();
        assert_eq!(errors_after, errors_before);
    }

    #[test]
    fn profile_values_are_trimmed() {
        let mut form = filled();
        form.update_field(FieldUpdate::FirstName("  Ada ".into()));
        let profile = form.submit().unwrap();
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.resume_download_name(), "Ada_Lovelace_Resume.pdf");
    }
}
