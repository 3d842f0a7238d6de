//! The onboarding and edit wizard.
//!
//! [`WizardShell`] owns one [`WizardState`] and wires the pieces together:
//! the sequencer gates navigation, the crop pipeline fills in the picture,
//! the draft store keeps the state across a hide, and the submission
//! coordinator writes the profile at the end. Hosts drive it with discrete
//! input events and hear back through [`WizardHost`].
//!
//! A shell is mounted by [`WizardShell::join`] or [`WizardShell::edit`] and
//! stays active until it completes or is closed. While active, hosts should
//! confirm before navigating away ([`WizardShell::guard_active`]).

pub mod state;

pub use state::{CropUiState, WizardState};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::crop::{self, CropPipeline};
use crate::draft::DraftStore;
use crate::error::{Error, Result};
use crate::form::{Field, FormFields, ImagePayload, RawImage, Semester};
use crate::ports::{AnalyticsSink, IdentityProvider, ObjectStore, ProfileStore};
use crate::profile::Profile;
use crate::sequencer::{self, Step, LAST_INDEX};
use crate::submission::{SubmissionCoordinator, SubmitOutcome};
use crate::validation;

/// How the wizard was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A new member joining the directory.
    Join,
    /// An existing member editing their profile.
    Edit,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join => write!(f, "join"),
            Self::Edit => write!(f, "edit"),
        }
    }
}

/// Whether the wizard is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Showing.
    Visible,
    /// Hidden (tab switched, terminal suspended).
    Hidden,
}

/// Receives the wizard's upward notifications.
pub trait WizardHost: Send + Sync {
    /// The profile was stored. The host should reload its listing.
    fn on_complete(&self, outcome: &SubmitOutcome);

    /// The member closed the wizard without submitting.
    fn on_close(&self);
}

/// Collaborators the wizard needs.
#[derive(Clone)]
pub struct Services {
    /// Identity and session provider.
    pub identity: Arc<dyn IdentityProvider>,
    /// Profile persistence.
    pub profiles: Arc<dyn ProfileStore>,
    /// Picture storage.
    pub objects: Arc<dyn ObjectStore>,
    /// Analytics sink.
    pub analytics: Arc<dyn AnalyticsSink>,
    /// Picture cropper.
    pub crop: CropPipeline,
    /// Resumable draft slot.
    pub drafts: DraftStore,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("crop", &self.crop)
            .field("drafts", &self.drafts)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// A submission coordinator over these collaborators.
    #[must_use]
    pub fn coordinator(&self) -> SubmissionCoordinator {
        SubmissionCoordinator::new(
            Arc::clone(&self.identity),
            Arc::clone(&self.profiles),
            Arc::clone(&self.objects),
            Arc::clone(&self.analytics),
        )
    }
}

/// What a host needs to render the current step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    /// The current step.
    pub step: Step,
    /// Question shown at the top.
    pub prompt: &'static str,
    /// Current position.
    pub index: usize,
    /// Last position.
    pub last: usize,
    /// Whether the step may be left empty.
    pub optional: bool,
    /// Inline error for this step.
    pub error: Option<String>,
    /// Whether "back" is offered.
    pub can_back: bool,
    /// Whether "next" is offered.
    pub can_next: bool,
    /// Whether "submit" is offered.
    pub can_submit: bool,
    /// Whether a submission is in flight.
    pub submitting: bool,
    /// Whether a crop is in flight.
    pub cropping: bool,
    /// Whether the cropper is showing.
    pub crop_open: bool,
    /// Whether the email field is read-only.
    pub email_locked: bool,
}

/// Clears a busy flag when dropped, including when the owning future is
/// cancelled mid-flight.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>, operation: &'static str) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy { operation })?;
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One mounted wizard.
pub struct WizardShell {
    mode: Mode,
    state: WizardState,
    services: Services,
    host: Arc<dyn WizardHost>,
    active: bool,
    cropping: Arc<AtomicBool>,
    submitting: Arc<AtomicBool>,
}

impl fmt::Debug for WizardShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardShell")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl WizardShell {
    /// Mount a fresh join wizard, resuming a saved draft if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft slot cannot be read.
    pub fn join(services: Services, host: Arc<dyn WizardHost>) -> Result<Self> {
        let draft = services.drafts.load()?;
        let restored = draft.is_some();
        let state = draft.unwrap_or_default();
        Ok(Self::mount(services, host, Mode::Join, state, restored))
    }

    /// Mount an edit wizard pre-populated from `existing`.
    ///
    /// A saved draft is resumed only if it belongs to the same email;
    /// anything else in the slot is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft slot cannot be read.
    pub fn edit(services: Services, host: Arc<dyn WizardHost>, existing: &Profile) -> Result<Self> {
        let draft = services
            .drafts
            .load()?
            .filter(|draft| draft.form.email == existing.record.email);
        let restored = draft.is_some();
        let mut state = draft.unwrap_or_else(|| WizardState {
            form: FormFields::from_profile(existing),
            ..WizardState::default()
        });
        // Editing skips the greeting.
        state.step_index = state.step_index.max(1);
        Ok(Self::mount(services, host, Mode::Edit, state, restored))
    }

    fn mount(
        services: Services,
        host: Arc<dyn WizardHost>,
        mode: Mode,
        state: WizardState,
        restored: bool,
    ) -> Self {
        info!(%mode, restored, step = %state.step(), "wizard opened");
        services
            .analytics
            .capture("wizard_opened", json!({ "mode": mode, "restored": restored }));
        Self {
            mode,
            state,
            services,
            host,
            active: true,
            cropping: Arc::new(AtomicBool::new(false)),
            submitting: Arc::new(AtomicBool::new(false)),
        }
    }

    /// How the wizard was entered.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// The current step.
    #[must_use]
    pub fn step(&self) -> Step {
        self.state.step()
    }

    /// Whether leaving should be confirmed. True from mount until completion
    /// or close.
    #[must_use]
    pub fn guard_active(&self) -> bool {
        self.active
    }

    /// Render the current step.
    #[must_use]
    pub fn view(&self) -> StepView {
        let step = self.state.step();
        StepView {
            step,
            prompt: step.prompt(),
            index: self.state.step_index,
            last: LAST_INDEX,
            optional: step.is_optional(),
            error: self.state.current_error().map(str::to_string),
            can_back: self.state.step_index > 0,
            can_next: !step.is_terminal(),
            can_submit: step.is_terminal(),
            submitting: self.submitting.load(Ordering::Acquire),
            cropping: self.cropping.load(Ordering::Acquire),
            crop_open: self.state.crop.open,
            email_locked: self.mode == Mode::Edit,
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.active {
            Ok(())
        } else {
            Err(Error::WizardClosed)
        }
    }

    /// Re-check the current step after an edit so a showing error tracks the
    /// input.
    fn refresh_inline_error(&mut self) {
        let step = self.state.step();
        if self.state.errors.contains_key(&step) {
            match validation::validate(step, &self.state.form).message {
                Some(message) => {
                    self.state.errors.insert(step, message);
                }
                None => {
                    self.state.errors.remove(&step);
                }
            }
        }
    }

    // === Field input ===

    /// Update a free-text field. Email edits are ignored in edit mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WizardClosed`] once the wizard is no longer active.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> Result<()> {
        self.ensure_active()?;
        if field == Field::Email && self.mode == Mode::Edit {
            debug!("email is locked while editing");
            return Ok(());
        }
        self.state.form.set(field, value);
        self.refresh_inline_error();
        Ok(())
    }

    /// Choose the cohort semester.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WizardClosed`] once the wizard is no longer active.
    pub fn set_semester(&mut self, semester: Semester) -> Result<()> {
        self.ensure_active()?;
        self.state.form.cohort_semester = Some(semester);
        self.refresh_inline_error();
        Ok(())
    }

    /// Set or clear the student flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WizardClosed`] once the wizard is no longer active.
    pub fn set_student(&mut self, is_student: bool) -> Result<()> {
        self.ensure_active()?;
        self.state.form.set_student(is_student);
        self.refresh_inline_error();
        Ok(())
    }

    /// Toggle one sphere. Returns whether it is now selected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WizardClosed`] once the wizard is no longer active.
    pub fn toggle_sphere(&mut self, sphere: &str) -> Result<bool> {
        self.ensure_active()?;
        let selected = self.state.form.toggle_sphere(sphere);
        self.refresh_inline_error();
        Ok(selected)
    }

    // === Picture ===

    /// Pick a picture and open the cropper on it.
    ///
    /// A file that fails screening never opens the cropper; the reason is
    /// shown on the picture step and the pending image is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the media error from screening, or [`Error::WizardClosed`].
    pub fn select_image(&mut self, raw: RawImage) -> Result<()> {
        self.ensure_active()?;
        if let Err(e) = crop::screen(&raw) {
            warn!(file = %raw.file_name, error = %e, "picture rejected");
            self.state.errors.insert(Step::ProfilePicture, e.to_string());
            return Err(e);
        }
        debug!(file = %raw.file_name, size = raw.bytes.len(), "picture selected");
        self.open_cropper(raw);
        Ok(())
    }

    fn open_cropper(&mut self, raw: RawImage) {
        self.state.errors.remove(&Step::ProfilePicture);
        self.state.form.raw_image = Some(raw);
        self.state.crop.reset();
        self.state.crop.open = true;
    }

    /// Move the crop window. Ignored while the cropper is closed.
    pub fn set_crop_offset(&mut self, offset_x: f32, offset_y: f32) {
        if self.state.crop.open {
            self.state.crop.offset_x = offset_x;
            self.state.crop.offset_y = offset_y;
        }
    }

    /// Set the zoom, clamped to the pipeline's bounds. Ignored while the
    /// cropper is closed.
    pub fn set_zoom(&mut self, zoom: f32) {
        if self.state.crop.open {
            self.state.crop.zoom = self.services.crop.settings().clamp_zoom(zoom);
        }
    }

    /// Crop the pending picture and keep the result.
    ///
    /// On success the cropper closes and the pending image is released. On
    /// failure the cropper stays open with the error shown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if a crop is already running, a validation
    /// error if nothing is pending, or the pipeline's media error.
    pub async fn save_crop(&mut self) -> Result<()> {
        self.ensure_active()?;
        let _busy = BusyGuard::acquire(&self.cropping, "crop")?;

        let raw = match (&self.state.form.raw_image, self.state.crop.open) {
            (Some(raw), true) => raw.clone(),
            _ => {
                return Err(Error::validation(
                    Step::ProfilePicture.key(),
                    "Select an image first",
                ))
            }
        };

        match self
            .services
            .crop
            .crop_in_background(raw, self.state.crop.view())
            .await
        {
            Ok(uri) => {
                self.state.form.cropped_image = Some(ImagePayload::DataUri(uri));
                self.state.form.raw_image = None;
                self.state.crop.reset();
                self.state.errors.remove(&Step::ProfilePicture);
                debug!("crop saved");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "crop failed");
                self.state.errors.insert(Step::ProfilePicture, e.to_string());
                Err(e)
            }
        }
    }

    /// Close the cropper and drop the pending picture. A previously saved
    /// crop is kept.
    pub fn cancel_crop(&mut self) {
        self.state.form.raw_image = None;
        self.state.crop.reset();
    }

    /// Reopen the cropper on the saved picture.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImagePreparation`] if there is no saved picture or it
    /// cannot be turned back into a crop source.
    pub async fn edit_crop(&mut self) -> Result<()> {
        self.ensure_active()?;
        let _busy = BusyGuard::acquire(&self.cropping, "crop")?;

        let prepared = match self.state.form.cropped_image.clone() {
            Some(ImagePayload::DataUri(uri)) => crop::raw_from_data_uri(&uri),
            Some(ImagePayload::Hosted(url)) => match self.services.objects.fetch(&url).await {
                Ok(bytes) => Ok(RawImage {
                    file_name: "profile.jpg".to_string(),
                    mime_type: crop::OUTPUT_MIME.to_string(),
                    bytes,
                }),
                Err(e) => {
                    warn!(%url, error = %e, "could not fetch saved picture");
                    Err(Error::ImagePreparation)
                }
            },
            None => Err(Error::ImagePreparation),
        }
        .and_then(|raw| {
            crop::screen(&raw).map_err(|_| Error::ImagePreparation)?;
            Ok(raw)
        });

        match prepared {
            Ok(raw) => {
                self.open_cropper(raw);
                Ok(())
            }
            Err(e) => {
                self.state.errors.insert(Step::ProfilePicture, e.to_string());
                Err(e)
            }
        }
    }

    // === Navigation ===

    /// Advance one step if the current one validates.
    ///
    /// # Errors
    ///
    /// Returns the validation error for the current step, or
    /// [`Error::WizardClosed`].
    pub fn next(&mut self) -> Result<Step> {
        self.ensure_active()?;
        sequencer::next(&mut self.state)
    }

    /// Go back one step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WizardClosed`] once the wizard is no longer active.
    pub fn back(&mut self) -> Result<Step> {
        self.ensure_active()?;
        Ok(sequencer::back(&mut self.state))
    }

    /// Submit from the review step.
    ///
    /// On failure the state is left as-is with the message on the review
    /// step, ready for another attempt. On success the draft is discarded,
    /// the host is told, and the wizard becomes inactive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAtReview`] before review, [`Error::Busy`] while a
    /// submission is in flight, a validation error if any gated step no
    /// longer passes, or the coordinator's error.
    pub async fn submit(&mut self) -> Result<SubmitOutcome> {
        self.ensure_active()?;
        if !self.state.step().is_terminal() {
            return Err(Error::NotAtReview);
        }
        let _busy = BusyGuard::acquire(&self.submitting, "submission")?;

        if let Some((step, message)) = validation::first_failure(&self.state.form) {
            self.state.errors.insert(Step::Review, message.clone());
            return Err(Error::validation(step.key(), message));
        }

        match self.services.coordinator().submit(&self.state.form).await {
            Ok(outcome) => {
                self.state.errors.clear();
                self.active = false;
                if let Err(e) = self.services.drafts.discard() {
                    warn!(error = %e, "could not discard draft after submit");
                }
                self.host.on_complete(&outcome);
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "submission failed");
                self.state.errors.insert(Step::Review, e.to_string());
                Err(e)
            }
        }
    }

    /// Close without submitting. The draft is discarded, not saved.
    pub fn close(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Err(e) = self.services.drafts.discard() {
            warn!(error = %e, "could not discard draft on close");
        }
        let step = self.state.step();
        info!(%step, "wizard closed");
        self.services
            .analytics
            .capture("wizard_closed", json!({ "step": step.key() }));
        self.host.on_close();
    }

    /// React to the wizard being shown or hidden.
    ///
    /// Hiding an active wizard writes its whole state to the draft slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft cannot be written.
    pub fn on_visibility_change(&mut self, visibility: Visibility) -> Result<()> {
        if visibility == Visibility::Hidden && self.active {
            self.services.drafts.save(&self.state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::{data_uri, sample_png, CropSettings};
    use crate::session::MemorySlotStore;
    use crate::submission::SubmitAction;
    use crate::testing::{FakeIdentity, FakeObjectStore, FakeProfileStore, RecordingAnalytics};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingHost {
        completed: AtomicUsize,
        closed: AtomicUsize,
    }

    impl WizardHost for RecordingHost {
        fn on_complete(&self, _outcome: &SubmitOutcome) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        services: Services,
        profiles: Arc<FakeProfileStore>,
        objects: Arc<FakeObjectStore>,
        analytics: Arc<RecordingAnalytics>,
        host: Arc<RecordingHost>,
    }

    impl Harness {
        fn new(identity: Arc<FakeIdentity>, profiles: Arc<FakeProfileStore>) -> Self {
            let objects = Arc::new(FakeObjectStore::default());
            let analytics = Arc::new(RecordingAnalytics::default());
            let services = Services {
                identity,
                profiles: profiles.clone(),
                objects: objects.clone(),
                analytics: analytics.clone(),
                crop: CropPipeline::new(CropSettings {
                    target_size: 32,
                    ..CropSettings::default()
                }),
                drafts: DraftStore::new(Arc::new(MemorySlotStore::new())),
            };
            Self {
                services,
                profiles,
                objects,
                analytics,
                host: Arc::new(RecordingHost::default()),
            }
        }

        fn signed_in() -> Self {
            Self::new(FakeIdentity::signed_in(), Arc::default())
        }

        fn join(&self) -> WizardShell {
            WizardShell::join(self.services.clone(), self.host.clone()).unwrap()
        }
    }

    fn fill_and_walk(shell: &mut WizardShell) {
        shell.next().unwrap();
        shell.set_field(Field::Name, "Jane Doe").unwrap();
        shell.set_field(Field::Email, "jane@x.edu").unwrap();
        shell.next().unwrap();
        shell.set_semester(Semester::Fall).unwrap();
        shell.set_field(Field::CohortYear, "24").unwrap();
        shell.next().unwrap();
        shell.set_student(true).unwrap();
        shell.next().unwrap();
        shell.toggle_sphere("Tech").unwrap();
        shell.next().unwrap();
        shell.set_field(Field::Location, "Durham, NC").unwrap();
        shell.next().unwrap();
        shell.set_field(Field::GraduationYear, "2025").unwrap();
        while !shell.step().is_terminal() {
            shell.next().unwrap();
        }
    }

    #[test]
    fn test_join_starts_at_welcome() {
        let h = Harness::signed_in();
        let shell = h.join();

        let view = shell.view();
        assert_eq!(view.step, Step::Welcome);
        assert!(!view.can_back);
        assert!(view.can_next);
        assert!(!view.email_locked);
        assert!(shell.guard_active());
        assert_eq!(h.analytics.names(), vec!["wizard_opened".to_string()]);
    }

    #[test]
    fn test_edit_starts_past_welcome_with_email_locked() {
        let mut seed = Harness::signed_in().join();
        fill_and_walk(&mut seed);
        let existing = crate::submission::assemble_record(&seed.state().form, None).unwrap();
        let profiles = FakeProfileStore::with_existing(existing);
        let profile = profiles.rows.lock().unwrap()[0].clone();
        let h = Harness::new(FakeIdentity::signed_in(), profiles);

        let mut shell = WizardShell::edit(h.services.clone(), h.host.clone(), &profile).unwrap();
        assert_eq!(shell.step(), Step::Identity);
        assert!(shell.view().email_locked);

        shell.set_field(Field::Email, "other@x.edu").unwrap();
        assert_eq!(shell.state().form.email, "jane@x.edu");
        assert_eq!(shell.state().form.cohort_label(), "Fall '24");
    }

    #[test]
    fn test_invalid_next_shows_inline_error_then_clears() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        shell.next().unwrap();

        assert!(shell.next().unwrap_err().is_validation());
        assert_eq!(shell.view().error.as_deref(), Some("Name is required"));

        shell.set_field(Field::Name, "Jane").unwrap();
        assert_eq!(shell.view().error.as_deref(), Some("Enter a valid email"));

        shell.set_field(Field::Email, "jane@x.edu").unwrap();
        assert_eq!(shell.view().error, None);
    }

    #[tokio::test]
    async fn test_full_join_submits_and_tears_down() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        fill_and_walk(&mut shell);
        assert!(shell.view().can_submit);

        let outcome = shell.submit().await.unwrap();

        assert_eq!(outcome.action, SubmitAction::Inserted);
        assert_eq!(outcome.profile.record.role, "Student");
        assert!(!shell.guard_active());
        assert_eq!(h.host.completed.load(Ordering::SeqCst), 1);
        assert!(matches!(shell.next(), Err(Error::WizardClosed)));
        assert!(h.services.drafts.peek().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_submit_before_review_is_refused() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        assert!(matches!(shell.submit().await, Err(Error::NotAtReview)));
        assert_eq!(h.profiles.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_state_for_retry() {
        let h = Harness::new(FakeIdentity::signed_out(), Arc::default());
        let mut shell = h.join();
        fill_and_walk(&mut shell);
        let before = shell.state().form.clone();

        let err = shell.submit().await.unwrap_err();
        assert!(err.is_unauthenticated());
        assert_eq!(shell.state().form, before);
        assert_eq!(shell.step(), Step::Review);
        assert!(shell.view().error.unwrap().contains("logging in"));
        assert!(shell.guard_active());
        assert!(!shell.view().submitting);
        assert_eq!(h.host.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_guards_against_tampered_form() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        fill_and_walk(&mut shell);
        shell.state.form.spheres.clear();

        let err = shell.submit().await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(h.profiles.calls(), 0);
    }

    #[test]
    fn test_busy_flag_rejects_second_operation() {
        let flag = Arc::new(AtomicBool::new(false));
        let first = BusyGuard::acquire(&flag, "submission").unwrap();
        assert!(matches!(
            BusyGuard::acquire(&flag, "submission"),
            Err(Error::Busy { .. })
        ));
        drop(first);
        assert!(BusyGuard::acquire(&flag, "submission").is_ok());
    }

    #[tokio::test]
    async fn test_crop_flow_saves_data_uri() {
        let h = Harness::signed_in();
        let mut shell = h.join();

        shell.select_image(sample_png(80, 60)).unwrap();
        assert!(shell.view().crop_open);
        shell.set_zoom(9.0);
        assert!((shell.state().crop.zoom - 3.0).abs() < f32::EPSILON);
        shell.set_crop_offset(5.0, -5.0);

        shell.save_crop().await.unwrap();

        let form = &shell.state().form;
        assert!(form.raw_image.is_none());
        assert!(!shell.view().crop_open);
        let payload = form.cropped_image.as_ref().unwrap();
        assert!(payload.needs_upload());
        let (_, bytes) = data_uri::decode(payload.as_str()).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (32, 32));
    }

    #[test]
    fn test_heic_never_opens_cropper() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        let heic = RawImage {
            file_name: "IMG_1234.HEIC".to_string(),
            mime_type: "image/heic".to_string(),
            bytes: vec![0; 16],
        };

        let err = shell.select_image(heic).unwrap_err();

        assert!(err.is_media());
        assert!(shell.state().form.raw_image.is_none());
        assert!(!shell.state().crop.open);
        assert!(shell.state().errors[&Step::ProfilePicture].contains("not supported"));
    }

    #[tokio::test]
    async fn test_cancel_keeps_previous_crop() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        shell.select_image(sample_png(40, 40)).unwrap();
        shell.save_crop().await.unwrap();
        let saved = shell.state().form.cropped_image.clone();

        shell.select_image(sample_png(50, 50)).unwrap();
        shell.cancel_crop();

        assert_eq!(shell.state().form.cropped_image, saved);
        assert!(shell.state().form.raw_image.is_none());
    }

    #[tokio::test]
    async fn test_edit_crop_reopens_saved_data_uri() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        shell.select_image(sample_png(40, 40)).unwrap();
        shell.save_crop().await.unwrap();

        shell.edit_crop().await.unwrap();
        assert!(shell.view().crop_open);
        assert!(shell.state().form.raw_image.is_some());
    }

    #[tokio::test]
    async fn test_edit_crop_fetches_hosted_picture() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        shell.select_image(sample_png(40, 40)).unwrap();
        shell.save_crop().await.unwrap();
        let uri = shell.state().form.cropped_image.clone().unwrap();
        let (_, bytes) = data_uri::decode(uri.as_str()).unwrap();
        h.objects
            .objects
            .lock()
            .unwrap()
            .push(("https://cdn.test/me.jpg".to_string(), bytes));
        shell.state.form.cropped_image =
            Some(ImagePayload::Hosted("https://cdn.test/me.jpg".to_string()));

        shell.edit_crop().await.unwrap();
        assert!(shell.view().crop_open);
        assert_eq!(h.objects.fetched.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_crop_failure_message() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        shell.state.form.cropped_image =
            Some(ImagePayload::Hosted("https://cdn.test/missing.jpg".to_string()));

        let err = shell.edit_crop().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to prepare image for editing");
        assert!(!shell.view().crop_open);
    }

    #[test]
    fn test_hide_saves_and_remount_restores_once() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        shell.next().unwrap();
        shell.set_field(Field::Name, "Jane Doe").unwrap();
        shell.on_visibility_change(Visibility::Hidden).unwrap();
        drop(shell);

        let resumed = h.join();
        assert_eq!(resumed.step(), Step::Identity);
        assert_eq!(resumed.state().form.name, "Jane Doe");

        let fresh = h.join();
        assert_eq!(fresh.step(), Step::Welcome);

        let events = h.analytics.events.lock().unwrap().clone();
        assert_eq!(events[1].1["restored"], true);
        assert_eq!(events[2].1["restored"], false);
    }

    #[test]
    fn test_close_discards_without_saving() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        shell.next().unwrap();
        shell.on_visibility_change(Visibility::Hidden).unwrap();

        shell.close();
        shell.close();

        assert!(!shell.guard_active());
        assert_eq!(h.host.closed.load(Ordering::SeqCst), 1);
        assert!(h.services.drafts.peek().unwrap().is_none());
        assert!(h.analytics.names().contains(&"wizard_closed".to_string()));

        shell.on_visibility_change(Visibility::Hidden).unwrap();
        assert!(h.services.drafts.peek().unwrap().is_none());
    }

    #[test]
    fn test_visible_does_not_touch_draft() {
        let h = Harness::signed_in();
        let mut shell = h.join();
        shell.on_visibility_change(Visibility::Visible).unwrap();
        assert!(h.services.drafts.peek().unwrap().is_none());
    }
}
