//! Line-oriented wizard driver.
//!
//! Renders each step of a [`WizardShell`] to a writer and feeds it answers
//! read from a reader. Every prompt shows the current value in brackets; an
//! empty answer keeps it. Three commands work at any prompt:
//!
//! - `:back` goes to the previous step
//! - `:quit` closes the wizard and discards progress
//! - `:hide` saves a draft and stops (end of input does the same)

use std::io::{BufRead, Write};
use std::path::Path;

use tracing::debug;

use crate::crop;
use crate::error::Result;
use crate::form::{Field, RawImage, Semester, SPHERE_OPTIONS};
use crate::sequencer::Step;
use crate::submission::SubmitOutcome;
use crate::wizard::{StepView, Visibility, WizardShell};

/// How a terminal session with the wizard ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The profile was submitted.
    Completed(SubmitOutcome),
    /// The member quit; nothing was saved.
    Closed,
    /// The member stepped away; a draft was saved.
    Suspended,
}

enum Reply {
    Text(String),
    Keep,
    Back,
    Quit,
    Hide,
}

enum Flow {
    Advance,
    Stay,
    Back,
    Quit,
    Hide,
    Done(SubmitOutcome),
}

impl Reply {
    /// The navigation a control reply asks for.
    fn control(self) -> Option<Flow> {
        match self {
            Self::Back => Some(Flow::Back),
            Self::Quit => Some(Flow::Quit),
            Self::Hide => Some(Flow::Hide),
            Self::Text(_) | Self::Keep => None,
        }
    }
}

/// Drives a wizard over a reader/writer pair.
#[derive(Debug)]
pub struct TerminalRunner<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalRunner<R, W> {
    /// Create a runner reading answers from `input` and writing to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the writer.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Run `shell` until it completes, is closed, or is suspended.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read or written, or the
    /// draft cannot be saved. Wizard errors are shown inline instead.
    pub async fn run(&mut self, shell: &mut WizardShell) -> Result<RunOutcome> {
        loop {
            let view = shell.view();
            self.render(&view)?;

            let flow = match view.step {
                Step::Welcome => self.welcome()?,
                Step::ProfilePicture => self.picture(shell).await?,
                Step::Review => self.review(shell).await?,
                step => self.fields(shell, step, view.email_locked)?,
            };

            match flow {
                Flow::Advance => {
                    if let Err(e) = shell.next() {
                        debug!(error = %e, "step refused");
                    }
                }
                Flow::Stay => {}
                Flow::Back => {
                    shell.back()?;
                }
                Flow::Quit => {
                    shell.close();
                    writeln!(self.output, "Closed without saving.")?;
                    return Ok(RunOutcome::Closed);
                }
                Flow::Hide => {
                    shell.on_visibility_change(Visibility::Hidden)?;
                    writeln!(self.output, "\nProgress saved. Run the command again to resume.")?;
                    return Ok(RunOutcome::Suspended);
                }
                Flow::Done(outcome) => {
                    writeln!(self.output, "Welcome to the directory, {}!", outcome.profile.record.name)?;
                    return Ok(RunOutcome::Completed(outcome));
                }
            }
        }
    }

    fn render(&mut self, view: &StepView) -> Result<()> {
        let optional = if view.optional { " (optional)" } else { "" };
        writeln!(
            self.output,
            "\n[{}/{}] {}{optional}",
            view.index, view.last, view.prompt
        )?;
        if let Some(error) = &view.error {
            writeln!(self.output, "  ! {error}")?;
        }
        Ok(())
    }

    fn ask(&mut self, label: &str, current: &str) -> Result<Reply> {
        if current.is_empty() {
            write!(self.output, "{label}: ")?;
        } else {
            write!(self.output, "{label} [{current}]: ")?;
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Reply::Hide);
        }
        Ok(match line.trim() {
            "" => Reply::Keep,
            ":back" => Reply::Back,
            ":quit" => Reply::Quit,
            ":hide" => Reply::Hide,
            text => Reply::Text(text.to_string()),
        })
    }

    /// Ask for one free-text field. Returns a flow only for control replies.
    fn field(&mut self, shell: &mut WizardShell, field: Field, label: &str) -> Result<Option<Flow>> {
        let current = shell.state().form.get(field).to_string();
        match self.ask(label, &current)? {
            Reply::Text(value) => {
                shell.set_field(field, value)?;
                Ok(None)
            }
            other => Ok(other.control()),
        }
    }

    fn welcome(&mut self) -> Result<Flow> {
        Ok(self.ask("Press enter to begin", "")?.control().unwrap_or(Flow::Advance))
    }

    fn fields(&mut self, shell: &mut WizardShell, step: Step, email_locked: bool) -> Result<Flow> {
        let single = match step {
            Step::Location => Some((Field::Location, "Location")),
            Step::GraduationYear => Some((Field::GraduationYear, "Graduation year")),
            Step::Linkedin => Some((Field::Linkedin, "LinkedIn handle")),
            Step::Major => Some((Field::Major, "Major")),
            Step::Bio => Some((Field::Bio, "Bio")),
            _ => None,
        };
        if let Some((field, label)) = single {
            return Ok(self.field(shell, field, label)?.unwrap_or(Flow::Advance));
        }

        let flow = match step {
            Step::Identity => self.identity(shell, email_locked)?,
            Step::Cohort => self.cohort(shell)?,
            Step::Professional => self.professional(shell)?,
            Step::Sphere => self.spheres(shell)?,
            _ => None,
        };
        Ok(flow.unwrap_or(Flow::Advance))
    }

    fn identity(&mut self, shell: &mut WizardShell, email_locked: bool) -> Result<Option<Flow>> {
        if let Some(flow) = self.field(shell, Field::Name, "Name")? {
            return Ok(Some(flow));
        }
        if email_locked {
            writeln!(self.output, "Email: {} (locked)", shell.state().form.email)?;
            return Ok(None);
        }
        self.field(shell, Field::Email, "Email")
    }

    fn cohort(&mut self, shell: &mut WizardShell) -> Result<Option<Flow>> {
        let current = shell
            .state()
            .form
            .cohort_semester
            .map(|s| s.to_string())
            .unwrap_or_default();
        match self.ask("Semester (Fall/Spring)", &current)? {
            Reply::Text(text) => match text.parse::<Semester>() {
                Ok(semester) => shell.set_semester(semester)?,
                Err(e) => {
                    writeln!(self.output, "  ! {e}")?;
                    return Ok(Some(Flow::Stay));
                }
            },
            Reply::Keep => {}
            other => return Ok(other.control()),
        }
        self.field(shell, Field::CohortYear, "Cohort year (two digits)")
    }

    fn professional(&mut self, shell: &mut WizardShell) -> Result<Option<Flow>> {
        let current = if shell.state().form.is_student { "y" } else { "n" };
        match self.ask("Current student? (y/n)", current)? {
            Reply::Text(text) => match text.to_ascii_lowercase().as_str() {
                "y" | "yes" => shell.set_student(true)?,
                "n" | "no" if shell.state().form.is_student => shell.set_student(false)?,
                "n" | "no" => {}
                _ => {
                    writeln!(self.output, "  ! Answer y or n")?;
                    return Ok(Some(Flow::Stay));
                }
            },
            Reply::Keep => {}
            other => return Ok(other.control()),
        }
        if shell.state().form.is_student {
            return Ok(None);
        }
        if let Some(flow) = self.field(shell, Field::Role, "Role")? {
            return Ok(Some(flow));
        }
        self.field(shell, Field::Company, "Company")
    }

    fn spheres(&mut self, shell: &mut WizardShell) -> Result<Option<Flow>> {
        for (i, option) in SPHERE_OPTIONS.iter().enumerate() {
            let mark = if shell.state().form.spheres.contains(*option) {
                "x"
            } else {
                " "
            };
            writeln!(self.output, "  {}. [{mark}] {option}", i + 1)?;
        }
        let current = shell
            .state()
            .form
            .spheres
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        match self.ask("Toggle (names or numbers, comma-separated)", &current)? {
            Reply::Text(text) => {
                for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    let sphere = item
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| SPHERE_OPTIONS.get(i).copied())
                        .unwrap_or(item);
                    shell.toggle_sphere(sphere)?;
                }
                // Show the new selection before moving on.
                Ok(Some(Flow::Stay))
            }
            Reply::Keep => Ok(None),
            other => Ok(other.control()),
        }
    }

    async fn picture(&mut self, shell: &mut WizardShell) -> Result<Flow> {
        if !shell.state().crop.open {
            let current = if shell.state().form.cropped_image.is_some() {
                "saved; 'edit' to re-crop"
            } else {
                ""
            };
            match self.ask("Image file", current)? {
                Reply::Keep => return Ok(Flow::Advance),
                Reply::Text(text) if text == "edit" => {
                    if let Err(e) = shell.edit_crop().await {
                        debug!(error = %e, "re-crop unavailable");
                        return Ok(Flow::Stay);
                    }
                }
                Reply::Text(path) => match read_image(Path::new(&path)).await {
                    Ok(raw) => {
                        if shell.select_image(raw).is_err() {
                            return Ok(Flow::Stay);
                        }
                    }
                    Err(e) => {
                        writeln!(self.output, "  ! {e}")?;
                        return Ok(Flow::Stay);
                    }
                },
                other => return Ok(other.control().unwrap_or(Flow::Stay)),
            }
        }

        let zoom = format!("{:.1}", shell.state().crop.zoom);
        match self.ask("Zoom (1.0-3.0, 'cancel' to discard)", &zoom)? {
            Reply::Text(text) if text == "cancel" => {
                shell.cancel_crop();
                return Ok(Flow::Stay);
            }
            Reply::Text(text) => match text.parse::<f32>() {
                Ok(zoom) => shell.set_zoom(zoom),
                Err(_) => {
                    writeln!(self.output, "  ! Enter a number")?;
                    return Ok(Flow::Stay);
                }
            },
            Reply::Keep => {}
            other => return Ok(other.control().unwrap_or(Flow::Stay)),
        }

        let crop_state = shell.state().crop;
        let offset = format!("{},{}", crop_state.offset_x, crop_state.offset_y);
        match self.ask("Offset x,y in pixels", &offset)? {
            Reply::Text(text) => {
                let parsed = text
                    .split_once(',')
                    .and_then(|(x, y)| Some((x.trim().parse().ok()?, y.trim().parse().ok()?)));
                match parsed {
                    Some((x, y)) => shell.set_crop_offset(x, y),
                    None => {
                        writeln!(self.output, "  ! Enter two numbers like 0,-20")?;
                        return Ok(Flow::Stay);
                    }
                }
            }
            Reply::Keep => {}
            other => return Ok(other.control().unwrap_or(Flow::Stay)),
        }

        writeln!(self.output, "Cropping...")?;
        if shell.save_crop().await.is_ok() {
            writeln!(self.output, "Picture saved.")?;
        }
        Ok(Flow::Stay)
    }

    async fn review(&mut self, shell: &mut WizardShell) -> Result<Flow> {
        self.summary(shell)?;
        match self.ask("Submit? (y/n)", "")? {
            Reply::Text(text) if matches!(text.to_ascii_lowercase().as_str(), "y" | "yes") => {
                writeln!(self.output, "Submitting...")?;
                match shell.submit().await {
                    Ok(outcome) => Ok(Flow::Done(outcome)),
                    Err(e) => {
                        debug!(error = %e, "submission failed");
                        Ok(Flow::Stay)
                    }
                }
            }
            Reply::Text(_) => Ok(Flow::Back),
            Reply::Keep => Ok(Flow::Stay),
            other => Ok(other.control().unwrap_or(Flow::Stay)),
        }
    }

    fn summary(&mut self, shell: &WizardShell) -> Result<()> {
        let form = &shell.state().form;
        let work = if form.is_student {
            "Current student".to_string()
        } else {
            format!("{} @ {}", form.role, form.company)
        };
        let spheres = form.spheres.iter().cloned().collect::<Vec<_>>().join(", ");
        let picture = if form.cropped_image.is_some() { "yes" } else { "no" };
        let rows = [
            ("Name", form.name.as_str()),
            ("Email", form.email.as_str()),
            ("Cohort", &form.cohort_label()),
            ("Work", &work),
            ("Spheres", &spheres),
            ("Location", form.location.as_str()),
            ("Graduated", form.graduation_year.as_str()),
            ("LinkedIn", form.linkedin.as_str()),
            ("Picture", picture),
            ("Major", form.major.as_str()),
            ("Bio", form.bio.as_str()),
        ];
        for (label, value) in rows {
            writeln!(self.output, "  {label:<10} {value}")?;
        }
        Ok(())
    }
}

/// Read an image file for the cropper.
async fn read_image(path: &Path) -> Result<RawImage> {
    let bytes = tokio::fs::read(path).await?;
    Ok(RawImage {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        mime_type: crop::mime_for_path(path).to_string(),
        bytes,
    })
}
