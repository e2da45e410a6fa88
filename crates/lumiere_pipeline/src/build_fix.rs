//! Render/repair cycle for one section's code.
//!
//! [`BuildFixMachine`] holds the budgets and decides the next step; the
//! driver below performs the side effects the step asks for and feeds the
//! result back as a [`BuildEvent`].

use crate::context::{SectionServices, SectionTask};
use crate::generation::{generate_structured, parse_code, retry_policy};
use crate::prompts::{code_prompt, fix_prompt, regenerate_note};
use crate::source::{deterministic_repair, discover_entry_point, inject_base_class};
use lumiere_core::{CodeArtifact, GenerateRequest, RenderJob, RunConfig, SectionState, VideoArtifact};
use tracing::{debug, info, instrument, warn};

/// How many code versions and repairs a build-fix run may spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildBudget {
    /// Code versions allowed, the starting version included
    pub generations: u32,
    /// Diagnostic-guided repairs allowed per code version
    pub repairs: u32,
}

impl BuildBudget {
    /// Budget for a section's first build.
    pub fn initial(config: &RunConfig) -> Self {
        Self {
            generations: *config.max_regenerate_tries(),
            repairs: *config.max_fix_bug_tries(),
        }
    }

    /// Budget for re-building a revised version: the revision itself plus repairs.
    pub fn revision(config: &RunConfig) -> Self {
        Self {
            generations: 1,
            repairs: *config.max_mllm_fix_bugs_tries(),
        }
    }
}

/// What the driver should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Render the current code
    Render,
    /// Repair the current code using the last diagnostic
    Repair,
    /// Produce a fresh code version
    Regenerate,
    /// The current code rendered
    Done,
    /// Every budget is spent
    Exhausted,
}

/// Result of performing a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEvent {
    /// A repair or regeneration produced code
    CodeReady,
    /// A repair or regeneration produced nothing usable
    CodeUnavailable,
    /// The render succeeded
    RenderSucceeded,
    /// The render failed
    RenderFailed,
}

/// Budget bookkeeping for one build-fix run.
///
/// # Examples
///
/// ```
/// use lumiere_pipeline::{BuildBudget, BuildEvent, BuildFixMachine, BuildStep};
///
/// let mut machine = BuildFixMachine::new(BuildBudget { generations: 1, repairs: 1 }, true);
/// assert_eq!(machine.step(), BuildStep::Render);
/// assert_eq!(machine.advance(BuildEvent::RenderFailed), BuildStep::Repair);
/// assert_eq!(machine.advance(BuildEvent::CodeReady), BuildStep::Render);
/// assert_eq!(machine.advance(BuildEvent::RenderFailed), BuildStep::Exhausted);
/// ```
#[derive(Debug, Clone)]
pub struct BuildFixMachine {
    budget: BuildBudget,
    generations_used: u32,
    repairs_used: u32,
    step: BuildStep,
}

impl BuildFixMachine {
    /// Start a run, with or without existing code.
    pub fn new(budget: BuildBudget, has_code: bool) -> Self {
        let mut machine = Self {
            budget,
            generations_used: 0,
            repairs_used: 0,
            step: BuildStep::Exhausted,
        };
        machine.step = if has_code {
            machine.generations_used = 1;
            BuildStep::Render
        } else {
            machine.next_generation()
        };
        machine
    }

    /// Current step.
    pub fn step(&self) -> BuildStep {
        self.step
    }

    /// Code versions consumed so far.
    pub fn generations_used(&self) -> u32 {
        self.generations_used
    }

    /// Repairs consumed on the current code version.
    pub fn repairs_used(&self) -> u32 {
        self.repairs_used
    }

    /// Feed back the result of the current step.
    ///
    /// Events that do not apply to the current step leave it unchanged.
    pub fn advance(&mut self, event: BuildEvent) -> BuildStep {
        self.step = match (self.step, event) {
            (BuildStep::Render, BuildEvent::RenderSucceeded) => BuildStep::Done,
            (BuildStep::Render, BuildEvent::RenderFailed) => self.after_failure(),
            (BuildStep::Repair, BuildEvent::CodeReady) => BuildStep::Render,
            (BuildStep::Repair, BuildEvent::CodeUnavailable) => self.after_failure(),
            (BuildStep::Regenerate, BuildEvent::CodeReady) => BuildStep::Render,
            (BuildStep::Regenerate, BuildEvent::CodeUnavailable) => self.next_generation(),
            (step, _) => step,
        };
        self.step
    }

    fn after_failure(&mut self) -> BuildStep {
        if self.repairs_used < self.budget.repairs {
            self.repairs_used += 1;
            BuildStep::Repair
        } else {
            self.next_generation()
        }
    }

    fn next_generation(&mut self) -> BuildStep {
        if self.generations_used < self.budget.generations {
            self.generations_used += 1;
            self.repairs_used = 0;
            BuildStep::Regenerate
        } else {
            BuildStep::Exhausted
        }
    }
}

/// How a build-fix run ended.
#[derive(Debug, Clone)]
pub(crate) enum BuildOutcome {
    /// The code rendered; both artifacts belong together
    Rendered {
        code: CodeArtifact,
        video: VideoArtifact,
        renders: u32,
    },
    /// Nothing rendered within the budget
    Exhausted { renders: u32 },
}

/// Drive [`BuildFixMachine`] for one section until it finishes.
///
/// Nothing is persisted here; the caller commits a rendered pair.
#[instrument(
    skip_all,
    fields(topic = %task.topic(), section = task.section_id(), generations = budget.generations, repairs = budget.repairs)
)]
pub(crate) async fn build_fix(
    services: &SectionServices,
    task: &SectionTask,
    code: Option<CodeArtifact>,
    budget: BuildBudget,
) -> BuildOutcome {
    let section = task.section();
    let max_tokens = *task.config().max_code_tokens();
    let mut machine = BuildFixMachine::new(budget, code.is_some());
    let mut current = code;
    let mut rendered: Option<VideoArtifact> = None;
    let mut diagnostic: Option<String> = None;
    let mut renders = 0u32;

    loop {
        match machine.step() {
            BuildStep::Render => {
                let Some(code) = current.as_ref() else {
                    machine.advance(BuildEvent::RenderFailed);
                    continue;
                };
                renders += 1;
                let job = RenderJob {
                    section_id: section.id.clone(),
                    source: code.source().to_string(),
                    entry_point: discover_entry_point(code.source(), section),
                };
                debug!(state = %SectionState::Rendering, scene = %job.entry_point, renders, "Rendering");
                match services.renderer().render(&job).await {
                    Ok(bytes) => {
                        rendered = Some(VideoArtifact::rendered_from(code, bytes));
                        machine.advance(BuildEvent::RenderSucceeded);
                    }
                    Err(e) => {
                        warn!(state = %SectionState::RenderFailed, error = %e.kind, "Render failed");
                        diagnostic = Some(e.kind.diagnostic());
                        machine.advance(BuildEvent::RenderFailed);
                    }
                }
            }
            BuildStep::Repair => {
                let diag = diagnostic.as_deref().unwrap_or_default();
                let repaired = match current.as_ref() {
                    Some(code) => repair(services, task.config(), code, diag, max_tokens).await,
                    None => None,
                };
                match repaired {
                    Some(code) => {
                        current = Some(code);
                        machine.advance(BuildEvent::CodeReady);
                    }
                    None => {
                        machine.advance(BuildEvent::CodeUnavailable);
                    }
                }
            }
            BuildStep::Regenerate => {
                let note = regenerate_note(
                    machine.generations_used(),
                    budget.generations,
                    diagnostic.as_deref(),
                );
                let request = GenerateRequest::new(code_prompt(section, &note), max_tokens);
                match generate_code(services, task.config(), &request).await {
                    Some(code) => {
                        debug!(state = %SectionState::CodeGenerated, generation = machine.generations_used(), "Regenerated code");
                        current = Some(code);
                        machine.advance(BuildEvent::CodeReady);
                    }
                    None => {
                        machine.advance(BuildEvent::CodeUnavailable);
                    }
                }
            }
            BuildStep::Done => {
                return match (current, rendered) {
                    (Some(code), Some(video)) => {
                        info!(state = %SectionState::RenderSucceeded, renders, "Section rendered");
                        BuildOutcome::Rendered {
                            code,
                            video,
                            renders,
                        }
                    }
                    _ => BuildOutcome::Exhausted { renders },
                };
            }
            BuildStep::Exhausted => {
                warn!(state = %SectionState::Failed, renders, "Build-fix budget exhausted");
                return BuildOutcome::Exhausted { renders };
            }
        }
    }
}

/// Deterministic rules first, then a diagnostic-guided request.
async fn repair(
    services: &SectionServices,
    config: &RunConfig,
    code: &CodeArtifact,
    diagnostic: &str,
    max_tokens: u32,
) -> Option<CodeArtifact> {
    if let Some((fixed, rule)) = deterministic_repair(code.source(), diagnostic) {
        debug!(rule, "Applied deterministic repair");
        return Some(CodeArtifact::new(fixed));
    }
    let request = GenerateRequest::new(fix_prompt(code.source(), diagnostic), max_tokens);
    generate_code(services, config, &request).await
}

/// One code request under the generation retry budget.
///
/// Transport failures, timeouts and replies without code share
/// `max_generation_attempts`; once that is spent the failure is logged and
/// the caller sees `None`.
pub(crate) async fn generate_code(
    services: &SectionServices,
    config: &RunConfig,
    request: &GenerateRequest,
) -> Option<CodeArtifact> {
    let reply = generate_structured(
        services.generator(),
        services.usage(),
        retry_policy(config),
        services.call_deadline(),
        "code",
        request,
        parse_code,
    )
    .await;

    match reply {
        Ok(source) => Some(CodeArtifact::new(inject_base_class(&source))),
        Err(failure) => {
            warn!(attempts = failure.attempts, error = %failure.error.kind, "Code generation failed");
            None
        }
    }
}
