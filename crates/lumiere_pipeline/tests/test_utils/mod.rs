//! Scripted collaborators for pipeline tests.
//!
//! The generator answers by recognising which request it received. Code it
//! writes carries two marker comments, `# section: <id>` and
//! `# status: <ok|broken|revised>`, which the renderer reads to decide
//! whether the render succeeds and which bytes to return. Generator and
//! critic can be told to fail or hang ahead of a normal reply.

#![allow(dead_code)]

use async_trait::async_trait;
use lumiere_core::{
    CritiqueRequest, CritiqueResponse, GenerateRequest, GenerateResponse, RenderJob, RunConfig, Section, Usage,
};
use lumiere_error::{
    CritiqueError, CritiqueErrorKind, GenerationError, GenerationErrorKind, MergeError, RenderError, RenderErrorKind,
};
use lumiere_interface::{Concatenator, CritiqueService, Renderer, TextGenerator};
use lumiere_pipeline::{Collaborators, TopicPipeline};
use lumiere_storage::InMemoryArtifactStore;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

/// Usage reported by every generation reply.
pub const GENERATION_USAGE: Usage = Usage {
    requested: 10,
    produced: 5,
    total: 15,
};

/// Usage reported by every critique reply.
pub const CRITIQUE_USAGE: Usage = Usage {
    requested: 3,
    produced: 1,
    total: 4,
};

static SECTION_TITLE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"Section title: (\S+)").expect("Valid title regex"));
static SECTION_MARKER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"# section: (\w+)").expect("Valid marker regex"));
static STATUS_MARKER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"# status: (\w+)").expect("Valid status regex"));
static CRITIQUE_SECTION: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"Section: (\S+)").expect("Valid critique regex"));

/// Which request a prompt represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    Outline,
    Storyboard,
    Code(String),
    Fix(String),
    Revision(String),
}

fn classify(prompt: &str) -> PromptKind {
    let marker = |re: &regex::Regex| {
        re.captures(prompt)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };
    if prompt.contains("planning a short animated lecture") {
        PromptKind::Outline
    } else if prompt.contains("You are storyboarding") {
        PromptKind::Storyboard
    } else if prompt.contains("improving an educational animation") {
        PromptKind::Revision(marker(&SECTION_MARKER))
    } else if prompt.contains("Error output (tail)") {
        PromptKind::Fix(marker(&SECTION_MARKER))
    } else if prompt.contains("Section title:") {
        PromptKind::Code(marker(&SECTION_TITLE))
    } else {
        panic!("unrecognised prompt: {}", prompt)
    }
}

/// Python source for a section carrying the given status marker.
pub fn scene_source(section_id: &str, status: &str) -> String {
    let scene = Section {
        id: section_id.to_string(),
        title: section_id.to_string(),
        lecture_lines: vec![],
        animations: vec![],
    }
    .default_scene_name();
    format!(
        "```python\nfrom manim import *\n\nclass {scene}(TeachingScene):\n    def construct(self):\n        # section: {section_id}\n        # status: {status}\n        circle = Circle()\n        self.place_at_grid(circle, 'C3')\n```"
    )
}

/// A failure injected ahead of a normal reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail at once with a transport error
    Transport(String),
    /// Hang this long before answering
    Stall(Duration),
}

/// How the scripted generator behaves.
#[derive(Debug, Clone, Default)]
pub struct GeneratorScript {
    /// Sections in every outline and storyboard
    pub sections: usize,
    /// Topics whose outline request always gets an unusable reply
    pub doomed_topics: Vec<String>,
    /// Sections whose code never renders
    pub broken_sections: HashSet<String>,
    /// Revised code never renders
    pub revisions_break: bool,
    /// Faults met by a section's code requests, one per request in order
    pub code_faults: HashMap<String, Vec<Fault>>,
    /// Storyboard replies without any JSON before the first usable one
    pub malformed_storyboards: usize,
    /// Sections whose first code is broken and renders after this many repairs
    pub repair_after: HashMap<String, usize>,
    /// Sections whose code indents a line with a tab
    pub tabbed_sections: HashSet<String>,
}

/// Text generator answering from a [`GeneratorScript`].
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: GeneratorScript,
    calls: Mutex<Vec<PromptKind>>,
    faults: Mutex<HashMap<String, VecDeque<Fault>>>,
    storyboards: Mutex<usize>,
    fixes: Mutex<HashMap<String, usize>>,
}

impl ScriptedGenerator {
    pub fn new(script: GeneratorScript) -> Self {
        let faults = script
            .code_faults
            .iter()
            .map(|(section, faults)| (section.clone(), faults.iter().cloned().collect()))
            .collect();
        Self {
            script,
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(faults),
            storyboards: Mutex::new(0),
            fixes: Mutex::new(HashMap::new()),
        }
    }

    /// Calls of one kind.
    pub fn count(&self, kind: &PromptKind) -> usize {
        self.calls.lock().iter().filter(|c| *c == kind).count()
    }

    fn next_fault(&self, kind: &PromptKind) -> Option<Fault> {
        let PromptKind::Code(section) = kind else {
            return None;
        };
        self.faults.lock().get_mut(section)?.pop_front()
    }

    pub fn calls(&self) -> Vec<PromptKind> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn reply(&self, prompt: &str, kind: &PromptKind) -> String {
        match kind {
            PromptKind::Outline => {
                if self.script.doomed_topics.iter().any(|t| prompt.contains(t.as_str())) {
                    return "I would rather not plan this lecture.".to_string();
                }
                let sections: Vec<String> = (1..=self.script.sections)
                    .map(|i| format!(r#"{{"id": "section_{i}", "title": "Part {i}", "content": "step {i}"}}"#))
                    .collect();
                format!(
                    "```json\n{{\"topic\": \"t\", \"target_audience\": \"students\", \"sections\": [{}]}}\n```",
                    sections.join(", ")
                )
            }
            PromptKind::Storyboard => {
                {
                    let mut answered = self.storyboards.lock();
                    *answered += 1;
                    if *answered <= self.script.malformed_storyboards {
                        return "Let me think about how the scenes should flow first.".to_string();
                    }
                }
                let sections: Vec<String> = (1..=self.script.sections)
                    .map(|i| {
                        format!(
                            r#"{{"id": "section_{i}", "title": "section_{i}", "lecture_lines": ["line {i}"], "animations": ["show array in B2"]}}"#
                        )
                    })
                    .collect();
                format!("{{\"sections\": [{}]}}", sections.join(", "))
            }
            PromptKind::Code(section) => {
                let broken =
                    self.script.broken_sections.contains(section) || self.script.repair_after.contains_key(section);
                let source = scene_source(section, if broken { "broken" } else { "ok" });
                if self.script.tabbed_sections.contains(section) {
                    source.replace("        circle = Circle()", "\tcircle = Circle()")
                } else {
                    source
                }
            }
            PromptKind::Fix(section) => {
                if let Some(needed) = self.script.repair_after.get(section) {
                    let mut fixes = self.fixes.lock();
                    let done = fixes.entry(section.clone()).or_insert(0);
                    *done += 1;
                    let status = if *done >= *needed { "ok" } else { "broken" };
                    return scene_source(section, status);
                }
                let status = STATUS_MARKER
                    .captures(prompt)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str())
                    .unwrap_or("broken");
                scene_source(section, status)
            }
            PromptKind::Revision(section) => {
                let status = if self.script.revisions_break || self.script.broken_sections.contains(section) {
                    "broken"
                } else {
                    "revised"
                };
                scene_source(section, status)
            }
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        let kind = classify(&request.prompt);
        self.calls.lock().push(kind.clone());
        match self.next_fault(&kind) {
            Some(Fault::Transport(message)) => {
                return Err(GenerationError::new(GenerationErrorKind::Transport(message)));
            }
            Some(Fault::Stall(delay)) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        let text = self.reply(&request.prompt, &kind);
        Ok(GenerateResponse {
            text,
            usage: GENERATION_USAGE,
        })
    }

    fn model_name(&self) -> &str {
        "scripted-generator"
    }
}

/// What the critic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticMode {
    /// Never any issues
    Clean,
    /// Issues on the first critique of each section, clean afterwards
    IssuesOnce,
    /// Issues on the first critique of the named section only
    IssuesOnceOn(&'static str),
    /// Issues every time
    AlwaysIssues,
    /// Once per section, a placed element moved to another cell
    MisplacedOnce,
}

const ISSUES: &str = r#"{"layout": {"has_issues": true, "improvements": [
  {"problem": "labels crowd the lecture text", "solution": "spread the labels out and brighten them", "object_affected": "labels"}
]}}"#;
const MISPLACED: &str = r#"{"layout": {"has_issues": true, "improvements": [
  {"problem": "circle overlaps the lecture text", "solution": "move circle from C3 to B4", "object_affected": "circle"}
]}}"#;
const CLEAN: &str = r#"{"layout": {"has_issues": false, "improvements": []}}"#;

/// Critique service answering according to a [`CriticMode`].
#[derive(Debug)]
pub struct ScriptedCritic {
    mode: CriticMode,
    seen: Mutex<HashMap<String, usize>>,
    faults: Mutex<VecDeque<Fault>>,
}

impl ScriptedCritic {
    pub fn new(mode: CriticMode) -> Self {
        Self {
            mode,
            seen: Mutex::new(HashMap::new()),
            faults: Mutex::new(VecDeque::new()),
        }
    }

    /// Faults met by the first calls, whichever section they are for.
    pub fn with_faults(self, faults: Vec<Fault>) -> Self {
        *self.faults.lock() = faults.into();
        self
    }

    /// Critiques answered; faulted calls are not counted.
    pub fn call_count(&self) -> usize {
        self.seen.lock().values().sum()
    }
}

#[async_trait]
impl CritiqueService for ScriptedCritic {
    async fn critique(&self, request: &CritiqueRequest) -> Result<CritiqueResponse, CritiqueError> {
        let fault = self.faults.lock().pop_front();
        match fault {
            Some(Fault::Transport(message)) => {
                return Err(CritiqueError::new(CritiqueErrorKind::Transport(message)));
            }
            Some(Fault::Stall(delay)) => tokio::time::sleep(delay).await,
            None => {}
        }
        let section = CRITIQUE_SECTION
            .captures(&request.prompt)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let previous = {
            let mut seen = self.seen.lock();
            let count = seen.entry(section.clone()).or_insert(0);
            *count += 1;
            *count - 1
        };
        let text = match (self.mode, previous) {
            (CriticMode::Clean, _) => CLEAN,
            (CriticMode::IssuesOnce, 0) => ISSUES,
            (CriticMode::IssuesOnce, _) => CLEAN,
            (CriticMode::IssuesOnceOn(target), 0) if target == section => ISSUES,
            (CriticMode::IssuesOnceOn(_), _) => CLEAN,
            (CriticMode::AlwaysIssues, _) => ISSUES,
            (CriticMode::MisplacedOnce, 0) => MISPLACED,
            (CriticMode::MisplacedOnce, _) => CLEAN,
        };
        Ok(CritiqueResponse {
            text: text.to_string(),
            usage: CRITIQUE_USAGE,
        })
    }

    fn model_name(&self) -> &str {
        "scripted-critic"
    }
}

/// Renderer that succeeds unless the source is marked broken or indents
/// with tabs.
///
/// Video bytes are `[<section>:<status>]`.
#[derive(Debug, Default)]
pub struct MarkerRenderer {
    delays: HashMap<String, Duration>,
    timeouts: HashSet<String>,
    jobs: Mutex<Vec<RenderJob>>,
}

impl MarkerRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay the render of `section_id` by `delay`.
    pub fn with_delay(mut self, section_id: &str, delay: Duration) -> Self {
        self.delays.insert(section_id.to_string(), delay);
        self
    }

    /// The first render of `section_id` runs past its deadline.
    pub fn with_timeout_once(mut self, section_id: &str) -> Self {
        self.timeouts.insert(section_id.to_string());
        self
    }

    pub fn render_count(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn renders_of(&self, section_id: &str) -> usize {
        self.jobs.lock().iter().filter(|j| j.section_id == section_id).count()
    }

    pub fn entry_points(&self) -> Vec<String> {
        self.jobs.lock().iter().map(|j| j.entry_point.clone()).collect()
    }
}

#[async_trait]
impl Renderer for MarkerRenderer {
    async fn render(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError> {
        let attempt = {
            let mut jobs = self.jobs.lock();
            jobs.push(job.clone());
            jobs.iter().filter(|j| j.section_id == job.section_id).count()
        };
        if attempt == 1 && self.timeouts.contains(&job.section_id) {
            return Err(RenderError::new(RenderErrorKind::Timeout(30)));
        }
        if let Some(delay) = self.delays.get(&job.section_id) {
            tokio::time::sleep(*delay).await;
        }
        let status = STATUS_MARKER
            .captures(&job.source)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        if job.source.contains('\t') {
            return Err(RenderError::new(RenderErrorKind::Failed {
                exit_code: 1,
                diagnostic: "TabError: inconsistent use of tabs and spaces in indentation".to_string(),
            }));
        }
        if status == "broken" {
            return Err(RenderError::new(RenderErrorKind::Failed {
                exit_code: 1,
                diagnostic: "ValueError: animation exploded".to_string(),
            }));
        }
        Ok(format!("[{}:{}]", job.section_id, status).into_bytes())
    }
}

/// Concatenator that joins segments and remembers each call.
#[derive(Debug, Default)]
pub struct JoiningConcatenator {
    calls: Mutex<Vec<Vec<Vec<u8>>>>,
}

impl JoiningConcatenator {
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Concatenator for JoiningConcatenator {
    async fn concat(&self, segments: &[Vec<u8>]) -> Result<Vec<u8>, MergeError> {
        self.calls.lock().push(segments.to_vec());
        Ok(segments.concat())
    }
}

/// Every mock plus a pipeline wired to them.
pub struct Harness {
    pub generator: Arc<ScriptedGenerator>,
    pub critic: Arc<ScriptedCritic>,
    pub renderer: Arc<MarkerRenderer>,
    pub concatenator: Arc<JoiningConcatenator>,
    pub store: InMemoryArtifactStore,
    pub pipeline: TopicPipeline,
}

impl Harness {
    pub fn new(
        script: GeneratorScript,
        mode: CriticMode,
        renderer: MarkerRenderer,
        store: InMemoryArtifactStore,
        config: RunConfig,
    ) -> Self {
        Self::with_critic(script, ScriptedCritic::new(mode), renderer, store, config)
    }

    /// Like [`Harness::new`] with a prepared critic.
    pub fn with_critic(
        script: GeneratorScript,
        critic: ScriptedCritic,
        renderer: MarkerRenderer,
        store: InMemoryArtifactStore,
        config: RunConfig,
    ) -> Self {
        let generator = Arc::new(ScriptedGenerator::new(script));
        let critic = Arc::new(critic);
        let renderer = Arc::new(renderer);
        let concatenator = Arc::new(JoiningConcatenator::default());
        let collaborators = Collaborators {
            generator: generator.clone(),
            critic: critic.clone(),
            renderer: renderer.clone(),
            concatenator: concatenator.clone(),
            store: Arc::new(store.clone()),
        };
        let pipeline = TopicPipeline::new(collaborators, config);
        Self {
            generator,
            critic,
            renderer,
            concatenator,
            store,
            pipeline,
        }
    }
}

/// Small budgets and no backoff.
pub fn fast_config() -> RunConfig {
    RunConfig::default()
        .with_max_generation_attempts(2)
        .with_retry_delay_ms(1)
        .with_max_regenerate_tries(2)
        .with_max_fix_bug_tries(1)
        .with_max_mllm_fix_bugs_tries(1)
        .with_max_feedback_gen_code_tries(2)
}
