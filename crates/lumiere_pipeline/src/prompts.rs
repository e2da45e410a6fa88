//! Request text for every generation and critique call.

use crate::source::TEACHING_SCENE_BASE;
use lumiere_core::{Critique, Outline, Section, Topic};

/// Outline request for a topic.
pub fn outline_prompt(topic: &Topic) -> String {
    format!(
        r#"You are an experienced teacher planning a short animated lecture.

Topic: {topic}

Plan a lecture of 3 to 6 sections that builds intuition first and then
walks through one concrete worked example from start to finish.

Return ONLY valid JSON with this structure:
{{
  "topic": "{topic}",
  "target_audience": "who the lecture is for",
  "data_case_definition": "the concrete example used throughout",
  "sections": [
    {{"id": "section_1", "title": "short title", "content": "what this section explains"}}
  ]
}}

Section ids must be unique and follow the pattern section_N."#,
        topic = topic.description()
    )
}

/// Storyboard request expanding an outline into per-section narration and animation.
pub fn storyboard_prompt(outline: &Outline) -> String {
    let outline_json = serde_json::to_string_pretty(outline).unwrap_or_else(|_| outline.topic.clone());
    format!(
        r#"You are storyboarding an animated lecture rendered with Manim.

Outline:
{outline_json}

For every outline section, write the narration shown on the left of the
frame and the ordered animation directives for the right-hand 6x6 grid
(rows A-F, columns 1-6). Keep the section ids from the outline.

Return ONLY valid JSON with this structure:
{{
  "sections": [
    {{
      "id": "section_1",
      "title": "short title",
      "lecture_lines": ["one short sentence per line"],
      "animations": ["one directive per step, naming grid cells"]
    }}
  ]
}}"#
    )
}

/// Note prepended to a code request when an earlier version failed.
pub fn regenerate_note(attempt: u32, max_attempts: u32, diagnostic: Option<&str>) -> String {
    if attempt <= 1 {
        return String::new();
    }
    let mut note = format!(
        "This is regeneration attempt {attempt} of {max_attempts}. The previous code failed to render; write a simpler, more robust version."
    );
    if let Some(diagnostic) = diagnostic {
        note.push_str("\nThe last render failed with:\n```\n");
        note.push_str(diagnostic);
        note.push_str("\n```");
    }
    note
}

/// Code request for one section.
pub fn code_prompt(section: &Section, regenerate_note: &str) -> String {
    format!(
        r#"You are a Python expert who writes Manim Community v0.19 scenes that explain algorithms step by step.

{regenerate_note}

Section title: {title}
Lecture lines: {lines}
Animation directives: {animations}

Requirements:
- Subclass `TeachingScene` and call `self.setup_layout(title, lecture_lines)` first.
- Place every visual element with `self.place_at_grid(obj, 'B2')` or
  `self.place_in_area(obj, 'A1', 'C3')`; never move the lecture lines, only recolor them.
- Show comparisons and pointers explicitly (MathTex for conditions, Arrow for references).
- Define every variable before use and pause with `self.wait(1)` between steps.
- Use bright hex colors and keep the scene two-dimensional.

Reference structure:
```python
from manim import *
{base}

class {scene}(TeachingScene):
    def construct(self):
        self.setup_layout("...", [...])
        ...
```

Output only the complete Python file."#,
        title = section.title,
        lines = section.lecture_lines.join(" | "),
        animations = section.animations.join(" | "),
        base = TEACHING_SCENE_BASE.trim(),
        scene = section.default_scene_name(),
    )
}

/// Diagnostic-guided repair request.
pub fn fix_prompt(code: &str, diagnostic: &str) -> String {
    format!(
        r#"The following Manim scene failed to render.

Error output (tail):
```
{diagnostic}
```

Current code:
```python
{code}
```

Fix the error with the smallest change that works. Keep the `TeachingScene`
base class and all grid placements unless they cause the error.
Output only the complete corrected Python file."#
    )
}

/// Full regeneration request carrying critique instructions.
pub fn revision_prompt(code: &str, critique: &Critique) -> String {
    format!(
        r#"You are a Manim v0.19 expert improving an educational animation.

Mandatory:
- Resolve every layout issue listed below.
- Use bright, high-contrast colors for animations and labels.
- Never animate the position or size of the lecture lines; only recolor them.
- Output only the updated complete Python file, no explanations.

Layout feedback:
{feedback}

Current code:
```python
{code}
```"#,
        feedback = critique.as_instructions()
    )
}

/// Layout critique request for a rendered section.
pub fn critique_prompt(section: &Section, placement_table: &str) -> String {
    format!(
        r#"Analyse this Manim lecture video strictly for layout and spatial positioning.
Use the attached grid image as the reference for cell names.

Section: {title}
Narration: {lines}
Current grid placements:
{placement_table}

Grid: lecture text on the left; the right side is a 6x6 grid, rows A-F,
columns 1-6. Elements are placed with `self.place_at_grid(obj, 'B2')` or
`self.place_in_area(obj, 'A1', 'C3')`.

Check for: elements covering the lecture text, overlapping elements,
anything cut off at the frame edge, crowded or empty grid regions, and
elements that should have faded out but did not.

Report at most the 3 most important issues. Every solution must name the
affected object and the target grid cells.

Return ONLY JSON:
{{
  "layout": {{
    "has_issues": true,
    "improvements": [
      {{"problem": "...", "solution": "move circle from C3 to E3", "line_number": 12, "object_affected": "circle"}}
    ]
  }}
}}"#,
        title = section.title,
        lines = section.lecture_lines.join("; "),
    )
}

/// Aesthetic evaluation request for a finished lecture video.
pub fn evaluation_prompt(topic: &Topic) -> String {
    format!(
        r#"You are grading an educational animation about "{topic}".

Score each dimension from 0 to 20 and give one paragraph of feedback:
- element_layout: spacing, alignment, no overlap or clipping
- attractiveness: color, motion and visual appeal
- logic_flow: each step follows from the previous one
- accuracy_depth: correctness and depth of the explanation
- visual_consistency: consistent style across the whole video

Return ONLY JSON:
{{
  "element_layout": {{"score": 0, "feedback": "..."}},
  "attractiveness": {{"score": 0, "feedback": "..."}},
  "logic_flow": {{"score": 0, "feedback": "..."}},
  "accuracy_depth": {{"score": 0, "feedback": "..."}},
  "visual_consistency": {{"score": 0, "feedback": "..."}},
  "summary": "...",
  "strengths": ["..."],
  "improvements": ["..."]
}}"#,
        topic = topic.description()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regenerate_note_only_after_first_attempt() {
        assert!(regenerate_note(1, 10, Some("boom")).is_empty());
        let note = regenerate_note(3, 10, Some("NameError: foo"));
        assert!(note.contains("3 of 10"));
        assert!(note.contains("NameError: foo"));
    }

    #[test]
    fn test_code_prompt_carries_base_and_scene_name() {
        let section = Section {
            id: "section_2".into(),
            title: "Halving".into(),
            lecture_lines: vec!["Compare with the middle".into()],
            animations: vec!["Highlight B3".into()],
        };
        let prompt = code_prompt(&section, "");
        assert!(prompt.contains("class Section2Scene(TeachingScene)"));
        assert!(prompt.contains("def place_in_area"));
        assert!(prompt.contains("Highlight B3"));
    }
}
