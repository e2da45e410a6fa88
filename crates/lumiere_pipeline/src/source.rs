//! Text-level transforms over generated scene source.
//!
//! Everything here is pure: base-class injection, render entry-point
//! discovery, grid placement extraction, the targeted placement patch
//! and the deterministic repair rules tried before asking the generator
//! for a fix.

use lumiere_core::{Critique, Section};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Shared scene base class injected into every generated source.
///
/// Lecture lines occupy the left third of the frame; the right side is a
/// 6x6 grid addressed by row letter `A`-`F` and column `1`-`6`.
pub const TEACHING_SCENE_BASE: &str = r#"class TeachingScene(Scene):
    GRID_ROWS = "ABCDEF"
    GRID_COLS = 6
    LEFT_EDGE = -1.5
    RIGHT_EDGE = 6.8
    TOP_EDGE = 3.6
    BOTTOM_EDGE = -3.6

    def setup_layout(self, title_text, lecture_lines):
        title = Text(title_text, font_size=36).to_edge(UP, buff=0.3)
        lines = VGroup(*[Text(line, font_size=22) for line in lecture_lines])
        lines.arrange(DOWN, aligned_edge=LEFT, buff=0.25)
        lines.to_edge(LEFT, buff=0.4).shift(DOWN * 0.4)
        self.play(Write(title), FadeIn(lines))
        self.title = title
        self.lecture = lines
        return title, lines

    def grid_point(self, cell):
        row = self.GRID_ROWS.index(cell[0].upper())
        col = int(cell[1:]) - 1
        cell_w = (self.RIGHT_EDGE - self.LEFT_EDGE) / self.GRID_COLS
        cell_h = (self.TOP_EDGE - self.BOTTOM_EDGE) / len(self.GRID_ROWS)
        x = self.LEFT_EDGE + cell_w * (col + 0.5)
        y = self.TOP_EDGE - cell_h * (row + 0.5)
        return np.array([x, y, 0])

    def place_at_grid(self, mobject, cell, scale_factor=1.0):
        mobject.scale(scale_factor)
        mobject.move_to(self.grid_point(cell))
        return mobject

    def place_in_area(self, mobject, top_left, bottom_right, scale_factor=1.0):
        start = self.grid_point(top_left)
        end = self.grid_point(bottom_right)
        mobject.scale(scale_factor)
        mobject.move_to((start + end) / 2)
        return mobject

    def highlight_line(self, index, color=YELLOW):
        self.play(self.lecture[index].animate.set_color(color))
"#;

static BASE_CLASS_LINE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^\s*class\s+TeachingScene\b").expect("Valid base class regex"));

static ANY_CLASS_LINE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^\s*class\s+\w+").expect("Valid class regex"));

static CLASS_HEADER: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?m)^[ \t]*class\s+(\w+)\s*(?:\([^)]*\))?\s*:").expect("Valid class header regex")
});

static POINT_PLACEMENT: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r#"place_at_grid\(\s*([A-Za-z_][\w.\[\]]*)\s*,\s*['"]([A-Fa-f][1-6])['"]"#)
        .expect("Valid point placement regex")
});

static AREA_PLACEMENT: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r#"place_in_area\(\s*([A-Za-z_][\w.\[\]]*)\s*,\s*['"]([A-Fa-f][1-6])['"]\s*,\s*['"]([A-Fa-f][1-6])['"]"#,
    )
    .expect("Valid area placement regex")
});

static GRID_CELL: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"[A-F][1-6]").expect("Valid grid cell regex"));

static IDENTIFIER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("Valid identifier regex"));

static UNDEFINED_NAME: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"name '(\w+)' is not defined").expect("Valid NameError regex"));

static CODE_KEYWORD: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\bCode\(\s*code\s*=").expect("Valid Code keyword regex"));

/// Replace the `TeachingScene` block in `code` with the canonical definition.
///
/// The existing block ends at the first non-blank line indented no deeper
/// than its header. Without an existing block the definition is inserted
/// before the first class, or at the top when there are no classes.
///
/// # Examples
///
/// ```
/// use lumiere_pipeline::{TEACHING_SCENE_BASE, inject_base_class};
///
/// let code = "from manim import *\n\nclass IntroScene(TeachingScene):\n    def construct(self):\n        pass\n";
/// let injected = inject_base_class(code);
/// assert!(injected.contains(TEACHING_SCENE_BASE.trim()));
/// assert!(injected.find("class TeachingScene").unwrap() < injected.find("class IntroScene").unwrap());
/// ```
pub fn inject_base_class(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let replacement = format!("{}\n\n", TEACHING_SCENE_BASE.trim());

    let (start, end) = match lines.iter().position(|l| BASE_CLASS_LINE.is_match(l)) {
        Some(start) => {
            let base_indent = indent_of(lines[start]);
            let end = lines[start + 1..]
                .iter()
                .position(|l| !l.trim().is_empty() && indent_of(l) <= base_indent)
                .map(|offset| start + 1 + offset)
                .unwrap_or(lines.len());
            (start, end)
        }
        None => {
            let insert_at = lines
                .iter()
                .position(|l| ANY_CLASS_LINE.is_match(l))
                .unwrap_or(0);
            (insert_at, insert_at)
        }
    };

    let mut out = String::with_capacity(code.len() + replacement.len());
    for line in &lines[..start] {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&replacement);
    for line in &lines[end..] {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Name of the scene class the renderer should run.
///
/// The first class other than the shared base that defines `construct`
/// wins; otherwise the last such class; otherwise the section's default
/// scene name.
pub fn discover_entry_point(code: &str, section: &Section) -> String {
    let headers: Vec<(usize, String)> = CLASS_HEADER
        .captures_iter(code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str();
            Some((whole.start(), name.to_string()))
        })
        .collect();

    let candidates: Vec<(usize, usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(_, (_, name))| !is_base_name(name))
        .map(|(i, (start, name))| {
            let end = headers.get(i + 1).map(|(s, _)| *s).unwrap_or(code.len());
            (*start, end, name.as_str())
        })
        .collect();

    if let Some((_, _, name)) = candidates
        .iter()
        .find(|(start, end, _)| code[*start..*end].contains("def construct("))
    {
        return (*name).to_string();
    }

    candidates
        .last()
        .map(|(_, _, name)| (*name).to_string())
        .unwrap_or_else(|| section.default_scene_name())
}

fn is_base_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "teachingscene" || lower == "basescene"
}

/// Grid anchor of one placed element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridAnchor {
    /// Centered on a single cell
    Cell(String),
    /// Fitted into the rectangle spanned by two cells
    Area(String, String),
}

impl std::fmt::Display for GridAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridAnchor::Cell(cell) => write!(f, "{}", cell),
            GridAnchor::Area(from, to) => write!(f, "{}-{}", from, to),
        }
    }
}

/// One `place_at_grid` / `place_in_area` call found in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Expression placed, e.g. `circle` or `nodes[2]`
    pub element: String,
    /// Where it was placed
    pub anchor: GridAnchor,
    cell_spans: Vec<(usize, usize)>,
}

impl Placement {
    /// Identifier the element expression starts with.
    pub fn root_name(&self) -> &str {
        self.element
            .split(['.', '['])
            .next()
            .unwrap_or(self.element.as_str())
    }
}

/// Every grid placement in `code`, in source order.
pub fn extract_placements(code: &str) -> Vec<Placement> {
    let mut placements: Vec<Placement> = Vec::new();

    for caps in POINT_PLACEMENT.captures_iter(code) {
        if let (Some(element), Some(cell)) = (caps.get(1), caps.get(2)) {
            placements.push(Placement {
                element: element.as_str().to_string(),
                anchor: GridAnchor::Cell(cell.as_str().to_ascii_uppercase()),
                cell_spans: vec![(cell.start(), cell.end())],
            });
        }
    }

    for caps in AREA_PLACEMENT.captures_iter(code) {
        if let (Some(element), Some(from), Some(to)) = (caps.get(1), caps.get(2), caps.get(3)) {
            placements.push(Placement {
                element: element.as_str().to_string(),
                anchor: GridAnchor::Area(
                    from.as_str().to_ascii_uppercase(),
                    to.as_str().to_ascii_uppercase(),
                ),
                cell_spans: vec![(from.start(), from.end()), (to.start(), to.end())],
            });
        }
    }

    placements.sort_by_key(|p| p.cell_spans.first().map(|(s, _)| *s).unwrap_or(0));
    placements
}

/// Markdown table of placements, sent alongside critique requests.
///
/// # Examples
///
/// ```
/// use lumiere_pipeline::{extract_placements, placement_table};
///
/// let code = "self.place_at_grid(circle, 'B2', scale_factor=0.8)";
/// let table = placement_table(&extract_placements(code));
/// assert!(table.contains("| circle | point | B2 |"));
/// ```
pub fn placement_table(placements: &[Placement]) -> String {
    if placements.is_empty() {
        return "No grid placements found.".to_string();
    }
    let mut table = String::from("| element | kind | cells |\n|---|---|---|\n");
    for placement in placements {
        let kind = match placement.anchor {
            GridAnchor::Cell(_) => "point",
            GridAnchor::Area(..) => "area",
        };
        table.push_str(&format!("| {} | {} | {} |\n", placement.element, kind, placement.anchor));
    }
    table
}

/// Grid cells mentioned in free text, in order.
///
/// A cell must not be glued to other ASCII letters or digits, so `B2` in
/// "move to B2" matches but `AB23` does not.
pub fn grid_cells_in(text: &str) -> Vec<String> {
    GRID_CELL
        .find_iter(text)
        .filter(|m| {
            let before_ok = text[..m.start()]
                .chars()
                .next_back()
                .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
            let after_ok = text[m.end()..]
                .chars()
                .next()
                .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
            before_ok && after_ok
        })
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Apply a critique as direct edits to placement cells.
///
/// Applicable only when every improvement names an element that has a
/// placement in `code` (via `object_affected` or an identifier in the
/// solution) and its solution supplies at least one grid cell. Point
/// placements move to the last cell mentioned; areas take the last two
/// (or collapse onto a single cell). Returns `None` when the precondition
/// fails, leaving full regeneration to the caller.
///
/// # Examples
///
/// ```
/// use lumiere_core::{Critique, Improvement};
/// use lumiere_pipeline::targeted_patch;
///
/// let code = "self.place_at_grid(circle, 'C3')\n";
/// let mut fix = Improvement::new("circle overlaps label", "move circle from C3 to E3");
/// fix.object_affected = Some("circle".into());
/// let patched = targeted_patch(code, &Critique::with_improvements(vec![fix])).unwrap();
/// assert_eq!(patched, "self.place_at_grid(circle, 'E3')\n");
/// ```
pub fn targeted_patch(code: &str, critique: &Critique) -> Option<String> {
    if critique.improvements.is_empty() {
        return None;
    }
    let placements = extract_placements(code);
    if placements.is_empty() {
        return None;
    }
    let placed: BTreeSet<&str> = placements
        .iter()
        .flat_map(|p| [p.element.as_str(), p.root_name()])
        .collect();

    let mut edits: Vec<((usize, usize), String)> = Vec::new();

    for improvement in &critique.improvements {
        let element = improvement
            .object_affected
            .as_deref()
            .map(str::trim)
            .filter(|name| placed.contains(name))
            .map(str::to_string)
            .or_else(|| {
                IDENTIFIER
                    .find_iter(&improvement.solution)
                    .map(|m| m.as_str())
                    .find(|ident| placed.contains(ident))
                    .map(str::to_string)
            })?;

        let cells = grid_cells_in(&improvement.solution);
        let last = cells.last()?.clone();

        for placement in placements
            .iter()
            .filter(|p| p.element == element || p.root_name() == element)
        {
            match placement.anchor {
                GridAnchor::Cell(_) => {
                    edits.push((placement.cell_spans[0], last.clone()));
                }
                GridAnchor::Area(..) => {
                    let from = if cells.len() >= 2 {
                        cells[cells.len() - 2].clone()
                    } else {
                        last.clone()
                    };
                    edits.push((placement.cell_spans[0], from));
                    edits.push((placement.cell_spans[1], last.clone()));
                }
            }
        }
    }

    // Later improvements win when they touch the same cell
    edits.sort_by_key(|((start, _), _)| *start);
    edits.dedup_by(|later, earlier| {
        if later.0 == earlier.0 {
            earlier.1 = later.1.clone();
            true
        } else {
            false
        }
    });

    let mut patched = code.to_string();
    for ((start, end), cell) in edits.into_iter().rev() {
        patched.replace_range(start..end, &cell);
    }
    Some(patched)
}

/// A text-level fix keyed on a render diagnostic.
struct RepairRule {
    name: &'static str,
    apply: fn(code: &str, diagnostic: &str) -> Option<String>,
}

const CONSTANT_ALIASES: &[(&str, &str)] = &[
    ("DARK_GREY", "DARK_GRAY"),
    ("LIGHT_GREY", "LIGHT_GRAY"),
    ("DARKER_GREY", "DARKER_GRAY"),
    ("LIGHTER_GREY", "LIGHTER_GRAY"),
    ("GREY", "GRAY"),
    ("DARK_GRAY_BROWN", "GRAY_BROWN"),
];

const REPAIR_RULES: &[RepairRule] = &[
    RepairRule {
        name: "tab_indentation",
        apply: repair_tabs,
    },
    RepairRule {
        name: "code_keyword",
        apply: repair_code_keyword,
    },
    RepairRule {
        name: "constant_alias",
        apply: repair_constant_alias,
    },
];

fn repair_tabs(code: &str, diagnostic: &str) -> Option<String> {
    let tab_error =
        diagnostic.contains("TabError") || diagnostic.contains("inconsistent use of tabs");
    (tab_error && code.contains('\t')).then(|| code.replace('\t', "    "))
}

fn repair_code_keyword(code: &str, diagnostic: &str) -> Option<String> {
    let bad_keyword = diagnostic.contains("unexpected keyword argument 'code'");
    (bad_keyword && CODE_KEYWORD.is_match(code))
        .then(|| CODE_KEYWORD.replace_all(code, "Code(code_string=").into_owned())
}

fn repair_constant_alias(code: &str, diagnostic: &str) -> Option<String> {
    let missing = UNDEFINED_NAME.captures(diagnostic)?.get(1)?.as_str();
    let (_, replacement) = CONSTANT_ALIASES.iter().find(|(alias, _)| *alias == missing)?;
    let word = regex::Regex::new(&format!(r"\b{}\b", regex::escape(missing))).ok()?;
    word.is_match(code)
        .then(|| word.replace_all(code, *replacement).into_owned())
}

/// Try the deterministic repair rules against a render diagnostic.
///
/// Returns the repaired source and the rule name when a rule changed the
/// code.
///
/// # Examples
///
/// ```
/// use lumiere_pipeline::deterministic_repair;
///
/// let code = "box.set_color(DARK_GREY)";
/// let diagnostic = "NameError: name 'DARK_GREY' is not defined";
/// let (fixed, rule) = deterministic_repair(code, diagnostic).unwrap();
/// assert_eq!(fixed, "box.set_color(DARK_GRAY)");
/// assert_eq!(rule, "constant_alias");
/// ```
pub fn deterministic_repair(code: &str, diagnostic: &str) -> Option<(String, &'static str)> {
    REPAIR_RULES.iter().find_map(|rule| {
        (rule.apply)(code, diagnostic)
            .filter(|fixed| fixed != code)
            .map(|fixed| (fixed, rule.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumiere_core::Improvement;

    fn section(id: &str) -> Section {
        Section {
            id: id.to_string(),
            title: "t".to_string(),
            lecture_lines: vec![],
            animations: vec![],
        }
    }

    #[test]
    fn test_replaces_existing_base_block() {
        let code = "from manim import *\n\nclass TeachingScene(Scene):\n    def old(self):\n        pass\n\nclass MainScene(TeachingScene):\n    def construct(self):\n        pass\n";
        let out = inject_base_class(code);
        assert!(!out.contains("def old"));
        assert!(out.contains("def place_in_area"));
        assert!(out.contains("class MainScene(TeachingScene):"));
        assert_eq!(out.matches("class TeachingScene").count(), 1);
    }

    #[test]
    fn test_inserts_at_top_without_classes() {
        let out = inject_base_class("x = 1\n");
        assert!(out.starts_with("class TeachingScene(Scene):"));
        assert!(out.ends_with("x = 1\n"));
        assert_eq!(out.matches("class TeachingScene(Scene):").count(), 1);
    }

    #[test]
    fn test_entry_point_skips_base_and_helpers() {
        let code = "class TeachingScene(Scene):\n    def construct(self):\n        pass\nclass Helper:\n    pass\nclass RealScene(TeachingScene):\n    def construct(self):\n        pass\n";
        assert_eq!(discover_entry_point(code, &section("section_1")), "RealScene");
    }

    #[test]
    fn test_entry_point_falls_back_to_last_class_then_default() {
        let code = "class A:\n    pass\nclass B:\n    pass\n";
        assert_eq!(discover_entry_point(code, &section("section_1")), "B");
        assert_eq!(discover_entry_point("x = 1", &section("section_2")), "Section2Scene");
    }

    #[test]
    fn test_extracts_points_and_areas_in_order() {
        let code = "self.place_in_area(graph, 'A1', 'C3', scale_factor=0.7)\nself.place_at_grid(label, \"d4\")\n";
        let placements = extract_placements(code);
        assert_eq!(placements.len(), 2);
        assert_eq!(placements[0].element, "graph");
        assert_eq!(placements[0].anchor, GridAnchor::Area("A1".into(), "C3".into()));
        assert_eq!(placements[1].anchor, GridAnchor::Cell("D4".into()));
    }

    #[test]
    fn test_grid_cells_respect_boundaries() {
        assert_eq!(grid_cells_in("from C3 to E3"), vec!["C3", "E3"]);
        assert!(grid_cells_in("AB23 and F7").is_empty());
        assert_eq!(grid_cells_in("将圆形从C3移到E3"), vec!["C3", "E3"]);
    }

    #[test]
    fn test_patch_moves_area_with_identifier_in_solution() {
        let code = "self.place_in_area(graph, 'A1', 'C3')\n";
        let critique = Critique::with_improvements(vec![Improvement::new(
            "graph covers lecture",
            "shrink graph into D1-F3",
        )]);
        let patched = targeted_patch(code, &critique).unwrap();
        assert_eq!(patched, "self.place_in_area(graph, 'D1', 'F3')\n");
    }

    #[test]
    fn test_patch_rejected_without_cells_or_known_element() {
        let code = "self.place_at_grid(circle, 'C3')\n";
        let vague = Critique::with_improvements(vec![Improvement::new("crowded", "make circle smaller")]);
        assert!(targeted_patch(code, &vague).is_none());

        let unknown = Critique::with_improvements(vec![Improvement::new("overlap", "move square to B2")]);
        assert!(targeted_patch(code, &unknown).is_none());
    }

    #[test]
    fn test_tab_repair_only_on_tab_error() {
        let code = "def f():\n\treturn 1\n";
        assert!(deterministic_repair(code, "SyntaxError: invalid syntax").is_none());
        let (fixed, rule) = deterministic_repair(code, "TabError: inconsistent use of tabs").unwrap();
        assert_eq!(fixed, "def f():\n    return 1\n");
        assert_eq!(rule, "tab_indentation");
    }

    #[test]
    fn test_code_keyword_repair() {
        let code = "listing = Code(code=src, language=\"python\")";
        let diagnostic = "TypeError: Code.__init__() got an unexpected keyword argument 'code'";
        let (fixed, _) = deterministic_repair(code, diagnostic).unwrap();
        assert_eq!(fixed, "listing = Code(code_string=src, language=\"python\")");
    }
}
