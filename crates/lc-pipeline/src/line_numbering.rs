//! Builds the `L001:`-prefixed scene text every prompt and every finding's
//! line range refers to (SPEC_FULL §4.2 step 1).

/// Prefixes every line of `scene_text` with `L<n>:`, zero-padded to the
/// width needed for the largest line number. A one-line scene gets `L1:`;
/// a 1200-line scene gets `L0001:`.
pub fn number_scene(scene_text: &str) -> String {
    let lines: Vec<&str> = scene_text.lines().collect();
    let width = lines.len().max(1).to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("L{:0width$}: {line}", i + 1, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}
