//! Multi-scene concatenation and line-range attribution (SPEC_FULL §4.10's
//! on-disk scene loading, feeding §4.2's single analysis call over a
//! multi-scene session).
//!
//! Grounded on `original_source/lit_platform/runtime/utils.py`'s
//! `concatenate_scenes` / `map_global_range_to_scene`.

const SCENE_BOUNDARY_PREFIX: &str = "===== SCENE BOUNDARY: ";

/// One scene's region within a concatenated multi-scene document.
#[derive(Debug, Clone)]
pub struct SceneRange {
    pub scene_path: String,
    pub global_start: Option<u32>,
    pub global_end: Option<u32>,
}

/// Joins ordered `(scene_path, scene_text)` pairs into one document with a
/// `===== SCENE BOUNDARY: <name> =====` marker line before each scene, and
/// returns the line map needed to attribute findings back to their owning
/// scene. A single scene still goes through this path so callers don't need
/// a separate single-scene code path.
pub fn concatenate_scenes(scene_docs: &[(String, String)]) -> (String, Vec<SceneRange>) {
    let mut lines: Vec<String> = Vec::new();
    let mut line_map = Vec::with_capacity(scene_docs.len());
    let mut global_line: u32 = 1;

    for (idx, (scene_path, scene_text)) in scene_docs.iter().enumerate() {
        let scene_name = scene_path.rsplit('/').next().unwrap_or(scene_path);
        lines.push(format!("{SCENE_BOUNDARY_PREFIX}{scene_name} ====="));
        global_line += 1;

        let scene_lines: Vec<&str> = scene_text.lines().collect();
        let (global_start, global_end) = if scene_lines.is_empty() {
            (None, None)
        } else {
            let start = global_line;
            let end = global_line + scene_lines.len() as u32 - 1;
            global_line = end + 1;
            (Some(start), Some(end))
        };

        lines.extend(scene_lines.into_iter().map(str::to_string));

        line_map.push(SceneRange { scene_path: scene_path.clone(), global_start, global_end });

        if idx + 1 < scene_docs.len() {
            lines.push(String::new());
            global_line += 1;
        }
    }

    (lines.join("\n"), line_map)
}

/// Maps a global (concatenated-document) line range back to the owning
/// scene path and that scene's local line numbers.
pub fn map_global_range_to_scene(
    line_map: &[SceneRange],
    line_start: Option<u32>,
    line_end: Option<u32>,
) -> (Option<String>, Option<u32>, Option<u32>) {
    let Some(start) = line_start else {
        return (line_map.first().map(|r| r.scene_path.clone()), None, None);
    };
    let end = line_end.unwrap_or(start);

    for range in line_map {
        let (Some(gstart), Some(gend)) = (range.global_start, range.global_end) else { continue };
        if gstart <= start && start <= gend {
            let local_start = start - gstart + 1;
            let local_end = if line_end.is_some() { Some((end - gstart + 1).max(local_start)) } else { None };
            return (Some(range.scene_path.clone()), Some(local_start), local_end);
        }
    }

    (line_map.last().map(|r| r.scene_path.clone()), line_start, line_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_scene_round_trips_through_boundary_marker() {
        let docs = vec![("scene-1.md".to_string(), "one\ntwo\n".to_string())];
        let (text, map) = concatenate_scenes(&docs);
        assert!(text.starts_with("===== SCENE BOUNDARY: scene-1.md ====="));
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].global_start, Some(2));
        assert_eq!(map[0].global_end, Some(3));
    }

    #[test]
    fn multi_scene_concatenation_offsets_second_scene() {
        let docs = vec![
            ("a.md".to_string(), "a1\na2\n".to_string()),
            ("b.md".to_string(), "b1\n".to_string()),
        ];
        let (_text, map) = concatenate_scenes(&docs);
        assert_eq!(map[0].global_start, Some(2));
        assert_eq!(map[0].global_end, Some(3));
        // marker(1) + a1,a2(2,3) + blank(4) + marker(5) + b1(6)
        assert_eq!(map[1].global_start, Some(6));
        assert_eq!(map[1].global_end, Some(6));
    }

    #[test]
    fn global_range_maps_back_to_owning_scene_local_lines() {
        let docs = vec![
            ("a.md".to_string(), "a1\na2\n".to_string()),
            ("b.md".to_string(), "b1\nb2\n".to_string()),
        ];
        let (_text, map) = concatenate_scenes(&docs);
        let (scene, local_start, local_end) = map_global_range_to_scene(&map, Some(6), Some(7));
        assert_eq!(scene.as_deref(), Some("b.md"));
        assert_eq!(local_start, Some(1));
        assert_eq!(local_end, Some(2));
    }

    #[test]
    fn out_of_range_falls_back_to_last_scene() {
        let docs = vec![("a.md".to_string(), "a1\n".to_string())];
        let (_text, map) = concatenate_scenes(&docs);
        let (scene, local_start, _local_end) = map_global_range_to_scene(&map, Some(999), None);
        assert_eq!(scene.as_deref(), Some("a.md"));
        assert_eq!(local_start, Some(999));
    }
}
