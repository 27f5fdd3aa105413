//! The `report_findings` tool schema the coordinator is forced to call
//! (SPEC_FULL §4.2 step 4), shaped to match what §4.3's validator expects
//! back.

use lc_domain::tool::ToolDefinition;

pub const REPORT_FINDINGS_TOOL_NAME: &str = "report_findings";

pub fn report_findings_tool() -> ToolDefinition {
    ToolDefinition {
        name: REPORT_FINDINGS_TOOL_NAME.to_string(),
        description: "Report the deduplicated, prioritised findings for this portion of the scene.".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "glossary_issues": {
                    "type": "array",
                    "items": { "type": "string" },
                },
                "summary": {
                    "type": "object",
                    "description": "Free-form per-group severity tally, e.g. {\"prose\": {\"critical\": 0, \"major\": 1, \"minor\": 2}}",
                },
                "conflicts": {
                    "type": "array",
                    "items": { "type": "string" },
                },
                "ambiguities": {
                    "type": "array",
                    "items": { "type": "string" },
                },
                "findings": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "number": { "type": "integer" },
                            "severity": { "type": "string", "enum": ["critical", "major", "minor"] },
                            "lens": { "type": "string" },
                            "location": { "type": "string" },
                            "line_start": { "type": ["integer", "null"] },
                            "line_end": { "type": ["integer", "null"] },
                            "evidence": { "type": "string" },
                            "impact": { "type": "string" },
                            "options": { "type": "array", "items": { "type": "string" } },
                            "flagged_by": { "type": "array", "items": { "type": "string" } },
                            "ambiguity_type": { "type": ["string", "null"] },
                        },
                        "required": ["number", "severity", "lens", "location", "evidence", "impact", "options"],
                    },
                },
            },
            "required": ["glossary_issues", "summary", "findings"],
        }),
    }
}
