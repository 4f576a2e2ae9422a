/// Removes a surrounding Markdown code fence (```sql ... ``` or ``` ... ```).
pub fn strip_code_fence(raw: &str) -> String {
    let text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let body_start = rest.find('\n').map(|i| i + 1).unwrap_or(rest.len());
        let body = &rest[body_start..];
        let body = body.strip_suffix("```").unwrap_or(body);
        return body.trim().to_string();
    }
    text.to_string()
}

/// Cuts the outermost JSON object out of a model reply that may carry prose
/// or code fences around it.
pub fn clean_json_output(raw: &str) -> String {
    if let Some(start) = raw.find('{') {
        if let Some(end) = raw.rfind('}') {
            if end > start {
                return raw[start..=end].to_string();
            }
        }
    }
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```sql\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(strip_code_fence("```\nSELECT 2\n```\n"), "SELECT 2");
        assert_eq!(strip_code_fence("  SELECT 3  "), "SELECT 3");
    }

    #[test]
    fn test_clean_json_output() {
        assert_eq!(
            clean_json_output("Here you go:\n```json\n{\"a\": {\"b\": 1}}\n```"),
            "{\"a\": {\"b\": 1}}"
        );
        assert_eq!(clean_json_output("no json"), "no json");
    }
}
