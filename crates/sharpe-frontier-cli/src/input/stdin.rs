use serde_json::Value;
use std::io::{self, Read};

/// Run config piped on stdin, as JSON or YAML.
///
/// Returns None when stdin is a terminal or carries only whitespace.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_config_text(&buffer)
}

/// A leading `{` selects JSON; anything else is read as YAML.
fn parse_config_text(text: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value = if trimmed.starts_with('{') {
        serde_json::from_str(trimmed)
            .map_err(|e| format!("Failed to parse JSON config from stdin: {}", e))?
    } else {
        serde_yaml::from_str(trimmed)
            .map_err(|e| format!("Failed to parse YAML config from stdin: {}", e))?
    };
    if !value.is_object() {
        return Err("Config on stdin must be a mapping of settings".into());
    }
    Ok(Some(value))
}
