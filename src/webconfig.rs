// ABOUTME: Writes the environment side-channel file and patches web.config.
// ABOUTME: The patch routes all requests through the managed pipeline.

use std::path::Path;

use crate::deploy::DeployError;

/// Side-channel file the application reads at startup to select its
/// environment.
pub const ENVIRONMENT_FILE: &str = "environment.txt";

/// Structured config document patched for the classic server variant.
pub const APP_CONFIG_FILE: &str = "web.config";

const PIPELINE_ELEMENT: &str = r#"<modules runAllManagedModulesForAllRequests="true" />"#;
const SERVER_SECTION: &str = "system.webServer";
const SERVER_SECTION_OPEN: &str = "<system.webServer>";
const SERVER_SECTION_CLOSE: &str = "</system.webServer>";
const CONFIGURATION: &str = "configuration";

/// Write `ENVIRONMENT=<name>` into the published web root.
pub async fn write_environment_file(web_root: &Path, environment: &str) -> Result<(), DeployError> {
    let path = web_root.join(ENVIRONMENT_FILE);
    tokio::fs::write(&path, format!("ENVIRONMENT={environment}\n"))
        .await
        .map_err(|e| {
            DeployError::Configuration(format!(
                "failed to write environment file {}: {e}",
                path.display()
            ))
        })
}

/// Patch the application's `web.config` so every request is routed through
/// the managed pipeline. Required only for the classic server variant.
pub async fn enable_managed_pipeline(web_root: &Path) -> Result<(), DeployError> {
    let path = web_root.join(APP_CONFIG_FILE);
    let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
        DeployError::Configuration(format!("failed to read {}: {e}", path.display()))
    })?;

    let patched = insert_pipeline_flag(&text)?;
    tokio::fs::write(&path, patched).await.map_err(|e| {
        DeployError::Configuration(format!("failed to write {}: {e}", path.display()))
    })
}

/// Insert the pipeline element under `<system.webServer>`, creating the
/// section when the document lacks one. Idempotent on already-patched input.
fn insert_pipeline_flag(text: &str) -> Result<String, DeployError> {
    if text.contains("runAllManagedModulesForAllRequests") {
        return Ok(text.to_string());
    }

    if let Some(insert_at) = find_open_tag_end(text, SERVER_SECTION) {
        let mut patched = String::with_capacity(text.len() + PIPELINE_ELEMENT.len() + 8);
        patched.push_str(&text[..insert_at]);
        patched.push_str("\n    ");
        patched.push_str(PIPELINE_ELEMENT);
        patched.push_str(&text[insert_at..]);
        return Ok(patched);
    }

    if let Some(insert_at) = find_open_tag_end(text, CONFIGURATION) {
        let mut patched = String::with_capacity(text.len() + 96);
        patched.push_str(&text[..insert_at]);
        patched.push_str("\n  ");
        patched.push_str(SERVER_SECTION_OPEN);
        patched.push_str("\n    ");
        patched.push_str(PIPELINE_ELEMENT);
        patched.push_str("\n  ");
        patched.push_str(SERVER_SECTION_CLOSE);
        patched.push_str(&text[insert_at..]);
        return Ok(patched);
    }

    Err(DeployError::Configuration(
        "web.config has no <configuration> element".to_string(),
    ))
}

/// Find the end of the opening tag for `name`, tolerating attributes
/// (`<configuration xmlns="...">` as well as `<configuration>`). Returns the
/// index just past the closing `>`, skipping self-closing tags since they
/// cannot hold children.
fn find_open_tag_end(text: &str, name: &str) -> Option<usize> {
    let needle = format!("<{name}");
    let mut from = 0;
    while let Some(rel) = text[from..].find(&needle) {
        let after = from + rel + needle.len();
        let rest = &text[after..];
        // The tag name must end here, not be a prefix of a longer name.
        if rest.starts_with('>') {
            return Some(after + 1);
        }
        if rest.starts_with(|c: char| c.is_ascii_whitespace()) {
            let close = rest.find('>')?;
            if !rest[..close].trim_end().ends_with('/') {
                return Some(after + close + 1);
            }
        }
        from = after;
    }
    None
}
