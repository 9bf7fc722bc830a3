//! Name formatters and the derived CSI driver name
//!
//! Formatters are small templates with `{app}` and `{name}` placeholders,
//! e.g. `"{app}-{name}"`. Literal braces are written `{{` and `}}`.

use tracing::warn;

use crate::config::{CSI_DRIVER_FORMATTER, ConfigView};
use crate::error::{CoreError, Result};

/// Upstream CSI driver identifier
pub const DRIVER_NAME: &str = "rawfile.csi.openebs.io";

/// Render a formatter template with the given placeholder values
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let err = |message: String| CoreError::Format {
        template: template.to_string(),
        message,
    };

    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => key.push(ch),
                        None => return Err(err("unterminated placeholder".to_string())),
                    }
                }
                let value = vars
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| err(format!("unknown placeholder '{{{}}}'", key)))?;
                out.push_str(value);
            }
            '}' => return Err(err("single '}' encountered".to_string())),
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Rename `name` through an optional formatter, keeping `name` on any failure
pub fn format_name(formatter: Option<&str>, app: &str, name: &str) -> String {
    let Some(template) = formatter else {
        return name.to_string();
    };

    match render(template, &[("app", app), ("name", name)]) {
        Ok(formatted) => formatted,
        Err(e) => {
            warn!(error = %e, name, "Formatter failed, keeping original name");
            name.to_string()
        }
    }
}

/// Compute the CSI driver name for an application
///
/// Renders the configured `csi-driver-formatter` with the upstream driver
/// identifier and the application name, or returns the upstream identifier
/// unchanged when no formatter is configured.
pub fn csi_driver_name(config: &ConfigView, app: &str) -> String {
    let formatter = config.get_str(CSI_DRIVER_FORMATTER);
    if formatter.is_none() {
        warn!(
            option = CSI_DRIVER_FORMATTER,
            default = DRIVER_NAME,
            "Driver formatter missing in configuration, using default driver name"
        );
    }
    format_name(formatter, app, DRIVER_NAME)
}
