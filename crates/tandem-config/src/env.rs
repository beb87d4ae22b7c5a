use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Failure while expanding `{{ env.VAR }}` placeholders
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    /// Placeholder references a variable that is unset and has no default
    #[error("environment variable not found: `{0}`")]
    MissingVariable(String),

    /// Placeholder uses a scope other than `env.`
    #[error("only variables scoped with 'env.' are supported: `{0}`")]
    UnsupportedScope(String),
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Group 1: dotted key, group 2: optional `default("...")` value
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#).expect("must be valid regex")
    })
}

/// Expand `{{ env.VAR }}` and `{{ env.VAR | default("x") }}` in raw TOML text
///
/// TOML comment lines are copied verbatim so commented-out secrets never
/// have to exist in the environment.
pub fn expand_env(input: &str) -> Result<String, ExpandError> {
    let mut lines = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
        } else {
            lines.push(expand_line(line)?);
        }
    }

    let mut output = lines.join("\n");
    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

fn expand_line(line: &str) -> Result<String, ExpandError> {
    let mut failure = None;

    let expanded = placeholder().replace_all(line, |captures: &Captures<'_>| {
        let key = &captures[1];
        let default = captures.get(2).map(|m| m.as_str());

        match resolve(key, default) {
            Ok(value) => value,
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(expanded.into_owned()),
    }
}

fn resolve(key: &str, default: Option<&str>) -> Result<String, ExpandError> {
    let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(ExpandError::UnsupportedScope(key.to_owned()));
    };

    std::env::var(var_name)
        .ok()
        .or_else(|| default.map(str::to_owned))
        .ok_or_else(|| ExpandError::MissingVariable(var_name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "deployment_id = \"d123\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_single_variable() {
        temp_env::with_var("TANDEM_RG", Some("shared"), || {
            let result = expand_env("resource_group = \"{{ env.TANDEM_RG }}\"").unwrap();
            assert_eq!(result, "resource_group = \"shared\"");
        });
    }

    #[test]
    fn expands_several_variables_across_lines() {
        let vars = [("TANDEM_A", Some("a")), ("TANDEM_B", Some("b"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("a = \"{{ env.TANDEM_A }}\"\nb = \"{{env.TANDEM_B}}\"").unwrap();
            assert_eq!(result, "a = \"a\"\nb = \"b\"");
        });
    }

    #[test]
    fn missing_variable_is_reported_by_name() {
        temp_env::with_var_unset("TANDEM_MISSING", || {
            let err = expand_env("x = \"{{ env.TANDEM_MISSING }}\"").unwrap_err();
            assert_eq!(err, ExpandError::MissingVariable("TANDEM_MISSING".to_owned()));
        });
    }

    #[test]
    fn foreign_scope_is_rejected() {
        let err = expand_env("x = \"{{ vault.TOKEN }}\"").unwrap_err();
        assert_eq!(err, ExpandError::UnsupportedScope("vault.TOKEN".to_owned()));
    }

    #[test]
    fn comment_lines_are_not_expanded() {
        temp_env::with_var_unset("TANDEM_MISSING", || {
            let input = "  # x = \"{{ env.TANDEM_MISSING }}\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }

    #[test]
    fn default_applies_only_when_unset() {
        temp_env::with_var_unset("TANDEM_OPTIONAL", || {
            let result = expand_env("x = \"{{ env.TANDEM_OPTIONAL | default(\"fallback\") }}\"").unwrap();
            assert_eq!(result, "x = \"fallback\"");
        });

        temp_env::with_var("TANDEM_OPTIONAL", Some("set"), || {
            let result = expand_env("x = \"{{ env.TANDEM_OPTIONAL | default(\"fallback\") }}\"").unwrap();
            assert_eq!(result, "x = \"set\"");
        });
    }
}
