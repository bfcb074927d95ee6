use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::entities::probe_result::Observation;
use crate::domain::ports::probe::{Probe, ProbeContext, ProbeError};
use crate::domain::value_objects::{Facet, FieldMap, FieldValue, ProbeStatus};

/// `sshd_config` keywords that matter for exposure.
const SECURITY_KEYS: &[&str] = &[
    "Port",
    "PermitRootLogin",
    "PasswordAuthentication",
    "PubkeyAuthentication",
    "ChallengeResponseAuthentication",
    "KbdInteractiveAuthentication",
    "UsePAM",
    "AuthenticationMethods",
    "AllowUsers",
    "AllowGroups",
    "DenyUsers",
    "DenyGroups",
];

/// sshd's own nesting limit for `Include`.
const MAX_INCLUDE_DEPTH: u8 = 16;

/// Reads the global section of `sshd_config`.
pub struct SshProbe;

/// Splits a directive into keyword and value. sshd accepts both
/// `Keyword value` and `Keyword=value`, with optional spaces around `=`.
fn split_directive(line: &str) -> Option<(&str, &str)> {
    let end = line.find(|c: char| c.is_whitespace() || c == '=')?;
    let (keyword, rest) = line.split_at(end);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest).trim();
    (!keyword.is_empty()).then_some((keyword, rest))
}

fn strip_comment(raw: &str) -> &str {
    raw.split('#').next().unwrap_or_default().trim()
}

fn is_match_line(raw: &str) -> bool {
    split_directive(strip_comment(raw)).is_some_and(|(k, _)| k.eq_ignore_ascii_case("Match"))
}

/// Files named by an `Include` value, each pattern globbed relative to
/// `base` and expanded in lexical order.
fn resolve_include(patterns: &str, base: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for pattern in patterns.split_whitespace() {
        let full = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            base.join(pattern)
        };
        match glob::glob(&full.to_string_lossy()) {
            Ok(paths) => files.extend(paths.filter_map(Result::ok)),
            Err(e) => tracing::warn!("Ignoring Include {pattern}: {e}"),
        }
    }
    files
}

/// Inlines `Include` directives at the point where they appear, as sshd
/// reads them. A `Match` block inside an included file ends with that file.
/// Expansion stops at the first top-level `Match`.
#[must_use]
pub fn expand_includes(text: &str, base: &Path) -> String {
    expand_at_depth(text, base, 0)
}

fn expand_at_depth(text: &str, base: &Path, depth: u8) -> String {
    let mut out = String::new();
    for raw in text.lines() {
        match split_directive(strip_comment(raw)) {
            Some((keyword, patterns)) if keyword.eq_ignore_ascii_case("Include") => {
                if depth >= MAX_INCLUDE_DEPTH {
                    tracing::warn!("Include nesting too deep, skipping {patterns}");
                    continue;
                }
                for file in resolve_include(patterns, base) {
                    match std::fs::read_to_string(&file) {
                        Ok(included) => {
                            let expanded = expand_at_depth(&included, base, depth + 1);
                            for line in expanded.lines().take_while(|l| !is_match_line(l)) {
                                out.push_str(line);
                                out.push('\n');
                            }
                        }
                        Err(e) => tracing::debug!("Skipping {}: {e}", file.display()),
                    }
                }
            }
            Some((keyword, _)) if keyword.eq_ignore_ascii_case("Match") => {
                out.push_str(raw);
                out.push('\n');
                break;
            }
            _ => {
                out.push_str(raw);
                out.push('\n');
            }
        }
    }
    out
}

/// Parses the security keywords of an `sshd_config`, keyed by their
/// canonical spelling. Repeated keywords keep every value in order.
/// Parsing stops at the first `Match` block, whose settings are conditional.
#[must_use]
pub fn parse_sshd_config(text: &str) -> FieldMap {
    let mut values: Vec<(&'static str, Vec<String>)> = Vec::new();

    for raw in text.lines() {
        let Some((keyword, rest)) = split_directive(strip_comment(raw)) else {
            continue;
        };
        if keyword.eq_ignore_ascii_case("Match") {
            break;
        }
        let Some(canonical) = SECURITY_KEYS
            .iter()
            .find(|k| k.eq_ignore_ascii_case(keyword))
        else {
            continue;
        };
        let value = rest.split_whitespace().collect::<Vec<_>>().join(" ");
        if value.is_empty() {
            continue;
        }
        match values.iter_mut().find(|(k, _)| k == canonical) {
            Some((_, list)) => list.push(value),
            None => values.push((canonical, vec![value])),
        }
    }

    values
        .into_iter()
        .map(|(key, mut list)| {
            let value = if list.len() == 1 {
                FieldValue::Text(list.remove(0))
            } else {
                FieldValue::List(list.into_iter().map(FieldValue::Text).collect())
            };
            (key.to_string(), value)
        })
        .collect()
}

/// First value of a keyword; sshd honours the first occurrence.
fn first_value<'a>(config: &'a FieldMap, key: &str) -> Option<&'a str> {
    match config.get(key)? {
        FieldValue::Text(v) => Some(v),
        FieldValue::List(items) => items.first().and_then(FieldValue::as_text),
        _ => None,
    }
}

/// Status and details for a parsed configuration.
#[must_use]
pub fn assess(config: &FieldMap) -> (ProbeStatus, String) {
    let mut findings = Vec::new();
    if first_value(config, "PermitRootLogin").is_some_and(|v| v.eq_ignore_ascii_case("yes")) {
        findings.push("root login permitted");
    }
    if first_value(config, "PasswordAuthentication").is_some_and(|v| v.eq_ignore_ascii_case("yes"))
    {
        findings.push("password authentication enabled");
    }

    let port = first_value(config, "Port").unwrap_or("22");
    if findings.is_empty() {
        (ProbeStatus::Ok, format!("port={port}"))
    } else {
        (
            ProbeStatus::Warn,
            format!("port={port}, {}", findings.join(", ")),
        )
    }
}

#[async_trait]
impl Probe for SshProbe {
    fn facet(&self) -> Facet {
        Facet::Ssh
    }

    async fn collect(&self, ctx: &ProbeContext) -> Result<Observation, ProbeError> {
        let path = &ctx.settings.ssh.config_path;
        let text = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ProbeError::ToolMissing(format!("{} not found", path.display()))
            }
            _ => ProbeError::from(e),
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("/etc/ssh"));
        let config = parse_sshd_config(&expand_includes(&text, base));
        let (status, details) = assess(&config);

        let mut data = FieldMap::new();
        data.insert("path".into(), FieldValue::text(path.display().to_string()));
        data.insert("config".into(), FieldValue::Map(config));
        Ok(Observation::new(status, details, data))
    }
}
