use once_cell::sync::Lazy;
use regex::Regex;

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+]+)",
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s]+)",
        r"(?i)(AWS_[A-Z_]+=)([^\s]+)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("redaction pattern"))
    .collect()
});

/// Redact values that look like secrets before a render-log line is
/// forwarded. Render wrappers frequently echo their environment on startup.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in SECRET_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}<redacted>")
            })
            .to_string();
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_env_style_secrets() {
        let line = "env: LICENSE_TOKEN=abc123 NUKE_PATH=/opt/nuke";
        let redacted = redact_sensitive(line);
        assert!(redacted.contains("LICENSE_TOKEN=<redacted>"));
        assert!(redacted.contains("NUKE_PATH=/opt/nuke"));
    }

    #[test]
    fn redacts_authorization_headers() {
        let redacted = redact_sensitive("Authorization: Bearer.abc123");
        assert_eq!(redacted, "Authorization: <redacted>");
    }

    #[test]
    fn plain_render_output_is_untouched() {
        let line = "Writing /mnt/out/frame.0001.exr took 1.2 seconds";
        assert_eq!(redact_sensitive(line), line);
    }
}
