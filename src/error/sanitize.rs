//! Credential scrubbing for diagnostic text

use once_cell::sync::Lazy;
use regex::Regex;

use crate::sql::Dialect;

const REDACTED: &str = "***";

static RE_QUOTED_SECRETS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)((?:AWS_KEY_ID|AWS_SECRET_KEY|AWS_TOKEN|AZURE_SAS_TOKEN|SECRET|IDENTIFIED\s+BY|USER)\s*=?\s*)'(?:[^'\\]|\\.|'')*'",
    )
    .expect("Invalid regex")
});
static RE_SAS_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([?&]sig=)[^&\s'\x22]+").expect("Invalid regex"));
static RE_JSON_SECRETS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)("(?:ACCESS_ID|ACCESS_KEY|SECRET)"\s*:\s*)"[^"]*""#).expect("Invalid regex")
});

/// Remove credentials from a diagnostic message
///
/// Scrubs well-known credential clauses (`AWS_SECRET_KEY = '...'`,
/// `AZURE_SAS_TOKEN = '...'`, `IDENTIFIED BY '...'`, SAS `sig=` parameters)
/// and every occurrence of the caller-known `secrets`, raw or as rendered
/// inside a SQL string literal.
pub fn sanitize(text: &str, secrets: &[&str]) -> String {
    let mut cleaned = RE_QUOTED_SECRETS
        .replace_all(text, format!("${{1}}'{}'", REDACTED).as_str())
        .into_owned();
    cleaned = RE_SAS_SIGNATURE
        .replace_all(&cleaned, format!("${{1}}{}", REDACTED).as_str())
        .into_owned();
    cleaned = RE_JSON_SECRETS
        .replace_all(&cleaned, format!("${{1}}\"{}\"", REDACTED).as_str())
        .into_owned();

    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        for form in literal_forms(secret) {
            cleaned = cleaned.replace(&form, REDACTED);
        }
    }
    cleaned
}

/// A secret as it appears inside string literals of each escaping style,
/// escaped forms first
fn literal_forms(secret: &str) -> Vec<String> {
    let mut forms: Vec<String> = [Dialect::Snowflake, Dialect::Exasol]
        .iter()
        .map(|dialect| {
            let quoted = dialect.quote(secret);
            quoted[1..quoted.len() - 1].to_string()
        })
        .filter(|form| form != secret)
        .collect();
    forms.dedup();
    forms.push(secret.to_string());
    forms
}
