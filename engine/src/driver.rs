//! Single-shot JSON-file engine invocation (spec §4.3, §6).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use board::MovePart;
use tempfile::NamedTempFile;

use crate::{Candidate, EngineError, EngineRequest, EngineResult};

/// Where the engine executable lives and how to invoke it (spec §6 "Engine
/// process contract"): a path, taken from environment, and a flag that runs
/// a bundled analysis script.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub executable: Option<PathBuf>,
    pub script_flag: String,
}

impl EngineConfig {
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            executable: None,
            script_flag: "--analyze".to_string(),
        }
    }
}

/// Drives the engine process. Owns no persistent state: every invocation is
/// independent (spec §9 "Stateful child process").
#[derive(Debug, Clone)]
pub struct EngineDriver {
    config: EngineConfig,
}

impl EngineDriver {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Whether an engine executable is configured (spec §3 "quizzes:
    /// {engineAvailable, ...}" tracks this per account after a crawl).
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.executable.is_some()
    }

    /// Analyze one position. Never returns `Err`: any failure to launch or
    /// parse the engine is folded into `engineAvailable: false` (spec §4.3,
    /// §7 "Engine unavailable").
    #[tracing::instrument(level = "info", skip(self), fields(match_id = %request.match_id))]
    pub async fn analyze(&self, request: &EngineRequest) -> EngineResult {
        let Some(executable) = self.config.executable.as_ref() else {
            tracing::warn!("engine executable not configured, skipping ply");
            return EngineResult::unavailable();
        };

        match self.invoke(executable, request).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "engine invocation failed, skipping ply");
                EngineResult::unavailable()
            }
        }
    }

    async fn invoke(
        &self,
        executable: &Path,
        request: &EngineRequest,
    ) -> Result<EngineResult, EngineError> {
        let request_file = NamedTempFile::new()?;
        let response_file = NamedTempFile::new()?;
        serde_json::to_writer(&request_file, request)?;

        tracing::debug!(
            request_path = %request_file.path().display(),
            response_path = %response_file.path().display(),
            "invoking engine"
        );

        let output = tokio::process::Command::new(executable)
            .arg(&self.config.script_flag)
            .env("GAMMONQUIZ_ENGINE_REQUEST", request_file.path())
            .env("GAMMONQUIZ_ENGINE_RESPONSE", response_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await?;

        match tokio::fs::read(response_file.path()).await {
            Ok(bytes) if !bytes.is_empty() => {
                let raw: RawResponse = serde_json::from_slice(&bytes)?;
                Ok(normalize(raw))
            }
            _ => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                tracing::debug!("no structured response, falling back to stdout parsing");
                Ok(parse_fallback_stdout(&stdout))
            }
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct RawCandidate {
    #[serde(rename = "move")]
    move_text: String,
    equity: Option<f64>,
    mwc: Option<f64>,
    /// Explicit repeat count, an alternative to the `(n)` text suffix.
    moves: Option<u32>,
}

#[derive(Debug, serde::Deserialize)]
struct RawResponse {
    #[serde(rename = "engineAvailable")]
    engine_available: bool,
    #[serde(default)]
    moves: Vec<RawCandidate>,
    raw: Option<String>,
}

fn normalize(raw: RawResponse) -> EngineResult {
    if !raw.engine_available {
        return EngineResult::unavailable();
    }
    let moves = raw.moves.into_iter().map(normalize_candidate).collect();
    EngineResult {
        engine_available: true,
        moves,
        raw: raw.raw,
    }
}

fn normalize_candidate(raw: RawCandidate) -> Candidate {
    let text = match raw.moves {
        Some(n) if n > 1 && !raw.move_text.contains('(') => format!("{}({})", raw.move_text, n),
        _ => raw.move_text.clone(),
    };
    let parts: Vec<MovePart> = board::parse_move_text(&text);

    let (equity, mwc) = match (raw.equity, raw.mwc) {
        (Some(eq), mwc) => (Some(eq), mwc),
        (None, Some(mwc)) => {
            let scaled = if mwc > 1.0 { mwc / 100.0 } else { mwc };
            (None, Some(scaled))
        }
        (None, None) => (None, None),
    };

    Candidate {
        move_text: raw.move_text,
        parts,
        equity,
        mwc,
    }
}

/// Extract candidates from stdout when the engine produced no structured
/// response file (spec §4.3 "Fallback parsing"). Lines must start with a
/// rank prefix `N.` or `N)` and contain `Eq.: <float>` or `MWC: <pct>%`.
fn parse_fallback_stdout(stdout: &str) -> EngineResult {
    let mut moves = Vec::new();
    for line in stdout.lines() {
        let Some(candidate) = parse_fallback_line(line) else {
            continue;
        };
        moves.push(candidate);
    }
    EngineResult {
        engine_available: true,
        moves,
        raw: Some(stdout.to_string()),
    }
}

fn parse_fallback_line(line: &str) -> Option<Candidate> {
    let trimmed = line.trim();
    let rest = strip_rank_prefix(trimmed)?;

    if let Some(idx) = rest.find("Eq.:") {
        let move_text = clean_move_text(&rest[..idx]);
        let value_str = rest[idx + "Eq.:".len()..]
            .split_whitespace()
            .next()?;
        let equity: f64 = value_str.parse().ok()?;
        let parts = board::parse_move_text(&move_text);
        return Some(Candidate {
            move_text,
            parts,
            equity: Some(equity),
            mwc: None,
        });
    }

    if let Some(idx) = rest.find("MWC:") {
        let move_text = clean_move_text(&rest[..idx]);
        let value_str = rest[idx + "MWC:".len()..].trim().trim_end_matches('%');
        let value_str = value_str.split_whitespace().next()?;
        let pct: f64 = value_str.parse().ok()?;
        let parts = board::parse_move_text(&move_text);
        return Some(Candidate {
            move_text,
            parts,
            equity: None,
            mwc: Some(pct / 100.0),
        });
    }

    None
}

fn strip_rank_prefix(line: &str) -> Option<&str> {
    let digits_end = line.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let marker = line.as_bytes().get(digits_end)?;
    if *marker != b'.' && *marker != b')' {
        return None;
    }
    Some(line[digits_end + 1..].trim_start())
}

fn clean_move_text(text: &str) -> String {
    let mut text = text.trim();
    for prefix in ["Cubeful", "Cubeless", "Rollout"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim_start();
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_engine_is_unavailable() {
        let driver = EngineDriver::new(EngineConfig::unconfigured());
        let request = EngineRequest {
            match_id: "cAkAAAAAAAAA".to_string(),
            position_id: Some("4HPwATDgc/ABMA".to_string()),
            position_index: None,
            dice: None,
        };
        let result = driver.analyze(&request).await;
        assert!(!result.engine_available);
        assert!(result.moves.is_empty());
    }

    #[test]
    fn fallback_stdout_parses_equity_lines() {
        let stdout = "1. 8/3 6/3               Eq.: +0.087\n2. 8/3 8/5               Eq.: -0.290\n";
        let result = parse_fallback_stdout(stdout);
        assert_eq!(result.moves.len(), 2);
        assert_eq!(result.moves[0].move_text, "8/3 6/3");
        assert_eq!(result.moves[0].equity, Some(0.087));
        assert_eq!(result.moves[1].equity, Some(-0.290));
    }

    #[test]
    fn fallback_stdout_parses_mwc_lines() {
        let stdout = "1) Cubeful 24/18 13/11      MWC: 54.3%\n";
        let result = parse_fallback_stdout(stdout);
        assert_eq!(result.moves.len(), 1);
        assert_eq!(result.moves[0].move_text, "24/18 13/11");
        assert_eq!(result.moves[0].mwc, Some(0.543));
    }

    #[test]
    fn explicit_repeat_count_expands_like_shorthand() {
        let raw = RawCandidate {
            move_text: "8/5".to_string(),
            equity: Some(0.1),
            mwc: None,
            moves: Some(2),
        };
        let candidate = normalize_candidate(raw);
        assert_eq!(candidate.parts.len(), 2);
    }

    #[test]
    fn mwc_percent_is_scaled_into_unit_range() {
        let raw = RawCandidate {
            move_text: "8/5".to_string(),
            equity: None,
            mwc: Some(54.3),
            moves: None,
        };
        let candidate = normalize_candidate(raw);
        assert_eq!(candidate.equity, None);
        assert!((candidate.mwc.unwrap() - 0.543).abs() < 1e-9);
    }
}
