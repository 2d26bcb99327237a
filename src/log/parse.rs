use crate::log::summary::{LogProblem, RunSummary, Severity};
use anyhow::Context;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Compiled patterns for the module exit summaries and ERS severities.
///
/// Expected lines (one per module instance, prefix varies):
/// ```text
/// rdlg0: Exiting the do_work() method, generated 31 lists and successfully sent 62 copies.
/// lr0: Exiting do_work() method, received 31 lists and successfully sent 31.
/// lrv: Exiting do_work() method, received 31 reversed lists, compared 31 of them to their original data, and found 0 mismatches.
/// ```
pub struct LogScraper {
    generator: Regex,
    reverser: Regex,
    validator: Regex,
    severity: Regex,
    ignore: Vec<Regex>,
}

impl LogScraper {
    /// `ignore` patterns exempt matching lines from the problem report.
    pub fn new(ignore: &[String]) -> anyhow::Result<Self> {
        let ignore = ignore
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("bad ignore pattern {:?}", p)))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            // The stop-time variant reads "generated N lists, and sent M list messages".
            generator: Regex::new(
                r"generated ([0-9]+) lists,? and (?:successfully )?sent ([0-9]+) (?:copies|list messages)",
            )?,
            reverser: Regex::new(r"received ([0-9]+) lists and successfully sent ([0-9]+)\.")?,
            validator: Regex::new(
                r"received ([0-9]+) reversed lists, compared ([0-9]+) of them to their original data, and found ([0-9]+) mismatches\.",
            )?,
            severity: Regex::new(r"\b(WARNING|ERROR|FATAL)\b")?,
            ignore,
        })
    }

    /// Fold one line into `summary`. Returns the line's severity if it is a
    /// warning or error that no ignore pattern exempts.
    pub fn scrape_line(
        &self,
        summary: &mut RunSummary,
        line: &str,
    ) -> anyhow::Result<Option<Severity>> {
        if line.contains("Exiting") {
            if let Some(caps) = self.generator.captures(line) {
                summary.generator.modules += 1;
                summary.generator.generated += caps[1].parse::<u64>()?;
                summary.generator.sent += caps[2].parse::<u64>()?;
            } else if let Some(caps) = self.validator.captures(line) {
                summary.validator.modules += 1;
                summary.validator.received_reversed += caps[1].parse::<u64>()?;
                summary.validator.compared += caps[2].parse::<u64>()?;
                let found = caps[3].parse::<u64>()?;
                summary.validator.mismatches = Some(summary.validator.mismatches.unwrap_or(0) + found);
            } else if let Some(caps) = self.reverser.captures(line) {
                summary.reverser.modules += 1;
                summary.reverser.received += caps[1].parse::<u64>()?;
                summary.reverser.sent += caps[2].parse::<u64>()?;
            }
        }

        let Some(caps) = self.severity.captures(line) else {
            return Ok(None);
        };
        if self.ignore.iter().any(|re| re.is_match(line)) {
            return Ok(None);
        }
        let severity = match &caps[1] {
            "WARNING" => Severity::Warning,
            "ERROR" => Severity::Error,
            _ => Severity::Fatal,
        };
        Ok(Some(severity))
    }

    /// Scrape one log file into `summary`.
    pub fn scrape_file(&self, path: &Path, summary: &mut RunSummary) -> anyhow::Result<()> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read log file {}", path.display()))?;

        for (lineno, line) in text.lines().enumerate() {
            let lno = lineno + 1;
            let severity = self
                .scrape_line(summary, line)
                .with_context(|| format!("log parse error at {}:{}", path.display(), lno))?;
            if let Some(severity) = severity {
                summary.problems.push(LogProblem {
                    path: path.to_path_buf(),
                    line: lno,
                    severity,
                    text: line.trim_end().to_string(),
                });
            }
        }
        summary.files += 1;
        Ok(())
    }
}

/// Scrape every log file of a session.
pub fn scrape_logs<P: AsRef<Path>>(paths: &[P], ignore: &[String]) -> anyhow::Result<RunSummary> {
    let scraper = LogScraper::new(ignore)?;
    let mut summary = RunSummary::default();
    for path in paths {
        scraper.scrape_file(path.as_ref(), &mut summary)?;
    }
    tracing::debug!(
        files = summary.files,
        problems = summary.problems.len(),
        "scraped logs"
    );
    Ok(summary)
}
