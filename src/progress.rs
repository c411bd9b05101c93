use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::{Duration, Instant};

const MAX_STORED_WARNINGS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum ProgressMode {
    Auto,
    Rich,
    Plain,
    Quiet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedProgressMode {
    Rich,
    Plain,
    Quiet,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressConfig {
    pub mode: ProgressMode,
    pub plain_interval: Duration,
    tty_override: Option<bool>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            mode: ProgressMode::Auto,
            plain_interval: Duration::from_secs(2),
            tty_override: None,
        }
    }
}

impl ProgressConfig {
    pub fn new(mode: ProgressMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn with_tty_override(mut self, is_tty: bool) -> Self {
        self.tty_override = Some(is_tty);
        self
    }

    pub fn resolve_mode(self) -> ResolvedProgressMode {
        self.mode.resolve(
            self.tty_override
                .unwrap_or_else(|| std::io::stderr().is_terminal()),
        )
    }
}

impl ProgressMode {
    fn resolve(self, stderr_is_tty: bool) -> ResolvedProgressMode {
        match self {
            ProgressMode::Auto => {
                if stderr_is_tty {
                    ResolvedProgressMode::Rich
                } else {
                    ResolvedProgressMode::Plain
                }
            }
            ProgressMode::Rich => ResolvedProgressMode::Rich,
            ProgressMode::Plain => ResolvedProgressMode::Plain,
            ProgressMode::Quiet => ResolvedProgressMode::Quiet,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressOutcome {
    pub elapsed: Duration,
    pub total_items: u64,
    pub processed_items: u64,
    pub warning_count: usize,
    pub warnings: Vec<String>,
}

/// Item-count progress for one batch run (videos packed, list lines written).
/// Also the run's log sink: `[INFO]`/`[WARN]` lines go through here so they do
/// not tear the rich progress bar.
pub struct ProgressReporter {
    label: String,
    unit: &'static str,
    mode: ResolvedProgressMode,
    plain_interval: Duration,
    started: Instant,
    last_plain_emit: Option<Instant>,
    stage: String,
    total_items: u64,
    processed_items: u64,
    warning_count: usize,
    warnings: Vec<String>,
    bar: Option<ProgressBar>,
    finalized: bool,
}

impl ProgressReporter {
    pub fn new(
        label: impl Into<String>,
        unit: &'static str,
        total_items: u64,
        config: ProgressConfig,
    ) -> Self {
        let label = label.into();
        let mode = config.resolve_mode();
        let bar = if mode == ResolvedProgressMode::Rich {
            Some(rich_bar(&label, unit, total_items))
        } else {
            None
        };

        Self {
            label,
            unit,
            mode,
            plain_interval: config.plain_interval,
            started: Instant::now(),
            last_plain_emit: None,
            stage: "starting".to_string(),
            total_items,
            processed_items: 0,
            warning_count: 0,
            warnings: Vec::new(),
            bar,
            finalized: false,
        }
    }

    pub fn set_total(&mut self, total_items: u64) {
        self.total_items = total_items;
        if let Some(bar) = &self.bar {
            bar.set_length(total_items.max(1));
        }
    }

    pub fn set_stage(&mut self, stage: impl Into<String>) {
        self.stage = stage.into();
        match self.mode {
            ResolvedProgressMode::Rich => {
                if let Some(bar) = &self.bar {
                    bar.set_message(self.stage.clone());
                }
            }
            ResolvedProgressMode::Plain => self.render_plain(),
            ResolvedProgressMode::Quiet => {}
        }
    }

    pub fn inc(&mut self, delta: u64) {
        if delta == 0 {
            return;
        }
        self.processed_items = self.processed_items.saturating_add(delta);
        if self.total_items > 0 {
            self.processed_items = self.processed_items.min(self.total_items);
        }
        match self.mode {
            ResolvedProgressMode::Rich => {
                if let Some(bar) = &self.bar {
                    bar.set_position(self.processed_items);
                }
            }
            ResolvedProgressMode::Plain => {
                let now = Instant::now();
                let due = self
                    .last_plain_emit
                    .map_or(true, |last| now.duration_since(last) >= self.plain_interval);
                if due {
                    self.render_plain();
                }
            }
            ResolvedProgressMode::Quiet => {}
        }
    }

    pub fn log(&self, message: impl AsRef<str>) {
        if self.mode != ResolvedProgressMode::Quiet {
            self.emit_message("INFO", message.as_ref());
        }
    }

    /// Warnings are printed in every mode, quiet included.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.emit_message("WARN", &message);
        self.warning_count += 1;
        if self.warnings.len() >= MAX_STORED_WARNINGS {
            self.warnings.remove(0);
        }
        self.warnings.push(message);
    }

    pub fn finish(mut self, final_message: impl Into<String>) -> ProgressOutcome {
        self.finalize(Some(final_message.into()))
    }

    fn finalize(&mut self, final_message: Option<String>) -> ProgressOutcome {
        if !self.finalized {
            self.finalized = true;
            match self.mode {
                ResolvedProgressMode::Quiet => {}
                ResolvedProgressMode::Plain => {
                    self.render_plain();
                    if let Some(msg) = final_message.as_deref() {
                        eprintln!("[DONE] {}: {}", self.label, msg);
                    }
                }
                ResolvedProgressMode::Rich => {
                    if let Some(bar) = &self.bar {
                        match final_message {
                            Some(msg) => bar.finish_with_message(msg),
                            None => bar.finish_and_clear(),
                        }
                    }
                }
            }
        }

        ProgressOutcome {
            elapsed: self.started.elapsed(),
            total_items: self.total_items,
            processed_items: self.processed_items,
            warning_count: self.warning_count,
            warnings: self.warnings.clone(),
        }
    }

    fn render_plain(&mut self) {
        self.last_plain_emit = Some(Instant::now());
        let elapsed = self.started.elapsed();
        let rate = average_rate(self.processed_items, elapsed);
        let pct = if self.total_items == 0 {
            0.0
        } else {
            (self.processed_items as f64 / self.total_items as f64) * 100.0
        };
        eprintln!(
            "[PROGRESS] {} elapsed={} stage={} done={} / {} {} ({:.1}%) rate={} ETA={}",
            self.label,
            format_duration(elapsed),
            self.stage,
            self.processed_items,
            self.total_items,
            self.unit,
            pct,
            format_rate(rate, self.unit),
            format_eta(compute_eta(self.total_items, self.processed_items, rate)),
        );
    }

    fn emit_message(&self, level: &str, message: &str) {
        let line = format!("[{}] {}: {}", level, self.label, message);
        match &self.bar {
            Some(bar) if !bar.is_finished() => bar.println(line),
            _ => eprintln!("{}", line),
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        let _ = self.finalize(None);
    }
}

fn rich_bar(label: &str, unit: &str, total_items: u64) -> ProgressBar {
    let bar = ProgressBar::new(total_items.max(1));
    let template = format!(
        "{{spinner:.green}} [{{elapsed_precise}}] {{wide_bar:.cyan/blue}} {{pos}}/{{len}} {} ETA {{eta_precise}} | {{msg}}",
        unit
    );
    let style = ProgressStyle::with_template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar.set_message(format!("{} starting", label));
    bar
}

fn average_rate(items: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64().max(1e-6);
    items as f64 / secs
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

fn format_rate(per_sec: f64, unit: &str) -> String {
    if per_sec <= 0.01 {
        format!("0 {}/s", unit)
    } else {
        format!("{:.1} {}/s", per_sec, unit)
    }
}

fn format_eta(eta: Option<Duration>) -> String {
    eta.map(format_duration)
        .unwrap_or_else(|| "--:--".to_string())
}

fn compute_eta(total: u64, processed: u64, per_sec: f64) -> Option<Duration> {
    if per_sec <= 0.01 || processed >= total {
        return None;
    }
    let remaining = total.saturating_sub(processed) as f64;
    Some(Duration::from_secs_f64((remaining / per_sec).max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_resolution_respects_tty_override() {
        let cfg_tty = ProgressConfig::new(ProgressMode::Auto).with_tty_override(true);
        assert_eq!(cfg_tty.resolve_mode(), ResolvedProgressMode::Rich);

        let cfg_not_tty = ProgressConfig::new(ProgressMode::Auto).with_tty_override(false);
        assert_eq!(cfg_not_tty.resolve_mode(), ResolvedProgressMode::Plain);

        let cfg_quiet = ProgressConfig::new(ProgressMode::Quiet).with_tty_override(true);
        assert_eq!(cfg_quiet.resolve_mode(), ResolvedProgressMode::Quiet);
    }

    #[test]
    fn eta_computation_uses_remaining_items() {
        let eta = compute_eta(100, 25, 5.0).expect("eta should exist");
        assert_eq!(eta.as_secs(), 15);

        assert!(compute_eta(10, 10, 100.0).is_none());
        assert!(compute_eta(10, 1, 0.0).is_none());
    }

    #[test]
    fn duration_formatting_switches_to_hours() {
        assert_eq!(format_duration(Duration::from_secs(75)), "01:15");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "01:02:05");
    }

    #[test]
    fn warnings_are_counted_beyond_storage_cap() {
        let mut reporter = ProgressReporter::new(
            "test",
            "items",
            1,
            ProgressConfig::new(ProgressMode::Quiet),
        );
        for i in 0..(MAX_STORED_WARNINGS + 5) {
            reporter.warn(format!("w{}", i));
        }
        reporter.inc(3);
        let outcome = reporter.finish("done");
        assert_eq!(outcome.warning_count, MAX_STORED_WARNINGS + 5);
        assert_eq!(outcome.warnings.len(), MAX_STORED_WARNINGS);
        assert_eq!(outcome.warnings[0], "w5");
        assert_eq!(outcome.processed_items, 1);
    }
}
