//! Per-stage timing of a multi-step process, reported as one debug event.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Records named marks and emits the elapsed time between consecutive marks.
///
/// The timer starts with a `start` mark. Dropping an unfinished timer
/// finishes it, so early returns still produce the report.
pub struct StageTimer {
    process_name: String,
    fields: Vec<(&'static str, String)>,
    marks: Vec<(String, Instant)>,
    finished: bool,
}

impl StageTimer {
    pub fn new(process_name: impl Into<String>, fields: Vec<(&'static str, String)>) -> Self {
        Self {
            process_name: process_name.into(),
            fields,
            marks: vec![("start".to_string(), Instant::now())],
            finished: false,
        }
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    pub fn stage(&mut self, name: impl Into<String>) {
        let name = name.into();
        trace!(process_name = %self.process_name, stage = %name, "StageTimer mark");
        self.marks.push((name, Instant::now()));
    }

    /// `{from}_to_{to}` durations between consecutive marks
    pub fn stage_durations(&self) -> Vec<(String, Duration)> {
        self.marks
            .windows(2)
            .map(|pair| {
                let (from, from_at) = &pair[0];
                let (to, to_at) = &pair[1];
                (format!("{from}_to_{to}"), to_at.duration_since(*from_at))
            })
            .collect()
    }

    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.marks.push(("finish".to_string(), Instant::now()));

        let stages = self
            .stage_durations()
            .iter()
            .map(|(name, d)| format!("{name}={}", d.as_nanos()))
            .collect::<Vec<_>>()
            .join(" ");
        let fields = self
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        let total_runtime = match (self.marks.first(), self.marks.last()) {
            (Some((_, first)), Some((_, last))) => last.duration_since(*first).as_nanos(),
            _ => 0,
        };

        debug!(
            process_name = %self.process_name,
            fields = %fields,
            stages = %stages,
            total_runtime = total_runtime as u64,
            "StageTimer finished"
        );
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_durations_follow_marks() {
        let mut timer = StageTimer::new("collect", vec![("device_id", "a1".to_string())]);
        timer.stage("fetch");
        timer.stage("combine");

        let names: Vec<String> = timer
            .stage_durations()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["start_to_fetch", "fetch_to_combine"]);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut timer = StageTimer::new("push", Vec::new());
        timer.finish();
        timer.finish();

        assert!(timer.is_finished());
        let names: Vec<String> = timer
            .stage_durations()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["start_to_finish"]);
    }
}
