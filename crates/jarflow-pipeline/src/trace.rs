//! 実行トレース

use std::fmt;

/// タスクの状態遷移
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Started(String),
    Finished(String),
    /// 入力が変わっていないためスキップ
    UpToDate(String),
    Failed { task: String, message: String },
}

impl TraceEvent {
    pub fn task(&self) -> &str {
        match self {
            TraceEvent::Started(task)
            | TraceEvent::Finished(task)
            | TraceEvent::UpToDate(task)
            | TraceEvent::Failed { task, .. } => task,
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Started(task) => write!(f, "started {}", task),
            TraceEvent::Finished(task) => write!(f, "finished {}", task),
            TraceEvent::UpToDate(task) => write!(f, "up-to-date {}", task),
            TraceEvent::Failed { task, message } => write!(f, "failed {}: {}", task, message),
        }
    }
}

/// 発生順に並んだイベント列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionTrace {
    events: Vec<TraceEvent>,
}

impl ExecutionTrace {
    pub fn record(&mut self, event: TraceEvent) {
        tracing::debug!(event = %event, "Task event");
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// `event` が最初に現れた位置
    pub fn position(&self, event: &TraceEvent) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    /// 完了（実行済み・最新）したタスク名を完了順に返す
    pub fn completed(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| matches!(e, TraceEvent::Finished(_) | TraceEvent::UpToDate(_)))
            .map(TraceEvent::task)
            .collect()
    }

    /// 開始したタスク名（最新でスキップしたものは含まない）
    pub fn started(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| matches!(e, TraceEvent::Started(_)))
            .map(TraceEvent::task)
            .collect()
    }

    pub fn failed(&self) -> Option<&TraceEvent> {
        self.events
            .iter()
            .find(|e| matches!(e, TraceEvent::Failed { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_queries() {
        let mut trace = ExecutionTrace::default();
        trace.record(TraceEvent::Started("a".into()));
        trace.record(TraceEvent::Finished("a".into()));
        trace.record(TraceEvent::UpToDate("b".into()));
        trace.record(TraceEvent::Started("c".into()));
        trace.record(TraceEvent::Failed {
            task: "c".into(),
            message: "boom".into(),
        });

        assert_eq!(trace.completed(), vec!["a", "b"]);
        assert_eq!(trace.started(), vec!["a", "c"]);
        assert_eq!(trace.position(&TraceEvent::Started("c".into())), Some(3));
        assert_eq!(trace.failed().map(TraceEvent::task), Some("c"));
        assert_eq!(trace.events()[4].to_string(), "failed c: boom");
    }
}
