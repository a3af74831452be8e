//! Per-entity accumulation of execution outcome: counters, timing, and the
//! failure list. A leaf ([`Case`](crate::entity::case::Case)) owns a
//! [`ResultRecord::Leaf`]; a [`Suite`](crate::entity::suite::Suite) owns a
//! [`ResultRecord::Composite`] that derives every counter by summing across
//! its children rather than counting anything itself.

use crate::location::SourceLocation;
use std::time::{Duration, Instant};

/// A single recorded failure: its description, location, and whether it is
/// an "expected" (assertion) failure or an "unexpected" (thrown-error)
/// failure.
#[derive(Clone, Debug)]
pub struct Failure {
    pub description: String,
    pub location: SourceLocation,
    pub expected: bool,
}

#[derive(Debug, Default)]
struct Timing {
    start_time: Option<Instant>,
    stop_time: Option<Instant>,
}

impl Timing {
    fn start(&mut self) {
        assert!(self.start_time.is_none(), "ResultRecord started twice");
        self.start_time = Some(Instant::now());
    }

    fn stop(&mut self) {
        assert!(
            self.start_time.is_some(),
            "ResultRecord stopped before being started"
        );
        assert!(self.stop_time.is_none(), "ResultRecord stopped twice");
        self.stop_time = Some(Instant::now());
    }

    fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) => Some(stop.duration_since(start)),
            _ => None,
        }
    }

    fn in_bounds(&self) -> bool {
        self.start_time.is_some() && self.stop_time.is_none()
    }
}

#[derive(Debug, Default)]
struct LeafState {
    timing: Timing,
    execution_count: u32,
    failure_count: u32,
    unexpected_failure_count: u32,
    skip_count: u32,
    failures: Vec<Failure>,
    has_been_skipped: bool,
}

/// The outcome of executing one [`TestEntity`](crate::entity::TestEntity).
///
/// Starting a record that has already started, or stopping one that never
/// started (or has already stopped), is a programming error and panics —
/// this framework resolves the spec's documented ambiguity about
/// out-of-order lifecycle calls in favor of aborting rather than silently
/// no-op'ing.
#[derive(Debug)]
pub enum ResultRecord {
    Leaf(LeafState),
    Composite {
        timing: Timing,
        children: Vec<ResultRecord>,
    },
}

impl ResultRecord {
    pub fn leaf() -> Self {
        ResultRecord::Leaf(LeafState::default())
    }

    /// A record that derives every counter by summing `children`, matching
    /// the spec's Composite variant. Children are supplied incrementally
    /// via [`push_child`](Self::push_child) as a Suite's body runs.
    pub fn composite() -> Self {
        ResultRecord::Composite {
            timing: Timing::default(),
            children: Vec::new(),
        }
    }

    fn timing(&self) -> &Timing {
        match self {
            ResultRecord::Leaf(s) => &s.timing,
            ResultRecord::Composite { timing, .. } => timing,
        }
    }

    fn timing_mut(&mut self) -> &mut Timing {
        match self {
            ResultRecord::Leaf(s) => &mut s.timing,
            ResultRecord::Composite { timing, .. } => timing,
        }
    }

    pub fn start(&mut self) {
        self.timing_mut().start();
    }

    pub fn stop(&mut self) {
        self.timing_mut().stop();
        if let ResultRecord::Leaf(s) = self {
            s.execution_count += 1;
        }
    }

    /// Valid only on a leaf record; panics if called on a Composite, since
    /// only a Case's body routes assertion failures directly.
    pub fn record_failure(&mut self, description: impl Into<String>, location: SourceLocation, expected: bool) {
        let ResultRecord::Leaf(s) = self else {
            panic!("recordFailure called on a composite (Suite) record");
        };
        assert!(s.timing.in_bounds(), "recordFailure called outside start()/stop() bounds");
        if expected {
            s.failure_count += 1;
        } else {
            s.unexpected_failure_count += 1;
        }
        s.failures.push(Failure {
            description: description.into(),
            location,
            expected,
        });
    }

    /// Valid only on a leaf record.
    pub fn record_skip(&mut self, description: impl Into<String>, location: SourceLocation) {
        let ResultRecord::Leaf(s) = self else {
            panic!("recordSkip called on a composite (Suite) record");
        };
        assert!(s.timing.in_bounds(), "recordSkip called outside start()/stop() bounds");
        assert!(!s.has_been_skipped, "recordSkip called twice");
        s.has_been_skipped = true;
        s.skip_count += 1;
        let _ = (description.into(), location);
    }

    pub fn push_child(&mut self, child: ResultRecord) {
        match self {
            ResultRecord::Composite { children, .. } => children.push(child),
            ResultRecord::Leaf(_) => panic!("push_child called on a leaf record"),
        }
    }

    pub fn children(&self) -> &[ResultRecord] {
        match self {
            ResultRecord::Composite { children, .. } => children,
            ResultRecord::Leaf(_) => &[],
        }
    }

    pub fn execution_count(&self) -> u32 {
        match self {
            ResultRecord::Leaf(s) => s.execution_count,
            ResultRecord::Composite { children, .. } => {
                children.iter().map(ResultRecord::execution_count).sum()
            }
        }
    }

    pub fn failure_count(&self) -> u32 {
        match self {
            ResultRecord::Leaf(s) => s.failure_count,
            ResultRecord::Composite { children, .. } => {
                children.iter().map(ResultRecord::failure_count).sum()
            }
        }
    }

    pub fn unexpected_failure_count(&self) -> u32 {
        match self {
            ResultRecord::Leaf(s) => s.unexpected_failure_count,
            ResultRecord::Composite { children, .. } => {
                children.iter().map(ResultRecord::unexpected_failure_count).sum()
            }
        }
    }

    pub fn skip_count(&self) -> u32 {
        match self {
            ResultRecord::Leaf(s) => s.skip_count,
            ResultRecord::Composite { children, .. } => {
                children.iter().map(ResultRecord::skip_count).sum()
            }
        }
    }

    pub fn total_failure_count(&self) -> u32 {
        self.failure_count() + self.unexpected_failure_count()
    }

    pub fn failures(&self) -> Vec<&Failure> {
        match self {
            ResultRecord::Leaf(s) => s.failures.iter().collect(),
            ResultRecord::Composite { children, .. } => {
                children.iter().flat_map(ResultRecord::failures).collect()
            }
        }
    }

    pub fn has_been_skipped(&self) -> bool {
        match self {
            ResultRecord::Leaf(s) => s.has_been_skipped,
            ResultRecord::Composite { children, .. } => {
                children.iter().any(ResultRecord::has_been_skipped)
            }
        }
    }

    pub fn has_succeeded(&self) -> bool {
        self.timing().stop_time.is_some() && self.total_failure_count() == 0
    }

    pub fn duration(&self) -> Option<Duration> {
        self.timing().duration()
    }

    /// Sum of every leaf case's own duration, as distinct from
    /// [`duration`](Self::duration)'s wall-clock span of this record's own
    /// start/stop bracket. The two differ for a composite record: the
    /// summary line reports both the total test time and the (shorter, if
    /// anything ran concurrently) wall-clock time.
    pub fn total_leaf_duration(&self) -> Duration {
        match self {
            ResultRecord::Leaf(_) => self.duration().unwrap_or_default(),
            ResultRecord::Composite { children, .. } => {
                children.iter().map(ResultRecord::total_leaf_duration).sum()
            }
        }
    }
}
