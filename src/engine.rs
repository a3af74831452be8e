//! Orchestrates a single run: installs the configured observers, executes
//! the root [`Entity`] depth-first, and wraps the whole traversal with the
//! `bundleWillStart`/`bundleDidFinish` boundary events.

use crate::entity::Entity;
use crate::observation::{ObservationHub, Observer};
use crate::record::ResultRecord;
use std::sync::Arc;

/// Drives one execution of a test tree. Constructed once per run by the
/// CLI driver (or an embedding test harness) from a root [`Entity`] built
/// by [`crate::registration`] and a bundle name used only for the
/// outermost observer boundary.
pub struct ExecutionEngine {
    bundle_name: String,
    root: Entity,
    hub: ObservationHub,
}

impl ExecutionEngine {
    pub fn new(bundle_name: impl Into<String>, root: Entity) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            root,
            hub: ObservationHub::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn Observer>) {
        self.hub.add_observer(observer);
    }

    pub fn case_count(&self) -> usize {
        self.root.case_count()
    }

    /// Runs `bundleWillStart → root.execute() → bundleDidFinish` and
    /// returns the root's composite [`ResultRecord`].
    pub fn run(mut self) -> ResultRecord {
        self.hub.bundle_will_start(&self.bundle_name);
        let record = self.root.execute(&self.hub);
        self.hub.bundle_did_finish(&self.bundle_name, &record);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Case, Suite};

    fn passing_case(name: &str) -> Entity {
        Entity::Case(Case::new(name.to_string(), Box::new(|| Ok(()))))
    }

    #[test]
    fn run_returns_a_composite_record_summed_over_every_case() {
        let root = Entity::Suite(Suite::new(
            "All tests",
            vec![passing_case("A.one"), passing_case("A.two")],
        ));
        let engine = ExecutionEngine::new("bundle", root);
        let record = engine.run();
        assert_eq!(record.execution_count(), 2);
        assert!(record.has_succeeded());
    }

    struct OrderObserver {
        events: std::sync::Mutex<Vec<&'static str>>,
    }
    impl crate::observation::Observer for OrderObserver {
        fn bundle_will_start(&self, _: &str) {
            self.events.lock().unwrap().push("bundle_will_start");
        }
        fn bundle_did_finish(&self, _: &str, _: &ResultRecord) {
            self.events.lock().unwrap().push("bundle_did_finish");
        }
        fn case_will_start(&self, _: &str) {
            self.events.lock().unwrap().push("case_will_start");
        }
        fn case_did_finish(&self, _: &str, _: &ResultRecord) {
            self.events.lock().unwrap().push("case_did_finish");
        }
    }

    #[test]
    fn bundle_boundary_events_wrap_the_whole_traversal() {
        let observer = Arc::new(OrderObserver {
            events: std::sync::Mutex::new(Vec::new()),
        });
        let root = Entity::Case(Case::new("A.one", Box::new(|| Ok(()))));
        let mut engine = ExecutionEngine::new("bundle", root);
        engine.add_observer(observer.clone());
        engine.run();
        assert_eq!(
            *observer.events.lock().unwrap(),
            vec!["bundle_will_start", "case_will_start", "case_did_finish", "bundle_did_finish"]
        );
    }

    #[test]
    fn case_count_is_exposed_before_running() {
        let root = Entity::Suite(Suite::new("S", vec![passing_case("S.a"), passing_case("S.b")]));
        let engine = ExecutionEngine::new("bundle", root);
        assert_eq!(engine.case_count(), 2);
    }
}
