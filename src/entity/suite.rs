//! `Suite`: a composite test entity owning an ordered list of children.

use super::Entity;
use crate::observation::ObservationHub;
use crate::record::ResultRecord;

type ClassHook = Box<dyn FnMut() + Send>;

/// A composite node in the test tree. When a `Suite` represents a single
/// test class's cases, it owns that class's once-per-class `setUp`/
/// `tearDown` hooks and runs them in its own `preBody`/`postBody`, per
/// spec.md §4.B's "setup-order protocol". A purely structural suite (e.g.
/// the root, or a grouping suite with no class of its own) simply leaves
/// both hooks as no-ops.
pub struct Suite {
    name: String,
    children: Vec<Entity>,
    class_set_up: Option<ClassHook>,
    class_tear_down: Option<ClassHook>,
}

impl Suite {
    pub fn new(name: impl Into<String>, children: Vec<Entity>) -> Self {
        Self {
            name: name.into(),
            children,
            class_set_up: None,
            class_tear_down: None,
        }
    }

    /// Builds a suite representing one test class: `children` are its
    /// selected `Case`s, and `class_set_up`/`class_tear_down` are that
    /// class's once-per-run hooks, run once before the first case and
    /// once after the last regardless of how many methods were selected.
    pub fn for_class(
        name: impl Into<String>,
        children: Vec<Entity>,
        class_set_up: ClassHook,
        class_tear_down: ClassHook,
    ) -> Self {
        Self {
            name: name.into(),
            children,
            class_set_up: Some(class_set_up),
            class_tear_down: Some(class_tear_down),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn case_count(&self) -> usize {
        self.children.iter().map(Entity::case_count).sum()
    }

    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    /// Runs `start → classSetUp → (child.execute())* → classTearDown →
    /// stop`, summing each child's record into this suite's composite
    /// record as it goes.
    pub fn execute(&mut self, hub: &ObservationHub) -> ResultRecord {
        let mut record = ResultRecord::composite();
        hub.suite_will_start(&self.name);
        record.start();

        if let Some(class_set_up) = &mut self.class_set_up {
            class_set_up();
        }

        for child in &mut self.children {
            let child_record = child.execute(hub);
            record.push_child(child_record);
        }

        if let Some(class_tear_down) = &mut self.class_tear_down {
            class_tear_down();
        }

        record.stop();
        hub.suite_did_finish(&self.name, &record);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Case;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn hub() -> ObservationHub {
        ObservationHub::new()
    }

    fn passing_case(name: &str) -> Entity {
        Entity::Case(Case::new(name.to_string(), Box::new(|| Ok(()))))
    }

    #[test]
    fn case_count_sums_across_children() {
        let suite = Suite::new(
            "T",
            vec![passing_case("T.a"), passing_case("T.b"), passing_case("T.c")],
        );
        assert_eq!(suite.case_count(), 3);
    }

    #[test]
    fn composite_record_sums_children_execution_counts() {
        let mut suite = Suite::new("T", vec![passing_case("T.a"), passing_case("T.b")]);
        let record = suite.execute(&hub());
        assert_eq!(record.execution_count(), 2);
        assert!(record.has_succeeded());
    }

    #[test]
    fn class_set_up_and_tear_down_run_exactly_once_regardless_of_case_count() {
        let set_up_calls = Arc::new(AtomicUsize::new(0));
        let tear_down_calls = Arc::new(AtomicUsize::new(0));
        let set_up_in_hook = set_up_calls.clone();
        let tear_down_in_hook = tear_down_calls.clone();

        let mut suite = Suite::for_class(
            "T",
            vec![passing_case("T.a"), passing_case("T.b"), passing_case("T.c")],
            Box::new(move || {
                set_up_in_hook.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move || {
                tear_down_in_hook.fetch_add(1, Ordering::SeqCst);
            }),
        );
        suite.execute(&hub());
        assert_eq!(set_up_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tear_down_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn nested_suites_sum_recursively() {
        let inner = Suite::new("Inner", vec![passing_case("Inner.a")]);
        let mut outer = Suite::new("Outer", vec![Entity::Suite(inner), passing_case("Outer.b")]);
        assert_eq!(outer.case_count(), 2);
        let record = outer.execute(&hub());
        assert_eq!(record.execution_count(), 2);
    }
}
