//! Turns a declarative list of test classes into the root [`Entity`],
//! filtered by a [`Filter`].
//!
//! Rust has no first-class "method reference" the way the original design
//! assumes; per spec.md's Design Notes §9, implementers without one
//! "dispatch via an interface the test class implements" instead. Here
//! that interface is [`TestCase`]: a user's test struct implements it once,
//! [`class_builder`] wraps it generically, and the generic parameter is
//! erased behind the [`ClassSuiteBuilder`] trait object so a
//! `Vec<Box<dyn ClassSuiteBuilder>>` can hold arbitrarily many distinct
//! test classes.

use crate::entity::{Case, Entity, Suite};
use crate::error::TestError;
use crate::filter::Filter;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

/// A user's test class: one instance is constructed fresh per test method,
/// matching the usual "each test method gets its own instance" semantics.
pub trait TestCase: Default + Send + 'static {
    fn class_name() -> &'static str;

    /// Every test method this class registers, in declaration order, as
    /// `(methodName, fn(&mut Self) -> Result<(), TestError>)`.
    fn methods() -> Vec<(&'static str, fn(&mut Self) -> Result<(), TestError>)>;

    /// Runs once before the first selected case of this class.
    fn class_set_up() {}
    /// Runs once after the last selected case of this class.
    fn class_tear_down() {}

    fn set_up_with_error(&mut self) -> Result<(), TestError> {
        Ok(())
    }
    fn set_up(&mut self) {}
    fn tear_down(&mut self) {}
    fn tear_down_with_error(&mut self) -> Result<(), TestError> {
        Ok(())
    }
}

/// Type-erased handle onto a registered test class, produced by
/// [`class_builder`].
pub trait ClassSuiteBuilder: Send {
    fn class_name(&self) -> &'static str;
    /// Builds this class's `Suite` of selected cases, or `None` if the
    /// filter selects none of its methods (per spec.md §4.G: "classes
    /// whose method list becomes empty after filtering are dropped").
    fn build(&self, filter: &Filter) -> Option<Suite>;
}

struct TypedClassBuilder<C: TestCase>(PhantomData<fn() -> C>);

impl<C: TestCase> ClassSuiteBuilder for TypedClassBuilder<C> {
    fn class_name(&self) -> &'static str {
        C::class_name()
    }

    fn build(&self, filter: &Filter) -> Option<Suite> {
        let selected: Vec<_> = C::methods()
            .into_iter()
            .filter(|(name, _)| filter.includes(C::class_name(), name))
            .collect();
        if selected.is_empty() {
            return None;
        }
        let children = selected
            .into_iter()
            .map(|(name, body)| Entity::Case(build_case::<C>(name, body)))
            .collect();
        Some(Suite::for_class(
            C::class_name(),
            children,
            Box::new(C::class_set_up),
            Box::new(C::class_tear_down),
        ))
    }
}

fn build_case<C: TestCase>(method_name: &'static str, body: fn(&mut C) -> Result<(), TestError>) -> Case {
    let display_name = format!("{}.{}", C::class_name(), method_name);
    let instance = Arc::new(Mutex::new(C::default()));

    let body_instance = instance.clone();
    let test_body: Box<dyn FnOnce() -> Result<(), TestError> + Send> =
        Box::new(move || body(&mut body_instance.lock().unwrap()));

    let set_up_instance = instance.clone();
    let set_up_with_error: Box<dyn FnMut() -> Result<(), TestError> + Send> =
        Box::new(move || set_up_instance.lock().unwrap().set_up_with_error());

    let set_up_instance = instance.clone();
    let set_up: Box<dyn FnMut() + Send> = Box::new(move || set_up_instance.lock().unwrap().set_up());

    let tear_down_instance = instance.clone();
    let tear_down: Box<dyn FnMut() + Send> = Box::new(move || tear_down_instance.lock().unwrap().tear_down());

    let tear_down_instance = instance;
    let tear_down_with_error: Box<dyn FnMut() -> Result<(), TestError> + Send> =
        Box::new(move || tear_down_instance.lock().unwrap().tear_down_with_error());

    Case::new(display_name, test_body)
        .with_set_up_with_error(set_up_with_error)
        .with_set_up(set_up)
        .with_tear_down(tear_down)
        .with_tear_down_with_error(tear_down_with_error)
}

/// Registers test class `C`, erasing its generic parameter so it can sit
/// alongside other classes in a `Vec<Box<dyn ClassSuiteBuilder>>`.
pub fn class_builder<C: TestCase>() -> Box<dyn ClassSuiteBuilder> {
    Box::new(TypedClassBuilder::<C>(PhantomData))
}

/// Assembles the root [`Entity`] from every registered class and a
/// [`Filter`], per spec.md §4.G's root-assembly rules:
///
/// - No selector: `"All tests"` containing one `"<bundle>.xctest"` suite
///   containing one child suite per class.
/// - Selectors present: `"Selected tests"` containing one child suite per
///   class directly.
pub fn build_root(bundle_name: &str, classes: &[Box<dyn ClassSuiteBuilder>], filter: &Filter) -> Entity {
    let class_suites: Vec<Entity> = classes
        .iter()
        .filter_map(|c| c.build(filter))
        .map(Entity::Suite)
        .collect();

    match filter {
        Filter::All => {
            let xctest_suite = Suite::new(format!("{bundle_name}.xctest"), class_suites);
            Entity::Suite(Suite::new("All tests", vec![Entity::Suite(xctest_suite)]))
        }
        Filter::Selected(_) => Entity::Suite(Suite::new("Selected tests", class_suites)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExecutionEngine;

    #[derive(Default)]
    struct Arithmetic {
        value: i32,
    }

    impl TestCase for Arithmetic {
        fn class_name() -> &'static str {
            "Arithmetic"
        }

        fn methods() -> Vec<(&'static str, fn(&mut Self) -> Result<(), TestError>)> {
            vec![
                ("testAddition", Arithmetic::test_addition),
                ("testSubtraction", Arithmetic::test_subtraction),
            ]
        }

        fn set_up(&mut self) {
            self.value = 10;
        }
    }

    impl Arithmetic {
        fn test_addition(&mut self) -> Result<(), TestError> {
            crate::assert::assert_equal(&(self.value + 1), &11, "", crate::here!());
            Ok(())
        }

        fn test_subtraction(&mut self) -> Result<(), TestError> {
            crate::assert::assert_equal(&(self.value - 1), &9, "", crate::here!());
            Ok(())
        }
    }

    #[test]
    fn selector_runs_exactly_one_method() {
        let classes = vec![class_builder::<Arithmetic>()];
        let filter = Filter::parse(&["Arithmetic/testAddition".to_string()]);
        let root = build_root("bundle", &classes, &filter);
        assert_eq!(root.case_count(), 1);
        let engine = ExecutionEngine::new("bundle", root);
        let record = engine.run();
        assert_eq!(record.execution_count(), 1);
        assert!(record.has_succeeded());
    }

    #[test]
    fn no_selector_wraps_every_class_in_a_bundle_xctest_suite() {
        let classes = vec![class_builder::<Arithmetic>()];
        let filter = Filter::All;
        let root = build_root("MyBundle", &classes, &filter);
        let Entity::Suite(all_tests) = &root else {
            panic!("expected the root to be a Suite");
        };
        assert_eq!(all_tests.name(), "All tests");
        assert_eq!(all_tests.children().len(), 1);
        let Entity::Suite(xctest) = &all_tests.children()[0] else {
            panic!("expected a child Suite");
        };
        assert_eq!(xctest.name(), "MyBundle.xctest");
        assert_eq!(xctest.children().len(), 1);
    }

    #[test]
    fn selected_tests_root_skips_the_xctest_wrapper_suite() {
        let classes = vec![class_builder::<Arithmetic>()];
        let filter = Filter::parse(&["Arithmetic".to_string()]);
        let root = build_root("MyBundle", &classes, &filter);
        let Entity::Suite(selected) = &root else {
            panic!("expected the root to be a Suite");
        };
        assert_eq!(selected.name(), "Selected tests");
        assert_eq!(selected.children().len(), 1);
    }

    #[test]
    fn a_class_with_no_methods_surviving_the_filter_is_dropped() {
        let classes = vec![class_builder::<Arithmetic>()];
        let filter = Filter::parse(&["SomeOtherClass".to_string()]);
        let root = build_root("bundle", &classes, &filter);
        assert_eq!(root.case_count(), 0);
    }
}
