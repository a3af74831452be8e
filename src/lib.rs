//! # testframe
//!
//! An XCTest-style unit testing framework runtime: a hierarchical test tree,
//! a sequential execution engine, an assertion evaluator, and an
//! expectation/waiter subsystem for testing asynchronous code.
//!
//! ## Overview
//!
//! A test run is a tree of [`entity::Entity`] nodes — leaf [`entity::Case`]s
//! and composite [`entity::Suite`]s — executed depth-first by an
//! [`engine::ExecutionEngine`]. Each node accumulates its outcome into a
//! [`record::ResultRecord`]; lifecycle events are fanned out to registered
//! [`observation::Observer`]s as the traversal proceeds.
//!
//! Test classes implement [`registration::TestCase`] once; [`registration`]
//! erases the generic parameter so heterogeneous classes can sit in one
//! registry, and [`filter::Filter`] selects which classes/methods of that
//! registry actually run.
//!
//! Assertions ([`assert`]) route failures to whichever case is currently
//! executing, tracked by [`current`]. Asynchronous expectations
//! ([`expectation`], [`waiter`]) let a test suspend until events arrive from
//! other threads, with support for ordering constraints, inversion, and
//! nested waiters.
//!
//! ## Quick Start
//!
//! ```no_run
//! use testframe::engine::ExecutionEngine;
//! use testframe::error::TestError;
//! use testframe::filter::Filter;
//! use testframe::registration::{self, TestCase};
//!
//! #[derive(Default)]
//! struct Arithmetic {
//!     value: i32,
//! }
//!
//! impl TestCase for Arithmetic {
//!     fn class_name() -> &'static str {
//!         "Arithmetic"
//!     }
//!
//!     fn methods() -> Vec<(&'static str, fn(&mut Self) -> Result<(), TestError>)> {
//!         vec![("testAddsUp", Arithmetic::test_adds_up)]
//!     }
//!
//!     fn set_up(&mut self) {
//!         self.value = 1;
//!     }
//! }
//!
//! impl Arithmetic {
//!     fn test_adds_up(&mut self) -> Result<(), TestError> {
//!         testframe::assert::assert_equal(&(self.value + 1), &2, "", testframe::here!());
//!         Ok(())
//!     }
//! }
//!
//! let classes = vec![registration::class_builder::<Arithmetic>()];
//! let filter = Filter::All;
//! let root = registration::build_root("MyTests", &classes, &filter);
//! let record = ExecutionEngine::new("MyTests", root).run();
//! assert!(record.has_succeeded());
//! ```
//!
//! ## Configuration
//!
//! The engine itself takes no configuration. An optional `testframe.toml`
//! tunes ambient runtime behavior (waiter timeouts); see [`config`].

pub mod assert;
pub mod config;
pub mod current;
pub mod engine;
pub mod entity;
pub mod error;
pub mod expectation;
pub mod filter;
pub mod location;
pub mod observation;
pub mod profiling;
pub mod record;
pub mod registration;
pub mod waiter;

pub use engine::ExecutionEngine;
pub use entity::{Case, Entity, Suite};
pub use error::{ErrorClassification, Skip, TestError, UnwrapFailureSentinel};
pub use expectation::Expectation;
pub use filter::{Filter, Selector};
pub use observation::{ObservationHub, Observer};
pub use record::ResultRecord;
pub use registration::{ClassSuiteBuilder, TestCase};
pub use waiter::{Waiter, WaiterDelegate, WaiterResult};
