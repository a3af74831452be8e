//! `Case`: a leaf test entity representing one test method invocation.

use crate::current::{self, CaseContext};
use crate::error::{Skip, TestError};
use crate::observation::ObservationHub;
use crate::record::ResultRecord;
use std::sync::Arc;

type ThrowingHook = Box<dyn FnMut() -> Result<(), TestError> + Send>;
type Hook = Box<dyn FnMut() + Send>;
type TestBody = Box<dyn FnOnce() -> Result<(), TestError> + Send>;

fn no_op_throwing_hook() -> ThrowingHook {
    Box::new(|| Ok(()))
}

fn no_op_hook() -> Hook {
    Box::new(|| {})
}

/// One test invocation: `ClassName.methodName`, its setUp/tearDown
/// sequence, and its test body. Owns its expectations and teardown blocks
/// for the duration of the run through the [`CaseContext`] it creates in
/// [`Case::execute`].
pub struct Case {
    display_name: String,
    set_up_with_error: ThrowingHook,
    set_up: Hook,
    test_body: Option<TestBody>,
    tear_down: Hook,
    tear_down_with_error: ThrowingHook,
}

impl Case {
    pub fn new(display_name: impl Into<String>, test_body: TestBody) -> Self {
        Self {
            display_name: display_name.into(),
            set_up_with_error: no_op_throwing_hook(),
            set_up: no_op_hook(),
            test_body: Some(test_body),
            tear_down: no_op_hook(),
            tear_down_with_error: no_op_throwing_hook(),
        }
    }

    pub fn with_set_up_with_error(mut self, hook: ThrowingHook) -> Self {
        self.set_up_with_error = hook;
        self
    }

    pub fn with_set_up(mut self, hook: Hook) -> Self {
        self.set_up = hook;
        self
    }

    pub fn with_tear_down(mut self, hook: Hook) -> Self {
        self.tear_down = hook;
        self
    }

    pub fn with_tear_down_with_error(mut self, hook: ThrowingHook) -> Self {
        self.tear_down_with_error = hook;
        self
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn case_count(&self) -> usize {
        1
    }

    /// Runs `start → setUp → body → teardown → stop`, routing failures and
    /// skips to this case's [`ResultRecord`] and to `hub`.
    pub fn execute(&mut self, hub: &ObservationHub) -> ResultRecord {
        let context = CaseContext::new(self.display_name.clone());
        hub.case_will_start(&self.display_name);
        current::enter(context.clone());
        context.record.lock().unwrap().start();

        let mut abort_invocation = false;
        let mut pending_skip: Option<Skip> = None;

        self.perform_set_up_sequence(&context, hub, &mut abort_invocation, &mut pending_skip);

        if !abort_invocation {
            self.invoke_body(&context, hub, &mut pending_skip);
        }

        self.fail_unwaited_expectations(&context, hub);

        if let Some(skip) = pending_skip {
            let description = skip.summary();
            context
                .record
                .lock()
                .unwrap()
                .record_skip(description.clone(), skip.location.clone());
            hub.case_was_skipped(&self.display_name, &description, &skip.location);
        }

        self.perform_tear_down_sequence(&context, hub);

        context.record.lock().unwrap().stop();
        current::exit();

        let record = Self::extract_record(context);
        hub.case_did_finish(&self.display_name, &record);
        record
    }

    fn perform_set_up_sequence(
        &mut self,
        context: &Arc<CaseContext>,
        hub: &ObservationHub,
        abort_invocation: &mut bool,
        pending_skip: &mut Option<Skip>,
    ) {
        match (self.set_up_with_error)() {
            Ok(()) => (self.set_up)(),
            Err(err) => self.classify_and_route(context, hub, err, abort_invocation, pending_skip),
        }
    }

    fn invoke_body(
        &mut self,
        context: &Arc<CaseContext>,
        hub: &ObservationHub,
        pending_skip: &mut Option<Skip>,
    ) {
        let Some(body) = self.test_body.take() else {
            return;
        };
        if let Err(err) = body() {
            let mut unused_abort = false;
            self.classify_and_route(context, hub, err, &mut unused_abort, pending_skip);
        }
    }

    /// Classifies a thrown error per spec.md §7 and routes it: a failure
    /// to the case's record (if `record_as_failure`), a halted invocation
    /// (if `skip_test_invocation`), and a parked [`Skip`] to be recorded at
    /// body end (only if `record_as_skip` — ordinary errors halt the
    /// invocation without ever being recorded as a skip).
    fn classify_and_route(
        &self,
        context: &Arc<CaseContext>,
        hub: &ObservationHub,
        err: TestError,
        abort_invocation: &mut bool,
        pending_skip: &mut Option<Skip>,
    ) {
        let classification = err.classify();
        if classification.record_as_failure {
            let (description, location) = describe_thrown_error(&err);
            // A thrown error is "unexpected" (it didn't come from an
            // assertion call), per spec.md §4.A's failureCount vs.
            // unexpectedFailureCount split and §8 scenario 3.
            context
                .record
                .lock()
                .unwrap()
                .record_failure(description.clone(), location.clone(), false);
            hub.case_did_fail(&self.display_name, &description, &location);
        }
        if classification.skip_test_invocation {
            *abort_invocation = true;
        }
        if classification.record_as_skip
            && let TestError::Skip(skip) = err
        {
            *pending_skip = Some(skip);
        }
    }

    /// After the body runs, any expectation that was never passed to a
    /// `wait()` call is itself a failure, reported at the expectation's
    /// creation location.
    fn fail_unwaited_expectations(&self, context: &Arc<CaseContext>, hub: &ObservationHub) {
        let unwaited: Vec<_> = context
            .expectations
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !e.has_been_waited_on())
            .cloned()
            .collect();
        for expectation in unwaited {
            let description = "Failed due to unwaited expectations".to_string();
            let location = expectation.creation_location().clone();
            context
                .record
                .lock()
                .unwrap()
                .record_failure(description.clone(), location.clone(), true);
            hub.case_did_fail(&self.display_name, &description, &location);
        }
    }

    /// Teardown blocks run in reverse registration order, then
    /// non-throwing `tearDown`, then throwing `tearDown` — guaranteed to
    /// run regardless of what happened above.
    fn perform_tear_down_sequence(&mut self, context: &Arc<CaseContext>, hub: &ObservationHub) {
        let blocks = std::mem::take(&mut *context.teardown_blocks.lock().unwrap());
        for block in blocks.into_iter().rev() {
            block();
        }
        (self.tear_down)();
        if let Err(err) = (self.tear_down_with_error)() {
            let mut unused_abort = false;
            let mut unused_skip = None;
            self.classify_and_route(context, hub, err, &mut unused_abort, &mut unused_skip);
        }
    }

    fn extract_record(context: Arc<CaseContext>) -> ResultRecord {
        match Arc::try_unwrap(context) {
            Ok(ctx) => ctx.record.into_inner().unwrap(),
            Err(still_shared) => {
                // Something (a leaked background thread) still holds this
                // context; extract the record without requiring `Clone`.
                std::mem::replace(&mut *still_shared.record.lock().unwrap(), ResultRecord::leaf())
            }
        }
    }
}

/// Builds the failure description and location for an error classified
/// with `record_as_failure = true`. In practice this is always a
/// [`TestError::Thrown`]: `Skip` and the unwrap sentinel are both
/// classified with `record_as_failure = false` and never reach here.
fn describe_thrown_error(err: &TestError) -> (String, crate::location::SourceLocation) {
    match err {
        TestError::Thrown(e) => (
            format!("threw error \"{e}\""),
            crate::location::SourceLocation::new("<unknown>", 0),
        ),
        other => unreachable!("{other:?} is never classified as record_as_failure"),
    }
}
