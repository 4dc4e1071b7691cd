//! Iteration controller - drives a session through plan → query → interpret →
//! validate → execute until it reaches a terminal status.
//!
//! Each iteration starts from a fresh prompt: the service sees the session's
//! accumulated discoveries and the previous iteration's feedback, never a
//! conversation history.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::domain::{
    ActionDomain, CodeSlot, InterpretedResponse, IterationRecord, Session, SessionStatus, ValidatedAction,
};
use crate::error::{AgentError, Result};
use crate::executor::ActionExecutor;
use crate::interpret::{DroppedAction, ResponseInterpreter};
use crate::llm::LlmClient;
use crate::prompt::PhasePlanner;
use crate::runner::feedback::FeedbackBuilder;
use crate::workspace::{CodeWorkspace, TestRunner};

/// Default per-action deadline
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuration for the IterationController.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Deadline for each executed action
    pub action_timeout: Duration,
    /// End a code session as soon as its tests pass, even if the model asks to continue
    pub stop_on_test_pass: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            stop_on_test_pass: true,
        }
    }
}

/// Workspace and test runner used by code sessions
pub struct CodeStage {
    pub workspace: CodeWorkspace,
    pub tests: Arc<dyn TestRunner>,
}

type IterationObserver = Box<dyn Fn(&Session, &IterationRecord) + Send + Sync>;

/// What an iteration decided
enum Step {
    Continue(Option<String>),
    Stop(SessionStatus),
}

pub struct IterationController<L, P>
where
    L: LlmClient,
    P: PhasePlanner,
{
    llm: Arc<L>,
    planner: P,
    interpreter: ResponseInterpreter,
    executor: ActionExecutor,
    config: ControllerConfig,
    code_stage: Option<CodeStage>,
    observer: Option<IterationObserver>,
}

impl<L, P> IterationController<L, P>
where
    L: LlmClient,
    P: PhasePlanner,
{
    pub fn new(llm: Arc<L>, planner: P, interpreter: ResponseInterpreter) -> Self {
        Self {
            llm,
            planner,
            interpreter,
            executor: ActionExecutor::new(),
            config: ControllerConfig::default(),
            code_stage: None,
            observer: None,
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Required for code sessions
    pub fn with_code_stage(mut self, workspace: CodeWorkspace, tests: Arc<dyn TestRunner>) -> Self {
        self.code_stage = Some(CodeStage { workspace, tests });
        self
    }

    /// Called after every iteration with the record just appended to the history
    pub fn with_observer(mut self, observer: impl Fn(&Session, &IterationRecord) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Run the session until it reaches a terminal status.
    ///
    /// Unrecoverable errors (prompt rendering, workspace IO) leave the session
    /// in `Failed` and are returned so the caller can report the cause.
    pub async fn run(&self, session: &mut Session) -> Result<SessionStatus> {
        if session.domain == ActionDomain::Code && self.code_stage.is_none() {
            return Err(AgentError::Config(
                "code sessions need a workspace and a test runner".to_string(),
            ));
        }

        session.status = SessionStatus::Running;
        info!(
            "Starting {} session for '{}' ({} iterations, model {})",
            session.domain,
            session.target,
            session.max_iterations,
            self.llm.model()
        );

        let mut feedback: Option<String> = None;

        while session.iteration < session.max_iterations {
            let phase = self.planner.phase_for(session).name;
            let mut record = IterationRecord::new(session.iteration, phase);
            info!(
                "Iteration {}/{} ({})",
                session.iteration + 1,
                session.max_iterations,
                phase
            );

            let step = match self.iterate(session, &mut record, feedback.as_deref()).await {
                Ok(step) => step,
                Err(e) => {
                    warn!("Iteration {} failed: {}", session.iteration + 1, e);
                    session.status = SessionStatus::Failed;
                    self.finish_iteration(session, record);
                    return Err(e);
                }
            };

            self.finish_iteration(session, record);

            match step {
                Step::Stop(status) => {
                    info!("Session ended: {}", status);
                    session.status = status;
                    return Ok(status);
                }
                Step::Continue(next) => {
                    feedback = next;
                    session.iteration += 1;
                }
            }
        }

        let status = if session.service_calls > 0 && session.successful_calls == 0 {
            SessionStatus::Failed
        } else {
            SessionStatus::Exhausted
        };
        info!("Session ended after {} iterations: {}", session.iteration, status);
        session.status = status;
        Ok(status)
    }

    fn finish_iteration(&self, session: &mut Session, record: IterationRecord) {
        session.history.push(record);
        if let (Some(observer), Some(record)) = (&self.observer, session.history.last()) {
            observer(session, record);
        }
    }

    async fn iterate(
        &self,
        session: &mut Session,
        record: &mut IterationRecord,
        feedback: Option<&str>,
    ) -> Result<Step> {
        let prompt = self.planner.build_prompt(session, feedback)?;

        session.service_calls += 1;
        let raw = match self.llm.query(&prompt).await {
            Ok(raw) => {
                session.successful_calls += 1;
                raw
            }
            Err(e) => {
                let error = AgentError::from(e);
                warn!("{}", error);
                record.service_error = Some(error.to_string());
                let mut builder = FeedbackBuilder::new();
                builder.service_error(&error);
                return Ok(Step::Continue(builder.build()));
            }
        };
        debug!("Response: {} chars", raw.len());

        let (response, dropped) = self.interpreter.interpret_with_drops(&raw, session);
        record.analysis = response.analysis.clone();
        record.proposed = response.actions.len() + dropped.len();
        record.rejected = dropped.len();
        session.last_analysis = response.analysis.clone();
        session.add_findings(response.findings.iter().cloned());

        if response.actions.is_empty() {
            info!("No runnable actions proposed ({} dropped)", dropped.len());
            return Ok(Step::Stop(SessionStatus::StoppedByModel));
        }

        let mut builder = FeedbackBuilder::new();
        for drop in &dropped {
            builder.rejected(&drop.raw, &drop.reason);
        }

        match session.domain {
            ActionDomain::Command => self.run_commands(session, record, &response, builder).await,
            ActionDomain::Code => self.run_code(session, record, &response, &dropped, builder).await,
        }
    }

    async fn run_commands(
        &self,
        session: &mut Session,
        record: &mut IterationRecord,
        response: &InterpretedResponse,
        mut builder: FeedbackBuilder,
    ) -> Result<Step> {
        let mut validated: Vec<ValidatedAction> = Vec::new();
        for action in &response.actions {
            match self.interpreter.validator().validate(action, session) {
                Ok(action) => validated.push(action),
                Err(reason) => {
                    record.rejected += 1;
                    builder.rejected(&action.raw, &reason);
                }
            }
        }

        if validated.is_empty() {
            info!("Every proposed command was rejected");
            return Ok(Step::Stop(SessionStatus::StoppedByModel));
        }

        for action in &validated {
            info!("Executing: {}", action.as_str());
            let result = self.executor.execute(action, self.config.action_timeout).await;
            record.executed += 1;
            if result.success {
                record.succeeded += 1;
                session.record_discovery(action.as_str(), result.stdout.clone());
            } else {
                debug!("'{}' failed: {:?}", action.as_str(), result.error);
            }
            builder.result(&result);
        }

        if !response.continuation {
            return Ok(Step::Stop(SessionStatus::Succeeded));
        }
        Ok(Step::Continue(builder.build()))
    }

    async fn run_code(
        &self,
        session: &mut Session,
        record: &mut IterationRecord,
        response: &InterpretedResponse,
        dropped: &[DroppedAction],
        mut builder: FeedbackBuilder,
    ) -> Result<Step> {
        let stage = self
            .code_stage
            .as_ref()
            .ok_or_else(|| AgentError::Config("code stage missing".to_string()))?;

        let mut validated: Vec<ValidatedAction> = Vec::new();
        for action in &response.actions {
            match self.interpreter.validator().validate(action, session) {
                Ok(action) => validated.push(action),
                Err(reason) => {
                    record.rejected += 1;
                    let file = action
                        .slot
                        .map(|slot| stage.workspace.file_name(slot))
                        .unwrap_or("code");
                    builder.syntax(file, &reason);
                }
            }
        }

        // a submission is written whole or not at all
        if !dropped.is_empty() || validated.len() < response.actions.len() {
            info!("Submission rejected, nothing written");
            return Ok(Step::Continue(builder.build()));
        }

        for action in &validated {
            let slot = action.slot().unwrap_or(CodeSlot::Solution);
            let path = stage.workspace.write(slot, action.as_str())?;
            info!("Wrote {}", path.display());
            record.executed += 1;
            record.succeeded += 1;
            session.record_discovery(stage.workspace.file_name(slot), action.as_str());
        }

        let outcome = stage.tests.run_tests().await;
        record.tests_passed = Some(outcome.success);
        builder.tests(&outcome);

        if outcome.success && (self.config.stop_on_test_pass || !response.continuation) {
            return Ok(Step::Stop(SessionStatus::Succeeded));
        }
        if !response.continuation {
            info!("Model stopped with failing tests");
            return Ok(Step::Stop(SessionStatus::StoppedByModel));
        }
        Ok(Step::Continue(builder.build()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::prompt::{CodePlanner, CommandPlanner};
    use crate::validation::{ActionValidator, SourceLanguage, ValidatorConfig};
    use crate::workspace::TestOutcome;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn echo_interpreter() -> ResponseInterpreter {
        ResponseInterpreter::new(ActionValidator::new(ValidatorConfig {
            allowed_tools: vec!["echo".to_string()],
            ..Default::default()
        }))
    }

    fn command_controller(mock: MockLlmClient) -> (Arc<MockLlmClient>, IterationController<MockLlmClient, CommandPlanner>) {
        let llm = Arc::new(mock);
        let planner = CommandPlanner::new(vec!["echo".to_string()]).unwrap();
        let controller = IterationController::new(llm.clone(), planner, echo_interpreter()).with_config(ControllerConfig {
            action_timeout: Duration::from_secs(10),
            ..Default::default()
        });
        (llm, controller)
    }

    /// Test runner that passes from the given call onwards (1-based)
    struct PassAfter {
        calls: AtomicUsize,
        pass_from: usize,
    }

    impl PassAfter {
        fn new(pass_from: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                pass_from,
            }
        }
    }

    #[async_trait]
    impl TestRunner for PassAfter {
        async fn run_tests(&self) -> TestOutcome {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.pass_from {
                TestOutcome::pass("==== 1 passed in 0.01s ====")
            } else {
                TestOutcome::fail("==== 1 failed in 0.01s ====", "")
            }
        }
    }

    const GOOD_CODE: &str = r#"{"code": "def add(a, b):\n    return a + b\n", "tests": "from solution import add\n\ndef test_add():\n    assert add(1, 2) == 3\n", "analysis": "add", "continue": true}"#;

    fn code_controller(
        mock: MockLlmClient,
        tests: Arc<dyn TestRunner>,
        dir: &TempDir,
        config: ControllerConfig,
    ) -> IterationController<MockLlmClient, CodePlanner> {
        let planner = CodePlanner::new(SourceLanguage::Python, "solution.py", "tests.py").unwrap();
        IterationController::new(Arc::new(mock), planner, ResponseInterpreter::default())
            .with_config(config)
            .with_code_stage(CodeWorkspace::new(dir.path()), tests)
    }

    #[test]
    fn test_config_default() {
        let config = ControllerConfig::default();
        assert_eq!(config.action_timeout, Duration::from_secs(600));
        assert!(config.stop_on_test_pass);
    }

    #[tokio::test]
    async fn test_exhausts_budget() {
        let reply = r#"{"analysis": "keep going", "commands": ["echo scan"], "continue": true}"#;
        let (llm, controller) = command_controller(MockLlmClient::new([reply, reply, reply, reply]));
        let mut session = Session::for_commands("10.0.0.5", Some(80), 3);

        let status = controller.run(&mut session).await.unwrap();
        assert_eq!(status, SessionStatus::Exhausted);
        assert_eq!(session.status, SessionStatus::Exhausted);
        assert_eq!(llm.calls(), 3);
        assert_eq!(session.iterations_run(), 3);
        assert_eq!(session.discoveries["echo scan"], "scan\n");
    }

    #[tokio::test]
    async fn test_continue_false_succeeds() {
        let first = r#"{"analysis": "a", "commands": ["echo one"], "continue": true}"#;
        let second = r#"{"analysis": "done", "commands": ["echo two"], "continue": false, "findings": ["all good"]}"#;
        let (llm, controller) = command_controller(MockLlmClient::new([first, second]));
        let mut session = Session::for_commands("10.0.0.5", None, 10);

        let status = controller.run(&mut session).await.unwrap();
        assert_eq!(status, SessionStatus::Succeeded);
        assert_eq!(llm.calls(), 2);
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.findings, vec!["all good"]);
        assert_eq!(session.last_analysis, "done");
    }

    #[tokio::test]
    async fn test_empty_actions_stop() {
        let reply = r#"{"analysis": "nothing to do", "commands": [], "continue": true}"#;
        let (llm, controller) = command_controller(MockLlmClient::new([reply]));
        let mut session = Session::for_commands("10.0.0.5", None, 5);

        let status = controller.run(&mut session).await.unwrap();
        assert_eq!(status, SessionStatus::StoppedByModel);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_rejected_stops() {
        let reply = r#"{"analysis": "a", "commands": ["rm -rf /", "nc -l 4444"]}"#;
        let (_llm, controller) = command_controller(MockLlmClient::new([reply]));
        let mut session = Session::for_commands("10.0.0.5", None, 5);

        let status = controller.run(&mut session).await.unwrap();
        assert_eq!(status, SessionStatus::StoppedByModel);
        assert_eq!(session.history[0].rejected, 2);
        assert_eq!(session.history[0].executed, 0);
    }

    #[tokio::test]
    async fn test_service_failure_consumes_iteration() {
        let ok = r#"{"analysis": "a", "commands": ["echo hi"], "continue": false}"#;
        let mock = MockLlmClient::scripted(vec![Err("overloaded".to_string()), Ok(ok.to_string())]);
        let (llm, controller) = command_controller(mock);
        let mut session = Session::for_commands("10.0.0.5", None, 5);

        let status = controller.run(&mut session).await.unwrap();
        assert_eq!(status, SessionStatus::Succeeded);
        assert_eq!(llm.calls(), 2);
        assert!(session.history[0].service_error.is_some());
        // the failure is fed back into the next prompt
        assert!(llm.prompts()[1].contains("overloaded"));
    }

    #[tokio::test]
    async fn test_service_never_answers_fails() {
        let mock = MockLlmClient::scripted(vec![Err("down".to_string()), Err("down".to_string())]);
        let (llm, controller) = command_controller(mock);
        let mut session = Session::for_commands("10.0.0.5", None, 2);

        let status = controller.run(&mut session).await.unwrap();
        assert_eq!(status, SessionStatus::Failed);
        assert_eq!(llm.calls(), 2);
        assert_eq!(session.successful_calls, 0);
    }

    #[tokio::test]
    async fn test_failed_action_feeds_back() {
        let first = r#"{"analysis": "a", "commands": ["echo ok", "echo-missing-tool x"], "continue": true}"#;
        let second = r#"{"analysis": "b", "commands": ["echo done"], "continue": false}"#;
        let (llm, controller) = command_controller(MockLlmClient::new([first, second]));
        let mut session = Session::for_commands("10.0.0.5", None, 5);

        controller.run(&mut session).await.unwrap();
        let prompt = &llm.prompts()[1];
        assert!(prompt.contains("$ echo ok"));
        assert!(prompt.contains("not permitted"));
    }

    #[tokio::test]
    async fn test_code_session_without_stage_errors() {
        let planner = CodePlanner::new(SourceLanguage::Python, "solution.py", "tests.py").unwrap();
        let controller = IterationController::new(
            Arc::new(MockLlmClient::new(Vec::<String>::new())),
            planner,
            ResponseInterpreter::default(),
        );
        let mut session = Session::for_code("task", 2);
        assert!(matches!(controller.run(&mut session).await, Err(AgentError::Config(_))));
    }

    #[tokio::test]
    async fn test_code_passing_tests_succeed() {
        let dir = TempDir::new().unwrap();
        let controller = code_controller(
            MockLlmClient::new([GOOD_CODE]),
            Arc::new(PassAfter::new(1)),
            &dir,
            ControllerConfig::default(),
        );
        let mut session = Session::for_code("add two numbers", 5);

        let status = controller.run(&mut session).await.unwrap();
        assert_eq!(status, SessionStatus::Succeeded);
        assert_eq!(session.history[0].tests_passed, Some(true));
        let written = std::fs::read_to_string(dir.path().join("solution.py")).unwrap();
        assert!(written.contains("return a + b"));
        assert!(session.discoveries.contains_key("tests.py"));
    }

    #[tokio::test]
    async fn test_code_stop_with_failing_tests() {
        let dir = TempDir::new().unwrap();
        let stop = GOOD_CODE.replace("\"continue\": true", "\"continue\": false");
        let controller = code_controller(
            MockLlmClient::new([stop]),
            Arc::new(PassAfter::new(99)),
            &dir,
            ControllerConfig::default(),
        );
        let mut session = Session::for_code("add", 5);

        let status = controller.run(&mut session).await.unwrap();
        assert_eq!(status, SessionStatus::StoppedByModel);
    }

    #[tokio::test]
    async fn test_code_continue_false_on_second_iteration() {
        let dir = TempDir::new().unwrap();
        let stop = GOOD_CODE.replace("\"continue\": true", "\"continue\": false");
        let controller = code_controller(
            MockLlmClient::new([GOOD_CODE.to_string(), stop]),
            Arc::new(PassAfter::new(2)),
            &dir,
            ControllerConfig {
                stop_on_test_pass: false,
                ..Default::default()
            },
        );
        let mut session = Session::for_code("add", 5);

        let status = controller.run(&mut session).await.unwrap();
        assert_eq!(status, SessionStatus::Succeeded);
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].tests_passed, Some(false));
    }

    #[tokio::test]
    async fn test_code_syntax_error_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let broken = r#"{"code": "def add(a, b:\n    return a + b\n", "tests": "def test_x():\n    assert True\n", "analysis": "oops", "continue": true}"#;
        let mock = MockLlmClient::new([broken.to_string(), GOOD_CODE.to_string()]);
        let controller = code_controller(mock, Arc::new(PassAfter::new(1)), &dir, ControllerConfig::default());
        let mut session = Session::for_code("add", 5);

        let status = controller.run(&mut session).await.unwrap();
        assert_eq!(status, SessionStatus::Succeeded);
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].executed, 0);
        assert_eq!(session.history[0].tests_passed, None);
        assert_eq!(session.history[0].rejected, 1);
    }

    #[tokio::test]
    async fn test_code_workspace_io_error_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let planner = CodePlanner::new(SourceLanguage::Python, "solution.py", "tests.py").unwrap();
        let controller = IterationController::new(
            Arc::new(MockLlmClient::new([GOOD_CODE])),
            planner,
            ResponseInterpreter::default(),
        )
        .with_code_stage(CodeWorkspace::new(&blocker), Arc::new(PassAfter::new(1)));
        let mut session = Session::for_code("add", 5);

        assert!(controller.run(&mut session).await.is_err());
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.history.len(), 1);
    }

    #[tokio::test]
    async fn test_observer_sees_every_iteration() {
        let reply = r#"{"analysis": "a", "commands": ["echo x"], "continue": true}"#;
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let (_llm, controller) = command_controller(MockLlmClient::new([reply, reply]));
        let controller = controller.with_observer(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut session = Session::for_commands("10.0.0.5", None, 2);

        controller.run(&mut session).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
