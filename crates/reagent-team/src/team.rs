//! Team definition and execution

use crate::routing::keywords_match;
use crate::{RoutingPolicy, TeamError};
use futures::future::join_all;
use reagent_core::task::keys;
use reagent_core::{Agent, Error, Message, Result, RunResult, RunStatus, Task, ToolCallRecord};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};

/// Output of one team stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutput {
    /// Role the agent played in the team
    pub role: String,
    /// The agent's own result
    pub result: RunResult,
}

/// Result of running a team on a task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamResult {
    /// `Done`, or `Incomplete` when any stage hit its step limit
    pub status: RunStatus,
    /// Final answer of the team
    pub answer: Option<String>,
    /// Every stage that ran, in declaration order
    pub stages: Vec<StageOutput>,
}

impl TeamResult {
    /// Check if every stage finished with an answer
    pub fn is_done(&self) -> bool {
        self.status == RunStatus::Done
    }

    /// Answer text, or an empty string
    pub fn answer_text(&self) -> &str {
        self.answer.as_deref().unwrap_or_default()
    }

    /// Flatten into a single run result attributed to `agent`
    ///
    /// Stage transcripts and tool calls are concatenated in stage order.
    pub fn into_run_result(self, agent: impl Into<String>) -> RunResult {
        let steps = self.stages.iter().map(|s| s.result.steps).sum();
        let mut transcript: Vec<Message> = Vec::new();
        let mut tool_calls: Vec<ToolCallRecord> = Vec::new();
        for stage in self.stages {
            transcript.extend(stage.result.transcript);
            tool_calls.extend(stage.result.tool_calls);
        }

        let result = match self.status {
            RunStatus::Done => RunResult::done(agent, self.answer.unwrap_or_default(), transcript),
            _ => RunResult::incomplete(agent, self.answer, transcript),
        };
        result.with_steps(steps).with_tool_calls(tool_calls)
    }
}

struct Member {
    role: String,
    agent: Arc<dyn Agent>,
}

/// A set of agents coordinated to complete one task
///
/// # Example
///
/// ```no_run
/// use reagent_team::{RoutingPolicy, Team};
/// use reagent_core::{Agent, Task};
/// use std::sync::Arc;
///
/// # async fn example(planner: Arc<dyn Agent>, reviewer: Arc<dyn Agent>) -> Result<(), Box<dyn std::error::Error>> {
/// let team = Team::builder("travel")
///     .add_member("planner", planner)
///     .add_member("reviewer", reviewer)
///     .routing(RoutingPolicy::FixedOrder)
///     .build()?;
///
/// let result = team.run_task(Task::new("Plan two days in Rome")).await?;
/// println!("{}", result.answer_text());
/// # Ok(())
/// # }
/// ```
pub struct Team {
    name: String,
    members: Vec<Member>,
    routing: RoutingPolicy,
}

impl Team {
    /// Create a new team builder
    pub fn builder(name: impl Into<String>) -> TeamBuilder {
        TeamBuilder::new(name)
    }

    /// Team name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routing policy
    pub fn routing(&self) -> RoutingPolicy {
        self.routing
    }

    /// Member roles in declaration order
    pub fn roles(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.role.as_str()).collect()
    }

    /// Run the team on a task
    pub async fn run_task(&self, task: Task) -> std::result::Result<TeamResult, TeamError> {
        let span = info_span!(
            "team_run",
            team = %self.name,
            routing = %self.routing,
            run_id = task.run_id().unwrap_or_default()
        );

        async move {
            info!(members = self.members.len(), "Team run started");
            let result = match self.routing {
                RoutingPolicy::FixedOrder => self.run_pipeline(task).await,
                RoutingPolicy::DispatchByKeyword { require_unique } => {
                    self.run_dispatch(task, require_unique).await
                }
                RoutingPolicy::FanOut => self.run_fan_out(task).await,
            };
            match &result {
                Ok(r) => info!(status = %r.status, stages = r.stages.len(), "Team run finished"),
                Err(e) => warn!(error = %e, "Team run failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_pipeline(&self, task: Task) -> std::result::Result<TeamResult, TeamError> {
        let mut completed: Vec<StageOutput> = Vec::with_capacity(self.members.len());
        let mut incomplete = false;

        for (index, member) in self.members.iter().enumerate() {
            let stage_task = match completed.last() {
                Some(previous) => task.next_stage(previous.result.answer_text()),
                None => task.clone(),
            };
            info!(stage = index, role = %member.role, "Running pipeline stage");

            let result = member.agent.run(stage_tagged(stage_task, index, &member.role)).await;
            match result.status {
                RunStatus::Error => return Err(stage_failed(&member.role, result, completed)),
                RunStatus::Incomplete => {
                    warn!(stage = index, role = %member.role, "Stage incomplete, passing partial answer on");
                    incomplete = true;
                }
                RunStatus::Done => {}
            }
            completed.push(StageOutput {
                role: member.role.clone(),
                result,
            });
        }

        let answer = completed.last().and_then(|s| s.result.answer.clone());
        Ok(TeamResult {
            status: if incomplete { RunStatus::Incomplete } else { RunStatus::Done },
            answer,
            stages: completed,
        })
    }

    async fn run_dispatch(
        &self,
        task: Task,
        require_unique: bool,
    ) -> std::result::Result<TeamResult, TeamError> {
        let member = self.select(task.text(), require_unique)?;
        info!(role = %member.role, "Dispatching task");

        let result = member.agent.run(stage_tagged(task, 0, &member.role)).await;
        if result.status == RunStatus::Error {
            return Err(stage_failed(&member.role, result, Vec::new()));
        }

        Ok(TeamResult {
            status: result.status,
            answer: result.answer.clone(),
            stages: vec![StageOutput {
                role: member.role.clone(),
                result,
            }],
        })
    }

    async fn run_fan_out(&self, task: Task) -> std::result::Result<TeamResult, TeamError> {
        let runs = self
            .members
            .iter()
            .enumerate()
            .map(|(index, member)| member.agent.run(stage_tagged(task.clone(), index, &member.role)));
        let results = join_all(runs).await;

        let stages: Vec<StageOutput> = self
            .members
            .iter()
            .zip(results)
            .map(|(member, result)| StageOutput {
                role: member.role.clone(),
                result,
            })
            .collect();

        if let Some(pos) = stages.iter().position(|s| s.result.status == RunStatus::Error) {
            let mut completed = stages;
            let failed = completed.remove(pos);
            completed.retain(|s| s.result.status != RunStatus::Error);
            return Err(stage_failed(&failed.role, failed.result, completed));
        }

        let status = if stages.iter().all(|s| s.result.is_done()) {
            RunStatus::Done
        } else {
            RunStatus::Incomplete
        };
        let answer = stages
            .iter()
            .filter_map(|s| s.result.answer.as_deref().map(|a| format!("[{}]\n{a}", s.role)))
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(TeamResult {
            status,
            answer: Some(answer).filter(|a| !a.is_empty()),
            stages,
        })
    }

    /// Pick the member whose keywords match the task text
    fn select(&self, text: &str, require_unique: bool) -> Result<&Member> {
        let candidates: Vec<&Member> = self
            .members
            .iter()
            .filter(|m| keywords_match(m.agent.keywords(), text))
            .collect();

        match candidates.as_slice() {
            [] => Err(Error::NoMatchingAgent(text.to_string())),
            [only] => Ok(only),
            [first, ..] if !require_unique => {
                warn!(
                    candidates = candidates.len(),
                    chosen = %first.role,
                    "Several agents match, using the first declared"
                );
                Ok(first)
            }
            _ => Err(Error::AmbiguousRouting {
                candidates: candidates.iter().map(|m| m.role.clone()).collect(),
            }),
        }
    }
}

impl std::fmt::Debug for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Team")
            .field("name", &self.name)
            .field("roles", &self.roles())
            .field("routing", &self.routing)
            .finish()
    }
}

fn stage_tagged(mut task: Task, index: usize, role: &str) -> Task {
    task.insert(keys::STAGE, serde_json::json!(index));
    task.insert(keys::ROLE, serde_json::json!(role));
    task
}

fn stage_failed(role: &str, result: RunResult, completed: Vec<StageOutput>) -> TeamError {
    let error = result
        .error
        .clone()
        .unwrap_or_else(|| Error::InitializationFailed(format!("Stage '{role}' failed without an error")));
    TeamError::StageFailed {
        role: role.to_string(),
        error,
        completed,
        failed: Box::new(result),
    }
}

/// Builder for constructing teams
pub struct TeamBuilder {
    name: String,
    members: Vec<Member>,
    routing: RoutingPolicy,
}

impl TeamBuilder {
    /// Create a new team builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            routing: RoutingPolicy::default(),
        }
    }

    /// Add an agent under its own name as role
    pub fn add_agent(self, agent: Arc<dyn Agent>) -> Self {
        let role = agent.name().to_string();
        self.add_member(role, agent)
    }

    /// Add an agent under an explicit role
    pub fn add_member(mut self, role: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        self.members.push(Member {
            role: role.into(),
            agent,
        });
        self
    }

    /// Set the routing policy
    pub fn routing(mut self, routing: RoutingPolicy) -> Self {
        self.routing = routing;
        self
    }

    /// Build the team
    ///
    /// Fails when the team is empty or two members share a role.
    pub fn build(self) -> Result<Team> {
        if self.members.is_empty() {
            return Err(Error::Configuration(format!(
                "Team '{}' has no agents",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.members.iter().find(|m| !seen.insert(m.role.as_str())) {
            return Err(Error::Configuration(format!(
                "Team '{}' declares role '{}' twice",
                self.name, dup.role
            )));
        }

        Ok(Team {
            name: self.name,
            members: self.members,
            routing: self.routing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reagent_core::ErrorKind;
    use reagent_llm::ScriptedGateway;
    use reagent_runtime::{ReactAgent, RetryPolicy};
    use reagent_tools::builtin_registry;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Agent returning a fixed outcome and recording the tasks it saw
    struct StubAgent {
        name: String,
        keywords: Vec<String>,
        status: RunStatus,
        seen: Mutex<Vec<Task>>,
    }

    impl StubAgent {
        fn new(name: &str, status: RunStatus) -> Arc<Self> {
            Self::with_keywords(name, status, &[])
        }

        fn with_keywords(name: &str, status: RunStatus, keywords: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
                status,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Task> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Agent for StubAgent {
        async fn run(&self, task: Task) -> RunResult {
            self.seen.lock().unwrap().push(task.clone());
            let transcript = vec![Message::user(task.render())];
            match self.status {
                RunStatus::Done => RunResult::done(&self.name, format!("{} done", self.name), transcript),
                RunStatus::Incomplete => {
                    RunResult::incomplete(&self.name, Some(format!("{} partial", self.name)), transcript)
                }
                RunStatus::Error => RunResult::failed(
                    &self.name,
                    Error::GatewayTransport("down".into()),
                    transcript,
                ),
            }
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn keywords(&self) -> &[String] {
            &self.keywords
        }
    }

    fn react_agent(name: &str, keywords: &[&str], replies: &[&str]) -> Arc<ReactAgent> {
        let gateway = Arc::new(ScriptedGateway::from_replies(replies.iter().copied()));
        let tools = Arc::new(builtin_registry().unwrap().subset(&["calculate"]).unwrap());
        Arc::new(
            ReactAgent::builder()
                .name(name)
                .keywords(keywords.iter().copied())
                .gateway(gateway)
                .tools(tools)
                .retry(RetryPolicy::fast())
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_pipeline_passes_answers() {
        let planner = StubAgent::new("planner", RunStatus::Done);
        let reviewer = StubAgent::new("reviewer", RunStatus::Done);
        let team = Team::builder("trip")
            .add_agent(planner.clone())
            .add_agent(reviewer.clone())
            .build()
            .unwrap();

        let result = assert_ok!(team.run_task(Task::new("Plan Rome")).await);

        assert!(result.is_done());
        assert_eq!(result.answer_text(), "reviewer done");
        assert_eq!(result.stages.len(), 2);

        let first = &planner.seen()[0];
        assert!(first.prior_context().is_none());
        assert_eq!(first.get(keys::STAGE), Some(&serde_json::json!(0)));

        let second = &reviewer.seen()[0];
        assert_eq!(second.text(), "Plan Rome");
        assert_eq!(second.prior_context(), Some("planner done"));
        assert_eq!(second.get(keys::ROLE), Some(&serde_json::json!("reviewer")));
    }

    #[tokio::test]
    async fn test_pipeline_incomplete_stage_passes_partial() {
        let planner = StubAgent::new("planner", RunStatus::Incomplete);
        let reviewer = StubAgent::new("reviewer", RunStatus::Done);
        let team = Team::builder("trip")
            .add_agent(planner)
            .add_agent(reviewer.clone())
            .build()
            .unwrap();

        let result = assert_ok!(team.run_task(Task::new("Plan Rome")).await);
        assert_eq!(result.status, RunStatus::Incomplete);
        assert_eq!(reviewer.seen()[0].prior_context(), Some("planner partial"));
    }

    #[tokio::test]
    async fn test_pipeline_aborts_on_error() {
        let first = StubAgent::new("first", RunStatus::Done);
        let broken = StubAgent::new("broken", RunStatus::Error);
        let never = StubAgent::new("never", RunStatus::Done);
        let team = Team::builder("chain")
            .add_agent(first)
            .add_agent(broken)
            .add_agent(never.clone())
            .build()
            .unwrap();

        let err = assert_err!(team.run_task(Task::new("go")).await);
        match &err {
            TeamError::StageFailed { role, error, completed, failed } => {
                assert_eq!(role, "broken");
                assert_eq!(error.kind(), ErrorKind::GatewayTransport);
                assert_eq!(completed.len(), 1);
                assert_eq!(completed[0].result.answer_text(), "first done");
                assert_eq!(failed.transcript.len(), 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.completed().len(), 1);
        assert!(never.seen().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_no_match() {
        let team = Team::builder("desk")
            .add_agent(StubAgent::with_keywords("weather", RunStatus::Done, &["weather"]))
            .routing(RoutingPolicy::DispatchByKeyword { require_unique: true })
            .build()
            .unwrap();

        let err = assert_err!(team.run_task(Task::new("compute 2+2")).await);
        assert_eq!(err.kind(), ErrorKind::NoMatchingAgent);
    }

    #[tokio::test]
    async fn test_dispatch_first_declared_without_uniqueness() {
        let a = StubAgent::with_keywords("a", RunStatus::Done, &["math"]);
        let b = StubAgent::with_keywords("b", RunStatus::Done, &["math"]);
        let team = Team::builder("desk")
            .add_agent(a)
            .add_agent(b.clone())
            .routing(RoutingPolicy::DispatchByKeyword { require_unique: false })
            .build()
            .unwrap();

        let result = assert_ok!(team.run_task(Task::new("some math")).await);
        assert_eq!(result.answer_text(), "a done");
        assert!(b.seen().is_empty());
    }

    #[tokio::test]
    async fn test_keyword_routing_ambiguity_then_unique() {
        let answer = ["<action>calculate(\"6*7\")</action>", "<final_answer>42</final_answer>"];

        let ambiguous = Team::builder("desk")
            .add_agent(react_agent("math", &["calculate"], &answer))
            .add_agent(react_agent("numbers", &["Calculate"], &answer))
            .routing(RoutingPolicy::DispatchByKeyword { require_unique: true })
            .build()
            .unwrap();
        let err = assert_err!(ambiguous.run_task(Task::new("calculate 6*7")).await);
        match err {
            TeamError::Routing(Error::AmbiguousRouting { candidates }) => {
                assert_eq!(candidates, ["math", "numbers"]);
            }
            other => panic!("unexpected error {other:?}"),
        }

        let unique = Team::builder("desk")
            .add_agent(react_agent("math", &["calculate"], &answer))
            .add_agent(react_agent("numbers", &["statistics"], &answer))
            .routing(RoutingPolicy::DispatchByKeyword { require_unique: true })
            .build()
            .unwrap();
        let result = assert_ok!(unique.run_task(Task::new("calculate 6*7")).await);
        assert_eq!(result.status, RunStatus::Done);
        assert_eq!(result.answer_text(), "42");
        assert_eq!(result.stages[0].role, "math");
        assert_eq!(result.stages[0].result.transcript[3].text(), "42");
    }

    #[tokio::test]
    async fn test_fan_out_aggregates_in_order() {
        let team = Team::builder("panel")
            .add_agent(StubAgent::new("optimist", RunStatus::Done))
            .add_agent(StubAgent::new("pessimist", RunStatus::Incomplete))
            .routing(RoutingPolicy::FanOut)
            .build()
            .unwrap();

        let result = assert_ok!(team.run_task(Task::new("Is it going to rain?")).await);
        assert_eq!(result.status, RunStatus::Incomplete);
        assert_eq!(
            result.answer_text(),
            "[optimist]\noptimist done\n\n[pessimist]\npessimist partial"
        );
    }

    #[tokio::test]
    async fn test_fan_out_failure_keeps_other_stages() {
        let team = Team::builder("panel")
            .add_agent(StubAgent::new("ok", RunStatus::Done))
            .add_agent(StubAgent::new("broken", RunStatus::Error))
            .routing(RoutingPolicy::FanOut)
            .build()
            .unwrap();

        let err = assert_err!(team.run_task(Task::new("q")).await);
        assert!(matches!(&err, TeamError::StageFailed { role, .. } if role == "broken"));
        assert_eq!(err.completed().len(), 1);
    }

    #[test]
    fn test_builder_validation() {
        let err = Team::builder("empty").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = Team::builder("dup")
            .add_agent(StubAgent::new("a", RunStatus::Done))
            .add_member("a", StubAgent::new("b", RunStatus::Done))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("role 'a' twice"));
    }

    #[test]
    fn test_into_run_result() {
        let result = TeamResult {
            status: RunStatus::Done,
            answer: Some("final".into()),
            stages: vec![
                StageOutput {
                    role: "a".into(),
                    result: RunResult::done("a", "x", vec![Message::user("1")]).with_steps(2),
                },
                StageOutput {
                    role: "b".into(),
                    result: RunResult::done("b", "final", vec![Message::user("2")]).with_steps(1),
                },
            ],
        };

        let flat = result.into_run_result("team");
        assert_eq!(flat.agent, "team");
        assert_eq!(flat.answer_text(), "final");
        assert_eq!(flat.steps, 3);
        assert_eq!(flat.transcript.len(), 2);
    }
}
