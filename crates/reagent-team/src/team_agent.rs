//! A team exposed through the [`Agent`] trait

use crate::{Team, TeamError};
use async_trait::async_trait;
use reagent_core::{Agent, RunResult, Task};

/// Adapter running a [`Team`] wherever an [`Agent`] is expected
///
/// Lets a team be nested as a member of another team. Errors are folded
/// into a failed [`RunResult`]; a failing stage contributes the transcripts
/// of every stage that ran.
pub struct TeamAgent {
    team: Team,
    keywords: Vec<String>,
}

impl TeamAgent {
    /// Wrap a team
    pub fn new(team: Team) -> Self {
        Self {
            team,
            keywords: Vec::new(),
        }
    }

    /// Keywords used when this team is routed to by keyword
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// The wrapped team
    pub fn team(&self) -> &Team {
        &self.team
    }
}

#[async_trait]
impl Agent for TeamAgent {
    async fn run(&self, task: Task) -> RunResult {
        match self.team.run_task(task).await {
            Ok(result) => result.into_run_result(self.team.name()),
            Err(TeamError::Routing(error)) => RunResult::failed(self.team.name(), error, Vec::new()),
            Err(TeamError::StageFailed {
                error,
                completed,
                failed,
                ..
            }) => {
                let transcript = completed
                    .into_iter()
                    .flat_map(|s| s.result.transcript)
                    .chain(failed.transcript)
                    .collect();
                RunResult::failed(self.team.name(), error, transcript)
            }
        }
    }

    fn name(&self) -> &str {
        self.team.name()
    }

    fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl std::fmt::Debug for TeamAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamAgent")
            .field("team", &self.team)
            .field("keywords", &self.keywords)
            .finish()
    }
}
