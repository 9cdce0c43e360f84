//! The shipped poll-creation procedure.
//!
//! Four steps, all linear:
//!
//! ```text
//! general ─▶ candidates ─▶ parameters ─▶ summary
//! ```
//!
//! Every step's fields are carried forward, so the summary step holds the
//! whole request when it is confirmed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use itervote_core::logging::targets;

use crate::binding::FixedBinding;
use crate::error::Result;
use crate::form::{FormControl, StepForm, Validator};
use crate::query::Query;
use crate::submit::Submitter;
use crate::tree::{CreationTree, StepSpec};

/// Step segments.
pub mod segments {
    pub const GENERAL: &str = "general";
    pub const CANDIDATES: &str = "candidates";
    pub const PARAMETERS: &str = "parameters";
    pub const SUMMARY: &str = "summary";
}

/// Query field names.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const CANDIDATES: &str = "candidates";
    pub const NB_ROUNDS: &str = "nbRounds";
    pub const ROUND_DURATION: &str = "roundDuration";
    pub const VOTE_TYPE: &str = "voteType";
}

/// Default number of rounds.
pub const DEFAULT_ROUNDS: u32 = 3;
/// Default round duration, in minutes.
pub const DEFAULT_ROUND_DURATION: u32 = 24 * 60;
/// Longest allowed round, in minutes.
pub const MAX_ROUND_DURATION: u32 = 7 * 24 * 60;
/// Most rounds a poll may have.
pub const MAX_ROUNDS: u32 = 10;

/// The procedure as a declarative tree.
pub fn poll_creation_spec() -> StepSpec {
    StepSpec::linear(
        segments::GENERAL,
        "General",
        StepSpec::linear(
            segments::CANDIDATES,
            "Candidates",
            StepSpec::linear(
                segments::PARAMETERS,
                "Parameters",
                StepSpec::final_step(segments::SUMMARY, "Summary"),
            ),
        ),
    )
}

/// The procedure, built.
pub fn poll_creation_tree() -> Result<CreationTree> {
    CreationTree::build(poll_creation_spec())
}

/// Title and description.
pub fn general_form() -> StepForm {
    StepForm::new([
        FormControl::new(fields::TITLE)
            .with_validator(Validator::Required)
            .with_validator(Validator::MaxLength(200)),
        FormControl::new(fields::DESCRIPTION).with_validator(Validator::MaxLength(2000)),
    ])
}

/// The list of candidates; at least two distinct, non-blank names.
pub fn candidates_form() -> StepForm {
    StepForm::new([FormControl::new(fields::CANDIDATES)
        .with_default(json!([]))
        .with_validator(Validator::MinItems(2))
        .with_validator(Validator::custom(check_candidates))])
}

/// Rounds, round duration and vote type.
pub fn parameters_form() -> StepForm {
    StepForm::new([
        FormControl::new(fields::NB_ROUNDS)
            .with_default(json!(DEFAULT_ROUNDS))
            .with_validator(Validator::IntegerRange {
                min: 1,
                max: i64::from(MAX_ROUNDS),
            }),
        FormControl::new(fields::ROUND_DURATION)
            .with_default(json!(DEFAULT_ROUND_DURATION))
            .with_validator(Validator::IntegerRange {
                min: 1,
                max: i64::from(MAX_ROUND_DURATION),
            }),
        FormControl::new(fields::VOTE_TYPE)
            .with_default(json!(VoteType::default()))
            .with_validator(Validator::custom(|value| {
                serde_json::from_value::<VoteType>(value.clone())
                    .err()
                    .map(|_| "must be 'majority' or 'alternative'".to_string())
            })),
    ])
}

/// The summary step edits nothing and can always be confirmed.
pub fn summary_binding() -> FixedBinding {
    FixedBinding::passive()
}

fn check_candidates(value: &Value) -> Option<String> {
    let Value::Array(items) = value else {
        return Some("must be a list".into());
    };
    let mut seen = HashSet::new();
    for item in items {
        let Some(name) = item.as_str() else {
            return Some("must only contain names".into());
        };
        let name = name.trim();
        if name.is_empty() {
            return Some("must not contain blank names".into());
        }
        if !seen.insert(name.to_lowercase()) {
            return Some(format!("lists '{name}' twice"));
        }
    }
    None
}

/// How ballots are counted each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    /// One choice per ballot.
    Majority,
    /// Ranked ballots.
    #[default]
    Alternative,
}

/// A complete poll-creation request, as sent to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub candidates: Vec<String>,
    pub nb_rounds: u32,
    /// Minutes.
    pub round_duration: u32,
    #[serde(default)]
    pub vote_type: VoteType,
}

impl CreatePollRequest {
    /// Decode an accumulated query.
    pub fn from_query(query: &Query) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(query.clone()))?)
    }

    /// Encode as a query.
    pub fn to_query(&self) -> Result<Query> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }
}

/// A [`Submitter`] that decodes the query into a [`CreatePollRequest`]
/// before handing it on.
///
/// Queries that do not decode are logged and dropped.
pub struct RequestSubmitter<F> {
    send: F,
}

impl<F> RequestSubmitter<F>
where
    F: Fn(CreatePollRequest) + Send + Sync,
{
    /// Hand decoded requests to `send`.
    pub fn new(send: F) -> Self {
        Self { send }
    }
}

impl<F> Submitter for RequestSubmitter<F>
where
    F: Fn(CreatePollRequest) + Send + Sync,
{
    fn submit(&self, query: Query) {
        match CreatePollRequest::from_query(&query) {
            Ok(request) => {
                tracing::info!(
                    target: targets::CONTROLLER,
                    title = %request.title,
                    candidates = request.candidates.len(),
                    rounds = request.nb_rounds,
                    "sending poll creation request"
                );
                (self.send)(request);
            }
            Err(err) => {
                tracing::error!(
                    target: targets::CONTROLLER,
                    error = %err,
                    "accumulated query is not a valid poll request"
                );
            }
        }
    }
}
