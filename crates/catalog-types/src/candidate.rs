use serde::{Deserialize, Serialize};

/// One entry of a ranked candidate list.
///
/// Produced by the ranking stage and read, never mutated, by the fetch
/// pipeline. The `id` is kept as text because ranking collaborators hand out
/// opaque identifiers; the pipeline validates it when resolving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
	pub id: String,
	#[serde(default)]
	pub score: f32,
}

impl CandidateItem {
	pub fn new(id: impl Into<String>, score: f32) -> Self {
		Self {
			id: id.into(),
			score,
		}
	}
}
