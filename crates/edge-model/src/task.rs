use crate::{Cookie, Dxo, TaskId};

/// Meta key carrying the coordinator's round number.
pub const META_CONTRIBUTION_ROUND: &str = "contribution_round";
/// Meta key carrying the total number of rounds.
pub const META_NUM_ROUNDS: &str = "num_rounds";

/// A single unit of work; lives for one pipeline pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub data: Dxo,
    pub cookie: Option<Cookie>,
    /// Round declared by the coordinator, if any.
    pub round: Option<u32>,
    /// Total rounds declared by the coordinator, if any.
    pub total_rounds: Option<u32>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, name: impl Into<String>, data: Dxo) -> Self {
        let round = data.meta_u32(META_CONTRIBUTION_ROUND);
        let total_rounds = data.meta_u32(META_NUM_ROUNDS);
        Self {
            id: id.into(),
            name: name.into(),
            data,
            cookie: None,
            round,
            total_rounds,
        }
    }

    pub fn with_cookie(mut self, cookie: Option<Cookie>) -> Self {
        self.cookie = cookie;
        self
    }
}
