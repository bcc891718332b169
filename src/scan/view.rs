use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the body a photograph shows.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Front,
    Left,
    Right,
}

impl View {
    /// Every view, in the order a scan processes them.
    pub const ALL: [View; 3] = [View::Front, View::Left, View::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Front => "front",
            View::Left => "left",
            View::Right => "right",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three uploaded photographs, still encoded.
#[derive(Clone, Debug)]
pub struct ViewImages {
    pub front: Vec<u8>,
    pub left: Vec<u8>,
    pub right: Vec<u8>,
}

impl ViewImages {
    pub fn get(&self, view: View) -> &[u8] {
        match view {
            View::Front => &self.front,
            View::Left => &self.left,
            View::Right => &self.right,
        }
    }
}
