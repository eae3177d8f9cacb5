// Role resolution and the static role -> cluster table.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// Tactical cluster a role code belongs to. Each cluster has its own radar
/// template and its own peer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cluster {
    Forward,
    AttackingMidfield,
    FlankMidfield,
    CentralMidfield,
    CenterBack,
    Goalkeeper,
}

/// Role codes per cluster. Codes not listed anywhere (full-backs, wing-backs,
/// anything unknown) are unclassified.
const ROLE_TABLE: &[(Cluster, &[&str])] = &[
    (Cluster::Forward, &["ST", "CF", "SS"]),
    (Cluster::AttackingMidfield, &["CAM", "AM"]),
    (Cluster::FlankMidfield, &["LM", "RM", "LW", "RW"]),
    (Cluster::CentralMidfield, &["CM", "CDM", "DM"]),
    (Cluster::CenterBack, &["CB", "LCB", "RCB"]),
    (Cluster::Goalkeeper, &["GK"]),
];

impl Cluster {
    pub const ALL: [Cluster; 6] = [
        Cluster::Forward,
        Cluster::AttackingMidfield,
        Cluster::FlankMidfield,
        Cluster::CentralMidfield,
        Cluster::CenterBack,
        Cluster::Goalkeeper,
    ];

    /// Role codes that aggregate into this cluster.
    pub fn roles(&self) -> &'static [&'static str] {
        ROLE_TABLE
            .iter()
            .find(|(cluster, _)| cluster == self)
            .map(|(_, roles)| *roles)
            .unwrap_or(&[])
    }

    /// Whether `code` belongs to this cluster.
    pub fn includes(&self, code: &str) -> bool {
        cluster_for_role(code) == Some(*self)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Cluster::Forward => "Forward",
            Cluster::AttackingMidfield => "Attacking Midfield",
            Cluster::FlankMidfield => "Flank Midfield",
            Cluster::CentralMidfield => "Central Midfield",
            Cluster::CenterBack => "Center Back",
            Cluster::Goalkeeper => "Goalkeeper",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Map a role code to its cluster. Matching ignores case and surrounding
/// whitespace.
pub fn cluster_for_role(code: &str) -> Option<Cluster> {
    let code = code.trim();
    ROLE_TABLE
        .iter()
        .find(|(_, roles)| roles.iter().any(|r| r.eq_ignore_ascii_case(code)))
        .map(|(cluster, _)| *cluster)
}

// ---------------------------------------------------------------------------
// Current-role resolution
// ---------------------------------------------------------------------------

/// Outcome of role resolution. Both fields are `None` when there is no
/// history; `cluster` alone is `None` for unclassified roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRole {
    pub role: Option<String>,
    pub cluster: Option<Cluster>,
}

/// Pick the player's current role from their recent role codes.
///
/// `recent` must be ordered newest first (and already capped to the recent
/// match window). The role with the strictly highest count wins. On a tie
/// the role encountered first wins, which with newest-first input means the
/// most recently played of the tied roles.
pub fn resolve_current_role<I, S>(recent: I) -> ResolvedRole
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    // First-seen order is preserved so ties resolve deterministically.
    let mut counts: Vec<(String, usize)> = Vec::new();
    for code in recent {
        let code = code.as_ref().trim().to_uppercase();
        if code.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(c, _)| *c == code) {
            Some((_, n)) => *n += 1,
            None => counts.push((code, 1)),
        }
    }

    let mut best: Option<&(String, usize)> = None;
    for entry in &counts {
        if best.map_or(true, |b| entry.1 > b.1) {
            best = Some(entry);
        }
    }

    let role = best.map(|(code, _)| code.clone());
    let cluster = role.as_deref().and_then(cluster_for_role);
    ResolvedRole { role, cluster }
}
