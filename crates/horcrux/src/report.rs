//! per-holder outcome of one recompose call

use std::fmt;

use crate::Error;

/// how one attempt ended
#[derive(Clone, Debug)]
pub enum AttemptStatus {
    /// shard recovered
    Ok,
    /// the attempt's task ended without producing a result
    MissingShard,
    /// stopped because enough shards were already in hand
    Cancelled,
    /// handshake, transport or timeout failure
    Error(Error),
}

impl AttemptStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, AttemptStatus::Ok)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::Ok => write!(f, "ok"),
            AttemptStatus::MissingShard => write!(f, "missing shard"),
            AttemptStatus::Cancelled => write!(f, "cancelled"),
            AttemptStatus::Error(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AttemptReport {
    pub name: String,
    pub status: AttemptStatus,
}

/// one row per configured holder, in configuration order
#[derive(Clone, Debug, Default)]
pub struct Report {
    pub rows: Vec<AttemptReport>,
}

impl Report {
    pub fn successes(&self) -> usize {
        self.rows.iter().filter(|r| r.status.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.rows.len() - self.successes()
    }

    pub fn status_of(&self, name: &str) -> Option<&AttemptStatus> {
        self.rows.iter().find(|r| r.name == name).map(|r| &r.status)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.rows.iter().map(|r| r.name.len()).max().unwrap_or(0) + 4;
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{:<width$}{}", row.name, row.status, width = width)?;
        }
        Ok(())
    }
}
