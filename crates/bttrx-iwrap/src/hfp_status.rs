//! Indicator values reported by the hands-free device.
//!
//! With an HFP link up, the module forwards indicator updates as
//! `HFP <link> STATUS "<name>" <value>`, e.g. `HFP 0 STATUS "service" 1`.
//! Entries are upserted and never pruned.

use std::collections::HashMap;

use bttrx_core::{Error, LinkId, Result};
use bttrx_line_io::protocol::tokenize;

/// Latest status value per link and indicator name.
#[derive(Debug, Default, Clone)]
pub struct HfpStatusTable {
    links: HashMap<LinkId, HashMap<String, i32>>,
}

/// Whether `line` is an `HFP <link> STATUS ...` report.
pub fn is_status_line(line: &str) -> bool {
    let tokens = tokenize(line);
    tokens.first() == Some(&"HFP") && tokens.get(2) == Some(&"STATUS")
}

impl HfpStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a status report and store its value.
    pub fn store(&mut self, line: &str) -> Result<()> {
        let tokens = tokenize(line);
        if tokens.len() < 5 || tokens[0] != "HFP" || tokens[2] != "STATUS" {
            return Err(Error::Malformed(format!("not an HFP status report: {line:?}")));
        }

        let link_id: LinkId = tokens[1]
            .parse()
            .map_err(|_| Error::Malformed(format!("bad link id in {line:?}")))?;
        let name = tokens[3].trim_matches('"');
        if name.is_empty() {
            return Err(Error::Malformed(format!("empty status name in {line:?}")));
        }
        let value: i32 = tokens[4]
            .parse()
            .map_err(|_| Error::Malformed(format!("bad status value in {line:?}")))?;

        tracing::debug!(link_id, name, value, "HFP status");
        self.links
            .entry(link_id)
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    /// Value last reported for `name` on `link_id`.
    pub fn get(&self, link_id: LinkId, name: &str) -> Result<i32> {
        self.links
            .get(&link_id)
            .and_then(|statuses| statuses.get(name))
            .copied()
            .ok_or_else(|| Error::StatusNotFound {
                link_id,
                name: name.to_string(),
            })
    }
}
