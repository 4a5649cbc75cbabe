// # Chunking SPF Splitter
//
// Turns one zone's SPF text into a size-bounded set of TXT records linked by
// includes. The primary record keeps the version marker, the include chain
// and the terminal `all` mechanism; every other mechanism is packed into
// numbered sub-records (`spf1.<zone>`, `spf2.<zone>`, ...), each within the
// caller's character budget.
//
// The splitter is pure text manipulation: it performs no DNS lookups and
// makes no judgement about whether the mechanisms are reachable or sane.
// Content that already fits in one record yields a primary-only plan, which
// the reconciler treats as "nothing to split".

use async_trait::async_trait;
use spf_core::error::{Error, Result};
use spf_core::traits::{FlatRecord, PRIMARY_KEY, SpfSplitter, SplitPlan};
use tracing::debug;

/// SPF version marker every record must begin with
const VERSION_TOKEN: &str = "v=spf1";

/// Placeholder in the sub-record naming pattern
const PATTERN_PLACEHOLDER: char = '#';

/// Splits SPF text into include-linked chunks
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkingSplitter;

impl ChunkingSplitter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SpfSplitter for ChunkingSplitter {
    /// Normalize authored SPF text: collapse whitespace, verify the version
    /// marker leads
    async fn flatten_from_text(&self, zone: &str, spf_text: &str) -> Result<FlatRecord> {
        let tokens: Vec<&str> = spf_text.split_whitespace().collect();
        match tokens.first() {
            Some(&VERSION_TOKEN) => {}
            _ => {
                return Err(Error::splitter(format!(
                    "SPF text for {} does not start with {}",
                    zone, VERSION_TOKEN
                )));
            }
        }

        Ok(FlatRecord {
            zone: zone.to_string(),
            content: tokens.join(" "),
        })
    }

    async fn split(&self, flat: &FlatRecord, max_chars: usize, pattern: &str) -> Result<SplitPlan> {
        if !pattern.contains(PATTERN_PLACEHOLDER) {
            return Err(Error::splitter(format!(
                "sub-record pattern {} has no {} placeholder",
                pattern, PATTERN_PLACEHOLDER
            )));
        }

        let mut plan = SplitPlan::new();

        // Fits as-is: primary-only plan, the reconciler skips it.
        if flat.content.len() <= max_chars {
            debug!(
                "SPF content for {} fits in {} chars, nothing to split",
                flat.zone, max_chars
            );
            plan.insert(PRIMARY_KEY, flat.content.clone());
            return Ok(plan);
        }

        let mut tokens = flat.content.split_whitespace();
        // Leading version token was verified by flatten_from_text.
        tokens.next();

        let mut mechanisms: Vec<&str> = tokens.collect();
        let terminal = match mechanisms.last() {
            Some(last) if is_all_mechanism(last) => mechanisms.pop(),
            _ => None,
        };

        let chunks = pack_mechanisms(&flat.zone, &mechanisms, max_chars)?;
        let mut includes = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let name = pattern.replace(PATTERN_PLACEHOLDER, &(index + 1).to_string());
            let content = format!("{} {}", VERSION_TOKEN, chunk.join(" "));
            includes.push(format!("include:{}", name));
            plan.insert(name, content);
        }

        let mut primary = format!("{} {}", VERSION_TOKEN, includes.join(" "));
        if let Some(terminal) = terminal {
            primary.push(' ');
            primary.push_str(terminal);
        }
        if primary.len() > max_chars {
            return Err(Error::splitter(format!(
                "primary record for {} exceeds {} chars after splitting",
                flat.zone, max_chars
            )));
        }

        debug!(
            "Split SPF content for {} into {} sub-records",
            flat.zone,
            plan.len()
        );
        plan.insert(PRIMARY_KEY, primary);
        Ok(plan)
    }
}

/// Whether a token is the terminal `all` mechanism, with any qualifier
fn is_all_mechanism(token: &str) -> bool {
    matches!(token, "all" | "+all" | "-all" | "~all" | "?all")
}

/// Greedily pack mechanisms into chunks whose rendered content stays within
/// `max_chars`, preserving mechanism order
fn pack_mechanisms<'a>(
    zone: &str,
    mechanisms: &[&'a str],
    max_chars: usize,
) -> Result<Vec<Vec<&'a str>>> {
    // Budget excludes the version token and its separating space.
    let budget = max_chars.saturating_sub(VERSION_TOKEN.len() + 1);

    let mut chunks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for mechanism in mechanisms {
        if mechanism.len() > budget {
            return Err(Error::splitter(format!(
                "mechanism {} in zone {} does not fit in {} chars",
                mechanism, zone, max_chars
            )));
        }

        let added = if current.is_empty() {
            mechanism.len()
        } else {
            mechanism.len() + 1
        };
        if current_len + added > budget {
            chunks.push(std::mem::take(&mut current));
            current_len = mechanism.len();
        } else {
            current_len += added;
        }
        current.push(mechanism);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}
