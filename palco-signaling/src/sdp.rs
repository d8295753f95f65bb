//! SDP answer normalization.
//!
//! Some media servers emit bandwidth-estimation lines (`b=AS:`, `b=TIAS:`)
//! and the `a=extmap-allow-mixed` hint that certain client stacks refuse or
//! misapply, and the negotiation then fails without any useful error. The
//! pairing of client stack and media server decides which lines are safe,
//! so the strip list lives here as one explicit, documented step instead of
//! being buried in the handshake.

/// Attribute line prefixes removed from every inbound answer.
const STRIPPED_PREFIXES: &[&str] = &["b=AS:", "b=TIAS:", "a=extmap-allow-mixed"];

/// Strip known-problematic attribute lines from an SDP answer before it is
/// applied as the remote description. Line order and endings are preserved
/// for everything kept.
#[must_use]
pub fn sanitize_answer(sdp: &str) -> String {
    let mut out = String::with_capacity(sdp.len());
    for line in sdp.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if STRIPPED_PREFIXES
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
        {
            continue;
        }
        out.push_str(line);
    }
    out
}
