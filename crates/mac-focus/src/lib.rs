//! mac-focus: resolve which target application currently has focus.
//!
//! Two sources are combined, in priority order:
//!
//! 1. The web-focus cell, fed by an out-of-process browser extension over a
//!    local channel (see [`web`]). When the user works inside a browser tab,
//!    the foreground process is the browser; only the extension knows which
//!    web application the tab hosts.
//! 2. The CoreGraphics window list: the frontmost layer-0 window's owning
//!    application name.
//!
//! Resolution never fails: any OS query error reads as "no active context".
//! [`Resolver::resolve`] is called from a ~20 Hz polling loop and does one
//! window-list walk per call at most.

mod cg;
pub mod web;

use std::collections::HashSet;

pub use web::{WebFocus, WebFocusListener};

/// Resolves the focused target application against a candidate set.
#[derive(Clone)]
pub struct Resolver {
    web: WebFocus,
}

impl Resolver {
    /// Create a resolver consulting `web` before the foreground window.
    pub fn new(web: WebFocus) -> Self {
        Self { web }
    }

    /// Returns the candidate that currently has focus, or `None`.
    ///
    /// Candidates are matched case-insensitively as substrings of the
    /// focused name, so a candidate `"photoshop"` matches the process name
    /// `"Adobe Photoshop 2025"`.
    pub fn resolve(&self, candidates: &HashSet<String>) -> Option<String> {
        if let Some(web_app) = self.web.current()
            && let Some(hit) = match_candidate(&web_app, candidates)
        {
            return Some(hit);
        }
        let (app, _pid) = cg::front_app_pid()?;
        match_candidate(&app, candidates)
    }
}

/// Case-insensitive substring match of each candidate against `name`.
fn match_candidate(name: &str, candidates: &HashSet<String>) -> Option<String> {
    let lowered = name.to_lowercase();
    candidates
        .iter()
        .find(|c| !c.is_empty() && lowered.contains(&c.to_lowercase()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let c = candidates(&["photoshop", "figma"]);
        assert_eq!(
            match_candidate("Adobe Photoshop 2025", &c),
            Some("photoshop".to_string())
        );
        assert_eq!(match_candidate("FIGMA", &c), Some("figma".to_string()));
        assert_eq!(match_candidate("Terminal", &c), None);
    }

    #[test]
    fn empty_candidates_never_match() {
        assert_eq!(match_candidate("Anything", &candidates(&[])), None);
        // An empty candidate string would match every name; it is ignored.
        assert_eq!(match_candidate("Anything", &candidates(&[""])), None);
    }

    #[test]
    fn web_focus_takes_priority() {
        let web = WebFocus::default();
        let resolver = Resolver::new(web.clone());
        let c = candidates(&["figma"]);

        web.set(Some("figma".to_string()));
        assert_eq!(resolver.resolve(&c), Some("figma".to_string()));

        // A web app outside the candidate set falls through to the window
        // check (which cannot match in a test environment).
        web.set(Some("gmail".to_string()));
        assert_eq!(resolver.resolve(&c), None);
    }
}
