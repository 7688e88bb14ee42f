//! The user's current filter selection.
//!
//! A [`FilterSelection`] is an immutable value: every change produces a new
//! selection, which is handed to the filter engine on each evaluation. It can be
//! serialized to a URL query string so a view can be shared.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const SHOW_ALL: &str = "Show all";

/// A single-valued filter dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Choice {
    #[default]
    ShowAll,
    Only(String),
}

impl Choice {
    pub fn only(value: impl Into<String>) -> Self {
        Choice::Only(value.into())
    }

    pub fn is_show_all(&self) -> bool {
        matches!(self, Choice::ShowAll)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Choice::ShowAll => None,
            Choice::Only(v) => Some(v),
        }
    }

    /// Advance through `options`, wrapping back to show-all after the last one.
    pub fn cycle(&self, options: &[String]) -> Choice {
        let next = match self {
            Choice::ShowAll => options.first(),
            Choice::Only(current) => options
                .iter()
                .position(|o| o == current)
                .and_then(|idx| options.get(idx + 1)),
        };
        next.map(|v| Choice::Only(v.clone())).unwrap_or_default()
    }

    fn from_param(value: &str) -> Choice {
        if value.is_empty() || value == SHOW_ALL {
            Choice::ShowAll
        } else {
            Choice::Only(value.to_string())
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::ShowAll => f.write_str(SHOW_ALL),
            Choice::Only(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncFilter {
    #[default]
    ShowAll,
    /// Only pull requests whose branches currently conflict.
    Requested,
    /// Only pull requests that merge cleanly.
    Ok,
}

impl SyncFilter {
    pub fn to_str(self) -> &'static str {
        match self {
            SyncFilter::ShowAll => "all",
            SyncFilter::Requested => "requested",
            SyncFilter::Ok => "ok",
        }
    }

    pub fn cycle(self) -> SyncFilter {
        match self {
            SyncFilter::ShowAll => SyncFilter::Requested,
            SyncFilter::Requested => SyncFilter::Ok,
            SyncFilter::Ok => SyncFilter::ShowAll,
        }
    }

    fn from_param(value: &str) -> SyncFilter {
        match value {
            "requested" => SyncFilter::Requested,
            "ok" => SyncFilter::Ok,
            _ => SyncFilter::ShowAll,
        }
    }
}

/// How the author and reviewer dimensions interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Every dimension is ANDed together.
    #[default]
    Combined,
    /// Selecting an author resets the reviewer and vice versa.
    Exclusive,
}

impl FilterMode {
    pub fn to_str(self) -> &'static str {
        match self {
            FilterMode::Combined => "combined",
            FilterMode::Exclusive => "exclusive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSelection {
    pub author: Choice,
    pub reviewer: Choice,
    /// Sprint id, as a string.
    pub sprint: Choice,
    /// Fix version id.
    pub fix_version: Choice,
    pub sync: SyncFilter,
    pub ready_for_reviewer: bool,
    pub mode: FilterMode,
}

impl FilterSelection {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn is_default(&self) -> bool {
        self.author.is_show_all()
            && self.reviewer.is_show_all()
            && self.sprint.is_show_all()
            && self.fix_version.is_show_all()
            && self.sync == SyncFilter::ShowAll
            && !self.ready_for_reviewer
    }

    pub fn with_author(&self, author: Choice) -> Self {
        let mut next = self.clone();
        if next.mode == FilterMode::Exclusive && !author.is_show_all() {
            next.reviewer = Choice::ShowAll;
            next.ready_for_reviewer = false;
        }
        next.author = author;
        next
    }

    pub fn with_reviewer(&self, reviewer: Choice) -> Self {
        let mut next = self.clone();
        if next.mode == FilterMode::Exclusive && !reviewer.is_show_all() {
            next.author = Choice::ShowAll;
        }
        if reviewer.is_show_all() {
            next.ready_for_reviewer = false;
        }
        next.reviewer = reviewer;
        next
    }

    pub fn with_sprint(&self, sprint: Choice) -> Self {
        Self {
            sprint,
            ..self.clone()
        }
    }

    pub fn with_fix_version(&self, fix_version: Choice) -> Self {
        Self {
            fix_version,
            ..self.clone()
        }
    }

    pub fn with_sync(&self, sync: SyncFilter) -> Self {
        Self {
            sync,
            ..self.clone()
        }
    }

    /// Ready-for-reviewer only makes sense with a reviewer selected; without one
    /// the flag stays off.
    pub fn with_ready_for_reviewer(&self, ready: bool) -> Self {
        Self {
            ready_for_reviewer: ready && !self.reviewer.is_show_all(),
            ..self.clone()
        }
    }

    pub fn with_mode(&self, mode: FilterMode) -> Self {
        let mut next = Self {
            mode,
            ..self.clone()
        };
        // Entering exclusive mode with both set keeps the reviewer.
        if mode == FilterMode::Exclusive
            && !next.author.is_show_all()
            && !next.reviewer.is_show_all()
        {
            next.author = Choice::ShowAll;
        }
        next
    }

    pub fn cleared(&self) -> Self {
        Self::new(self.mode)
    }

    /// Serialize the non-default dimensions as a URL query string.
    pub fn to_query_string(&self) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(v) = self.author.value() {
            params.push(("assignee", v.to_string()));
        }
        if let Some(v) = self.reviewer.value() {
            params.push(("reviewer", v.to_string()));
        }
        if let Some(v) = self.sprint.value() {
            params.push(("sprint", v.to_string()));
        }
        if let Some(v) = self.fix_version.value() {
            params.push(("fixVersion", v.to_string()));
        }
        if self.sync != SyncFilter::ShowAll {
            params.push(("sync", self.sync.to_str().to_string()));
        }
        if self.ready_for_reviewer {
            params.push(("ready", "true".to_string()));
        }
        if self.mode != FilterMode::Combined {
            params.push(("mode", self.mode.to_str().to_string()));
        }
        params
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse a query string produced by [`to_query_string`](Self::to_query_string).
    ///
    /// Unknown keys are ignored; undecodable values fall back to show-all. The
    /// resulting selection obeys the same rules as the `with_*` constructors.
    pub fn from_query_string(query: &str, default_mode: FilterMode) -> Self {
        let mut author = Choice::ShowAll;
        let mut reviewer = Choice::ShowAll;
        let mut sprint = Choice::ShowAll;
        let mut fix_version = Choice::ShowAll;
        let mut sync = SyncFilter::ShowAll;
        let mut ready = false;
        let mut mode = default_mode;

        for pair in query.trim_start_matches('?').split('&') {
            let Some((key, raw)) = pair.split_once('=') else {
                continue;
            };
            let value = urlencoding::decode(&raw.replace('+', " "))
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match key {
                "assignee" | "author" => author = Choice::from_param(&value),
                "reviewer" => reviewer = Choice::from_param(&value),
                "sprint" => sprint = Choice::from_param(&value),
                "fixVersion" => fix_version = Choice::from_param(&value),
                "sync" => sync = SyncFilter::from_param(&value),
                "ready" => ready = value == "true",
                "mode" => {
                    mode = match value.as_str() {
                        "exclusive" => FilterMode::Exclusive,
                        _ => FilterMode::Combined,
                    }
                }
                _ => {}
            }
        }

        FilterSelection::new(mode)
            .with_author(author)
            .with_reviewer(reviewer)
            .with_sprint(sprint)
            .with_fix_version(fix_version)
            .with_sync(sync)
            .with_ready_for_reviewer(ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_mode_resets_the_other_person_filter() {
        let sel = FilterSelection::new(FilterMode::Exclusive)
            .with_author(Choice::only("Alice"))
            .with_reviewer(Choice::only("Bob"));
        assert_eq!(sel.author, Choice::ShowAll);
        assert_eq!(sel.reviewer, Choice::only("Bob"));

        let sel = sel.with_author(Choice::only("Alice"));
        assert_eq!(sel.reviewer, Choice::ShowAll);
    }

    #[test]
    fn combined_mode_keeps_both_person_filters() {
        let sel = FilterSelection::default()
            .with_author(Choice::only("Alice"))
            .with_reviewer(Choice::only("Bob"));
        assert_eq!(sel.author, Choice::only("Alice"));
        assert_eq!(sel.reviewer, Choice::only("Bob"));
    }

    #[test]
    fn ready_for_reviewer_requires_reviewer() {
        let sel = FilterSelection::default().with_ready_for_reviewer(true);
        assert!(!sel.ready_for_reviewer);

        let sel = sel
            .with_reviewer(Choice::only("Bob"))
            .with_ready_for_reviewer(true);
        assert!(sel.ready_for_reviewer);

        let sel = sel.with_reviewer(Choice::ShowAll);
        assert!(!sel.ready_for_reviewer);
    }

    #[test]
    fn query_string_preserves_selection() {
        let sel = FilterSelection::default()
            .with_author(Choice::only("Jean Dupont"))
            .with_reviewer(Choice::only("Bob & Co"))
            .with_sprint(Choice::only("42"))
            .with_sync(SyncFilter::Requested)
            .with_ready_for_reviewer(true);
        let query = sel.to_query_string();
        assert!(query.contains("assignee=Jean%20Dupont"));
        assert!(query.contains("reviewer=Bob%20%26%20Co"));
        assert_eq!(
            FilterSelection::from_query_string(&query, FilterMode::Combined),
            sel
        );
    }

    #[test]
    fn default_selection_has_empty_query() {
        assert_eq!(FilterSelection::default().to_query_string(), "");
        assert!(FilterSelection::from_query_string("", FilterMode::Combined).is_default());
    }

    #[test]
    fn choice_cycles_through_options_and_back() {
        let options = vec!["a".to_string(), "b".to_string()];
        let c = Choice::ShowAll.cycle(&options);
        assert_eq!(c, Choice::only("a"));
        let c = c.cycle(&options);
        assert_eq!(c, Choice::only("b"));
        assert_eq!(c.cycle(&options), Choice::ShowAll);
        assert_eq!(Choice::only("gone").cycle(&options), Choice::ShowAll);
    }
}
