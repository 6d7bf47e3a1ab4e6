//! Parsing of the arguments collaborators receive from the user.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::ValidationError;
use crate::host::WorkspaceId;

/// Longest work interval a start request may ask for: one day.
pub const MAX_WORK_MINUTES: i64 = 24 * 60;

/// A parsed `start` argument: `"1,2@50"`, `"3"`, `"@45"` or `""`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartRequest {
    /// Allowed workspaces; empty means "the current workspace".
    pub workspaces: Vec<WorkspaceId>,
    /// Explicit work interval length. `None` uses the configured plan.
    pub work_minutes: Option<i64>,
}

impl StartRequest {
    pub fn new(workspaces: Vec<WorkspaceId>) -> Self {
        Self {
            workspaces,
            work_minutes: None,
        }
    }

    pub fn with_work_minutes(mut self, minutes: i64) -> Self {
        self.work_minutes = Some(minutes);
        self
    }
}

/// Parse one workspace id. Ids start at 1.
pub fn parse_workspace_id(token: &str) -> Result<WorkspaceId, ValidationError> {
    let token = token.trim();
    match token.parse::<WorkspaceId>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ValidationError::InvalidWorkspaceId(token.to_string())),
    }
}

/// Parse a comma-separated workspace list, dropping duplicates and empty
/// items. The result is sorted.
pub fn parse_workspace_list(input: &str) -> Result<Vec<WorkspaceId>, ValidationError> {
    let mut ids = BTreeSet::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        ids.insert(parse_workspace_id(token)?);
    }
    Ok(ids.into_iter().collect())
}

/// Parse `"<workspaces>[@<minutes>]"`.
///
/// A duration that is not a positive integer up to [`MAX_WORK_MINUTES`] is
/// dropped with a warning and the configured plan applies.
pub fn parse_start_args(args: &str) -> Result<StartRequest, ValidationError> {
    let args = args.trim();
    let (list, minutes) = match args.split_once('@') {
        Some((list, minutes)) => (list, Some(minutes.trim())),
        None => (args, None),
    };

    let workspaces = parse_workspace_list(list)?;
    let work_minutes = minutes.and_then(|m| match m.parse::<i64>() {
        Ok(value) if (1..=MAX_WORK_MINUTES).contains(&value) => Some(value),
        _ => {
            warn!(duration = m, "invalid session duration, using configured default");
            None
        }
    });

    Ok(StartRequest {
        workspaces,
        work_minutes,
    })
}

/// Reject blank class or application names; returns the trimmed name.
pub fn require_name<'a>(kind: &'static str, name: &'a str) -> Result<&'a str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        Err(ValidationError::EmptyName(kind))
    } else {
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_list_dedups_and_sorts() {
        assert_eq!(parse_workspace_list("3, 1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_workspace_list("").unwrap(), Vec::<WorkspaceId>::new());
        assert_eq!(parse_workspace_list(" 4 ,, ").unwrap(), vec![4]);
    }

    #[test]
    fn workspace_list_rejects_bad_ids() {
        assert_eq!(
            parse_workspace_list("1,abc"),
            Err(ValidationError::InvalidWorkspaceId("abc".into()))
        );
        assert_eq!(
            parse_workspace_list("0"),
            Err(ValidationError::InvalidWorkspaceId("0".into()))
        );
        assert!(parse_workspace_list("-2").is_err());
    }

    #[test]
    fn start_args_with_duration() {
        let request = parse_start_args("1,2@50").unwrap();
        assert_eq!(request, StartRequest::new(vec![1, 2]).with_work_minutes(50));
    }

    #[test]
    fn start_args_without_duration() {
        assert_eq!(parse_start_args("3").unwrap(), StartRequest::new(vec![3]));
        assert_eq!(parse_start_args("").unwrap(), StartRequest::default());
    }

    #[test]
    fn start_args_current_workspace_with_duration() {
        let request = parse_start_args("@45").unwrap();
        assert!(request.workspaces.is_empty());
        assert_eq!(request.work_minutes, Some(45));
    }

    #[test]
    fn bad_duration_falls_back() {
        assert_eq!(parse_start_args("2@soon").unwrap().work_minutes, None);
        assert_eq!(parse_start_args("2@0").unwrap().work_minutes, None);
        assert!(parse_start_args("x@10").is_err());
    }

    #[test]
    fn oversized_duration_falls_back() {
        assert_eq!(
            parse_start_args("1@9223372036854775807").unwrap().work_minutes,
            None
        );
        assert_eq!(parse_start_args("1@1441").unwrap().work_minutes, None);
        assert_eq!(
            parse_start_args("1@1440").unwrap().work_minutes,
            Some(MAX_WORK_MINUTES)
        );
    }

    #[test]
    fn names_must_not_be_blank() {
        assert_eq!(require_name("class", "  kitty "), Ok("kitty"));
        assert_eq!(
            require_name("application", "   "),
            Err(ValidationError::EmptyName("application"))
        );
    }
}
