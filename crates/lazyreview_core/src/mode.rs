//! Write mode for destructive batch operations.

/// Answer to one confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Yes,
    No,
    /// Stop the batch; remaining items are left untouched.
    Quit,
}

/// How a batch applies its changes.
///
/// `DryRun` performs every computation and reports what would change, but
/// writes nothing. `Interactive` asks the callback before each change.
pub enum ApplyMode<'a> {
    Auto,
    DryRun,
    Interactive(&'a mut dyn FnMut(&str) -> Decision),
}

impl ApplyMode<'_> {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }

    /// `Auto` and `DryRun` always proceed; `DryRun` callers skip the write.
    pub fn confirm(&mut self, prompt: &str) -> Decision {
        match self {
            Self::Auto | Self::DryRun => Decision::Yes,
            Self::Interactive(ask) => ask(prompt),
        }
    }
}

impl std::fmt::Debug for ApplyMode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.write_str("Auto"),
            Self::DryRun => f.write_str("DryRun"),
            Self::Interactive(_) => f.write_str("Interactive"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactive_mode_forwards_prompts() {
        let mut seen = Vec::new();
        let mut ask = |prompt: &str| {
            seen.push(prompt.to_string());
            Decision::Quit
        };
        let mut mode = ApplyMode::Interactive(&mut ask);
        assert_eq!(mode.confirm("fix notes/a.md?"), Decision::Quit);
        assert!(!mode.is_dry_run());
        drop(mode);
        assert_eq!(seen, vec!["fix notes/a.md?".to_string()]);
    }

    #[test]
    fn non_interactive_modes_proceed() {
        assert_eq!(ApplyMode::Auto.confirm("x"), Decision::Yes);
        let mut dry = ApplyMode::DryRun;
        assert_eq!(dry.confirm("x"), Decision::Yes);
        assert!(dry.is_dry_run());
    }
}
