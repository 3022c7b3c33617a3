//! Output matching for `expect` steps

use crate::interpreter::CommandReturn;

use super::config::Expectation;

impl Expectation {
    /// Check a command result against this expectation
    ///
    /// Returns a description of the first mismatch.
    pub fn check(&self, command: &str, ret: &CommandReturn) -> Result<(), String> {
        let prefix = match &self.message {
            Some(message) => format!("{}: '{}'", message, command),
            None => format!("'{}'", command),
        };

        if self.error && ret.succeeded {
            return Err(format!(
                "{} was expected to fail but succeeded with output:\n{}",
                prefix, ret.output
            ));
        }
        if !self.error && !ret.succeeded {
            return Err(format!("{} failed:\n{}", prefix, ret.error));
        }

        let text = ret.text();

        if let Some(start) = &self.startstr {
            self.verdict(text.starts_with(start.as_str()), "start with", start, &prefix, text)?;
        }

        if let Some(end) = &self.endstr {
            // Trailing newlines are not significant to the caller
            let holds = text.trim_end_matches('\n').ends_with(end.as_str());
            self.verdict(holds, "end with", end, &prefix, text)?;
        }

        for substr in self.substrs.iter().flatten() {
            self.verdict(text.contains(substr.as_str()), "contain", substr, &prefix, text)?;
        }

        Ok(())
    }

    fn verdict(
        &self,
        holds: bool,
        relation: &str,
        fragment: &str,
        prefix: &str,
        text: &str,
    ) -> Result<(), String> {
        match (self.matching, holds) {
            (true, true) | (false, false) => Ok(()),
            (true, false) => Err(format!(
                "{} output did not {} '{}'. Got:\n{}",
                prefix, relation, fragment, text
            )),
            (false, true) => Err(format!(
                "{} output should not {} '{}'. Got:\n{}",
                prefix, relation, fragment, text
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAGNOSIS: &str = "Thread 1 crashed with bad access in GetSum\n\
                             -> 25   return f->a + f->b.d;\n\
                             f->b was invalid\n";

    fn substrs(items: &[&str]) -> Expectation {
        Expectation {
            substrs: Some(items.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_substrs_all_present() {
        let ret = CommandReturn::success(DIAGNOSIS);
        assert!(substrs(&["f->b", "bad access"]).check("frame diagnose", &ret).is_ok());
    }

    #[test]
    fn test_substr_missing_reports_fragment_and_message() {
        let ret = CommandReturn::success("Process 12 running\n");
        let mut exp = substrs(&["stopped"]);
        exp.message = Some("Thread should be stopped".to_string());

        let err = exp.check("thread list", &ret).unwrap_err();
        assert!(err.starts_with("Thread should be stopped: 'thread list'"));
        assert!(err.contains("'stopped'"));
        assert!(err.contains("Process 12 running"));
    }

    #[test]
    fn test_command_failure_fails_expectation() {
        let ret = CommandReturn::failure("error: invalid thread");
        let err = substrs(&["f->b"]).check("frame diagnose", &ret).unwrap_err();
        assert!(err.contains("error: invalid thread"));
    }

    #[test]
    fn test_expected_error_matches_error_text() {
        let ret = CommandReturn::failure("error: invalid target, create a target using 'file'");
        let exp = Expectation {
            error: true,
            substrs: Some(vec!["invalid target".to_string()]),
            ..Default::default()
        };
        assert!(exp.check("run", &ret).is_ok());

        let ok = CommandReturn::success("Process 1 launched");
        assert!(exp.check("run", &ok).is_err());
    }

    #[test]
    fn test_start_and_end() {
        let ret = CommandReturn::success("Process 4242 stopped\n* thread #1: tid = 1\n");
        let exp = Expectation {
            startstr: Some("Process 4242".to_string()),
            endstr: Some("tid = 1".to_string()),
            ..Default::default()
        };
        assert!(exp.check("thread list", &ret).is_ok());

        let exp = Expectation {
            startstr: Some("thread".to_string()),
            ..Default::default()
        };
        assert!(exp.check("thread list", &ret).is_err());
    }

    #[test]
    fn test_not_matching_negates_each_matcher() {
        let ret = CommandReturn::success(DIAGNOSIS);
        let mut exp = substrs(&["f->c"]);
        exp.matching = false;
        assert!(exp.check("frame diagnose", &ret).is_ok());

        let mut exp = substrs(&["f->c", "f->b"]);
        exp.matching = false;
        let err = exp.check("frame diagnose", &ret).unwrap_err();
        assert!(err.contains("should not contain 'f->b'"));
    }

    #[test]
    fn test_empty_expectation_checks_success_only() {
        let exp = Expectation::default();
        assert!(exp.check("run", &CommandReturn::success("")).is_ok());
        assert!(exp.check("run", &CommandReturn::failure("error: boom")).is_err());
    }
}
