//! One-line outcome messages

use colored::Colorize;
use stackport_cloud::StackError;
use std::process::ExitCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flash {
    Success(String),
    Danger(String),
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Flash::Success(message.into())
    }

    /// The user-facing text of a failed operation on a `label` stack
    pub fn failure(label: &str, err: &StackError) -> Self {
        Flash::Danger(err.user_message(label))
    }

    pub fn message(&self) -> &str {
        match self {
            Flash::Success(message) | Flash::Danger(message) => message,
        }
    }

    pub fn print(&self) -> ExitCode {
        let message = self.message();
        match self {
            Flash::Success(_) => {
                println!("{} {}", "✓".green(), message.green());
                ExitCode::SUCCESS
            }
            Flash::Danger(_) => {
                eprintln!("{} {}", "✗".red(), message.red().bold());
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_hides_engine_details() {
        let flash = Flash::failure("Site", &StackError::Engine("exit status 255".to_string()));
        assert!(matches!(flash, Flash::Danger(_)));
        assert!(!flash.message().contains("255"));
    }

    #[test]
    fn test_failure_duplicate_name() {
        let flash = Flash::failure("Site", &StackError::DuplicateName("demo".to_string()));
        assert_eq!(
            flash.message(),
            "Site with name 'demo' already exists, pick a unique name"
        );
    }
}
