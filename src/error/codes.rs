#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidArguments = 2,
    DirectoryNotFound = 3,
    ConfigError = 4,
    NoInputFiles = 5,
    PermissionError = 6,
    JobBusy = 7,
    ReportError = 8,
    /// The job ran but at least one item failed
    ItemFailures = 9,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success as i32, 0);
        assert_eq!(ExitCode::GeneralError as i32, 1);
        assert_eq!(ExitCode::InvalidArguments as i32, 2);
        assert_eq!(ExitCode::DirectoryNotFound as i32, 3);
        assert_eq!(ExitCode::ConfigError as i32, 4);
        assert_eq!(ExitCode::NoInputFiles as i32, 5);
        assert_eq!(ExitCode::PermissionError as i32, 6);
        assert_eq!(ExitCode::JobBusy as i32, 7);
        assert_eq!(ExitCode::ReportError as i32, 8);
        assert_eq!(ExitCode::ItemFailures as i32, 9);
    }

    #[test]
    fn test_exit_code_into_i32() {
        let code: i32 = ExitCode::ConfigError.into();
        assert_eq!(code, 4);
    }
}
