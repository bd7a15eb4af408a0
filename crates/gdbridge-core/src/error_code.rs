//! The engine's `Error` enumeration.
//!
//! Native operations report failure in-band by returning one of these codes.
//! The bridge never interprets them; callers that want `?` propagation use
//! [`ErrorCode::into_result`].

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Result code returned by engine operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i64)]
pub enum ErrorCode {
    Ok = 0,
    Failed = 1,
    ErrUnavailable = 2,
    ErrUnconfigured = 3,
    ErrUnauthorized = 4,
    ErrParameterRangeError = 5,
    ErrOutOfMemory = 6,
    ErrFileNotFound = 7,
    ErrFileBadDrive = 8,
    ErrFileBadPath = 9,
    ErrFileNoPermission = 10,
    ErrFileAlreadyInUse = 11,
    ErrFileCantOpen = 12,
    ErrFileCantWrite = 13,
    ErrFileCantRead = 14,
    ErrFileUnrecognized = 15,
    ErrFileCorrupt = 16,
    ErrFileMissingDependencies = 17,
    ErrFileEof = 18,
    ErrCantOpen = 19,
    ErrCantCreate = 20,
    ErrQueryFailed = 21,
    ErrAlreadyInUse = 22,
    ErrLocked = 23,
    ErrTimeout = 24,
    ErrCantConnect = 25,
    ErrCantResolve = 26,
    ErrConnectionError = 27,
    ErrCantAcquireResource = 28,
    ErrCantFork = 29,
    ErrInvalidData = 30,
    ErrInvalidParameter = 31,
    ErrAlreadyExists = 32,
    ErrDoesNotExist = 33,
    ErrDatabaseCantRead = 34,
    ErrDatabaseCantWrite = 35,
    ErrCompilationFailed = 36,
    ErrMethodNotFound = 37,
    ErrLinkFailed = 38,
    ErrScriptFailed = 39,
    ErrCyclicLink = 40,
    ErrInvalidDeclaration = 41,
    ErrDuplicateSymbol = 42,
    ErrParseError = 43,
    ErrBusy = 44,
    ErrSkip = 45,
    ErrHelp = 46,
    ErrBug = 47,
    ErrPrinterOnFire = 48,
}

impl ErrorCode {
    /// True for [`ErrorCode::Ok`].
    pub fn is_ok(self) -> bool {
        self == ErrorCode::Ok
    }

    /// `Ok(())` for [`ErrorCode::Ok`], the code itself otherwise.
    pub fn into_result(self) -> Result<(), ErrorCode> {
        if self.is_ok() { Ok(()) } else { Err(self) }
    }

    /// Returns a human-readable description of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Ok => "ok",
            ErrorCode::Failed => "failed",
            ErrorCode::ErrUnavailable => "unavailable",
            ErrorCode::ErrUnconfigured => "unconfigured",
            ErrorCode::ErrUnauthorized => "unauthorized",
            ErrorCode::ErrParameterRangeError => "parameter out of range",
            ErrorCode::ErrOutOfMemory => "out of memory",
            ErrorCode::ErrFileNotFound => "file not found",
            ErrorCode::ErrFileBadDrive => "bad drive",
            ErrorCode::ErrFileBadPath => "bad path",
            ErrorCode::ErrFileNoPermission => "no permission",
            ErrorCode::ErrFileAlreadyInUse => "file already in use",
            ErrorCode::ErrFileCantOpen => "can't open file",
            ErrorCode::ErrFileCantWrite => "can't write file",
            ErrorCode::ErrFileCantRead => "can't read file",
            ErrorCode::ErrFileUnrecognized => "unrecognized file",
            ErrorCode::ErrFileCorrupt => "corrupt file",
            ErrorCode::ErrFileMissingDependencies => "missing dependencies",
            ErrorCode::ErrFileEof => "end of file",
            ErrorCode::ErrCantOpen => "can't open",
            ErrorCode::ErrCantCreate => "can't create",
            ErrorCode::ErrQueryFailed => "query failed",
            ErrorCode::ErrAlreadyInUse => "already in use",
            ErrorCode::ErrLocked => "locked",
            ErrorCode::ErrTimeout => "timeout",
            ErrorCode::ErrCantConnect => "can't connect",
            ErrorCode::ErrCantResolve => "can't resolve",
            ErrorCode::ErrConnectionError => "connection error",
            ErrorCode::ErrCantAcquireResource => "can't acquire resource",
            ErrorCode::ErrCantFork => "can't fork",
            ErrorCode::ErrInvalidData => "invalid data",
            ErrorCode::ErrInvalidParameter => "invalid parameter",
            ErrorCode::ErrAlreadyExists => "already exists",
            ErrorCode::ErrDoesNotExist => "does not exist",
            ErrorCode::ErrDatabaseCantRead => "can't read database",
            ErrorCode::ErrDatabaseCantWrite => "can't write database",
            ErrorCode::ErrCompilationFailed => "compilation failed",
            ErrorCode::ErrMethodNotFound => "method not found",
            ErrorCode::ErrLinkFailed => "link failed",
            ErrorCode::ErrScriptFailed => "script failed",
            ErrorCode::ErrCyclicLink => "cyclic link",
            ErrorCode::ErrInvalidDeclaration => "invalid declaration",
            ErrorCode::ErrDuplicateSymbol => "duplicate symbol",
            ErrorCode::ErrParseError => "parse error",
            ErrorCode::ErrBusy => "busy",
            ErrorCode::ErrSkip => "skip",
            ErrorCode::ErrHelp => "help",
            ErrorCode::ErrBug => "bug",
            ErrorCode::ErrPrinterOnFire => "printer on fire",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::error::Error for ErrorCode {}
