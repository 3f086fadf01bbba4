//! Module `command`
//!
//! Defines the FTP verbs the server understands and the status a handled
//! command leaves the session in.

/// Represents an FTP command parsed from the client input.
///
/// Each variant corresponds to one verb. Verbs that take a parameter carry
/// the raw parameter string, which may be empty; the handler decides whether
/// that is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Access control
    USER(String),
    PASS(String),
    CWD(String),
    CDUP,
    QUIT,

    // Transfer parameters
    PORT(String),
    PASV,
    TYPE(String),
    STRU(String),
    MODE(String),

    // Service commands
    RETR(String),
    STOR(String),
    RNFR(String),
    RNTO(String),
    ABOR,
    DELE(String),
    RMD(String),
    MKD(String),
    PWD,
    LIST(String),
    NLST(String),
    SITE(String),
    NOOP,

    // RFC 3659 / RFC 2389 extensions
    FEAT,
    MDTM(String),
    SIZE(String),
    MLSD(String),

    /// Any other token, kept for logging.
    UNKNOWN(String),
}

/// Represents what the session does after a command was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Continue,
    CloseConnection,
}

impl Command {
    /// Builds a command from an uppercased token and its parameters.
    pub fn from_parts(token: &str, params: &str) -> Command {
        let arg = params.to_string();
        match token {
            "USER" => Command::USER(arg),
            "PASS" => Command::PASS(arg),
            "CWD" => Command::CWD(arg),
            "CDUP" => Command::CDUP,
            "QUIT" => Command::QUIT,
            "PORT" => Command::PORT(arg),
            "PASV" => Command::PASV,
            "TYPE" => Command::TYPE(arg),
            "STRU" => Command::STRU(arg),
            "MODE" => Command::MODE(arg),
            "RETR" => Command::RETR(arg),
            "STOR" => Command::STOR(arg),
            "RNFR" => Command::RNFR(arg),
            "RNTO" => Command::RNTO(arg),
            "ABOR" => Command::ABOR,
            "DELE" => Command::DELE(arg),
            "RMD" => Command::RMD(arg),
            "MKD" => Command::MKD(arg),
            "PWD" => Command::PWD,
            "LIST" => Command::LIST(arg),
            "NLST" => Command::NLST(arg),
            "SITE" => Command::SITE(arg),
            "NOOP" => Command::NOOP,
            "FEAT" => Command::FEAT,
            "MDTM" => Command::MDTM(arg),
            "SIZE" => Command::SIZE(arg),
            "MLSD" => Command::MLSD(arg),
            other => Command::UNKNOWN(other.to_string()),
        }
    }

    /// Verb name as sent by the client.
    pub fn verb(&self) -> &str {
        match self {
            Command::USER(_) => "USER",
            Command::PASS(_) => "PASS",
            Command::CWD(_) => "CWD",
            Command::CDUP => "CDUP",
            Command::QUIT => "QUIT",
            Command::PORT(_) => "PORT",
            Command::PASV => "PASV",
            Command::TYPE(_) => "TYPE",
            Command::STRU(_) => "STRU",
            Command::MODE(_) => "MODE",
            Command::RETR(_) => "RETR",
            Command::STOR(_) => "STOR",
            Command::RNFR(_) => "RNFR",
            Command::RNTO(_) => "RNTO",
            Command::ABOR => "ABOR",
            Command::DELE(_) => "DELE",
            Command::RMD(_) => "RMD",
            Command::MKD(_) => "MKD",
            Command::PWD => "PWD",
            Command::LIST(_) => "LIST",
            Command::NLST(_) => "NLST",
            Command::SITE(_) => "SITE",
            Command::NOOP => "NOOP",
            Command::FEAT => "FEAT",
            Command::MDTM(_) => "MDTM",
            Command::SIZE(_) => "SIZE",
            Command::MLSD(_) => "MLSD",
            Command::UNKNOWN(token) => token,
        }
    }
}
