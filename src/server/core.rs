//! Session state machine
//!
//! [`FtpServer::handle_ftp`] is called once per poll tick. Each call takes at
//! most one step of the session lifecycle, handles at most one command line
//! and moves at most one chunk of an open transfer.

use log::{debug, error, info, warn};
use std::time::{Duration, Instant};

use crate::auth::{Credentials, validate_password, validate_user};
use crate::client::{Session, SessionState};
use crate::config::ServerConfig;
use crate::error::AuthError;
use crate::protocol::responses::{
    AUTH_FAILED, GOODBYE, LOGIN_SUCCESS, PASSWORD_REQUIRED, READY, SYNTAX_ERROR,
    send_continuation, send_response,
};
use crate::protocol::{Command, CommandContext, CommandStatus, LineOutcome, handle_command};
use crate::storage::Filesystem;
use crate::transfer::{
    Connection, DataChannel, Transfer, TransferProgress, Transport, abort_transfer,
};
use crate::utils::{Clock, SystemClock};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const AUTH_FAILURE_HOLD: Duration = Duration::from_millis(100);
const TIMEOUT_HOLD: Duration = Duration::from_millis(200);

/// Single-session FTP server driven by an external tick.
pub struct FtpServer<T: Transport, F: Filesystem> {
    config: ServerConfig,
    credentials: Credentials,
    transport: T,
    fs: F,
    storage_ready: bool,
    clock: Box<dyn Clock>,
    control: Option<T::Conn>,
    session: Session,
    data: DataChannel<T::Conn>,
    transfer: Option<Transfer<F::File, T::Conn>>,
    hold_until: Option<Instant>,
}

impl<T: Transport, F: Filesystem> FtpServer<T, F> {
    pub fn new(config: ServerConfig, transport: T, fs: F) -> Self {
        Self::with_clock(config, transport, fs, Box::new(SystemClock))
    }

    pub fn with_clock(config: ServerConfig, transport: T, fs: F, clock: Box<dyn Clock>) -> Self {
        Self {
            credentials: Credentials::from_config(&config),
            session: Session::new(config.max_command_length),
            data: DataChannel::new(config.passive_port, config.data_connect_timeout()),
            config,
            transport,
            fs,
            storage_ready: false,
            clock,
            control: None,
            transfer: None,
            hold_until: None,
        }
    }

    /// Starts accepting clients.
    pub fn begin(&mut self) {
        info!(
            "Solo FTP server {VERSION} ready (user {:?})",
            self.credentials.username()
        );
        self.session.set_state(SessionState::AwaitingConnection);
    }

    /// Runs one poll tick.
    ///
    /// A tick that opens a data connection blocks the calling thread until
    /// the peer connects or `data_connect_timeout` elapses.
    pub fn handle_ftp(&mut self) {
        let now = self.clock.now();
        if let Some(until) = self.hold_until {
            if now < until {
                return;
            }
            self.hold_until = None;
        }

        if let Some(connection) = self.transport.accept_control() {
            if self.control.is_some() {
                info!("New control connection preempts the current session");
                self.disconnect_client();
            }
            self.control = Some(connection);
            self.session.set_state(SessionState::AwaitingConnection);
        }

        match self.session.state() {
            SessionState::Disconnected => {
                if self.control.is_some() {
                    self.disconnect_client();
                }
                self.session.set_state(SessionState::AwaitingConnection);
            }
            SessionState::AwaitingConnection => {
                abort_transfer(&mut self.transfer, self.control.as_mut());
                self.session.reset();
                self.data.reset();
                self.session.set_state(SessionState::Idle);
            }
            SessionState::Idle => self.greet_client(now),
            SessionState::AwaitingUser | SessionState::AwaitingPassword | SessionState::Ready => {
                self.read_command(now)
            }
        }

        if self.transfer.is_some() {
            self.service_transfer(now);
        } else if self.awaiting_commands() && self.session.is_expired(now) {
            info!("Session timed out in state {}", self.session.state());
            if let Some(control) = self.control.as_mut() {
                send_response(control, AUTH_FAILED, "Timeout");
            }
            self.hold(now, TIMEOUT_HOLD);
            self.session.set_state(SessionState::Disconnected);
        }
    }

    /// Says goodbye to the current client, if any, and stops serving it.
    pub fn shutdown(&mut self) {
        info!("Shutting down");
        self.disconnect_client();
        self.session.set_state(SessionState::Disconnected);
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    pub fn is_transferring(&self) -> bool {
        self.transfer.is_some()
    }

    pub fn has_client(&self) -> bool {
        self.control.is_some()
    }

    // --------------------
    // Lifecycle steps
    // --------------------

    fn awaiting_commands(&self) -> bool {
        matches!(
            self.session.state(),
            SessionState::AwaitingUser | SessionState::AwaitingPassword | SessionState::Ready
        )
    }

    fn hold(&mut self, now: Instant, duration: Duration) {
        self.hold_until = Some(now + duration);
    }

    fn greet_client(&mut self, now: Instant) {
        let Some(control) = self.control.as_mut() else {
            return;
        };

        if !control.connected() {
            debug!("Control connection closed before greeting");
            control.close();
            self.control = None;
            return;
        }

        info!("Client connected");
        send_continuation(control, READY, "-- Welcome to Solo FTP Server --");
        send_continuation(control, READY, "--   One session at a time   --");
        send_response(control, READY, &format!("--   Version {VERSION}   --"));

        self.session.set_command_deadline(now + self.config.login_grace());
        self.session.set_state(SessionState::AwaitingUser);
    }

    /// Aborts any transfer, sends 221 and closes the control connection.
    fn disconnect_client(&mut self) {
        abort_transfer(&mut self.transfer, self.control.as_mut());
        self.data.close();
        if let Some(mut control) = self.control.take() {
            send_response(&mut control, GOODBYE, "Goodbye");
            control.close();
            info!("Client disconnected");
        }
    }

    fn read_command(&mut self, now: Instant) {
        let Some(control) = self.control.as_mut() else {
            self.session.set_state(SessionState::Disconnected);
            return;
        };

        match self.session.line_reader_mut().poll(control) {
            LineOutcome::Incomplete => {
                if !control.connected() {
                    info!("Connection lost");
                    self.session.set_state(SessionState::Disconnected);
                }
            }
            LineOutcome::Empty => {}
            LineOutcome::Invalid(e) => {
                debug!("Rejected command line: {e}");
                send_response(control, SYNTAX_ERROR, "Syntax error");
            }
            LineOutcome::Ready(line) => {
                let command = Command::from_parts(&line.token, &line.params);
                match &command {
                    Command::PASS(_) => debug!("<- PASS ****"),
                    _ => debug!("<- {} {}", line.token, line.params),
                }
                self.process_command(command, now);
            }
        }
    }

    fn process_command(&mut self, command: Command, now: Instant) {
        match self.session.state() {
            SessionState::AwaitingUser => self.process_user(&command, now),
            SessionState::AwaitingPassword => self.process_password(&command, now),
            SessionState::Ready => self.dispatch(&command),
            other => warn!("Ignoring {} in state {other}", command.verb()),
        }
    }

    fn process_user(&mut self, command: &Command, now: Instant) {
        let Some(control) = self.control.as_mut() else {
            return;
        };

        match validate_user(command, &self.credentials) {
            Ok(()) => {
                send_response(control, PASSWORD_REQUIRED, "OK. Password required");
                self.session.set_current_directory("/".to_string());
                self.session.set_state(SessionState::AwaitingPassword);
            }
            Err(e) => {
                info!("Login rejected: {e}");
                match e {
                    AuthError::UnexpectedCommand { .. } => {
                        send_response(control, SYNTAX_ERROR, "Syntax error")
                    }
                    _ => send_response(control, AUTH_FAILED, "user not found"),
                }
                self.hold(now, AUTH_FAILURE_HOLD);
                self.session.set_state(SessionState::Disconnected);
            }
        }
    }

    fn process_password(&mut self, command: &Command, now: Instant) {
        let Some(control) = self.control.as_mut() else {
            return;
        };

        match validate_password(command, &self.credentials) {
            Ok(()) => {
                send_response(control, LOGIN_SUCCESS, "OK.");
                info!("User {} logged in", self.credentials.username());
                self.ensure_storage();
                self.session
                    .set_command_deadline(now + self.config.inactivity_timeout());
                self.session.set_state(SessionState::Ready);
            }
            Err(e) => {
                info!("Login rejected: {e}");
                match e {
                    AuthError::UnexpectedCommand { .. } => {
                        send_response(control, SYNTAX_ERROR, "Syntax error")
                    }
                    _ => send_response(control, AUTH_FAILED, ""),
                }
                self.hold(now, AUTH_FAILURE_HOLD);
                self.session.set_state(SessionState::Disconnected);
            }
        }
    }

    /// Initializes storage on the first successful login.
    fn ensure_storage(&mut self) {
        if self.storage_ready {
            return;
        }
        match self.fs.init() {
            Ok(()) => self.storage_ready = true,
            Err(e) => error!("Storage initialization failed: {e}"),
        }
    }

    fn dispatch(&mut self, command: &Command) {
        let Some(control) = self.control.as_mut() else {
            return;
        };

        let mut ctx = CommandContext {
            session: &mut self.session,
            control,
            data: &mut self.data,
            transport: &mut self.transport,
            fs: &mut self.fs,
            transfer: &mut self.transfer,
            clock: self.clock.as_ref(),
            config: &self.config,
        };

        match handle_command(&mut ctx, command) {
            CommandStatus::Continue => {
                let deadline = self.clock.now() + self.config.inactivity_timeout();
                self.session.set_command_deadline(deadline);
            }
            CommandStatus::CloseConnection => {
                self.disconnect_client();
                self.session.set_state(SessionState::Disconnected);
            }
        }
    }

    fn service_transfer(&mut self, now: Instant) {
        let Some(transfer) = self.transfer.as_mut() else {
            return;
        };

        match transfer.advance() {
            TransferProgress::Pending => {}
            TransferProgress::Done => {
                if let Some(transfer) = self.transfer.take() {
                    let summary = transfer.finish(self.clock.now());
                    if let Some(control) = self.control.as_mut() {
                        summary.send(control);
                    }
                }
                self.session
                    .set_command_deadline(now + self.config.inactivity_timeout());
            }
            TransferProgress::Failed => {
                abort_transfer(&mut self.transfer, self.control.as_mut());
            }
        }
    }
}
