//! Command handlers module for the solo FTP server.
//!
//! This module defines handler functions for the FTP commands accepted once
//! a client is logged in: navigation, file operations, directory management,
//! data channel setup and transfers. Every handler writes its own reply on
//! the control connection.

use log::{debug, info, warn};
use std::net::{IpAddr, Ipv4Addr};

use crate::client::Session;
use crate::config::ServerConfig;
use crate::error::StorageError;
use crate::navigate::{parent_directory, resolve_path};
use crate::protocol::responses::*;
use crate::protocol::{Command, CommandStatus};
use crate::storage::{FileHandle, Filesystem, OpenMode, mlsd_lines, nlst_lines};
use crate::transfer::{
    Connection, DataChannel, Transfer, Transport, abort_transfer, format_endpoint,
};
use crate::utils::Clock;

/// Everything a command handler may touch, borrowed from the server for the
/// duration of one command.
pub struct CommandContext<'a, T: Transport, F: Filesystem> {
    pub session: &'a mut Session,
    pub control: &'a mut T::Conn,
    pub data: &'a mut DataChannel<T::Conn>,
    pub transport: &'a mut T,
    pub fs: &'a mut F,
    pub transfer: &'a mut Option<Transfer<F::File, T::Conn>>,
    pub clock: &'a dyn Clock,
    pub config: &'a ServerConfig,
}

/// Dispatches a received FTP command to its corresponding handler.
///
/// # Arguments
///
/// * `ctx` - Session, connections and collaborators of the current client.
/// * `command` - The parsed FTP command.
///
/// # Returns
///
/// * `CommandStatus` - Whether the session continues or the client asked to
///   leave.
pub fn handle_command<T, F>(ctx: &mut CommandContext<'_, T, F>, command: &Command) -> CommandStatus
where
    T: Transport,
    F: Filesystem,
{
    match command {
        Command::QUIT => return CommandStatus::CloseConnection,
        Command::CDUP => handle_cmd_cdup(ctx),
        Command::CWD(param) => handle_cmd_cwd(ctx, param),
        Command::PWD => handle_cmd_pwd(ctx),
        Command::MODE(param) => handle_cmd_mode(ctx, param),
        Command::STRU(param) => handle_cmd_stru(ctx, param),
        Command::TYPE(param) => handle_cmd_type(ctx, param),
        Command::PASV => handle_cmd_pasv(ctx),
        Command::PORT(param) => handle_cmd_port(ctx, param),
        Command::ABOR => handle_cmd_abor(ctx),
        Command::DELE(param) => handle_cmd_dele(ctx, param),
        Command::LIST(_) => send_response(ctx.control, NOT_IMPLEMENTED, "Command not implemented"),
        Command::MLSD(param) => handle_cmd_mlsd(ctx, param),
        Command::NLST(param) => handle_cmd_nlst(ctx, param),
        Command::NOOP => send_response(ctx.control, OK, "Zzz..."),
        Command::RETR(param) => handle_cmd_retr(ctx, param),
        Command::STOR(param) => handle_cmd_stor(ctx, param),
        Command::MKD(param) => handle_cmd_mkd(ctx, param),
        Command::RMD(param) => handle_cmd_rmd(ctx, param),
        Command::RNFR(param) => handle_cmd_rnfr(ctx, param),
        Command::RNTO(param) => handle_cmd_rnto(ctx, param),
        Command::FEAT => handle_cmd_feat(ctx),
        Command::MDTM(_) => send_response(ctx.control, FILE_NOT_FOUND, "Unable to retrieve time"),
        Command::SIZE(param) => handle_cmd_size(ctx, param),
        Command::SITE(param) => send_response(
            ctx.control,
            SYNTAX_ERROR,
            &format!("Unknown SITE command {param}"),
        ),
        Command::USER(_) | Command::PASS(_) | Command::UNKNOWN(_) => {
            send_response(ctx.control, SYNTAX_ERROR, "Unknown command")
        }
    }

    CommandStatus::Continue
}

/// Resolves a required path parameter, replying 501 when it is missing and
/// 500 when the resolved path does not fit.
fn require_path<T: Transport, F: Filesystem>(
    ctx: &mut CommandContext<'_, T, F>,
    param: &str,
) -> Option<String> {
    if param.is_empty() {
        send_response(ctx.control, PARAMETER_SYNTAX_ERROR, "No file name");
        return None;
    }
    resolve_or_reply(ctx, param)
}

fn resolve_or_reply<T: Transport, F: Filesystem>(
    ctx: &mut CommandContext<'_, T, F>,
    param: &str,
) -> Option<String> {
    match resolve_path(
        ctx.session.current_directory(),
        param,
        ctx.config.max_path_length,
    ) {
        Ok(path) => Some(path),
        Err(e) => {
            debug!("Rejecting path {param}: {e}");
            send_response(ctx.control, SYNTAX_ERROR, "Command line too long");
            None
        }
    }
}

/// Directory listed by MLSD and NLST: the current directory unless a path
/// is given. Option-like parameters (`-a`, `-l`) are ignored.
fn listing_directory<T: Transport, F: Filesystem>(
    ctx: &mut CommandContext<'_, T, F>,
    param: &str,
) -> Option<String> {
    if param.is_empty() || param.starts_with('-') {
        return Some(ctx.session.current_directory().to_string());
    }
    resolve_or_reply(ctx, param)
}

/// Terminates the open transfer so that at most one exists.
fn abort_open_transfer<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>) {
    abort_transfer(ctx.transfer, Some(&mut *ctx.control));
}

fn open_data_connection<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>) -> bool {
    match ctx.data.connect(&mut *ctx.transport, ctx.clock) {
        Ok(()) => true,
        Err(e) => {
            warn!("Data connection failed: {e}");
            false
        }
    }
}

/// Writes listing lines on the data connection; returns how many were sent.
fn send_listing<C: Connection>(data: &mut DataChannel<C>, lines: &[String]) -> usize {
    let mut sent = 0;
    for line in lines {
        if let Err(e) = data.write_line(line) {
            warn!("Listing interrupted after {sent} lines: {e}");
            break;
        }
        sent += 1;
    }
    sent
}

fn send_pwd<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>) {
    let message = format!(
        "\"{}\" is your current directory",
        ctx.session.current_directory()
    );
    send_response(ctx.control, PATH_CREATED, &message);
}

// ──────────────────────────
// Navigation
// ──────────────────────────

/// Handles CDUP: moves to the parent directory, staying at the root.
fn handle_cmd_cdup<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>) {
    let parent = parent_directory(ctx.session.current_directory());
    ctx.session.set_current_directory(parent);
    let message = format!(
        "Ok. Current directory is {}",
        ctx.session.current_directory()
    );
    send_response(ctx.control, FILE_ACTION_OK, &message);
}

/// Handles CWD: `.` reports the current directory, anything else must
/// resolve to an existing directory.
fn handle_cmd_cwd<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    if param == "." {
        send_pwd(ctx);
        return;
    }

    let Some(path) = require_path(ctx, param) else {
        return;
    };

    if !ctx.fs.is_dir(&path) {
        send_response(
            ctx.control,
            FILE_NOT_FOUND,
            &format!("Can't open directory {param}"),
        );
        return;
    }

    ctx.session.set_current_directory(path);
    let message = format!(
        "Ok. Current directory is {}",
        ctx.session.current_directory()
    );
    send_response(ctx.control, FILE_ACTION_OK, &message);
}

fn handle_cmd_pwd<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>) {
    send_pwd(ctx);
}

// ──────────────────────────
// Transfer parameters
// ──────────────────────────

fn handle_cmd_mode<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    if param == "S" {
        send_response(ctx.control, OK, "S Ok");
    } else {
        send_response(ctx.control, PARAMETER_NOT_IMPLEMENTED, "Only S(tream) is supported");
    }
}

fn handle_cmd_stru<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    if param == "F" {
        send_response(ctx.control, OK, "F Ok");
    } else {
        send_response(ctx.control, PARAMETER_NOT_IMPLEMENTED, "Only F(ile) is supported");
    }
}

/// Handles TYPE. Transfers are always byte for byte, so the type is only
/// acknowledged.
fn handle_cmd_type<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    match param {
        "A" => send_response(ctx.control, OK, "TYPE is now ASCII"),
        "I" => send_response(ctx.control, OK, "TYPE is now 8-bit binary"),
        _ => send_response(ctx.control, PARAMETER_NOT_IMPLEMENTED, "Unknown TYPE"),
    }
}

/// Handles PASV: advertises the passive listener.
fn handle_cmd_pasv<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>) {
    abort_open_transfer(ctx);

    let ip = ctx
        .config
        .passive_ip()
        .or_else(|| match ctx.control.local_ip() {
            Some(IpAddr::V4(ip)) => Some(ip),
            Some(IpAddr::V6(ip)) => ip.to_ipv4_mapped(),
            None => None,
        })
        .unwrap_or_else(|| {
            warn!("No IPv4 address to advertise for passive mode, set passive_address");
            Ipv4Addr::UNSPECIFIED
        });

    let endpoint = ctx.data.enter_passive(ip);
    send_response(
        ctx.control,
        PASSIVE_MODE,
        &format!("Entering Passive Mode ({}).", format_endpoint(&endpoint)),
    );
}

/// Handles PORT: records the client's endpoint for active mode.
fn handle_cmd_port<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    abort_open_transfer(ctx);

    match ctx.data.enter_active(param) {
        Ok(_) => send_response(ctx.control, OK, "PORT command successful"),
        Err(e) => {
            debug!("{e}");
            send_response(ctx.control, PARAMETER_SYNTAX_ERROR, "Can't interpret parameters");
        }
    }
}

fn handle_cmd_abor<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>) {
    abort_open_transfer(ctx);
    ctx.data.close();
    send_response(ctx.control, TRANSFER_COMPLETE, "Data connection closed");
}

// ──────────────────────────
// File operations
// ──────────────────────────

fn handle_cmd_dele<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    let Some(path) = require_path(ctx, param) else {
        return;
    };

    if !ctx.fs.exists(&path) {
        send_response(ctx.control, FILE_NOT_FOUND, &format!("File {param} not found"));
        return;
    }

    match ctx.fs.remove(&path) {
        Ok(()) => {
            info!("Deleted {path}");
            send_response(ctx.control, FILE_ACTION_OK, &format!("Deleted {param}"));
        }
        Err(e) => {
            warn!("Failed to delete {path}: {e}");
            send_response(ctx.control, FILE_UNAVAILABLE, &format!("Can't delete {param}"));
        }
    }
}

/// Handles RETR: opens the file and the data connection, then leaves the
/// copy to the transfer engine.
fn handle_cmd_retr<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    abort_open_transfer(ctx);

    let Some(path) = require_path(ctx, param) else {
        return;
    };

    if !ctx.fs.exists(&path) {
        send_response(ctx.control, FILE_NOT_FOUND, &format!("File {param} not found"));
        return;
    }

    let opened = ctx
        .fs
        .open(&path, OpenMode::Read)
        .and_then(|file| Ok((file.size()?, file)));
    let (size, file) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            warn!("Failed to open {path}: {e}");
            send_response(ctx.control, FILE_UNAVAILABLE, &format!("Can't open {param}"));
            return;
        }
    };

    let connection = if open_data_connection(ctx) {
        ctx.data.take_connection()
    } else {
        None
    };
    let Some(connection) = connection else {
        send_response(ctx.control, CANT_OPEN_DATA_CONNECTION, "No data connection");
        return;
    };

    let port = ctx.data.endpoint().port();
    send_continuation(ctx.control, FILE_STATUS_OK, &format!("Connected to port {port}"));
    send_response(ctx.control, FILE_STATUS_OK, &format!("{size} bytes to download"));

    *ctx.transfer = Some(Transfer::download(
        path,
        file,
        connection,
        ctx.config.buffer_size,
        ctx.clock.now(),
    ));
}

/// Handles STOR: creates (or truncates) the file and receives into it.
fn handle_cmd_stor<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    abort_open_transfer(ctx);

    let Some(path) = require_path(ctx, param) else {
        return;
    };

    let file = match ctx.fs.open(&path, OpenMode::Write) {
        Ok(file) => file,
        Err(e) => {
            warn!("Failed to create {path}: {e}");
            send_response(ctx.control, LOCAL_ERROR, &format!("Can't open/create {param}"));
            return;
        }
    };

    let connection = if open_data_connection(ctx) {
        ctx.data.take_connection()
    } else {
        None
    };
    let Some(connection) = connection else {
        send_response(ctx.control, CANT_OPEN_DATA_CONNECTION, "No data connection");
        return;
    };

    let port = ctx.data.endpoint().port();
    send_response(ctx.control, FILE_STATUS_OK, &format!("Connected to port {port}"));

    *ctx.transfer = Some(Transfer::upload(
        path,
        file,
        connection,
        ctx.config.buffer_size,
        ctx.clock.now(),
    ));
}

fn handle_cmd_size<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    let Some(path) = require_path(ctx, param) else {
        return;
    };

    let size = ctx
        .fs
        .open(&path, OpenMode::Read)
        .and_then(|file| file.size().map_err(StorageError::from));
    match size {
        Ok(size) => send_response(ctx.control, FILE_STATUS, &size.to_string()),
        Err(e) => {
            debug!("SIZE {path}: {e}");
            send_response(ctx.control, FILE_UNAVAILABLE, &format!("Can't open {param}"));
        }
    }
}

// ──────────────────────────
// Directory listings
// ──────────────────────────

/// Handles MLSD: one RFC 3659 fact line per entry of the directory.
fn handle_cmd_mlsd<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    abort_open_transfer(ctx);

    let Some(directory) = listing_directory(ctx, param) else {
        return;
    };

    if !open_data_connection(ctx) {
        send_response(ctx.control, CANT_OPEN_DATA_CONNECTION, "No data connection MLSD");
        return;
    }
    send_response(ctx.control, FILE_STATUS_OK, "Accepted data connection");

    match ctx.fs.read_dir(&directory) {
        Ok(entries) => {
            let sent = send_listing(ctx.data, &mlsd_lines(&directory, &entries));
            debug!("MLSD {directory}: {sent} lines");
            send_response(ctx.control, TRANSFER_COMPLETE, "MLSD completed");
        }
        Err(e) => {
            debug!("MLSD {directory}: {e}");
            send_response(
                ctx.control,
                FILE_NOT_FOUND,
                &format!("Can't open directory {directory}"),
            );
        }
    }

    ctx.data.close();
}

/// Handles NLST: one bare name per entry of the directory.
fn handle_cmd_nlst<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    abort_open_transfer(ctx);

    let Some(directory) = listing_directory(ctx, param) else {
        return;
    };

    if !open_data_connection(ctx) {
        send_response(ctx.control, CANT_OPEN_DATA_CONNECTION, "No data connection");
        return;
    }
    send_response(ctx.control, FILE_STATUS_OK, "Accepted data connection");

    match ctx.fs.read_dir(&directory) {
        Ok(entries) => {
            let sent = send_listing(ctx.data, &nlst_lines(&entries));
            send_response(ctx.control, TRANSFER_COMPLETE, &format!("{sent} matches total"));
        }
        Err(e) => {
            debug!("NLST {directory}: {e}");
            send_response(
                ctx.control,
                FILE_NOT_FOUND,
                &format!("Can't open directory {directory}"),
            );
        }
    }

    ctx.data.close();
}

// ──────────────────────────
// Directory management
// ──────────────────────────

fn handle_cmd_mkd<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    let Some(path) = require_path(ctx, param) else {
        return;
    };

    match ctx.fs.mkdir(&path, true) {
        Ok(()) => {
            info!("Created directory {path}");
            send_response(ctx.control, OK, &format!("Directory {param} created"));
        }
        Err(e) => {
            debug!("MKD {path}: {e}");
            send_response(ctx.control, FILE_NOT_FOUND, &format!("Can't create \"{param}\""));
        }
    }
}

fn handle_cmd_rmd<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    let Some(path) = require_path(ctx, param) else {
        return;
    };

    match ctx.fs.rmdir(&path) {
        Ok(()) => {
            info!("Removed directory {path}");
            send_response(ctx.control, OK, &format!("Directory {param} deleted"));
        }
        Err(e) => {
            debug!("RMD {path}: {e}");
            send_response(
                ctx.control,
                PARAMETER_SYNTAX_ERROR,
                &format!("Can't delete \"{param}\""),
            );
        }
    }
}

/// Handles RNFR: remembers an existing path as the rename source.
fn handle_cmd_rnfr<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    ctx.session.set_rename_source(None);

    let Some(path) = require_path(ctx, param) else {
        return;
    };

    if !ctx.fs.exists(&path) {
        send_response(ctx.control, FILE_NOT_FOUND, &format!("File {param} not found"));
        return;
    }

    ctx.session.set_rename_source(Some(path));
    send_response(
        ctx.control,
        PENDING_FURTHER_INFO,
        "RNFR accepted - file or folder exists, ready for destination",
    );
}

/// Handles RNTO. The pending source is consumed whatever the outcome.
fn handle_cmd_rnto<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>, param: &str) {
    let Some(source) = ctx.session.take_rename_source() else {
        send_response(ctx.control, BAD_SEQUENCE, "Need RNFR before RNTO");
        return;
    };

    let Some(target) = require_path(ctx, param) else {
        return;
    };

    if ctx.fs.exists(&target) {
        send_response(
            ctx.control,
            FILE_NAME_NOT_ALLOWED,
            &format!("{param} already exists"),
        );
        return;
    }

    match ctx.fs.rename(&source, &target) {
        Ok(()) => {
            info!("Renamed {source} to {target}");
            send_response(
                ctx.control,
                OK,
                &format!("Rename/move of file or directory from {source} to {target} successfully"),
            );
        }
        Err(e) => {
            warn!("Failed to rename {source} to {target}: {e}");
            send_response(
                ctx.control,
                LOCAL_ERROR,
                &format!("Rename/move from {source} to {target} failure"),
            );
        }
    }
}

fn handle_cmd_feat<T: Transport, F: Filesystem>(ctx: &mut CommandContext<'_, T, F>) {
    send_continuation(ctx.control, SYSTEM_STATUS, "Extensions supported:");
    send_line(ctx.control, " MLSD");
    send_line(ctx.control, " SIZE");
    send_response(ctx.control, SYSTEM_STATUS, "End.");
}
