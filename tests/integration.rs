use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use solo_ftp_server::client::SessionState;
use solo_ftp_server::storage::{Filesystem, LocalFilesystem};
use solo_ftp_server::transfer::{MemoryPeer, MemoryTransport};
use solo_ftp_server::utils::ManualClock;
use solo_ftp_server::{FtpServer, ServerConfig};

const TICK: Duration = Duration::from_millis(10);

/// A server wired to in-memory connections, a manual clock and a temporary
/// root directory, with one logged-out client attached.
struct Harness {
    _dir: TempDir,
    root: PathBuf,
    transport: MemoryTransport,
    clock: ManualClock,
    server: FtpServer<MemoryTransport, LocalFilesystem>,
    client: MemoryPeer,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(ServerConfig {
            username: "bob".into(),
            password: "secret".into(),
            ..ServerConfig::default()
        })
    }

    fn with_config(config: ServerConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        let transport = MemoryTransport::new(Ipv4Addr::new(192, 168, 4, 1));
        let clock = ManualClock::new();

        let mut server = FtpServer::with_clock(
            config,
            transport.clone(),
            LocalFilesystem::new(&root),
            Box::new(clock.clone()),
        );
        server.begin();

        let client = transport.dial_control();
        let mut harness = Self {
            _dir: dir,
            root,
            transport,
            clock,
            server,
            client,
        };
        harness.tick(2);
        let greeting = harness.client.take_text();
        assert!(greeting.starts_with("220-"), "unexpected greeting {greeting:?}");
        harness
    }

    fn tick(&mut self, count: usize) {
        for _ in 0..count {
            self.server.handle_ftp();
            self.clock.advance(TICK);
        }
    }

    /// Sends one command line, runs one tick and returns the replies.
    fn command(&mut self, line: &str) -> String {
        self.client.send_line(line);
        self.tick(1);
        self.client.take_text()
    }

    fn login(&mut self) {
        assert_eq!(self.command("USER bob"), "331 OK. Password required\r\n");
        assert_eq!(self.command("PASS secret"), "230 OK.\r\n");
    }

    /// Ticks until the open transfer completes and returns the replies.
    fn finish_transfer(&mut self) -> String {
        for _ in 0..10_000 {
            if !self.server.is_transferring() {
                break;
            }
            self.tick(1);
        }
        assert!(!self.server.is_transferring(), "transfer never finished");
        self.client.take_text()
    }

    fn write_file(&self, name: &str, contents: &[u8]) {
        fs::write(self.root.join(name), contents).unwrap();
    }
}

#[test]
fn test_login_and_pwd() {
    let mut h = Harness::new();
    h.login();
    assert_eq!(h.server.state(), SessionState::Ready);

    let first = h.command("PWD");
    assert_eq!(first, "257 \"/\" is your current directory\r\n");
    assert_eq!(h.command("PWD"), first);
}

#[test]
fn test_wrong_password_drops_session() {
    let mut h = Harness::new();
    assert_eq!(h.command("USER bob"), "331 OK. Password required\r\n");
    assert_eq!(h.command("PASS guess"), "530 \r\n");
    assert_eq!(h.server.state(), SessionState::Disconnected);

    h.tick(20);
    assert_eq!(h.client.take_text(), "221 Goodbye\r\n");
    assert!(!h.client.is_open());
}

#[test]
fn test_command_before_user_is_rejected() {
    let mut h = Harness::new();
    assert_eq!(h.command("PWD"), "500 Syntax error\r\n");
    assert_eq!(h.server.state(), SessionState::Disconnected);
}

#[test]
fn test_anonymous_accepts_any_password() {
    let mut h = Harness::with_config(ServerConfig {
        username: "anonymous".into(),
        password: String::new(),
        ..ServerConfig::default()
    });
    assert_eq!(h.command("USER anonymous"), "331 OK. Password required\r\n");
    assert_eq!(h.command("PASS guest@example.com"), "230 OK.\r\n");
}

#[test]
fn test_cwd_missing_directory_keeps_cwd() {
    let mut h = Harness::new();
    h.login();

    assert_eq!(
        h.command("CWD missing_dir"),
        "550 Can't open directory missing_dir\r\n"
    );
    assert_eq!(h.command("PWD"), "257 \"/\" is your current directory\r\n");
    assert_eq!(h.command("CWD"), "501 No file name\r\n");
}

#[test]
fn test_mkd_cwd_cdup_round_trip() {
    let mut h = Harness::new();
    h.login();

    assert_eq!(h.command("MKD sub"), "200 Directory sub created\r\n");
    assert_eq!(h.command("CWD sub"), "250 Ok. Current directory is /sub\r\n");
    assert_eq!(h.command("CWD ."), "257 \"/sub\" is your current directory\r\n");
    assert_eq!(h.command("CDUP"), "250 Ok. Current directory is /\r\n");
    assert_eq!(h.command("CDUP"), "250 Ok. Current directory is /\r\n");
    assert!(h.root.join("sub").is_dir());

    assert_eq!(h.command("MKD sub"), "550 Can't create \"sub\"\r\n");
    assert_eq!(h.command("RMD sub"), "200 Directory sub deleted\r\n");
    assert_eq!(h.command("RMD sub"), "501 Can't delete \"sub\"\r\n");
}

#[test]
fn test_backslash_paths_are_normalized() {
    let mut h = Harness::new();
    h.login();

    fs::create_dir_all(h.root.join("a/b")).unwrap();
    assert_eq!(h.command("CWD a\\b"), "250 Ok. Current directory is /a/b\r\n");
}

#[test]
fn test_retr_passive_download() {
    let mut h = Harness::new();
    h.login();
    let contents: Vec<u8> = (0..100u8).collect();
    h.write_file("existing.txt", &contents);

    assert_eq!(
        h.command("PASV"),
        "227 Entering Passive Mode (192,168,4,1,195,89).\r\n"
    );

    let data = h.transport.dial_passive();
    assert_eq!(
        h.command("RETR existing.txt"),
        "150-Connected to port 50009\r\n150 100 bytes to download\r\n"
    );

    let replies = h.finish_transfer();
    assert_eq!(
        replies,
        "226-File successfully transferred\r\n226 10 ms, 10 kbytes/s\r\n"
    );
    assert_eq!(data.take_output(), contents);
    assert!(!data.is_open());
}

#[test]
fn test_retr_missing_file() {
    let mut h = Harness::new();
    h.login();
    assert_eq!(h.command("RETR nope.txt"), "550 File nope.txt not found\r\n");
    assert_eq!(h.command("RETR"), "501 No file name\r\n");
}

#[test]
fn test_stor_upload_until_client_closes() {
    let mut h = Harness::new();
    h.login();
    h.write_file("up.bin", b"old contents that must be replaced");

    h.command("PASV");
    let data = h.transport.dial_passive();
    assert_eq!(h.command("STOR up.bin"), "150 Connected to port 50009\r\n");

    let payload = vec![0xA5u8; 5000];
    data.send(&payload);
    data.hang_up();

    let replies = h.finish_transfer();
    assert!(replies.contains("226"), "unexpected replies {replies:?}");
    assert_eq!(fs::read(h.root.join("up.bin")).unwrap(), payload);
}

#[test]
fn test_abor_during_download() {
    let mut h = Harness::new();
    h.login();
    h.write_file("big.bin", &vec![1u8; 100_000]);

    h.command("PASV");
    let data = h.transport.dial_passive();
    h.command("RETR big.bin");
    h.tick(3);
    assert!(h.server.is_transferring());

    assert_eq!(
        h.command("ABOR"),
        "426 Transfer aborted\r\n226 Data connection closed\r\n"
    );
    assert!(!h.server.is_transferring());
    assert!(!data.is_open());

    // Without an open transfer ABOR only confirms.
    assert_eq!(h.command("ABOR"), "226 Data connection closed\r\n");
}

#[test]
fn test_new_retr_replaces_open_transfer() {
    let mut h = Harness::new();
    h.login();
    h.write_file("big.bin", &vec![1u8; 100_000]);
    h.write_file("small.txt", b"hello");

    h.command("PASV");
    let first = h.transport.dial_passive();
    h.command("RETR big.bin");

    let second = h.transport.dial_passive();
    let replies = h.command("RETR small.txt");
    assert!(replies.starts_with("426 Transfer aborted\r\n150-Connected"));
    assert!(!first.is_open());

    h.finish_transfer();
    assert_eq!(second.take_output(), b"hello");
}

#[test]
fn test_no_data_connection() {
    let mut h = Harness::new();
    h.login();
    h.write_file("existing.txt", b"data");

    h.command("PASV");
    assert_eq!(h.command("RETR existing.txt"), "425 No data connection\r\n");
    assert_eq!(h.command("MLSD"), "425 No data connection MLSD\r\n");
    assert_eq!(h.command("NLST"), "425 No data connection\r\n");
    assert_eq!(h.server.state(), SessionState::Ready);
}

#[test]
fn test_port_and_nlst_in_active_mode() {
    let mut h = Harness::new();
    h.login();
    h.write_file("a.txt", b"a");
    fs::create_dir(h.root.join("b")).unwrap();

    assert_eq!(h.command("PORT 10,0,0,2,4,1"), "200 PORT command successful\r\n");
    let data = h.transport.listen_active();
    assert_eq!(
        h.command("NLST"),
        "150 Accepted data connection\r\n226 2 matches total\r\n"
    );
    assert_eq!(
        h.transport.dialed(),
        vec![SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 1025)]
    );
    assert_eq!(data.take_text(), "a.txt\r\nb\r\n");
    assert!(!data.is_open());

    assert_eq!(h.command("PORT 10,0,0,2"), "501 Can't interpret parameters\r\n");
}

#[test]
fn test_nlst_missing_directory() {
    let mut h = Harness::new();
    h.login();

    h.command("PASV");
    let _data = h.transport.dial_passive();
    assert_eq!(
        h.command("NLST ghost"),
        "150 Accepted data connection\r\n550 Can't open directory /ghost\r\n"
    );
}

#[test]
fn test_mlsd_listing() {
    let mut h = Harness::new();
    h.login();
    h.write_file("hello.txt", b"hello");
    fs::create_dir(h.root.join("logs")).unwrap();

    h.command("PASV");
    let data = h.transport.dial_passive();
    assert_eq!(
        h.command("MLSD"),
        "150 Accepted data connection\r\n226 MLSD completed\r\n"
    );

    let listing = data.take_text();
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines[0], "Type=cdir;Perm=cmpel; /");
    assert_eq!(lines[1], "Type=pdir;Perm=el; ..");
    assert!(lines[2].starts_with("Type=file;Size=5;modify="));
    assert!(lines[2].ends_with("; hello.txt"));
    assert!(lines[3].starts_with("Type=dir;modify="));
    assert!(lines[3].ends_with(";Perm=cpmel; logs"));
}

#[test]
fn test_rename_requires_fresh_rnfr() {
    let mut h = Harness::new();
    h.login();
    h.write_file("old.txt", b"x");

    assert_eq!(
        h.command("RNFR old.txt"),
        "350 RNFR accepted - file or folder exists, ready for destination\r\n"
    );
    assert_eq!(
        h.command("RNTO new.txt"),
        "200 Rename/move of file or directory from /old.txt to /new.txt successfully\r\n"
    );
    assert_eq!(h.command("RNTO new.txt"), "503 Need RNFR before RNTO\r\n");
    assert!(h.root.join("new.txt").exists());
    assert!(!h.root.join("old.txt").exists());
}

#[test]
fn test_failed_rnto_clears_source() {
    let mut h = Harness::new();
    h.login();
    h.write_file("a.txt", b"a");
    h.write_file("b.txt", b"b");

    h.command("RNFR a.txt");
    assert_eq!(h.command("RNTO b.txt"), "553 b.txt already exists\r\n");
    assert_eq!(h.command("RNTO c.txt"), "503 Need RNFR before RNTO\r\n");
    assert_eq!(h.command("RNFR missing.txt"), "550 File missing.txt not found\r\n");
    assert_eq!(h.command("RNTO c.txt"), "503 Need RNFR before RNTO\r\n");
}

#[test]
fn test_dele_and_size() {
    let mut h = Harness::new();
    h.login();
    h.write_file("five.txt", b"12345");

    assert_eq!(h.command("SIZE five.txt"), "213 5\r\n");
    assert_eq!(h.command("SIZE gone.txt"), "450 Can't open gone.txt\r\n");
    assert_eq!(h.command("DELE gone.txt"), "550 File gone.txt not found\r\n");
    assert_eq!(h.command("DELE five.txt"), "250 Deleted five.txt\r\n");
    assert!(!h.root.join("five.txt").exists());
}

#[test]
fn test_static_replies() {
    let mut h = Harness::new();
    h.login();

    assert_eq!(h.command("NOOP"), "200 Zzz...\r\n");
    assert_eq!(h.command("TYPE I"), "200 TYPE is now 8-bit binary\r\n");
    assert_eq!(h.command("TYPE A"), "200 TYPE is now ASCII\r\n");
    assert_eq!(h.command("TYPE E"), "504 Unknown TYPE\r\n");
    assert_eq!(h.command("MODE S"), "200 S Ok\r\n");
    assert_eq!(h.command("MODE B"), "504 Only S(tream) is supported\r\n");
    assert_eq!(h.command("STRU F"), "200 F Ok\r\n");
    assert_eq!(h.command("LIST"), "502 Command not implemented\r\n");
    assert_eq!(h.command("MDTM a.txt"), "550 Unable to retrieve time\r\n");
    assert_eq!(h.command("SITE CHMOD"), "500 Unknown SITE command CHMOD\r\n");
    assert_eq!(h.command("XYZ"), "500 Unknown command\r\n");
    assert_eq!(h.command("USER bob"), "500 Unknown command\r\n");
    assert_eq!(
        h.command("FEAT"),
        "211-Extensions supported:\r\n MLSD\r\n SIZE\r\n211 End.\r\n"
    );
}

#[test]
fn test_long_token_resets_line() {
    let mut h = Harness::new();
    h.login();

    assert_eq!(h.command("XMKDIR foo"), "500 Syntax error\r\n");
    assert_eq!(h.command("NOOP"), "200 Zzz...\r\n");
    assert_eq!(h.server.state(), SessionState::Ready);
}

#[test]
fn test_overlong_line_is_rejected() {
    let mut h = Harness::new();
    h.login();

    let line = format!("CWD {}", "d".repeat(400));
    assert_eq!(h.command(&line), "500 Syntax error\r\n");
    assert_eq!(h.command("PWD"), "257 \"/\" is your current directory\r\n");
}

#[test]
fn test_path_capacity_is_enforced() {
    let mut h = Harness::with_config(ServerConfig {
        username: "bob".into(),
        password: "secret".into(),
        max_path_length: 16,
        ..ServerConfig::default()
    });
    h.login();

    assert_eq!(
        h.command("MKD abcdefghijklmnopq"),
        "500 Command line too long\r\n"
    );
    assert_eq!(h.command("MKD abc"), "200 Directory abc created\r\n");
    assert!(h.server.filesystem().is_dir("/abc"));
}

#[test]
fn test_path_capacity_applies_to_every_path_command() {
    let mut h = Harness::with_config(ServerConfig {
        username: "bob".into(),
        password: "secret".into(),
        max_path_length: 16,
        ..ServerConfig::default()
    });
    h.login();
    h.write_file("a.txt", b"a");

    let long = "q".repeat(h.server.config().max_path_length);
    for verb in ["CWD", "RETR", "STOR", "DELE", "SIZE", "RNFR"] {
        assert_eq!(
            h.command(&format!("{verb} {long}")),
            "500 Command line too long\r\n",
            "{verb}"
        );
    }
    assert!(!h.server.filesystem().exists(&format!("/{long}")));
    assert!(!h.server.is_transferring());

    h.command("RNFR a.txt");
    assert_eq!(h.server.session().rename_source(), Some("/a.txt"));
    assert_eq!(
        h.command(&format!("RNTO {long}")),
        "500 Command line too long\r\n"
    );
    assert_eq!(h.server.session().rename_source(), None);
    assert!(h.root.join("a.txt").exists());

    // A trailing slash does not count against the limit.
    assert_eq!(h.command("MKD abcdefghijklmno/"), "200 Directory abcdefghijklmno/ created\r\n");
    assert!(h.root.join("abcdefghijklmno").is_dir());
}

#[test]
fn test_stor_onto_directory_fails() {
    let mut h = Harness::new();
    h.login();
    fs::create_dir(h.root.join("d")).unwrap();

    assert_eq!(h.command("STOR d"), "451 Can't open/create d\r\n");
    assert!(!h.server.is_transferring());
    assert!(h.root.join("d").is_dir());
}

#[test]
fn test_dele_directory_fails() {
    let mut h = Harness::new();
    h.login();
    fs::create_dir(h.root.join("d")).unwrap();

    assert_eq!(h.command("DELE d"), "450 Can't delete d\r\n");
    assert!(h.root.join("d").is_dir());
}

#[test]
fn test_inactivity_timeout() {
    let mut h = Harness::new();
    h.login();

    h.clock.advance(Duration::from_secs(299));
    h.tick(1);
    assert_eq!(h.client.take_text(), "");

    h.clock.advance(Duration::from_secs(1));
    h.tick(1);
    assert_eq!(h.client.take_text(), "530 Timeout\r\n");
    assert_eq!(h.server.state(), SessionState::Disconnected);

    h.tick(30);
    assert_eq!(h.client.take_text(), "221 Goodbye\r\n");
    assert!(!h.server.has_client());
}

#[test]
fn test_quit_says_goodbye() {
    let mut h = Harness::new();
    h.login();

    assert_eq!(h.command("QUIT"), "221 Goodbye\r\n");
    assert!(!h.client.is_open());
    assert_eq!(h.server.state(), SessionState::Disconnected);

    h.tick(2);
    assert_eq!(h.server.state(), SessionState::Idle);
}

#[test]
fn test_new_connection_preempts_session() {
    let mut h = Harness::new();
    h.login();
    h.write_file("big.bin", &vec![1u8; 100_000]);
    h.command("PASV");
    let data = h.transport.dial_passive();
    h.command("RETR big.bin");

    let second = h.transport.dial_control();
    h.tick(1);
    assert_eq!(
        h.client.take_text(),
        "426 Transfer aborted\r\n221 Goodbye\r\n"
    );
    assert!(!h.client.is_open());
    assert!(!data.is_open());
    assert!(!h.server.is_transferring());

    h.tick(1);
    assert!(second.take_text().starts_with("220-"));
    assert_eq!(h.server.state(), SessionState::AwaitingUser);
}

#[test]
fn test_client_hang_up_ends_session() {
    let mut h = Harness::new();
    h.login();

    h.client.hang_up();
    h.tick(1);
    assert_eq!(h.server.state(), SessionState::Disconnected);
    h.tick(2);
    assert_eq!(h.server.state(), SessionState::Idle);
    assert!(!h.server.has_client());
}
