use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const MEDIC_UID: &str = "6f1c2a9e-3b7d-4e52-9a1f-0c8d2e4b7a31";

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(xdg_data.join("reforger-stats"))
            .expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(xdg_config.join("reforger-stats"))
            .expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        let env = Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        };
        seed_stats_db(&env.db_path());
        env.write_config("[stats]\ntable = \"reforger_stats\"\nservers = 2\n");
        env
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("reforger-stats/stats.db")
    }

    fn write_config(&self, content: &str) {
        fs::write(self.xdg_config.join("reforger-stats/config.toml"), content)
            .expect("failed to write config");
    }
}

fn seed_stats_db(path: &Path) {
    let conn = Connection::open(path).expect("failed to create stats db");
    conn.execute_batch(
        r#"
        CREATE TABLE players (playerUID TEXT PRIMARY KEY, playerName TEXT);
        CREATE TABLE reforger_stats (
            playerUID       TEXT NOT NULL,
            server_id       INTEGER NOT NULL,
            level           INTEGER DEFAULT 0,
            kills           INTEGER DEFAULT 0,
            deaths          INTEGER DEFAULT 0,
            distance_walked INTEGER DEFAULT 0,
            kick_streak     INTEGER DEFAULT 0
        );

        INSERT INTO players VALUES ('6f1c2a9e-3b7d-4e52-9a1f-0c8d2e4b7a31', 'Field Medic');
        INSERT INTO players VALUES ('b0000000-0000-4000-8000-000000000001', 'Smith One');
        INSERT INTO players VALUES ('b0000000-0000-4000-8000-000000000002', 'Smith Two');

        INSERT INTO reforger_stats VALUES ('6f1c2a9e-3b7d-4e52-9a1f-0c8d2e4b7a31', 1, 10, 3, 1, 12345, 4);
        INSERT INTO reforger_stats VALUES ('6f1c2a9e-3b7d-4e52-9a1f-0c8d2e4b7a31', 2, 15, 5, 0, 0, 0);
        "#,
    )
    .expect("failed to seed stats db");
}

fn run_cli(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("reforger-stats"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute reforger-stats: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    panic!(
        "reforger-stats {} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn json_report_for_uid() {
    let env = CliTestEnv::new();
    let args = [MEDIC_UID, "--format", "json"];

    let output = run_cli(&env, &args);
    assert_success(&args, &output);

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["player"]["name"], "Field Medic");
    assert_eq!(report["infantry"]["kills"], 8);
    assert_eq!(report["infantry"]["kd_ratio"], "8.00");
    assert_eq!(report["infantry"]["distance_walked_km"], "12.35");
    assert_eq!(report["progression"]["level"], 15);
    assert_eq!(report["servers"]["combined"], serde_json::json!(["1", "2"]));
    assert_eq!(report["moderation"], serde_json::json!({ "kicks": 4 }));
}

#[test]
fn text_report_for_name_on_one_server() {
    let env = CliTestEnv::new();
    let args = ["medic", "--server", "2"];

    let output = run_cli(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("User: Field Medic"), "got:\n{stdout}");
    assert!(stdout.contains("Server: 2"));
    assert!(stdout.contains("K/D: 5"));
    assert!(!stdout.contains("Moderation History"));
}

#[test]
fn ambiguous_name_lists_candidates() {
    let env = CliTestEnv::new();

    let output = run_cli(&env, &["smith"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("found 2 players matching \"smith\""), "got:\n{stderr}");
    assert!(stderr.contains("1. Smith One - UUID: b0000000-0000-4000-8000-000000000001"));
    assert!(stderr.contains("2. Smith Two"));
}

#[test]
fn out_of_range_server_is_rejected() {
    let env = CliTestEnv::new();

    let output = run_cli(&env, &[MEDIC_UID, "--server", "3"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("between 1 and 2"), "got:\n{stderr}");
}

#[test]
fn missing_table_config_fails() {
    let env = CliTestEnv::new();
    env.write_config("[stats]\nservers = 2\n");

    let output = run_cli(&env, &[MEDIC_UID]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("stats.table is required"), "got:\n{stderr}");
}

#[test]
fn blank_identifier_is_rejected() {
    let env = CliTestEnv::new();

    let output = run_cli(&env, &["  "]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no player given"), "got:\n{stderr}");
}
