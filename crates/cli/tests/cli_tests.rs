//! End-to-end runs of the command line against temporary projects

use cli::{CliApp, ExitCode, StudioConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn foundry() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foundry.toml"), "[profile.default]\n").unwrap();
        let fixture = Self { dir };
        fixture.write(
            "src/Vault.sol",
            r#"pragma solidity ^0.8.19;
import "./tokens/Token.sol";
import {Ownable} from "@openzeppelin/contracts/access/Ownable.sol";
import "./Missing.sol";

contract Vault is Ownable {}
"#,
        );
        fixture.write(
            "src/tokens/Token.sol",
            "pragma solidity ^0.8.19;\ncontract Token {}\n",
        );
        fixture
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config(&self, config: &StudioConfig) -> String {
        let path = self.dir.path().join("studio.yml");
        config.save_to_file(&path).unwrap();
        path.display().to_string()
    }

    fn run(&self, args: &[&str]) -> (ExitCode, String) {
        let config = self.config(&StudioConfig::default());
        self.run_with_config(&config, args)
    }

    fn run_with_config(&self, config: &str, args: &[&str]) -> (ExitCode, String) {
        let mut argv = vec![
            "soliditystudio".to_string(),
            "--project".to_string(),
            path_str(self.dir.path()),
            "--config".to_string(),
            config.to_string(),
            "--no-color".to_string(),
        ];
        argv.extend(args.iter().map(|arg| arg.to_string()));

        let mut out = Vec::new();
        let code = CliApp::execute(argv, &mut out).unwrap();
        (code, String::from_utf8(out).unwrap())
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn test_graph_json() {
    let fixture = Fixture::foundry();
    let (code, output) = fixture.run(&["--format", "json", "graph"]);
    assert_eq!(code, ExitCode::Success);

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["has_cycles"], false);
    assert_eq!(json["files"].as_array().unwrap().len(), 2);
    assert_eq!(json["missing"][0]["raw"], "./Missing.sol");
    assert_eq!(json["external"][0]["name"], "OpenZeppelin Contracts");
    assert_eq!(
        json["topological_order"],
        serde_json::json!(["src/tokens/Token.sol", "src/Vault.sol"])
    );
}

#[test]
fn test_imports_console() {
    let fixture = Fixture::foundry();
    let (code, output) = fixture.run(&["imports", "src/Vault.sol"]);
    assert_eq!(code, ExitCode::Success);

    assert!(output.contains("Imports of src/Vault.sol"));
    assert!(output.contains("→ src/tokens/Token.sol"));
    assert!(output.contains("OpenZeppelin"));
    assert!(output.contains("✗ missing"));
}

#[test]
fn test_unit_request_json() {
    let fixture = Fixture::foundry();
    let (code, output) = fixture.run(&["unit", "src/Vault.sol", "--request"]);
    assert_eq!(code, ExitCode::Success);

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["entryPoint"], "src/Vault.sol");
    assert!(json["sources"]["src/tokens/Token.sol"].is_string());
    assert!(json["sources"]["src/Vault.sol"].is_string());
}

#[test]
fn test_resolve_does_not_need_a_project() {
    let fixture = Fixture::foundry();
    let (code, output) = fixture.run(&["resolve", "a/b/C.sol", "../E.sol"]);
    assert_eq!(code, ExitCode::Success);
    assert_eq!(output.trim(), "a/E.sol");
}

#[test]
fn test_strict_flag_rejects_root_escape() {
    let fixture = Fixture::foundry();

    let (code, output) = fixture.run(&["resolve", "A.sol", "../../B.sol"]);
    assert_eq!(code, ExitCode::Success);
    assert_eq!(output.trim(), "B.sol");

    let (code, _) = fixture.run(&["--strict", "resolve", "A.sol", "../../B.sol"]);
    assert_eq!(code, ExitCode::ResolutionError);
}

#[test]
fn test_unknown_entry_file() {
    let fixture = Fixture::foundry();
    let (code, _) = fixture.run(&["unit", "src/Nope.sol"]);
    assert_eq!(code, ExitCode::ResolutionError);
}

#[test]
fn test_invalid_config_is_config_error() {
    let fixture = Fixture::foundry();
    let mut config = StudioConfig::default();
    config.compiler.timeout_secs = 0;
    let path = fixture.config(&config);

    let (code, _) = fixture.run_with_config(&path, &["graph"]);
    assert_eq!(code, ExitCode::ConfigError);
}

#[test]
fn test_compile_with_unreachable_service() {
    let fixture = Fixture::foundry();

    // Bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/api/compile", listener.local_addr().unwrap());
    drop(listener);

    let mut config = StudioConfig::default();
    config.compiler.endpoint = endpoint;
    config.compiler.timeout_secs = 5;
    let path = fixture.config(&config);

    let (code, output) = fixture.run_with_config(&path, &["compile", "src/tokens/Token.sol"]);
    assert_eq!(code, ExitCode::CompileFailure);
    assert!(output.contains("✗ Compilation failed"));
}

#[test]
fn test_project_from_snapshot() {
    let fixture = Fixture::foundry();
    let snapshot = r#"[
        {"id": 1, "name": "Main.sol", "kind": "file", "parent": null, "content": "import \"./Lib.sol\";\ncontract Main {}"},
        {"id": 2, "name": "Lib.sol", "kind": "file", "parent": null, "content": "library Lib {}"}
    ]"#;
    fixture.write("snapshot.json", snapshot);

    let config = fixture.config(&StudioConfig::default());
    let mut out = Vec::new();
    let code = CliApp::execute(
        vec![
            "soliditystudio".to_string(),
            "--project".to_string(),
            path_str(&fixture.dir.path().join("snapshot.json")),
            "--config".to_string(),
            config,
            "--format".to_string(),
            "json".to_string(),
            "unit".to_string(),
            "Main.sol".to_string(),
        ],
        &mut out,
    )
    .unwrap();
    assert_eq!(code, ExitCode::Success);

    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["entry_path"], "Main.sol");
    assert_eq!(json["had_cycle"], false);
}

#[test]
fn test_help_is_success() {
    let mut out = Vec::new();
    let code = CliApp::execute(
        vec!["soliditystudio".to_string(), "--help".to_string()],
        &mut out,
    )
    .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(String::from_utf8(out).unwrap().contains("imports"));
}
