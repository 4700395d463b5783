use anyhow::{Context, Result};
use serde_json::Value;

use crate::{CliTest, stderr, stdout};

#[test]
fn test_init_creates_config() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.command().arg("init").output()?;
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("Created fusion.config.json"));

    let content = test.read_file("fusion.config.json")?;
    let parsed: Value = serde_json::from_str(&content).context("Config should be valid JSON")?;
    for key in ["service", "provider", "runtime", "stage", "region", "outDir"] {
        assert!(parsed.get(key).is_some(), "Config should have '{}' field", key);
    }
    assert_eq!(parsed["provider"], "aws");

    Ok(())
}

#[test]
fn test_init_fails_if_exists() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("fusion.config.json", "{}")?;

    let output = test.command().arg("init").output()?;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("already exists"));
    assert_eq!(test.read_file("fusion.config.json")?, "{}");

    Ok(())
}

#[test]
fn test_init_in_root() -> Result<()> {
    let test = CliTest::new()?;
    std::fs::create_dir(test.root().join("service"))?;

    let output = test.command().args(["init", "--root", "service"]).output()?;
    assert_eq!(output.status.code(), Some(0));
    assert!(test.root().join("service/fusion.config.json").exists());

    Ok(())
}

#[test]
fn test_init_config_is_immediately_usable() -> Result<()> {
    let test = CliTest::new()?;

    test.command().arg("init").output()?;
    test.write_file("src/app.js", "// @cloudfunction\nfunction hello() { return 1; }")?;

    let output = test.synth_command("src/app.js").output()?;
    assert!(
        output.status.success(),
        "synth should work with initialized config. stderr: {}",
        stderr(&output)
    );
    assert!(test.read_file("serverless.yml")?.contains("service: my-service"));

    Ok(())
}
