use anyhow::Result;
use insta::assert_snapshot;
use serde_yaml_ng::Value;

use crate::{CliTest, stderr, stdout};

const HANDLERS: &str = r#"
// @cloudfunction(memory=256) @httpapi(method=GET, path=/orders)
function listOrders(event) {
  return [];
}

// @cloudfunction @warmup(rate=10)
const getOrder = async (event) => {
  return { id: event.id };
};

async function summary() {
  return listOrders({ limit: 5 });
}
"#;

fn descriptor(test: &CliTest, path: &str) -> Result<Value> {
    Ok(serde_yaml_ng::from_str(&test.read_file(path)?)?)
}

#[test]
fn test_synth_writes_descriptor() -> Result<()> {
    let test = CliTest::with_config()?;
    test.write_file("src/orders.js", HANDLERS)?;

    let output = test.synth_command("src/orders.js").output()?;
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_snapshot!(stdout(&output), @r"
    ✓ Synthesized 2 functions into serverless.yml
    ✓ Wrote transformed module to out/orders.js
    ");
    assert!(stderr(&output).is_empty());

    let doc = descriptor(&test, "serverless.yml")?;
    assert_eq!(doc["service"].as_str(), Some("shop"));
    assert_eq!(doc["provider"]["region"].as_str(), Some("eu-west-1"));
    assert_eq!(
        doc["provider"]["iam"]["role"]["statements"][0]["Action"][0].as_str(),
        Some("lambda:InvokeFunction")
    );

    let list = &doc["functions"]["listOrders"];
    assert_eq!(list["handler"].as_str(), Some("out/orders.listOrders"));
    assert_eq!(list["memorySize"].as_u64(), Some(256));
    assert_eq!(list["events"][0]["httpApi"]["path"].as_str(), Some("/orders"));

    let get = &doc["functions"]["getOrder"];
    assert_eq!(get["events"][0]["schedule"]["rate"].as_str(), Some("rate(10 minutes)"));
    assert_eq!(get["events"][0]["schedule"]["input"]["warmup"].as_bool(), Some(true));

    Ok(())
}

#[test]
fn test_synth_writes_transformed_module() -> Result<()> {
    let test = CliTest::with_config()?;
    test.write_file("src/orders.js", HANDLERS)?;

    let output = test.synth_command("src/orders.js").output()?;
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let code = test.read_file("out/orders.js")?;
    assert!(code.starts_with("const AWS = require(\"aws-sdk\");"));
    assert!(code.contains("exports.listOrders = async (event)=>"));
    assert!(code.contains("exports.getOrder = async (event)=>"));
    assert!(code.contains("if (event.warmup)"));
    assert!(code.contains("await invokeLambda("));
    assert!(code.contains("shop-dev-listOrders"));
    assert!(code.contains("async function summary()"));

    Ok(())
}

#[test]
fn test_synth_with_root_writes_module_under_root() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("service/fusion.config.json", crate::CONFIG)?;
    test.write_file("service/src/app.js", "// @cloudfunction\nfunction ping() {}")?;

    let output = test
        .synth_command("src/app.js")
        .args(["--root", "service"])
        .output()?;
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(test.read_file("service/out/app.js")?.contains("exports.ping = async ()=>"));

    Ok(())
}

#[test]
fn test_synth_reports_warnings() -> Result<()> {
    let test = CliTest::with_config()?;
    test.write_file(
        "src/app.js",
        "// @warmup(rate=10)\nfunction bar(event) {\n  return 1;\n}\n",
    )?;

    let output = test.synth_command("src/app.js").output()?;
    assert_eq!(output.status.code(), Some(0));
    assert_snapshot!(stderr(&output), @r"
    warning: @warmup depends on @cloudfunction, which is not defined. @warmup will be skipped.
      --> src/app.js:2:0
    ");
    assert!(stdout(&output).contains("Synthesized 0 functions into serverless.yml (1 warning)"));

    Ok(())
}

#[test]
fn test_synth_verbose_lists_functions() -> Result<()> {
    let test = CliTest::with_config()?;
    test.write_file("src/orders.js", HANDLERS)?;

    let output = test.synth_command("src/orders.js").arg("-v").output()?;
    let out = stdout(&output);
    assert!(out.contains("listOrders out/orders.listOrders, 256 MB"));
    assert!(out.contains("- httpApi GET /orders"));
    assert!(out.contains("- schedule rate(10 minutes)"));

    Ok(())
}

#[test]
fn test_synth_custom_output() -> Result<()> {
    let test = CliTest::with_config()?;
    test.write_file("src/orders.js", HANDLERS)?;

    let output = test
        .synth_command("src/orders.js")
        .args(["--output", "deploy/stack.yml"])
        .output()?;
    assert_eq!(output.status.code(), Some(0));
    assert!(test.root().join("deploy/stack.yml").exists());
    assert!(!test.root().join("serverless.yml").exists());

    Ok(())
}

#[test]
fn test_synth_with_root() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("service/fusion.config.json", crate::CONFIG)?;
    test.write_file("service/src/app.js", "// @cloudfunction\nfunction ping() {}")?;

    let output = test
        .synth_command("src/app.js")
        .args(["--root", "service"])
        .output()?;
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let doc = descriptor(&test, "service/serverless.yml")?;
    assert_eq!(doc["functions"]["ping"]["handler"].as_str(), Some("out/app.ping"));

    Ok(())
}

#[test]
fn test_synth_without_config_fails() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("src/app.js", "// @cloudfunction\nfunction ping() {}")?;

    let output = test.synth_command("src/app.js").output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("fusion.config.json not found"));
    assert!(!test.root().join("serverless.yml").exists());

    Ok(())
}

#[test]
fn test_synth_incomplete_config_fails() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("fusion.config.json", r#"{ "service": "shop" }"#)?;
    test.write_file("src/app.js", "function ping() {}")?;

    let output = test.synth_command("src/app.js").output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("missing: provider, runtime, stage, region"));

    Ok(())
}

#[test]
fn test_synth_parse_error_removes_stale_descriptor() -> Result<()> {
    let test = CliTest::with_config()?;
    test.write_file("serverless.yml", "service: old\n")?;
    test.write_file("src/app.js", "function (")?;

    let output = test.synth_command("src/app.js").output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Failed to parse"));
    assert!(!test.root().join("serverless.yml").exists());

    Ok(())
}

#[test]
fn test_no_command_prints_help() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.command().output()?;
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("synth"));

    Ok(())
}
