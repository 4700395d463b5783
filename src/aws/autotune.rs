//! `@autotune`: adjust a function's memory size from its measured usage.
//!
//! For each tuned function two CloudWatch metric filters extract the
//! configured and the used memory from the Lambda `REPORT` log lines, and two
//! alarms fire on the utilization ratio. Both alarms notify the shared
//! `autotune` function, which doubles or halves the memory size within the
//! bounds passed through its environment.

use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde_json::{Value, json};

use crate::core::annotations::Annotation;
use crate::core::context::RunContext;
use crate::core::descriptor::{EventSpec, FunctionSpec};
use crate::core::registry::NodeContext;
use crate::utils::capitalize;

use super::target::FunctionTarget;
use super::{AUTOTUNE_HANDLER, AWS_SDK};

/// Name of the generated tuning function.
pub const AUTOTUNE_FUNCTION: &str = "autotune";
pub const AUTOTUNE_ROLE: &str = "AutotuneRole";
pub const AUTOTUNE_TOPIC: &str = "AutotuneAlarm";

const DEFAULT_MIN_MEMORY: u32 = 128;
const DEFAULT_MAX_MEMORY: u32 = 2048;
const DEFAULT_LOWER_THRESHOLD: f64 = 0.4;
const DEFAULT_UPPER_THRESHOLD: f64 = 0.9;

const MEMORY_SIZE: &str = "MemorySize";
const MAX_MEMORY_USED: &str = "MaxMemoryUsed";
const METRIC_NAMESPACE: &str = "${self:service}-${self:provider.stage}";

const REPORT_FILTER_PATTERN: &str = concat!(
    "[type=\"REPORT\", RequestId_Label=\"RequestId:\", RequestId, ",
    "Duration_Label=\"Duration:\", Duration, Duration_Unit, ",
    "BilledDuration_Label_1=\"Billed\", BilledDuration_Label_2=\"Duration:\", BilledDuration, BilledDuration_Unit, ",
    "MemorySize_Label_1=\"Memory\", MemorySize_Label_2=\"Size:\", MemorySize, MemorySize_Unit, ",
    "MaxMemoryUsed_Label_1=\"Max\", MaxMemoryUsed_Label_2=\"Memory\", MaxMemoryUsed_Label_3=\"Used:\", MaxMemoryUsed, MaxMemoryUsed_Unit, ...]"
);

struct Alarm {
    name: &'static str,
    threshold: f64,
    comparison: &'static str,
}

pub fn tune_memory(annotation: &Annotation, node: &mut NodeContext<'_>, cx: &mut RunContext) -> Result<()> {
    let Some(stmt) = node.stmt_mut() else {
        bail!("@autotune only applies to declarations");
    };
    let name = FunctionTarget::from_stmt(stmt)?.name;

    let high = Alarm {
        name: "HighMemory",
        threshold: annotation
            .positive_float("upperthreshold")
            .unwrap_or(DEFAULT_UPPER_THRESHOLD),
        comparison: "GreaterThanThreshold",
    };
    let low = Alarm {
        name: "LowMemory",
        threshold: annotation
            .positive_float("lowerthreshold")
            .unwrap_or(DEFAULT_LOWER_THRESHOLD),
        comparison: "LessThanThreshold",
    };

    let mut resources = IndexMap::new();
    resources.extend([
        metric_filter(&name, MEMORY_SIZE),
        metric_filter(&name, MAX_MEMORY_USED),
        alarm(&name, &high),
        alarm(&name, &low),
        (AUTOTUNE_ROLE.to_string(), autotune_role()),
    ]);
    cx.descriptor.add_resources(resources);

    if !cx.descriptor.has_function(AUTOTUNE_FUNCTION) {
        let spec = FunctionSpec {
            handler: Some(cx.handler_reference(AUTOTUNE_FUNCTION)),
            events: vec![EventSpec::Sns(AUTOTUNE_TOPIC.to_string())],
            role: Some(AUTOTUNE_ROLE.to_string()),
            ..Default::default()
        };
        cx.descriptor.add_function_spec(AUTOTUNE_FUNCTION, spec);
    }

    let min_memory = annotation.positive_int("minmemory").unwrap_or(DEFAULT_MIN_MEMORY);
    let max_memory = annotation.positive_int("maxmemory").unwrap_or(DEFAULT_MAX_MEMORY);
    cx.descriptor.add_environment(
        AUTOTUNE_FUNCTION,
        IndexMap::from([
            (format!("{}minMemory", name), min_memory.to_string()),
            (format!("{}maxMemory", name), max_memory.to_string()),
        ]),
    )?;

    cx.defer(AWS_SDK);
    cx.defer(AUTOTUNE_HANDLER);
    Ok(())
}

fn metric_filter(function: &str, metric: &str) -> (String, Value) {
    let log_group = format!("{}LogGroup", capitalize(function));
    (
        format!("{}{}MetricFilter", capitalize(function), metric),
        json!({
            "Type": "AWS::Logs::MetricFilter",
            "DependsOn": log_group,
            "Properties": {
                "FilterPattern": REPORT_FILTER_PATTERN,
                "LogGroupName": { "Ref": log_group },
                "MetricTransformations": [{
                    "MetricName": format!("{}-{}", function, metric),
                    "MetricNamespace": METRIC_NAMESPACE,
                    "MetricValue": format!("${}", metric)
                }]
            }
        }),
    )
}

fn alarm(function: &str, alarm: &Alarm) -> (String, Value) {
    let metric_stat = |metric: &str, stat: &str| {
        json!({
            "Metric": {
                "Namespace": METRIC_NAMESPACE,
                "MetricName": format!("{}-{}", function, metric)
            },
            "Period": 60,
            "Stat": stat
        })
    };

    (
        format!("{}{}Alarm", capitalize(function), alarm.name),
        json!({
            "Type": "AWS::CloudWatch::Alarm",
            "Properties": {
                "AlarmName": format!("{}-{}-{}", METRIC_NAMESPACE, function, alarm.name),
                "ActionsEnabled": true,
                "AlarmActions": [{ "Ref": format!("SNSTopic{}", AUTOTUNE_TOPIC) }],
                "EvaluationPeriods": 1,
                "DatapointsToAlarm": 1,
                "Threshold": alarm.threshold,
                "ComparisonOperator": alarm.comparison,
                "Metrics": [
                    {
                        "Id": "e1",
                        "Label": "MemoryUtilization",
                        "ReturnData": true,
                        "Expression": "m1/m2"
                    },
                    {
                        "Id": "m1",
                        "ReturnData": false,
                        "MetricStat": metric_stat(MAX_MEMORY_USED, "Maximum")
                    },
                    {
                        "Id": "m2",
                        "ReturnData": false,
                        "MetricStat": metric_stat(MEMORY_SIZE, "Average")
                    }
                ]
            }
        }),
    )
}

fn autotune_role() -> Value {
    let log_group_arn = "arn:${AWS::Partition}:logs:${AWS::Region}:${AWS::AccountId}:log-group:/aws/lambda/${self:service}-${self:provider.stage}*";
    json!({
        "Type": "AWS::IAM::Role",
        "Properties": {
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": ["lambda.amazonaws.com"] },
                    "Action": ["sts:AssumeRole"]
                }]
            },
            "Policies": [{
                "PolicyName": format!("{}-{}", METRIC_NAMESPACE, AUTOTUNE_FUNCTION),
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [
                        {
                            "Effect": "Allow",
                            "Action": ["logs:CreateLogStream", "logs:CreateLogGroup"],
                            "Resource": [{ "Fn::Sub": format!("{}:*", log_group_arn) }]
                        },
                        {
                            "Effect": "Allow",
                            "Action": ["logs:PutLogEvents"],
                            "Resource": [{ "Fn::Sub": format!("{}:*:*", log_group_arn) }]
                        },
                        {
                            "Effect": "Allow",
                            "Action": [
                                "lambda:GetFunctionConfiguration",
                                "lambda:UpdateFunctionConfiguration"
                            ],
                            "Resource": "*"
                        }
                    ]
                }
            }],
            "Path": "/",
            "RoleName": format!("{}-{}Role", METRIC_NAMESPACE, AUTOTUNE_FUNCTION)
        }
    })
}

/// Handler of the `autotune` function.
///
/// The alarm name ends in `-<function>-<HighMemory|LowMemory>`; stripping the
/// suffix yields the deployed Lambda name.
pub const AUTOTUNE_HANDLER_SOURCE: &str = r#"exports.autotune = async (event) => {
  const lambda = new AWS.Lambda();
  const alarmName = JSON.parse(event.Records[0].Sns.Message).AlarmName;
  const lambdaName = alarmName.replace(/-\w+$/g, "");
  const functionName = lambdaName.match(/\w+$/g)[0];
  const alarmType = alarmName.match(/\w+$/g)[0];
  const minMemory = parseInt(process.env[functionName + "minMemory"]);
  const maxMemory = parseInt(process.env[functionName + "maxMemory"]);
  let currentMemory;
  try {
    currentMemory = (await lambda.getFunctionConfiguration({ FunctionName: lambdaName }).promise()).MemorySize;
  } catch {
    console.error("Unable to get current function configuration for function " + lambdaName);
    return "Error";
  }
  let newMemory;
  if (alarmType === "HighMemory") {
    newMemory = currentMemory * 2 > maxMemory ? maxMemory : currentMemory * 2;
  } else if (alarmType === "LowMemory") {
    newMemory = currentMemory / 2 < minMemory ? minMemory : currentMemory / 2;
  }
  if (newMemory === currentMemory) {
    console.log("Memory already reached its min/max config");
    return "Error";
  }
  try {
    await lambda.updateFunctionConfiguration({ FunctionName: lambdaName, MemorySize: newMemory }).promise();
  } catch {
    console.error("Unable to update function configuration for function " + lambdaName);
    return "Error";
  }
  return "Successfully tuned function " + lambdaName;
};"#;
